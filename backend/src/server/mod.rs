//! Server construction and wiring.

mod config;

pub use config::ServerConfig;

use std::sync::Arc;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{web, App, HttpServer};
use mockable::{Clock, DefaultClock};
use tracing::info;

use crate::inbound::http::{
    agree_record, create_record, disagree_record, healthz, list_records, HealthState, HttpState,
};
use crate::outbound::images::FsImageStore;
use crate::outbound::persistence::{migrations, DbPool, DieselRecordStore};

/// Request bodies above this size are rejected by actix before handlers run.
const MAX_PAYLOAD_BYTES: usize = 5 * 1024 * 1024;

fn build_app(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(web::PayloadConfig::new(MAX_PAYLOAD_BYTES))
        .service(list_records)
        .service(create_record)
        .service(agree_record)
        .service(disagree_record)
        .service(healthz)
}

/// Prepare the database and shared handler state.
///
/// Opens the pool, runs schema migrations on a checked-out connection, and
/// assembles the adapters behind [`HttpState`].
///
/// # Errors
///
/// Returns [`std::io::Error`] when the pool cannot be built, a migration
/// fails, or the upload directory cannot be opened.
pub fn build_http_state(config: &ServerConfig) -> std::io::Result<web::Data<HttpState>> {
    let pool = DbPool::new(&config.pool_config()).map_err(std::io::Error::other)?;

    let mut conn = pool.get().map_err(std::io::Error::other)?;
    migrations::run(&mut conn).map_err(std::io::Error::other)?;
    drop(conn);

    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let images = FsImageStore::open(&config.upload_dir)?;
    let records = DieselRecordStore::new(pool, Arc::clone(&clock));

    Ok(web::Data::new(HttpState::new(
        Arc::new(records),
        Arc::new(images),
        clock,
    )))
}

/// Start the HTTP server for the given configuration.
///
/// # Errors
///
/// Returns [`std::io::Error`] when startup preparation fails or the listener
/// cannot bind.
pub fn run(config: &ServerConfig) -> std::io::Result<Server> {
    let http_state = build_http_state(config)?;
    let health_state = web::Data::new(HealthState::new());

    let bind_addr = config.bind_addr();
    let server_health_state = health_state.clone();
    let server = HttpServer::new(move || {
        build_app(server_health_state.clone(), http_state.clone())
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    info!(addr = %bind_addr, "server listening");
    Ok(server)
}
