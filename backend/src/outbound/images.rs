//! Filesystem image blob store.
//!
//! Proof images are opaque blobs: the domain only sees the reference path
//! returned on save. Files are written through a capability-scoped
//! directory handle so the adapter cannot touch anything outside the
//! configured upload directory.

use std::sync::Arc;

use async_trait::async_trait;
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use tracing::{debug, error};
use uuid::Uuid;

use crate::domain::ports::ImageStore;
use crate::domain::Error;

/// Image store writing blobs into a single upload directory.
#[derive(Clone)]
pub struct FsImageStore {
    dir: Arc<Dir>,
}

impl FsImageStore {
    /// Open (creating if needed) the upload directory.
    pub fn open(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        let dir = Dir::open_ambient_dir(path, ambient_authority())?;
        Ok(Self { dir: Arc::new(dir) })
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn save(&self, extension: &str, bytes: Vec<u8>) -> Result<String, Error> {
        let filename = format!("{}.{extension}", Uuid::new_v4().simple());
        let dir = Arc::clone(&self.dir);
        let written = {
            let filename = filename.clone();
            tokio::task::spawn_blocking(move || dir.write(&filename, &bytes))
                .await
                .map_err(|err| Error::internal(format!("blocking task failed: {err}")))?
        };

        if let Err(err) = written {
            error!(error = %err, "failed to store uploaded image");
            return Err(Error::internal("Could not store uploaded image"));
        }

        debug!(filename = %filename, "stored proof image");
        Ok(format!("uploads/{filename}"))
    }
}
