use std::io::Write;
use std::path::{Path, PathBuf};

use lock_service::Endpoint;

use super::{DiskError, FormatDescriptor, StorageDisk};

/// Directory holding awsomefs metadata at the root of every disk.
pub const SYSTEM_DIR: &str = ".awsomefs.sys";
pub const FORMAT_FILE: &str = "format.bin";

/// A disk mounted on this node.
#[derive(Debug, Clone)]
pub struct LocalDisk {
    endpoint: String,
    root: PathBuf,
}

impl LocalDisk {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            endpoint: root.display().to_string(),
            root,
        }
    }

    pub fn from_endpoint(endpoint: &Endpoint) -> Self {
        Self {
            endpoint: endpoint.as_str().to_string(),
            root: PathBuf::from(endpoint.path()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn format_path(&self) -> PathBuf {
        self.root.join(SYSTEM_DIR).join(FORMAT_FILE)
    }
}

#[tonic::async_trait]
impl StorageDisk for LocalDisk {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn load_format(&self) -> Result<FormatDescriptor, DiskError> {
        match tokio::fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(DiskError::DiskNotFound),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DiskError::DiskNotFound)
            }
            Err(e) => return Err(e.into()),
        }

        let record = match tokio::fs::read(self.format_path()).await {
            Ok(record) => record,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DiskError::UnformattedDisk)
            }
            Err(e) => return Err(e.into()),
        };
        FormatDescriptor::decode(&record)
    }

    async fn save_format(&self, format: &FormatDescriptor) -> Result<(), DiskError> {
        if !tokio::fs::metadata(&self.root)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
        {
            return Err(DiskError::DiskNotFound);
        }

        let record = format.encode()?;
        let system_dir = self.root.join(SYSTEM_DIR);
        let target = self.format_path();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            std::fs::create_dir_all(&system_dir)?;
            let mut tmp = tempfile::NamedTempFile::new_in(&system_dir)?;
            tmp.write_all(&record)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;

        tracing::debug!("Wrote format descriptor to {}", self.endpoint);
        Ok(())
    }
}
