use std::fs;
use std::io::{BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::deadline::Deadline;
use crate::domain::{IngestStage, DEFAULT_IMAGE, IMAGE_EXTENSION};
use crate::error::{Error, Result};
use crate::hasher;

const WRITE_CHUNK: usize = 64 * 1024;

/// Content-addressed image storage: each blob lives at `<dir>/<sha256-hex>.jpg`.
///
/// Writes go to a temp file in the same directory and are renamed into place, so a
/// reader never observes a partially written blob and concurrent writers of the same
/// content simply replace one complete copy with another.
#[derive(Debug, Clone)]
pub struct BlobStore {
    dir: PathBuf,
}

impl BlobStore {
    /// Open the blob directory, creating it if needed.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|source| Error::BlobWrite {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The name `bytes` is (or would be) stored under.
    pub fn blob_id_for(bytes: &[u8]) -> String {
        format!("{}{}", hasher::sha256_hex(bytes), IMAGE_EXTENSION)
    }

    /// Store `bytes` under its content-derived name and return that name.
    pub fn put(&self, bytes: &[u8]) -> Result<String> {
        self.put_with_deadline(bytes, Deadline::none())
    }

    /// Like [`BlobStore::put`], abandoning the write once `deadline` passes.
    pub fn put_with_deadline(&self, bytes: &[u8], deadline: Deadline) -> Result<String> {
        deadline.check(IngestStage::BlobWriting)?;
        let blob_id = Self::blob_id_for(bytes);
        let target = self.dir.join(&blob_id);
        self.write_atomic(&target, bytes, deadline)?;
        tracing::debug!(blob_id = %blob_id, size = bytes.len(), "stored image");
        Ok(blob_id)
    }

    /// Install the fallback image served for missing blobs.
    pub fn install_default(&self, bytes: &[u8]) -> Result<()> {
        let target = self.dir.join(DEFAULT_IMAGE);
        self.write_atomic(&target, bytes, Deadline::none())
    }

    /// Resolve a validated blob id to its on-disk path.
    pub fn path_for(&self, blob_id: &str) -> Result<PathBuf> {
        validate_blob_id(blob_id)?;
        Ok(self.dir.join(blob_id))
    }

    pub fn contains(&self, blob_id: &str) -> bool {
        self.path_for(blob_id).is_ok_and(|p| p.is_file())
    }

    /// Re-hash a stored blob and check it still matches its content-derived name.
    pub fn verify(&self, blob_id: &str) -> Result<bool> {
        let path = self.path_for(blob_id)?;
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::BlobNotFound(blob_id.to_string()))
            }
            Err(source) => return Err(Error::BlobRead { path, source }),
        };
        let digest = hasher::sha256_reader(BufReader::with_capacity(WRITE_CHUNK, file))
            .map_err(|source| Error::BlobRead {
                path: path.clone(),
                source,
            })?;
        Ok(blob_id.strip_suffix(IMAGE_EXTENSION) == Some(digest.as_str()))
    }

    /// Read a blob. Absent blobs yield `BlobNotFound`.
    pub fn get(&self, blob_id: &str) -> Result<Vec<u8>> {
        let path = self.path_for(blob_id)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(Error::BlobNotFound(blob_id.to_string()))
            }
            Err(source) => Err(Error::BlobRead { path, source }),
        }
    }

    /// Read a blob, substituting the default image when it does not exist.
    pub fn get_or_default(&self, blob_id: &str) -> Result<Vec<u8>> {
        match self.get(blob_id) {
            Err(Error::BlobNotFound(_)) => {
                tracing::debug!(blob_id = %blob_id, "image not found, serving default");
                self.get(DEFAULT_IMAGE)
            }
            other => other,
        }
    }

    fn write_atomic(&self, target: &Path, bytes: &[u8], deadline: Deadline) -> Result<()> {
        let write_err = |source: std::io::Error| Error::BlobWrite {
            path: target.to_path_buf(),
            source,
        };

        let mut tmp = tempfile::Builder::new()
            .prefix(".upload-")
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .map_err(write_err)?;

        // The temp file is removed on drop if we bail out before persisting.
        for chunk in bytes.chunks(WRITE_CHUNK) {
            deadline.check(IngestStage::BlobWriting)?;
            tmp.write_all(chunk).map_err(write_err)?;
        }
        tmp.as_file().sync_all().map_err(write_err)?;
        deadline.check(IngestStage::BlobWriting)?;

        tmp.persist(target).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

/// Accept only plain `<stem>.jpg` names that stay inside the blob directory.
pub fn validate_blob_id(blob_id: &str) -> Result<()> {
    let stem = blob_id.strip_suffix(IMAGE_EXTENSION);
    let ok = match stem {
        Some(stem) => {
            !stem.is_empty()
                && !stem.starts_with('.')
                && !stem.contains(['/', '\\'])
                && !stem.contains("..")
        }
        None => false,
    };
    if !ok {
        return Err(Error::InvalidImageName(blob_id.to_string()));
    }
    Ok(())
}
