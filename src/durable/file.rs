//! Directory-backed durable medium.
//!
//! Each record is one file named by the SHA-256 digest of its key, so file
//! names stay short whatever the key length. The file starts with the key
//! itself (a little-endian `u32` length, then the UTF-8 bytes) followed by
//! the blob, which lets prefix scans recover keys. Writes go to a temporary
//! file that is renamed into place, which keeps them atomic.

use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::durable::DurableTier;
use crate::error::{DurableError, DurableResult};

const RECORD_EXTENSION: &str = "rec";
const TEMP_EXTENSION: &str = "tmp";
const KEY_LEN_BYTES: usize = 4;

/// Durable tier storing one file per record under a base directory.
#[derive(Debug, Clone)]
pub struct FileDurableTier {
    base_dir: PathBuf,
}

impl FileDurableTier {
    /// Opens (creating if needed) a durable tier rooted at `base_dir`.
    pub fn open(base_dir: impl Into<PathBuf>) -> DurableResult<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        debug!("Durable tier opened at {:?}", base_dir);
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn file_stem(key: &str) -> String {
        hex::encode(Sha256::digest(key.as_bytes()))
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.base_dir
            .join(format!("{}.{}", Self::file_stem(key), RECORD_EXTENSION))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.base_dir
            .join(format!("{}.{}", Self::file_stem(key), TEMP_EXTENSION))
    }

    /// Reads the key stored at the head of a record file.
    ///
    /// Returns None for files whose header is not a valid key.
    fn read_stored_key(path: &Path) -> DurableResult<Option<String>> {
        let mut file = fs::File::open(path)?;
        let mut len_buf = [0u8; KEY_LEN_BYTES];
        if file.read_exact(&mut len_buf).is_err() {
            return Ok(None);
        }
        let len = u32::from_le_bytes(len_buf) as usize;

        let mut key_buf = Vec::new();
        file.take(len as u64).read_to_end(&mut key_buf)?;
        if key_buf.len() != len {
            return Ok(None);
        }
        Ok(String::from_utf8(key_buf).ok())
    }
}

/// Splits a record file into its stored key and blob.
fn split_record(bytes: &[u8]) -> Option<(&str, &[u8])> {
    let len_bytes: [u8; KEY_LEN_BYTES] = bytes.get(..KEY_LEN_BYTES)?.try_into().ok()?;
    let len = u32::from_le_bytes(len_bytes) as usize;
    let rest = &bytes[KEY_LEN_BYTES..];
    let key = std::str::from_utf8(rest.get(..len)?).ok()?;
    Some((key, &rest[len..]))
}

impl DurableTier for FileDurableTier {
    fn durable_get(&self, key: &str) -> DurableResult<Option<Vec<u8>>> {
        let bytes = match fs::read(self.record_path(key)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match split_record(&bytes) {
            Some((stored, blob)) if stored == key => Ok(Some(blob.to_vec())),
            _ => {
                debug!("Record file for '{}' holds a different key, ignoring", key);
                Ok(None)
            }
        }
    }

    fn durable_set(&self, key: &str, blob: &[u8]) -> DurableResult<()> {
        let key_len = u32::try_from(key.len()).map_err(|_| {
            DurableError::Unavailable(format!(
                "key of {} bytes is too long to store",
                key.len()
            ))
        })?;

        let temp = self.temp_path(key);
        let written = fs::File::create(&temp).and_then(|mut file| {
            file.write_all(&key_len.to_le_bytes())?;
            file.write_all(key.as_bytes())?;
            file.write_all(blob)?;
            file.sync_all()
        });
        let renamed = written.and_then(|()| fs::rename(&temp, self.record_path(key)));
        if let Err(e) = renamed {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        Ok(())
    }

    fn durable_remove(&self, key: &str) -> DurableResult<()> {
        match fs::remove_file(self.record_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn durable_scan_prefix(&self, prefix: &str) -> DurableResult<Vec<String>> {
        let mut keys = Vec::new();

        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            // Files we did not write are skipped, not treated as errors
            let Some(key) = Self::read_stored_key(&path)? else {
                continue;
            };
            if key.starts_with(prefix) && path == self.record_path(&key) {
                keys.push(key);
            }
        }

        keys.sort();
        Ok(keys)
    }
}
