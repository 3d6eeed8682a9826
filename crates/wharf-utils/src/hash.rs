use std::{fs::File, io::Read, path::Path};

use sha1::{Digest, Sha1};

use crate::error::{HashError, HashResult};

/// Incremental SHA-1 digest for streamed tarball uploads.
///
/// The registry wire format identifies tarballs by their SHA-1 shasum, so
/// the upload pipeline feeds every chunk through this digest while the bytes
/// are written to disk.
pub struct Sha1Digest {
    hasher: Sha1,
    length: u64,
}

impl Sha1Digest {
    pub fn new() -> Self {
        Self {
            hasher: Sha1::new(),
            length: 0,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
        self.length += data.len() as u64;
    }

    /// Total number of bytes fed into the digest so far.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Consumes the digest and returns the hex-encoded SHA-1 sum.
    pub fn finalize_hex(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

impl Default for Sha1Digest {
    fn default() -> Self {
        Self::new()
    }
}

/// Calculates the hex-encoded SHA-1 sum of a byte slice.
pub fn sha1_hex(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}

/// Calculates the hex-encoded SHA-1 sum of a file's contents.
///
/// # Errors
///
/// * [`HashError::ReadFailed`] if the file cannot be read.
pub fn sha1_hex_file<P: AsRef<Path>>(file_path: P) -> HashResult<String> {
    let file_path = file_path.as_ref();
    let map_err = |err| HashError::ReadFailed {
        path: file_path.to_path_buf(),
        source: err,
    };

    let mut file = File::open(file_path).map_err(map_err)?;
    let mut digest = Sha1Digest::new();
    let mut buffer = [0u8; 8192];

    loop {
        let n = file.read(&mut buffer).map_err(map_err)?;
        if n == 0 {
            break;
        }
        digest.update(&buffer[..n]);
    }

    Ok(digest.finalize_hex())
}
