//! Streaming SHA-256 of installer files.
//!
//! Checksums are computed on demand, never inline with inventory enumeration.
//! Installer files can run to hundreds of megabytes, so reads go through a
//! fixed-size buffer feeding a running hash state instead of one big read.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::error::{Error, Result};

const BUF_SIZE: usize = 64 * 1024;

/// Digest provider for the registry. The production impl is [`Sha256Hasher`];
/// tests substitute counting/gating impls to observe invocation behavior.
pub trait Hasher: Send + Sync {
    fn digest(&self, path: &Path) -> Result<String>;
}

/// Chunked file read feeding a single SHA-256 state, in order.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Hasher;

impl Hasher for Sha256Hasher {
    fn digest(&self, path: &Path) -> Result<String> {
        sha256_path(path)
    }
}

/// Compute SHA-256 of a file and return the digest as lowercase hex
/// (exactly 64 characters). A missing file is `NotFound`; any other
/// open/read failure is `Io`. No retries; the caller decides whether to
/// try again later.
pub fn sha256_path(path: &Path) -> Result<String> {
    let mut f = File::open(path).map_err(|e| classify(path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; BUF_SIZE];
    loop {
        let n = f.read(&mut buf).map_err(|e| classify(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn classify(path: &Path, e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::NotFound {
        Error::NotFound(path.display().to_string())
    } else {
        Error::Io {
            path: path.to_path_buf(),
            source: e,
        }
    }
}
