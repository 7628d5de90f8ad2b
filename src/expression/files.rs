//! File helpers scoped to the configured base directory.
//!
//! `file_contents`, `file_hash` and `file_digest` resolve their path argument
//! against a cap-std [`Dir`], so absolute paths and `..` escapes are refused.
//! SHA-256 and SHA-512 are always available; SHA-1 and MD5 need the
//! `legacy-digests` feature. Hashes are lowercase hexadecimal.

use std::{io::Read, sync::Arc};

use camino::Utf8Path;
use cap_std::fs_utf8::Dir;
use digest::Digest;
#[cfg(feature = "legacy-digests")]
use md5::Md5;
use minijinja::{Environment, Error, ErrorKind};
#[cfg(feature = "legacy-digests")]
use sha1::Sha1;
use sha2::{Sha256, Sha512};

use super::{Failure, FailureLog, io_helpers::io_to_error};
use crate::config::ConfigError;

const DEFAULT_ALGORITHM: &str = "sha256";
const DEFAULT_DIGEST_LEN: usize = 8;

/// Base directory shared by the file helpers.
#[derive(Clone, Debug)]
struct FileScope {
    dir: Option<Arc<Dir>>,
    failures: FailureLog,
}

impl FileScope {
    fn dir(&self, helper: &str) -> Result<&Dir, Error> {
        self.dir.as_deref().ok_or_else(|| {
            let err = ConfigError::BaseDirUnset {
                helper: helper.to_owned(),
            };
            let message = err.to_string();
            self.failures.record(Failure::Config(err));
            Error::new(ErrorKind::InvalidOperation, message)
        })
    }
}

/// Register the file helpers with the environment.
pub(super) fn register_functions(
    env: &mut Environment<'_>,
    dir: Option<Arc<Dir>>,
    failures: FailureLog,
) {
    let scope = FileScope { dir, failures };

    let contents_scope = scope.clone();
    env.add_function("file_contents", move |path: String| -> Result<String, Error> {
        let dir = contents_scope.dir("file_contents")?;
        read_utf8(dir, Utf8Path::new(&path))
    });

    let hash_scope = scope.clone();
    env.add_function(
        "file_hash",
        move |path: String, algorithm: Option<String>| -> Result<String, Error> {
            let dir = hash_scope.dir("file_hash")?;
            let algorithm = algorithm.as_deref().unwrap_or(DEFAULT_ALGORITHM);
            compute_hash(dir, Utf8Path::new(&path), algorithm)
        },
    );

    env.add_function(
        "file_digest",
        move |path: String,
              length: Option<usize>,
              algorithm: Option<String>|
              -> Result<String, Error> {
            let dir = scope.dir("file_digest")?;
            let algorithm = algorithm.as_deref().unwrap_or(DEFAULT_ALGORITHM);
            let mut hash = compute_hash(dir, Utf8Path::new(&path), algorithm)?;
            hash.truncate(length.unwrap_or(DEFAULT_DIGEST_LEN).min(hash.len()));
            Ok(hash)
        },
    );
}

fn read_utf8(dir: &Dir, path: &Utf8Path) -> Result<String, Error> {
    dir.read_to_string(path)
        .map_err(|err| io_to_error(path, "read", err))
}

fn compute_hash(dir: &Dir, path: &Utf8Path, algorithm: &str) -> Result<String, Error> {
    match algorithm.to_ascii_lowercase().as_str() {
        "sha256" => hash_stream::<Sha256>(dir, path),
        "sha512" => hash_stream::<Sha512>(dir, path),
        #[cfg(feature = "legacy-digests")]
        "sha1" => hash_stream::<Sha1>(dir, path),
        #[cfg(feature = "legacy-digests")]
        "md5" => hash_stream::<Md5>(dir, path),
        #[cfg(not(feature = "legacy-digests"))]
        legacy @ ("sha1" | "md5") => Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("hash algorithm '{legacy}' requires the 'legacy-digests' feature"),
        )),
        _ => Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("unsupported hash algorithm '{algorithm}'"),
        )),
    }
}

fn hash_stream<H>(dir: &Dir, path: &Utf8Path) -> Result<String, Error>
where
    H: Digest,
{
    let mut file = dir.open(path).map_err(|err| io_to_error(path, "open", err))?;
    let mut hasher = H::new();
    let mut buffer = [0_u8; 8192];
    loop {
        let read = file
            .read(&mut buffer)
            .map_err(|err| io_to_error(path, "read", err))?;
        if read == 0 {
            break;
        }
        hasher.update(buffer.get(..read).unwrap_or_default());
    }
    Ok(encode_hex(&hasher.finalize()))
}

fn encode_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        for nibble in [byte >> 4, byte & 0x0f] {
            out.push(char::from(HEX.get(usize::from(nibble)).copied().unwrap_or(b'0')));
        }
    }
    out
}
