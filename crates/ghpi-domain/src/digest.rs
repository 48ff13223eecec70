use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use md5::Md5;
use serde::Serialize;
use sha2::{Digest, Sha256};

const CHUNK_SIZE: usize = 32 * 1024;

/// Integrity metadata sent alongside an upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileDigest {
    pub md5: String,
    pub sha256: String,
}

/// Hashes a file in fixed-size chunks so large artifacts never sit in memory.
///
/// # Errors
/// Returns the underlying I/O error when the file cannot be opened or a read
/// fails part way through; no partial digest is produced.
pub fn digest_file(path: &Path) -> io::Result<FileDigest> {
    let file = File::open(path)?;
    digest_reader(file)
}

/// Streams `reader` to exhaustion, feeding MD5 and SHA-256 in one pass.
///
/// # Errors
/// Propagates read failures other than `Interrupted`.
pub fn digest_reader<R: Read>(mut reader: R) -> io::Result<FileDigest> {
    let mut md5 = Md5::new();
    let mut sha256 = Sha256::new();
    let mut buf = vec![0_u8; CHUNK_SIZE];
    loop {
        let read = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        md5.update(&buf[..read]);
        sha256.update(&buf[..read]);
    }
    Ok(FileDigest {
        md5: hex::encode(md5.finalize()),
        sha256: hex::encode(sha256.finalize()),
    })
}
