// hasher.rs - SHA-256 content hashing.
//
// Hashes are lowercase hex. The audit chain hashes raw log lines; the
// classification cache keys extracted signals by the hash of file content,
// streamed so large documents are never held in memory just to be hashed.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::AuditError;

const CHUNK: usize = 64 * 1024;

/// Hash arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Hash a UTF-8 string.
pub fn hash_str(s: &str) -> String {
    hash_bytes(s.as_bytes())
}

/// Hash everything a reader yields, in fixed-size chunks.
pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Hash the contents of a file on disk.
pub fn hash_file(path: &Path) -> Result<String, AuditError> {
    let map_err = |source| AuditError::HashFileFailed {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(map_err)?;
    hash_reader(file).map_err(map_err)
}
