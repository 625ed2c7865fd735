use crate::error::{Error, Result};
use sha2::{Digest, Sha512};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// SHA-512 internal block size in bytes.
const SHA512_BLOCK_SIZE: usize = 128;

/// Bytes fed to the digest per read.
pub const HASH_CHUNK_SIZE: usize = 128 * SHA512_BLOCK_SIZE;

/// Hex SHA-512 of the empty input.
pub fn empty_digest() -> String {
    format!("{:x}", Sha512::new().finalize())
}

/// Stream `path` through SHA-512 and return the lowercase hex digest with
/// the number of bytes that went into it.
///
/// `progress` receives `"processing <path> at <percent>%"` after each chunk.
/// A zero-length file returns the empty digest without reading.
pub fn hash_file(path: &Path, progress: Option<&dyn Fn(&str)>) -> Result<(String, u64)> {
    let file = File::open(path).map_err(|e| Error::read_failure(path, e))?;
    let total = file
        .metadata()
        .map_err(|e| Error::read_failure(path, e))?
        .len();
    if total == 0 {
        return Ok((empty_digest(), 0));
    }

    let display = path.display().to_string();
    let on_chunk = |read_so_far: u64| {
        if let Some(report) = progress {
            let percent = read_so_far as f64 / total as f64 * 100.0;
            report(&format!("processing {} at {:.3}%", display, percent));
        }
    };
    hash_chunks(file, on_chunk).map_err(|e| Error::read_failure(path, e))
}

/// Hash any reader with the same chunking as [`hash_file`].
pub fn hash_reader<R: Read>(reader: R) -> io::Result<String> {
    hash_chunks(reader, |_| {}).map(|(digest, _)| digest)
}

fn hash_chunks<R: Read>(
    mut reader: R,
    mut on_chunk: impl FnMut(u64),
) -> io::Result<(String, u64)> {
    let mut hasher = Sha512::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];
    let mut read_so_far = 0u64;

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
        read_so_far += bytes_read as u64;
        on_chunk(read_so_far);
    }

    Ok((format!("{:x}", hasher.finalize()), read_so_far))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_known_digest() {
        let digest = hash_reader(&b"abc"[..]).unwrap();
        assert_eq!(
            digest,
            "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a\
             2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f"
        );
    }

    #[test]
    fn test_empty_file_yields_empty_digest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty");
        fs::write(&path, b"").unwrap();

        let calls = RefCell::new(0);
        let report = |_: &str| *calls.borrow_mut() += 1;
        let (digest, size) = hash_file(&path, Some(&report)).unwrap();

        assert_eq!(size, 0);
        assert_eq!(digest, empty_digest());
        assert!(digest.starts_with("cf83e1357eefb8bd"));
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn test_progress_reaches_one_hundred_percent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.bin");
        fs::write(&path, vec![7u8; HASH_CHUNK_SIZE * 2 + 10]).unwrap();

        let messages = RefCell::new(Vec::new());
        let report = |msg: &str| messages.borrow_mut().push(msg.to_string());
        let (digest, size) = hash_file(&path, Some(&report)).unwrap();

        assert_eq!(size, (HASH_CHUNK_SIZE * 2 + 10) as u64);
        let messages = messages.into_inner();
        assert_eq!(messages.len(), 3);
        assert!(messages[0].starts_with("processing "));
        assert!(messages[2].ends_with("at 100.000%"));
        assert_eq!(digest.len(), 128);
    }

    #[test]
    fn test_file_and_reader_digests_agree() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.txt");
        let content = b"hello world, hello chunks".repeat(1000);
        fs::write(&path, &content).unwrap();

        let (digest, size) = hash_file(&path, None).unwrap();
        assert_eq!(digest, hash_reader(&content[..]).unwrap());
        assert_eq!(size, content.len() as u64);
        assert_eq!(hash_file(&path, None).unwrap().0, digest);
    }

    #[test]
    fn test_missing_file_is_read_failure() {
        let dir = tempdir().unwrap();
        let result = hash_file(&dir.path().join("nope"), None);
        assert!(matches!(result, Err(Error::ReadFailure { .. })));
    }
}
