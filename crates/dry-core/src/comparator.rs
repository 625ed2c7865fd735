use crate::error::{Error, Result};
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;
use tracing::debug;

pub const COMPARE_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    SamePath,
    Identical,
    SizeMismatch { left: u64, right: u64 },
    /// Index of the first chunk of [`COMPARE_CHUNK_SIZE`] bytes that differs.
    ContentMismatch { chunk_index: u64 },
}

impl Comparison {
    pub fn is_equal(&self) -> bool {
        matches!(self, Comparison::SamePath | Comparison::Identical)
    }
}

/// Byte-exact comparison of two regular files.
pub fn compare(a: &Path, b: &Path) -> Result<Comparison> {
    debug!("compare {} -> {}", a.display(), b.display());
    let size_a = regular_file_len(a)?;
    let size_b = regular_file_len(b)?;

    if a == b {
        return Ok(Comparison::SamePath);
    }
    if size_a != size_b {
        debug!("different sizes");
        return Ok(Comparison::SizeMismatch {
            left: size_a,
            right: size_b,
        });
    }

    let mut reader_a = open(a)?;
    let mut reader_b = open(b)?;
    let mut chunk_a = vec![0u8; COMPARE_CHUNK_SIZE];
    let mut chunk_b = vec![0u8; COMPARE_CHUNK_SIZE];
    let mut chunk_index = 0u64;

    loop {
        let read_a = fill_chunk(&mut reader_a, &mut chunk_a).map_err(|e| Error::read_failure(a, e))?;
        let read_b = fill_chunk(&mut reader_b, &mut chunk_b).map_err(|e| Error::read_failure(b, e))?;

        if read_a != read_b || chunk_a[..read_a] != chunk_b[..read_b] {
            debug!("different chunk[{}]", chunk_index);
            return Ok(Comparison::ContentMismatch { chunk_index });
        }
        if read_a == 0 {
            return Ok(Comparison::Identical);
        }
        chunk_index += 1;
    }
}

pub fn files_equal(a: &Path, b: &Path) -> Result<bool> {
    compare(a, b).map(|c| c.is_equal())
}

fn regular_file_len(path: &Path) -> Result<u64> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(meta.len()),
        _ => Err(Error::NotAFile(path.to_path_buf())),
    }
}

fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| Error::read_failure(path, e))
}

/// Read until `buf` is full or the reader is exhausted.
fn fill_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
