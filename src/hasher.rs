//! Streaming SHA-256 over file contents.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Chunk size for streaming reads, matching the Python original's 1 MiB buffer.
const HASH_BUF_SIZE: usize = 1 << 20;

/// Compute the lowercase hex SHA-256 digest of the file at `path`, reading in
/// fixed-size chunks so memory use does not scale with file size.
pub async fn sha256_file(path: &Path) -> crate::Result<String> {
    let mut file = File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_BUF_SIZE];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashes_known_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bin");
        tokio::fs::write(&path, b"hello world").await.unwrap();

        let digest = sha256_file(&path).await.unwrap();
        assert_eq!(
            digest,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[tokio::test]
    async fn hashing_missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = sha256_file(&dir.path().join("nope.bin")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn empty_file_hashes_to_the_known_empty_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        tokio::fs::write(&path, b"").await.unwrap();

        let digest = sha256_file(&path).await.unwrap();
        assert_eq!(
            digest,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
