use std::io::Read;

use sha2::{Digest, Sha256};

const CHUNK: usize = 64 * 1024;

/// Compute the lowercase hex SHA-256 digest of an in-memory buffer.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    // Feed in 64KB chunks so large uploads hash the same way a streamed file would.
    for chunk in bytes.chunks(CHUNK) {
        hasher.update(chunk);
    }
    format!("{:x}", hasher.finalize())
}

/// Compute the SHA-256 digest of everything `reader` yields, 64KB at a time.
pub fn sha256_reader<R: Read>(mut reader: R) -> std::io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK];

    loop {
        let n = reader.read(&mut buf)?;
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

    #[test]
    fn test_sha256_consistency() {
        let hash1 = sha256_hex(b"hello world");
        let hash2 = sha256_hex(b"hello world");
        assert_eq!(hash1, hash2);
        // Known SHA-256 of "hello world"
        assert_eq!(
            hash1,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_sha256_different_content() {
        assert_ne!(sha256_hex(b"content A"), sha256_hex(b"content B"));
    }

    #[test]
    fn test_sha256_empty_input() {
        // Known SHA-256 of empty string
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_sha256_reader_matches_buffer() {
        let big: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let streamed = sha256_reader(std::io::Cursor::new(&big)).unwrap();
        assert_eq!(streamed, sha256_hex(&big));
    }

    #[test]
    fn test_sha256_reader_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("test.bin");
        std::fs::write(&path, b"hello world").unwrap();
        let file = std::fs::File::open(&path).unwrap();
        assert_eq!(
            sha256_reader(std::io::BufReader::new(file)).unwrap(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_sha256_chunk_boundary() {
        let big = vec![7u8; 64 * 1024 * 2 + 13];
        let mut hasher = Sha256::new();
        hasher.update(&big);
        assert_eq!(sha256_hex(&big), format!("{:x}", hasher.finalize()));
    }
}
