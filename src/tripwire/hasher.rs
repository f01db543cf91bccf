//! BLAKE3 hashing for template files, resource bodies, and declarations.

use crate::error::{Error, Result};
use serde::Serialize;
use std::io::Read;
use std::path::Path;

const STREAM_BUF_SIZE: usize = 65536;

/// Hash a file's contents. Returns `"blake3:{hex}"`.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path).map_err(|e| Error::io(path, e))?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = [0u8; STREAM_BUF_SIZE];
    loop {
        let n = file.read(&mut buf).map_err(|e| Error::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("blake3:{}", hasher.finalize().to_hex()))
}

/// Hash a string. Returns `"blake3:{hex}"`.
pub fn hash_string(s: &str) -> String {
    format!("blake3:{}", blake3::hash(s.as_bytes()).to_hex())
}

/// Hash the compact JSON rendering of a value.
///
/// Map ordering is insertion order, so equal bodies built the same way
/// hash the same.
pub fn hash_json<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value).map_err(|e| Error::Serialize(e.to_string()))?;
    Ok(hash_string(&json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hasher_hash_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Demo.template.json");
        std::fs::write(&path, "{}").unwrap();
        let h = hash_file(&path).unwrap();
        assert!(h.starts_with("blake3:"));
        assert_eq!(h.len(), 7 + 64);
        assert_eq!(h, hash_string("{}"));
    }

    #[test]
    fn test_hasher_hash_string() {
        let h1 = hash_string("hello");
        let h2 = hash_string("hello");
        let h3 = hash_string("world");
        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
    }

    #[test]
    fn test_hasher_hash_json_order_sensitive() {
        let a = hash_json(&json!({ "Type": "AWS::EC2::VPC", "Properties": {} })).unwrap();
        let b = hash_json(&json!({ "Type": "AWS::EC2::VPC", "Properties": {} })).unwrap();
        assert_eq!(a, b);
        let c = hash_json(&json!({ "Type": "AWS::EC2::Subnet" })).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_hasher_hash_file_not_found() {
        let err = hash_file(Path::new("/nonexistent/file.txt")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
