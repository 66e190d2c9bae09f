use sha1::{Digest, Sha1};

/// Hash a git-style object: `<type> <len>\0<data>`.
pub fn hash_git_object(object_type: &str, data: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(object_type.as_bytes());
    hasher.update(b" ");
    hasher.update(data.len().to_string().as_bytes());
    hasher.update(b"\0");
    hasher.update(data);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_blob_hash() {
        // git hash-object -t blob /dev/null
        assert_eq!(
            hex::encode(hash_git_object("blob", b"")),
            "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391"
        );
    }
}
