use sha1::{Digest, Sha1};

/// Calculate SHA1 hash of content and return it as a hex string
pub fn calculate_sha1(content: &[u8]) -> String {
    let digest = Sha1::digest(content);
    digest.iter().map(|byte| format!("{:02x}", byte)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_sha1() {
        assert_eq!(
            calculate_sha1(b"abc"),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        assert_eq!(calculate_sha1(b"").len(), 40);
    }
}
