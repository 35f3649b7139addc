//! Content commitments computed locally
//!
//! The bytes are split into fixed-size chunks, each chunk is hashed with
//! SHA-256, and the chunk digests are folded pairwise into a Merkle root.
//! An odd node at any level is carried up unchanged. Empty input commits
//! to the digest of the empty string.

use sha2::{Digest, Sha256};

use super::Commitments;

/// Chunk size used for commitments
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Compute commitments over `data`
pub fn compute_commitments(data: &[u8]) -> Commitments {
    let mut level: Vec<[u8; 32]> = if data.is_empty() {
        vec![Sha256::digest(b"").into()]
    } else {
        data.chunks(CHUNK_SIZE)
            .map(|chunk| Sha256::digest(chunk).into())
            .collect()
    };
    let chunk_count = level.len();

    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                if let [left, right] = pair {
                    let mut hasher = Sha256::new();
                    hasher.update(left);
                    hasher.update(right);
                    hasher.finalize().into()
                } else {
                    pair[0]
                }
            })
            .collect();
    }

    Commitments {
        root: format!("0x{}", hex::encode(level[0])),
        chunk_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_chunk_root_is_chunk_digest() {
        let commitments = compute_commitments(b"hello");
        assert_eq!(commitments.chunk_count, 1);
        assert_eq!(
            commitments.root,
            format!("0x{}", hex::encode(Sha256::digest(b"hello")))
        );
    }

    #[test]
    fn test_empty_input() {
        let commitments = compute_commitments(&[]);
        assert_eq!(commitments.chunk_count, 1);
        assert_eq!(commitments.root.len(), 66);
    }

    #[test]
    fn test_multi_chunk_root_depends_on_every_chunk() {
        let mut data = vec![7u8; CHUNK_SIZE * 3 + 10];
        let first = compute_commitments(&data);
        assert_eq!(first.chunk_count, 4);

        let last = data.len() - 1;
        data[last] = 8;
        let second = compute_commitments(&data);
        assert_ne!(first.root, second.root);
    }

    #[test]
    fn test_deterministic() {
        let data = vec![1u8; CHUNK_SIZE + 1];
        assert_eq!(compute_commitments(&data), compute_commitments(&data));
    }
}
