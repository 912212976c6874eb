use crate::jsonify;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BenchmarkSettings {
    pub player_id: String,
    pub block_id: String,
    pub challenge_id: String,
    pub algorithm_id: String,
    pub difficulty: Vec<i32>,
}

impl BenchmarkSettings {
    /// Derives the eight stream seeds for one nonce.
    ///
    /// The blake3 hash of the canonical settings json yields four words. They
    /// are repeated to fill eight slots and every slot is xored with the nonce.
    pub fn calc_seeds(&self, nonce: u64) -> Result<[u64; 8]> {
        let hash: [u8; 32] = blake3::hash(jsonify(self)?.as_bytes()).into();
        let mut seeds = [0u64; 8];
        for (i, chunk) in hash.chunks_exact(8).enumerate() {
            let bytes: [u8; 8] = chunk
                .try_into()
                .map_err(|_| anyhow!("blake3 hash chunk is not 8 bytes"))?;
            let word = u64::from_le_bytes(bytes);
            seeds[i] = word ^ nonce;
            seeds[i + 4] = word ^ nonce;
        }
        Ok(seeds)
    }
}
