use crate::RngArray;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::{from_value, Map, Value};
use std::slice::ChunksExact;
use thiserror::Error;

pub const VECTOR_DIMS: usize = 250;
pub const DATABASE_SIZE: usize = 100_000;
pub const MAX_QUERIES: usize = 1000;

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct Difficulty {
    pub num_queries: u32,
    pub better_than_baseline: u32,
}

impl Difficulty {
    pub fn max_distance(&self) -> f32 {
        6.0 - (self.better_than_baseline as f32) / 1000.0
    }
}

impl TryFrom<Vec<i32>> for Difficulty {
    type Error = anyhow::Error;

    fn try_from(arr: Vec<i32>) -> Result<Self> {
        match arr.as_slice() {
            &[num_queries, better_than_baseline] if num_queries >= 0 && better_than_baseline >= 0 => {
                Ok(Self {
                    num_queries: num_queries as u32,
                    better_than_baseline: better_than_baseline as u32,
                })
            }
            _ => Err(anyhow!(
                "Invalid difficulty. Expected: [num_queries, better_than_baseline], Actual: {:?}",
                arr
            )),
        }
    }
}

impl From<Difficulty> for Vec<i32> {
    fn from(difficulty: Difficulty) -> Self {
        vec![
            difficulty.num_queries as i32,
            difficulty.better_than_baseline as i32,
        ]
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Solution {
    pub indexes: Vec<usize>,
}

impl Solution {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            indexes: Vec::with_capacity(capacity),
        }
    }
}

impl TryFrom<Map<String, Value>> for Solution {
    type Error = serde_json::Error;

    fn try_from(v: Map<String, Value>) -> Result<Self, Self::Error> {
        from_value(Value::Object(v))
    }
}

/// Why a solution was rejected. `code` is the value reported over the C ABI,
/// where 0 means the solution is valid.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum VerifyError {
    #[error("Invalid number of indexes. Expected: {expected}, Actual: {actual}")]
    WrongCount { expected: usize, actual: usize },
    #[error("Invalid index. Expected: less than {database_size}, Actual: {index}")]
    IndexOutOfBounds { index: usize, database_size: usize },
    #[error("Average query vector distance is '{avg_dist}'. Max dist: '{max_distance}'")]
    ThresholdExceeded { avg_dist: f32, max_distance: f32 },
}

impl VerifyError {
    pub fn code(&self) -> u32 {
        match self {
            VerifyError::WrongCount { .. } => 1,
            VerifyError::IndexOutOfBounds { .. } => 2,
            VerifyError::ThresholdExceeded { .. } => 3,
        }
    }
}

/// One vector search instance. Both buffers are row-major with
/// `VECTOR_DIMS` floats per row.
#[derive(Debug, Clone)]
pub struct Challenge {
    pub seeds: [u64; 8],
    pub difficulty: Difficulty,
    pub vector_database: Vec<f32>,
    pub query_vectors: Vec<f32>,
    pub max_distance: f32,
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    squared_euclidean_distance(a, b).sqrt()
}

pub fn squared_euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(&x1, &x2)| (x1 - x2) * (x1 - x2))
        .sum::<f32>()
}

impl Challenge {
    /// Allocates buffers large enough for any instance, so that
    /// `regenerate` never reallocates.
    pub fn allocate() -> Self {
        Self {
            seeds: [0; 8],
            difficulty: Difficulty {
                num_queries: 0,
                better_than_baseline: 0,
            },
            vector_database: vec![0.0; DATABASE_SIZE * VECTOR_DIMS],
            query_vectors: Vec::with_capacity(MAX_QUERIES * VECTOR_DIMS),
            max_distance: 6.0,
        }
    }

    pub fn generate_instance(seeds: [u64; 8], difficulty: &Difficulty) -> Result<Self> {
        let mut challenge = Self::allocate();
        challenge.regenerate(seeds, difficulty)?;
        Ok(challenge)
    }

    /// Overwrites this instance in place. The database is drawn before the
    /// queries, each row in dimension order.
    pub fn regenerate(&mut self, seeds: [u64; 8], difficulty: &Difficulty) -> Result<()> {
        let num_queries = difficulty.num_queries as usize;
        if num_queries == 0 || num_queries > MAX_QUERIES {
            return Err(anyhow!(
                "Unable to generate instance. num_queries must be in 1..={}, Actual: {}",
                MAX_QUERIES,
                num_queries
            ));
        }

        let mut rngs = RngArray::new(seeds);
        self.vector_database.resize(DATABASE_SIZE * VECTOR_DIMS, 0.0);
        rngs.fill_uniform(&mut self.vector_database, 0.0, 1.0);
        self.query_vectors.resize(num_queries * VECTOR_DIMS, 0.0);
        rngs.fill_uniform(&mut self.query_vectors, 0.0, 1.0);

        self.seeds = seeds;
        self.difficulty = *difficulty;
        self.max_distance = difficulty.max_distance();
        Ok(())
    }

    /// Builds an instance around caller supplied vectors. The database may
    /// have any number of rows.
    pub fn from_vectors(
        seeds: [u64; 8],
        difficulty: &Difficulty,
        vector_database: Vec<f32>,
        query_vectors: Vec<f32>,
    ) -> Result<Self> {
        if vector_database.len() % VECTOR_DIMS != 0 {
            return Err(anyhow!(
                "Database length {} is not a multiple of {}",
                vector_database.len(),
                VECTOR_DIMS
            ));
        }
        if query_vectors.len() != difficulty.num_queries as usize * VECTOR_DIMS {
            return Err(anyhow!(
                "Invalid number of query floats. Expected: {}, Actual: {}",
                difficulty.num_queries as usize * VECTOR_DIMS,
                query_vectors.len()
            ));
        }
        Ok(Self {
            seeds,
            difficulty: *difficulty,
            vector_database,
            query_vectors,
            max_distance: difficulty.max_distance(),
        })
    }

    pub fn num_queries(&self) -> usize {
        self.difficulty.num_queries as usize
    }

    pub fn database_size(&self) -> usize {
        self.vector_database.len() / VECTOR_DIMS
    }

    pub fn database_vector(&self, index: usize) -> &[f32] {
        &self.vector_database[index * VECTOR_DIMS..(index + 1) * VECTOR_DIMS]
    }

    pub fn query_vector(&self, index: usize) -> &[f32] {
        &self.query_vectors[index * VECTOR_DIMS..(index + 1) * VECTOR_DIMS]
    }

    pub fn iter_database(&self) -> ChunksExact<'_, f32> {
        self.vector_database.chunks_exact(VECTOR_DIMS)
    }

    pub fn iter_queries(&self) -> ChunksExact<'_, f32> {
        self.query_vectors.chunks_exact(VECTOR_DIMS)
    }

    pub fn verify_solution(&self, solution: &Solution) -> Result<f32, VerifyError> {
        self.verify_indexes(&solution.indexes)
    }

    /// Returns the average query distance when the solution is valid.
    pub fn verify_indexes(&self, indexes: &[usize]) -> Result<f32, VerifyError> {
        if indexes.len() != self.num_queries() {
            return Err(VerifyError::WrongCount {
                expected: self.num_queries(),
                actual: indexes.len(),
            });
        }

        let database_size = self.database_size();
        if let Some(&index) = indexes.iter().find(|&&index| index >= database_size) {
            return Err(VerifyError::IndexOutOfBounds {
                index,
                database_size,
            });
        }

        if indexes.is_empty() {
            return Ok(0.0);
        }
        let total_dist: f32 = self
            .iter_queries()
            .zip(indexes)
            .map(|(query, &index)| euclidean_distance(query, self.database_vector(index)))
            .sum();
        let avg_dist = total_dist / indexes.len() as f32;
        if avg_dist > self.max_distance {
            return Err(VerifyError::ThresholdExceeded {
                avg_dist,
                max_distance: self.max_distance,
            });
        }
        Ok(avg_dist)
    }
}
