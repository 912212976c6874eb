use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tig_challenges::vector_search::{
    squared_euclidean_distance, Challenge, Difficulty, VECTOR_DIMS,
};

/// Number of database vectors kept around the query centroid. Tuned per
/// track, the breakpoints are empirical.
pub fn subset_size(difficulty: &Difficulty) -> usize {
    let num_queries = difficulty.num_queries;
    let better_than_baseline = difficulty.better_than_baseline;
    match num_queries {
        10..=19 => 4200,
        20..=28 if better_than_baseline <= 465 => 3000,
        20..=28 => 6000,
        29..=50 if better_than_baseline <= 480 => 2000,
        29..=45 => 6000,
        46..=50 => 5000,
        51..=70 => 3000,
        71..=100 if better_than_baseline <= 480 => 1500,
        71..=100 => 2500,
        _ => 1000,
    }
}

pub fn mean_vector<'a>(vectors: impl Iterator<Item = &'a [f32]>) -> Vec<f32> {
    let mut mean_vector = vec![0.0f32; VECTOR_DIMS];
    let mut num_vectors = 0usize;
    for vector in vectors {
        for (m, &x) in mean_vector.iter_mut().zip(vector) {
            *m += x;
        }
        num_vectors += 1;
    }
    if num_vectors > 0 {
        for m in mean_vector.iter_mut() {
            *m /= num_vectors as f32;
        }
    }
    mean_vector
}

#[derive(Debug, Clone, Copy)]
struct FloatOrd(f32);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// The `k` database vectors closest to the centroid of the queries, paired
/// with their database index and ordered nearest first.
///
/// A max-heap holds the current best `k`; its root is the worst of them and
/// is replaced whenever the scan finds a strictly closer vector.
pub fn filter_relevant_vectors(challenge: &Challenge, k: usize) -> Vec<(&[f32], usize)> {
    if k == 0 {
        return Vec::new();
    }
    let mean_query_vector = mean_vector(challenge.iter_queries());

    let mut heap: BinaryHeap<(FloatOrd, usize)> = BinaryHeap::with_capacity(k);
    for (index, vector) in challenge.iter_database().enumerate() {
        let dist = squared_euclidean_distance(&mean_query_vector, vector);
        if heap.len() < k {
            heap.push((FloatOrd(dist), index));
        } else if let Some(mut top) = heap.peek_mut() {
            if dist < top.0 .0 {
                *top = (FloatOrd(dist), index);
            }
        }
    }

    heap.into_sorted_vec()
        .into_iter()
        .map(|(_, index)| (challenge.database_vector(index), index))
        .collect()
}
