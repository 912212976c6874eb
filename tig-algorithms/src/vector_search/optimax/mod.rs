mod filter;
mod kd_tree;
pub use filter::{filter_relevant_vectors, mean_vector, subset_size};
pub use kd_tree::{early_stopping_distance, nearest_neighbor_search, KDNode, KDTree};

use anyhow::Result;
use tig_challenges::vector_search::{Challenge, Solution};
use tracing::debug;

/// `None` when some query found no candidate and the solution was cleared.
pub fn solve_challenge(challenge: &Challenge) -> Result<Option<Solution>> {
    let mut solution = Solution::with_capacity(challenge.num_queries());
    if solve_challenge_into(challenge, &mut solution) {
        Ok(Some(solution))
    } else {
        Ok(None)
    }
}

/// Writes one database index per query into `solution`, reusing its buffer.
///
/// If any query finds no candidate the whole solution is cleared and `false`
/// is returned.
pub fn solve_challenge_into(challenge: &Challenge, solution: &mut Solution) -> bool {
    solution.indexes.clear();

    let k = subset_size(&challenge.difficulty);
    let mut relevant_vectors = filter_relevant_vectors(challenge, k);
    debug!(
        num_queries = challenge.num_queries(),
        better_than_baseline = challenge.difficulty.better_than_baseline,
        subset_size = relevant_vectors.len(),
        "filtered relevant vectors"
    );

    let kd_tree = KDTree::new(&mut relevant_vectors);
    for query in challenge.iter_queries() {
        match kd_tree.nearest_neighbor(query) {
            Some((_, index)) => solution.indexes.push(index),
            None => {
                solution.indexes.clear();
                return false;
            }
        }
    }
    true
}
