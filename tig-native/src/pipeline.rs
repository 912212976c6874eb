use crate::WorkspacePool;
use anyhow::Result;
use tig_algorithms::vector_search::optimax::solve_challenge_into;
use tig_challenges::vector_search::{Difficulty, Solution, VerifyError};
use tracing::{debug, error};

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub workspace_id: usize,
    pub solution: Solution,
    pub verdict: Result<f32, VerifyError>,
}

impl PipelineOutcome {
    /// 0 when valid, otherwise the verifier's failure code.
    pub fn code(&self) -> u32 {
        match &self.verdict {
            Ok(_) => 0,
            Err(e) => e.code(),
        }
    }
}

/// Generates, solves and verifies one instance inside a pooled workspace.
///
/// The workspace is released on return, including when generation fails.
pub fn run_pipeline(
    pool: &WorkspacePool,
    seeds: [u64; 8],
    difficulty: &Difficulty,
) -> Result<PipelineOutcome> {
    let mut lease = pool.acquire();
    let workspace_id = lease.id();
    let data = &mut *lease;

    if let Err(e) = data.challenge.regenerate(seeds, difficulty) {
        error!(workspace_id, "{}", e);
        return Err(e);
    }
    solve_challenge_into(&data.challenge, &mut data.solution);
    let verdict = data.challenge.verify_solution(&data.solution);
    debug!(workspace_id, ?verdict, "pipeline finished");

    Ok(PipelineOutcome {
        workspace_id,
        solution: data.solution.clone(),
        verdict,
    })
}
