use serde::{Deserialize, Serialize};

use crate::error::{RakeError, Result};
use crate::hypercube::{HyperCube, Phase};
use crate::options::WeightCaps;
use crate::registry::{Dimension, SquaredError};

/// Cells are lifted to this mass before being rescaled.
pub const CELL_FLOOR: f64 = 1.0e-5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RakeOutcome {
    pub iterations: usize,
    pub rmse: f64,
    pub converged: bool,
}

impl HyperCube {
    /// Rescales the cube dimension by dimension until the RMSE between goal
    /// and work marginals drops to the configured threshold or the iteration
    /// cap is hit. Hitting the cap is not an error.
    pub fn rake(&mut self) -> Result<RakeOutcome> {
        match self.phase {
            Phase::Ingested => {}
            Phase::Discovering => {
                return Err(RakeError::InvalidState("rake called before ingest"));
            }
            Phase::Raked => return Err(RakeError::InvalidState("cube already raked")),
        }
        self.cube.seal();

        let caps = self.options.caps();
        let fallback = self.options.zero_work_adjustment;
        let threshold = self.options.root_mean_square_error;
        let mut outcome = RakeOutcome {
            iterations: 0,
            rmse: 0.0,
            converged: false,
        };

        let (workspace, members) = self.cube.split_mut();
        let dimensions = self.registry.dimensions_mut();
        while outcome.iterations < self.options.max_iterations {
            let mut dim_adjust = 1.0;
            let mut sweep = SquaredError::default();
            for (dimension, members) in dimensions.iter_mut().zip(members) {
                rake_dimension(
                    workspace,
                    members,
                    dimension,
                    caps,
                    fallback,
                    &mut dim_adjust,
                    &mut sweep,
                );
            }
            outcome.iterations += 1;
            outcome.rmse = sweep.rmse();
            tracing::debug!(
                iteration = outcome.iterations,
                rmse = outcome.rmse,
                dim_adjust,
                "raking sweep"
            );
            if outcome.rmse <= threshold {
                outcome.converged = true;
                break;
            }
        }

        self.iterations = outcome.iterations;
        self.rmse = outcome.rmse;
        self.phase = Phase::Raked;
        if outcome.converged {
            tracing::info!(
                iterations = outcome.iterations,
                rmse = outcome.rmse,
                "raking converged"
            );
        } else {
            tracing::warn!(
                iterations = outcome.iterations,
                rmse = outcome.rmse,
                threshold,
                "raking stopped at the iteration cap without converging"
            );
        }
        Ok(outcome)
    }
}

/// One column of a sweep. `members` is indexed by value ordinal; values
/// without work cells are left out of the totals and the error.
fn rake_dimension(
    workspace: &mut [f64],
    members: &[Vec<usize>],
    dimension: &mut Dimension,
    caps: WeightCaps,
    fallback: f64,
    dim_adjust: &mut f64,
    sweep: &mut SquaredError,
) {
    let mut goal_total = 0.0;
    let mut work_total = 0.0;
    for (value, cells) in dimension.values.values_mut().zip(members) {
        if cells.is_empty() {
            continue;
        }
        value.work_sum = cells.iter().map(|&cell| workspace[cell]).sum();
        value.weight = rescale(caps, value.goal_sum, value.work_sum, value.weight);
        work_total += value.work_sum;
        goal_total += value.goal_sum;
    }
    dimension.goal_sum = goal_total;
    dimension.work_sum = work_total;

    // accumulates across the columns of a sweep
    *dim_adjust *= dimension.adjustment(fallback);

    for (value, cells) in dimension.values.values_mut().zip(members) {
        if cells.is_empty() {
            continue;
        }
        let mut scaled = 0.0;
        for &cell in cells {
            let mass = &mut workspace[cell];
            if *mass < CELL_FLOOR {
                *mass = CELL_FLOOR;
            }
            *mass *= value.weight;
            scaled += *mass;
        }
        value.work_sum = if *dim_adjust > 0.0 {
            scaled / *dim_adjust
        } else {
            scaled
        };
        value.weight = rescale(caps, value.goal_sum, value.work_sum, value.weight);

        let squared = (value.goal_sum - value.work_sum).powi(2);
        value.error.add(squared);
        dimension.error.add(squared);
        sweep.add(squared);
    }
}

/// Curbed goal-to-work ratio. A value with neither goal nor work mass keeps
/// its previous weight.
fn rescale(caps: WeightCaps, goal: f64, work: f64, previous: f64) -> f64 {
    let ratio = goal / work;
    if ratio.is_nan() {
        previous
    } else {
        caps.curb(ratio).0
    }
}
