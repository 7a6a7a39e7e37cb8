use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{RakeError, Result};
use crate::hypercube::{HyperCube, Phase};
use crate::options::DEFAULT_WEIGHT;

/// Weight derived for one respondent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinalWeight {
    /// False for respondents outside the work group.
    pub weighted: bool,
    /// Weight before curbing.
    pub raw: f64,
    pub weight: f64,
    pub curbed: bool,
}

impl FinalWeight {
    fn unweighted() -> Self {
        Self {
            weighted: false,
            raw: DEFAULT_WEIGHT,
            weight: DEFAULT_WEIGHT,
            curbed: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub goal_rows: usize,
    pub work_rows: usize,
    pub iterations: usize,
    pub rmse: f64,
    pub average_weight: f64,
    pub design_effect: f64,
    pub effective_base_size: f64,
    pub curbed_percentage: f64,
    pub min_weight: f64,
    pub max_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueReport {
    pub value: String,
    pub index: usize,
    pub initial: usize,
    pub goal_sum: f64,
    pub work_sum: f64,
    pub weight: f64,
    pub rmse: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionReport {
    pub column: String,
    pub size: usize,
    pub initial: usize,
    pub goal_sum: f64,
    pub work_sum: f64,
    pub rmse: f64,
    pub values: Vec<ValueReport>,
}

impl HyperCube {
    fn require_raked(&self) -> Result<()> {
        if self.phase == Phase::Raked {
            Ok(())
        } else {
            Err(RakeError::InvalidState("weights are only available after raking"))
        }
    }

    /// Final weight of `respondent_id`; respondents outside the work group
    /// are reported as not weighted with the default weight.
    pub fn final_weight(&self, respondent_id: &str) -> Result<FinalWeight> {
        self.require_raked()?;
        match self.work_rows.get(respondent_id) {
            Some(values) => self.weigh(values),
            None => Ok(FinalWeight::unweighted()),
        }
    }

    fn weigh(&self, values: &[String]) -> Result<FinalWeight> {
        let index = self.registry.cell_index_aligned(values)?;
        // not divided by the average weight
        let raw = (self.cube.workspace()[index] * self.work_row_count as f64)
            / (self.cube.initspace()[index] * self.goal_rows as f64);
        let (weight, curbed) = self.options.caps().curb(raw);
        Ok(FinalWeight {
            weighted: true,
            raw,
            weight,
            curbed,
        })
    }

    /// Raked mass per initial row of the respondent's cell, before the
    /// population scaling applied by [`final_weight`](Self::final_weight).
    pub fn raked_share(&self, respondent_id: &str) -> Result<Option<f64>> {
        self.require_raked()?;
        match self.work_rows.get(respondent_id) {
            Some(values) => {
                let index = self.registry.cell_index_aligned(values)?;
                Ok(Some(
                    self.cube.workspace()[index] / self.cube.initspace()[index],
                ))
            }
            None => Ok(None),
        }
    }

    /// Final weights of every work respondent in ingestion order.
    pub fn weights(&self) -> Result<IndexMap<String, f64>> {
        let finals = self.final_weights()?;
        Ok(self.weight_map(&finals))
    }

    /// Smallest and largest weight before curbing, seeded with the default
    /// weight.
    pub fn weight_range(&self) -> Result<WeightRange> {
        Ok(raw_range(&self.final_weights()?))
    }

    /// Rebuilds the weighted marginals from the final weights and computes the
    /// sample-quality statistics. Goal rows count with weight 1.0 in the grand
    /// totals.
    pub fn compute_statistics(&mut self) -> Result<Stats> {
        let finals = self.final_weights()?;
        Ok(self.statistics(&finals))
    }

    /// Weights and statistics from a single derivation pass.
    pub(crate) fn weights_and_statistics(&mut self) -> Result<(IndexMap<String, f64>, Stats)> {
        let finals = self.final_weights()?;
        let stats = self.statistics(&finals);
        Ok((self.weight_map(&finals), stats))
    }

    /// Final weight per work respondent, aligned with `work_rows`.
    fn final_weights(&self) -> Result<Vec<FinalWeight>> {
        self.require_raked()?;
        self.work_rows
            .values()
            .map(|values| self.weigh(values))
            .collect()
    }

    fn weight_map(&self, finals: &[FinalWeight]) -> IndexMap<String, f64> {
        self.work_rows
            .keys()
            .zip(finals)
            .map(|(respondent, fw)| (respondent.clone(), fw.weight))
            .collect()
    }

    fn statistics(&mut self, finals: &[FinalWeight]) -> Stats {
        for dimension in self.registry.dimensions_mut() {
            dimension.work_sum = 0.0;
            for value in dimension.values.values_mut() {
                value.work_sum = 0.0;
            }
        }

        let mut count = 0usize;
        let mut curbed = 0usize;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for (values, fw) in self.work_rows.values().zip(finals) {
            for (dimension, value) in self.registry.dimensions_mut().iter_mut().zip(values) {
                dimension.work_sum += fw.weight;
                if let Some(entry) = dimension.values.get_mut(value.as_str()) {
                    entry.work_sum += fw.weight;
                }
            }
            if fw.weighted {
                if fw.curbed {
                    curbed += 1;
                }
                sum += fw.weight;
                sum_sq += fw.weight.powi(2);
                count += 1;
            }
        }

        let goal = self.goal_rows as f64;
        let grand_sum = sum + goal;
        let grand_sum_sq = sum_sq + goal;
        let grand_count = count + self.goal_rows;

        let average_weight = if count > 0 {
            sum / count as f64
        } else {
            DEFAULT_WEIGHT
        };
        let design_effect = if grand_sum > 0.0 {
            grand_count as f64 * (grand_sum_sq / grand_sum.powi(2))
        } else {
            DEFAULT_WEIGHT
        };
        let effective_base_size = if sum_sq > 0.0 {
            sum.powi(2) / sum_sq
        } else {
            0.0
        };
        let curbed_percentage = if count > 0 {
            (100.0 * curbed as f64) / count as f64
        } else {
            0.0
        };
        let range = raw_range(finals);

        Stats {
            goal_rows: self.goal_rows,
            work_rows: self.work_row_count,
            iterations: self.iterations,
            rmse: self.rmse,
            average_weight,
            design_effect,
            effective_base_size,
            curbed_percentage,
            min_weight: range.min,
            max_weight: range.max,
        }
    }

    /// Per-dimension view of goal sums and the current work sums, in
    /// configured column order.
    pub fn dimension_report(&self) -> Vec<DimensionReport> {
        self.registry
            .dimensions()
            .iter()
            .map(|dimension| DimensionReport {
                column: dimension.column.clone(),
                size: dimension.size(),
                initial: dimension.initial,
                goal_sum: dimension.values().map(|(_, v)| v.goal_sum).sum(),
                work_sum: dimension.work_sum,
                rmse: dimension.error.rmse(),
                values: dimension
                    .values()
                    .map(|(value, v)| ValueReport {
                        value: value.to_string(),
                        index: v.index,
                        initial: v.initial,
                        goal_sum: v.goal_sum,
                        work_sum: v.work_sum,
                        weight: v.weight,
                        rmse: v.error.rmse(),
                    })
                    .collect(),
            })
            .collect()
    }
}

fn raw_range(finals: &[FinalWeight]) -> WeightRange {
    finals.iter().fold(
        WeightRange {
            min: DEFAULT_WEIGHT,
            max: DEFAULT_WEIGHT,
        },
        |range, fw| WeightRange {
            min: range.min.min(fw.raw),
            max: range.max.max(fw.raw),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use crate::response::Response;

    fn response(id: &str, d1: &str, group: &str) -> Response {
        Response::new(id).with_value("D1", d1).with_value("G", group)
    }

    fn raked(options: Options, responses: &[Response]) -> HyperCube {
        let mut cube = HyperCube::new(options).unwrap();
        cube.discover(responses).unwrap();
        cube.ingest(responses).unwrap();
        cube.rake().unwrap();
        cube
    }

    #[test]
    fn weights_need_a_raked_cube() {
        let cube = HyperCube::new(Options::new(["D1"], "G", "1", "2")).unwrap();
        assert!(cube.weights().is_err());
        assert!(cube.final_weight("a").is_err());
    }

    #[test]
    fn goal_respondents_are_not_weighted() {
        let cube = raked(
            Options::new(["D1"], "G", "1", "2"),
            &[response("a", "x", "2"), response("b", "x", "1")],
        );
        let fw = cube.final_weight("b").unwrap();
        assert!(!fw.weighted);
        assert_eq!(fw.weight, 1.0);
        assert_eq!(cube.raked_share("b").unwrap(), None);
        let weights = cube.weights().unwrap();
        assert_eq!(weights.len(), 1);
        assert!(!weights.contains_key("b"));
    }

    #[test]
    fn curbed_weights_and_raw_range() {
        // x: 1 work vs 9 goal, y: 9 work vs 1 goal
        let mut responses = vec![response("w0", "x", "2")];
        for i in 1..10 {
            responses.push(response(&format!("w{i}"), "y", "2"));
        }
        for i in 0..9 {
            responses.push(response(&format!("g{i}"), "x", "1"));
        }
        responses.push(response("g9", "y", "1"));

        let mut cube = raked(Options::new(["D1"], "G", "1", "2"), &responses);
        assert_eq!(cube.iterations, 3);

        let x = cube.final_weight("w0").unwrap();
        assert!(x.curbed);
        assert_eq!(x.weight, 5.0);
        assert!((x.raw - 9.0).abs() < 1e-9);
        let y = cube.final_weight("w1").unwrap();
        assert!(y.curbed);
        assert_eq!(y.weight, 0.3);

        let range = cube.weight_range().unwrap();
        assert!((range.min - 1.0 / 9.0).abs() < 1e-9);
        assert!((range.max - 9.0).abs() < 1e-9);

        let stats = cube.compute_statistics().unwrap();
        assert_eq!(stats.curbed_percentage, 100.0);
        assert_eq!(stats.work_rows, 10);
        assert_eq!(stats.goal_rows, 10);
        assert!((stats.average_weight - (5.0 + 9.0 * 0.3) / 10.0).abs() < 1e-12);
    }

    #[test]
    fn statistics_rebuild_weighted_marginals() {
        let responses = vec![
            response("a", "x", "2"),
            response("b", "x", "2"),
            response("c", "x", "1"),
        ];
        let mut cube = raked(Options::new(["D1"], "G", "1", "2"), &responses);
        let stats = cube.compute_statistics().unwrap();
        assert_eq!(stats.average_weight, 1.0);
        assert_eq!(stats.effective_base_size, 2.0);
        // grand totals: 2 work rows of 1.0 plus 1 goal row
        assert!((stats.design_effect - 1.0).abs() < 1e-12);
        assert_eq!(stats.min_weight, 1.0);
        assert_eq!(stats.max_weight, 1.0);

        let report = cube.dimension_report();
        assert_eq!(report[0].work_sum, 2.0);
        assert_eq!(report[0].goal_sum, 1.0);
        assert_eq!(report[0].values[0].work_sum, 2.0);
        assert_eq!(report[0].values[0].initial, 2);
    }

    #[test]
    fn single_pass_matches_individual_queries() {
        let responses = vec![
            response("a", "x", "2"),
            response("b", "y", "2"),
            response("c", "y", "2"),
            response("d", "x", "1"),
            response("e", "x", "1"),
            response("f", "y", "1"),
        ];
        let mut combined = raked(Options::new(["D1"], "G", "1", "2"), &responses);
        let mut separate = combined.clone();
        let (weights, stats) = combined.weights_and_statistics().unwrap();
        assert_eq!(weights, separate.weights().unwrap());
        assert_eq!(stats, separate.compute_statistics().unwrap());
        let range = separate.weight_range().unwrap();
        assert_eq!((stats.min_weight, stats.max_weight), (range.min, range.max));
    }

    #[test]
    fn empty_work_group_yields_defaults() {
        let mut cube = raked(Options::new(["D1"], "G", "1", "2"), &[response("g", "x", "1")]);
        assert_eq!(cube.iterations, 1);
        let stats = cube.compute_statistics().unwrap();
        assert_eq!(stats.work_rows, 0);
        assert_eq!(stats.average_weight, 1.0);
        assert_eq!(stats.design_effect, 1.0);
        assert_eq!(stats.effective_base_size, 0.0);
        assert_eq!(stats.curbed_percentage, 0.0);
        assert!(cube.weights().unwrap().is_empty());
    }
}
