use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{RakeError, Result};

pub const DEFAULT_WEIGHT: f64 = 1.0;
pub const DEFAULT_ZERO_WORK_ADJUSTMENT: f64 = 10.0;
pub const DEFAULT_WEIGHT_COLUMN: &str = "weight";
pub const DEFAULT_MAX_ITERATIONS: usize = 50;
pub const DEFAULT_UPPER_WEIGHT_CAP: f64 = 5.0;
pub const DEFAULT_LOWER_WEIGHT_CAP: f64 = 0.3;
pub const DEFAULT_ROOT_MEAN_SQUARE_ERROR: f64 = 1.0e-6;

/// Weighting options.
///
/// `columns` order matters: it fixes the cube strides and the order in which
/// dimensions are raked within an iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub weight_column: String,
    pub max_iterations: usize,
    pub upper_weight_cap: f64,
    pub lower_weight_cap: f64,
    pub root_mean_square_error: f64,
    /// Dimension adjustment used when a raked column carries no work mass.
    pub zero_work_adjustment: f64,
    pub columns: Vec<String>,
    pub group_column: String,
    pub goal_group_value: String,
    pub work_group_value: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            weight_column: DEFAULT_WEIGHT_COLUMN.to_string(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            upper_weight_cap: DEFAULT_UPPER_WEIGHT_CAP,
            lower_weight_cap: DEFAULT_LOWER_WEIGHT_CAP,
            root_mean_square_error: DEFAULT_ROOT_MEAN_SQUARE_ERROR,
            zero_work_adjustment: DEFAULT_ZERO_WORK_ADJUSTMENT,
            columns: Vec::new(),
            group_column: String::new(),
            goal_group_value: String::new(),
            work_group_value: String::new(),
        }
    }
}

impl Options {
    pub fn new<I, S>(
        columns: I,
        group_column: impl Into<String>,
        goal_group_value: impl Into<String>,
        work_group_value: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            group_column: group_column.into(),
            goal_group_value: goal_group_value.into(),
            work_group_value: work_group_value.into(),
            ..Self::default()
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_json_slice(raw: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(raw)?)
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_weight_caps(mut self, lower: f64, upper: f64) -> Self {
        self.lower_weight_cap = lower;
        self.upper_weight_cap = upper;
        self
    }

    pub fn with_rmse_threshold(mut self, threshold: f64) -> Self {
        self.root_mean_square_error = threshold;
        self
    }

    pub fn with_zero_work_adjustment(mut self, adjustment: f64) -> Self {
        self.zero_work_adjustment = adjustment;
        self
    }

    pub fn with_weight_column(mut self, column: impl Into<String>) -> Self {
        self.weight_column = column.into();
        self
    }

    pub fn caps(&self) -> WeightCaps {
        WeightCaps {
            lower: self.lower_weight_cap,
            upper: self.upper_weight_cap,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(invalid("at least one column is required"));
        }
        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.as_str()) {
                return Err(invalid(format!("column {column} is listed twice")));
            }
        }
        if self.group_column.is_empty() {
            return Err(invalid("group_column must be set"));
        }
        if self.goal_group_value == self.work_group_value {
            return Err(invalid(format!(
                "goal and work group values must differ (both {:?})",
                self.goal_group_value
            )));
        }
        if self.max_iterations == 0 {
            return Err(invalid("max_iterations must be greater than zero"));
        }
        if !(self.root_mean_square_error.is_finite() && self.root_mean_square_error > 0.0) {
            return Err(invalid(format!(
                "root_mean_square_error must be positive, got {}",
                self.root_mean_square_error
            )));
        }
        if !(self.lower_weight_cap.is_finite() && self.upper_weight_cap.is_finite()) {
            return Err(invalid("weight caps must be finite"));
        }
        if self.lower_weight_cap > self.upper_weight_cap {
            return Err(invalid(format!(
                "lower_weight_cap {} exceeds upper_weight_cap {}",
                self.lower_weight_cap, self.upper_weight_cap
            )));
        }
        if self.lower_weight_cap > DEFAULT_WEIGHT || self.upper_weight_cap < DEFAULT_WEIGHT {
            tracing::warn!(
                lower = self.lower_weight_cap,
                upper = self.upper_weight_cap,
                "weight caps do not bracket 1.0"
            );
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> RakeError {
    RakeError::InvalidOptions(message.into())
}

/// Inclusive bounds every weight is curbed to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightCaps {
    pub lower: f64,
    pub upper: f64,
}

impl WeightCaps {
    /// Clamps `weight` into the caps, reporting whether it had to move.
    /// NaN curbs to the lower cap.
    pub fn curb(self, weight: f64) -> (f64, bool) {
        if weight.is_nan() || weight < self.lower {
            return (self.lower, true);
        }
        if weight > self.upper {
            return (self.upper, true);
        }
        (weight, false)
    }
}
