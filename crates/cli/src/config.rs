use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use rakeweight_core::Options;

pub const DEFAULT_CONFIG: &str = "rakeweight.toml";

/// Command line values that take precedence over the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct OptionOverrides {
    #[arg(long, value_delimiter = ',')]
    pub columns: Option<Vec<String>>,
    #[arg(long = "group-column")]
    pub group_column: Option<String>,
    #[arg(long = "goal-value")]
    pub goal_value: Option<String>,
    #[arg(long = "work-value")]
    pub work_value: Option<String>,
    #[arg(long = "max-iterations")]
    pub max_iterations: Option<usize>,
    #[arg(long = "lower-cap")]
    pub lower_cap: Option<f64>,
    #[arg(long = "upper-cap")]
    pub upper_cap: Option<f64>,
    #[arg(long)]
    pub rmse: Option<f64>,
    #[arg(long = "weight-column")]
    pub weight_column: Option<String>,
}

impl OptionOverrides {
    pub fn apply(&self, mut options: Options) -> Options {
        if let Some(columns) = &self.columns {
            options.columns = columns.clone();
        }
        if let Some(column) = &self.group_column {
            options.group_column = column.clone();
        }
        if let Some(value) = &self.goal_value {
            options.goal_group_value = value.clone();
        }
        if let Some(value) = &self.work_value {
            options.work_group_value = value.clone();
        }
        if let Some(max) = self.max_iterations {
            options.max_iterations = max;
        }
        if let Some(lower) = self.lower_cap {
            options.lower_weight_cap = lower;
        }
        if let Some(upper) = self.upper_cap {
            options.upper_weight_cap = upper;
        }
        if let Some(rmse) = self.rmse {
            options.root_mean_square_error = rmse;
        }
        if let Some(column) = &self.weight_column {
            options.weight_column = column.clone();
        }
        options
    }
}

/// Loads options from `path`. A missing default config yields the defaults;
/// a missing explicit config is an error.
pub fn load_options(path: &Path, explicit: bool) -> Result<Options> {
    if !path.exists() {
        if explicit {
            bail!("config {} does not exist", path.display());
        }
        return Ok(Options::default());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    parse_options(path, &contents)
}

fn parse_options(path: &Path, contents: &str) -> Result<Options> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => Options::from_json_str(contents)
            .map_err(|e| anyhow!("invalid config {}: {e}", path.display())),
        _ => toml::from_str(contents)
            .map_err(|e| anyhow!("invalid config {}: {e}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn toml_config_loads_with_defaults() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "columns = [\"D1\", \"D2\"]").unwrap();
        writeln!(file, "group_column = \"hType\"").unwrap();
        writeln!(file, "goal_group_value = \"1\"").unwrap();
        writeln!(file, "work_group_value = \"2\"").unwrap();
        writeln!(file, "upper_weight_cap = 4.0").unwrap();
        let options = load_options(file.path(), true).unwrap();
        assert_eq!(options.columns, vec!["D1", "D2"]);
        assert_eq!(options.group_column, "hType");
        assert_eq!(options.upper_weight_cap, 4.0);
        assert_eq!(options.max_iterations, 50);
        options.validate().unwrap();
    }

    #[test]
    fn json_config_loads() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"columns":["W1"],"group_column":"G","goal_group_value":"a","work_group_value":"b","max_iterations":7}}"#
        )
        .unwrap();
        let options = load_options(file.path(), true).unwrap();
        assert_eq!(options.columns, vec!["W1"]);
        assert_eq!(options.max_iterations, 7);
    }

    #[test]
    fn missing_config_depends_on_explicitness() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG);
        assert_eq!(load_options(&path, false).unwrap(), Options::default());
        assert!(load_options(&path, true).is_err());
    }

    #[test]
    fn invalid_config_is_reported() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "columns = 3").unwrap();
        let err = load_options(file.path(), true).unwrap_err();
        assert!(err.to_string().contains("invalid config"));
    }

    #[test]
    fn overrides_take_precedence() {
        let overrides = OptionOverrides {
            columns: Some(vec!["A".to_string(), "B".to_string()]),
            group_column: Some("G".to_string()),
            goal_value: Some("1".to_string()),
            work_value: Some("2".to_string()),
            max_iterations: Some(3),
            lower_cap: Some(0.5),
            upper_cap: Some(2.0),
            rmse: Some(1e-3),
            weight_column: Some("w".to_string()),
        };
        let options = overrides.apply(Options::default());
        assert_eq!(options.columns, vec!["A", "B"]);
        assert_eq!(options.max_iterations, 3);
        assert_eq!(options.caps().lower, 0.5);
        assert_eq!(options.caps().upper, 2.0);
        assert_eq!(options.root_mean_square_error, 1e-3);
        assert_eq!(options.weight_column, "w");
        options.validate().unwrap();

        let untouched = OptionOverrides::default().apply(Options::default());
        assert_eq!(untouched, Options::default());
    }
}
