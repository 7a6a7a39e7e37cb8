use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use rakeweight_core::{DimensionReport, Stats, WeightingResult};
use serde::Serialize;

#[derive(Serialize)]
struct StatsReport<'a> {
    stats: &'a Stats,
    dimensions: &'a [DimensionReport],
}

/// Writes weights as a JSON object for `.json` paths, otherwise as a
/// two-column delimited file.
pub fn write_weights(
    path: &Path,
    result: &WeightingResult,
    id_column: &str,
    weight_column: &str,
) -> Result<()> {
    if is_json(path) {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &result.weights)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        return Ok(());
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record([id_column, weight_column])?;
    for (respondent, weight) in &result.weights {
        writer.write_record([respondent.as_str(), weight.to_string().as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_stats(path: &Path, result: &WeightingResult) -> Result<()> {
    let report = StatsReport {
        stats: &result.stats,
        dimensions: &result.dimensions,
    };
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &report)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

pub fn summary_line(stats: &Stats) -> String {
    format!(
        "work_rows={} goal_rows={} iterations={} rmse={:.3e} avg_weight={:.4} deff={:.4} ebs={:.1} curbed={:.1}% weight_range=[{:.4}, {:.4}]",
        stats.work_rows,
        stats.goal_rows,
        stats.iterations,
        stats.rmse,
        stats.average_weight,
        stats.design_effect,
        stats.effective_base_size,
        stats.curbed_percentage,
        stats.min_weight,
        stats.max_weight,
    )
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rakeweight_core::{GroupedWeighter, Options, Response, Weighter};
    use serde_json::Value;
    use tempfile::tempdir;

    fn sample_result() -> WeightingResult {
        let responses = vec![
            Response::new("a").with_value("D1", "x").with_value("G", "2"),
            Response::new("b").with_value("D1", "x").with_value("G", "1"),
        ];
        GroupedWeighter::new(Options::new(["D1"], "G", "1", "2"))
            .unwrap()
            .weight(&responses)
            .unwrap()
    }

    #[test]
    fn csv_weights_have_a_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("weights.csv");
        write_weights(&path, &sample_result(), "rid", "weight").unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["rid,weight", "a,1"]);
    }

    #[test]
    fn json_weights_and_stats() {
        let dir = tempdir().unwrap();
        let weights_path = dir.path().join("weights.json");
        let stats_path = dir.path().join("stats.json");
        let result = sample_result();
        write_weights(&weights_path, &result, "rid", "weight").unwrap();
        write_stats(&stats_path, &result).unwrap();

        let weights: Value =
            serde_json::from_str(&std::fs::read_to_string(&weights_path).unwrap()).unwrap();
        assert_eq!(weights["a"], 1.0);
        let stats: Value =
            serde_json::from_str(&std::fs::read_to_string(&stats_path).unwrap()).unwrap();
        assert_eq!(stats["stats"]["work_rows"], 1);
        assert_eq!(stats["dimensions"][0]["values"][0]["value"], "x");
    }

    #[test]
    fn summary_mentions_counts() {
        let line = summary_line(&sample_result().stats);
        assert!(line.contains("work_rows=1"));
        assert!(line.contains("iterations=1"));
    }
}
