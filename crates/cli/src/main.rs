mod config;
mod input;
mod output;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use itertools::Itertools;
use rakeweight_core::{GroupedWeighter, HyperCube, Options, WeightingResult, Weighter};
use tracing_subscriber::EnvFilter;

use crate::config::{OptionOverrides, DEFAULT_CONFIG};
use crate::input::InputArgs;

#[derive(Parser, Debug)]
#[command(
    name = "rakeweight",
    version,
    about = "Survey respondent weighting by multi-dimensional raking"
)]
struct Cli {
    /// Options file (TOML, or JSON with a .json extension).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rake the work group towards the goal group and write weights.
    Weight {
        input: PathBuf,
        #[command(flatten)]
        read: InputArgs,
        #[command(flatten)]
        overrides: OptionOverrides,
        #[arg(long, default_value = "weights.csv")]
        out: PathBuf,
        #[arg(long = "stats-out")]
        stats_out: Option<PathBuf>,
        #[arg(long, action = ArgAction::SetTrue)]
        quiet: bool,
    },
    /// List the values of every configured column with work and goal counts.
    Dimensions {
        input: PathBuf,
        #[command(flatten)]
        read: InputArgs,
        #[command(flatten)]
        overrides: OptionOverrides,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let explicit = cli.config.is_some();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let file_options = config::load_options(&config_path, explicit)?;

    match cli.command {
        Commands::Weight {
            input,
            read,
            overrides,
            out,
            stats_out,
            quiet,
        } => {
            let options = overrides.apply(file_options);
            let result = run_weight(&input, &read, options, &out, stats_out.as_deref())?;
            if !quiet {
                println!("{}", output::summary_line(&result.stats));
            }
            Ok(())
        }
        Commands::Dimensions {
            input,
            read,
            overrides,
        } => {
            let options = overrides.apply(file_options);
            for line in describe_dimensions(&input, &read, options)? {
                println!("{line}");
            }
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_weight(
    input: &Path,
    read: &InputArgs,
    options: Options,
    out: &Path,
    stats_out: Option<&Path>,
) -> Result<WeightingResult> {
    let weighter = GroupedWeighter::new(options)?;
    let table = input::read_responses(input, read)?;
    tracing::info!(
        responses = table.responses.len(),
        input = %input.display(),
        "loaded responses"
    );
    let result = weighter.weight(&table.responses)?;
    output::write_weights(
        out,
        &result,
        &table.id_column,
        &weighter.options().weight_column,
    )?;
    if let Some(path) = stats_out {
        output::write_stats(path, &result)?;
    }
    Ok(result)
}

fn describe_dimensions(input: &Path, read: &InputArgs, options: Options) -> Result<Vec<String>> {
    let table = input::read_responses(input, read)?;
    let mut cube = HyperCube::new(options)?;
    cube.discover(&table.responses)?;
    cube.ingest(&table.responses)?;
    let mut lines = vec![format!(
        "work_rows={} goal_rows={} cells={}",
        cube.work_rows(),
        cube.goal_rows(),
        cube.cube().len()
    )];
    for dimension in cube.registry().dimensions() {
        let values = dimension
            .values()
            .map(|(value, v)| format!("{value} (work {}, goal {})", v.initial, v.goal_sum))
            .join(", ");
        lines.push(format!(
            "{} [{} values]: {}",
            dimension.column,
            dimension.size(),
            values
        ));
    }
    Ok(lines)
}
