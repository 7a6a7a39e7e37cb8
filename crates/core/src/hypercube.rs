use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::cube::Cube;
use crate::error::{RakeError, Result};
use crate::options::Options;
use crate::registry::{DimensionRegistry, FxIndexMap};
use crate::response::Response;
use crate::weights::{DimensionReport, Stats};

/// Where a [`HyperCube`] is in its single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Values are being registered; the cube is not allocated yet.
    Discovering,
    /// Block sizes are frozen and rows have been added to the cube.
    Ingested,
    /// The cube has been raked; weights can be derived.
    Raked,
}

/// Raking engine for one weighting run.
///
/// Runs in explicit phases: [`discover`](Self::discover) every response so the
/// value space is known, [`ingest`](Self::ingest) the same responses, then
/// [`rake`](Self::rake) and derive weights. An instance is not reusable
/// across runs.
#[derive(Debug, Clone)]
pub struct HyperCube {
    pub(crate) options: Options,
    pub(crate) registry: DimensionRegistry,
    pub(crate) cube: Cube,
    /// Raw values of work respondents, aligned with `options.columns`.
    pub(crate) work_rows: FxIndexMap<String, Vec<String>>,
    pub(crate) goal_rows: usize,
    pub(crate) work_row_count: usize,
    pub(crate) iterations: usize,
    pub(crate) rmse: f64,
    pub(crate) phase: Phase,
}

impl HyperCube {
    pub fn new(options: Options) -> Result<Self> {
        options.validate()?;
        let registry = DimensionRegistry::new(&options.columns);
        Ok(Self {
            options,
            registry,
            cube: Cube::default(),
            work_rows: FxIndexMap::default(),
            goal_rows: 0,
            work_row_count: 0,
            iterations: 0,
            rmse: 0.0,
            phase: Phase::Discovering,
        })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn registry(&self) -> &DimensionRegistry {
        &self.registry
    }

    pub fn cube(&self) -> &Cube {
        &self.cube
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn goal_rows(&self) -> usize {
        self.goal_rows
    }

    pub fn work_rows(&self) -> usize {
        self.work_row_count
    }

    /// Registers every configured column's value of every response.
    ///
    /// Columns a response does not carry are skipped here; ingestion reports
    /// them.
    pub fn discover(&mut self, responses: &[Response]) -> Result<()> {
        if self.phase != Phase::Discovering {
            return Err(RakeError::InvalidState(
                "values cannot be discovered after ingestion started",
            ));
        }
        for response in responses {
            for (column, name) in self.options.columns.iter().enumerate() {
                if let Some(value) = response.value(name) {
                    self.registry.register_value(column, value);
                }
            }
        }
        tracing::debug!(
            responses = responses.len(),
            sizes = ?self.registry.dimensions().iter().map(|d| d.size()).collect::<Vec<_>>(),
            "discovered dimension values"
        );
        Ok(())
    }

    /// Runs a full weighting pass over `responses`.
    pub fn weight(mut self, responses: &[Response]) -> Result<WeightingResult> {
        self.discover(responses)?;
        self.ingest(responses)?;
        self.rake()?;
        self.into_result()
    }

    /// Consumes a raked cube into weights, statistics and the dimension report.
    pub fn into_result(mut self) -> Result<WeightingResult> {
        let (weights, stats) = self.weights_and_statistics()?;
        let dimensions = self.dimension_report();
        tracing::info!(
            work_rows = stats.work_rows,
            goal_rows = stats.goal_rows,
            effective_base_size = stats.effective_base_size,
            design_effect = stats.design_effect,
            curbed_percentage = stats.curbed_percentage,
            "weighting finished"
        );
        Ok(WeightingResult {
            weights,
            stats,
            dimensions,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightingResult {
    /// Final weight per work respondent, in ingestion order.
    pub weights: IndexMap<String, f64>,
    pub stats: Stats,
    #[serde(default)]
    pub dimensions: Vec<DimensionReport>,
}

pub trait Weighter {
    fn weight(&self, responses: &[Response]) -> Result<WeightingResult>;
}

/// [`Weighter`] that rakes a work group towards a goal group selected by a
/// group column. Each call builds its own [`HyperCube`].
#[derive(Debug, Clone)]
pub struct GroupedWeighter {
    options: Options,
}

impl GroupedWeighter {
    pub fn new(options: Options) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }
}

impl Weighter for GroupedWeighter {
    fn weight(&self, responses: &[Response]) -> Result<WeightingResult> {
        HyperCube::new(self.options.clone())?.weight(responses)
    }
}
