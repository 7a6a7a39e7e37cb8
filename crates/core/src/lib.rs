mod cube;
mod error;
mod hypercube;
mod ingest;
mod options;
mod rake;
mod registry;
mod response;
mod weights;

pub use cube::Cube;
pub use error::{RakeError, Result};
pub use hypercube::{GroupedWeighter, HyperCube, Phase, Weighter, WeightingResult};
pub use ingest::{classify, Group};
pub use options::{
    Options, WeightCaps, DEFAULT_LOWER_WEIGHT_CAP, DEFAULT_MAX_ITERATIONS,
    DEFAULT_ROOT_MEAN_SQUARE_ERROR, DEFAULT_UPPER_WEIGHT_CAP, DEFAULT_WEIGHT,
    DEFAULT_WEIGHT_COLUMN, DEFAULT_ZERO_WORK_ADJUSTMENT,
};
pub use rake::{RakeOutcome, CELL_FLOOR};
pub use registry::{Dimension, DimensionRegistry, DimensionValue, SquaredError};
pub use response::Response;
pub use weights::{DimensionReport, FinalWeight, Stats, ValueReport, WeightRange};
