use thiserror::Error;

#[derive(Error, Debug)]
pub enum RakeError {
    #[error("invalid group value {value:?} in column {column}")]
    InvalidGroupValue { column: String, value: String },
    #[error("unknown value {value:?} for column {column}")]
    UnknownCategoricalValue { column: String, value: String },
    #[error("cube too large: dimension sizes {sizes:?} overflow the cell index")]
    CubeTooLarge { sizes: Vec<usize> },
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
    #[error("serde json error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RakeError>;
