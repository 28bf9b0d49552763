use tabula_dataset::TabulaDatasetError;
use tabula_mapping::TabulaMappingError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TabulaError {
    #[error("Dataset error: {0}")]
    DatasetError(#[from] TabulaDatasetError),

    #[error("Mapping error: {0}")]
    MappingError(#[from] TabulaMappingError),

    #[error("Invalid JSON input: {0}")]
    JsonError(String),
}

impl From<serde_json::Error> for TabulaError {
    fn from(err: serde_json::Error) -> Self {
        TabulaError::JsonError(err.to_string())
    }
}
