use std::fmt;
use thiserror::Error;

/// Every violation found while validating a mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }

    pub fn into_result(self) -> Result<(), TabulaMappingError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(TabulaMappingError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("\n"))
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TabulaMappingError {
    #[error("Invalid dimensions: {0}")]
    Schema(String),

    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("Aggregator \"{0}\" is not registered")]
    UnknownAggregator(String),

    #[error("Compile error: {0}")]
    Compile(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
