use crate::error::TabulaError;
use tabula_common::value::rows_from_json;
use tabula_common::{DataTypes, Row};
use tabula_dataset::{parse_dataset, ParseResult, ParsingOptions, RowError};
use tabula_mapping::{Dimension, MappedData, Mapper, Mapping, MappingCompiler};

/// A parsed dataset ready to be mapped onto dimension schemas.
///
/// The raw rows are kept so that declaring new column types re-parses the
/// input rows rather than already coerced values.
#[derive(Debug, Clone)]
pub struct DataPipeline {
    raw: Vec<Row>,
    options: ParsingOptions,
    parsed: ParseResult,
    compiler: MappingCompiler,
}

impl DataPipeline {
    /// Parse `rows`, inferring one type per column
    pub fn from_rows(rows: Vec<Row>, options: ParsingOptions) -> Result<Self, TabulaError> {
        let parsed = parse_dataset(&rows, None, &options)?;
        Ok(Self {
            raw: rows,
            options,
            parsed,
            compiler: MappingCompiler::new(),
        })
    }

    /// Parse a JSON array of row objects; entries that are not objects are skipped
    pub fn from_json_str(input: &str, options: ParsingOptions) -> Result<Self, TabulaError> {
        let value: serde_json::Value = serde_json::from_str(input)?;
        Self::from_rows(rows_from_json(value), options)
    }

    /// Compile mappings against a specific aggregator registry
    pub fn with_compiler(mut self, compiler: MappingCompiler) -> Self {
        self.compiler = compiler;
        self
    }

    /// Re-parse the raw rows with declared column types
    pub fn with_data_types(mut self, data_types: DataTypes) -> Result<Self, TabulaError> {
        self.parsed = parse_dataset(&self.raw, Some(&data_types), &self.options)?;
        Ok(self)
    }

    pub fn dataset(&self) -> &[Row] {
        &self.parsed.dataset
    }

    pub fn data_types(&self) -> &DataTypes {
        &self.parsed.data_types
    }

    pub fn errors(&self) -> &[RowError] {
        &self.parsed.errors
    }

    pub fn parse_result(&self) -> &ParseResult {
        &self.parsed
    }

    pub fn options(&self) -> &ParsingOptions {
        &self.options
    }

    /// Validate `mapping` against the held column types and compile it
    pub fn compile(
        &self,
        dimensions: &[Dimension],
        mapping: &Mapping,
    ) -> Result<Mapper, TabulaError> {
        Ok(self
            .compiler
            .compile(dimensions, mapping, Some(&self.parsed.data_types))?)
    }

    /// Compile `mapping` and run it over the held dataset
    #[tracing::instrument(skip_all, fields(rows = self.parsed.dataset.len()))]
    pub fn map(&self, dimensions: &[Dimension], mapping: &Mapping) -> Result<MappedData, TabulaError> {
        if !self.parsed.errors.is_empty() {
            tracing::debug!(
                rows_with_errors = self.parsed.errors.len(),
                "mapping a dataset with coercion errors"
            );
        }
        let mapper = self.compile(dimensions, mapping)?;
        Ok(mapper.map(&self.parsed.dataset)?)
    }
}
