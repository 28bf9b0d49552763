//! Turn loosely typed tabular rows into the shapes a chart draws.
//!
//! Rows are typed by [`parse_dataset`] (inferring column types when none are
//! declared), then a [`Mapping`] of dataset columns onto a schema of
//! [`Dimension`]s is validated and compiled into a [`Mapper`] that extracts,
//! groups and aggregates them. [`DataPipeline`] chains both steps.
pub mod error;
pub mod pipeline;
pub mod prelude;

pub use error::TabulaError;
pub use pipeline::DataPipeline;

pub use tabula_common::{path, DataType, DataTypes, Decoder, NumberFormatOptions, Row, TypeName, Value};
pub use tabula_dataset::{
    dates, infer_types, infer_types_from_json, infer_value_type, parse_dataset, CoercionError,
    NumberParser, ParseResult, ParsingOptions, RowError, TabulaDatasetError,
};
pub use tabula_mapping::{
    aggregator_names, compile, default_dimension_aggregation, dimension_aggregator,
    register_aggregation, unregister_aggregation, Aggregation, AggregationDefault, Aggregator,
    AggregatorRegistry, Dimension, DimensionConfig, GroupNode, MappedData, MappedDimension, Mapper,
    Mapping, MappingCompiler, Operation, TabulaMappingError, ValidationErrors,
};
