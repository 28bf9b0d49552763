pub use crate::error::TabulaError;
pub use crate::pipeline::DataPipeline;
pub use tabula_common::{DataType, DataTypes, Row, TypeName, Value};
pub use tabula_dataset::{ParseResult, ParsingOptions};
pub use tabula_mapping::{
    Aggregation, Dimension, MappedData, MappedDimension, Mapping, MappingCompiler, Operation,
};
