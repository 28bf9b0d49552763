pub mod dates;
pub mod error;
pub mod inference;
pub mod number;
pub mod options;
pub mod parser;

pub use error::{CoercionError, TabulaDatasetError};
pub use inference::{infer_types, infer_types_from_json, infer_value_type, TypeInferrer};
pub use number::NumberParser;
pub use options::ParsingOptions;
pub use parser::{build_row_parser, parse_dataset, ParseResult, RowError, RowParser};
