pub mod path;
pub mod types;
pub mod value;

pub use types::{DataType, DataTypes, Decoder, NumberFormatOptions, TypeName};
pub use value::{Row, Value};
