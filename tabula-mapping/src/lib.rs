pub mod aggregators;
pub mod compiler;
pub mod defaults;
pub mod dimension;
pub mod error;
pub mod grouping;
pub mod proxy;
pub mod validate;

pub use aggregators::{
    aggregator_names, default_registry, register_aggregation, unregister_aggregation,
    Aggregation, Aggregator, AggregatorRegistry,
};
pub use compiler::{compile, Mapper, MappingCompiler};
pub use defaults::{default_dimension_aggregation, dimension_aggregator};
pub use dimension::{
    AggregationDefault, Dimension, DimensionConfig, MappedDimension, Mapping, Operation,
};
pub use error::{TabulaMappingError, ValidationErrors};
pub use grouping::{GroupNode, MappedData};
pub use proxy::hydrate_proxies;
pub use validate::{validate_mapping, validate_schema};
