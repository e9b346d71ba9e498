//! Tree representation and its serialized form.

pub mod schema;
pub mod tree;

pub use schema::{
    DensitySchema, GaussianSchema, NodeSchema, QuestionSchema, SchemaError, StreamSchema,
    TreeSchema, SCHEMA_VERSION,
};
pub use tree::{ClusterTree, NodeId, NodeSeed, NodeState, NodeStats, TraversalOrder, NO_NODE};
