//! Object graph model for Xcode project documents.
//!
//! A project document is a graph of objects keyed by 24-character hex
//! identifiers. This crate provides:
//!
//! - [`id`]: identifiers and the pluggable strategies that generate them
//! - [`graph`]: the [`Graph`] arena, node kinds, per-kind field schemas,
//!   value types and display-comment derivation
//! - [`hash`]: content fingerprints for comparing graphs
//!
//! All links between objects are identifier values resolved through the
//! graph. Every mutation checks the references it introduces before it
//! changes anything, so a failed call leaves the graph as it was.

pub mod graph;
pub mod hash;
pub mod id;

pub use graph::comment::project_name_from_comment;
pub use graph::node::{Fields, Kind, Node};
pub use graph::schema::{field_spec, field_type, schema, FieldSpec, FieldType};
pub use graph::value::{Dict, Value};
pub use graph::{Archive, Checkpoint, Graph, GraphError};
pub use hash::{fingerprint, hash_hex, ContentHash};
pub use id::{IdGenerator, Identifier, RandomIds, SequentialIds};
