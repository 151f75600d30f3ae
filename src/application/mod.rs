//! Application layer: tree engine, converters and field bindings
//!
//! This layer orchestrates domain values and depends on the store boundary trait.

pub mod binding;
pub mod convert;
pub mod error;
pub mod tree;
pub mod tree_display;

pub use binding::{export_all, import_all, FieldBinding};
pub use convert::{Converter, ConverterRegistry, DEFAULT_TAG};
pub use error::{ApplicationError, ApplicationResult};
pub use tree::{Node, NodeId, SaveOptions, Tree};
pub use tree_display::TreeNodeConvert;
