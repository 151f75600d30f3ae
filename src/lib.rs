//! xstree: typed object fields mirrored into a hierarchical key/value store
//!
//! A [`Tree`] caches a store subtree in memory and writes back only what
//! changed. [`FieldBinding`]s move attributes of a [`Record`] in and out of
//! that tree through named converters held by a [`ConverterRegistry`].
//!
//! Layers:
//! - [`domain`]: keys, values, MAC addresses, s-expressions
//! - [`application`]: tree engine, converters, bindings
//! - [`infrastructure`]: the [`Store`] boundary and its implementations
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod util;

pub use application::{
    export_all, import_all, ApplicationError, ApplicationResult, Converter, ConverterRegistry,
    FieldBinding, NodeId, SaveOptions, Tree, TreeNodeConvert,
};
pub use domain::{MacAddress, NodeValue, Record, Sxp, Value};
pub use infrastructure::{FsStore, MemoryStore, Store, StoreHandle};
