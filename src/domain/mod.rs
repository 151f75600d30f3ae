//! Domain layer: keys, paths and native values
//!
//! This layer is independent of external concerns (no I/O, no store access).

pub mod error;
pub mod key;
pub mod mac;
pub mod sxp;
pub mod value;

pub use error::{ConvertError, ConvertResult, DomainError};
pub use key::{check_key, child_path, is_valid_key_char, join_path, parse_path, split_path, SEPARATOR};
pub use mac::MacAddress;
pub use sxp::Sxp;
pub use value::{NodeValue, Record, Value};
