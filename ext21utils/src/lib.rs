//!
//! # Ext21 Internal Utilities Crate
//!
//! Shared machinery used throughout the ext21 workspace:
//! address-compared shared pointers, error-helper traits,
//! multi-format serialization to and from file,
//! the [enumstr] string-paired-enum macro,
//! and dependency-ordering over graph-shaped data such as cell hierarchies.
//!

pub mod ptr;
pub use ptr::*;

pub mod ser;
pub use ser::*;

pub mod error;
pub use error::*;

pub mod dep_order;
pub use dep_order::*;

pub mod enumstr;
pub use enumstr::*;
