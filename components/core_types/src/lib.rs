//! Shared vocabulary for the conformance harness.
//!
//! This crate provides the value model that assertions compare, the error
//! kinds a subject under test can raise, and the property descriptor
//! record used by structural checks.
//!
//! # Overview
//!
//! - [`Value`] - Values observed from a subject under test
//! - [`ObjectId`] - Identity handle for composite values
//! - [`ThrownError`] - An error raised by the subject
//! - [`ErrorKind`] - Names of error constructors
//! - [`PropertyDescriptor`] - Attribute record of an own property
//!
//! # Examples
//!
//! ```
//! use core_types::{ErrorKind, ThrownError, Value};
//!
//! let num = Value::Number(42.0);
//! assert_eq!(num.type_of(), "number");
//!
//! let error = ThrownError::new(ErrorKind::RangeError, "out of range");
//! assert_eq!(error.to_string(), "RangeError: out of range");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod descriptor;
mod error;
mod value;

pub use descriptor::PropertyDescriptor;
pub use error::{ErrorKind, ThrownError};
pub use value::{ObjectId, Value};
