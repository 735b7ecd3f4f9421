//! Method and type signatures as seen by virtual dispatch.
//!
//! This module holds the structural representation of ECMA-335 signatures (§II.23.2) that the
//! vtable engine compares when matching overrides. Signatures are plain values: they derive
//! `Eq`, `Hash` and `Ord` so they can serve directly as map keys, and they carry no references
//! into the type universe other than metadata tokens.
//!
//! # Key Components
//!
//! - [`TypeSignature`] - A type appearing in a signature (primitives, classes, generic instances, ...)
//! - [`SignatureMethod`] - Calling convention, return type and parameters of a method
//! - [`GenericSubstitution`] - Replaces `!n` generic parameters with instantiation arguments
//!
//! # Examples
//!
//! ```rust
//! use dotvtable::metadata::signatures::{SignatureMethod, TypeSignature};
//!
//! let get = SignatureMethod::instance(TypeSignature::GenericParamType(0), vec![]);
//! assert_eq!(get.to_string(), "instance !0()");
//! ```
//!
//! # References
//!
//! - ECMA-335 6th Edition, Partition II, Section 23.2 - Blobs and Signatures

mod generics;
mod types;

pub use generics::*;
pub use types::*;
