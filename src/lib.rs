// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # dotvtable
//!
//! Virtual dispatch table construction for .NET type systems. Given a closed set of loaded
//! types, `dotvtable` computes for every type the ordered table of virtual method slots it
//! exposes, together with the slots it presents for each interface it implements. This is the
//! information a renamer or call-site rewriter needs to know which methods must keep a common
//! name, and which method a virtual or interface call actually dispatches to.
//!
//! ## Features
//!
//! - **Slot layout** - Newslot and reuse-slot semantics, `final` detection
//! - **Interface maps** - Implicit implementation by signature, inherited implementations,
//!   diamond interface hierarchies
//! - **Explicit overrides** - `.override` directives (`MethodImpl` rows) targeting interface
//!   or class methods, taking priority over signature matching
//! - **Generics** - Tables of generic instantiations are derived from the open definition by
//!   substitution, without re-running construction
//! - **Cycle detection** - Malformed inheritance graphs are reported, not looped on
//!
//! ## Quick Start
//!
//! ```rust
//! use dotvtable::prelude::*;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(TypeRegistry::new());
//! let base = TypeBuilder::class("Demo", "Base")
//!     .method(MethodBuilder::virtual_method("Foo"))
//!     .build(&registry)?;
//! let derived = TypeBuilder::class("Demo", "Derived")
//!     .extends(base.identity())
//!     .method(MethodBuilder::override_method("Foo"))
//!     .build(&registry)?;
//!
//! let mut storage = VTableStorage::new(registry.clone());
//! let table = storage.get_vtable(&derived.identity())?;
//!
//! // Both `Foo`s are in the log, the derived one overrides the base one
//! let derived_foo = registry.method_by_name(&derived.token, "Foo").unwrap();
//! let foo = MethodReference::new(derived.identity(), derived_foo.token);
//! let slots = table.find_slots(&*registry, &foo)?;
//! assert_eq!(slots.len(), 1);
//! assert_eq!(table.slot(slots[0]).unwrap().overrides, Some(table.slots()[0]));
//! # Ok::<(), dotvtable::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`metadata`] - The type system model: tokens, signatures, methods, types, and the
//!   [`metadata::typesystem::TypeUniverse`] trait through which loaded modules are read
//! - [`vtable`] - Slots, tables, the construction algorithm and the memoizing
//!   [`vtable::VTableStorage`]
//!
//! The library logs through the `log` facade and never installs a logger itself.

pub(crate) mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use dotvtable::prelude::*;
///
/// let registry = TypeRegistry::new();
/// let ty = TypeBuilder::class("Demo", "Widget").build(&registry)?;
/// assert_eq!(registry.get(&ty.token).unwrap().fullname(), "Demo.Widget");
/// # Ok::<(), dotvtable::Error>(())
/// ```
pub mod prelude;

/// Type system model consumed by vtable construction
///
/// # Key Components
///
/// - [`metadata::token`] - Metadata tokens for cross-references
/// - [`metadata::signatures`] - Type and method signatures, generic substitution
/// - [`metadata::method`] - Method definitions and override directives
/// - [`metadata::typesystem`] - Type identities, definitions, the universe seam and registry
pub mod metadata;

/// Virtual dispatch tables and their construction
pub mod vtable;

/// `dotvtable` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `dotvtable` Error type
///
/// # Examples
///
/// ```rust
/// use dotvtable::{prelude::*, Error};
/// use std::sync::Arc;
///
/// let registry = Arc::new(TypeRegistry::new());
/// let mut storage = VTableStorage::new(registry);
///
/// match storage.get_vtable(&TypeIdentity::definition(Token::new(0x02000042))) {
///     Err(Error::ResolutionError(token)) => println!("{} is not loaded", token),
///     Err(e) => println!("Error: {}", e),
///     Ok(_) => println!("Loaded"),
/// }
/// ```
pub use error::Error;
