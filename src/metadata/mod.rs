//! Metadata model consumed by the vtable engine.
//!
//! This module holds the owned, already-parsed view of .NET metadata that virtual dispatch
//! needs: tokens, type and method signatures, method definitions with their override
//! directives, and the type system seam ([`typesystem::TypeUniverse`]) through which the
//! engine reads a closed set of loaded modules.
//!
//! # Key Components
//!
//! - [`token`] - Metadata table row references used throughout .NET
//! - [`signatures`] - Type and method signatures, generic argument substitution
//! - [`method`] - Method definitions, dispatch flags and override directives
//! - [`typesystem`] - Type identities, type definitions and the in-memory registry

/// Method definitions, flags and explicit override directives
pub mod method;
/// Type and method signatures together with generic substitution
pub mod signatures;
/// Metadata tokens
pub mod token;
/// Type identities, definitions and the type universe
pub mod typesystem;
