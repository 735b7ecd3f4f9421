//! # dotvtable Prelude
//!
//! The types needed to populate a type universe and query vtables, for glob import.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dotvtable operations
pub use crate::Error;

/// The result type used throughout dotvtable
pub use crate::Result;

// ================================================================================================
// Metadata
// ================================================================================================

/// Metadata token type for referencing table entries
pub use crate::metadata::token::Token;

/// Type and method signatures
pub use crate::metadata::signatures::{
    GenericSubstitution, SignatureMethod, SignatureParameter, SignatureSzArray, TypeSignature,
};

/// Methods and override directives
pub use crate::metadata::method::{MethodDefinition, MethodDefinitionRc, MethodReference};

/// Types, the universe seam and the in-memory registry
pub use crate::metadata::typesystem::{
    MethodBuilder, TypeAttributes, TypeBuilder, TypeDefinition, TypeDefinitionRc, TypeIdentity,
    TypeRegistry, TypeUniverse,
};

// ================================================================================================
// Virtual Dispatch Tables
// ================================================================================================

/// Vtable construction and queries
pub use crate::vtable::{
    Slot, SlotArena, SlotRef, VTable, VTableConfig, VTableSignature, VTableStorage,
};
