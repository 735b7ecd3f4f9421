//! Closed-world type system consumed by the vtable engine.
//!
//! The vtable engine does not load binaries itself; it reads type and method declarations
//! through the [`TypeUniverse`] trait. This module defines that seam together with the value
//! types flowing through it, and ships [`TypeRegistry`], an in-memory universe for a closed set
//! of modules that a loader (or a test) populates through [`TypeBuilder`].
//!
//! # Key Components
//!
//! - [`TypeIdentity`]: Structural handle for a type definition, reference or generic instance
//! - [`TypeDefinition`]: Owned view of a `TypeDef` row (base, interfaces, methods)
//! - [`TypeUniverse`]: Read-only queries and resolution over the loaded modules
//! - [`TypeRegistry`]: Thread-safe in-memory [`TypeUniverse`] implementation
//! - [`TypeBuilder`] / [`MethodBuilder`]: Fluent declaration of types and methods
//!
//! # Examples
//!
//! ```rust
//! use dotvtable::metadata::typesystem::{MethodBuilder, TypeBuilder, TypeRegistry, TypeUniverse};
//!
//! let registry = TypeRegistry::new();
//! let shape = TypeBuilder::class("Geometry", "Shape")
//!     .method(MethodBuilder::virtual_method("Area"))
//!     .build(&registry)?;
//!
//! let methods = registry.declared_virtual_methods(&shape)?;
//! assert_eq!(methods.len(), 1);
//! # Ok::<(), dotvtable::Error>(())
//! ```

mod builder;
mod registry;
mod universe;

use std::{
    fmt,
    sync::{Arc, OnceLock},
};

pub use builder::{MethodBuilder, TypeBuilder};
pub use registry::TypeRegistry;
pub use universe::TypeUniverse;

use crate::{
    metadata::{signatures::TypeSignature, token::Token},
    Error::TypeInsert,
    Result,
};

/// Reference to a `TypeDefinition`
pub type TypeDefinitionRc = Arc<TypeDefinition>;

#[allow(non_snake_case)]
/// Type attribute flag constants for `TypeDef` entries (§II.23.1.15).
///
/// Only the visibility, semantics and inheritance bits are named here; they are the ones
/// that influence virtual dispatch or are useful when declaring types through
/// [`TypeBuilder`].
pub mod TypeAttributes {
    /// Mask for extracting type visibility information.
    pub const VISIBILITY_MASK: u32 = 0x0000_0007;

    /// Type has no public scope (internal to assembly).
    pub const NOT_PUBLIC: u32 = 0x0000_0000;

    /// Type has public scope (visible outside assembly).
    pub const PUBLIC: u32 = 0x0000_0001;

    /// Mask for extracting class semantics information.
    pub const CLASS_SEMANTICS_MASK: u32 = 0x0000_0020;

    /// Type is a class (reference or value type).
    pub const CLASS: u32 = 0x0000_0000;

    /// Type is an interface definition.
    ///
    /// Methods declared on an interface never implement other interface methods by
    /// signature; they only form slots that implementing classes fill.
    pub const INTERFACE: u32 = 0x0000_0020;

    /// Class is abstract and cannot be instantiated directly.
    pub const ABSTRACT: u32 = 0x0000_0080;

    /// Class is sealed and cannot be inherited from.
    pub const SEALED: u32 = 0x0000_0100;

    /// Initialize the class any time before first static field access.
    pub const BEFORE_FIELD_INIT: u32 = 0x0010_0000;
}

/// Structural handle for a type as the vtable engine sees it
///
/// A `TypeIdentity` wraps the [`TypeSignature`] naming the type: `class <TypeDef>` for a
/// definition, `class <TypeRef>` for a reference that resolves to a definition, and
/// `class <TypeDef><args...>` for a generic instantiation. Equality and hashing are
/// structural, so two instantiations of the same definition with equal argument lists are
/// the same identity and can be used interchangeably as map keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeIdentity(TypeSignature);

impl TypeIdentity {
    /// Identity of a type definition or type reference
    ///
    /// ## Arguments
    /// * 'token' - `TypeDef` or `TypeRef` token
    #[must_use]
    pub fn definition(token: Token) -> Self {
        TypeIdentity(TypeSignature::Class(token))
    }

    /// Identity of a generic instantiation of `definition`
    ///
    /// ## Arguments
    /// * 'definition' - `TypeDef` or `TypeRef` token of the open generic type
    /// * 'args'       - The generic arguments, in parameter order
    #[must_use]
    pub fn instance(definition: Token, args: Vec<TypeSignature>) -> Self {
        TypeIdentity(TypeSignature::GenericInst(
            Box::new(TypeSignature::Class(definition)),
            args,
        ))
    }

    /// The signature naming this type
    #[must_use]
    pub fn signature(&self) -> &TypeSignature {
        &self.0
    }

    /// Consume the identity, returning the signature naming this type
    #[must_use]
    pub fn into_signature(self) -> TypeSignature {
        self.0
    }

    /// The `TypeDef` / `TypeRef` token this identity names, if it names one
    #[must_use]
    pub fn definition_token(&self) -> Option<Token> {
        self.0.type_token()
    }

    /// Generic arguments of this identity (empty unless it is a generic instance)
    #[must_use]
    pub fn generic_args(&self) -> &[TypeSignature] {
        match &self.0 {
            TypeSignature::GenericInst(_, args) => args,
            _ => &[],
        }
    }

    /// Returns `true` if this identity is a generic instantiation
    #[must_use]
    pub fn is_generic_instance(&self) -> bool {
        matches!(self.0, TypeSignature::GenericInst(..))
    }
}

impl From<TypeSignature> for TypeIdentity {
    fn from(signature: TypeSignature) -> Self {
        TypeIdentity(signature)
    }
}

impl From<TypeIdentity> for TypeSignature {
    fn from(identity: TypeIdentity) -> Self {
        identity.0
    }
}

impl fmt::Display for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owned view of a `TypeDef` row, limited to what virtual dispatch needs
pub struct TypeDefinition {
    /// Token
    pub token: Token,
    /// `TypeNamespace` (can be empty)
    pub namespace: String,
    /// `TypeName`
    pub name: String,
    /// Flags (a 4-byte bitmask of type `TypeAttributes`, §II.23.1.15)
    pub flags: u32,
    /// This types base aka 'extends'
    base: OnceLock<TypeIdentity>,
    /// All interfaces this type lists directly (`InterfaceImpl` rows), in declaration order
    pub interfaces: boxcar::Vec<TypeIdentity>,
    /// `MethodDef` tokens of all methods this type declares, in declaration order
    pub methods: boxcar::Vec<Token>,
    /// Number of generic parameters this type declares
    pub generic_param_count: u32,
}

impl TypeDefinition {
    /// Create a new instance of a `TypeDefinition`
    #[must_use]
    pub fn new(
        token: Token,
        namespace: String,
        name: String,
        flags: u32,
        base: Option<TypeIdentity>,
        generic_param_count: u32,
    ) -> Self {
        let base_lock = OnceLock::new();
        if let Some(base_value) = base {
            base_lock.set(base_value).ok();
        }

        TypeDefinition {
            token,
            namespace,
            name,
            flags,
            base: base_lock,
            interfaces: boxcar::Vec::new(),
            methods: boxcar::Vec::new(),
            generic_param_count,
        }
    }

    /// Access the base type of this type, if it exists
    #[must_use]
    pub fn base(&self) -> Option<&TypeIdentity> {
        self.base.get()
    }

    /// Set the base type, if it has not been set before
    ///
    /// ## Arguments
    /// * 'base' - The type this type extends
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeInsert`] if the base type was already set
    pub fn set_base(&self, base: TypeIdentity) -> Result<()> {
        self.base.set(base).map_err(|_| TypeInsert(self.token))
    }

    /// The identity of this (open) definition
    #[must_use]
    pub fn identity(&self) -> TypeIdentity {
        TypeIdentity::definition(self.token)
    }

    /// Returns `true` if this type is an interface
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.flags & TypeAttributes::CLASS_SEMANTICS_MASK == TypeAttributes::INTERFACE
    }

    /// Returns `true` if this type declares generic parameters
    #[must_use]
    pub fn is_generic(&self) -> bool {
        self.generic_param_count > 0
    }

    /// Returns the full name (Namespace.Name) of the entity
    #[must_use]
    pub fn fullname(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{0}.{1}", self.namespace, self.name)
        }
    }
}

impl fmt::Debug for TypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDefinition")
            .field("token", &self.token)
            .field("fullname", &self.fullname())
            .field("flags", &format_args!("0x{:08x}", self.flags))
            .field("base", &self.base())
            .field("interfaces", &self.interfaces.count())
            .field("methods", &self.methods.count())
            .field("generic_param_count", &self.generic_param_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_identity_structural_key() {
        let list = Token::new(0x02000003);
        let mut map = HashMap::new();
        map.insert(TypeIdentity::instance(list, vec![TypeSignature::I4]), 1);

        assert_eq!(
            map.get(&TypeIdentity::instance(list, vec![TypeSignature::I4])),
            Some(&1)
        );
        assert_eq!(
            map.get(&TypeIdentity::instance(list, vec![TypeSignature::String])),
            None
        );
        assert_eq!(map.get(&TypeIdentity::definition(list)), None);
    }

    #[test]
    fn test_identity_accessors() {
        let def = Token::new(0x02000003);
        let inst = TypeIdentity::instance(def, vec![TypeSignature::String]);

        assert!(inst.is_generic_instance());
        assert_eq!(inst.definition_token(), Some(def));
        assert_eq!(inst.generic_args(), &[TypeSignature::String]);

        let plain = TypeIdentity::definition(def);
        assert!(!plain.is_generic_instance());
        assert!(plain.generic_args().is_empty());

        let array = TypeIdentity::from(TypeSignature::SzArray(Default::default()));
        assert_eq!(array.definition_token(), None);
    }

    #[test]
    fn test_definition_base_once() {
        let ty = TypeDefinition::new(
            Token::new(0x02000002),
            "Demo".to_string(),
            "Derived".to_string(),
            TypeAttributes::PUBLIC,
            None,
            0,
        );
        assert!(ty.base().is_none());

        let base = TypeIdentity::definition(Token::new(0x02000001));
        ty.set_base(base.clone()).unwrap();
        assert_eq!(ty.base(), Some(&base));
        assert!(ty.set_base(base).is_err());
    }

    #[test]
    fn test_interface_flag() {
        let iface = TypeDefinition::new(
            Token::new(0x02000004),
            "Demo".to_string(),
            "IFoo".to_string(),
            TypeAttributes::PUBLIC | TypeAttributes::INTERFACE | TypeAttributes::ABSTRACT,
            None,
            0,
        );
        assert!(iface.is_interface());
        assert_eq!(iface.fullname(), "Demo.IFoo");
    }
}
