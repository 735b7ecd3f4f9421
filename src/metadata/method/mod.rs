//! Method definitions and references as consumed by vtable construction.
//!
//! A [`MethodDefinition`] is the owned view of a `MethodDef` row: its name, signature,
//! dispatch flags and the explicit override directives (`MethodImpl` rows, the `.override`
//! directive in ILAsm) whose body is this method. A [`MethodReference`] names a method as seen
//! through a possibly generic declaring type, which is how override directives address their
//! targets (e.g. `IContainer<!0>::Get`).

mod types;

use std::{fmt, sync::Arc};

pub use types::*;

use crate::metadata::{signatures::SignatureMethod, token::Token, typesystem::TypeIdentity};

/// Reference to a `MethodDefinition`
pub type MethodDefinitionRc = Arc<MethodDefinition>;

/// A method, named through the type it is accessed on
///
/// The `declaring_type` may be a generic instantiation of the method's owner, in which case
/// the method's signature is read with that instantiation's arguments substituted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodReference {
    /// The type the method is accessed through (`TypeDef`, `TypeRef` or generic instance)
    pub declaring_type: TypeIdentity,
    /// The `MethodDef` or `MemberRef` token of the method
    pub method: Token,
}

impl MethodReference {
    /// Create a new method reference
    ///
    /// ## Arguments
    /// * '`declaring_type`' - The type the method is accessed through
    /// * 'method'           - The `MethodDef` or `MemberRef` token
    #[must_use]
    pub fn new(declaring_type: TypeIdentity, method: Token) -> Self {
        MethodReference {
            declaring_type,
            method,
        }
    }
}

/// Owned representation of a `MethodDef` row, limited to what virtual dispatch needs
pub struct MethodDefinition {
    /// Token
    pub token: Token,
    /// Name of the method
    pub name: String,
    /// `TypeDef` token of the type declaring this method
    pub declaring_type: Token,
    /// Vtable layout flags
    pub flags_vtable: MethodVtableFlags,
    /// Method modifiers (virtual, final, abstract, ...)
    pub flags_modifiers: MethodModifiers,
    /// The declared signature, in terms of the declaring type's generic parameters
    pub signature: SignatureMethod,
    /// Explicit override directives whose body is this method
    pub overrides: boxcar::Vec<MethodReference>,
}

impl MethodDefinition {
    /// Create a new method definition without override directives
    #[must_use]
    pub fn new(
        token: Token,
        name: String,
        declaring_type: Token,
        flags: u32,
        signature: SignatureMethod,
    ) -> Self {
        MethodDefinition {
            token,
            name,
            declaring_type,
            flags_vtable: MethodVtableFlags::from_method_flags(flags),
            flags_modifiers: MethodModifiers::from_method_flags(flags),
            signature,
            overrides: boxcar::Vec::new(),
        }
    }

    /// Method takes part in virtual dispatch
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.flags_modifiers.contains(MethodModifiers::VIRTUAL)
    }

    /// Method always introduces a new slot
    #[must_use]
    pub fn is_newslot(&self) -> bool {
        self.flags_vtable.contains(MethodVtableFlags::NEW_SLOT)
    }

    /// Method can not be overridden
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.flags_modifiers.contains(MethodModifiers::FINAL)
    }

    /// Method has no body
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.flags_modifiers.contains(MethodModifiers::ABSTRACT)
    }
}

impl fmt::Debug for MethodDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDefinition")
            .field("token", &self.token)
            .field("name", &self.name)
            .field("declaring_type", &self.declaring_type)
            .field("flags_vtable", &self.flags_vtable)
            .field("flags_modifiers", &self.flags_modifiers)
            .field("signature", &self.signature)
            .field("overrides", &self.overrides.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::signatures::TypeSignature;

    #[test]
    fn test_flag_accessors() {
        let method = MethodDefinition::new(
            Token::new(0x06000001),
            "Dispose".to_string(),
            Token::new(0x02000002),
            0x0006 | 0x0040 | 0x0100 | 0x0020,
            SignatureMethod::instance(TypeSignature::Void, vec![]),
        );

        assert!(method.is_virtual());
        assert!(method.is_newslot());
        assert!(method.is_final());
        assert!(!method.is_abstract());
    }

    #[test]
    fn test_override_directives_append() {
        let method = MethodDefinition::new(
            Token::new(0x06000003),
            "System.IDisposable.Dispose".to_string(),
            Token::new(0x02000002),
            0x0001 | 0x0040 | 0x0100 | 0x0020,
            SignatureMethod::instance(TypeSignature::Void, vec![]),
        );

        let target = MethodReference::new(
            TypeIdentity::definition(Token::new(0x02000005)),
            Token::new(0x06000009),
        );
        method.overrides.push(target.clone());

        assert_eq!(method.overrides.count(), 1);
        assert_eq!(method.overrides.get(0), Some(&target));
    }
}
