use crate::{
    metadata::{
        method::{MethodDefinition, MethodDefinitionRc, MethodReference},
        token::Token,
        typesystem::{TypeDefinition, TypeDefinitionRc, TypeIdentity},
    },
    Error::UnsupportedTypeShape,
    Result,
};

/// Read-only queries over an already-loaded, closed set of modules
///
/// This is the seam between the vtable engine and whatever loaded the binaries. Implementors
/// only have to provide the two resolution functions; the structural queries have default
/// implementations reading the owned [`TypeDefinition`] / [`MethodDefinition`] values, and can
/// be overridden when a loader keeps that information elsewhere.
///
/// The universe is assumed immutable while a [`crate::vtable::VTableStorage`] reads from it.
pub trait TypeUniverse {
    /// Resolve a `TypeDef` or `TypeRef` token to the type definition it denotes
    ///
    /// ## Arguments
    /// * 'token' - The token to resolve
    ///
    /// # Errors
    /// Returns [`crate::Error::ResolutionError`] if the token does not denote a type defined
    /// in the loaded modules.
    fn resolve_type(&self, token: Token) -> Result<TypeDefinitionRc>;

    /// Resolve a `MethodDef` or `MemberRef` token to the method definition it denotes
    ///
    /// ## Arguments
    /// * 'token' - The token to resolve
    ///
    /// # Errors
    /// Returns [`crate::Error::ResolutionError`] if the token does not denote a method defined
    /// in the loaded modules.
    fn resolve_method(&self, token: Token) -> Result<MethodDefinitionRc>;

    /// Resolve the definition named by a type identity
    ///
    /// Generic instances resolve to their open generic definition.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnsupportedTypeShape`] for shapes that name no definition
    /// (arrays, pointers, generic parameters) and [`crate::Error::ResolutionError`] if the
    /// named token is not resolvable.
    fn resolve_identity(&self, identity: &TypeIdentity) -> Result<TypeDefinitionRc> {
        match identity.definition_token() {
            Some(token) => self.resolve_type(token),
            None => Err(UnsupportedTypeShape(identity.to_string())),
        }
    }

    /// The type `ty` extends, if any
    fn base_type_of(&self, ty: &TypeDefinition) -> Option<TypeIdentity> {
        ty.base().cloned()
    }

    /// All virtual methods `ty` declares, in declaration order
    ///
    /// # Errors
    /// Returns [`crate::Error::ResolutionError`] if a listed method token is not resolvable.
    fn declared_virtual_methods(&self, ty: &TypeDefinition) -> Result<Vec<MethodDefinitionRc>> {
        let mut methods = Vec::with_capacity(ty.methods.count());
        for (_, token) in ty.methods.iter() {
            let method = self.resolve_method(*token)?;
            if method.is_virtual() {
                methods.push(method);
            }
        }

        Ok(methods)
    }

    /// The interfaces `ty` lists directly, in declaration order
    fn directly_implemented_interfaces(&self, ty: &TypeDefinition) -> Vec<TypeIdentity> {
        ty.interfaces
            .iter()
            .map(|(_, iface)| iface.clone())
            .collect()
    }

    /// The explicit override directives whose body is `method`
    fn explicit_overrides(&self, method: &MethodDefinition) -> Vec<MethodReference> {
        method
            .overrides
            .iter()
            .map(|(_, target)| target.clone())
            .collect()
    }
}
