//! Generic argument substitution over signatures.
//!
//! A signature declared inside a generic type refers to the type's parameters positionally
//! (`!0`, `!1`, ...). Viewing that signature through an instantiation such as `List<int32>`
//! replaces every `!n` with the n-th generic argument. Generic *method* parameters (`!!n`)
//! belong to the method and are never touched by a type instantiation.

use crate::metadata::{
    signatures::{
        SignatureArray, SignatureMethod, SignatureParameter, SignaturePointer, SignatureSzArray,
        TypeSignature,
    },
    token::Token,
};

impl TypeSignature {
    /// Rebuild this signature bottom-up, giving `replace` the chance to substitute any node
    ///
    /// `replace` is consulted for every node before its children are visited; when it returns
    /// `Some`, that value is used verbatim and the node's children are not visited.
    ///
    /// ## Arguments
    /// * 'replace' - Callback deciding whether a node is replaced
    #[must_use]
    pub fn transform<F>(&self, replace: &mut F) -> TypeSignature
    where
        F: FnMut(&TypeSignature) -> Option<TypeSignature>,
    {
        if let Some(replacement) = replace(self) {
            return replacement;
        }

        match self {
            TypeSignature::Ptr(ptr) => TypeSignature::Ptr(SignaturePointer {
                modifiers: ptr.modifiers.clone(),
                base: Box::new(ptr.base.transform(replace)),
            }),
            TypeSignature::ByRef(inner) => TypeSignature::ByRef(Box::new(inner.transform(replace))),
            TypeSignature::Pinned(inner) => {
                TypeSignature::Pinned(Box::new(inner.transform(replace)))
            }
            TypeSignature::Array(array) => TypeSignature::Array(SignatureArray {
                base: Box::new(array.base.transform(replace)),
                rank: array.rank,
                dimensions: array.dimensions.clone(),
            }),
            TypeSignature::SzArray(array) => TypeSignature::SzArray(SignatureSzArray {
                modifiers: array.modifiers.clone(),
                base: Box::new(array.base.transform(replace)),
            }),
            TypeSignature::GenericInst(base, args) => TypeSignature::GenericInst(
                Box::new(base.transform(replace)),
                args.iter().map(|arg| arg.transform(replace)).collect(),
            ),
            TypeSignature::FnPtr(method) => {
                TypeSignature::FnPtr(Box::new(method.transform(replace)))
            }
            other => other.clone(),
        }
    }

    /// Rewrite every `TypeRef` / `TypeDef` token inside this signature through `map`
    ///
    /// Used to canonicalize signatures so that a type named through a reference and the same
    /// type named through its definition compare equal.
    #[must_use]
    pub fn map_tokens<F>(&self, map: &mut F) -> TypeSignature
    where
        F: FnMut(Token) -> Token,
    {
        self.transform(&mut |node| match node {
            TypeSignature::Class(token) => Some(TypeSignature::Class(map(*token))),
            TypeSignature::ValueType(token) => Some(TypeSignature::ValueType(map(*token))),
            _ => None,
        })
    }
}

impl SignatureParameter {
    fn transform<F>(&self, replace: &mut F) -> SignatureParameter
    where
        F: FnMut(&TypeSignature) -> Option<TypeSignature>,
    {
        SignatureParameter {
            modifiers: self.modifiers.clone(),
            by_ref: self.by_ref,
            base: self.base.transform(replace),
        }
    }
}

impl SignatureMethod {
    /// Rebuild the return type and every parameter through [`TypeSignature::transform`]
    #[must_use]
    pub fn transform<F>(&self, replace: &mut F) -> SignatureMethod
    where
        F: FnMut(&TypeSignature) -> Option<TypeSignature>,
    {
        SignatureMethod {
            has_this: self.has_this,
            explicit_this: self.explicit_this,
            default: self.default,
            vararg: self.vararg,
            param_count_generic: self.param_count_generic,
            return_type: self.return_type.transform(replace),
            params: self.params.iter().map(|p| p.transform(replace)).collect(),
            varargs: self.varargs.iter().map(|p| p.transform(replace)).collect(),
        }
    }
}

/// Substitutes the generic arguments of a type instantiation into signatures
///
/// ```rust
/// use dotvtable::metadata::signatures::{GenericSubstitution, SignatureMethod, TypeSignature};
///
/// let args = [TypeSignature::String];
/// let subst = GenericSubstitution::new(&args);
///
/// let open = SignatureMethod::instance(TypeSignature::GenericParamType(0), vec![]);
/// let closed = subst.method(&open);
/// assert_eq!(closed.return_type.base, TypeSignature::String);
/// ```
pub struct GenericSubstitution<'a> {
    /// Arguments of the instantiation, indexed by generic parameter position
    type_args: &'a [TypeSignature],
}

impl<'a> GenericSubstitution<'a> {
    /// Create a substitution for the given instantiation arguments
    ///
    /// ## Arguments
    /// * '`type_args`' - The generic arguments, in parameter order
    #[must_use]
    pub fn new(type_args: &'a [TypeSignature]) -> Self {
        GenericSubstitution { type_args }
    }

    /// Returns `true` if there is nothing to substitute
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.type_args.is_empty()
    }

    /// Substitute into a type signature
    ///
    /// A parameter index without a matching argument is left as-is; the declaring type
    /// is then only partially instantiated, which is not an error at this level.
    #[must_use]
    pub fn type_sig(&self, signature: &TypeSignature) -> TypeSignature {
        if self.is_empty() {
            return signature.clone();
        }

        signature.transform(&mut |node| match node {
            TypeSignature::GenericParamType(index) => {
                self.type_args.get(*index as usize).cloned()
            }
            _ => None,
        })
    }

    /// Substitute into every type of a method signature
    #[must_use]
    pub fn method(&self, signature: &SignatureMethod) -> SignatureMethod {
        if self.is_empty() {
            return signature.clone();
        }

        signature.transform(&mut |node| match node {
            TypeSignature::GenericParamType(index) => {
                self.type_args.get(*index as usize).cloned()
            }
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_of(arg: TypeSignature) -> TypeSignature {
        TypeSignature::GenericInst(
            Box::new(TypeSignature::Class(Token::new(0x02000010))),
            vec![arg],
        )
    }

    #[test]
    fn test_substitutes_type_params_recursively() {
        let args = [TypeSignature::I4, TypeSignature::String];
        let subst = GenericSubstitution::new(&args);

        let open = list_of(TypeSignature::SzArray(SignatureSzArray {
            modifiers: vec![],
            base: Box::new(TypeSignature::GenericParamType(1)),
        }));
        let expected = list_of(TypeSignature::SzArray(SignatureSzArray {
            modifiers: vec![],
            base: Box::new(TypeSignature::String),
        }));

        assert_eq!(subst.type_sig(&open), expected);
    }

    #[test]
    fn test_method_params_untouched() {
        let args = [TypeSignature::I4];
        let subst = GenericSubstitution::new(&args);

        let open = SignatureMethod::instance(
            TypeSignature::GenericParamMethod(0),
            vec![TypeSignature::GenericParamType(0)],
        );
        let closed = subst.method(&open);

        assert_eq!(closed.return_type.base, TypeSignature::GenericParamMethod(0));
        assert_eq!(closed.params[0].base, TypeSignature::I4);
        assert!(closed.has_this);
    }

    #[test]
    fn test_missing_argument_left_open() {
        let args = [TypeSignature::I4];
        let subst = GenericSubstitution::new(&args);

        assert_eq!(
            subst.type_sig(&TypeSignature::GenericParamType(3)),
            TypeSignature::GenericParamType(3)
        );
    }

    #[test]
    fn test_map_tokens() {
        let type_ref = Token::new(0x01000001);
        let type_def = Token::new(0x02000007);

        let sig = list_of(TypeSignature::Class(type_ref));
        let mapped = sig.map_tokens(&mut |token| if token == type_ref { type_def } else { token });

        assert_eq!(mapped, list_of(TypeSignature::Class(type_def)));
    }
}
