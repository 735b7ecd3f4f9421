use std::fmt;

use crate::metadata::{
    method::MethodDefinition,
    signatures::{GenericSubstitution, SignatureMethod, TypeSignature},
    token::Token,
    typesystem::TypeIdentity,
};

/// The dispatch key of a vtable slot: a method's name together with its shape
///
/// Two signatures are equal if their names match ordinally and their shapes (calling
/// convention, return type, parameter types) are structurally equal. Generic type
/// parameters are substituted relative to the type the method is viewed through before the
/// signature is built, so `List<int32>::Add` and `List<!0>::Add` are different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VTableSignature {
    name: String,
    method: SignatureMethod,
}

impl VTableSignature {
    /// Create a signature from its parts
    ///
    /// ## Arguments
    /// * 'name'   - The method name
    /// * 'method' - The (already substituted) method shape
    #[must_use]
    pub fn new(name: &str, method: SignatureMethod) -> Self {
        VTableSignature {
            name: name.to_string(),
            method,
        }
    }

    /// The signature of `method` as declared on its own (open) type definition
    #[must_use]
    pub fn from_method(method: &MethodDefinition) -> Self {
        VTableSignature {
            name: method.name.clone(),
            method: method.signature.clone(),
        }
    }

    /// The signature of `method` viewed through `declaring_type`
    ///
    /// If `declaring_type` is a generic instantiation of the method's owner, its arguments are
    /// substituted into the method shape (`List<int32>::Add` takes an `int32`).
    ///
    /// ## Arguments
    /// * 'method'          - The method definition
    /// * '`declaring_type`' - The type the method is accessed through
    #[must_use]
    pub fn from_method_in(method: &MethodDefinition, declaring_type: &TypeIdentity) -> Self {
        let subst = GenericSubstitution::new(declaring_type.generic_args());
        VTableSignature {
            name: method.name.clone(),
            method: subst.method(&method.signature),
        }
    }

    /// The method name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The method shape
    #[must_use]
    pub fn method(&self) -> &SignatureMethod {
        &self.method
    }

    /// This signature with `subst` applied to its shape
    #[must_use]
    pub fn substitute(&self, subst: &GenericSubstitution<'_>) -> Self {
        VTableSignature {
            name: self.name.clone(),
            method: subst.method(&self.method),
        }
    }

    /// This signature with every type token in its shape rewritten through `map`
    #[must_use]
    pub fn map_tokens<F>(&self, map: &mut F) -> Self
    where
        F: FnMut(Token) -> Token,
    {
        VTableSignature {
            name: self.name.clone(),
            method: self.method.transform(&mut |node| match node {
                TypeSignature::Class(token) => Some(TypeSignature::Class(map(*token))),
                TypeSignature::ValueType(token) => Some(TypeSignature::ValueType(map(*token))),
                _ => None,
            }),
        }
    }
}

impl fmt::Display for VTableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.method.has_this {
            write!(f, "instance ")?;
        }
        write!(f, "{} {}", self.method.return_type, self.name)?;
        if self.method.param_count_generic > 0 {
            write!(f, "<{}>", self.method.param_count_generic)?;
        }
        write!(f, "(")?;
        for (i, param) in self.method.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_method(declaring_type: Token) -> MethodDefinition {
        MethodDefinition::new(
            Token::new(0x06000001),
            "Get".to_string(),
            declaring_type,
            0x0006 | 0x0040 | 0x0100 | 0x0400,
            SignatureMethod::instance(
                TypeSignature::GenericParamType(0),
                vec![TypeSignature::GenericParamMethod(0)],
            ),
        )
    }

    #[test]
    fn test_from_method_in_substitutes_type_params_only() {
        let owner = Token::new(0x02000002);
        let method = get_method(owner);

        let open = VTableSignature::from_method(&method);
        let closed = VTableSignature::from_method_in(
            &method,
            &TypeIdentity::instance(owner, vec![TypeSignature::String]),
        );

        assert_ne!(open, closed);
        assert_eq!(closed.method().return_type.base, TypeSignature::String);
        assert_eq!(
            closed.method().params[0].base,
            TypeSignature::GenericParamMethod(0)
        );
        assert_eq!(
            VTableSignature::from_method_in(&method, &TypeIdentity::definition(owner)),
            open
        );
    }

    #[test]
    fn test_equality_requires_name_and_shape() {
        let shape = SignatureMethod::instance(TypeSignature::Void, vec![TypeSignature::I4]);
        let a = VTableSignature::new("Foo", shape.clone());
        let b = VTableSignature::new("Foo", shape.clone());
        let c = VTableSignature::new("foo", shape);
        let d = VTableSignature::new(
            "Foo",
            SignatureMethod::instance(TypeSignature::Void, vec![TypeSignature::I8]),
        );

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_map_tokens() {
        let type_ref = Token::new(0x01000001);
        let type_def = Token::new(0x02000007);
        let sig = VTableSignature::new(
            "Accept",
            SignatureMethod::instance(TypeSignature::Void, vec![TypeSignature::Class(type_ref)]),
        );

        let mapped = sig.map_tokens(&mut |token| if token == type_ref { type_def } else { token });
        assert_eq!(
            mapped.method().params[0].base,
            TypeSignature::Class(type_def)
        );
        assert_eq!(mapped.name(), "Accept");
    }

    #[test]
    fn test_display() {
        let sig = VTableSignature::new(
            "Add",
            SignatureMethod::instance(TypeSignature::Boolean, vec![TypeSignature::String]),
        );
        assert_eq!(sig.to_string(), "instance bool Add(string)");
    }
}
