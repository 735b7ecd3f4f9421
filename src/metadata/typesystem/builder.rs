//! Fluent declaration of types and methods into a [`TypeRegistry`].
//!
//! The builders mirror how a compiler lays out members: a [`TypeBuilder`] collects the base
//! type, interface list and methods of one type definition, and [`TypeBuilder::build`]
//! assigns tokens and registers everything in one go. Method flags default to what C#
//! emits for the corresponding declaration (`virtual` is `newslot virtual`, `override`
//! reuses the inherited slot, interface members are `newslot abstract virtual`).

use std::sync::Arc;

use crate::{
    metadata::{
        method::{MethodDefinition, MethodModifiers, MethodReference, MethodVtableFlags},
        signatures::{SignatureMethod, SignatureParameter, TypeSignature},
        typesystem::{TypeAttributes, TypeDefinition, TypeDefinitionRc, TypeIdentity, TypeRegistry},
    },
    Result,
};

/// `public` (`MemberAccess` value)
const METHOD_PUBLIC: u32 = 0x0006;
/// `private` (`MemberAccess` value)
const METHOD_PRIVATE: u32 = 0x0001;
const METHOD_FINAL: u32 = MethodModifiers::FINAL.bits();
const METHOD_VIRTUAL: u32 = MethodModifiers::VIRTUAL.bits();
const METHOD_HIDE_BY_SIG: u32 = MethodModifiers::HIDE_BY_SIG.bits();
const METHOD_ABSTRACT: u32 = MethodModifiers::ABSTRACT.bits();
const METHOD_NEW_SLOT: u32 = MethodVtableFlags::NEW_SLOT.bits();

/// Builder for a single method of a [`TypeBuilder`]
///
/// Methods are instance methods returning `void` without parameters unless configured
/// otherwise.
#[derive(Debug, Clone)]
pub struct MethodBuilder {
    name: String,
    flags: u32,
    signature: SignatureMethod,
    overrides: Vec<MethodReference>,
}

impl MethodBuilder {
    /// A public, non-virtual instance method
    #[must_use]
    pub fn new(name: &str) -> Self {
        MethodBuilder {
            name: name.to_string(),
            flags: METHOD_PUBLIC | METHOD_HIDE_BY_SIG,
            signature: SignatureMethod::instance(TypeSignature::Void, vec![]),
            overrides: Vec::new(),
        }
    }

    /// A method introducing a new slot (`public hidebysig newslot virtual`)
    #[must_use]
    pub fn virtual_method(name: &str) -> Self {
        Self::new(name).flags(METHOD_PUBLIC | METHOD_HIDE_BY_SIG | METHOD_NEW_SLOT | METHOD_VIRTUAL)
    }

    /// A method overriding an inherited slot (`public hidebysig virtual`)
    #[must_use]
    pub fn override_method(name: &str) -> Self {
        Self::new(name).flags(METHOD_PUBLIC | METHOD_HIDE_BY_SIG | METHOD_VIRTUAL)
    }

    /// An interface member (`public hidebysig newslot abstract virtual`)
    #[must_use]
    pub fn abstract_method(name: &str) -> Self {
        Self::new(name).flags(
            METHOD_PUBLIC | METHOD_HIDE_BY_SIG | METHOD_NEW_SLOT | METHOD_ABSTRACT | METHOD_VIRTUAL,
        )
    }

    /// An explicit interface implementation body (`private hidebysig newslot virtual final`)
    ///
    /// The override directive naming the implemented member still has to be added with
    /// [`MethodBuilder::overrides`].
    #[must_use]
    pub fn explicit_method(name: &str) -> Self {
        Self::new(name).flags(
            METHOD_PRIVATE | METHOD_HIDE_BY_SIG | METHOD_NEW_SLOT | METHOD_VIRTUAL | METHOD_FINAL,
        )
    }

    /// Replace the raw `MethodAttributes` flags
    #[must_use]
    pub fn flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    /// Mark the method `final`
    #[must_use]
    pub fn sealed(mut self) -> Self {
        self.flags |= METHOD_FINAL;
        self
    }

    /// Mark the method `newslot`
    #[must_use]
    pub fn newslot(mut self) -> Self {
        self.flags |= METHOD_NEW_SLOT;
        self
    }

    /// Set the return type
    #[must_use]
    pub fn returns(mut self, return_type: TypeSignature) -> Self {
        self.signature.return_type = SignatureParameter::new(return_type);
        self
    }

    /// Append a parameter
    #[must_use]
    pub fn param(mut self, param: TypeSignature) -> Self {
        self.signature.params.push(SignatureParameter::new(param));
        self
    }

    /// Declare the number of generic method parameters
    #[must_use]
    pub fn generic_params(mut self, count: u32) -> Self {
        self.signature.param_count_generic = count;
        self
    }

    /// Replace the whole signature
    #[must_use]
    pub fn signature(mut self, signature: SignatureMethod) -> Self {
        self.signature = signature;
        self
    }

    /// Add an explicit override directive targeting `target`
    #[must_use]
    pub fn overrides(mut self, target: MethodReference) -> Self {
        self.overrides.push(target);
        self
    }
}

/// Builder for a type definition and its methods
///
/// ```rust
/// use dotvtable::metadata::{
///     signatures::TypeSignature,
///     typesystem::{MethodBuilder, TypeBuilder, TypeIdentity, TypeRegistry},
/// };
///
/// let registry = TypeRegistry::new();
/// let container = TypeBuilder::interface("Demo", "IContainer`1")
///     .generic_params(1)
///     .method(MethodBuilder::abstract_method("Get").returns(TypeSignature::GenericParamType(0)))
///     .build(&registry)?;
///
/// let outer = TypeBuilder::class("Demo", "Outer`1")
///     .generic_params(1)
///     .implements(TypeIdentity::instance(
///         container.token,
///         vec![TypeSignature::GenericParamType(0)],
///     ))
///     .method(MethodBuilder::virtual_method("Get").returns(TypeSignature::GenericParamType(0)))
///     .build(&registry)?;
///
/// assert_eq!(outer.interfaces.count(), 1);
/// # Ok::<(), dotvtable::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct TypeBuilder {
    namespace: String,
    name: String,
    flags: u32,
    base: Option<TypeIdentity>,
    interfaces: Vec<TypeIdentity>,
    methods: Vec<MethodBuilder>,
    generic_param_count: u32,
}

impl TypeBuilder {
    /// A public class
    #[must_use]
    pub fn class(namespace: &str, name: &str) -> Self {
        TypeBuilder {
            namespace: namespace.to_string(),
            name: name.to_string(),
            flags: TypeAttributes::PUBLIC | TypeAttributes::CLASS,
            base: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
            generic_param_count: 0,
        }
    }

    /// A public interface
    #[must_use]
    pub fn interface(namespace: &str, name: &str) -> Self {
        Self::class(namespace, name).flags(
            TypeAttributes::PUBLIC | TypeAttributes::INTERFACE | TypeAttributes::ABSTRACT,
        )
    }

    /// Replace the raw `TypeAttributes` flags
    #[must_use]
    pub fn flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    /// Set the base type
    #[must_use]
    pub fn extends(mut self, base: TypeIdentity) -> Self {
        self.base = Some(base);
        self
    }

    /// Append a directly implemented interface
    #[must_use]
    pub fn implements(mut self, iface: TypeIdentity) -> Self {
        self.interfaces.push(iface);
        self
    }

    /// Declare the number of generic type parameters
    #[must_use]
    pub fn generic_params(mut self, count: u32) -> Self {
        self.generic_param_count = count;
        self
    }

    /// Append a method
    #[must_use]
    pub fn method(mut self, method: MethodBuilder) -> Self {
        self.methods.push(method);
        self
    }

    /// Assign tokens and register the type and all of its methods in `registry`
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeInsert`] if a reserved token is unexpectedly taken.
    pub fn build(self, registry: &TypeRegistry) -> Result<TypeDefinitionRc> {
        let new_type = Arc::new(TypeDefinition::new(
            registry.next_type_token(),
            self.namespace,
            self.name,
            self.flags,
            self.base,
            self.generic_param_count,
        ));

        for iface in self.interfaces {
            new_type.interfaces.push(iface);
        }
        registry.insert(&new_type)?;

        for method in self.methods {
            let new_method = MethodDefinition::new(
                registry.next_method_token(),
                method.name,
                new_type.token,
                method.flags,
                method.signature,
            );
            for target in method.overrides {
                new_method.overrides.push(target);
            }
            registry.insert_method(&Arc::new(new_method))?;
        }

        Ok(new_type)
    }
}
