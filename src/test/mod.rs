//! Type hierarchies shared by the unit tests

use std::sync::Arc;

use crate::{
    metadata::{
        method::{MethodDefinitionRc, MethodReference},
        signatures::TypeSignature,
        typesystem::{MethodBuilder, TypeBuilder, TypeDefinitionRc, TypeIdentity, TypeRegistry},
    },
    vtable::{Slot, SlotRef, VTable, VTableConfig, VTableStorage},
};

/// A registry together with shortcuts for looking into it
pub struct Scenario {
    pub registry: Arc<TypeRegistry>,
}

impl Scenario {
    pub fn new() -> Self {
        Scenario {
            registry: Arc::new(TypeRegistry::new()),
        }
    }

    pub fn storage(&self) -> VTableStorage {
        VTableStorage::new(self.registry.clone())
    }

    pub fn storage_with(&self, config: VTableConfig) -> VTableStorage {
        VTableStorage::with_config(self.registry.clone(), config)
    }

    pub fn build(&self, builder: TypeBuilder) -> TypeDefinitionRc {
        builder.build(&self.registry).unwrap()
    }

    pub fn method(&self, ty: &TypeDefinitionRc, name: &str) -> MethodDefinitionRc {
        self.registry
            .method_by_name(&ty.token, name)
            .unwrap_or_else(|| panic!("{} has no method {}", ty.fullname(), name))
    }

    /// Reference to `name` declared on `ty`, accessed through `through`
    pub fn method_ref(
        &self,
        through: TypeIdentity,
        ty: &TypeDefinitionRc,
        name: &str,
    ) -> MethodReference {
        MethodReference::new(through, self.method(ty, name).token)
    }
}

pub fn slot(table: &VTable, slot: SlotRef) -> &Slot {
    table.slot(slot).unwrap()
}

/// `Base { virtual Foo }`, `Derived : Base { override Foo }`
pub fn base_derived() -> (Scenario, TypeDefinitionRc, TypeDefinitionRc) {
    let scenario = Scenario::new();
    let base = scenario.build(
        TypeBuilder::class("Demo", "Base").method(MethodBuilder::virtual_method("Foo")),
    );
    let derived = scenario.build(
        TypeBuilder::class("Demo", "Derived")
            .extends(base.identity())
            .method(MethodBuilder::override_method("Foo")),
    );

    (scenario, base, derived)
}

/// `IContainer<T> { T Get() }`, `Outer<T> : IContainer<T> { virtual T Get() }`
pub fn generic_container() -> (Scenario, TypeDefinitionRc, TypeDefinitionRc) {
    let scenario = Scenario::new();
    let container = scenario.build(
        TypeBuilder::interface("Demo", "IContainer`1")
            .generic_params(1)
            .method(
                MethodBuilder::abstract_method("Get").returns(TypeSignature::GenericParamType(0)),
            ),
    );
    let outer = scenario.build(
        TypeBuilder::class("Demo", "Outer`1")
            .generic_params(1)
            .implements(TypeIdentity::instance(
                container.token,
                vec![TypeSignature::GenericParamType(0)],
            ))
            .method(
                MethodBuilder::virtual_method("Get").returns(TypeSignature::GenericParamType(0)),
            ),
    );

    (scenario, container, outer)
}

/// `IFoo { M }`, `ILeft : IFoo`, `IRight : IFoo`, `Diamond : ILeft, IRight { virtual M }`
pub fn diamond() -> (Scenario, TypeDefinitionRc, TypeDefinitionRc) {
    let scenario = Scenario::new();
    let root = scenario.build(
        TypeBuilder::interface("Demo", "IFoo").method(MethodBuilder::abstract_method("M")),
    );
    let left = scenario.build(TypeBuilder::interface("Demo", "ILeft").implements(root.identity()));
    let right =
        scenario.build(TypeBuilder::interface("Demo", "IRight").implements(root.identity()));
    let diamond = scenario.build(
        TypeBuilder::class("Demo", "Diamond")
            .implements(left.identity())
            .implements(right.identity())
            .method(MethodBuilder::virtual_method("M")),
    );

    (scenario, root, diamond)
}
