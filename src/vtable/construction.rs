//! Construction of the vtable of a single type definition.
//!
//! [`VTableBuilder`] runs once per type definition. It receives the already built tables of
//! the base type and of every directly listed interface (requested recursively by
//! [`crate::vtable::VTableStorage`]) and proceeds in the following steps:
//!
//! 1. Collect the declared virtual methods, keyed by signature
//! 2. Inherit the base type's slot log and interface groups
//! 3. Let newslot methods satisfy interface slots by signature
//! 4. Re-route interface slots still pointing at an interface declaration (classes only)
//! 5. Apply normal overrides, or introduce new slots
//! 6. Apply explicit override directives
//! 7. Flatten interface groups to one slot per signature
//!
//! Explicit override directives run last and therefore win over signature matching.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use crate::{
    error::invariant_error,
    metadata::{
        method::{MethodDefinitionRc, MethodReference},
        token::Token,
        typesystem::{TypeDefinitionRc, TypeIdentity, TypeUniverse},
    },
    vtable::{Slot, SlotArena, SlotRef, VTable, VTableConfig, VTableSignature},
    Result,
};

/// Rewrites every `TypeRef` inside `identity` to the `TypeDef` it resolves to
///
/// References leaving the loaded module set are kept as they are.
pub(crate) fn canonical_identity(universe: &dyn TypeUniverse, identity: &TypeIdentity) -> TypeIdentity {
    TypeIdentity::from(
        identity
            .signature()
            .map_tokens(&mut |token| canonical_token(universe, token)),
    )
}

/// Rewrites every `TypeRef` inside the shape of `signature` to the `TypeDef` it resolves to
pub(crate) fn canonical_signature(
    universe: &dyn TypeUniverse,
    signature: &VTableSignature,
) -> VTableSignature {
    signature.map_tokens(&mut |token| canonical_token(universe, token))
}

fn canonical_token(universe: &dyn TypeUniverse, token: Token) -> Token {
    if !token.is_type_ref() {
        return token;
    }

    match universe.resolve_type(token) {
        Ok(definition) => definition.token,
        Err(_) => token,
    }
}

/// Slots of one interface as seen through the type under construction, grouped by signature
///
/// An interface can carry several slots with the same signature once instantiated
/// (`IPair<!0, !1>` viewed as `IPair<int32, int32>`), hence one list per signature.
#[derive(Debug, Default)]
struct SignatureGroups {
    order: Vec<VTableSignature>,
    groups: HashMap<VTableSignature, Vec<SlotRef>>,
}

impl SignatureGroups {
    fn from_slots(slots: &[SlotRef], arena: &SlotArena) -> Result<Self> {
        let mut groups = SignatureGroups::default();
        for slot in slots {
            groups.push(slot_at(arena, *slot)?.signature.clone(), *slot);
        }

        Ok(groups)
    }

    fn push(&mut self, signature: VTableSignature, slot: SlotRef) {
        if !self.groups.contains_key(&signature) {
            self.order.push(signature.clone());
        }
        self.groups.entry(signature).or_default().push(slot);
    }

    fn contains(&self, signature: &VTableSignature) -> bool {
        self.groups.contains_key(signature)
    }
}

fn slot_at(arena: &SlotArena, slot: SlotRef) -> Result<&Slot> {
    arena
        .get(slot)
        .ok_or_else(|| invariant_error!("Slot {} is not part of the arena", slot))
}

/// Memoized lookup of whether a method is declared on an interface
struct MethodOrigins<'a> {
    universe: &'a dyn TypeUniverse,
    known: HashMap<Token, bool>,
}

impl<'a> MethodOrigins<'a> {
    fn new(universe: &'a dyn TypeUniverse) -> Self {
        MethodOrigins {
            universe,
            known: HashMap::new(),
        }
    }

    fn is_interface_method(&mut self, method: Token) -> Result<bool> {
        if let Some(known) = self.known.get(&method) {
            return Ok(*known);
        }

        let definition = self.universe.resolve_method(method)?;
        let owner = self.universe.resolve_type(definition.declaring_type)?;
        let is_interface = owner.is_interface();
        self.known.insert(method, is_interface);

        Ok(is_interface)
    }
}

/// Builds the [`VTable`] of one type definition
pub(crate) struct VTableBuilder<'a> {
    universe: &'a dyn TypeUniverse,
    config: VTableConfig,
    arena: SlotArena,
    ty: TypeDefinitionRc,
    identity: TypeIdentity,
    declared: Vec<(VTableSignature, MethodDefinitionRc)>,
    declared_by_signature: HashMap<VTableSignature, MethodDefinitionRc>,
    all_slots: Vec<SlotRef>,
    slot_by_signature: HashMap<VTableSignature, SlotRef>,
    interface_groups: BTreeMap<TypeIdentity, SignatureGroups>,
    origins: MethodOrigins<'a>,
}

impl<'a> VTableBuilder<'a> {
    /// Prepare the construction of the table of `ty`, collecting its declared virtual methods
    ///
    /// ## Arguments
    /// * 'universe' - The type universe `ty` lives in
    /// * 'config'   - Construction configuration
    /// * 'arena'    - The arena new slots are allocated in
    /// * 'ty'       - The type definition to build the table for
    ///
    /// # Errors
    /// Returns [`crate::Error::ResolutionError`] if a declared method can not be resolved.
    pub(crate) fn new(
        universe: &'a dyn TypeUniverse,
        config: VTableConfig,
        arena: SlotArena,
        ty: TypeDefinitionRc,
    ) -> Result<Self> {
        let mut declared = Vec::new();
        let mut declared_by_signature = HashMap::new();
        for method in universe.declared_virtual_methods(&ty)? {
            let signature = canonical_signature(universe, &VTableSignature::from_method(&method));
            if declared_by_signature.contains_key(&signature) {
                log::warn!(
                    "{} declares `{}` more than once, keeping the first declaration",
                    ty.fullname(),
                    signature
                );
            } else {
                declared_by_signature.insert(signature.clone(), Arc::clone(&method));
            }
            declared.push((signature, method));
        }

        log::trace!(
            "{}: {} declared virtual methods",
            ty.fullname(),
            declared.len()
        );

        Ok(VTableBuilder {
            universe,
            config,
            arena,
            identity: ty.identity(),
            ty,
            declared,
            declared_by_signature,
            all_slots: Vec::new(),
            slot_by_signature: HashMap::new(),
            interface_groups: BTreeMap::new(),
            origins: MethodOrigins::new(universe),
        })
    }

    /// Run the construction
    ///
    /// ## Arguments
    /// * 'base'       - The table of the base type, if there is one
    /// * 'interfaces' - The tables of the directly listed interfaces, keyed by canonical identity
    ///
    /// # Errors
    /// Returns [`crate::Error::ResolutionError`] for unresolvable override targets and
    /// [`crate::Error::InvariantViolation`] if an override target has no slot.
    pub(crate) fn build(
        mut self,
        base: Option<&VTable>,
        interfaces: &[(TypeIdentity, Arc<VTable>)],
    ) -> Result<VTable> {
        if let Some(base) = base {
            self.inherit(base)?;
        }

        for (iface, table) in interfaces {
            self.implement(iface, table)?;
        }

        if !self.ty.is_interface() {
            self.reroute_interface_slots()?;
        }

        self.apply_overrides()?;
        self.apply_explicit_overrides()?;
        self.finish()
    }

    fn inherit(&mut self, base: &VTable) -> Result<()> {
        log::trace!(
            "{}: inheriting {} slots from {}",
            self.ty.fullname(),
            base.len(),
            base.ty()
        );

        for slot in base.slots() {
            let signature = slot_at(&self.arena, *slot)?.signature.clone();
            self.all_slots.push(*slot);
            self.slot_by_signature.insert(signature, *slot);
        }

        for (iface, slots) in base.interface_map() {
            self.interface_groups.insert(
                iface.clone(),
                SignatureGroups::from_slots(slots, &self.arena)?,
            );
        }

        Ok(())
    }

    fn implement(&mut self, iface: &TypeIdentity, table: &VTable) -> Result<()> {
        log::trace!("{}: implementing {}", self.ty.fullname(), iface);

        self.satisfy_by_signature(iface, table.slots())?;
        for (base_iface, slots) in table.interface_map() {
            self.satisfy_by_signature(base_iface, slots)?;
        }

        Ok(())
    }

    /// Merge `slots` into the group of `iface`, letting matching newslot methods of the type
    /// implement them
    fn satisfy_by_signature(&mut self, iface: &TypeIdentity, slots: &[SlotRef]) -> Result<()> {
        let mut group = self.interface_groups.remove(iface).unwrap_or_default();

        for signature in &group.order {
            if let Some(existing) = group.groups.get_mut(signature) {
                for slot in existing.iter_mut() {
                    *slot = self.implement_by_newslot(*slot)?;
                }
            }
        }

        let missing: Vec<SlotRef> = slots
            .iter()
            .copied()
            .filter(|slot| {
                self.arena
                    .get(*slot)
                    .is_some_and(|data| !group.contains(&data.signature))
            })
            .collect();
        for slot in missing {
            let signature = slot_at(&self.arena, slot)?.signature.clone();
            let implemented = self.implement_by_newslot(slot)?;
            group.push(signature, implemented);
        }

        self.interface_groups.insert(iface.clone(), group);
        Ok(())
    }

    /// The slot implementing `slot` through a declared newslot method of matching
    /// signature, or `slot` itself if there is none
    fn implement_by_newslot(&mut self, slot: SlotRef) -> Result<SlotRef> {
        if self.ty.is_interface() {
            return Ok(slot);
        }

        let data = slot_at(&self.arena, slot)?;
        let candidate = match self.declared_by_signature.get(&data.signature) {
            Some(method) if method.is_newslot() && method.token != data.implementing_method => {
                Arc::clone(method)
            }
            _ => return Ok(slot),
        };

        let root = data.root(slot, &self.arena);
        if !self.origins.is_interface_method(slot_at(&self.arena, root)?.implementing_method)? {
            return Err(invariant_error!(
                "Interface slot {} of {} does not originate from an interface",
                slot,
                self.ty.fullname()
            ));
        }

        let implemented =
            data.implemented_by(root, candidate.token, self.identity.clone());
        Ok(self.arena.alloc(implemented))
    }

    /// Point interface slots whose implementation is still the interface declaration at a
    /// method of this type or an inherited slot of the same signature
    fn reroute_interface_slots(&mut self) -> Result<()> {
        let mut groups = std::mem::take(&mut self.interface_groups);
        let mut passes = 0;

        loop {
            passes += 1;
            let mut changed = false;

            for group in groups.values_mut() {
                for signature in &group.order {
                    let Some(slots) = group.groups.get_mut(signature) else {
                        continue;
                    };

                    let declared = self.declared_by_signature.get(signature).cloned();
                    let inherited = self.slot_by_signature.get(signature).copied();
                    if declared.is_none() && inherited.is_none() {
                        continue;
                    }

                    for slot in slots.iter_mut() {
                        let data = slot_at(&self.arena, *slot)?;
                        if !self.origins.is_interface_method(data.implementing_method)? {
                            continue;
                        }

                        let rerouted = if let Some(method) = &declared {
                            data.overridden_by(*slot, method)
                        } else if let Some(inherited) = inherited {
                            let target = slot_at(&self.arena, inherited)?;
                            if self.origins.is_interface_method(target.implementing_method)? {
                                continue;
                            }
                            data.implemented_by(
                                *slot,
                                target.implementing_method,
                                target.implementing_method_declaring_type.clone(),
                            )
                        } else {
                            continue;
                        };

                        *slot = self.arena.alloc(rerouted);
                        changed = true;
                    }
                }
            }

            if !changed || !self.config.fixpoint_interface_resolution {
                break;
            }
        }

        log::trace!(
            "{}: interface re-routing settled after {} pass(es)",
            self.ty.fullname(),
            passes
        );

        self.interface_groups = groups;
        Ok(())
    }

    fn apply_overrides(&mut self) -> Result<()> {
        let declared = std::mem::take(&mut self.declared);

        for (signature, method) in &declared {
            let inherited = if method.is_newslot() {
                None
            } else {
                self.slot_by_signature.get(signature).copied()
            };

            let slot = match inherited {
                Some(old) => {
                    let old_slot = slot_at(&self.arena, old)?;
                    if self.universe.resolve_method(old_slot.implementing_method)?.is_final() {
                        if self.config.strict_final_overrides {
                            return Err(invariant_error!(
                                "{} overrides final slot `{}`",
                                self.ty.fullname(),
                                signature
                            ));
                        }
                        log::warn!(
                            "{} overrides final slot `{}`",
                            self.ty.fullname(),
                            signature
                        );
                    }
                    old_slot.overridden_by(old, method)
                }
                None => {
                    if !method.is_newslot() {
                        log::warn!(
                            "{}: `{}` reuses a slot, but no inherited slot matches",
                            self.ty.fullname(),
                            signature
                        );
                    }
                    Slot::new(self.identity.clone(), signature.clone(), method)
                }
            };

            let slot = self.arena.alloc(slot);
            self.all_slots.push(slot);
            self.slot_by_signature.insert(signature.clone(), slot);
        }

        self.declared = declared;
        Ok(())
    }

    fn apply_explicit_overrides(&mut self) -> Result<()> {
        let declared = std::mem::take(&mut self.declared);

        for (_, method) in &declared {
            for target in self.universe.explicit_overrides(method) {
                self.apply_explicit_override(method, &target)?;
            }
        }

        self.declared = declared;
        Ok(())
    }

    fn apply_explicit_override(
        &mut self,
        method: &MethodDefinitionRc,
        target: &MethodReference,
    ) -> Result<()> {
        let target_method = self.universe.resolve_method(target.method)?;
        let target_owner = self.universe.resolve_type(target_method.declaring_type)?;

        log::trace!(
            "{}: `{}` explicitly overrides {}::{}",
            self.ty.fullname(),
            method.name,
            target.declaring_type,
            target_method.name
        );

        if target_owner.is_interface() {
            let iface = canonical_identity(self.universe, &target.declaring_type);
            let signature = canonical_signature(
                self.universe,
                &VTableSignature::from_method_in(&target_method, &iface),
            );

            let mut group = self.interface_groups.remove(&iface).ok_or_else(|| {
                invariant_error!(
                    "{} overrides {}::{}, but does not implement {}",
                    self.ty.fullname(),
                    iface,
                    target_method.name,
                    iface
                )
            })?;

            let mut replaced = false;
            if let Some(slots) = group.groups.get_mut(&signature) {
                for slot in slots.iter_mut() {
                    let data = slot_at(&self.arena, *slot)?;
                    let root = data.root(*slot, &self.arena);
                    if slot_at(&self.arena, root)?.implementing_method == target_method.token {
                        let implemented =
                            data.implemented_by(root, method.token, self.identity.clone());
                        *slot = self.arena.alloc(implemented);
                        replaced = true;
                    }
                }
            }
            self.interface_groups.insert(iface.clone(), group);

            if !replaced {
                return Err(invariant_error!(
                    "No slot of {} for `{}` originates from {}",
                    iface,
                    signature,
                    target_method.token
                ));
            }

            return Ok(());
        }

        let mut found = None;
        for slot in &self.all_slots {
            if slot_at(&self.arena, *slot)?.implementing_method == target_method.token {
                found = Some(*slot);
                break;
            }
        }
        let Some(found) = found else {
            return Err(invariant_error!(
                "{} overrides {}, which occupies no slot",
                self.ty.fullname(),
                target_method.token
            ));
        };

        let signature = slot_at(&self.arena, found)?.signature.clone();
        let mut current = *self.slot_by_signature.get(&signature).ok_or_else(|| {
            invariant_error!(
                "{}: no visible slot for `{}`",
                self.ty.fullname(),
                signature
            )
        })?;

        loop {
            let data = slot_at(&self.arena, current)?;
            match data.overrides {
                Some(previous)
                    if data.implementing_method_declaring_type.definition_token()
                        == Some(self.ty.token) =>
                {
                    current = previous;
                }
                _ => break,
            }
        }

        let slot = slot_at(&self.arena, current)?.overridden_by(current, method);
        let slot = self.arena.alloc(slot);
        self.all_slots.push(slot);
        self.slot_by_signature.insert(signature, slot);

        Ok(())
    }

    fn finish(mut self) -> Result<VTable> {
        let groups = std::mem::take(&mut self.interface_groups);
        let mut interface_slots = BTreeMap::new();

        for (iface, group) in groups {
            let mut flattened = Vec::with_capacity(group.order.len());
            for signature in &group.order {
                let Some(slots) = group.groups.get(signature) else {
                    continue;
                };

                let mut chosen = None;
                for slot in slots.iter().rev() {
                    let data = slot_at(&self.arena, *slot)?;
                    if !self.origins.is_interface_method(data.implementing_method)? {
                        chosen = Some(*slot);
                        break;
                    }
                }

                if let Some(slot) = chosen.or_else(|| slots.last().copied()) {
                    flattened.push(slot);
                }
            }
            interface_slots.insert(iface, flattened);
        }

        log::debug!(
            "Built vtable of {}: {} slots, {} interfaces",
            self.ty.fullname(),
            self.all_slots.len(),
            interface_slots.len()
        );

        Ok(VTable::new(
            self.identity,
            self.all_slots,
            interface_slots,
            self.arena,
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        metadata::{
            method::MethodReference,
            token::Token,
            typesystem::{MethodBuilder, TypeBuilder, TypeIdentity},
        },
        test::{base_derived, diamond, slot, Scenario},
        vtable::{VTable, VTableConfig, VTableSignature},
        Error,
    };

    #[test]
    fn test_inherit_then_override() {
        let (scenario, base, derived) = base_derived();
        let mut storage = scenario.storage();

        let base_table = storage.get_vtable(&base.identity()).unwrap();
        let table = storage.get_vtable(&derived.identity()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.slots()[0], base_table.slots()[0]);

        let head = slot(&table, table.slots()[1]);
        assert_eq!(head.implementing_method, scenario.method(&derived, "Foo").token);
        assert_eq!(head.declaring_type, base.identity());
        assert_eq!(head.overrides, Some(table.slots()[0]));
    }

    #[test]
    fn test_newslot_hides_instead_of_overriding() {
        let scenario = Scenario::new();
        let base = scenario.build(
            TypeBuilder::class("Demo", "Base").method(MethodBuilder::virtual_method("Foo")),
        );
        let derived = scenario.build(
            TypeBuilder::class("Demo", "Derived")
                .extends(base.identity())
                .method(MethodBuilder::virtual_method("Foo")),
        );

        let mut storage = scenario.storage();
        let table = storage.get_vtable(&derived.identity()).unwrap();

        let head = slot(&table, table.slots()[1]);
        assert_eq!(head.overrides, None);
        assert_eq!(head.declaring_type, derived.identity());
        assert_eq!(
            table
                .find_slots(
                    &*scenario.registry,
                    &scenario.method_ref(base.identity(), &base, "Foo"),
                )
                .unwrap(),
            vec![table.slots()[0]]
        );
    }

    #[test]
    fn test_duplicate_signature_keeps_first_for_lookup() {
        let scenario = Scenario::new();
        let iface = scenario.build(
            TypeBuilder::interface("Demo", "IFoo").method(MethodBuilder::abstract_method("Foo")),
        );
        let ty = scenario.build(
            TypeBuilder::class("Demo", "Twice")
                .implements(iface.identity())
                .method(MethodBuilder::virtual_method("Foo"))
                .method(MethodBuilder::virtual_method("Foo")),
        );

        let mut storage = scenario.storage();
        let table = storage.get_vtable(&ty.identity()).unwrap();
        let first = scenario.method(&ty, "Foo");

        assert_eq!(table.len(), 2);
        let iface_slots = table.interface_slots(&iface.identity()).unwrap();
        assert_eq!(slot(&table, iface_slots[0]).implementing_method, first.token);
    }

    #[test]
    fn test_interface_implemented_by_newslot() {
        let scenario = Scenario::new();
        let iface = scenario.build(
            TypeBuilder::interface("Demo", "IFoo").method(MethodBuilder::abstract_method("Foo")),
        );
        let ty = scenario.build(
            TypeBuilder::class("Demo", "Impl")
                .implements(iface.identity())
                .method(MethodBuilder::virtual_method("Foo")),
        );

        let mut storage = scenario.storage();
        let table = storage.get_vtable(&ty.identity()).unwrap();
        let iface_slots = table.interface_slots(&iface.identity()).unwrap();
        assert_eq!(iface_slots.len(), 1);

        let implemented = slot(&table, iface_slots[0]);
        assert_eq!(implemented.implementing_method, scenario.method(&ty, "Foo").token);
        assert_eq!(implemented.implementing_method_declaring_type, ty.identity());
        assert_eq!(implemented.declaring_type, iface.identity());

        let root = implemented.root(iface_slots[0], table.arena());
        assert_eq!(
            slot(&table, root).implementing_method,
            scenario.method(&iface, "Foo").token
        );
    }

    #[test]
    fn test_interface_rerouted_to_inherited_slot() {
        let scenario = Scenario::new();
        let iface = scenario.build(
            TypeBuilder::interface("Demo", "IFoo").method(MethodBuilder::abstract_method("Foo")),
        );
        let base = scenario.build(
            TypeBuilder::class("Demo", "Base").method(MethodBuilder::virtual_method("Foo")),
        );
        let derived = scenario.build(
            TypeBuilder::class("Demo", "Derived")
                .extends(base.identity())
                .implements(iface.identity()),
        );

        let mut storage = scenario.storage();
        let table = storage.get_vtable(&derived.identity()).unwrap();
        let iface_slots = table.interface_slots(&iface.identity()).unwrap();

        let implemented = slot(&table, iface_slots[0]);
        assert_eq!(implemented.implementing_method, scenario.method(&base, "Foo").token);
        assert_eq!(implemented.implementing_method_declaring_type, base.identity());
    }

    #[test]
    fn test_interface_rerouted_to_reuse_slot_override() {
        let scenario = Scenario::new();
        let iface = scenario.build(
            TypeBuilder::interface("Demo", "IFoo").method(MethodBuilder::abstract_method("Foo")),
        );
        let base = scenario.build(
            TypeBuilder::class("Demo", "Base").method(MethodBuilder::virtual_method("Foo")),
        );
        let derived = scenario.build(
            TypeBuilder::class("Demo", "Derived")
                .extends(base.identity())
                .implements(iface.identity())
                .method(MethodBuilder::override_method("Foo")),
        );

        let mut storage = scenario.storage();
        let table = storage.get_vtable(&derived.identity()).unwrap();
        let iface_slots = table.interface_slots(&iface.identity()).unwrap();

        assert_eq!(
            slot(&table, iface_slots[0]).implementing_method,
            scenario.method(&derived, "Foo").token
        );
    }

    #[test]
    fn test_interface_without_implementation_stays_unresolved() {
        let scenario = Scenario::new();
        let iface = scenario.build(
            TypeBuilder::interface("Demo", "IFoo").method(MethodBuilder::abstract_method("Foo")),
        );
        let ty = scenario.build(TypeBuilder::class("Demo", "Hollow").implements(iface.identity()));

        let mut storage = scenario.storage();
        let table = storage.get_vtable(&ty.identity()).unwrap();
        let iface_slots = table.interface_slots(&iface.identity()).unwrap();

        assert_eq!(
            slot(&table, iface_slots[0]).implementing_method,
            scenario.method(&iface, "Foo").token
        );
    }

    #[test]
    fn test_inherited_interface_implementation() {
        let scenario = Scenario::new();
        let iface = scenario.build(
            TypeBuilder::interface("Demo", "IFoo").method(MethodBuilder::abstract_method("Foo")),
        );
        let base = scenario.build(
            TypeBuilder::class("Demo", "Base")
                .implements(iface.identity())
                .method(MethodBuilder::virtual_method("Foo")),
        );
        let derived = scenario.build(
            TypeBuilder::class("Demo", "Derived")
                .extends(base.identity())
                .method(MethodBuilder::override_method("Foo")),
        );

        let mut storage = scenario.storage();
        let base_table = storage.get_vtable(&base.identity()).unwrap();
        let table = storage.get_vtable(&derived.identity()).unwrap();

        // Overriding the class slot does not touch the inherited interface slot
        assert_eq!(
            table.interface_slots(&iface.identity()),
            base_table.interface_slots(&iface.identity())
        );
    }

    #[test]
    fn test_interface_inherits_base_interface_groups() {
        let (scenario, root, _) = diamond();
        let left = scenario.registry.get_by_fullname("Demo.ILeft").unwrap();

        let mut storage = scenario.storage();
        let table = storage.get_vtable(&left.identity()).unwrap();

        assert!(table.is_empty());
        let slots = table.interface_slots(&root.identity()).unwrap();
        assert_eq!(
            slot(&table, slots[0]).implementing_method,
            scenario.method(&root, "M").token
        );
    }

    #[test]
    fn test_diamond_shares_one_implementation() {
        let (scenario, root, diamond) = diamond();
        let mut storage = scenario.storage();
        let table = storage.get_vtable(&diamond.identity()).unwrap();

        let slots = table.interface_slots(&root.identity()).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(
            slot(&table, slots[0]).implementing_method,
            scenario.method(&diamond, "M").token
        );
        assert_eq!(table.interfaces().count(), 3);
    }

    #[test]
    fn test_explicit_interface_override_wins() {
        let scenario = Scenario::new();
        let iface = scenario.build(
            TypeBuilder::interface("Demo", "IFoo").method(MethodBuilder::abstract_method("Foo")),
        );
        let target = scenario.method_ref(iface.identity(), &iface, "Foo");
        let ty = scenario.build(
            TypeBuilder::class("Demo", "Both")
                .implements(iface.identity())
                .method(MethodBuilder::virtual_method("Foo"))
                .method(MethodBuilder::explicit_method("Demo.IFoo.Foo").overrides(target)),
        );

        let mut storage = scenario.storage();
        let table = storage.get_vtable(&ty.identity()).unwrap();
        let iface_slots = table.interface_slots(&iface.identity()).unwrap();

        assert_eq!(
            slot(&table, iface_slots[0]).implementing_method,
            scenario.method(&ty, "Demo.IFoo.Foo").token
        );
        let foo = scenario.method_ref(ty.identity(), &ty, "Foo");
        assert_eq!(
            table
                .find_slots(&*scenario.registry, &foo)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_explicit_class_override() {
        let scenario = Scenario::new();
        let base = scenario.build(
            TypeBuilder::class("Demo", "Base").method(MethodBuilder::virtual_method("Foo")),
        );
        let target = scenario.method_ref(base.identity(), &base, "Foo");
        let derived = scenario.build(
            TypeBuilder::class("Demo", "Derived")
                .extends(base.identity())
                .method(MethodBuilder::virtual_method("Renamed").overrides(target)),
        );

        let mut storage = scenario.storage();
        let table = storage.get_vtable(&derived.identity()).unwrap();
        let foo = VTableSignature::from_method(&scenario.method(&base, "Foo"));

        let visible = table.resolve(&foo).unwrap();
        let visible_slot = slot(&table, visible);
        assert_eq!(
            visible_slot.implementing_method,
            scenario.method(&derived, "Renamed").token
        );
        assert_eq!(visible_slot.overrides, Some(table.slots()[0]));
    }

    #[test]
    fn test_explicit_override_skips_own_slots() {
        let scenario = Scenario::new();
        let base = scenario.build(
            TypeBuilder::class("Demo", "Base").method(MethodBuilder::virtual_method("Foo")),
        );
        let target = scenario.method_ref(base.identity(), &base, "Foo");
        let derived = scenario.build(
            TypeBuilder::class("Demo", "Derived")
                .extends(base.identity())
                .method(MethodBuilder::override_method("Foo"))
                .method(MethodBuilder::virtual_method("Other").overrides(target)),
        );

        let mut storage = scenario.storage();
        let table = storage.get_vtable(&derived.identity()).unwrap();

        // The explicit override replaces the base slot, not the one `Foo` just installed
        let last = slot(&table, *table.slots().last().unwrap());
        assert_eq!(
            last.implementing_method,
            scenario.method(&derived, "Other").token
        );
        assert_eq!(last.overrides, Some(table.slots()[0]));
    }

    #[test]
    fn test_explicit_override_of_unimplemented_interface() {
        let scenario = Scenario::new();
        let iface = scenario.build(
            TypeBuilder::interface("Demo", "IFoo").method(MethodBuilder::abstract_method("Foo")),
        );
        let target = scenario.method_ref(iface.identity(), &iface, "Foo");
        let ty = scenario.build(
            TypeBuilder::class("Demo", "Liar")
                .method(MethodBuilder::explicit_method("Demo.IFoo.Foo").overrides(target)),
        );

        let mut storage = scenario.storage();
        assert!(matches!(
            storage.get_vtable(&ty.identity()),
            Err(Error::InvariantViolation { .. })
        ));
    }

    #[test]
    fn test_explicit_override_of_unresolvable_target() {
        let scenario = Scenario::new();
        let external = scenario.registry.add_member_ref(None);
        let ty = scenario.build(
            TypeBuilder::class("Demo", "Dangling").method(
                MethodBuilder::virtual_method("Foo")
                    .overrides(MethodReference::new(
                        TypeIdentity::definition(Token::new(0x01000001)),
                        external,
                    )),
            ),
        );

        let mut storage = scenario.storage();
        assert!(matches!(
            storage.get_vtable(&ty.identity()),
            Err(Error::ResolutionError(token)) if token == external
        ));
    }

    #[test]
    fn test_final_override() {
        let scenario = Scenario::new();
        let base = scenario.build(
            TypeBuilder::class("Demo", "Base")
                .method(MethodBuilder::virtual_method("Foo").sealed()),
        );
        let derived = scenario.build(
            TypeBuilder::class("Demo", "Derived")
                .extends(base.identity())
                .method(MethodBuilder::override_method("Foo")),
        );

        let mut lenient = scenario.storage();
        assert!(lenient.get_vtable(&derived.identity()).is_ok());

        let mut strict = scenario.storage_with(VTableConfig::strict());
        assert!(matches!(
            strict.get_vtable(&derived.identity()),
            Err(Error::InvariantViolation { .. })
        ));
    }

    #[test]
    fn test_legacy_single_pass_agrees() {
        let (scenario, root, diamond) = diamond();

        let mut fixpoint = scenario.storage();
        let mut legacy = scenario.storage_with(VTableConfig::legacy());
        let a = fixpoint.get_vtable(&diamond.identity()).unwrap();
        let b = legacy.get_vtable(&diamond.identity()).unwrap();

        let implementer = |table: &VTable| {
            let slots = table.interface_slots(&root.identity()).unwrap();
            slot(table, slots[0]).implementing_method
        };
        assert_eq!(implementer(a.as_ref()), implementer(b.as_ref()));
    }
}
