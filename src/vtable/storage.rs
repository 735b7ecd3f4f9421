use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use crate::{
    error::invariant_error,
    metadata::{
        signatures::{GenericSubstitution, TypeSignature},
        token::Token,
        typesystem::{TypeDefinitionRc, TypeIdentity, TypeUniverse},
    },
    vtable::{
        construction::{canonical_identity, VTableBuilder},
        Slot, SlotArena, SlotRef, VTable, VTableConfig,
    },
    Error::{CyclicTypeGraph, RecursionLimit, UnsupportedTypeShape},
    Result,
};

enum CacheEntry {
    InProgress,
    Done(Arc<VTable>),
}

/// Memoizing cache of vtables over one [`TypeUniverse`]
///
/// Tables of type definitions are constructed on first request, recursively requesting the
/// tables of base types and interfaces. Tables of generic instantiations are derived from the
/// table of the open definition by substitution, and cached separately.
///
/// The storage is not thread-safe: every lookup that may construct a table takes
/// `&mut self`. The universe must not change while the storage is alive.
///
/// # Examples
///
/// ```rust
/// use dotvtable::prelude::*;
/// use std::sync::Arc;
///
/// let registry = Arc::new(TypeRegistry::new());
/// let base = TypeBuilder::class("Demo", "Base")
///     .method(MethodBuilder::virtual_method("Foo"))
///     .build(&registry)?;
/// let derived = TypeBuilder::class("Demo", "Derived")
///     .extends(base.identity())
///     .method(MethodBuilder::override_method("Foo"))
///     .build(&registry)?;
///
/// let mut storage = VTableStorage::new(registry.clone());
/// let table = storage.get_vtable(&derived.identity())?;
/// assert_eq!(table.len(), 2);
/// assert_eq!(table.visible_slots().len(), 1);
/// # Ok::<(), dotvtable::Error>(())
/// ```
pub struct VTableStorage {
    universe: Arc<dyn TypeUniverse>,
    config: VTableConfig,
    arena: SlotArena,
    tables: HashMap<Token, CacheEntry>,
    instances: HashMap<TypeIdentity, Arc<VTable>>,
    depth: usize,
}

impl VTableStorage {
    /// Create an empty storage with the default configuration
    ///
    /// ## Arguments
    /// * 'universe' - The closed module set tables are built for
    #[must_use]
    pub fn new(universe: Arc<dyn TypeUniverse>) -> Self {
        Self::with_config(universe, VTableConfig::default())
    }

    /// Create an empty storage
    ///
    /// ## Arguments
    /// * 'universe' - The closed module set tables are built for
    /// * 'config'   - Construction configuration
    #[must_use]
    pub fn with_config(universe: Arc<dyn TypeUniverse>, config: VTableConfig) -> Self {
        VTableStorage {
            universe,
            config,
            arena: SlotArena::new(),
            tables: HashMap::new(),
            instances: HashMap::new(),
            depth: 0,
        }
    }

    /// The universe tables are built for
    #[must_use]
    pub fn universe(&self) -> &Arc<dyn TypeUniverse> {
        &self.universe
    }

    /// The construction configuration
    #[must_use]
    pub fn config(&self) -> &VTableConfig {
        &self.config
    }

    /// The arena holding every slot this storage produced
    #[must_use]
    pub fn arena(&self) -> &SlotArena {
        &self.arena
    }

    /// The already constructed table of a type definition, without triggering construction
    #[must_use]
    pub fn get(&self, token: Token) -> Option<Arc<VTable>> {
        match self.tables.get(&token) {
            Some(CacheEntry::Done(table)) => Some(Arc::clone(table)),
            _ => None,
        }
    }

    /// Number of constructed type definition tables
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables
            .values()
            .filter(|entry| matches!(entry, CacheEntry::Done(_)))
            .count()
    }

    /// Returns `true` if no table was constructed yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The vtable of `ty`, constructing it (and everything it depends on) if necessary
    ///
    /// ## Arguments
    /// * 'ty' - A type definition, a type reference or a generic instantiation of either
    ///
    /// # Errors
    /// - [`crate::Error::UnsupportedTypeShape`] if `ty` names no type definition
    /// - [`crate::Error::ResolutionError`] if a required type or method is not loaded
    /// - [`crate::Error::CyclicTypeGraph`] if the type graph is cyclic
    /// - [`crate::Error::RecursionLimit`] if the type graph nests too deeply
    /// - [`crate::Error::InvariantViolation`] if an override target has no slot
    pub fn get_vtable(&mut self, ty: &TypeIdentity) -> Result<Arc<VTable>> {
        let identity = canonical_identity(self.universe.as_ref(), ty);

        match identity.signature() {
            TypeSignature::Class(token) | TypeSignature::ValueType(token) => {
                let definition = self.universe.resolve_type(*token)?;
                self.definition_table(&definition)
            }
            TypeSignature::GenericInst(base, _)
                if matches!(
                    base.as_ref(),
                    TypeSignature::Class(_) | TypeSignature::ValueType(_)
                ) =>
            {
                self.instance_table(&identity)
            }
            _ => Err(UnsupportedTypeShape(identity.to_string())),
        }
    }

    fn instance_table(&mut self, instance: &TypeIdentity) -> Result<Arc<VTable>> {
        if let Some(table) = self.instances.get(instance) {
            log::debug!("vtable cache hit for {}", instance);
            return Ok(Arc::clone(table));
        }

        let definition = self.universe.resolve_identity(instance)?;
        let open = self.definition_table(&definition)?;

        log::debug!("Projecting vtable of {} onto {}", open.ty(), instance);
        let table = Arc::new(Projection::new(&self.arena, &open, instance).project()?);
        self.instances.insert(instance.clone(), Arc::clone(&table));

        Ok(table)
    }

    fn definition_table(&mut self, definition: &TypeDefinitionRc) -> Result<Arc<VTable>> {
        match self.tables.get(&definition.token) {
            Some(CacheEntry::Done(table)) => {
                log::debug!("vtable cache hit for {}", definition.fullname());
                return Ok(Arc::clone(table));
            }
            Some(CacheEntry::InProgress) => {
                log::warn!(
                    "{} is part of a cycle in the type graph",
                    definition.fullname()
                );
                return Err(CyclicTypeGraph(definition.token));
            }
            None => {}
        }

        if self.depth >= self.config.max_depth {
            return Err(RecursionLimit(self.config.max_depth));
        }

        log::debug!("vtable cache miss for {}", definition.fullname());
        self.tables.insert(definition.token, CacheEntry::InProgress);
        self.depth += 1;
        let result = self.construct(definition);
        self.depth -= 1;

        match result {
            Ok(table) => {
                let table = Arc::new(table);
                self.tables
                    .insert(definition.token, CacheEntry::Done(Arc::clone(&table)));
                Ok(table)
            }
            Err(error) => {
                self.tables.remove(&definition.token);
                Err(error)
            }
        }
    }

    fn construct(&mut self, definition: &TypeDefinitionRc) -> Result<VTable> {
        let universe = Arc::clone(&self.universe);

        let base = match universe.base_type_of(definition) {
            Some(base) => Some(self.get_vtable(&base)?),
            None => None,
        };

        let mut interfaces = Vec::new();
        for iface in universe.directly_implemented_interfaces(definition) {
            let iface = canonical_identity(universe.as_ref(), &iface);
            let table = self.get_vtable(&iface)?;
            interfaces.push((iface, table));
        }

        VTableBuilder::new(
            universe.as_ref(),
            self.config,
            self.arena.clone(),
            Arc::clone(definition),
        )?
        .build(base.as_deref(), &interfaces)
    }
}

/// Derives the table of a generic instantiation from the table of its open definition
struct Projection<'a> {
    arena: &'a SlotArena,
    open: &'a VTable,
    instance: &'a TypeIdentity,
    subst: GenericSubstitution<'a>,
    projected: HashMap<SlotRef, SlotRef>,
}

impl<'a> Projection<'a> {
    fn new(arena: &'a SlotArena, open: &'a VTable, instance: &'a TypeIdentity) -> Self {
        Projection {
            arena,
            open,
            instance,
            subst: GenericSubstitution::new(instance.generic_args()),
            projected: HashMap::new(),
        }
    }

    fn project(mut self) -> Result<VTable> {
        let open = self.open;
        let mut slots = Vec::with_capacity(open.len());
        for slot in open.slots() {
            slots.push(self.project_slot(*slot)?);
        }

        let mut interface_slots = BTreeMap::new();
        for (iface, iface_slots) in open.interface_map() {
            let mut projected = Vec::with_capacity(iface_slots.len());
            for slot in iface_slots {
                projected.push(self.project_slot(*slot)?);
            }
            interface_slots.insert(self.substitute(iface), projected);
        }

        Ok(VTable::new(
            self.instance.clone(),
            slots,
            interface_slots,
            self.arena.clone(),
        ))
    }

    fn project_slot(&mut self, slot: SlotRef) -> Result<SlotRef> {
        if let Some(projected) = self.projected.get(&slot) {
            return Ok(*projected);
        }

        let arena = self.arena;
        let data = arena
            .get(slot)
            .ok_or_else(|| invariant_error!("Slot {} is not part of the arena", slot))?;
        let projected = arena.alloc(Slot {
            declaring_type: self.retarget(&data.declaring_type),
            signature: data.signature.substitute(&self.subst),
            implementing_method: data.implementing_method,
            implementing_method_declaring_type: self
                .retarget(&data.implementing_method_declaring_type),
            overrides: data.overrides,
        });
        self.projected.insert(slot, projected);

        Ok(projected)
    }

    /// The instance if `ty` is the open definition, `ty` with the arguments substituted
    /// otherwise
    fn retarget(&self, ty: &TypeIdentity) -> TypeIdentity {
        if ty == self.open.ty() {
            self.instance.clone()
        } else {
            self.substitute(ty)
        }
    }

    fn substitute(&self, ty: &TypeIdentity) -> TypeIdentity {
        TypeIdentity::from(self.subst.type_sig(ty.signature()))
    }
}
