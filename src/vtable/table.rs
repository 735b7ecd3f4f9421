use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
};

use crate::{
    metadata::{
        method::MethodReference,
        typesystem::{TypeIdentity, TypeUniverse},
    },
    vtable::{construction::canonical_identity, Slot, SlotArena, SlotRef, VTableSignature},
    Result,
};

/// The virtual dispatch table of one type
///
/// `slots` is an append-only log: it starts with every slot of the base type's table (which
/// in turn starts with its own base's), followed by the slots introduced or overridden at
/// this level. The same signature can therefore appear several times; the entry visible to a
/// caller is the last one, see [`VTable::resolve`].
///
/// `interface_slots` holds, for every interface the type implements (directly, through its
/// base types or through base interfaces), the slots presented when called through that
/// interface, one per signature.
pub struct VTable {
    ty: TypeIdentity,
    slots: Vec<SlotRef>,
    interface_slots: BTreeMap<TypeIdentity, Vec<SlotRef>>,
    arena: SlotArena,
}

impl VTable {
    pub(crate) fn new(
        ty: TypeIdentity,
        slots: Vec<SlotRef>,
        interface_slots: BTreeMap<TypeIdentity, Vec<SlotRef>>,
        arena: SlotArena,
    ) -> Self {
        VTable {
            ty,
            slots,
            interface_slots,
            arena,
        }
    }

    /// The type this table belongs to
    #[must_use]
    pub fn ty(&self) -> &TypeIdentity {
        &self.ty
    }

    /// Access a slot of this table (or any slot of its arena)
    #[must_use]
    pub fn slot(&self, slot: SlotRef) -> Option<&Slot> {
        self.arena.get(slot)
    }

    /// The slot log, in order
    #[must_use]
    pub fn slots(&self) -> &[SlotRef] {
        &self.slots
    }

    /// Iterate the slot log together with the slots
    pub fn iter(&self) -> impl Iterator<Item = (SlotRef, &Slot)> + '_ {
        self.slots
            .iter()
            .filter_map(|slot| self.arena.get(*slot).map(|data| (*slot, data)))
    }

    /// Number of entries in the slot log
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the slot log is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The slots presented when this type is called through `iface`
    #[must_use]
    pub fn interface_slots(&self, iface: &TypeIdentity) -> Option<&[SlotRef]> {
        self.interface_slots.get(iface).map(Vec::as_slice)
    }

    /// All interfaces this type implements, in identity order
    pub fn interfaces(&self) -> impl Iterator<Item = &TypeIdentity> + '_ {
        self.interface_slots.keys()
    }

    pub(crate) fn interface_map(&self) -> &BTreeMap<TypeIdentity, Vec<SlotRef>> {
        &self.interface_slots
    }

    /// The arena backing this table
    #[must_use]
    pub fn arena(&self) -> &SlotArena {
        &self.arena
    }

    /// Every slot, class or interface, currently implemented by `method`
    ///
    /// `method` is canonicalized first: a `TypeRef` inside its declaring type is replaced by
    /// the definition it names, and a `MemberRef` is resolved to its `MethodDef`. A slot
    /// matches when both its implementing method and the type that method is seen through
    /// equal the reference, so `I<int32>::M` and `I<string>::M` are told apart.
    ///
    /// ## Arguments
    /// * 'universe' - The type universe this table was built from
    /// * 'method'   - The method body to look for, through its (possibly generic) owner
    ///
    /// # Errors
    /// Returns [`crate::Error::ResolutionError`] if the method token cannot be resolved.
    pub fn find_slots(
        &self,
        universe: &dyn TypeUniverse,
        method: &MethodReference,
    ) -> Result<Vec<SlotRef>> {
        let definition = universe.resolve_method(method.method)?;
        let canonical = MethodReference::new(
            canonical_identity(universe, &method.declaring_type),
            definition.token,
        );

        Ok(self.slots_implemented_by(&canonical))
    }

    /// Every slot currently implemented by an already canonical `method`
    ///
    /// Class slots come first in log order, followed by interface slots in interface order.
    /// A slot shared between several lists is reported once.
    #[must_use]
    pub fn slots_implemented_by(&self, method: &MethodReference) -> Vec<SlotRef> {
        let mut seen = HashSet::new();
        self.slots
            .iter()
            .chain(self.interface_slots.values().flatten())
            .filter(|slot| {
                self.arena.get(**slot).is_some_and(|data| {
                    data.implementing_method == method.method
                        && data.implementing_method_declaring_type == method.declaring_type
                })
            })
            .filter(|slot| seen.insert(**slot))
            .copied()
            .collect()
    }

    /// The slot currently visible for `signature`, i.e. the last log entry carrying it
    #[must_use]
    pub fn resolve(&self, signature: &VTableSignature) -> Option<SlotRef> {
        self.iter()
            .filter(|(_, slot)| &slot.signature == signature)
            .map(|(slot, _)| slot)
            .last()
    }

    /// One slot per signature: the visible one, in order of the signature's first appearance
    #[must_use]
    pub fn visible_slots(&self) -> Vec<SlotRef> {
        let mut position: HashMap<&VTableSignature, usize> = HashMap::new();
        let mut visible = Vec::new();
        for (slot, data) in self.iter() {
            match position.get(&data.signature) {
                Some(index) => visible[*index] = slot,
                None => {
                    position.insert(&data.signature, visible.len());
                    visible.push(slot);
                }
            }
        }

        visible
    }
}

impl fmt::Debug for VTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VTable")
            .field("ty", &self.ty)
            .field("slots", &self.slots)
            .field("interface_slots", &self.interface_slots)
            .finish()
    }
}
