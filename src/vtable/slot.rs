//! Vtable slots and the arena they live in.
//!
//! Slots are immutable once allocated. Overriding a slot allocates a new one that links
//! back to the slot it supersedes, so every slot heads a history chain ending at the slot
//! that first introduced the dispatch entry.

use std::{fmt, sync::Arc};

use crate::{
    metadata::{method::MethodDefinition, token::Token, typesystem::TypeIdentity},
    vtable::VTableSignature,
};

/// Index of a [`Slot`] inside a [`SlotArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotRef(usize);

impl SlotRef {
    /// Position of the slot inside its arena
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One entry of a vtable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    /// The type in whose vtable this slot was introduced
    pub declaring_type: TypeIdentity,
    /// The dispatch key, fixed when the slot is introduced
    pub signature: VTableSignature,
    /// `MethodDef` token of the method currently occupying the slot
    pub implementing_method: Token,
    /// The type declaring `implementing_method`, as seen from this vtable
    pub implementing_method_declaring_type: TypeIdentity,
    /// The slot this one supersedes
    pub overrides: Option<SlotRef>,
}

impl Slot {
    /// A fresh slot introduced by `method` on `declaring_type`
    ///
    /// ## Arguments
    /// * '`declaring_type`' - The type introducing the slot
    /// * 'signature'        - The dispatch key
    /// * 'method'           - The method occupying the slot
    #[must_use]
    pub fn new(
        declaring_type: TypeIdentity,
        signature: VTableSignature,
        method: &MethodDefinition,
    ) -> Self {
        Slot {
            declaring_type,
            signature,
            implementing_method: method.token,
            implementing_method_declaring_type: TypeIdentity::definition(method.declaring_type),
            overrides: None,
        }
    }

    /// A new slot replacing this one with `method`
    ///
    /// The declaring type and signature are kept, the new slot links back to `this`.
    ///
    /// ## Arguments
    /// * 'this'   - The arena reference of `self`
    /// * 'method' - The overriding method
    #[must_use]
    pub fn overridden_by(&self, this: SlotRef, method: &MethodDefinition) -> Self {
        self.implemented_by(
            this,
            method.token,
            TypeIdentity::definition(method.declaring_type),
        )
    }

    /// A new slot with this slot's declaring type and signature, occupied by `method` and
    /// linking back to `overrides`
    pub(crate) fn implemented_by(
        &self,
        overrides: SlotRef,
        method: Token,
        method_declaring_type: TypeIdentity,
    ) -> Self {
        Slot {
            declaring_type: self.declaring_type.clone(),
            signature: self.signature.clone(),
            implementing_method: method,
            implementing_method_declaring_type: method_declaring_type,
            overrides: Some(overrides),
        }
    }

    /// Iterate the slots this one supersedes, nearest first
    #[must_use]
    pub fn history<'a>(&self, arena: &'a SlotArena) -> SlotHistory<'a> {
        SlotHistory {
            arena,
            next: self.overrides,
        }
    }

    /// The slot at the end of the history chain starting at `this`
    ///
    /// Returns `this` if the slot supersedes nothing.
    #[must_use]
    pub fn root(&self, this: SlotRef, arena: &SlotArena) -> SlotRef {
        self.history(arena).last().map_or(this, |(root, _)| root)
    }
}

/// Iterator over the history chain of a [`Slot`]
pub struct SlotHistory<'a> {
    arena: &'a SlotArena,
    next: Option<SlotRef>,
}

impl<'a> Iterator for SlotHistory<'a> {
    type Item = (SlotRef, &'a Slot);

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        let slot = self.arena.get(current)?;
        self.next = slot.overrides;
        Some((current, slot))
    }
}

/// Append-only storage of every slot a [`crate::vtable::VTableStorage`] produced
///
/// Cloning the arena is cheap and yields a handle to the same slots, which is how every
/// [`crate::vtable::VTable`] can resolve its [`SlotRef`]s on its own.
#[derive(Clone, Default)]
pub struct SlotArena {
    slots: Arc<boxcar::Vec<Slot>>,
}

impl SlotArena {
    /// Create an empty arena
    #[must_use]
    pub fn new() -> Self {
        SlotArena {
            slots: Arc::new(boxcar::Vec::new()),
        }
    }

    /// Store `slot`, returning its reference
    pub fn alloc(&self, slot: Slot) -> SlotRef {
        SlotRef(self.slots.push(slot))
    }

    /// Access a slot
    #[must_use]
    pub fn get(&self, slot: SlotRef) -> Option<&Slot> {
        self.slots.get(slot.0)
    }

    /// Number of slots allocated so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.count()
    }

    /// Returns `true` if no slot was allocated yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.count() == 0
    }
}

impl fmt::Debug for SlotArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotArena")
            .field("slots", &self.slots.count())
            .finish()
    }
}
