//! Virtual dispatch tables.
//!
//! This module computes, for every type of a closed module set, the ordered table of
//! virtual method slots the type exposes to callers, together with the slots it presents
//! when called through each interface it implements. It covers diamond interface
//! inheritance, explicit override directives (`.override` / `MethodImpl`) and generic
//! instantiations, whose tables are derived from the open definition's table by
//! substitution instead of being rebuilt.
//!
//! # Key Components
//!
//! - [`VTableStorage`]: Memoizing entry point, [`VTableStorage::get_vtable`]
//! - [`VTable`]: Slot log and per-interface slot lists of one type
//! - [`Slot`] / [`SlotRef`] / [`SlotArena`]: Immutable slots linked to the slot they supersede
//! - [`VTableSignature`]: The dispatch key (name and substituted shape)
//! - [`VTableConfig`]: Construction options
//!
//! # Examples
//!
//! ```rust
//! use dotvtable::prelude::*;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(TypeRegistry::new());
//! let disposable = TypeBuilder::interface("System", "IDisposable")
//!     .method(MethodBuilder::abstract_method("Dispose"))
//!     .build(&registry)?;
//! let handle = TypeBuilder::class("Demo", "Handle")
//!     .implements(disposable.identity())
//!     .method(MethodBuilder::virtual_method("Dispose"))
//!     .build(&registry)?;
//!
//! let mut storage = VTableStorage::new(registry.clone());
//! let table = storage.get_vtable(&handle.identity())?;
//!
//! let dispose = registry.method_by_name(&handle.token, "Dispose").unwrap();
//! let slots = table.interface_slots(&disposable.identity()).unwrap();
//! assert_eq!(table.slot(slots[0]).unwrap().implementing_method, dispose.token);
//! # Ok::<(), dotvtable::Error>(())
//! ```

mod config;
mod construction;
mod signature;
mod slot;
mod storage;
mod table;

pub use config::VTableConfig;
pub use signature::VTableSignature;
pub use slot::{Slot, SlotArena, SlotHistory, SlotRef};
pub use storage::VTableStorage;
pub use table::VTable;
