//! # Otter VM Object
//!
//! Property storage for the Otter JavaScript engine: slots, slot maps and
//! the object operations built on them.
//!
//! ## Design Principles
//!
//! - **Two maps, one interface**: small objects use an open hash table with
//!   lock-free lookups, large objects switch once to an ordered balanced map
//! - **Creation order**: enumeration always follows property creation order
//! - **Thread-safe option**: objects shared between threads get a container
//!   guarded by a stamped lock with optimistic reads
//! - **Strict-mode aware**: forbidden writes and deletes are silent in sloppy
//!   code and `TypeError`s in strict code

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod abstract_ops;
pub mod config;
pub mod container;
pub mod context;
pub mod convert;
pub mod descriptor;
pub mod error;
pub mod key;
pub mod object;
pub mod slot;
pub mod slot_map;
pub mod stamped_lock;
pub mod string;
pub mod symbol;
pub mod thread_safe;
pub mod value;

pub use abstract_ops::{IntegrityLevel, has_own_property, set_integrity_level, test_integrity_level};
pub use config::SlotMapConfig;
pub use container::SlotMapContainer;
pub use context::{ExecutionContext, Feature};
pub use descriptor::PropertyDescriptor;
pub use error::{VmError, VmResult};
pub use key::PropertyKey;
pub use object::JsObject;
pub use slot::{AccessorPair, Attributes, Getter, HostError, HostMember, Setter, Slot, SlotKind};
pub use slot_map::{BalancedSlotMap, EmbeddedSlotMap, SlotAccess, SlotIter, SlotMap, SlotReadGuard};
pub use string::JsString;
pub use symbol::Symbol;
pub use thread_safe::ThreadSafeSlotMapContainer;
pub use value::{JsFunction, Value};
