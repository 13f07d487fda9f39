//! Key-value slots for persisted client state.
//!
//! The platform's "secure storage" is modelled as a [`KVStore`]: a flat
//! string-keyed byte store. [`RedbStore`] persists to a single redb file,
//! [`MemoryStore`] keeps everything in process, and [`Scoped`] namespaces
//! keys so several owners can share one file (`session:token`,
//! `session:identity`, ...).

pub mod error;
pub mod memory;
pub mod redb;
pub mod scoped;
pub mod traits;

pub use error::KVError;
pub use memory::MemoryStore;
pub use self::redb::RedbStore;
pub use scoped::Scoped;
pub use traits::{KVStore, get_json, set_json};
