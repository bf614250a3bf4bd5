//! JSON persistence helpers shared by the manifest store and the
//! registration store.

mod atomic;

pub use atomic::{atomic_read_json, atomic_write_json};
