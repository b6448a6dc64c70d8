//! Hash map backing the in-memory host's listener tables.
//!
//! `hashbrown` by default; the `std-hash` feature switches to `std`.

#[cfg(feature = "std-hash")]
pub mod map {
    pub use std::collections::HashMap;
}

#[cfg(not(feature = "std-hash"))]
pub mod map {
    pub use hashbrown::HashMap;
}

/// Listener table of one host node, keyed by event name.
pub type ListenerMap<V> = map::HashMap<String, V>;
