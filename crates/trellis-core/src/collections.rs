//! Map aliases shared by the overlay stores.
//!
//! Overlay and row-set lookups sit on the request hot path, so the default
//! build keys them with `ahash`. Enabling `std-hash` swaps in the std maps.

#[cfg(feature = "std-hash")]
pub mod map {
    pub type HashMap<K, V> = std::collections::HashMap<K, V>;
    pub type HashSet<T> = std::collections::HashSet<T>;
    pub type BuildHasher = std::collections::hash_map::RandomState;
}

#[cfg(not(feature = "std-hash"))]
pub mod map {
    pub type HashMap<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;
    pub type HashSet<T> = hashbrown::HashSet<T, ahash::RandomState>;
    pub type BuildHasher = ahash::RandomState;
}

/// Insertion-ordered map; row sets rely on it to keep row order.
pub type OrderedMap<K, V> = indexmap::IndexMap<K, V, map::BuildHasher>;
