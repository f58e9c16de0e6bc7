//! Hash container aliases used across the crate.
//!
//! Iteration order is insertion order, which keeps rule numbering, state
//! discovery, and every dump deterministic across runs.

type BuildHasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;

pub type Map<K, V> = indexmap::IndexMap<K, V, BuildHasher>;
pub type Set<T> = indexmap::IndexSet<T, BuildHasher>;
