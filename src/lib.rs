#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// Error types reported by the fallible operations.
pub mod error;

/// A hash map using open addressing with linear probing.
///
/// This module provides an `OpenAddressingMap` that wraps the `HashTable` and
/// provides a key-value map interface with configurable hashers.
pub mod hash_map;

pub mod hash_table;

pub use error::TryReserveError;
pub use hash_map::Entry;
pub use hash_map::OpenAddressingMap;
pub use hash_table::HashTable;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hasher builder used by [`DefaultOpenAddressingMap`].
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The hasher builder used by [`DefaultOpenAddressingMap`].
        pub type DefaultHashBuilder = std::hash::RandomState;
    }
}

/// An [`OpenAddressingMap`] using the crate's default hasher builder.
#[cfg(any(feature = "foldhash", feature = "std"))]
pub type DefaultOpenAddressingMap<K, V> = OpenAddressingMap<K, V, DefaultHashBuilder>;
