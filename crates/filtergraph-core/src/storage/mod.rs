//! # Storage Module
//!
//! Persistent relationship store backends.

pub mod redb_store;

pub use redb_store::RedbStore;
