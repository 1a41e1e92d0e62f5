//! # filtergraph
//!
//! HTTP and CLI surfaces over `filtergraph-core`.
//!
//! The binary in `main.rs` only sets up logging and hands off to [`cli`];
//! the library split lets integration tests drive [`api::create_router`]
//! directly.

pub mod api;
pub mod cli;
pub mod config;
