//! Filesystem utilities for rover.
//!
//! Task, iteration and sandbox support files are all written through the
//! atomic helpers here so a concurrent reader (a `list` racing an `iterate`)
//! never observes a torn record.

pub mod atomic;

pub use atomic::{atomic_write, atomic_write_file, atomic_write_json, atomic_write_private};
