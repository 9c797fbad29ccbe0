//! # habit-memory
//!
//! Persistent habit storage for habitbot (SQLite-backed).

pub mod store;

pub use store::{HabitEntry, Store, UserStats};
