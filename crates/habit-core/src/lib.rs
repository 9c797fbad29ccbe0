//! # habit-core
//!
//! Core types, traits, configuration, and error handling for habitbot.

pub mod config;
pub mod error;
pub mod language;
pub mod message;
pub mod traits;
