//! # habit-channels
//!
//! Messaging platform integrations for habitbot.

pub mod telegram;
pub(crate) mod utils;
