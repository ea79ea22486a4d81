//! Salient - Deterministic Territorial Campaign Engine

pub mod core;
pub mod map;
pub mod sim;
pub mod state;
