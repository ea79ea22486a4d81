pub mod config;
pub mod error;
pub mod ids;
pub mod rng;

pub use error::{CampaignError, Result, StateError};
