//! Turn simulation systems and the pipeline that sequences them.

pub mod breach;
pub mod commitment;
pub mod control;
pub mod movement;
pub mod pipeline;
pub mod pressure;
pub mod supply;

pub use pipeline::{run_turn, TurnInput, TurnReport};
