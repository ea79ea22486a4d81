pub mod adjacency;
pub mod front;
pub mod graph;

pub use graph::SettlementGraph;
