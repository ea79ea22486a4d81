pub mod game_state;
pub mod militia;
pub mod posture;
pub mod serialize;
pub mod validate;

pub use game_state::{GameState, Phase};
pub use serialize::{parse_game_state, serialize_game_state, state_digest};
