//! Port traits: boundaries between the domain and the outside world.

pub mod candle_port;
pub mod config_port;
pub mod observation_port;
pub mod round_port;
