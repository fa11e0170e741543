pub mod client;
pub mod feed;
pub mod market;
pub mod monitoring;
pub mod runtime;
pub mod simulation;
pub mod types;
pub mod utils;

pub use crate::types::*;
