//! Transmutation pricing and lifecycle engine.
//!
//! Prices hypothetical transmutations, records started ones through an
//! approval lifecycle, and fans every committed change out to observer
//! sessions that keep a local view consistent across reconnects.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod ids;
pub mod lifecycle;
pub mod observer;
pub mod pricing;
pub mod scheduler;
pub mod ui;

pub use engine::Engine;
pub use error::{ChannelError, EngineError, TransitionDenial, ValidationError};
