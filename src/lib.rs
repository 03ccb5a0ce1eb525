//! Bokstavsresan lesson and progression engine
//!
//! The core of a phonics learning game for young children, many with
//! dyspraxia: letter and word curriculum, per-letter mastery tracking,
//! a serialized speech queue over an external synthesizer, three
//! exercise modes, and durable per-profile progress. UI rendering,
//! asset handling, and the synthesizer itself live outside this crate.

pub mod config;
pub mod curriculum;
pub mod engine;
pub mod error;
pub mod progress;
pub mod session;
pub mod speech;

pub use error::{EngineError, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "bokstavsresan";
