//! Core types for the Kana voice assistant backend: the `{display, speak}`
//! outcome contract, conversation context, configuration, and errors.

pub mod config;
pub mod context;
pub mod error;
pub mod outcome;
pub mod traits;

pub use config::shellexpand;
pub use error::KanaError;
