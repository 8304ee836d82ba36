//! Configuration for the relay binary.

pub mod dependencies;

pub use dependencies::{sink_config_from, Dependencies};
