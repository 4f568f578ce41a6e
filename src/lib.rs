//! vassist: a line-based assistant built from plugins.
//!
//! Commands, versioned methods and classes come from plugin descriptors
//! linked against a compiled-in catalog; the version store, input
//! processor and run loop are themselves chosen from strategy descriptors.

pub mod app;
pub mod assistant;
pub mod cli;
pub mod config;
pub mod logging;
pub mod output;
pub mod plugin;
pub mod version;
