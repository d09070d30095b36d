// Nightshift — Resumable day/night batch driver for a local image-generation queue
// License: Apache-2.0

pub mod batch;
pub mod config;
pub mod logger;
pub mod progress;
pub mod prompts;
pub mod queue;
pub mod seed;
pub mod workflow;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
