//! Logo generation and post-processing engine.

pub mod batch;
pub mod color;
pub mod crop;
pub mod export;
pub mod generator;
pub mod pipeline;
pub mod prompt;
pub mod quantize;
pub mod team;
