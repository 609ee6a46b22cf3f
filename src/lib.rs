//! Research wish in, curated and explained arXiv paper list out.

pub mod agents;
pub mod arxiv;
pub mod config;
pub mod error;
pub mod llm;
pub mod paper;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod selection;
pub mod web;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
