//! Autopost crate for running a single X account.
//!
//! This crate provides:
//! - Buzz-post research over X recent search with pattern tagging
//! - Style profiling from the account's own posts
//! - Persona-constrained post generation with bounded regeneration
//! - A review gate (interactive or auto-approve)
//! - Fixed daily slot scheduling and a publish loop
//! - Mention replies and keyword likes

pub mod ai;
pub mod config;
pub mod engage;
pub mod error;
pub mod generate;
pub mod pipeline;
pub mod research;
pub mod review;
pub mod schedule;
pub mod style;
pub mod x;

// Re-export main types
pub use config::{ContentConfig, DataPaths, XCredentials};
pub use error::{AutopostError, AutopostResult, Violation};
pub use generate::{ContentEngine, DraftPost};
pub use pipeline::{GenerateResult, Pipeline, PipelineConfig};
pub use research::{PostPattern, ResearchItem};
pub use schedule::{PostScheduler, ScheduledPost};
pub use style::StyleProfile;
pub use x::{XApi, XClient};
