//! Language-model integration.
//!
//! This module provides:
//! - The [`AIProvider`] abstraction
//! - An Anthropic Messages API implementation
//! - An offline provider for dry runs

pub mod anthropic;
pub mod offline;
pub mod provider;

pub use anthropic::AnthropicProvider;
pub use offline::OfflineProvider;
pub use provider::{AIMessage, AIProvider, AIResponse, AIRole, GenerateOptions, TokenUsage};
