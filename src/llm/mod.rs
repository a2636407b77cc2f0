//! LLM Provider Clients
//!
//! Workers hand their aggregated data to an [`LLMClient`] to produce the
//! narrative report. The provider is picked from `[llm]` in
//! `molecule-insight.toml` and built once at startup through
//! [`LLMClientFactory`].
//!
//! # Supported Providers
//!
//! Enable providers via Cargo features:
//! - `ollama` - Local Ollama server (default)
//! - `openai` - OpenAI API and compatible endpoints
//!
//! # Example
//!
//! ```ignore
//! use molecule_insight::llm::{LLMClientFactory, Provider};
//!
//! let factory = LLMClientFactory::new(Provider::Ollama {
//!     base_url: "http://localhost:11434".to_string(),
//!     model: "llama3.2".to_string(),
//!     temperature: 0.3,
//! });
//! let client = factory.create_default()?;
//! let report = client
//!     .generate_with_system("You are a patent analyst.", "Summarize the patent landscape of Metformin")
//!     .await?;
//! ```

/// Core LLM client trait and provider selection.
pub mod client;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{LLMClient, LLMClientFactory, Provider};
