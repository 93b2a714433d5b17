//! Generative-text clients for newsbot
//!
//! The summarizer talks to the backend only through [`TextGenerator`], so the
//! OpenAI client here can be swapped for another provider or a test double.

pub mod error;
pub mod generator;
pub mod openai;

pub use error::LlmError;
pub use generator::TextGenerator;
pub use openai::OpenAIClient;
