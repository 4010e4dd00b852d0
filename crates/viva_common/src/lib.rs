//! Viva Common - shared types for the viva examiner daemon and its client.
//!
//! Holds the wire protocol, the prompt templates, the reply parser and the
//! credential-rotating generation client.

pub mod credentials;
pub mod error;
pub mod llm_client;
pub mod parser;
pub mod prompts;
pub mod protocol;

pub use credentials::CredentialPool;
pub use error::{GenerationError, VivaError};
pub use llm_client::{FakeBackend, GeminiBackend, GenerationBackend, RotatingClient};
pub use parser::{parse_evaluation, parse_report, Evaluation, Report};
pub use protocol::*;

/// Number of answered questions after which a session produces its report.
pub const EXCHANGE_LIMIT: u32 = 5;

/// Crate version, shared by the daemon health endpoint and the client.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
