//! Structured extraction: prompt, model call and response parsing.

mod client;
pub mod dates;
mod parser;
mod prompt;

pub use client::{LlmExtractionClient, StructuredExtractionClient};
pub use dates::{DateRole, normalize_date};
pub use parser::parse_response;
pub use prompt::{DOCUMENT_TYPES, build_prompt};
