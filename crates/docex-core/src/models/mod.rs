//! Data models for extraction results and configuration.

pub mod config;
pub mod document;

pub use config::DocexConfig;
pub use document::{
    BatchResult, DocumentResult, ExtractionResult, SourceType, StructuredExtraction,
};
