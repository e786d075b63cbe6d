//! Core library for document extraction.
//!
//! This crate provides:
//! - Text loaders for PDF, image, Word and plain text files
//! - OCR with a Tesseract or pure-Rust ONNX engine
//! - Recursive text chunking
//! - LLM-backed structured extraction with date normalization
//! - Reconciliation of per-chunk extractions
//! - A concurrent single-file and batch pipeline

pub mod chunking;
pub mod error;
pub mod extraction;
pub mod loaders;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod reconcile;

pub use chunking::RecursiveChunker;
pub use error::{DocexError, Result};
pub use extraction::{LlmExtractionClient, StructuredExtractionClient};
pub use loaders::{Loader, LoaderDispatcher};
pub use models::{
    BatchResult, DocexConfig, DocumentResult, ExtractionResult, SourceType, StructuredExtraction,
};
pub use ocr::OcrEngine;
pub use pipeline::{CancellationFlag, Pipeline, compose_confidence};
pub use reconcile::reconcile;

/// Re-export the LLM client crate.
pub use docex_llm;
