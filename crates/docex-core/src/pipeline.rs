//! Per-document and batch orchestration.
//!
//! A document goes through loader dispatch, a text validity check,
//! chunking, one structured extraction per chunk, reconciliation and
//! confidence composition. Every failure along the way ends up in the
//! returned [`DocumentResult`]; nothing propagates to the caller.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::chunking::RecursiveChunker;
use crate::error::{DocexError, Result};
use crate::extraction::{LlmExtractionClient, StructuredExtractionClient};
use crate::loaders::LoaderDispatcher;
use crate::models::config::{DocexConfig, PipelineConfig};
use crate::models::document::{
    BatchResult, DocumentResult, SourceType, StructuredExtraction, clamp_confidence,
};
use crate::ocr::create_engine;
use crate::reconcile::reconcile;

const NO_TEXT_EXTRACTED: &str = "No text extracted";
const CANCELLED: &str = "Cancelled before processing";
const CANCELLED_MIDWAY: &str = "Cancelled during processing";

/// Shared flag that stops a batch from starting new work.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop issuing new documents and chunks. Work in flight finishes.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Final confidence: loader confidence times extraction confidence,
/// rounded to two decimals.
pub fn compose_confidence(loader_confidence: f32, extraction_confidence: f32) -> f32 {
    let product = clamp_confidence(loader_confidence * extraction_confidence);
    (product * 100.0).round() / 100.0
}

/// Document extraction pipeline.
pub struct Pipeline {
    dispatcher: Arc<LoaderDispatcher>,
    client: Arc<dyn StructuredExtractionClient>,
    chunker: RecursiveChunker,
    settings: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        dispatcher: LoaderDispatcher,
        client: Arc<dyn StructuredExtractionClient>,
        settings: PipelineConfig,
    ) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            client,
            chunker: RecursiveChunker::new(settings.chunk_size, settings.chunk_overlap),
            settings,
        }
    }

    /// Build the OCR engine, default loaders, LLM backend and extraction
    /// client described by `config`.
    pub fn from_config(config: &DocexConfig) -> Result<Self> {
        config.validate()?;

        let ocr = create_engine(&config.ocr)?;
        let dispatcher = LoaderDispatcher::with_defaults(ocr, config);
        let backend = docex_llm::create_backend(&config.llm)
            .map_err(|e| DocexError::Config(e.to_string()))?;
        let client = Arc::new(LlmExtractionClient::new(backend));

        Ok(Self::new(dispatcher, client, config.pipeline.clone()))
    }

    pub fn dispatcher(&self) -> &LoaderDispatcher {
        &self.dispatcher
    }

    /// Process one file.
    pub async fn process_single(&self, path: &Path) -> DocumentResult {
        self.process_document(path, &CancellationFlag::new()).await
    }

    /// Process files with up to `max_workers` in flight. Results keep the
    /// input order.
    pub async fn process_batch(&self, paths: &[PathBuf]) -> BatchResult {
        self.process_batch_with(paths, &CancellationFlag::new(), |_, _| {})
            .await
    }

    /// Like [`process_batch`](Self::process_batch), with cancellation and a
    /// callback invoked with the input index of each finished document.
    ///
    /// Documents not started before `cancel` fires are reported as failed.
    pub async fn process_batch_with<F>(
        &self,
        paths: &[PathBuf],
        cancel: &CancellationFlag,
        mut on_done: F,
    ) -> BatchResult
    where
        F: FnMut(usize, &DocumentResult),
    {
        let start = Instant::now();
        let workers = self.settings.max_workers.max(1);
        let mut slots: Vec<Option<DocumentResult>> = vec![None; paths.len()];

        let mut finished = stream::iter(paths.iter().enumerate())
            .map(|(index, path)| async move {
                let result = if cancel.is_cancelled() {
                    debug!("Skipping {}: batch cancelled", path.display());
                    DocumentResult::failed(source_name(path), SourceType::from_path(path), CANCELLED)
                } else {
                    self.process_document(path, cancel).await
                };
                (index, result)
            })
            .buffer_unordered(workers);

        while let Some((index, result)) = finished.next().await {
            on_done(index, &result);
            slots[index] = Some(result);
        }

        let documents = slots
            .into_iter()
            .zip(paths)
            .map(|(slot, path)| {
                slot.unwrap_or_else(|| {
                    DocumentResult::failed(source_name(path), SourceType::from_path(path), CANCELLED)
                })
            })
            .collect();

        let batch = BatchResult::from_documents(documents);
        info!(
            "Batch of {} finished in {:?}: {} successful, {} failed",
            batch.total,
            start.elapsed(),
            batch.successful,
            batch.failed
        );
        batch
    }

    async fn process_document(&self, path: &Path, cancel: &CancellationFlag) -> DocumentResult {
        let start = Instant::now();
        let source = source_name(path);
        let source_type = SourceType::from_path(path);

        let loader = match self.dispatcher.get_loader(path) {
            Ok(loader) => loader,
            Err(e) => {
                warn!("{}: {}", path.display(), e);
                return DocumentResult::failed(source, source_type, format!("Extraction failed: {}", e));
            }
        };

        debug!("{}: using {} loader", path.display(), loader.name());
        let owned_path = path.to_path_buf();
        let extraction = match tokio::task::spawn_blocking(move || loader.extract(&owned_path)).await {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!("{}: loader task failed: {}", path.display(), e);
                return DocumentResult::failed(
                    source,
                    source_type,
                    format!("Extraction failed: loader task failed: {}", e),
                );
            }
        };

        if let Some(error) = extraction.error {
            return DocumentResult::failed(source, source_type, error);
        }
        if extraction.text.trim().is_empty() {
            return DocumentResult::failed(source, source_type, NO_TEXT_EXTRACTED);
        }

        let result = match self.extract_structured(&extraction.text, cancel).await {
            Ok(structured) => {
                let confidence = compose_confidence(extraction.confidence, structured.confidence);
                DocumentResult::extracted(source, source_type, structured, confidence)
            }
            Err(DocexError::Cancelled) => {
                debug!("{}: cancelled between chunks", path.display());
                DocumentResult::failed(source, source_type, CANCELLED_MIDWAY)
            }
            Err(e) => {
                warn!("{}: {}", path.display(), e);
                DocumentResult::failed(source, source_type, format!("LLM processing failed: {}", e))
            }
        };

        info!(
            "Processed {} in {}ms (confidence {:.2})",
            path.display(),
            start.elapsed().as_millis(),
            result.confidence
        );
        result
    }

    /// Chunk, extract each chunk and reconcile the successes.
    ///
    /// A chunk skipped by cancellation fails the whole document.
    async fn extract_structured(
        &self,
        text: &str,
        cancel: &CancellationFlag,
    ) -> Result<StructuredExtraction> {
        let chunks = self.chunker.split(text);

        match chunks.as_slice() {
            [] => Err(DocexError::ExtractionFailed(NO_TEXT_EXTRACTED.to_string())),
            [only] => self.extract_chunk(only, cancel).await,
            _ => {
                let total = chunks.len();
                debug!("Extracting {} chunks", total);

                let outcomes: Vec<Result<StructuredExtraction>> = stream::iter(chunks.iter())
                    .map(|chunk| self.extract_chunk(chunk, cancel))
                    .buffered(self.settings.chunk_concurrency.max(1))
                    .collect()
                    .await;

                let mut successes = Vec::with_capacity(total);
                let mut last_error = None;
                for (index, outcome) in outcomes.into_iter().enumerate() {
                    match outcome {
                        Ok(extraction) => successes.push(extraction),
                        Err(DocexError::Cancelled) => return Err(DocexError::Cancelled),
                        Err(e) => {
                            warn!("Chunk {}/{} excluded: {}", index + 1, total, e);
                            last_error = Some(e.to_string());
                        }
                    }
                }

                if successes.is_empty() {
                    return Err(DocexError::AllChunksFailed {
                        chunks: total,
                        last_error: last_error.unwrap_or_default(),
                    });
                }
                reconcile(successes)
            }
        }
    }

    async fn extract_chunk(&self, chunk: &str, cancel: &CancellationFlag) -> Result<StructuredExtraction> {
        if cancel.is_cancelled() {
            return Err(DocexError::Cancelled);
        }

        let timeout = Duration::from_secs(self.settings.chunk_timeout_secs);
        match tokio::time::timeout(timeout, self.client.extract(chunk)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(DocexError::StructuredExtractionFailed(format!(
                "timed out after {}s",
                self.settings.chunk_timeout_secs
            ))),
        }
    }
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
