//! Batch processing command for multiple documents.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::{debug, warn};

use docex_core::{BatchResult, CancellationFlag, Pipeline};

use super::{LlmArgs, load_config};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob patterns
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Write the batch JSON here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write a summary CSV to this path
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Number of documents processed concurrently
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    #[command(flatten)]
    llm: LlmArgs,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path, &args.llm)?;
    if let Some(jobs) = args.jobs {
        config.pipeline.max_workers = jobs.max(1);
    }

    let files = expand_inputs(&args.inputs)?;
    if files.is_empty() {
        anyhow::bail!("No matching files found for: {}", args.inputs.join(" "));
    }

    eprintln!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    let pipeline = Pipeline::from_config(&config)?;

    let progress = ProgressBar::with_draw_target(Some(files.len() as u64), ProgressDrawTarget::stderr());
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let cancel = CancellationFlag::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing documents in flight");
            on_interrupt.cancel();
        }
    });

    let batch = pipeline
        .process_batch_with(&files, &cancel, |index, result| {
            if let Some(error) = &result.error {
                debug!("{} failed: {}", files[index].display(), error);
            }
            progress.inc(1);
        })
        .await;

    interrupt.abort();
    progress.finish_and_clear();

    let json = serde_json::to_string_pretty(&batch)?;
    match &args.output {
        Some(path) => {
            fs::write(path, &json)?;
            eprintln!("{} Results written to {}", style("✓").green(), path.display());
        }
        None => println!("{}", json),
    }

    if let Some(summary_path) = &args.summary {
        write_summary(summary_path, &batch)?;
        eprintln!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    eprintln!();
    eprintln!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        batch.total,
        start.elapsed()
    );
    eprintln!(
        "   {} successful, {} failed",
        style(batch.successful).green(),
        style(batch.failed).red()
    );

    if batch.failed > 0 {
        eprintln!();
        eprintln!("{}", style("Failed files:").red());
        for document in batch.documents.iter().filter(|d| d.error.is_some()) {
            eprintln!(
                "  - {}: {}",
                document.source,
                document.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

/// Expand each input in order. Inputs without glob metacharacters are kept
/// as given so missing files still show up as failed documents.
fn expand_inputs(inputs: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        if !input.contains(['*', '?', '[']) {
            files.push(PathBuf::from(input));
            continue;
        }

        let mut matched: Vec<PathBuf> = glob(input)?
            .filter_map(|entry| entry.ok())
            .filter(|path| path.is_file())
            .collect();
        if matched.is_empty() {
            warn!("Pattern matched no files: {}", input);
        }
        matched.sort();
        files.append(&mut matched);
    }

    Ok(files)
}

fn write_summary(path: &Path, batch: &BatchResult) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "source",
        "source_type",
        "status",
        "document_type",
        "expiry_date",
        "activation_date",
        "confidence",
        "error",
    ])?;

    for document in &batch.documents {
        let status = if document.is_success() { "success" } else { "error" };
        wtr.write_record([
            document.source.as_str(),
            document.source_type.as_str(),
            status,
            document.document_type.as_str(),
            &document.expiry_date.map(|d| d.to_string()).unwrap_or_default(),
            &document.activation_date.map(|d| d.to_string()).unwrap_or_default(),
            &format!("{:.2}", document.confidence),
            document.error.as_deref().unwrap_or(""),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docex_core::{DocumentResult, SourceType};

    #[test]
    fn test_expand_inputs_keeps_literal_paths() {
        let inputs = vec!["missing.pdf".to_string(), "notes.txt".to_string()];
        let files = expand_inputs(&inputs).unwrap();
        assert_eq!(files, vec![PathBuf::from("missing.pdf"), PathBuf::from("notes.txt")]);
    }

    #[test]
    fn test_expand_inputs_glob() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.txt", "a.txt", "c.pdf"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }

        let pattern = format!("{}/*.txt", dir.path().display());
        let files = expand_inputs(&[pattern]).unwrap();
        assert_eq!(files, vec![dir.path().join("a.txt"), dir.path().join("b.txt")]);
    }

    #[test]
    fn test_write_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        let batch = BatchResult::from_documents(vec![DocumentResult::failed(
            "a.xyz",
            SourceType::Text,
            "unsupported file format: a.xyz",
        )]);

        write_summary(&path, &batch).unwrap();
        let csv = fs::read_to_string(&path).unwrap();
        assert!(csv.starts_with("source,source_type,status"));
        assert!(csv.contains("a.xyz,text,error,unknown,,,0.00,unsupported file format: a.xyz"));
    }
}
