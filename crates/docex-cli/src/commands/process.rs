//! Process command - extract structured data from a single document.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use docex_core::{DocumentResult, Pipeline};

use super::{LlmArgs, load_config};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF, image, Word or text)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    #[command(flatten)]
    llm: LlmArgs,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path, &args.llm)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());
    let pipeline = Pipeline::from_config(&config)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    spinner.set_message(format!("Extracting {}", args.input.display()));
    spinner.enable_steady_tick(std::time::Duration::from_millis(120));

    let result = pipeline.process_single(&args.input).await;
    spinner.finish_and_clear();

    let output = format_result(&result, args.format)?;
    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        eprintln!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    if let Some(error) = &result.error {
        anyhow::bail!("Processing failed: {}", error);
    }
    Ok(())
}

fn format_result(result: &DocumentResult, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Text => Ok(format_text(result)),
    }
}

fn format_text(result: &DocumentResult) -> String {
    let mut output = String::new();

    output.push_str(&format!("Source: {} ({})\n", result.source, result.source_type));
    if let Some(error) = &result.error {
        output.push_str(&format!("Error: {}\n", error));
        return output;
    }

    output.push_str(&format!("Type: {}\n", result.document_type));
    output.push_str(&format!("Confidence: {:.0}%\n", result.confidence * 100.0));
    if let Some(expiry) = result.expiry_date {
        output.push_str(&format!("Expires: {}\n", expiry));
    }
    if let Some(activation) = result.activation_date {
        output.push_str(&format!("Active from: {}\n", activation));
    }
    if !result.summary.is_empty() {
        output.push_str(&format!("\n{}\n", result.summary));
    }

    if !result.extracted_fields.is_empty() {
        output.push_str("\nFields:\n");
        for (key, value) in &result.extracted_fields {
            match value {
                serde_json::Value::String(text) => output.push_str(&format!("  {}: {}\n", key, text)),
                other => output.push_str(&format!("  {}: {}\n", key, other)),
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use docex_core::SourceType;

    #[test]
    fn test_format_text_failed() {
        let result = DocumentResult::failed("scan.png", SourceType::Image, "No text found in image");
        let text = format_text(&result);
        assert!(text.contains("Source: scan.png (image)"));
        assert!(text.contains("Error: No text found in image"));
        assert!(!text.contains("Type:"));
    }
}
