//! Formats command - list the file extensions each loader accepts.

use console::style;

use docex_core::LoaderDispatcher;
use docex_core::ocr::create_engine;

use super::{LlmArgs, load_config};

pub async fn run(config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path, &LlmArgs::default())?;
    let ocr = create_engine(&config.ocr)?;
    let dispatcher = LoaderDispatcher::with_defaults(ocr, &config);

    println!("{}", style("Supported formats (in dispatch order):").bold());
    for loader in dispatcher.loaders() {
        println!("  {:<6} {}", loader.name(), loader.extensions().join(", "));
    }
    println!();
    println!("OCR backend: {}", config.ocr.backend.as_str());

    Ok(())
}
