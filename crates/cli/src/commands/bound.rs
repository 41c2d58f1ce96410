//! `lectern bound`: show what one task type would be sent.

use std::path::Path;

use lectern_config::AppConfig;
use lectern_core::TaskType;
use lectern_rag::ContextAssembler;

pub fn run(
    config: &AppConfig,
    input: &Path,
    task: TaskType,
    html: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = super::read_source(input, html)?;
    let bounded = ContextAssembler::from_config(config).bound_with_report(&source, task);

    if json {
        println!("{}", serde_json::to_string_pretty(&bounded)?);
        return Ok(());
    }

    eprintln!("Task:       {}", bounded.task);
    eprintln!("Strategy:   {}", bounded.strategy);
    eprintln!(
        "Tokens:     {} -> {} (ceiling {})",
        bounded.input_tokens, bounded.output_tokens, config.bounding.output_ceiling_tokens
    );
    if let Some(k) = bounded.max_chunks {
        eprintln!(
            "Chunks:     {} selected of {} (K = {k})",
            bounded.chunks_selected, bounded.chunks_total
        );
    }
    eprintln!();
    println!("{}", bounded.text);
    Ok(())
}
