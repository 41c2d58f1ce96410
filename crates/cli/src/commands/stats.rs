//! `lectern stats`: size statistics for a source file.

use std::path::Path;

use lectern_config::AppConfig;
use lectern_rag::ContextAssembler;

pub fn run(config: &AppConfig, input: &Path, html: bool) -> Result<(), Box<dyn std::error::Error>> {
    let source = super::read_source(input, html)?;
    let stats = ContextAssembler::from_config(config).stats(&source);

    println!("📊 {}", input.display());
    println!("  Characters:      {}", stats.total_chars);
    println!("  Words:           {}", stats.word_count);
    println!("  Tokens (est.):   {}", stats.total_tokens);
    if stats.needs_bounding {
        println!(
            "  Needs bounding:  yes (threshold {} tokens)",
            config.bounding.threshold_tokens
        );
        if let (Some(chunks), Some(avg)) = (stats.chunk_count, stats.avg_chunk_tokens) {
            println!("  Chunks:          {chunks}");
            println!("  Avg chunk size:  {avg} tokens");
        }
    } else {
        println!("  Needs bounding:  no");
    }
    Ok(())
}
