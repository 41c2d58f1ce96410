//! `lectern doctor`: diagnose configuration and provider health.

use std::path::Path;

use lectern_config::AppConfig;
use lectern_providers::build_from_config;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Lectern Doctor: System Diagnostics");
    println!("=====================================\n");

    let mut issues = 0;

    let default_path = AppConfig::config_path();
    let path = config_path.unwrap_or(default_path.as_path());
    if !path.exists() {
        println!("  ⚠️  No config file at {}, using defaults (run `lectern onboard`)", path.display());
        issues += 1;
    }

    let config = match AppConfig::load_with_overrides(path) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  Fix the config before checking providers.");
            return Ok(());
        }
    };

    let keyed = config.has_api_key() || config.providers.values().any(|p| p.api_key.is_some());
    if keyed {
        println!("  ✅ API key configured");
    } else if config.default_provider == "ollama" {
        println!("  ✅ Local provider, no API key needed");
    } else {
        println!("  ⚠️  No API key configured: add api_key to config.toml or export LECTERN_API_KEY");
        issues += 1;
    }

    println!(
        "  ℹ️  Bounding: threshold {} tokens, ceiling {} tokens",
        config.bounding.threshold_tokens, config.bounding.output_ceiling_tokens
    );
    let tasks: Vec<&str> = config.generation.enabled_tasks.iter().map(|t| t.as_str()).collect();
    println!("  ℹ️  Enabled tasks: {}", tasks.join(", "));

    println!("\n  Providers:");
    let chain = build_from_config(&config).chain();
    for health in chain.health_report().await {
        match (health.healthy, health.error) {
            (true, _) => println!("  ✅ {} reachable", health.name),
            (false, Some(error)) => {
                println!("  ❌ {} unreachable: {error}", health.name);
                issues += 1;
            }
            (false, None) => {
                println!("  ❌ {} rejected the health check", health.name);
                issues += 1;
            }
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
