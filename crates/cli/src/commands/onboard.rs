//! `lectern onboard`: first-time setup.

use std::path::Path;

use lectern_config::AppConfig;

pub fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let default_path = AppConfig::config_path();
    let config_path = config_path.unwrap_or(default_path.as_path());

    println!("📚 Lectern: First-Time Setup");
    println!("============================\n");

    if write_default_config(config_path)? {
        println!("✅ Created config at: {}", config_path.display());
        println!("\n📝 Next steps:");
        println!("   1. Edit {} and add your API key", config_path.display());
        println!("      (or export LECTERN_API_KEY / OPENROUTER_API_KEY)");
        println!("   2. Run: lectern doctor");
        println!("   3. Run: lectern generate --input chapter.txt\n");
    } else {
        println!("⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    }

    Ok(())
}

/// Write the default config unless a file is already there.
/// Returns whether a file was written.
fn write_default_config(path: &Path) -> std::io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, AppConfig::default_toml())?;
    Ok(true)
}
