//! Subcommand implementations and the helpers they share.

pub mod bound;
pub mod doctor;
pub mod generate;
pub mod onboard;
pub mod stats;

use std::path::Path;

use lectern_config::AppConfig;
use lectern_core::TaskType;
use lectern_rag::html_section;

/// clap value parser for task names. Unknown names are rejected.
pub fn parse_task(name: &str) -> Result<TaskType, String> {
    let task = TaskType::parse(name);
    if task.is_known() {
        Ok(task)
    } else {
        let known: Vec<&str> = TaskType::ALL.iter().map(|t| t.as_str()).collect();
        Err(format!("unknown task '{name}', expected one of: {}", known.join(", ")))
    }
}

/// Load config from `path`, or the default location when none is given.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => AppConfig::load_with_overrides(path)?,
        None => AppConfig::load()?,
    };
    Ok(config)
}

/// Read a source file, normalizing HTML when asked to.
pub fn read_source(path: &Path, html: bool) -> Result<String, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let text = if html {
        html_section(None, &raw)
    } else {
        raw.trim().to_string()
    };
    if text.is_empty() {
        return Err(format!("{} contains no text", path.display()).into());
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_names_parse() {
        assert_eq!(parse_task("quiz"), Ok(TaskType::Quiz));
        assert_eq!(parse_task("Flashcards"), Ok(TaskType::Flashcard));
        let err = parse_task("essay").unwrap_err();
        assert!(err.contains("mindmap"));
        assert!(parse_task("unknown").is_err());
    }

    #[test]
    fn html_sources_are_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chapter.html");
        std::fs::write(&path, "<h1>Cells</h1><p>Cells divide.</p><img alt=\"A dividing cell\">").unwrap();

        let text = read_source(&path, true).unwrap();
        assert!(text.contains("Cells divide."));
        assert!(text.contains("A dividing cell"));
        assert!(!text.contains('<'));

        let raw = read_source(&path, false).unwrap();
        assert!(raw.starts_with("<h1>"));
    }

    #[test]
    fn empty_and_missing_sources_fail() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.txt");
        std::fs::write(&empty, "  \n ").unwrap();
        assert!(read_source(&empty, false).is_err());
        assert!(read_source(&dir.path().join("missing.txt"), false).is_err());
    }

    #[test]
    fn explicit_config_path_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[retry]\nmax_attempts = 5\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.retry.max_attempts, 5);
    }
}
