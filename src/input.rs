//! Loading the run input and the perspective files from the data folder.
//!
//! Everything is read and checked up front; a run never starts on input it
//! would later reject.

use std::path::Path;

use tracing::{info, warn};

use crate::config::read_json;
use crate::error::ConfigError;
use crate::types::{ClaimItem, PerspectiveFile, RunInput};

pub const INPUT_FILE: &str = "input.json";

pub fn load_run_input(data_folder: &Path) -> Result<RunInput, ConfigError> {
    let path = data_folder.join(INPUT_FILE);
    let input: RunInput = read_json(&path)?;
    if input.topic.trim().is_empty() {
        warn!(path = %path.display(), "Run input has an empty topic");
    }
    info!(topic = %input.topic, "Loaded run input");
    Ok(input)
}

/// Load the named perspective files. Missing files are skipped; unreadable
/// or invalid ones abort the load.
pub fn load_perspectives(
    data_folder: &Path,
    names: &[String],
) -> Result<Vec<PerspectiveFile>, ConfigError> {
    let mut files = Vec::with_capacity(names.len());
    for name in names {
        let path = data_folder.join(name);
        let items: Vec<ClaimItem> = match read_json(&path) {
            Ok(items) => items,
            Err(ConfigError::NotFound(_)) => {
                warn!(path = %path.display(), "Perspective file not found, skipping");
                continue;
            }
            Err(e) => return Err(e),
        };
        for (idx, item) in items.iter().enumerate() {
            check_axis(name, idx, "bias_x", item.bias_x)?;
            check_axis(name, idx, "significance_y", item.significance_y)?;
        }
        info!(file = %name, items = items.len(), "Loaded perspective file");
        files.push(PerspectiveFile {
            source_file: name.clone(),
            items,
        });
    }

    if files.is_empty() {
        return Err(ConfigError::NoPerspectives(data_folder.to_path_buf()));
    }
    Ok(files)
}

fn check_axis(file: &str, idx: usize, field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        return Ok(());
    }
    Err(ConfigError::invalid(
        format!("{}[{}].{}", file, idx, field),
        format!("{} is outside 0.0..=1.0", value),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_run_input_maps_text_to_context() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(INPUT_FILE),
            r#"{"topic": "Budget vote", "text": "The senate met."}"#,
        )
        .unwrap();
        let input = load_run_input(dir.path()).unwrap();
        assert_eq!(input.topic, "Budget vote");
        assert_eq!(input.context, "The senate met.");
    }

    #[test]
    fn test_missing_run_input_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_run_input(dir.path()),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_missing_perspective_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("common.json"),
            r##"[{"text": "A", "bias_x": 0.2, "significance_y": 0.9, "color": "#fff"}, {"text": "B"}]"##,
        )
        .unwrap();

        let files = load_perspectives(dir.path(), &names(&["common.json", "leftist.json"])).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].source_file, "common.json");
        assert_eq!(files[0].items[1].bias_x, 0.5);
    }

    #[test]
    fn test_no_perspectives_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_perspectives(dir.path(), &names(&["common.json"])),
            Err(ConfigError::NoPerspectives(_))
        ));
    }

    #[test]
    fn test_out_of_range_axis_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("rightist.json"),
            r#"[{"text": "A", "bias_x": 1.4}]"#,
        )
        .unwrap();
        let err = load_perspectives(dir.path(), &names(&["rightist.json"])).unwrap_err();
        assert!(err.to_string().contains("rightist.json[0].bias_x"), "{err}");
    }

    #[test]
    fn test_malformed_perspective_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("common.json"), r#"{"text": "not a list"}"#).unwrap();
        assert!(matches!(
            load_perspectives(dir.path(), &names(&["common.json"])),
            Err(ConfigError::Parse { .. })
        ));
    }
}
