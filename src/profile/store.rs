//! Entry Files
//!
//! JSON-lines files of signed entries, one entry per line.

use anyhow::{anyhow, Context, Result};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

use crate::profile::entry::Entry;

/// Load entries from a JSON-lines file, skipping blank lines
pub fn load_entries_from_file(path: impl AsRef<Path>) -> Result<Vec<Entry>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open entry file {}", path.display()))?;

    let reader = BufReader::new(file);
    let mut entries = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| anyhow!("Failed to read line {}: {}", line_num + 1, e))?;

        if line.trim().is_empty() {
            continue;
        }

        let entry: Entry = serde_json::from_str(&line)
            .map_err(|e| anyhow!("Failed to parse entry at line {}: {}", line_num + 1, e))?;

        entries.push(entry);
    }

    debug!("Loaded {} entries from {}", entries.len(), path.display());
    Ok(entries)
}

/// Write entries as JSON lines, creating parent directories
pub fn write_entries_to_file(path: impl AsRef<Path>, entries: &[Entry]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let file = File::create(path)
        .with_context(|| format!("Failed to create entry file {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    for entry in entries {
        serde_json::to_writer(&mut writer, entry)
            .with_context(|| format!("Failed to serialize entry {}", entry.id))?;
        writeln!(writer)?;
    }
    writer.flush()?;

    debug!("Wrote {} entries to {}", entries.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::get_merkle_root;
    use crate::crypto::SignatureService;
    use crate::profile::EntryKind;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_write_then_load() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("entries.jsonl");

        let signer = SignatureService::default();
        let entries = vec![
            Entry::with_id("a", EntryKind::Goal, json!("one"), &signer).unwrap(),
            Entry::with_id("b", EntryKind::Challenge, json!({"k": [1, 2]}), &signer)
                .unwrap()
                .with_metadata("source", json!("import")),
        ];

        write_entries_to_file(&path, &entries).unwrap();
        let loaded = load_entries_from_file(&path).unwrap();

        assert_eq!(loaded.len(), 2);
        assert!(loaded.iter().all(Entry::verify_signature));
        assert_eq!(loaded[1].metadata["source"], json!("import"));
    }

    #[test]
    fn test_float_content_survives_round_trip() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("scores.jsonl");

        let signer = SignatureService::default();
        let entries: Vec<Entry> = [39.430133835633676, 0.1 + 0.2, 1e-7, 123456.789012345]
            .iter()
            .enumerate()
            .map(|(i, score)| {
                Entry::with_id(
                    format!("score-{}", i),
                    EntryKind::Assessment,
                    json!({"score": score}),
                    &signer,
                )
                .unwrap()
            })
            .collect();

        write_entries_to_file(&path, &entries).unwrap();
        let loaded = load_entries_from_file(&path).unwrap();

        assert_eq!(loaded.len(), entries.len());
        for (original, reloaded) in entries.iter().zip(&loaded) {
            assert_eq!(reloaded.content, original.content);
            assert!(reloaded.verify_signature(), "{}", reloaded.id);
        }
        assert_eq!(
            get_merkle_root(&loaded).unwrap(),
            get_merkle_root(&entries).unwrap()
        );
    }

    #[test]
    fn test_bad_line_reports_line_number() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("entries.jsonl");
        fs::write(&path, "\n{\"id\": 3}\n").unwrap();

        let err = load_entries_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = tempdir().unwrap();
        assert!(load_entries_from_file(temp_dir.path().join("absent.jsonl")).is_err());
    }
}
