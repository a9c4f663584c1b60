//! Whole-file outputs
//!
//! A run renders every file into memory first and commits them together:
//! all temp files are written, then renamed over their targets. A failure
//! while rendering leaves previous outputs untouched. Outputs a previous
//! run may have written but this one did not produce are removed.

use crate::error::Result;
use csv::WriterBuilder;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// CSV bytes for serializable rows under an explicit header, so that
/// empty tables still carry their column names
pub fn csv_bytes<T: Serialize>(header: &[&str], rows: &[T]) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    into_bytes(writer)
}

/// CSV bytes for rows that are already rendered as text
pub fn records_bytes(header: &[String], rows: &[Vec<String>]) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }
    into_bytes(writer)
}

fn into_bytes(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| std::io::Error::other(e.to_string()).into())
}

/// Files of one run, committed all at once
#[derive(Debug, Default)]
pub struct OutputBatch {
    files: Vec<(PathBuf, Vec<u8>)>,
    /// Optional outputs to delete unless this batch writes them
    retired: Vec<PathBuf>,
}

impl OutputBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<PathBuf>, bytes: Vec<u8>) {
        self.files.push((path.into(), bytes));
    }

    pub fn add_csv<T: Serialize>(
        &mut self,
        path: impl Into<PathBuf>,
        header: &[&str],
        rows: &[T],
    ) -> Result<()> {
        let bytes = csv_bytes(header, rows)?;
        self.add(path, bytes);
        Ok(())
    }

    pub fn add_text(&mut self, path: impl Into<PathBuf>, text: &str) {
        self.add(path, text.as_bytes().to_vec());
    }

    pub fn add_json<T: Serialize>(&mut self, path: impl Into<PathBuf>, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.add(path, bytes);
        Ok(())
    }

    /// Mark a file this kind of run can produce; it is deleted on commit
    /// when the batch holds no content for it
    pub fn retire(&mut self, path: impl Into<PathBuf>) {
        self.retired.push(path.into());
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|(p, _)| p.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Write every file to a sibling temp path, then rename each into place
    /// and drop retired files left over from earlier runs. Temp files are
    /// removed if any write fails.
    pub fn commit(self) -> Result<Vec<PathBuf>> {
        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(self.files.len());

        for (path, bytes) in &self.files {
            let tmp = temp_path(path);
            let written = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map_or(Ok(()), fs::create_dir_all)
                .and_then(|_| fs::write(&tmp, bytes));
            if let Err(e) = written {
                for (tmp, _) in &staged {
                    let _ = fs::remove_file(tmp);
                }
                return Err(e.into());
            }
            staged.push((tmp, path.clone()));
        }

        for (tmp, path) in &staged {
            fs::rename(tmp, path)?;
            debug!("Wrote {}", path.display());
        }

        for path in &self.retired {
            if staged.iter().any(|(_, written)| written == path) {
                continue;
            }
            match fs::remove_file(path) {
                Ok(()) => debug!("Removed stale {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(staged.into_iter().map(|(_, path)| path).collect())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        name: String,
        rate: Option<f64>,
        flag: bool,
    }

    #[test]
    fn test_csv_bytes_with_missing_values() {
        let rows = vec![
            Row { name: "a".into(), rate: Some(0.5), flag: true },
            Row { name: "b".into(), rate: None, flag: false },
        ];
        let text = String::from_utf8(csv_bytes(&["name", "rate", "flag"], &rows).unwrap()).unwrap();
        assert_eq!(text, "name,rate,flag\na,0.5,true\nb,,false\n");
    }

    #[test]
    fn test_empty_table_keeps_header() {
        let text = String::from_utf8(csv_bytes::<Row>(&["name", "rate", "flag"], &[]).unwrap()).unwrap();
        assert_eq!(text, "name,rate,flag\n");
    }

    #[test]
    fn test_commit_writes_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("out.txt");
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, "old").unwrap();

        let mut batch = OutputBatch::new();
        batch.add_text(&target, "new");
        batch.add_text(dir.path().join("other").join("b.txt"), "b");
        let written = batch.commit().unwrap();

        assert_eq!(written.len(), 2);
        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
        assert!(!temp_path(&target).exists());
    }

    #[test]
    fn test_commit_removes_retired_files_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("stale.csv");
        let kept = dir.path().join("kept.csv");
        fs::write(&stale, "old").unwrap();
        fs::write(&kept, "old").unwrap();

        let mut batch = OutputBatch::new();
        batch.retire(&stale);
        batch.retire(&kept);
        batch.retire(dir.path().join("never_written.csv"));
        batch.add_text(&kept, "new");
        batch.commit().unwrap();

        assert!(!stale.exists());
        assert_eq!(fs::read_to_string(&kept).unwrap(), "new");
    }
}
