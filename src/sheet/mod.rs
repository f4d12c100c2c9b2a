// CSV sheet collaborator — the tabular source the URLs come from and the
// view counts go back into.
//
// The whole sheet is held in memory as raw records; cell addressing is
// (record index, column index), both zero-based. Saving goes through a
// sibling temp file and an atomic rename so an interrupted run can never
// leave a half-written sheet behind.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use tracing::debug;

/// A row eligible for processing: its record index and the raw URL cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRow {
    pub position: u32,
    pub url: String,
}

/// An in-memory CSV sheet.
pub struct Sheet {
    path: PathBuf,
    records: Vec<StringRecord>,
}

impl Sheet {
    /// Load a sheet from disk. Rows may be ragged — short rows are padded
    /// on write, never rejected on read.
    pub fn load(path: &str) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open sheet at {path}"))?;

        let mut records = Vec::new();
        for record in reader.records() {
            records.push(record.with_context(|| format!("Failed to read sheet at {path}"))?);
        }

        debug!(rows = records.len(), path, "Sheet loaded");

        Ok(Self {
            path: PathBuf::from(path),
            records,
        })
    }

    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    /// Rows that still need a view count: URL cell non-empty, output cell
    /// empty or missing. Rows whose output cell is already filled are done —
    /// that is what makes a completed sheet produce no candidates on the
    /// next run.
    pub fn candidate_rows(
        &self,
        url_column: usize,
        output_column: usize,
        start_row: usize,
    ) -> Vec<CandidateRow> {
        self.records
            .iter()
            .enumerate()
            .skip(start_row)
            .filter_map(|(idx, record)| {
                let url = record.get(url_column)?.trim();
                if url.is_empty() {
                    return None;
                }
                let filled = record
                    .get(output_column)
                    .map(|v| !v.trim().is_empty())
                    .unwrap_or(false);
                if filled {
                    return None;
                }
                Some(CandidateRow {
                    position: idx as u32,
                    url: url.to_string(),
                })
            })
            .collect()
    }

    /// Write view counts into the output column, thousands-separated.
    /// Returns how many cells changed.
    pub fn apply_counts(&mut self, updates: &[(u32, u64)], output_column: usize) -> usize {
        let mut applied = 0;
        for &(position, views) in updates {
            let Some(record) = self.records.get_mut(position as usize) else {
                continue;
            };

            let mut fields: Vec<String> = record.iter().map(|f| f.to_string()).collect();
            while fields.len() <= output_column {
                fields.push(String::new());
            }
            fields[output_column] = crate::output::format_thousands(views);
            *record = StringRecord::from(fields);
            applied += 1;
        }
        applied
    }

    /// Save the sheet atomically: write a sibling temp file, then rename
    /// over the original.
    pub fn save(&self) -> Result<()> {
        let tmp_path = temp_path(&self.path);

        {
            let mut writer = WriterBuilder::new()
                .has_headers(false)
                .flexible(true)
                .from_path(&tmp_path)
                .with_context(|| format!("Failed to create {}", tmp_path.display()))?;

            for record in &self.records {
                writer.write_record(record)?;
            }
            writer
                .flush()
                .with_context(|| format!("Failed to flush {}", tmp_path.display()))?;
        }

        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        debug!(path = %self.path.display(), "Sheet saved");
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
