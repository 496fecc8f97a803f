use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;

use super::{MergeOutcome, RecordStore, partition_fresh, sort_records};
use crate::domain::{ObservationKey, Record};

/// Append-only CSV table. The header is written once, when the file is created.
/// Existing keys are indexed on open so merges stay keep-first across runs.
pub struct CsvStore<R> {
    path: PathBuf,
    keys: Mutex<HashSet<ObservationKey>>,
    _rows: PhantomData<fn() -> R>,
}

impl<R> CsvStore<R>
where
    R: Record + Serialize + DeserializeOwned,
{
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let existing = Self::read_async(path.clone()).await?;
        let keys = existing.iter().map(Record::key).collect::<HashSet<_>>();

        log::debug!(
            "Opened {} with {} existing row(s)",
            path.display(),
            keys.len()
        );

        Ok(Self {
            path,
            keys: Mutex::new(keys),
            _rows: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_async(path: PathBuf) -> Result<Vec<R>> {
        tokio::task::spawn_blocking(move || read_rows::<R>(&path))
            .await
            .context("CSV read task panicked")?
    }
}

/// Rows that fail to deserialize are skipped with a warning.
fn read_rows<R: DeserializeOwned>(path: &Path) -> Result<Vec<R>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV: {}", path.display()))?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for result in reader.deserialize::<R>() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                skipped += 1;
                log::debug!("Skipping bad row in {}: {}", path.display(), e);
            }
        }
    }

    if skipped > 0 {
        log::warn!("⚠ Skipped {} unreadable row(s) in {}", skipped, path.display());
    }

    Ok(rows)
}

// Helper function to append rows, creating the file and any missing parent directories.
// The batch is serialized up front and lands in a single write.
fn append_rows<R: Serialize>(path: &Path, rows: &[R]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let needs_header = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_header)
        .from_writer(Vec::new());
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to serialize row for {}", path.display()))?;
    }
    let buffer = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV buffer: {}", e.error()))?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open for append: {}", path.display()))?;
    file.write_all(&buffer)
        .with_context(|| format!("Failed to append to {}", path.display()))?;
    file.flush()?;
    Ok(())
}

#[async_trait]
impl<R> RecordStore<R> for CsvStore<R>
where
    R: Record + Serialize + DeserializeOwned,
{
    async fn merge(&self, records: &[R]) -> Result<MergeOutcome> {
        let mut keys = self.keys.lock().await;
        let (fresh, batch_keys, duplicates) = partition_fresh(&keys, records);
        let inserted = fresh.len();

        if inserted > 0 {
            let path = self.path.clone();
            let appended = tokio::task::spawn_blocking(move || append_rows(&path, &fresh))
                .await
                .context("CSV append task panicked")
                .and_then(|r| r);

            if let Err(e) = appended {
                // Whatever reached the file is what the index must reflect.
                match Self::read_async(self.path.clone()).await {
                    Ok(on_disk) => *keys = on_disk.iter().map(Record::key).collect(),
                    Err(reload) => log::warn!(
                        "⚠ Could not re-index {} after failed append: {:#}",
                        self.path.display(),
                        reload
                    ),
                }
                return Err(e);
            }
            keys.extend(batch_keys);
        }

        Ok(MergeOutcome {
            inserted,
            duplicates,
        })
    }

    async fn load_all(&self) -> Result<Vec<R>> {
        let mut rows = Self::read_async(self.path.clone()).await?;
        sort_records(&mut rows);
        Ok(rows)
    }
}
