//! Reliability statistics storage and persistence.

use std::collections::{BTreeSet, HashMap};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stats::record::{NodeId, NodeStat, StatKey, Timestamp};

const FILE_VERSION: u32 = 1;

/// Errors raised while persisting statistics.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("statistics I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("statistics encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("statistics file version {found} is not supported (expected {expected})")]
    Version { found: u32, expected: u32 },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable per-(group, service, node) probe counters. Pure data access, no policy.
pub trait ReliabilityStore: Send + Sync {
    /// Fold one probe result into the node's counters, creating them on first use.
    /// The in-memory update always lands; an error means it was not persisted.
    fn record(
        &self,
        group: &str,
        service: &str,
        node: &str,
        success: bool,
        at: Timestamp,
    ) -> StoreResult<()>;

    fn get(&self, group: &str, service: &str, node: &str) -> Option<NodeStat>;

    fn list_for_service(&self, group: &str, service: &str) -> HashMap<NodeId, NodeStat>;

    /// Every (group, service) pair with recorded data, sorted.
    fn services(&self) -> Vec<(String, String)>;

    /// Full copy of all statistics, sorted by key.
    fn snapshot(&self) -> Vec<StatEntry>;

    /// Remove every recorded statistic. Operator command only.
    fn clear_all(&self) -> StoreResult<()>;
}

/// One persisted statistic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatEntry {
    pub group: String,
    pub service: String,
    pub node: NodeId,
    #[serde(flatten)]
    pub stat: NodeStat,
}

#[derive(Debug, Serialize, Deserialize)]
struct StatsFile {
    version: u32,
    entries: Vec<StatEntry>,
}

/// A thread-safe statistics store, optionally backed by a JSON file.
#[derive(Clone, Default)]
pub struct StatStore {
    inner: Arc<DashMap<StatKey, NodeStat>>,
    persistence_path: Option<PathBuf>,
    /// Serializes file writes so snapshots land in order.
    write_lock: Arc<Mutex<()>>,
}

impl StatStore {
    /// Create a store. With `None` nothing is written to disk.
    pub fn new(persistence_path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            persistence_path,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Open the store at `path`, loading existing data if present.
    ///
    /// A file that cannot be decoded is moved aside and the store starts empty.
    /// A file from another format version is left alone and refused.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let store = Self::new(Some(path.to_path_buf()));
        if !path.exists() {
            tracing::info!(path = %path.display(), "No statistics file yet, starting empty");
            return Ok(store);
        }
        if !path.is_file() {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            )));
        }

        let reader = BufReader::new(File::open(path)?);
        let file: StatsFile = match serde_json::from_reader(reader) {
            Ok(file) => file,
            Err(e) => {
                let aside = path.with_extension("json.corrupt");
                fs::rename(path, &aside)?;
                tracing::warn!(
                    error = %e,
                    moved_to = %aside.display(),
                    "Statistics file unreadable, starting empty"
                );
                return Ok(store);
            }
        };
        if file.version != FILE_VERSION {
            return Err(StoreError::Version {
                found: file.version,
                expected: FILE_VERSION,
            });
        }

        for mut entry in file.entries {
            if entry.stat.repair() {
                tracing::warn!(
                    group = %entry.group,
                    service = %entry.service,
                    node = %entry.node,
                    "Repaired inconsistent counters"
                );
            }
            let key = StatKey::new(&entry.group, &entry.service, &entry.node);
            store.inner.insert(key, entry.stat);
        }
        tracing::info!(
            entries = store.inner.len(),
            path = %path.display(),
            "Loaded node statistics"
        );
        Ok(store)
    }

    /// Path statistics are persisted to, if any.
    pub fn path(&self) -> Option<&Path> {
        self.persistence_path.as_deref()
    }

    /// Number of tracked (group, service, node) entries.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Write every statistic to `path` as pretty JSON.
    pub fn export(&self, path: &Path) -> StoreResult<usize> {
        let entries = self.snapshot();
        let count = entries.len();
        write_atomically(path, &StatsFile {
            version: FILE_VERSION,
            entries,
        })?;
        Ok(count)
    }

    fn persist(&self) -> StoreResult<()> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        write_atomically(path, &StatsFile {
            version: FILE_VERSION,
            entries: self.snapshot(),
        })
    }
}

impl ReliabilityStore for StatStore {
    fn record(
        &self,
        group: &str,
        service: &str,
        node: &str,
        success: bool,
        at: Timestamp,
    ) -> StoreResult<()> {
        {
            // The shard guard must be gone before `persist` iterates the map.
            let mut stat = self
                .inner
                .entry(StatKey::new(group, service, node))
                .or_insert_with(|| NodeStat::empty(at));
            stat.observe(success, at);
        }
        self.persist()
    }

    fn get(&self, group: &str, service: &str, node: &str) -> Option<NodeStat> {
        self.inner
            .get(&StatKey::new(group, service, node))
            .map(|r| r.value().clone())
    }

    fn list_for_service(&self, group: &str, service: &str) -> HashMap<NodeId, NodeStat> {
        self.inner
            .iter()
            .filter(|r| r.key().is_for(group, service))
            .map(|r| (r.key().node.clone(), r.value().clone()))
            .collect()
    }

    fn services(&self) -> Vec<(String, String)> {
        self.inner
            .iter()
            .map(|r| (r.key().group.clone(), r.key().service.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn snapshot(&self) -> Vec<StatEntry> {
        let mut entries: Vec<StatEntry> = self
            .inner
            .iter()
            .map(|r| StatEntry {
                group: r.key().group.clone(),
                service: r.key().service.clone(),
                node: r.key().node.clone(),
                stat: r.value().clone(),
            })
            .collect();
        entries.sort_by(|a, b| {
            (&a.group, &a.service, &a.node).cmp(&(&b.group, &b.service, &b.node))
        });
        entries
    }

    fn clear_all(&self) -> StoreResult<()> {
        let removed = self.inner.len();
        self.inner.clear();
        tracing::info!(removed, "Cleared all node statistics");
        self.persist()
    }
}

/// Write JSON to a temp file, fsync, then rename over the target.
fn write_atomically<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    let file = File::create(&tmp)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}
