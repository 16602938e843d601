//! JSON preferences file [`OrderStore`] implementation.
//!
//! All records live in one JSON object keyed by persistence key. The file is
//! read once on open and rewritten (via a temporary sibling and rename) on
//! every store, so a crash mid-write leaves the previous contents intact.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use parking_lot::Mutex;
use tracing::debug;
use zorder_core::OrderManagerConfig;

use crate::store::OrderStore;

/// File-backed `OrderStore`.
///
/// Records are held as raw JSON values, so one malformed record fails only
/// its own load.
#[derive(Debug)]
pub struct FileOrderStore {
    path: PathBuf,
    records: Mutex<BTreeMap<String, serde_json::Value>>,
}

impl FileOrderStore {
    /// Opens the store at `path`, starting empty if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is not a
    /// JSON object.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let records = if path.exists() {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("reading order preferences {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing order preferences {}", path.display()))?
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), records = records.len(), "opened order preferences");
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_file(&self, records: &BTreeMap<String, serde_json::Value>) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let staging = self.path.with_extension("json.tmp");
        let text = serde_json::to_string_pretty(records)?;
        fs::write(&staging, text).with_context(|| format!("writing {}", staging.display()))?;
        fs::rename(&staging, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

impl OrderStore for FileOrderStore {
    fn load(&self, key: &str) -> anyhow::Result<Option<OrderManagerConfig>> {
        let value = self.records.lock().get(key).cloned();
        value.map(OrderManagerConfig::from_json).transpose()
    }

    fn store(&self, key: &str, config: &OrderManagerConfig) -> anyhow::Result<()> {
        let value = config.to_json()?;
        let mut records = self.records.lock();
        let previous = records.insert(key.to_string(), value);
        if let Err(err) = self.write_file(&records) {
            match previous {
                Some(previous) => records.insert(key.to_string(), previous),
                None => records.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }

    fn keys(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.records.lock().keys().cloned().collect())
    }
}
