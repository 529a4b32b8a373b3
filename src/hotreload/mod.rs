//! Hot-reload of the level catalog
//!
//! Watches the catalog file (e.g. config/levels.ron):
//! - Uses `notify` over the file's parent directory
//! - Re-parses and validates on modify/create of the watched file
//! - An invalid catalog is reported and the last good one stays in use
//! - `HotReloadStatus` snapshot for debug overlays

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::sync::Mutex;
use tracing::{error, info, warn};

use crate::error::{CoreError, CoreResult};
use crate::level::LevelCatalog;

/// Hot-reload status snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HotReloadStatus {
    pub watched_file: Option<String>,
    pub reload_count: u32,
    pub last_reload_success: bool,
    pub last_error: Option<String>,
}

impl HotReloadStatus {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok()
    }
}

pub struct CatalogWatcher {
    path: PathBuf,
    file_name: OsString,
    _watcher: RecommendedWatcher,
    receiver: Mutex<Receiver<notify::Result<Event>>>,
    status: HotReloadStatus,
}

impl CatalogWatcher {
    /// Start watching `path`; the file must already exist
    pub fn watch(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(CoreError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("catalog file not found: {}", path.display()),
            )));
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (tx, rx) = channel();
        let mut watcher = notify::recommended_watcher(tx)?;
        watcher.watch(&parent, RecursiveMode::NonRecursive)?;
        info!("Hot-reload enabled for {:?}", path);

        Ok(Self {
            status: HotReloadStatus {
                watched_file: Some(path.display().to_string()),
                ..Default::default()
            },
            path,
            file_name,
            _watcher: watcher,
            receiver: Mutex::new(rx),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn status(&self) -> &HotReloadStatus {
        &self.status
    }

    /// Drain pending filesystem events; reload once if any touched the file
    pub fn poll(&mut self) -> Option<CoreResult<LevelCatalog>> {
        let receiver = match self.receiver.get_mut() {
            Ok(r) => r,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut touched = false;
        while let Ok(result) = receiver.try_recv() {
            match result {
                Ok(event) => touched |= is_catalog_event(&event, &self.file_name),
                Err(e) => warn!("File watcher error: {}", e),
            }
        }

        touched.then(|| self.reload())
    }

    /// Re-read the catalog now, recording the outcome in the status
    pub fn reload(&mut self) -> CoreResult<LevelCatalog> {
        match LevelCatalog::load(&self.path) {
            Ok(catalog) => {
                self.status.reload_count += 1;
                self.status.last_reload_success = true;
                self.status.last_error = None;
                info!(
                    "Catalog reloaded ({} levels, count: {})",
                    catalog.level_count(),
                    self.status.reload_count
                );
                Ok(catalog)
            }
            Err(e) => {
                self.status.last_reload_success = false;
                self.status.last_error = Some(e.to_string());
                error!("Catalog reload failed: {}", e);
                Err(e)
            }
        }
    }
}

/// A modify or create event on the watched file name
fn is_catalog_event(event: &Event, file_name: &OsString) -> bool {
    let relevant_kind = event.kind.is_modify() || matches!(event.kind, EventKind::Create(_));
    relevant_kind
        && event
            .paths
            .iter()
            .any(|p| p.file_name().is_some_and(|n| n == file_name.as_os_str()))
}
