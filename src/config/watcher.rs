//! Config file watcher for hot reload.
//!
//! Every write to the file is re-loaded and re-validated. A file that fails
//! either step is logged and dropped; the running gate keeps its rules.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::AppConfig;

/// Watches one config file and emits each valid new version.
pub struct ConfigWatcher {
    path: PathBuf,
    updates: mpsc::UnboundedSender<AppConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end for validated configs.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<AppConfig>) {
        let (updates, rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            updates,
        };
        (watcher, rx)
    }

    /// Start watching. Dropping the returned handle stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();
        let updates = self.updates;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if triggers_reload(&event.kind) => reload(&path, &updates),
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %self.path.display(), "Config watcher started");
        Ok(watcher)
    }
}

fn triggers_reload(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Modify(_) | EventKind::Create(_))
}

fn reload(path: &Path, updates: &mpsc::UnboundedSender<AppConfig>) {
    match load_config(path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "Config changed, applying");
            if updates.send(config).is_err() {
                tracing::debug!("Config receiver gone, dropping update");
            }
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Rejected config change, keeping current rules");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, ModifyKind, RemoveKind};

    #[test]
    fn test_only_writes_trigger_reload() {
        assert!(triggers_reload(&EventKind::Modify(ModifyKind::Data(DataChange::Content))));
        assert!(triggers_reload(&EventKind::Create(CreateKind::File)));
        assert!(!triggers_reload(&EventKind::Access(AccessKind::Read)));
        assert!(!triggers_reload(&EventKind::Remove(RemoveKind::File)));
    }

    #[test]
    fn test_invalid_file_sends_nothing() {
        let dir = std::env::temp_dir().join(format!("rate-gate-watch-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("gate.toml");
        std::fs::write(&path, "[rate_limit]\nmax_requests = 0\n").unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        reload(&path, &tx);
        assert!(rx.try_recv().is_err());

        std::fs::write(&path, "[rate_limit]\nmax_requests = 7\n").unwrap();
        reload(&path, &tx);
        assert_eq!(rx.try_recv().unwrap().rate_limit.max_requests, 7);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
