//! Hot reload: poll the scene file and hand fresh scenes to the render loop.
//!
//! The watcher runs on its own thread and only ever sends complete `Scene`
//! values through a single-slot channel, so the render loop can swap scenes
//! between frames without locking. If the slot is still full when the next
//! change is detected, the watcher blocks until the render loop drains it.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::time::Duration;

use notify::{EventKind, PollWatcher, RecursiveMode, Watcher};

use crate::error::LoadError;

use super::source::SceneSource;
use super::Scene;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchConfig {
    pub poll_interval: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// Handle to a running watcher. Dropping it (or calling `stop`) ends polling
/// and disconnects the handoff channel.
pub struct SceneWatcher {
    // Declared first so it drops first: a send blocked on a full slot fails
    // and returns before the poll thread is told to stop.
    scenes: Receiver<Scene>,
    _poller: PollWatcher,
    path: PathBuf,
}

impl SceneWatcher {
    pub(super) fn spawn(path: &Path, config: WatchConfig) -> Result<Self, LoadError> {
        let (tx, scenes) = mpsc::sync_channel(1);
        let watch_error = |source: notify::Error| LoadError::Watch {
            path: path.to_path_buf(),
            source,
        };

        let handler = reload_handler(path.to_path_buf(), tx);
        // Content comparison catches edits that land within the file system's
        // timestamp granularity.
        let notify_config = notify::Config::default()
            .with_poll_interval(config.poll_interval)
            .with_compare_contents(true);
        let mut poller = PollWatcher::new(handler, notify_config).map_err(watch_error)?;
        poller
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(watch_error)?;

        tracing::info!(path = %path.display(), interval = ?config.poll_interval, "watching scene");
        Ok(Self {
            scenes,
            _poller: poller,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Take the pending scene, if any. Never blocks.
    pub fn try_next(&self) -> Option<Scene> {
        self.scenes.try_recv().ok()
    }

    /// Wait up to `timeout` for the next scene.
    pub fn next_timeout(&self, timeout: Duration) -> Option<Scene> {
        self.scenes.recv_timeout(timeout).ok()
    }

    pub fn stop(self) {
        tracing::debug!(path = %self.path.display(), "stopping scene watcher");
    }
}

fn reload_handler(
    path: PathBuf,
    tx: SyncSender<Scene>,
) -> impl FnMut(notify::Result<notify::Event>) + Send + 'static {
    move |res| match res {
        Ok(event) if matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) => {
            match SceneSource::load(&path) {
                Ok(scene) => {
                    tracing::info!(
                        path = %path.display(),
                        objects = scene.objects().len(),
                        "reloaded scene"
                    );
                    if tx.send(scene).is_err() {
                        tracing::debug!("scene consumer is gone; dropping reload");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "reload failed; keeping previous scene"),
            }
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "scene watch error"),
    }
}
