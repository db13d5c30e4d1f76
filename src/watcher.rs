use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::debouncer::{EventDebouncer, FsEvent, DEFAULT_DEDUP_CAPACITY, DEFAULT_SETTLE_DELAY};
use crate::error::WatchError;
use crate::organizer::Organizer;
use crate::source::{EventSource, NotifySource, Subscription};

/// Lifecycle of the notification engine as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Folders may be registered; their events are held until `start`.
    Idle,
    Running,
    /// No notifications are accepted.
    Stopped,
}

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub settle_delay: Duration,
    pub dedup_capacity: usize,
    /// Sweep pre-existing files when a folder starts being watched.
    pub initial_sweep: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            dedup_capacity: DEFAULT_DEDUP_CAPACITY,
            initial_sweep: true,
        }
    }
}

struct FolderWatch {
    subscription: Box<dyn Subscription>,
    cancel: oneshot::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl FolderWatch {
    /// Cancel delivery and signal the folder task; returns the task to join.
    fn shut_down(self) -> Option<JoinHandle<()>> {
        let FolderWatch {
            subscription,
            cancel,
            task,
        } = self;
        drop(subscription);
        drop(cancel);
        task
    }
}

/// The set of watched folders. Each folder gets its own subscription and its
/// own task, so a slow folder never holds up another one.
pub struct WatchRegistry {
    source: Arc<dyn EventSource>,
    organizer: Organizer,
    options: WatchOptions,
    folders: Mutex<HashMap<PathBuf, FolderWatch>>,
    state: watch::Sender<EngineState>,
}

impl std::fmt::Debug for WatchRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchRegistry")
            .field("state", &*self.state.borrow())
            .field("folders", &self.watched_folders())
            .finish()
    }
}

impl WatchRegistry {
    pub fn new(organizer: Organizer, source: Arc<dyn EventSource>, options: WatchOptions) -> Self {
        let (state, _) = watch::channel(EngineState::Idle);
        Self {
            source,
            organizer,
            options,
            folders: Mutex::new(HashMap::new()),
            state,
        }
    }

    /// Registry backed by OS notifications.
    pub fn with_notify(organizer: Organizer, options: WatchOptions) -> Self {
        Self::new(organizer, Arc::new(NotifySource), options)
    }

    // ── Engine lifecycle ────────────────────────────────────

    /// Start delivering events. Calling it while running is a no-op.
    pub fn start(&self) {
        let started = self.state.send_if_modified(|state| {
            if *state == EngineState::Running {
                false
            } else {
                *state = EngineState::Running;
                true
            }
        });
        if started {
            self.organizer.recorder().info("Watcher started", "");
        }
    }

    /// Stop accepting notifications, cancel every subscription and wait for
    /// in-flight organize operations to finish.
    pub async fn stop(&self) {
        self.state.send_replace(EngineState::Stopped);

        let drained: Vec<_> = self.lock_folders().drain().collect();
        let tasks: Vec<_> = drained
            .into_iter()
            .filter_map(|(_, folder)| folder.shut_down())
            .collect();
        for task in tasks {
            if let Err(e) = task.await {
                log::error!("Folder task ended abnormally: {}", e);
            }
        }

        self.organizer.recorder().info("Watcher stopped", "");
    }

    pub fn state(&self) -> EngineState {
        *self.state.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state() == EngineState::Running
    }

    // ── Folders ─────────────────────────────────────────────

    /// Watch `path`; false (with a warning or error record) when it is already
    /// watched, missing, or cannot be subscribed to.
    pub async fn start_watching(&self, path: impl AsRef<Path>) -> bool {
        let dir = path.as_ref();
        match self.watch_folder(dir).await {
            Ok(()) => true,
            Err(e @ WatchError::AlreadyWatched(_)) => {
                self.organizer
                    .recorder()
                    .warning("Folder already watched", &e.to_string());
                false
            }
            Err(e @ WatchError::MissingFolder(_)) => {
                self.organizer
                    .recorder()
                    .error("Folder does not exist", &e.to_string());
                false
            }
            Err(e) => {
                self.organizer
                    .recorder()
                    .error("Failed to watch folder", &e.to_string());
                false
            }
        }
    }

    /// Stop watching `path`; false (with a warning record) if it was not watched.
    pub async fn stop_watching(&self, path: impl AsRef<Path>) -> bool {
        match self.unwatch_folder(path.as_ref()).await {
            Ok(()) => true,
            Err(e) => {
                self.organizer
                    .recorder()
                    .warning("Folder not watched", &e.to_string());
                false
            }
        }
    }

    /// Subscribe, sweep existing files, then route new arrivals through a
    /// per-folder debouncer task.
    pub async fn watch_folder(&self, dir: &Path) -> Result<(), WatchError> {
        if self.state() == EngineState::Stopped {
            return Err(WatchError::EngineStopped);
        }
        if !dir.is_dir() {
            return Err(WatchError::MissingFolder(dir.to_path_buf()));
        }
        // Backends report canonical paths; key and compare on that form.
        let dir = &resolve(dir);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = oneshot::channel();
        {
            let mut folders = self.lock_folders();
            if folders.contains_key(dir) {
                return Err(WatchError::AlreadyWatched(dir.to_path_buf()));
            }
            let subscription = self.source.subscribe(dir, events_tx)?;
            folders.insert(
                dir.to_path_buf(),
                FolderWatch {
                    subscription,
                    cancel: cancel_tx,
                    task: None,
                },
            );
        }
        self.organizer
            .recorder()
            .info("Started watching", &dir.display().to_string());

        if self.options.initial_sweep {
            let organizer = self.organizer.clone();
            let sweep_dir = dir.to_path_buf();
            let sweep = tokio::task::spawn_blocking(move || organizer.organize_directory(&sweep_dir));
            if let Err(e) = sweep.await {
                log::error!("Initial sweep of {} panicked: {}", dir.display(), e);
            }
        }

        let task = tokio::spawn(run_folder(
            dir.to_path_buf(),
            events_rx,
            self.state.subscribe(),
            cancel_rx,
            EventDebouncer::new(self.options.settle_delay, self.options.dedup_capacity),
            self.organizer.clone(),
        ));

        // The folder may have been unwatched during the sweep; its task then
        // sees the cancellation and exits by itself.
        if let Some(folder) = self.lock_folders().get_mut(dir) {
            folder.task = Some(task);
        }
        Ok(())
    }

    pub async fn unwatch_folder(&self, path: &Path) -> Result<(), WatchError> {
        let dir = &resolve(path);
        let removed = {
            let mut folders = self.lock_folders();
            match folders.remove(dir) {
                Some(folder) => Some(folder),
                None => folders.remove(path),
            }
        };
        let folder = removed.ok_or_else(|| WatchError::NotWatched(path.to_path_buf()))?;

        if let Some(task) = folder.shut_down() {
            if let Err(e) = task.await {
                log::error!("Folder task for {} ended abnormally: {}", dir.display(), e);
            }
        }

        self.organizer
            .recorder()
            .info("Stopped watching", &dir.display().to_string());
        Ok(())
    }

    pub fn is_watching(&self, dir: &Path) -> bool {
        let folders = self.lock_folders();
        folders.contains_key(&resolve(dir)) || folders.contains_key(dir)
    }

    pub fn watched_folders(&self) -> Vec<PathBuf> {
        let mut folders: Vec<_> = self.lock_folders().keys().cloned().collect();
        folders.sort();
        folders
    }

    pub fn organizer(&self) -> &Organizer {
        &self.organizer
    }

    fn lock_folders(&self) -> MutexGuard<'_, HashMap<PathBuf, FolderWatch>> {
        // The map holds no invariants a panicking holder could break.
        self.folders.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Canonical form of `dir`, or `dir` itself once it no longer exists.
fn resolve(dir: &Path) -> PathBuf {
    dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf())
}

/// Event loop of one watched folder.
async fn run_folder(
    dir: PathBuf,
    mut events: mpsc::UnboundedReceiver<FsEvent>,
    mut state: watch::Receiver<EngineState>,
    mut cancel: oneshot::Receiver<()>,
    mut debouncer: EventDebouncer,
    organizer: Organizer,
) {
    // Hold events until the engine runs.
    loop {
        let current = *state.borrow_and_update();
        match current {
            EngineState::Running => break,
            EngineState::Stopped => return,
            EngineState::Idle => {}
        }
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    return;
                }
            }
            _ = &mut cancel => return,
        }
    }

    loop {
        let deadline = debouncer.next_deadline();
        let wake_at = tokio::time::Instant::from_std(deadline.unwrap_or_else(Instant::now));

        tokio::select! {
            biased;

            _ = &mut cancel => break,
            changed = state.changed() => {
                if changed.is_err() || *state.borrow() != EngineState::Running {
                    break;
                }
            }
            _ = tokio::time::sleep_until(wake_at), if deadline.is_some() => {
                for path in debouncer.drain_ready(Instant::now()) {
                    organize_ready(&dir, path, &organizer).await;
                }
            }
            event = events.recv() => match event {
                Some(event) => {
                    if let Some(path) = debouncer.observe(event, Instant::now()) {
                        organize_ready(&dir, path, &organizer).await;
                    }
                }
                None => break,
            },
        }
    }

    log::debug!("Folder task for {} finished", dir.display());
}

async fn organize_ready(dir: &Path, path: PathBuf, organizer: &Organizer) {
    let inside = match path.parent() {
        Some(parent) => parent == dir || resolve(parent) == dir,
        None => false,
    };
    if !inside {
        log::debug!("Ignoring {} outside {}", path.display(), dir.display());
        return;
    }
    // The watched folder can disappear between the event and now.
    if !dir.is_dir() {
        organizer
            .recorder()
            .warning("Watched folder is missing", &dir.display().to_string());
        return;
    }

    let organizer = organizer.clone();
    let result = tokio::task::spawn_blocking(move || organizer.organize_file(&path)).await;
    if let Err(e) = result {
        log::error!("Organize task panicked: {}", e);
    }
}
