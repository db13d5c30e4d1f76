//! Sorts files dropped into watched folders into category subfolders.
//!
//! Pipeline: an [`source::EventSource`] delivers raw notifications per folder,
//! the [`watcher::WatchRegistry`] runs one task per folder that feeds them
//! through an [`debouncer::EventDebouncer`], and ready paths are handed to the
//! [`organizer::Organizer`]. Every outcome lands in the SQLite activity log via
//! the [`recorder::ActivityRecorder`].

pub mod categories;
pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod debouncer;
pub mod error;
pub mod logging;
pub mod organizer;
pub mod recorder;
pub mod source;
pub mod stats;
pub mod watcher;

pub use categories::{classify, Category};
pub use commands::AppState;
pub use debouncer::{EventDebouncer, FsEvent};
pub use error::{ConfigError, OrganizeError, StorageError, WatchError};
pub use organizer::{Organizer, Outcome, SweepReport};
pub use recorder::ActivityRecorder;
pub use source::{EventSource, NotifySource, Subscription};
pub use watcher::{EngineState, WatchOptions, WatchRegistry};
