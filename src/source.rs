use std::path::Path;

use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc::UnboundedSender;

use crate::debouncer::FsEvent;
use crate::error::WatchError;

/// A live subscription. Dropping it stops delivery for its directory.
pub trait Subscription: Send {}

/// Something that can deliver change notifications for one directory,
/// non-recursively, into a channel.
pub trait EventSource: Send + Sync {
    fn subscribe(
        &self,
        dir: &Path,
        sink: UnboundedSender<FsEvent>,
    ) -> Result<Box<dyn Subscription>, WatchError>;
}

/// OS notifications through the `notify` crate, one watcher per directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotifySource;

struct NotifySubscription {
    _watcher: notify::RecommendedWatcher,
}

impl Subscription for NotifySubscription {}

impl EventSource for NotifySource {
    fn subscribe(
        &self,
        dir: &Path,
        sink: UnboundedSender<FsEvent>,
    ) -> Result<Box<dyn Subscription>, WatchError> {
        let to_error = |source| WatchError::Notify {
            path: dir.to_path_buf(),
            source,
        };

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for fs_event in translate(event) {
                    // Receiver gone means the folder is being unwatched.
                    if sink.send(fs_event).is_err() {
                        break;
                    }
                }
            }
            Err(e) => log::error!("File watcher error: {}", e),
        })
        .map_err(to_error)?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(to_error)?;

        Ok(Box::new(NotifySubscription { _watcher: watcher }))
    }
}

/// Keep only file arrivals: creations and renames into the directory.
fn translate(event: Event) -> Vec<FsEvent> {
    match event.kind {
        EventKind::Create(CreateKind::Folder) => Vec::new(),
        EventKind::Create(_) => event.paths.into_iter().map(FsEvent::Created).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event
            .paths
            .into_iter()
            .map(|to| FsEvent::Moved { from: None, to })
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut paths = event.paths.into_iter();
            match (paths.next(), paths.next()) {
                (Some(from), Some(to)) => vec![FsEvent::Moved {
                    from: Some(from),
                    to,
                }],
                _ => Vec::new(),
            }
        }
        // Backends that cannot tell the two halves of a rename apart.
        EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => event
            .paths
            .into_iter()
            .filter(|p| p.exists())
            .map(|to| FsEvent::Moved { from: None, to })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, RemoveKind};
    use std::path::PathBuf;

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut e = Event::new(kind);
        for p in paths {
            e = e.add_path(PathBuf::from(p));
        }
        e
    }

    #[test]
    fn test_translate_create_and_rename() {
        let created = translate(event(EventKind::Create(CreateKind::File), &["/w/a.txt"]));
        assert_eq!(created, vec![FsEvent::Created(PathBuf::from("/w/a.txt"))]);

        let moved = translate(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/w/a.part", "/w/a.zip"],
        ));
        assert_eq!(
            moved,
            vec![FsEvent::Moved {
                from: Some(PathBuf::from("/w/a.part")),
                to: PathBuf::from("/w/a.zip"),
            }]
        );

        let moved_in = translate(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            &["/w/b.png"],
        ));
        assert_eq!(
            moved_in,
            vec![FsEvent::Moved {
                from: None,
                to: PathBuf::from("/w/b.png"),
            }]
        );
    }

    #[test]
    fn test_translate_ignores_other_kinds() {
        assert!(translate(event(EventKind::Create(CreateKind::Folder), &["/w/Imagens"])).is_empty());
        assert!(translate(event(EventKind::Remove(RemoveKind::File), &["/w/a"])).is_empty());
        assert!(translate(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &["/w/a"]
        ))
        .is_empty());
    }
}
