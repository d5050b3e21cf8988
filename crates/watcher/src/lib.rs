//! File system watching for hotswap
//!
//! This crate provides:
//! - A debouncer that coalesces bursts of triggers into one deferred action
//! - The change detection policy deciding which events reload the container
//! - A recursive notify subscription feeding that policy from its own thread
//! - Startup cleanup of stale files in the watched root

pub mod cleanup;
pub mod debounce;
pub mod detect;
pub mod fs;

pub use cleanup::{clear_stale_files, CleanupReport};
pub use debounce::Debouncer;
pub use detect::{classify, ChangeDetector, Decision, ReloadTrigger};
pub use fs::{FsWatcher, WatchFailure};

use notify::event::{CreateKind, ModifyKind, RemoveKind};
use std::path::PathBuf;

/// File system event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Path that changed
    pub path: PathBuf,
    /// Type of change
    pub kind: EventKind,
    /// Whether the path is a directory
    pub is_dir: bool,
}

/// Type of file system event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// File created
    Created,
    /// File contents or metadata modified
    Modified,
    /// File deleted
    Deleted,
    /// File renamed
    Moved,
}

impl WatchEvent {
    pub fn new(path: impl Into<PathBuf>, kind: EventKind, is_dir: bool) -> Self {
        Self {
            path: path.into(),
            kind,
            is_dir,
        }
    }

    /// Translate a raw notify event into one event per affected path
    ///
    /// Access notifications and unclassified kinds produce nothing.
    pub fn from_notify(event: notify::Event) -> Vec<WatchEvent> {
        use notify::EventKind as Raw;

        let (kind, folder_hint) = match event.kind {
            Raw::Create(create) => (EventKind::Created, create == CreateKind::Folder),
            Raw::Modify(ModifyKind::Name(_)) => (EventKind::Moved, false),
            Raw::Modify(_) => (EventKind::Modified, false),
            Raw::Remove(remove) => (EventKind::Deleted, remove == RemoveKind::Folder),
            Raw::Access(_) | Raw::Any | Raw::Other => return Vec::new(),
        };

        event
            .paths
            .into_iter()
            .map(|path| {
                let is_dir = folder_hint || path.is_dir();
                WatchEvent { path, kind, is_dir }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, DataChange, RenameMode};
    use tempfile::TempDir;

    #[test]
    fn test_from_notify_maps_kinds() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("dockerimage.tar");
        std::fs::write(&file, b"tar").unwrap();

        let created = notify::Event::new(notify::EventKind::Create(CreateKind::File))
            .add_path(file.clone());
        assert_eq!(
            WatchEvent::from_notify(created),
            vec![WatchEvent::new(&file, EventKind::Created, false)]
        );

        let modified = notify::Event::new(notify::EventKind::Modify(ModifyKind::Data(
            DataChange::Content,
        )))
        .add_path(file.clone());
        assert_eq!(WatchEvent::from_notify(modified)[0].kind, EventKind::Modified);

        let renamed = notify::Event::new(notify::EventKind::Modify(ModifyKind::Name(
            RenameMode::Both,
        )))
        .add_path(file.clone())
        .add_path(temp_dir.path().join("other.tar"));
        let moved = WatchEvent::from_notify(renamed);
        assert_eq!(moved.len(), 2);
        assert!(moved.iter().all(|e| e.kind == EventKind::Moved));

        let removed = notify::Event::new(notify::EventKind::Remove(RemoveKind::Folder))
            .add_path(temp_dir.path().join("gone"));
        let deleted = WatchEvent::from_notify(removed);
        assert_eq!(deleted[0].kind, EventKind::Deleted);
        assert!(deleted[0].is_dir);
    }

    #[test]
    fn test_from_notify_detects_directories() {
        let temp_dir = TempDir::new().unwrap();
        let sub = temp_dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();

        let event = notify::Event::new(notify::EventKind::Modify(ModifyKind::Any)).add_path(sub);
        assert!(WatchEvent::from_notify(event)[0].is_dir);
    }

    #[test]
    fn test_from_notify_drops_access_events() {
        let event = notify::Event::new(notify::EventKind::Access(AccessKind::Any))
            .add_path(PathBuf::from("/tmp/file"));
        assert!(WatchEvent::from_notify(event).is_empty());
    }
}
