use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::categories::{classify_path, is_category_folder};
use crate::error::OrganizeError;
use crate::recorder::ActivityRecorder;

/// Upper bound on `_<n>` suffixes tried before giving up on a name.
pub const MAX_COLLISION_ATTEMPTS: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Moved { from: PathBuf, to: PathBuf },
    /// Path was missing, a directory, or otherwise not a regular file.
    Skipped,
}

/// Result of sweeping one directory. Per-file failures are collected, never
/// fatal to the sweep.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub moved: usize,
    pub skipped: usize,
    pub failed: Vec<OrganizeError>,
}

/// Moves files into the category folder next to them.
#[derive(Debug, Clone)]
pub struct Organizer {
    recorder: ActivityRecorder,
    collision_limit: u32,
}

impl Organizer {
    pub fn new(recorder: ActivityRecorder) -> Self {
        Self {
            recorder,
            collision_limit: MAX_COLLISION_ATTEMPTS,
        }
    }

    pub fn with_collision_limit(mut self, limit: u32) -> Self {
        self.collision_limit = limit;
        self
    }

    pub fn recorder(&self) -> &ActivityRecorder {
        &self.recorder
    }

    /// Move `path` into `<parent>/<category folder>/`.
    /// Every outcome is reported to the recorder; errors are returned, never
    /// panicked on.
    pub fn organize_file(&self, path: &Path) -> Result<Outcome, OrganizeError> {
        match self.try_organize(path) {
            Ok(Outcome::Moved { from, to }) => {
                self.recorder.info(
                    "File moved",
                    &format!("From {} to {}", from.display(), to.display()),
                );
                Ok(Outcome::Moved { from, to })
            }
            Ok(Outcome::Skipped) => Ok(Outcome::Skipped),
            Err(e) => {
                self.recorder.error("Failed to organize file", &e.to_string());
                Err(e)
            }
        }
    }

    /// Organize every regular file directly inside `dir`.
    /// Only fails if `dir` itself cannot be listed.
    pub fn organize_directory(&self, dir: &Path) -> Result<SweepReport, OrganizeError> {
        let files = match list_files(dir) {
            Ok(files) => files,
            Err(e) => {
                let err = OrganizeError::from_io(dir, e);
                self.recorder.error("Failed to organize directory", &err.to_string());
                return Err(err);
            }
        };

        let mut report = SweepReport::default();
        for file in files {
            match self.organize_file(&file) {
                Ok(Outcome::Moved { .. }) => report.moved += 1,
                Ok(Outcome::Skipped) => report.skipped += 1,
                Err(e) => report.failed.push(e),
            }
        }

        log::info!(
            "Organized {} ({} moved, {} skipped, {} failed)",
            dir.display(),
            report.moved,
            report.skipped,
            report.failed.len()
        );
        Ok(report)
    }

    fn try_organize(&self, path: &Path) -> Result<Outcome, OrganizeError> {
        // The file may have vanished or been replaced by a directory since the
        // event was queued.
        let is_file = fs::metadata(path).map(|m| m.is_file()).unwrap_or(false);
        if !is_file {
            return Ok(Outcome::Skipped);
        }
        let (parent, file_name) = match (path.parent(), path.file_name()) {
            (Some(parent), Some(name)) => (parent, name),
            _ => return Ok(Outcome::Skipped),
        };

        let target_dir = parent.join(classify_path(path).folder_name());
        fs::create_dir_all(&target_dir).map_err(|e| OrganizeError::from_io(&target_dir, e))?;

        let destination = free_destination(&target_dir, file_name, self.collision_limit)?;
        move_file(path, &destination)?;

        Ok(Outcome::Moved {
            from: path.to_path_buf(),
            to: destination,
        })
    }
}

/// Direct regular-file children of `dir`, skipping category folders.
fn list_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        if is_category_folder(&entry.file_name().to_string_lossy()) {
            continue;
        }
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn occupied(path: &Path) -> bool {
    // symlink_metadata so a dangling link still counts as taken.
    fs::symlink_metadata(path).is_ok()
}

/// `dir/name`, or the first free `dir/<stem>_<n><.ext>` for n = 1, 2, ...
fn free_destination(dir: &Path, file_name: &OsStr, limit: u32) -> Result<PathBuf, OrganizeError> {
    let candidate = dir.join(file_name);
    if !occupied(&candidate) {
        return Ok(candidate);
    }

    let name = Path::new(file_name);
    let stem = name.file_stem().unwrap_or(file_name);
    let ext = name.extension();

    for n in 1..=limit {
        // Built as an OsString so names that are not valid UTF-8 survive.
        let mut numbered = OsString::from(stem);
        numbered.push(format!("_{}", n));
        if let Some(ext) = ext {
            numbered.push(".");
            numbered.push(ext);
        }
        let candidate = dir.join(numbered);
        if !occupied(&candidate) {
            return Ok(candidate);
        }
    }

    Err(OrganizeError::NameCollisionExhausted {
        path: dir.join(file_name),
        attempts: limit,
    })
}

/// Rename, falling back to copy + delete when the rename cannot work
/// (different volume). The source is only removed after a complete copy.
fn move_file(from: &Path, to: &Path) -> Result<(), OrganizeError> {
    let rename_err = match fs::rename(from, to) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    if matches!(
        rename_err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
    ) {
        return Err(OrganizeError::from_io(from, rename_err));
    }

    log::debug!(
        "Rename {} failed ({}), falling back to copy",
        from.display(),
        rename_err
    );
    if let Err(e) = fs::copy(from, to) {
        let _ = fs::remove_file(to);
        return Err(OrganizeError::from_io(from, e));
    }
    if let Err(e) = fs::remove_file(from) {
        // Leave the original in place rather than keep two copies.
        let _ = fs::remove_file(to);
        return Err(OrganizeError::from_io(from, e));
    }
    Ok(())
}

// ── Tests ───────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        _db_dir: TempDir,
        organizer: Organizer,
    }

    impl Fixture {
        fn new() -> Self {
            let db_dir = tempfile::tempdir().unwrap();
            let recorder = ActivityRecorder::open(db_dir.path().join("data.db")).unwrap();
            Self {
                dir: tempfile::tempdir().unwrap(),
                _db_dir: db_dir,
                organizer: Organizer::new(recorder),
            }
        }

        fn path(&self, rel: &str) -> PathBuf {
            self.dir.path().join(rel)
        }

        fn write(&self, rel: &str, content: &str) -> PathBuf {
            let path = self.path(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&path, content).unwrap();
            path
        }
    }

    #[test]
    fn test_organize_file_moves_into_category_folder() {
        let fx = Fixture::new();
        let file = fx.write("photo.JPG", "pixels");

        let outcome = fx.organizer.organize_file(&file).unwrap();
        let expected = fx.path("Imagens/photo.JPG");
        assert_eq!(
            outcome,
            Outcome::Moved {
                from: file.clone(),
                to: expected.clone()
            }
        );
        assert!(!file.exists());
        assert_eq!(fs::read_to_string(expected).unwrap(), "pixels");

        let logs = fx.organizer.recorder().query(10).unwrap();
        assert_eq!(logs[0].action, "File moved");
        assert!(logs[0].details.contains("photo.JPG"));
    }

    #[test]
    fn test_unknown_and_missing_extensions_go_to_others() {
        let fx = Fixture::new();
        let a = fx.write("notes.xyz", "a");
        let b = fx.write("Makefile", "b");

        fx.organizer.organize_file(&a).unwrap();
        fx.organizer.organize_file(&b).unwrap();
        assert!(fx.path("Outros/notes.xyz").exists());
        assert!(fx.path("Outros/Makefile").exists());
    }

    #[test]
    fn test_skips_directories_and_missing_paths() {
        let fx = Fixture::new();
        fs::create_dir(fx.path("somedir")).unwrap();

        assert_eq!(fx.organizer.organize_file(&fx.path("somedir")).unwrap(), Outcome::Skipped);
        assert_eq!(fx.organizer.organize_file(&fx.path("ghost.pdf")).unwrap(), Outcome::Skipped);
        assert!(fx.path("somedir").is_dir());
        assert!(!fx.path("Documentos").exists());
    }

    #[test]
    fn test_collision_suffixes() {
        let fx = Fixture::new();
        fx.write("Documentos/report.pdf", "original");

        let first = fx.write("report.pdf", "second");
        fx.organizer.organize_file(&first).unwrap();
        let second = fx.write("report.pdf", "third");
        fx.organizer.organize_file(&second).unwrap();

        assert_eq!(fs::read_to_string(fx.path("Documentos/report.pdf")).unwrap(), "original");
        assert_eq!(fs::read_to_string(fx.path("Documentos/report_1.pdf")).unwrap(), "second");
        assert_eq!(fs::read_to_string(fx.path("Documentos/report_2.pdf")).unwrap(), "third");
    }

    #[test]
    fn test_collision_suffix_without_extension_and_multi_dot() {
        let fx = Fixture::new();
        fx.write("Compactados/backup.tar.gz", "x");
        fx.write("Outros/README", "x");

        let a = fx.write("backup.tar.gz", "y");
        let b = fx.write("README", "y");
        fx.organizer.organize_file(&a).unwrap();
        fx.organizer.organize_file(&b).unwrap();

        assert!(fx.path("Compactados/backup.tar_1.gz").exists());
        assert!(fx.path("Outros/README_1").exists());
    }

    #[test]
    fn test_collision_exhausted_is_an_error() {
        let fx = Fixture::new();
        fx.write("Documentos/a.txt", "0");
        fx.write("Documentos/a_1.txt", "1");
        let file = fx.write("a.txt", "new");

        let organizer = fx.organizer.clone().with_collision_limit(1);
        let err = organizer.organize_file(&file).unwrap_err();
        assert!(matches!(err, OrganizeError::NameCollisionExhausted { attempts: 1, .. }));

        // Nothing was overwritten and the source stays put.
        assert_eq!(fs::read_to_string(&file).unwrap(), "new");
        assert_eq!(fs::read_to_string(fx.path("Documentos/a.txt")).unwrap(), "0");

        let logs = organizer.recorder().query(1).unwrap();
        assert_eq!(logs[0].action, "ERROR - Failed to organize file");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_collision_suffix_keeps_non_utf8_bytes() {
        use std::os::unix::ffi::OsStrExt;

        let fx = Fixture::new();
        let name = OsStr::from_bytes(b"caf\xe9.txt");
        fs::create_dir_all(fx.path("Documentos")).unwrap();
        fs::write(fx.path("Documentos").join(name), "old").unwrap();
        let file = fx.dir.path().join(name);
        fs::write(&file, "new").unwrap();

        fx.organizer.organize_file(&file).unwrap();

        let expected = fx.path("Documentos").join(OsStr::from_bytes(b"caf\xe9_1.txt"));
        assert_eq!(fs::read_to_string(expected).unwrap(), "new");
    }

    #[test]
    fn test_sweep_continues_past_failed_file() {
        let fx = Fixture::new();
        fx.write("Documentos/a.txt", "taken");
        fx.write("a.txt", "blocked");
        fx.write("b.jpg", "fine");

        let organizer = fx.organizer.clone().with_collision_limit(0);
        let report = organizer.organize_directory(fx.dir.path()).unwrap();

        assert_eq!(report.moved, 1);
        assert_eq!(report.failed.len(), 1);
        assert!(matches!(
            report.failed[0],
            OrganizeError::NameCollisionExhausted { attempts: 0, .. }
        ));
        assert!(fx.path("a.txt").exists());
        assert!(fx.path("Imagens/b.jpg").exists());
    }

    #[test]
    fn test_move_survives_stopped_recorder() {
        let fx = Fixture::new();
        let file = fx.write("clip.mp4", "frames");
        fx.organizer.recorder().shutdown();

        let outcome = fx.organizer.organize_file(&file).unwrap();
        assert!(matches!(outcome, Outcome::Moved { .. }));
        assert!(!file.exists());
        assert_eq!(fs::read_to_string(fx.path("Vídeos/clip.mp4")).unwrap(), "frames");
    }

    #[test]
    fn test_organize_directory_sweeps_top_level_only() {
        let fx = Fixture::new();
        fx.write("a.jpg", "a");
        fx.write("b.txt", "b");
        fx.write("c.mp3", "c");
        fx.write("nested/d.png", "d");
        fx.write("Imagens/old.jpg", "old");

        let report = fx.organizer.organize_directory(fx.dir.path()).unwrap();
        assert_eq!(report.moved, 3);
        assert!(report.failed.is_empty());

        assert!(fx.path("Imagens/a.jpg").exists());
        assert!(fx.path("Documentos/b.txt").exists());
        assert!(fx.path("Áudios/c.mp3").exists());
        assert!(fx.path("nested/d.png").exists());
        assert!(fx.path("Imagens/old.jpg").exists());
        assert!(!fx.path("a.jpg").exists());
    }

    #[test]
    fn test_organize_directory_is_idempotent() {
        let fx = Fixture::new();
        fx.write("a.jpg", "a");
        fx.write("b.docx", "b");

        assert_eq!(fx.organizer.organize_directory(fx.dir.path()).unwrap().moved, 2);
        let second = fx.organizer.organize_directory(fx.dir.path()).unwrap();
        assert_eq!(second.moved, 0);
        assert_eq!(second.skipped, 0);
        assert!(second.failed.is_empty());
    }

    #[test]
    fn test_organize_directory_preserves_content() {
        let fx = Fixture::new();
        let names = ["one.pdf", "two.png", "three.zip", "four.rs", "five.mov"];
        for name in names {
            fx.write(name, &format!("content of {}", name));
        }

        fx.organizer.organize_directory(fx.dir.path()).unwrap();

        for name in names {
            let category = classify_path(Path::new(name));
            let moved = fx.path(category.folder_name()).join(name);
            assert_eq!(
                fs::read_to_string(&moved).unwrap(),
                format!("content of {}", name)
            );
        }
    }

    #[test]
    fn test_organize_missing_directory_fails() {
        let fx = Fixture::new();
        let err = fx.organizer.organize_directory(&fx.path("nope")).unwrap_err();
        assert!(matches!(err, OrganizeError::NotFound { .. }));
    }
}
