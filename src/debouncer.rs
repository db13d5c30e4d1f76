//! Turns the raw notification stream of one folder into "ready" paths.
//!
//! A single file arrival usually fires several notifications (create, then a
//! rename from a temp name, then maybe a second create). Created files wait
//! for a settle delay so the writer can finish; files moved in are ready at
//! once. Every path handed out is remembered in a dedup set so repeats are
//! dropped. The set is cleared wholesale past `capacity` entries, after which
//! an old path can be handed out again.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_DEDUP_CAPACITY: usize = 1000;

/// A raw change notification for one watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsEvent {
    Created(PathBuf),
    /// `from` is absent when the backend only reports the destination.
    Moved { from: Option<PathBuf>, to: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEvent {
    pub path: PathBuf,
    pub detected_at: Instant,
}

#[derive(Debug)]
pub struct EventDebouncer {
    settle_delay: Duration,
    capacity: usize,
    // Deadlines are detected_at + a constant delay, so this stays sorted.
    pending: VecDeque<PendingEvent>,
    processed: HashSet<PathBuf>,
}

impl Default for EventDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE_DELAY, DEFAULT_DEDUP_CAPACITY)
    }
}

impl EventDebouncer {
    pub fn new(settle_delay: Duration, capacity: usize) -> Self {
        Self {
            settle_delay,
            capacity,
            pending: VecDeque::new(),
            processed: HashSet::new(),
        }
    }

    /// Feed one notification. Returns a path that is ready right now (moves
    /// whose destination exists); created files become ready through
    /// [`drain_ready`](Self::drain_ready).
    pub fn observe(&mut self, event: FsEvent, now: Instant) -> Option<PathBuf> {
        match event {
            FsEvent::Created(path) => {
                if !self.is_known(&path) {
                    self.pending.push_back(PendingEvent {
                        path,
                        detected_at: now,
                    });
                }
                None
            }
            FsEvent::Moved { to, .. } => {
                if self.processed.contains(&to) || !to.exists() {
                    return None;
                }
                // A move supersedes a create still settling for the same path.
                self.pending.retain(|p| p.path != to);
                self.mark_processed(to.clone());
                Some(to)
            }
        }
    }

    /// When the oldest pending event settles, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending
            .front()
            .map(|p| p.detected_at + self.settle_delay)
    }

    /// Pop every pending event whose settle delay has elapsed, in arrival order.
    pub fn drain_ready(&mut self, now: Instant) -> Vec<PathBuf> {
        let mut ready = Vec::new();
        while let Some(front) = self.pending.front() {
            if front.detected_at + self.settle_delay > now {
                break;
            }
            if let Some(event) = self.pending.pop_front() {
                if !self.processed.contains(&event.path) {
                    self.mark_processed(event.path.clone());
                    ready.push(event.path);
                }
            }
        }
        ready
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn processed_len(&self) -> usize {
        self.processed.len()
    }

    fn is_known(&self, path: &Path) -> bool {
        self.processed.contains(path) || self.pending.iter().any(|p| p.path == path)
    }

    fn mark_processed(&mut self, path: PathBuf) {
        self.processed.insert(path);
        if self.processed.len() > self.capacity {
            log::debug!("Dedup set exceeded {} entries, clearing", self.capacity);
            self.processed.clear();
        }
    }
}

// ── Tests ───────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const SETTLE: Duration = Duration::from_millis(500);

    fn created(p: &str) -> FsEvent {
        FsEvent::Created(PathBuf::from(p))
    }

    #[test]
    fn test_created_waits_for_settle_delay() {
        let mut d = EventDebouncer::new(SETTLE, 1000);
        let t0 = Instant::now();

        assert_eq!(d.observe(created("/w/a.txt"), t0), None);
        assert_eq!(d.next_deadline(), Some(t0 + SETTLE));
        assert!(d.drain_ready(t0 + Duration::from_millis(499)).is_empty());
        assert_eq!(d.drain_ready(t0 + SETTLE), vec![PathBuf::from("/w/a.txt")]);
        assert_eq!(d.next_deadline(), None);
    }

    #[test]
    fn test_burst_of_creates_yields_one_ready() {
        let mut d = EventDebouncer::new(SETTLE, 1000);
        let t0 = Instant::now();
        for i in 0..5 {
            d.observe(created("/w/a.txt"), t0 + Duration::from_millis(i * 50));
        }
        assert_eq!(d.pending_len(), 1);

        let ready = d.drain_ready(t0 + Duration::from_secs(2));
        assert_eq!(ready, vec![PathBuf::from("/w/a.txt")]);

        // Late repeats of an already handled path are ignored.
        d.observe(created("/w/a.txt"), t0 + Duration::from_secs(3));
        assert!(d.drain_ready(t0 + Duration::from_secs(10)).is_empty());
    }

    #[test]
    fn test_ready_order_follows_arrival() {
        let mut d = EventDebouncer::new(SETTLE, 1000);
        let t0 = Instant::now();
        d.observe(created("/w/1"), t0);
        d.observe(created("/w/2"), t0 + Duration::from_millis(100));
        d.observe(created("/w/3"), t0 + Duration::from_millis(900));

        let ready = d.drain_ready(t0 + Duration::from_millis(700));
        assert_eq!(ready, vec![PathBuf::from("/w/1"), PathBuf::from("/w/2")]);
        assert_eq!(d.next_deadline(), Some(t0 + Duration::from_millis(1400)));
    }

    #[test]
    fn test_moved_is_ready_immediately_when_destination_exists() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("in.pdf");
        std::fs::write(&dest, "x").unwrap();
        let mut d = EventDebouncer::new(SETTLE, 1000);
        let now = Instant::now();

        d.observe(FsEvent::Created(dest.clone()), now);
        let ready = d.observe(
            FsEvent::Moved {
                from: Some(dir.path().join("in.pdf.part")),
                to: dest.clone(),
            },
            now,
        );
        assert_eq!(ready, Some(dest.clone()));
        assert_eq!(d.pending_len(), 0);

        // Duplicate move notification is dropped.
        assert_eq!(d.observe(FsEvent::Moved { from: None, to: dest }, now), None);
    }

    #[test]
    fn test_moved_with_missing_destination_is_ignored() {
        let mut d = EventDebouncer::default();
        let to = PathBuf::from("/definitely/not/here.txt");
        assert_eq!(d.observe(FsEvent::Moved { from: None, to }, Instant::now()), None);
        assert_eq!(d.processed_len(), 0);
    }

    #[test]
    fn test_dedup_set_is_cleared_past_capacity() {
        let mut d = EventDebouncer::new(Duration::ZERO, 3);
        let t0 = Instant::now();
        for name in ["/w/a", "/w/b", "/w/c"] {
            d.observe(created(name), t0);
        }
        assert_eq!(d.drain_ready(t0).len(), 3);
        assert_eq!(d.processed_len(), 3);

        d.observe(created("/w/d"), t0);
        assert_eq!(d.drain_ready(t0).len(), 1);
        assert_eq!(d.processed_len(), 0);

        // After the clear an old path is accepted again.
        d.observe(created("/w/a"), t0);
        assert_eq!(d.drain_ready(t0), vec![PathBuf::from("/w/a")]);
    }
}
