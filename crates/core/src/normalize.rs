//! Collapse one debounce window of raw events into normalized events
//!
//! Two passes run over the buffered window:
//! 1. Per-path deduplication, resolving contradictory kinds on the same path
//! 2. Ancestor-delete collapsing, dropping deletes under an already deleted directory
//!
//! Deletions are emitted first, followed by creations and changes in first-seen order.

use crate::event::{EventKind, NormalizedEvent, RawEvent};
use ahash::AHashMap;
use smallvec::SmallVec;
use std::path::{Path, PathBuf};

/// Translate a raw event into the single-path changes it stands for
///
/// A rename becomes a `Created` for the destination and a `Deleted` for the
/// source, each only when that endpoint lies inside `root`.
pub fn expand(root: &Path, event: &RawEvent) -> SmallVec<[(EventKind, PathBuf); 2]> {
    let mut out = SmallVec::new();
    match event {
        RawEvent::Change { kind, path } => out.push((*kind, path.clone())),
        RawEvent::Rename { from, to } => {
            if to.starts_with(root) {
                out.push((EventKind::Created, to.clone()));
            }
            if from.starts_with(root) {
                out.push((EventKind::Deleted, from.clone()));
            }
        }
    }
    out
}

/// Normalize the raw events of one window
pub fn normalize(root: &Path, events: &[RawEvent]) -> Vec<NormalizedEvent> {
    let deduped = dedup(events.iter().flat_map(|event| expand(root, event)));
    collapse_deletes(deduped)
}

/// Keep one record per path, applying the kind transition rules in arrival order
fn dedup(changes: impl IntoIterator<Item = (EventKind, PathBuf)>) -> Vec<NormalizedEvent> {
    // Slots keep first-seen order; a removed record leaves a hole
    let mut slots: Vec<Option<NormalizedEvent>> = Vec::new();
    let mut index: AHashMap<PathBuf, usize> = AHashMap::new();

    for (kind, path) in changes {
        let Some(&slot) = index.get(&path) else {
            index.insert(path.clone(), slots.len());
            slots.push(Some(NormalizedEvent::new(kind, path)));
            continue;
        };

        let Some(record) = slots[slot].as_mut() else {
            continue;
        };

        match (record.kind, kind) {
            // Created and destroyed inside the window
            (EventKind::Created, EventKind::Deleted) => {
                slots[slot] = None;
                index.remove(&path);
            }
            // Replaced in place
            (EventKind::Deleted, EventKind::Created) => record.kind = EventKind::Changed,
            (EventKind::Created, EventKind::Changed) => {}
            (_, new) => record.kind = new,
        }
    }

    slots.into_iter().flatten().collect()
}

/// Drop deletes that lie beneath another deleted path, then order deletes first
fn collapse_deletes(records: Vec<NormalizedEvent>) -> Vec<NormalizedEvent> {
    let (mut deleted, others): (Vec<_>, Vec<_>) = records
        .into_iter()
        .partition(|record| record.kind == EventKind::Deleted);

    // Shortest first so ancestors are confirmed before their descendants
    deleted.sort_by_key(|record| record.path.as_os_str().len());

    let mut confirmed: Vec<PathBuf> = Vec::with_capacity(deleted.len());
    let mut out = Vec::with_capacity(deleted.len() + others.len());

    for record in deleted {
        if is_under_any(&record.path, &confirmed) {
            continue;
        }
        confirmed.push(record.path.clone());
        out.push(record);
    }

    out.extend(others);
    out
}

/// True if `path` is strictly inside one of `ancestors`
///
/// Comparison is component-wise, so `/ab` is not inside `/a`.
fn is_under_any(path: &Path, ancestors: &[PathBuf]) -> bool {
    ancestors
        .iter()
        .any(|ancestor| path != ancestor.as_path() && path.starts_with(ancestor))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "/w";

    fn run(events: &[RawEvent]) -> Vec<NormalizedEvent> {
        normalize(Path::new(ROOT), events)
    }

    fn ev(kind: EventKind, path: &str) -> NormalizedEvent {
        NormalizedEvent::new(kind, path)
    }

    #[test]
    fn test_create_then_delete_cancels() {
        let out = run(&[RawEvent::created("/w/a.txt"), RawEvent::deleted("/w/a.txt")]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_delete_then_create_is_change() {
        let out = run(&[RawEvent::deleted("/w/a.txt"), RawEvent::created("/w/a.txt")]);
        assert_eq!(out, vec![ev(EventKind::Changed, "/w/a.txt")]);
    }

    #[test]
    fn test_create_then_change_stays_created() {
        let out = run(&[
            RawEvent::created("/w/a.txt"),
            RawEvent::changed("/w/a.txt"),
            RawEvent::changed("/w/a.txt"),
        ]);
        assert_eq!(out, vec![ev(EventKind::Created, "/w/a.txt")]);
    }

    #[test]
    fn test_latest_kind_wins_otherwise() {
        let out = run(&[RawEvent::changed("/w/a.txt"), RawEvent::deleted("/w/a.txt")]);
        assert_eq!(out, vec![ev(EventKind::Deleted, "/w/a.txt")]);

        let out = run(&[RawEvent::changed("/w/b.txt"), RawEvent::created("/w/b.txt")]);
        assert_eq!(out, vec![ev(EventKind::Created, "/w/b.txt")]);
    }

    #[test]
    fn test_recreated_after_cancel_gets_new_position() {
        let out = run(&[
            RawEvent::created("/w/a"),
            RawEvent::changed("/w/b"),
            RawEvent::deleted("/w/a"),
            RawEvent::created("/w/a"),
        ]);
        assert_eq!(
            out,
            vec![ev(EventKind::Changed, "/w/b"), ev(EventKind::Created, "/w/a")]
        );
    }

    #[test]
    fn test_nested_deletes_collapse_to_ancestor() {
        let out = run(&[
            RawEvent::deleted("/w/a/b/c"),
            RawEvent::deleted("/w/a/b"),
            RawEvent::deleted("/w/a"),
        ]);
        assert_eq!(out, vec![ev(EventKind::Deleted, "/w/a")]);
    }

    #[test]
    fn test_unrelated_deletes_both_kept() {
        let out = run(&[RawEvent::deleted("/w/a"), RawEvent::deleted("/w/b/c")]);
        assert_eq!(
            out,
            vec![ev(EventKind::Deleted, "/w/a"), ev(EventKind::Deleted, "/w/b/c")]
        );
    }

    #[test]
    fn test_sibling_with_shared_prefix_not_collapsed() {
        let out = run(&[RawEvent::deleted("/w/ab"), RawEvent::deleted("/w/a")]);
        assert_eq!(
            out,
            vec![ev(EventKind::Deleted, "/w/a"), ev(EventKind::Deleted, "/w/ab")]
        );
    }

    #[test]
    fn test_deletes_precede_other_events() {
        let out = run(&[
            RawEvent::created("/w/new"),
            RawEvent::changed("/w/edited"),
            RawEvent::deleted("/w/gone"),
        ]);
        assert_eq!(
            out,
            vec![
                ev(EventKind::Deleted, "/w/gone"),
                ev(EventKind::Created, "/w/new"),
                ev(EventKind::Changed, "/w/edited"),
            ]
        );
    }

    #[test]
    fn test_changes_under_deleted_dir_are_kept() {
        // Only deletes collapse into a deleted ancestor
        let out = run(&[RawEvent::deleted("/w/a"), RawEvent::changed("/w/a/x")]);
        assert_eq!(
            out,
            vec![ev(EventKind::Deleted, "/w/a"), ev(EventKind::Changed, "/w/a/x")]
        );
    }

    #[test]
    fn test_rename_inside_root() {
        let out = run(&[RawEvent::rename("/w/old", "/w/new")]);
        assert_eq!(
            out,
            vec![ev(EventKind::Deleted, "/w/old"), ev(EventKind::Created, "/w/new")]
        );
    }

    #[test]
    fn test_rename_out_of_root_is_delete_only() {
        let out = run(&[RawEvent::rename("/w/old", "/elsewhere/old")]);
        assert_eq!(out, vec![ev(EventKind::Deleted, "/w/old")]);
    }

    #[test]
    fn test_rename_into_root_is_create_only() {
        let out = run(&[RawEvent::rename("/elsewhere/f", "/w/f")]);
        assert_eq!(out, vec![ev(EventKind::Created, "/w/f")]);
    }

    #[test]
    fn test_rename_halves_follow_dedup_rules() {
        // Atomic save: write temp file, rename over the target
        let out = run(&[
            RawEvent::created("/w/.a.tmp"),
            RawEvent::changed("/w/.a.tmp"),
            RawEvent::rename("/w/.a.tmp", "/w/a"),
        ]);
        assert_eq!(out, vec![ev(EventKind::Created, "/w/a")]);
    }

    #[test]
    fn test_expand_yields_create_before_delete() {
        let halves = expand(Path::new(ROOT), &RawEvent::rename("/w/x", "/w/y"));
        assert_eq!(
            halves.as_slice(),
            &[
                (EventKind::Created, PathBuf::from("/w/y")),
                (EventKind::Deleted, PathBuf::from("/w/x")),
            ]
        );
    }

    #[test]
    fn test_empty_window() {
        assert!(run(&[]).is_empty());
    }
}
