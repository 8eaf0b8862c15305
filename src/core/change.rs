//! Change detection between a fresh sample and the last published one.

use crate::core::snapshot::ActivitySnapshot;

/// Whether `candidate` should be published.
///
/// True when nothing has been published yet or when any tracked field
/// (process, title, idle seconds, fullscreen, extra info) differs from
/// `last_published`. Neither snapshot is modified.
pub fn is_changed(candidate: &ActivitySnapshot, last_published: Option<&ActivitySnapshot>) -> bool {
    match last_published {
        None => true,
        Some(last) => !candidate.same_activity(last),
    }
}
