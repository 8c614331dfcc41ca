//! Content synchronization.
//!
//! Given the content list a part should represent, the synchronizer reuses,
//! reorders, creates and prunes parts so that the part's content children
//! (or content anchoreds) match the list one to one, in order. Parts that
//! are not content parts keep their positions relative to each other.

mod reconcile;

use serde::Serialize;

/// Which list of a host part a synchronization targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncRole {
    Children,
    Anchored,
}

impl SyncRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncRole::Children => "children",
            SyncRole::Anchored => "anchored",
        }
    }
}

/// What one synchronization pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Slots that already held the right part.
    pub kept: usize,
    pub reordered: usize,
    /// Parts found through the content lookup and moved under the host.
    pub reused: usize,
    pub created: usize,
    pub removed: usize,
    /// Removed parts whose content was cleared because nothing else
    /// referenced them.
    pub disposed: usize,
}

impl SyncReport {
    /// True when the pass left the tree untouched.
    pub fn is_noop(&self) -> bool {
        self.reordered == 0
            && self.reused == 0
            && self.created == 0
            && self.removed == 0
            && self.disposed == 0
    }

    pub fn merge(&mut self, other: &SyncReport) {
        self.kept += other.kept;
        self.reordered += other.reordered;
        self.reused += other.reused;
        self.created += other.created;
        self.removed += other.removed;
        self.disposed += other.disposed;
    }
}
