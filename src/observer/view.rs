use crate::ids::TransmutationId;
use crate::lifecycle::Transmutation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Replaced,
    /// Incoming snapshot is older than the local one and was ignored.
    Stale,
}

/// A client's local, ordered copy of the transmutation list.
///
/// Only changes through [`reset`](Self::reset) (full resync) and
/// [`merge`](Self::merge) (one change event).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalView {
    entries: Vec<Transmutation>,
}

impl LocalView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole view with a freshly fetched list.
    pub fn reset(&mut self, entries: Vec<Transmutation>) {
        self.entries = entries;
    }

    /// Last-writer-wins merge keyed by id: unknown ids are prepended, known
    /// ids are replaced in place. Older revisions never overwrite newer ones.
    pub fn merge(&mut self, incoming: Transmutation) -> MergeOutcome {
        match self.entries.iter_mut().find(|t| t.id == incoming.id) {
            None => {
                self.entries.insert(0, incoming);
                MergeOutcome::Inserted
            }
            Some(existing) if incoming.revision < existing.revision => MergeOutcome::Stale,
            Some(existing) => {
                *existing = incoming;
                MergeOutcome::Replaced
            }
        }
    }

    pub fn get(&self, id: TransmutationId) -> Option<&Transmutation> {
        self.entries.iter().find(|t| t.id == id)
    }

    pub fn entries(&self) -> &[Transmutation] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
