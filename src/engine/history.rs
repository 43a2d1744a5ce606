//! Linear undo history.

/// Stack of snapshots whose bottom entry can never be removed.
///
/// There is no redo: undone entries are dropped.
#[derive(Clone, Debug)]
pub struct HistoryStack<T> {
    entries: Vec<T>,
}

impl<T> HistoryStack<T> {
    /// Start a history from the initial (captured) state.
    pub fn new(initial: T) -> Self {
        Self {
            entries: vec![initial],
        }
    }

    pub fn commit(&mut self, snapshot: T) {
        self.entries.push(snapshot);
    }

    /// Drop the newest snapshot and return the new top.
    ///
    /// With only the initial snapshot left this is a no-op returning it.
    pub fn undo(&mut self) -> &T {
        if self.entries.len() > 1 {
            self.entries.pop();
        }
        self.top()
    }

    pub fn top(&self) -> &T {
        // Never empty: undo keeps the initial entry
        &self.entries[self.entries.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_at_origin(&self) -> bool {
        self.entries.len() == 1
    }
}
