pub const MAX_HISTORY: usize = 20;

/// Bounded undo/redo stacks of whole-state snapshots.
///
/// The top of `undo` is always the current state, so the stack never drops below one entry
/// once the first snapshot (the genesis state) is pushed.
#[derive(Clone, Debug)]
pub struct History<S> {
    undo: Vec<S>,
    redo: Vec<S>,
    capacity: usize,
}

impl<S: Clone> History<S> {
    pub fn new() -> Self {
        Self::with_capacity(MAX_HISTORY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        History {
            undo: Vec::new(),
            redo: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Record a new current state; the oldest entry is evicted past capacity.
    pub fn push(&mut self, state: S) {
        if self.undo.len() >= self.capacity {
            self.undo.remove(0);
        }
        self.undo.push(state);
        self.redo.clear();
    }

    /// Step back; returns the state to restore, or `None` at the genesis state.
    pub fn undo(&mut self) -> Option<S> {
        if !self.can_undo() {
            return None;
        }
        let current = self.undo.pop()?;
        self.redo.push(current);
        self.undo.last().cloned()
    }

    pub fn redo(&mut self) -> Option<S> {
        let state = self.redo.pop()?;
        self.undo.push(state.clone());
        Some(state)
    }

    /// Drop all history and start over from `genesis`.
    pub fn reset(&mut self, genesis: S) {
        self.undo.clear();
        self.redo.clear();
        self.undo.push(genesis);
    }

    pub fn can_undo(&self) -> bool {
        self.undo.len() > 1
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<S: Clone> Default for History<S> {
    fn default() -> Self {
        Self::new()
    }
}
