use crate::{MagneticZone, Seconds, TimelineError, Track};

const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Arrangement state restored by undo/redo. Playhead and zoom are view
/// state and are not part of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub duration: Seconds,
    pub tracks: Vec<Track>,
    pub zones: Vec<MagneticZone>,
}

#[derive(Debug, Clone)]
pub struct EditHistory {
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
    limit: usize,
}

impl Default for EditHistory {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl EditHistory {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Remember the state from before a successful edit.
    pub fn record(&mut self, before: Snapshot) {
        self.undo_stack.push(before);
        if self.undo_stack.len() > self.limit {
            let overflow = self.undo_stack.len() - self.limit;
            self.undo_stack.drain(0..overflow);
        }
        self.redo_stack.clear();
    }

    pub fn undo(&mut self, current: Snapshot) -> Result<Snapshot, TimelineError> {
        let previous = self
            .undo_stack
            .pop()
            .ok_or(TimelineError::HistoryEmpty("undo stack"))?;
        self.redo_stack.push(current);
        Ok(previous)
    }

    pub fn redo(&mut self, current: Snapshot) -> Result<Snapshot, TimelineError> {
        let next = self
            .redo_stack
            .pop()
            .ok_or(TimelineError::HistoryEmpty("redo stack"))?;
        self.undo_stack.push(current);
        Ok(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
