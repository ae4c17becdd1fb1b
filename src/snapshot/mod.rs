// Snapshot history for stepping through a finished run

use crate::interpreter::{Interpreter, ScriptError};
use crate::memory::{MemoryBlock, MemoryEvent, MemoryManager};
use std::mem::size_of;
use std::ops::ControlFlow;
use thiserror::Error;

/// Memory state captured before one line ran (or at the end of the run)
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub memory: MemoryManager,
    /// Line about to run; `None` for the state after the last line
    pub line: Option<usize>,
    /// Raw source text of that line
    pub text: String,
}

impl Snapshot {
    /// Estimate the memory usage of this snapshot in bytes
    pub fn estimated_size(&self) -> usize {
        let blocks: usize = self
            .memory
            .blocks()
            .iter()
            .map(|block| size_of::<MemoryBlock>() + block.name.len())
            .sum();
        let events: usize = self
            .memory
            .events()
            .iter()
            .map(|event| size_of::<MemoryEvent>() + event.description.len())
            .sum();
        size_of::<Self>() + blocks + events + self.text.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("snapshot memory limit exceeded: {current} + {size} > {limit}")]
    LimitExceeded {
        current: usize,
        size: usize,
        limit: usize,
    },

    #[error("already at the {0} of the history")]
    OutOfRange(&'static str),
}

/// Execution history with a cursor for moving backward and forward
#[derive(Debug)]
pub struct SnapshotManager {
    snapshots: Vec<Snapshot>,
    position: usize,
    max_memory: usize,
    current_memory: usize,
}

impl SnapshotManager {
    pub fn new(max_memory: usize) -> Self {
        SnapshotManager {
            snapshots: Vec::new(),
            position: 0,
            max_memory,
            current_memory: 0,
        }
    }

    /// Add a snapshot to history
    pub fn push(&mut self, snapshot: Snapshot) -> Result<(), SnapshotError> {
        let size = snapshot.estimated_size();
        if self.current_memory + size > self.max_memory {
            return Err(SnapshotError::LimitExceeded {
                current: self.current_memory,
                size,
                limit: self.max_memory,
            });
        }

        self.current_memory += size;
        self.snapshots.push(snapshot);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    /// Snapshot under the cursor
    pub fn current(&self) -> Option<&Snapshot> {
        self.snapshots.get(self.position)
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn step_forward(&mut self) -> Result<(), SnapshotError> {
        if self.position + 1 >= self.snapshots.len() {
            return Err(SnapshotError::OutOfRange("end"));
        }
        self.position += 1;
        Ok(())
    }

    pub fn step_backward(&mut self) -> Result<(), SnapshotError> {
        if self.position == 0 {
            return Err(SnapshotError::OutOfRange("start"));
        }
        self.position -= 1;
        Ok(())
    }

    pub fn rewind_to_start(&mut self) {
        self.position = 0;
    }

    pub fn jump_to_end(&mut self) {
        self.position = self.snapshots.len().saturating_sub(1);
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Get current memory usage
    pub fn memory_usage(&self) -> usize {
        self.current_memory
    }

    pub fn memory_limit(&self) -> usize {
        self.max_memory
    }
}

/// Outcome of recording a script
#[derive(Debug)]
pub struct Recording {
    pub history: SnapshotManager,
    /// The error that stopped the script, if any
    pub error: Option<ScriptError>,
    /// Recording stopped early because the snapshot limit was reached
    pub truncated: bool,
}

/// Run `script` stepwise, keeping a snapshot before every line and one of the final state
pub fn record(interpreter: &mut Interpreter, script: &str, max_memory: usize) -> Recording {
    let mut history = SnapshotManager::new(max_memory);
    let mut truncated = false;

    let result = interpreter.execute_stepwise(script, |step| {
        let snapshot = Snapshot {
            memory: step.memory.clone(),
            line: Some(step.line_number),
            text: step.text.to_string(),
        };
        match history.push(snapshot) {
            Ok(()) => ControlFlow::Continue(()),
            Err(err) => {
                log::warn!("{}", err);
                truncated = true;
                ControlFlow::Break(())
            }
        }
    });

    let error = result.err();
    let text = match &error {
        Some(err) => err.to_string(),
        None if truncated => "recording stopped: snapshot limit reached".to_string(),
        None => "end of program".to_string(),
    };
    let last = Snapshot {
        memory: interpreter.memory().clone(),
        line: error.as_ref().map(ScriptError::line),
        text,
    };
    if let Err(err) = history.push(last) {
        log::warn!("final state not recorded: {}", err);
        truncated = true;
    }

    Recording {
        history,
        error,
        truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = "int main() {\n    int* p = new int;\n    delete p;\n}\n";

    #[test]
    fn test_record_keeps_one_snapshot_per_line_plus_end() {
        let mut interpreter = Interpreter::new();
        let recording = record(&mut interpreter, SCRIPT, usize::MAX);

        assert!(recording.error.is_none());
        assert!(!recording.truncated);
        assert_eq!(recording.history.len(), 5);
        assert_eq!(recording.history.get(1).and_then(|s| s.line), Some(2));
        let end = recording.history.get(4).unwrap();
        assert_eq!(end.line, None);
        assert_eq!(end.memory.live_blocks().count(), 0);
    }

    #[test]
    fn test_record_stops_at_error() {
        let mut interpreter = Interpreter::new();
        let recording = record(&mut interpreter, "int main() {\n  delete p;\n}\n", usize::MAX);

        let error = recording.error.expect("script should fail");
        assert_eq!(error.line(), 2);
        let last = recording.history.get(recording.history.len() - 1).unwrap();
        assert_eq!(last.line, Some(2));
        assert!(last.text.contains("undefined variable"));
    }

    #[test]
    fn test_limit_truncates_recording() {
        let mut interpreter = Interpreter::new();
        let recording = record(&mut interpreter, SCRIPT, 1);
        assert!(recording.truncated);
        assert!(recording.history.is_empty());
    }

    #[test]
    fn test_cursor_navigation() {
        let mut interpreter = Interpreter::new();
        let mut history = record(&mut interpreter, SCRIPT, usize::MAX).history;

        assert_eq!(history.position(), 0);
        assert!(history.step_backward().is_err());
        history.step_forward().unwrap();
        assert_eq!(history.current().and_then(|s| s.line), Some(2));
        history.jump_to_end();
        assert!(history.step_forward().is_err());
        history.rewind_to_start();
        assert_eq!(history.position(), 0);
    }
}
