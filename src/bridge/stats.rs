/// Per-process message counters.
///
/// Owned by the controller and mutated only from its event loop, so plain
/// integers are enough. Reset only by restarting the process.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub received: u64,
    pub valid: u64,
    pub invalid: u64,
    pub saved: u64,
    pub errors: u64,
}

impl SessionStats {
    /// Log the counters as one structured line.
    pub fn report(&self) {
        tracing::info!(
            received = self.received,
            valid = self.valid,
            invalid = self.invalid,
            saved = self.saved,
            errors = self.errors,
            "Session statistics"
        );
    }
}
