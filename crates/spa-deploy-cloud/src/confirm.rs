//! Operator confirmation

/// Asks the operator to approve an action
///
/// The orchestrator never reads the terminal itself; the CLI supplies a
/// prompting implementation and tests supply [`AutoConfirm`].
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Answers every prompt with a fixed value
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        tracing::debug!("Auto-answering '{}' with {}", prompt, self.0);
        self.0
    }
}
