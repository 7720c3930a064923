use uuid::Uuid;

/// Immutable per-pass parameters handed to every reconciler call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassContext {
    pub pass_id: Uuid,
    /// Whether disruptive updates of running workloads may be computed this pass.
    pub updates_allowed: bool,
}

impl PassContext {
    pub fn new(updates_allowed: bool) -> Self {
        Self { pass_id: Uuid::new_v4(), updates_allowed }
    }
}

/// Result of observing the current state of one kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Observed<T> {
    State(T),
    /// The pass must stop: nothing after this reconciler may run.
    Cancelled,
}

/// What the ordered reconciler chain does after one reconciler finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Proceed,
    Cancelled,
}
