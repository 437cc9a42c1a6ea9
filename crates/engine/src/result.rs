//! The shared `Result` every action produces (C5's execute contract).

/// Outcome of one action's `execute` call for the current tick.
#[derive(Debug, Clone, Default)]
pub struct ActionResult {
    /// The action finished its work this tick. `false` means the
    /// scheduler should re-enter the same action next tick (`wait` not
    /// yet at its deadline, `url` with no matching request yet).
    pub complete: bool,
    pub success: bool,
    /// Whether this action transfers control to `new_txn`.
    pub advance: bool,
    pub new_txn: Option<String>,
    /// Launched work that continues after this tick (only `cbsplit`).
    pub can_background: bool,
}

impl ActionResult {
    pub fn done(success: bool) -> Self {
        Self { complete: true, success, ..Default::default() }
    }

    pub fn pending() -> Self {
        Self { complete: false, ..Default::default() }
    }

    pub fn advance_to(new_txn: impl Into<String>) -> Self {
        Self { complete: true, success: true, advance: true, new_txn: Some(new_txn.into()), can_background: false }
    }

    pub fn backgrounded() -> Self {
        Self { complete: true, success: true, can_background: true, ..Default::default() }
    }
}
