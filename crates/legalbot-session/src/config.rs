/// What happens to a second send on a session whose previous request is
/// still outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InFlightPolicy {
    /// Fail immediately with `SessionError::Busy`; nothing is appended.
    #[default]
    Reject,
    /// Wait for the outstanding request, then run.
    Queue,
}

/// Whether changing a detail value clears an earlier verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditPolicy {
    /// A changed value must be re-confirmed before download.
    #[default]
    ResetOnEdit,
    /// Verification survives edits.
    KeepOnEdit,
}

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub in_flight: InFlightPolicy,
    pub edit_policy: EditPolicy,
    /// Request detail extraction as part of the drafting → reviewing step.
    pub extract_on_draft: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            in_flight: InFlightPolicy::default(),
            edit_policy: EditPolicy::default(),
            extract_on_draft: true,
        }
    }
}
