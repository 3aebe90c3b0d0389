//! Per-call execution context

use crate::identity::Identity;

/// The context an operation runs in. Every mutating registry call receives
/// the caller identity through this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    caller: Identity,
}

impl CallContext {
    pub fn new(caller: Identity) -> Self {
        Self { caller }
    }

    /// The identity issuing the call
    pub fn caller(&self) -> Identity {
        self.caller
    }
}

impl From<Identity> for CallContext {
    fn from(caller: Identity) -> Self {
        Self::new(caller)
    }
}
