//! Charity Registry
//!
//! The registry state machine: identifier assignment, record storage,
//! delete authorization and tombstoning.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::charity::{Charity, NewCharity};
use crate::context::CallContext;
use crate::error::{RegistryError, Result};
use crate::event::{EventSink, NullSink, RegistryEvent};
use crate::identity::Identity;

/// The persisted registry state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryState {
    /// Number of charities ever created
    pub counter: u64,
    /// Slot `i` holds charity `i`; slot 0 is always the empty record
    pub records: Vec<Charity>,
    /// Identity allowed to delete any charity
    pub administrator: Identity,
}

impl RegistryState {
    /// Fresh state holding only the sentinel
    pub fn new(administrator: Identity) -> Self {
        Self {
            counter: 0,
            records: vec![Charity::EMPTY],
            administrator,
        }
    }

    /// Number of slots holding a live (not deleted) charity
    pub fn active_count(&self) -> usize {
        self.records.iter().filter(|c| !c.is_empty()).count()
    }

    /// Number of created charities that have since been deleted
    pub fn deleted_count(&self) -> u64 {
        self.counter.saturating_sub(self.active_count() as u64)
    }

    /// Check the structural invariants of a loaded state
    pub fn is_consistent(&self) -> bool {
        let slots_match = u64::try_from(self.records.len())
            .map(|len| Some(len) == self.counter.checked_add(1))
            .unwrap_or(false);

        slots_match
            && self.records[0].is_empty()
            && self
                .records
                .iter()
                .enumerate()
                .skip(1)
                .all(|(i, c)| c.is_empty() || c.id == i as u64)
    }
}

/// The charity registry
pub struct CharityRegistry<S: EventSink = NullSink> {
    state: RegistryState,
    sink: S,
}

impl CharityRegistry<NullSink> {
    /// Create a registry whose events are discarded
    pub fn detached(administrator: Identity) -> Self {
        Self::new(administrator, NullSink)
    }
}

impl<S: EventSink> CharityRegistry<S> {
    /// Create an empty registry administered by `administrator`
    pub fn new(administrator: Identity, sink: S) -> Self {
        Self::from_state(RegistryState::new(administrator), sink)
    }

    /// Resume a registry from persisted state
    pub fn from_state(state: RegistryState, sink: S) -> Self {
        Self { state, sink }
    }

    pub fn state(&self) -> &RegistryState {
        &self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Split the registry back into its state and sink
    pub fn into_parts(self) -> (RegistryState, S) {
        (self.state, self.sink)
    }

    /// List a new charity, returning its identifier
    ///
    /// Emits [`RegistryEvent::CharityListed`] with the new id.
    pub fn create_charity(&mut self, ctx: &CallContext, listing: NewCharity) -> u64 {
        self.state.counter += 1;
        let id = self.state.counter;

        let charity = listing.into_charity(id, ctx.caller());
        self.state.records.push(charity);

        info!(id, creator = %ctx.caller(), "charity listed");
        self.sink.emit(&RegistryEvent::CharityListed { id });

        id
    }

    /// Get the charity stored under `id`
    ///
    /// Returns the empty record for deleted or unassigned ids.
    pub fn get_charity(&self, id: u64) -> Charity {
        self.slot(id).cloned().unwrap_or_default()
    }

    /// Snapshot of every slot from 0 to the counter, in id order
    pub fn get_charities(&self) -> Vec<Charity> {
        self.state.records.clone()
    }

    pub fn get_counter(&self) -> u64 {
        self.state.counter
    }

    /// The administrator fixed at registry creation
    pub fn get_contract_owner(&self) -> Identity {
        self.state.administrator
    }

    /// Delete the charity stored under `id`
    ///
    /// The slot must hold a live record, and the caller must be its creator
    /// or the administrator. On success the slot is overwritten with the
    /// empty record; the id is never reassigned.
    pub fn delete_charity(&mut self, ctx: &CallContext, id: u64) -> Result<()> {
        let caller = ctx.caller();

        // The empty check must run first: an empty slot's creator is the
        // zero identity and would otherwise surface as NotAllowedToDelete.
        let creator = match self.slot(id) {
            Some(charity) if !charity.is_empty() => charity.creator,
            _ => {
                warn!(id, %caller, "delete rejected: already deleted");
                return Err(RegistryError::AlreadyDeleted { id });
            }
        };

        if caller != creator && caller != self.state.administrator {
            warn!(id, %caller, "delete rejected: not creator or administrator");
            return Err(RegistryError::NotAllowedToDelete { id, caller });
        }

        if let Some(slot) = self.slot_mut(id) {
            *slot = Charity::EMPTY;
        }
        info!(id, %caller, "charity deleted");

        Ok(())
    }

    fn slot(&self, id: u64) -> Option<&Charity> {
        let index = usize::try_from(id).ok()?;
        let found = self.state.records.get(index);
        if found.is_none() {
            debug!(id, counter = self.state.counter, "lookup outside populated range");
        }
        found
    }

    fn slot_mut(&mut self, id: u64) -> Option<&mut Charity> {
        let index = usize::try_from(id).ok()?;
        self.state.records.get_mut(index)
    }
}
