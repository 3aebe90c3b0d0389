//! Charity Registry
//!
//! An authorized registry of charity listings. Anyone can list a charity;
//! only its creator or the registry administrator can remove it.
//!
//! ## Features
//!
//! - **Monotonic Identifiers**: the n-th listing gets id n, ids are never reused
//! - **Tombstoning**: deleted listings are overwritten with the empty record,
//!   storage is never compacted
//! - **Authorization**: deletes are limited to the creator and the administrator
//! - **Events**: every listing publishes `CharityListed` to an [`EventSink`]
//! - **Durable Storage**: checksummed state files with all-or-nothing transactions
//!
//! ## Example
//!
//! ```
//! use charity_registry::{CallContext, CharityRegistry, Identity, NewCharity};
//!
//! let admin: Identity = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap();
//! let mut registry = CharityRegistry::detached(admin);
//! let ctx = CallContext::new(admin);
//!
//! let id = registry.create_charity(&ctx, NewCharity::new("hh", "dd", 12, 12));
//! assert_eq!(id, 1);
//!
//! registry.delete_charity(&ctx, id).unwrap();
//! assert!(registry.get_charity(id).is_empty());
//! ```

pub mod charity;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod identity;
pub mod registry;
pub mod shared;
pub mod store;

pub use charity::{Charity, NewCharity};
pub use config::{OutputFormat, RegistryConfig};
pub use context::CallContext;
pub use error::{RegistryError, Result};
pub use event::{
    EventRecord, EventSink, FanoutSink, JsonLinesSink, MemorySink, NullSink, RegistryEvent,
    TracingSink,
};
pub use identity::Identity;
pub use registry::{CharityRegistry, RegistryState};
pub use shared::SharedRegistry;
pub use store::RegistryStore;
