//! Land Registry - parcel store and council approval engine
//!
//! Citizens submit land-ownership claims (parcels); council members approve,
//! reject or dispute them; anyone can search the registry.
//!
//! ## Architecture
//!
//! ```text
//! caller (CLI / UI)
//!     ↓
//! ChainMirror (optional, best-effort on-chain copy)
//!     ↓
//! ParcelStore ── approval (transition table) ── search (criteria)
//!     ↓                 ↓
//! KeyValueStore      EventBus
//! (sled / memory)
//! ```
//!
//! ## Storage Layout
//!
//! ```text
//! ~/.local/share/land-registry/
//! ├── registry.sled/     # land_registry_parcels, land_registry_council, ...
//! └── config.toml        # Configuration
//! ```

pub mod approval;
pub mod chain;
pub mod config;
pub mod error;
pub mod events;
pub mod kv;
pub mod models;
pub mod reference;
pub mod search;
pub mod session;
pub mod store;

// Re-exports
pub use approval::{ApprovalPolicy, Decision};
pub use chain::{ChainAdapter, ChainMirror, ChainOutcome, Mirrored};
pub use config::Config;
pub use error::RegistryError;
pub use events::{EventBus, RegistryEvent};
pub use kv::{KeyValueStore, MemoryStore, SledStore};
pub use models::{Approval, CouncilMember, NewParcel, Parcel, ParcelStatus, ParcelUpdate, StatusCounts};
pub use reference::{CouncilRoster, DEFAULT_DISTRICTS};
pub use search::SearchCriteria;
pub use session::{CouncilCredentials, CouncilSession};
pub use store::{Clock, FixedClock, ParcelStore, SystemClock};
