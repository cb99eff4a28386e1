//! Versioned flat-file persistence for land claims.
//!
//! Claims, player records, group bonuses and the claim ID counter are kept as
//! one small file per record under a data root (see [`layout`]). The claim
//! format is versioned by a marker file; legacy line-oriented stores are
//! upgraded in place to structured documents the first time they are loaded.
//!
//! # Storage Backends
//!
//! All backends implement the [`DataStore`] trait:
//!
//! - [`FlatFileDataStore`] -- directory-of-files store with legacy upgrade and
//!   one-time migration into another backend
//! - [`InMemoryDataStore`] -- map-based store for tests and as a migration target
//!
//! # Loaders
//!
//! [`loader::LOADERS`] maps schema versions to [`ClaimLoader`]s:
//! [`LegacyLoader`] for versions 0 and 1, [`DocumentLoader`] from version 2.
//!
//! # Failure Policy
//!
//! 1. Only opening a store and listing its directories return errors.
//! 2. A bad record is logged and skipped, demoted, or deleted; loading goes on.
//! 3. Writes are fire-and-forget: failures are logged, never returned.
//! 4. Player reads retry a bounded number of times, then return what they have.

pub mod allocator;
pub mod capability;
pub mod config;
pub mod document;
pub mod error;
pub mod flatfile;
mod groups;
pub mod layout;
pub mod legacy;
pub mod loader;
pub mod memory;
pub mod migrate;
mod players;
pub mod schema;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use allocator::ClaimIdAllocator;
pub use capability::{NameResolver, StaticNameResolver, StaticWorlds, WorldRegistry};
pub use config::StoreConfig;
pub use document::{ClaimDocument, DocumentLoader};
pub use error::{StoreError, StoreResult};
pub use flatfile::{FlatFileDataStore, LoadReport, LoadedData};
pub use layout::StoreLayout;
pub use legacy::LegacyLoader;
pub use loader::{loader_for, ClaimLoader, LoadContext, LoadOutcome};
pub use memory::InMemoryDataStore;
pub use migrate::MigrationReport;
pub use schema::LATEST_SCHEMA_VERSION;
pub use traits::DataStore;
