//! Foundation types for land-claim persistence.
//!
//! This crate provides the claim, corner, player and identifier types shared
//! by the store and the command-line tool.
//!
//! # Key Types
//!
//! - [`ClaimId`] -- Positive, monotonically allocated claim identifier
//! - [`PlayerId`] -- Opaque stable player identifier (UUID)
//! - [`Corner`] -- World-qualified block position with an exact text form
//! - [`Claim`] -- Top-level claim or subdivision with its permission lists
//! - [`PlayerRecord`] -- Per-player claim-block accounting
//! - [`ClaimIndex`] -- In-memory index the loaders populate

pub mod claim;
pub mod corner;
pub mod error;
pub mod identity;
pub mod index;
pub mod player;

pub use claim::{Claim, Permissions};
pub use corner::Corner;
pub use error::TypeError;
pub use identity::{ClaimId, PlayerId};
pub use index::ClaimIndex;
pub use player::{PlayerRecord, LAST_LOGIN_FORMAT};
