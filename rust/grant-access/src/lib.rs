//! Grant Access
//!
//! Offline capability authorization over a bundle of delegations. The
//! delegations an agent holds are flattened into facts in a [`Database`], and
//! the rules in [`authorization`] decide, at an explicit point in time, which
//! of them prove that a principal may exercise an ability on a subject.
//!
//! ```
//! use grant_access::{Can, Capability, Database, Delegation, authorization};
//!
//! # fn main() -> Result<(), grant_access::AccessError> {
//! let grant = Delegation::builder("did:key:space", "did:key:agent")
//!     .capability(Capability::new("did:key:space", "store/*"))
//!     .build()?;
//! let database = Database::from_proofs([grant.clone()])?;
//!
//! let can = Can::from([("store/add".to_string(), vec![])]);
//! let found = authorization::get(&database, "did:key:agent", "did:key:space", &can, 0)?;
//! assert_eq!(found.proofs, vec![grant]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod account;
pub mod authorization;
mod cid;
pub mod clauses;
mod database;
pub mod delegation;
mod error;
mod facts;
pub mod login;
pub mod revocation;
mod settings;
pub mod space;

pub use authorization::{Authorization, Can};
pub use cid::{to_dagcbor_cid, to_entity_cid};
pub use clauses::TextConstraint;
pub use database::{Archive, ArchivedEntry, Database, Entry};
pub use delegation::{Block, Capability, Delegation, DelegationBuilder, Proof};
pub use error::AccessError;
pub use facts::facts;
pub use revocation::{Resolve, Revocations};
pub use settings::Settings;
