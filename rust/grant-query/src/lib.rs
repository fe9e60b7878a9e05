//! Grant Query Engine
//!
//! A small embedded logic-query engine over `(of, the, is)` facts. Queries
//! are trees of [`Clause`]s built from [`Term`]s; evaluating them against a
//! [`Source`] yields every [`Bindings`] under which all clauses hold.
//!
//! ```
//! use grant_query::{Clause, Fact, MemoryStore, Term, Variable, query};
//!
//! let store: MemoryStore = [
//!     Fact::new("ucan-a", "ucan/issuer".parse().unwrap(), "did:key:alice"),
//!     Fact::new("ucan-a", "ucan/audience".parse().unwrap(), "did:key:bob"),
//! ]
//! .into_iter()
//! .collect();
//!
//! let audience = Variable::new("audience");
//! let results = query(
//!     &store,
//!     &[
//!         Clause::select(Term::var("ucan"), "ucan/issuer", Term::var("issuer")),
//!         Clause::glob(Term::var("issuer"), "did:key:*"),
//!         Clause::select(Term::var("ucan"), "ucan/audience", &audience),
//!     ],
//! )
//! .unwrap();
//!
//! assert_eq!(results.len(), 1);
//! assert_eq!(results[0].read::<String>(&audience).unwrap(), "did:key:bob");
//! ```

#![warn(missing_docs)]

mod bindings;
/// Clause types and builders.
pub mod clause;
/// Error types for the query engine.
pub mod error;
/// Clause interpreter.
pub mod evaluate;
/// Facts, attributes and store instructions.
pub mod fact;
/// Fact stores.
pub mod store;
/// Term types for pattern matching with variables and constants.
pub mod term;
/// Glob and SQL-like text matching.
pub mod text;
/// Values stored in facts and bound to variables.
pub mod value;

pub use bindings::Bindings;
pub use clause::{Clause, Comparison, Pattern};
pub use error::{QueryError, QueryResult, TypeError};
pub use evaluate::{evaluate, query};
pub use fact::{Attribute, Fact, Instruction};
pub use store::{Commit, MemoryStore, Source};
pub use term::{Term, Variable};
pub use value::{Value, ValueDataType};

pub use ipld_core::cid::Cid;
