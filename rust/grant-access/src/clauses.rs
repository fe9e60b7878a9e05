//! Composable clauses describing what counts as proof.
//!
//! Every helper takes the [`Term`](grant_query::Term)s it constrains and
//! returns a [`Clause`](grant_query::Clause). Variables a helper needs
//! internally are created with [`Variable::unique`](grant_query::Variable::unique)
//! so they never collide with the caller's.

pub mod attestation;
pub mod capability;
pub mod delegation;
pub mod text;

pub use text::TextConstraint;
