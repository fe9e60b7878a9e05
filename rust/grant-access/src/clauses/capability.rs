//! Capability shape.

use grant_query::{Clause, Term};

/// `capability` applies to `subject` and carries the stored ability `can`
pub fn matches(capability: &Term, subject: &Term, can: &Term) -> Clause {
    Clause::select(capability, "capability/with", subject)
        .and(Clause::select(capability, "capability/can", can))
}

/// The `stored` ability provides the `requested` one.
///
/// A requested constant such as `store/add` has to be matched by the stored
/// ability read as a glob (`store/*`, `*`). Any other requested term is bound
/// to the stored ability, which is how "every ability" queries learn what was
/// actually delegated.
pub fn provides(stored: &Term, requested: &Term) -> Clause {
    match requested {
        Term::Constant(_) => Clause::glob(requested, stored),
        _ => Clause::is(requested, stored),
    }
}
