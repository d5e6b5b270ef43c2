pub mod random;
pub mod seq;

pub use random::RandomGenerator;
pub use seq::SeqGenerator;

use shortly_core::ShortId;

/// Trait for generating short ids.
///
/// Implementations are pure generators that don't interact with
/// storage and make no uniqueness guarantee on their own. The
/// relational backend detects collisions through its insert-on-conflict
/// path; the in-memory and file backends do not re-check before
/// writing, so a colliding id overwrites the previous record there.
/// That is an accepted limitation of the design, not a contract of
/// this trait.
pub trait IdGenerator: Send + Sync + 'static {
    /// Generates the next short id.
    fn generate(&self) -> ShortId;
}
