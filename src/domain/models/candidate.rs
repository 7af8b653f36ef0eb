use std::hash::Hash;

/// A value produced by a convergence tool that the engine can deduplicate.
///
/// Two candidates with equal [`semantic_key`](Candidate::semantic_key)s are the
/// same candidate even if incidental fields (such as an explanation) differ.
pub trait Candidate: Clone + Send + Sync {
    type Key: Eq + Hash + Send;

    fn semantic_key(&self) -> Self::Key;

    /// One-line description used in logs and feedback.
    fn summary(&self) -> String;
}
