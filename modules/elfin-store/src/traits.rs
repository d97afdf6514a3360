//! Core traits for the state container.

/// Actions carry a type string. The container only reads it for logging.
pub trait ActionLike {
    /// The `type` discriminator of this action.
    fn action_type(&self) -> &str;
}

impl<T: ActionLike + ?Sized> ActionLike for &T {
    fn action_type(&self) -> &str {
        (**self).action_type()
    }
}

/// What a reducer did with the fragment it was lent.
#[derive(Debug, Clone, PartialEq)]
pub enum Reduction<F> {
    /// The fragment is unchanged; the slot is not written back.
    Keep,
    /// The slot is replaced with this fragment.
    Replace(F),
}

impl<F> Reduction<F> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Reduction::Keep)
    }
}

impl<F> From<F> for Reduction<F> {
    fn from(fragment: F) -> Self {
        Reduction::Replace(fragment)
    }
}

/// Pure per-slot updates. No I/O, no side effects.
///
/// The fragment is borrowed for the duration of the call only. Return
/// `Reduction::Keep` to leave the slot as it is. An error aborts the rest of
/// the dispatch it happened in.
pub trait Reducer<A, F>: Send + Sync {
    fn reduce(&self, fragment: &F, action: &A) -> anyhow::Result<Reduction<F>>;
}

impl<A, F, T> Reducer<A, F> for T
where
    T: Fn(&F, &A) -> anyhow::Result<Reduction<F>> + Send + Sync,
{
    fn reduce(&self, fragment: &F, action: &A) -> anyhow::Result<Reduction<F>> {
        self(fragment, action)
    }
}
