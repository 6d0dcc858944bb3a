//! [`Assignment`] read model definitions.

#[cfg(doc)]
use crate::domain::{assignment::Step, Assignment};

/// Wrapper around an [`Assignment`] indicating that it reached
/// [`Step::Completed`].
#[derive(Clone, Copy, Debug)]
pub struct Completed<T>(pub T);

/// Wrapper around an [`Assignment`] indicating that it hasn't reached a
/// terminal [`Step`] and hasn't advanced for a while.
#[derive(Clone, Copy, Debug)]
pub struct Stale<T>(pub T);
