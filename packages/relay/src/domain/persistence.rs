//! Hook through which state mutations reach the persistence scheduler.

/// Marks room state as needing a snapshot write.
///
/// Implementations must not block: callers sit on the message path.
#[cfg_attr(test, mockall::automock)]
pub trait PersistenceTrigger: Send + Sync {
    fn mark_dirty(&self);
}
