use tokio::time::Instant;

/// A stored value together with the instant it stops being visible
#[derive(Debug, Clone)]
pub(crate) struct Entry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> Entry<V> {
    /// Creates a new entry with the given value and expiration time
    pub(crate) fn new(value: V, expires_at: Instant) -> Self {
        Self { value, expires_at }
    }

    pub(crate) fn value(&self) -> &V {
        &self.value
    }

    /// Checks if this entry has expired at `now`
    ///
    /// The deadline itself counts as expired.
    #[inline]
    pub(crate) fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}
