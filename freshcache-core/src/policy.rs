//! Result type of a cache write decision.

/// Result of deciding whether a network response should be stored.
///
/// Both variants carry a value, so the caller keeps ownership of whatever the
/// decision was made about.
///
/// # Example
///
/// ```
/// use freshcache_core::Cacheability;
///
/// fn decide(status: u16, body: String) -> Cacheability<String, u16> {
///     if status == 200 {
///         Cacheability::Cacheable(body)
///     } else {
///         Cacheability::NonCacheable(status)
///     }
/// }
///
/// assert!(decide(200, "OK".to_string()).is_cacheable());
/// assert!(!decide(500, "boom".to_string()).is_cacheable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cacheability<C, N> {
    /// Value should be stored.
    Cacheable(C),
    /// Value should not be stored.
    NonCacheable(N),
}

impl<C, N> Cacheability<C, N> {
    /// Returns `true` for [`Cacheability::Cacheable`].
    pub fn is_cacheable(&self) -> bool {
        matches!(self, Cacheability::Cacheable(_))
    }

    /// Returns the cacheable value, if any.
    pub fn cacheable(self) -> Option<C> {
        match self {
            Cacheability::Cacheable(value) => Some(value),
            Cacheability::NonCacheable(_) => None,
        }
    }
}
