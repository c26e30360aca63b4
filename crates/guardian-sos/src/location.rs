//! Best-effort position lookup for alert messages.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{FixSource, LocationFix};

/// Port over the device location provider
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Whether location permission has been granted
    fn has_permission(&self) -> bool;

    /// Last known fix, if the provider holds one
    async fn cached_fix(&self) -> Option<LocationFix>;

    /// Request a single fresh fix.
    ///
    /// The returned future is dropped on timeout, which must cancel the
    /// underlying request.
    async fn request_fresh_fix(&self) -> Option<LocationFix>;
}

/// Cache-then-fresh location lookup bounded by a timeout.
///
/// Absence of a fix is a normal outcome: every failure mode resolves to
/// `None`.
#[derive(Clone)]
pub struct LocationResolver {
    provider: Arc<dyn LocationProvider>,
}

impl LocationResolver {
    /// Create a resolver over `provider`
    pub fn new(provider: Arc<dyn LocationProvider>) -> Self {
        Self { provider }
    }

    /// Resolve the current position within `timeout`.
    ///
    /// The budget covers both stages; a provider that stalls on its cache
    /// lookup is bounded the same as one that never answers a fresh request.
    pub async fn resolve(&self, timeout: Duration) -> Option<LocationFix> {
        if !self.provider.has_permission() {
            tracing::warn!("Location permission not granted");
            return None;
        }

        match tokio::time::timeout(timeout, self.lookup()).await {
            Ok(fix) => fix,
            Err(_) => {
                tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Location request timed out");
                None
            }
        }
    }

    async fn lookup(&self) -> Option<LocationFix> {
        if let Some(mut fix) = self.provider.cached_fix().await {
            fix.source = FixSource::Cached;
            tracing::debug!(accuracy = fix.accuracy, "Using cached location fix");
            return Some(fix);
        }

        match self.provider.request_fresh_fix().await {
            Some(mut fix) => {
                fix.source = FixSource::Fresh;
                tracing::debug!(accuracy = fix.accuracy, "Obtained fresh location fix");
                Some(fix)
            }
            None => {
                tracing::warn!("Location provider returned no fix");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::StaticLocationProvider;

    #[tokio::test]
    async fn test_cached_fix_preferred() {
        let provider = StaticLocationProvider::new()
            .with_cached(LocationFix::new(1.0, 2.0, 5.0, FixSource::Fresh))
            .with_fresh(LocationFix::new(3.0, 4.0, 5.0, FixSource::Fresh), Duration::ZERO);
        let resolver = LocationResolver::new(Arc::new(provider));

        let fix = resolver.resolve(Duration::from_secs(5)).await.unwrap();
        assert_eq!(fix.latitude, 1.0);
        assert_eq!(fix.source, FixSource::Cached);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_fix_within_timeout() {
        let provider = StaticLocationProvider::new()
            .with_fresh(LocationFix::new(3.0, 4.0, 5.0, FixSource::Cached), Duration::from_secs(2));
        let resolver = LocationResolver::new(Arc::new(provider));

        let fix = resolver.resolve(Duration::from_secs(5)).await.unwrap();
        assert_eq!(fix.longitude, 4.0);
        assert_eq!(fix.source, FixSource::Fresh);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_yields_none() {
        let provider = StaticLocationProvider::new()
            .with_fresh(LocationFix::new(3.0, 4.0, 5.0, FixSource::Fresh), Duration::from_secs(10));
        let resolver = LocationResolver::new(Arc::new(provider));

        let started = tokio::time::Instant::now();
        assert!(resolver.resolve(Duration::from_millis(5000)).await.is_none());
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(5000));
        assert!(elapsed < Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_cache_bounded_by_timeout() {
        let provider = StaticLocationProvider::new()
            .with_fresh(LocationFix::new(3.0, 4.0, 5.0, FixSource::Fresh), Duration::ZERO)
            .stalled_cache();
        let resolver = LocationResolver::new(Arc::new(provider));

        let started = tokio::time::Instant::now();
        assert!(resolver.resolve(Duration::from_secs(5)).await.is_none());
        assert!(started.elapsed() < Duration::from_secs(6));
    }

    #[tokio::test]
    async fn test_no_permission_yields_none() {
        let provider = StaticLocationProvider::new()
            .with_cached(LocationFix::new(1.0, 2.0, 5.0, FixSource::Cached))
            .without_permission();
        let resolver = LocationResolver::new(Arc::new(provider));
        assert!(resolver.resolve(Duration::from_secs(1)).await.is_none());
    }
}
