//! Last-known-location tracking.
//!
//! The tracker subscribes once (after the location permission is confirmed)
//! and overwrites its single "last known" value on every update. There is no
//! retry or backoff: cadence is whatever the platform provider delivers.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::permissions::{Permission, PermissionChecker};

/// A single location fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    /// Monotonic milliseconds at which the fix arrived.
    #[serde(default)]
    pub recorded_at_ms: u64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64, recorded_at_ms: u64) -> Self {
        Self {
            latitude,
            longitude,
            recorded_at_ms,
        }
    }

    /// Map link for this fix, coordinates printed with at least one decimal.
    pub fn map_url(&self) -> String {
        format!(
            "https://maps.google.com/?q={},{}",
            format_coordinate(self.latitude),
            format_coordinate(self.longitude)
        )
    }
}

/// `37.0` stays `37.0` rather than collapsing to `37`.
fn format_coordinate(value: f64) -> String {
    let text = value.to_string();
    if !value.is_finite() || text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationPriority {
    HighAccuracy,
    Balanced,
    LowPower,
}

/// Subscription parameters handed to the platform provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationRequest {
    pub interval_ms: u64,
    pub fastest_interval_ms: u64,
    pub priority: LocationPriority,
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self {
            interval_ms: 10_000,
            fastest_interval_ms: 5_000,
            priority: LocationPriority::HighAccuracy,
        }
    }
}

/// Platform location source. Updates are delivered back through
/// [`LocationTracker::on_update`] on the host's execution context.
pub trait LocationProvider {
    fn request_updates(&mut self, request: &LocationRequest) -> Result<()>;
}

/// Provider used when the host has no platform location source.
#[derive(Debug, Default)]
pub struct NoLocationProvider;

impl LocationProvider for NoLocationProvider {
    fn request_updates(&mut self, _request: &LocationRequest) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LocationTracker {
    request: LocationRequest,
    stale_after_ms: u64,
    subscribed: bool,
    last: Option<Location>,
}

impl LocationTracker {
    pub fn new(request: LocationRequest, stale_after_ms: u64) -> Self {
        Self {
            request,
            stale_after_ms,
            subscribed: false,
            last: None,
        }
    }

    /// Subscribe to updates if fine location is granted.
    ///
    /// Returns `Ok(false)` when the permission is missing: the tracker never
    /// starts and every later alert reports the location as unavailable.
    pub fn start<C, L>(&mut self, permissions: &C, provider: &mut L) -> Result<bool>
    where
        C: PermissionChecker + ?Sized,
        L: LocationProvider + ?Sized,
    {
        if self.subscribed {
            return Ok(true);
        }
        if !permissions.is_granted(Permission::FineLocation) {
            tracing::warn!("location permission missing, tracker not started");
            return Ok(false);
        }
        provider.request_updates(&self.request)?;
        self.subscribed = true;
        tracing::debug!(
            interval_ms = self.request.interval_ms,
            fastest_ms = self.request.fastest_interval_ms,
            "location updates requested"
        );
        Ok(true)
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Overwrite the last known value. Ignored until subscribed.
    pub fn on_update(&mut self, fix: Location) -> bool {
        if !self.subscribed {
            return false;
        }
        self.last = Some(fix);
        true
    }

    pub fn last_known(&self) -> Option<Location> {
        self.last
    }

    /// True when a fix exists but no update arrived within the stale window.
    pub fn is_stale(&self, now_ms: u64) -> bool {
        self.last
            .map(|l| now_ms.saturating_sub(l.recorded_at_ms) > self.stale_after_ms)
            .unwrap_or(false)
    }

    pub fn request(&self) -> &LocationRequest {
        &self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::GrantedPermissions;

    #[derive(Default)]
    struct CountingProvider {
        requests: usize,
    }

    impl LocationProvider for CountingProvider {
        fn request_updates(&mut self, _request: &LocationRequest) -> Result<()> {
            self.requests += 1;
            Ok(())
        }
    }

    #[test]
    fn map_url_keeps_decimal() {
        let loc = Location::new(37.0, -122.0, 0);
        assert_eq!(loc.map_url(), "https://maps.google.com/?q=37.0,-122.0");
        let loc = Location::new(51.5072, -0.1276, 0);
        assert_eq!(loc.map_url(), "https://maps.google.com/?q=51.5072,-0.1276");
    }

    #[test]
    fn tracker_inert_without_permission() {
        let mut tracker = LocationTracker::new(LocationRequest::default(), 60_000);
        let mut provider = CountingProvider::default();
        let started = tracker
            .start(&GrantedPermissions::new(34), &mut provider)
            .unwrap();
        assert!(!started);
        assert_eq!(provider.requests, 0);
        assert!(!tracker.on_update(Location::new(1.0, 2.0, 10)));
        assert!(tracker.last_known().is_none());
    }

    #[test]
    fn updates_overwrite_last_known() {
        let mut tracker = LocationTracker::new(LocationRequest::default(), 60_000);
        let mut provider = CountingProvider::default();
        assert!(tracker.start(&GrantedPermissions::all(), &mut provider).unwrap());
        assert!(tracker.start(&GrantedPermissions::all(), &mut provider).unwrap());
        assert_eq!(provider.requests, 1);

        tracker.on_update(Location::new(1.0, 2.0, 10));
        tracker.on_update(Location::new(3.0, 4.0, 20));
        assert_eq!(tracker.last_known(), Some(Location::new(3.0, 4.0, 20)));
    }

    #[test]
    fn staleness_window() {
        let mut tracker = LocationTracker::new(LocationRequest::default(), 1_000);
        tracker.start(&GrantedPermissions::all(), &mut NoLocationProvider).unwrap();
        assert!(!tracker.is_stale(5_000));
        tracker.on_update(Location::new(1.0, 2.0, 1_000));
        assert!(!tracker.is_stale(2_000));
        assert!(tracker.is_stale(2_001));
    }

    #[test]
    fn default_request_matches_platform_cadence() {
        let req = LocationRequest::default();
        assert_eq!(req.interval_ms, 10_000);
        assert_eq!(req.fastest_interval_ms, 5_000);
        assert_eq!(req.priority, LocationPriority::HighAccuracy);
    }
}
