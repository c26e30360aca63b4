//! Position fixes used to tell contacts where the user is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Text used in messages when no fix could be obtained
pub const LOCATION_UNAVAILABLE: &str = "Location unavailable";

/// Where a fix came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixSource {
    /// Last known position held by the provider
    Cached,
    /// Position requested for this alert
    Fresh,
}

/// A geographic position fix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Horizontal accuracy radius in meters
    pub accuracy: f64,
    /// When the provider obtained the fix
    pub obtained_at: DateTime<Utc>,
    /// Cached or freshly requested
    pub source: FixSource,
}

impl LocationFix {
    /// Create a fix obtained now
    pub fn new(latitude: f64, longitude: f64, accuracy: f64, source: FixSource) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            obtained_at: Utc::now(),
            source,
        }
    }

    /// Map link that recipients can open
    pub fn map_link(&self) -> String {
        format!(
            "https://maps.google.com/?q={:.6},{:.6}",
            self.latitude, self.longitude
        )
    }

    /// Plain "lat, lng" text
    pub fn coordinates(&self) -> String {
        format!("{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// Location reference for a message: the map link, or the placeholder.
pub fn location_reference(fix: Option<&LocationFix>) -> String {
    fix.map(LocationFix::map_link)
        .unwrap_or_else(|| LOCATION_UNAVAILABLE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_link_format() {
        let fix = LocationFix::new(40.7128, -74.006, 12.0, FixSource::Fresh);
        assert_eq!(fix.map_link(), "https://maps.google.com/?q=40.712800,-74.006000");
    }

    #[test]
    fn test_missing_fix_uses_placeholder() {
        assert_eq!(location_reference(None), LOCATION_UNAVAILABLE);
    }
}
