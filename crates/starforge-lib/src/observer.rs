//! Observer location and instant.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};

/// A point on Earth at a moment in time. Constructed once per render request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Observer {
    /// Geodetic latitude in degrees, north positive.
    pub latitude: f64,
    /// Longitude in degrees, east positive.
    pub longitude: f64,
    /// Height above sea level in metres, when known.
    pub elevation: Option<f64>,
    /// Observation instant.
    pub instant: DateTime<Utc>,
}

impl Observer {
    /// Validate and build an observer.
    ///
    /// Longitudes outside [-180, 180] are wrapped; latitudes outside [-90, 90]
    /// are rejected.
    pub fn new(latitude: f64, longitude: f64, instant: DateTime<Utc>) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(Error::InvalidObserver {
                reason: format!("latitude {latitude} outside [-90, 90]"),
            });
        }
        if !longitude.is_finite() {
            return Err(Error::InvalidObserver {
                reason: format!("longitude {longitude} is not finite"),
            });
        }

        Ok(Self {
            latitude,
            longitude: wrap_longitude(longitude),
            elevation: None,
            instant,
        })
    }

    pub fn with_elevation(mut self, metres: f64) -> Self {
        self.elevation = Some(metres);
        self
    }
}

fn wrap_longitude(longitude: f64) -> f64 {
    let wrapped = (longitude + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid maps +180 to -180; keep the caller's sign at the antimeridian.
    if wrapped == -180.0 && longitude > 0.0 {
        180.0
    } else {
        wrapped
    }
}
