//! Equatorial → horizontal coordinate conversion.
//!
//! Catalog positions are J2000; they are precessed to the mean equinox of the
//! observation instant before the hour angle is taken. Refraction and nutation
//! are ignored.

use serde::Serialize;

use crate::catalog::{Catalog, CelestialObject, ObjectId};
use crate::error::{Error, Result};
use crate::observer::Observer;
use crate::time::{gmst_deg, julian_date, local_sidereal_time_deg, precess_j2000};

/// Position of an object in the observer's sky.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HorizontalPosition {
    pub id: ObjectId,
    /// Degrees above the horizon, [-90, 90].
    pub altitude: f64,
    /// Degrees clockwise from north, [0, 360).
    pub azimuth: f64,
}

/// Per-render quantities derived from the observer.
#[derive(Debug, Clone, Copy)]
pub struct ObserverFrame {
    jd: f64,
    lst_deg: f64,
    sin_lat: f64,
    cos_lat: f64,
}

impl ObserverFrame {
    /// Derive the frame for an observer.
    ///
    /// Fails with [`Error::Projection`] at the geographic poles, where azimuth
    /// has no origin.
    pub fn new(observer: &Observer) -> Result<Self> {
        if observer.latitude.abs() >= 90.0 {
            return Err(Error::Projection {
                reason: format!(
                    "observer latitude {} is a pole; azimuth is undefined",
                    observer.latitude
                ),
            });
        }
        let jd = julian_date(&observer.instant);
        let lst_deg = local_sidereal_time_deg(gmst_deg(jd), observer.longitude);
        let (sin_lat, cos_lat) = observer.latitude.to_radians().sin_cos();
        Ok(Self {
            jd,
            lst_deg,
            sin_lat,
            cos_lat,
        })
    }

    /// Julian Date of the observation.
    pub fn julian_date(&self) -> f64 {
        self.jd
    }

    /// Local sidereal time in degrees.
    pub fn local_sidereal_time(&self) -> f64 {
        self.lst_deg
    }
}

/// Horizontal positions for a catalog plus the objects that were rejected.
#[derive(Debug, Default)]
pub struct HorizontalBatch {
    pub positions: Vec<HorizontalPosition>,
    pub rejected: Vec<Error>,
}

/// Convert one catalog object to horizontal coordinates.
pub fn horizontal_position(
    frame: &ObserverFrame,
    object: &CelestialObject,
) -> Result<HorizontalPosition> {
    validate(object)?;

    let (ra, dec) = precess_j2000(object.ra_deg, object.dec_deg, frame.jd);
    let hour_angle = (frame.lst_deg - ra).to_radians();
    let (sin_dec, cos_dec) = dec.to_radians().sin_cos();
    let (sin_h, cos_h) = hour_angle.sin_cos();

    let sin_alt = sin_dec * frame.sin_lat + cos_dec * frame.cos_lat * cos_h;
    let altitude = sin_alt.clamp(-1.0, 1.0).asin().to_degrees();

    let y = -cos_dec * sin_h;
    let x = sin_dec * frame.cos_lat - cos_dec * frame.sin_lat * cos_h;
    let azimuth = normalize_azimuth(y.atan2(x).to_degrees());

    Ok(HorizontalPosition {
        id: object.id,
        altitude: altitude.clamp(-90.0, 90.0),
        azimuth,
    })
}

/// Convert every catalog object for the observer.
///
/// Invalid objects are collected in [`HorizontalBatch::rejected`] and never
/// abort the batch.
pub fn compute_horizontal_positions(
    observer: &Observer,
    catalog: &Catalog,
) -> Result<HorizontalBatch> {
    let frame = ObserverFrame::new(observer)?;
    let mut batch = HorizontalBatch {
        positions: Vec::with_capacity(catalog.len()),
        rejected: Vec::new(),
    };
    for object in catalog.iter() {
        match horizontal_position(&frame, object) {
            Ok(position) => batch.positions.push(position),
            Err(err) => batch.rejected.push(err),
        }
    }
    Ok(batch)
}

/// Great-circle separation between two horizontal directions, in degrees.
pub fn angular_separation(alt1: f64, az1: f64, alt2: f64, az2: f64) -> f64 {
    let (sin1, cos1) = alt1.to_radians().sin_cos();
    let (sin2, cos2) = alt2.to_radians().sin_cos();
    let cos_c = sin1 * sin2 + cos1 * cos2 * (az1 - az2).to_radians().cos();
    cos_c.clamp(-1.0, 1.0).acos().to_degrees()
}

fn normalize_azimuth(azimuth: f64) -> f64 {
    let wrapped = azimuth.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

fn validate(object: &CelestialObject) -> Result<()> {
    let reject = |reason: String| Error::Catalog {
        id: object.id,
        reason,
    };
    if !object.ra_deg.is_finite() {
        return Err(reject(format!("right ascension {} is not finite", object.ra_deg)));
    }
    if !object.dec_deg.is_finite() || !(-90.0..=90.0).contains(&object.dec_deg) {
        return Err(reject(format!(
            "declination {} outside [-90, 90]",
            object.dec_deg
        )));
    }
    if !object.magnitude.is_finite() {
        return Err(reject(format!("magnitude {} is not finite", object.magnitude)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn object(id: ObjectId, ra_deg: f64, dec_deg: f64) -> CelestialObject {
        CelestialObject {
            id,
            name: None,
            ra_deg,
            dec_deg,
            magnitude: 1.0,
            constellation: None,
        }
    }

    fn paris() -> Observer {
        let instant = Utc.with_ymd_and_hms(2024, 12, 25, 22, 0, 0).unwrap();
        Observer::new(48.8566, 2.3522, instant).unwrap()
    }

    #[test]
    fn polaris_sits_near_observer_latitude() {
        let frame = ObserverFrame::new(&paris()).unwrap();
        let polaris = object(11767, 37.9546, 89.2641);
        let position = horizontal_position(&frame, &polaris).unwrap();
        assert!((position.altitude - 48.8566).abs() < 1.5, "alt = {}", position.altitude);
        assert!(position.azimuth < 3.0 || position.azimuth > 357.0);
    }

    #[test]
    fn object_on_meridian_is_due_south() {
        let frame = ObserverFrame::new(&paris()).unwrap();
        // Place an object at the current LST so its hour angle is zero. The
        // precession offset is small enough to stay within a degree.
        let lst = frame.local_sidereal_time();
        let position = horizontal_position(&frame, &object(1, lst, 0.0)).unwrap();
        assert!((position.azimuth - 180.0).abs() < 1.5, "az = {}", position.azimuth);
        assert!((position.altitude - (90.0 - 48.8566)).abs() < 1.0);
    }

    #[test]
    fn rejects_invalid_declination() {
        let frame = ObserverFrame::new(&paris()).unwrap();
        let err = horizontal_position(&frame, &object(9, 10.0, 95.5)).unwrap_err();
        assert!(matches!(err, Error::Catalog { id: 9, .. }));
    }

    #[test]
    fn pole_observer_is_a_projection_error() {
        let instant = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let observer = Observer::new(90.0, 0.0, instant).unwrap();
        assert!(matches!(
            ObserverFrame::new(&observer),
            Err(Error::Projection { .. })
        ));
    }

    #[test]
    fn batch_collects_rejections() {
        let (catalog, _) = Catalog::new(
            vec![object(1, 10.0, 10.0), object(2, f64::NAN, 10.0), object(3, 10.0, -91.0)],
            Vec::new(),
        )
        .into_parts();
        let batch = compute_horizontal_positions(&paris(), &catalog).unwrap();
        assert_eq!(batch.positions.len(), 1);
        assert_eq!(batch.rejected.len(), 2);
    }

    #[test]
    fn separation_is_symmetric() {
        assert!((angular_separation(90.0, 0.0, 0.0, 123.0) - 90.0).abs() < 1e-9);
        let a = angular_separation(10.0, 20.0, 30.0, 350.0);
        let b = angular_separation(30.0, 350.0, 10.0, 20.0);
        assert!((a - b).abs() < 1e-12);
    }
}
