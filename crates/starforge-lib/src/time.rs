//! Julian dates, sidereal time and precession.
//!
//! These are the time-dependent pieces of the equatorial → horizontal
//! transform. UTC is used in place of UT1; the sub-second difference is far
//! below chart resolution.
//!
//! Sources:
//! - GMST: Meeus, _Astronomical Algorithms_ (2nd ed.), Eq. 12.4.
//! - Precession: Meeus Eq. 21.2 and 21.4 (IAU 1976 angles).

use chrono::{DateTime, Utc};

/// Julian Date of the J2000.0 epoch (2000-01-01 12:00 TT).
pub const J2000_JD: f64 = 2_451_545.0;

/// Julian Date of the Unix epoch.
const UNIX_EPOCH_JD: f64 = 2_440_587.5;

const SECONDS_PER_DAY: f64 = 86_400.0;
const DAYS_PER_CENTURY: f64 = 36_525.0;

/// Julian Date for an instant.
pub fn julian_date(instant: &DateTime<Utc>) -> f64 {
    let seconds = instant.timestamp() as f64 + f64::from(instant.timestamp_subsec_nanos()) * 1e-9;
    UNIX_EPOCH_JD + seconds / SECONDS_PER_DAY
}

/// Julian centuries since J2000.0.
pub fn centuries_since_j2000(jd: f64) -> f64 {
    (jd - J2000_JD) / DAYS_PER_CENTURY
}

/// Greenwich Mean Sidereal Time in degrees, [0, 360).
///
/// θ₀ = 280.46061837 + 360.98564736629·(JD − 2451545) + 0.000387933·T² − T³/38710000
pub fn gmst_deg(jd: f64) -> f64 {
    let t = centuries_since_j2000(jd);
    let theta = 280.460_618_37 + 360.985_647_366_29 * (jd - J2000_JD) + 0.000_387_933 * t * t
        - t * t * t / 38_710_000.0;
    theta.rem_euclid(360.0)
}

/// Local sidereal time from GMST and east longitude, both in degrees.
/// Returns [0, 360).
pub fn local_sidereal_time_deg(gmst: f64, longitude_east: f64) -> f64 {
    (gmst + longitude_east).rem_euclid(360.0)
}

/// Precess J2000 equatorial coordinates to the mean equinox of `jd`.
///
/// Arguments and result in degrees; RA normalized to [0, 360).
pub fn precess_j2000(ra_deg: f64, dec_deg: f64, jd: f64) -> (f64, f64) {
    let t = centuries_since_j2000(jd);
    if t == 0.0 {
        return (ra_deg.rem_euclid(360.0), dec_deg);
    }
    let t2 = t * t;
    let t3 = t2 * t;

    let zeta = arcsec_to_rad(2306.2181 * t + 0.30188 * t2 + 0.017998 * t3);
    let z = arcsec_to_rad(2306.2181 * t + 1.09468 * t2 + 0.018203 * t3);
    let theta = arcsec_to_rad(2004.3109 * t - 0.42665 * t2 - 0.041833 * t3);

    let ra0 = ra_deg.to_radians();
    let dec0 = dec_deg.to_radians();
    let (sin_dec0, cos_dec0) = dec0.sin_cos();
    let (sin_theta, cos_theta) = theta.sin_cos();
    let (sin_rz, cos_rz) = (ra0 + zeta).sin_cos();

    let a = cos_dec0 * sin_rz;
    let b = cos_theta * cos_dec0 * cos_rz - sin_theta * sin_dec0;
    let c = sin_theta * cos_dec0 * cos_rz + cos_theta * sin_dec0;

    let ra = a.atan2(b) + z;
    // Near the poles asin loses precision; use the horizontal component instead.
    let dec = if c.abs() > 0.99 {
        a.hypot(b).acos().copysign(c)
    } else {
        c.asin()
    };

    (ra.to_degrees().rem_euclid(360.0), dec.to_degrees())
}

fn arcsec_to_rad(arcsec: f64) -> f64 {
    (arcsec / 3600.0).to_radians()
}
