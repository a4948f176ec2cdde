#![allow(dead_code)]

use std::path::PathBuf;

use chrono::{DateTime, TimeZone, Utc};
use starforge_lib::{Catalog, Observer};

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../docs/fixtures")
}

/// Christmas evening in Paris, the reference scenario.
pub fn reference_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 12, 25, 22, 0, 0).unwrap()
}

pub fn paris() -> Observer {
    Observer::new(48.8566, 2.3522, reference_instant()).expect("valid observer")
}

pub fn bundled_catalog() -> Catalog {
    let loaded = Catalog::bundled().expect("bundled catalog loads");
    assert!(loaded.rejected.is_empty(), "bundled data is clean");
    loaded.catalog
}
