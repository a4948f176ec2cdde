//! Resolution of free-form location strings.
//!
//! A query is either explicit coordinates (`"48.85, 2.35"` or `"48.85 2.35"`)
//! or a city name matched against a bundled table of cities. City matching
//! ignores case and accents and tolerates typos; when several cities match
//! equally well the most populous wins.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::observer::Observer;

const BUNDLED_CITIES: &str = include_str!("../data/cities.csv");

/// Minimum score for a city to be considered a match.
const MATCH_THRESHOLD: f64 = 0.5;

/// Score assigned to the short-prefix fallback.
const PREFIX_FALLBACK_SCORE: f64 = 0.4;

const MAX_SUGGESTIONS: usize = 3;

static COORDINATES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-?\d+(?:\.\d+)?)\s*(?:,\s*|\s+)(-?\d+(?:\.\d+)?)$").expect("valid coordinate regex")
});

static CITIES: Lazy<Vec<City>> = Lazy::new(|| {
    let mut reader = csv::Reader::from_reader(BUNDLED_CITIES.as_bytes());
    let cities: Vec<City> = reader
        .deserialize()
        .filter_map(|record| match record {
            Ok(city) => Some(city),
            Err(err) => {
                warn!(error = %err, "skipping malformed city record");
                None
            }
        })
        .collect();
    debug!(count = cities.len(), "loaded city table");
    cities
});

/// A city from the bundled table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    /// ISO 3166-1 alpha-2 country code.
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub population: u64,
}

/// How a location was resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LocationSource {
    Coordinates,
    City { score: f64 },
}

/// A location query turned into coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedLocation {
    /// Human readable description, e.g. `Paris, FR`.
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
    pub source: LocationSource,
}

impl ResolvedLocation {
    /// Observer at this location.
    pub fn observer(&self, instant: DateTime<Utc>) -> Result<Observer> {
        Observer::new(self.latitude, self.longitude, instant)
    }
}

/// Resolve coordinates or a city name.
pub fn resolve_location(query: &str) -> Result<ResolvedLocation> {
    let trimmed = query.trim();
    if let Some((latitude, longitude)) = parse_coordinates(trimmed)? {
        return Ok(ResolvedLocation {
            label: format!("Coordinates {latitude}, {longitude}"),
            latitude,
            longitude,
            source: LocationSource::Coordinates,
        });
    }

    let (name, country) = split_country(trimmed);
    let matches = rank_cities(name, country);
    let Some((city, score)) = matches.first() else {
        return Err(Error::UnknownLocation {
            query: trimmed.to_string(),
            suggestions: suggest_cities(name, MAX_SUGGESTIONS),
        });
    };

    let label = format!("{}, {}", city.name, city.country);
    if *score < 1.0 {
        info!(query = trimmed, matched = %label, score = *score, "fuzzy location match");
    }
    Ok(ResolvedLocation {
        label,
        latitude: city.latitude,
        longitude: city.longitude,
        source: LocationSource::City { score: *score },
    })
}

/// Parse `"lat, lon"` or `"lat lon"`.
///
/// Returns `Ok(None)` when the string is not coordinates at all and an error
/// when it is but the values are out of range.
pub fn parse_coordinates(query: &str) -> Result<Option<(f64, f64)>> {
    let Some(caps) = COORDINATES.captures(query.trim()) else {
        return Ok(None);
    };
    let parse = |idx: usize| caps[idx].parse::<f64>().ok();
    let (Some(latitude), Some(longitude)) = (parse(1), parse(2)) else {
        return Ok(None);
    };
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(Error::InvalidObserver {
            reason: format!("coordinates {latitude}, {longitude} out of range"),
        });
    }
    Ok(Some((latitude, longitude)))
}

/// Cities matching `name`, best first. Ties keep the larger population first.
pub fn search_cities(name: &str, limit: usize) -> Vec<(&'static City, f64)> {
    let mut matches = rank_cities(name, None);
    matches.truncate(limit);
    matches
}

fn split_country(query: &str) -> (&str, Option<&str>) {
    match query.rsplit_once(',') {
        Some((name, country)) if country.trim().len() == 2 => (name.trim(), Some(country.trim())),
        _ => (query, None),
    }
}

fn rank_cities(name: &str, country: Option<&str>) -> Vec<(&'static City, f64)> {
    let query = fold(name);
    if query.is_empty() {
        return Vec::new();
    }
    let in_country = |city: &City| {
        country.map_or(true, |code| city.country.eq_ignore_ascii_case(code))
    };

    let mut candidates: Vec<(&'static City, f64)> = CITIES
        .iter()
        .filter(|city| in_country(city))
        .map(|city| (city, similarity(&query, &fold(&city.name))))
        .filter(|(_, score)| *score > MATCH_THRESHOLD)
        .collect();

    if candidates.is_empty() && query.chars().count() >= 3 {
        let prefix: String = query.chars().take(3).collect();
        candidates = CITIES
            .iter()
            .filter(|city| in_country(city) && fold(&city.name).starts_with(&prefix))
            .map(|city| (city, PREFIX_FALLBACK_SCORE))
            .collect();
    }

    candidates.sort_by(|a, b| {
        b.1.total_cmp(&a.1)
            .then(b.0.population.cmp(&a.0.population))
            .then_with(|| a.0.name.cmp(&b.0.name))
    });
    candidates
}

fn suggest_cities(name: &str, limit: usize) -> Vec<String> {
    let query = fold(name);
    let mut scored: Vec<(f64, &City)> = CITIES
        .iter()
        .map(|city| (strsim::jaro_winkler(&query, &fold(&city.name)), city))
        .filter(|(score, _)| *score > 0.6)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(b.1.population.cmp(&a.1.population)));
    scored
        .into_iter()
        .take(limit)
        .map(|(_, city)| format!("{}, {}", city.name, city.country))
        .collect()
}

/// Similarity of two folded strings in [0, 1].
fn similarity(query: &str, name: &str) -> f64 {
    if query == name {
        return 1.0;
    }
    if name.contains(query) || query.contains(name) {
        return 0.9;
    }
    if name.starts_with(query) {
        return 0.85;
    }
    if query.is_empty() || name.is_empty() {
        return 0.0;
    }
    let edit = strsim::normalized_levenshtein(query, name);
    let a: BTreeSet<char> = query.chars().collect();
    let b: BTreeSet<char> = name.chars().collect();
    let jaccard = a.intersection(&b).count() as f64 / a.union(&b).count() as f64;
    edit * 0.7 + jaccard * 0.3
}

/// Lowercase and strip common Latin diacritics.
fn fold(text: &str) -> String {
    text.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
            'ç' | 'ć' | 'č' => 'c',
            'ď' | 'đ' => 'd',
            'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => 'e',
            'ğ' => 'g',
            'ì' | 'í' | 'î' | 'ï' | 'ī' | 'ı' => 'i',
            'ł' | 'ľ' => 'l',
            'ñ' | 'ń' | 'ň' => 'n',
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => 'o',
            'ř' => 'r',
            'ś' | 'š' | 'ş' => 's',
            'ť' | 'ţ' => 't',
            'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => 'u',
            'ý' | 'ÿ' => 'y',
            'ź' | 'ż' | 'ž' => 'z',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_coordinate_forms() {
        assert_eq!(parse_coordinates("48.85, 2.35").unwrap(), Some((48.85, 2.35)));
        assert_eq!(parse_coordinates("-33.9 18.4").unwrap(), Some((-33.9, 18.4)));
        assert_eq!(parse_coordinates("Paris").unwrap(), None);
        assert!(parse_coordinates("95, 10").is_err());
    }

    #[test]
    fn exact_city_prefers_population() {
        let location = resolve_location("paris").unwrap();
        assert_eq!(location.label, "Paris, FR");
        assert_eq!(location.source, LocationSource::City { score: 1.0 });
    }

    #[test]
    fn country_suffix_filters_matches() {
        let location = resolve_location("Paris, US").unwrap();
        assert_eq!(location.label, "Paris, US");
    }

    #[test]
    fn accents_are_optional() {
        assert_eq!(resolve_location("Sao Paulo").unwrap().label, "São Paulo, BR");
        assert_eq!(resolve_location("zurich").unwrap().label, "Zürich, CH");
    }

    #[test]
    fn tolerates_typos() {
        assert_eq!(resolve_location("Lodnon").unwrap().label, "London, GB");
    }

    #[test]
    fn unknown_location_has_suggestions_field() {
        let err = resolve_location("Qqqqzzzz").unwrap_err();
        assert!(matches!(err, Error::UnknownLocation { .. }));
    }

    #[test]
    fn folds_accents() {
        assert_eq!(fold(" Reykjavík "), "reykjavik");
        assert_eq!(fold("TROMSØ"), "tromso");
    }
}
