//! Star catalog and constellation figure data.
//!
//! The catalog is read-only input to the render pipeline. Stars are loaded
//! from CSV (Hipparcos-style columns, see [`read_stars`]) and constellation
//! figures from Stellarium `constellationship.fab` files (see
//! [`read_constellations`]). Malformed records never fail a load: they are
//! returned alongside the data as recoverable [`Error`] values so callers can
//! report a summary.

mod names;

pub use names::constellation_name;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Catalog identifier (Hipparcos number).
pub type ObjectId = u32;

const BUNDLED_STARS: &str = include_str!("../../data/bright_stars.csv");
const BUNDLED_FIGURES: &str = include_str!("../../data/constellationship.fab");

/// A catalog star.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CelestialObject {
    pub id: ObjectId,
    /// Proper name, if the star has one.
    pub name: Option<String>,
    /// Right ascension at J2000, degrees.
    pub ra_deg: f64,
    /// Declination at J2000, degrees.
    pub dec_deg: f64,
    /// Apparent visual magnitude.
    pub magnitude: f64,
    /// IAU abbreviation of the constellation the star belongs to.
    pub constellation: Option<String>,
}

/// A line segment of a constellation figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ConstellationEdge {
    pub start: ObjectId,
    pub end: ObjectId,
}

/// A named constellation figure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Constellation {
    pub abbreviation: String,
    pub edges: Vec<ConstellationEdge>,
}

impl Constellation {
    /// Full IAU name, falling back to the abbreviation for unknown figures.
    pub fn display_name(&self) -> &str {
        constellation_name(&self.abbreviation).unwrap_or(&self.abbreviation)
    }

    /// Distinct stars referenced by the figure, in identifier order.
    pub fn members(&self) -> BTreeSet<ObjectId> {
        self.edges
            .iter()
            .flat_map(|edge| [edge.start, edge.end])
            .collect()
    }
}

/// Records parsed from a source together with the records that were skipped.
#[derive(Debug)]
pub struct Loaded<T> {
    pub items: Vec<T>,
    pub rejected: Vec<Error>,
}

/// An assembled catalog and every record rejected while building it.
#[derive(Debug)]
pub struct LoadedCatalog {
    pub catalog: Catalog,
    pub rejected: Vec<Error>,
}

/// In-memory star catalog with constellation figures.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    objects: Vec<CelestialObject>,
    index: HashMap<ObjectId, usize>,
    constellations: Vec<Constellation>,
    figure_stars: HashSet<ObjectId>,
}

impl Catalog {
    /// Assemble a catalog.
    ///
    /// Duplicate identifiers keep the first record. Constellation edges whose
    /// endpoints are not in the catalog are dropped; both cases are reported
    /// in the returned rejection list.
    pub fn new(
        objects: Vec<CelestialObject>,
        constellations: Vec<Constellation>,
    ) -> LoadedCatalog {
        let mut rejected = Vec::new();
        let mut kept = Vec::with_capacity(objects.len());
        let mut index = HashMap::with_capacity(objects.len());

        for object in objects {
            if index.contains_key(&object.id) {
                rejected.push(Error::Catalog {
                    id: object.id,
                    reason: "duplicate identifier".to_string(),
                });
                continue;
            }
            index.insert(object.id, kept.len());
            kept.push(object);
        }

        let mut figures = Vec::with_capacity(constellations.len());
        let mut figure_stars = HashSet::new();
        for mut constellation in constellations {
            constellation.edges.retain(|edge| {
                let missing = [edge.start, edge.end]
                    .into_iter()
                    .find(|id| !index.contains_key(id));
                match missing {
                    Some(id) => {
                        rejected.push(Error::Catalog {
                            id,
                            reason: format!(
                                "referenced by {} figure but missing from catalog",
                                constellation.abbreviation
                            ),
                        });
                        false
                    }
                    None => true,
                }
            });
            if constellation.edges.is_empty() {
                continue;
            }
            figure_stars.extend(constellation.members());
            figures.push(constellation);
        }

        debug!(
            objects = kept.len(),
            constellations = figures.len(),
            rejected = rejected.len(),
            "assembled catalog"
        );

        LoadedCatalog {
            catalog: Catalog {
                objects: kept,
                index,
                constellations: figures,
                figure_stars,
            },
            rejected,
        }
    }

    /// Catalog of bright stars and figures compiled into the library.
    pub fn bundled() -> Result<LoadedCatalog> {
        let stars = read_stars(BUNDLED_STARS.as_bytes())?;
        let figures = read_constellations(BUNDLED_FIGURES.as_bytes())?;
        Ok(Self::combine(stars, figures))
    }

    /// Load stars from a CSV file and, optionally, figures from a `.fab` file.
    pub fn from_paths(stars: &Path, figures: Option<&Path>) -> Result<LoadedCatalog> {
        let stars = read_stars(fs::File::open(stars)?)?;
        let figures = match figures {
            Some(path) => read_constellations(BufReader::new(fs::File::open(path)?))?,
            None => Loaded {
                items: Vec::new(),
                rejected: Vec::new(),
            },
        };
        let loaded = Self::combine(stars, figures);
        info!(
            objects = loaded.catalog.len(),
            rejected = loaded.rejected.len(),
            "loaded catalog"
        );
        Ok(loaded)
    }

    /// Load stars and figures from files, using the bundled data for
    /// whichever path is absent.
    pub fn load(stars: Option<&Path>, figures: Option<&Path>) -> Result<LoadedCatalog> {
        let stars = match stars {
            Some(path) => read_stars(fs::File::open(path)?)?,
            None => read_stars(BUNDLED_STARS.as_bytes())?,
        };
        let figures = match figures {
            Some(path) => read_constellations(BufReader::new(fs::File::open(path)?))?,
            None => read_constellations(BUNDLED_FIGURES.as_bytes())?,
        };
        Ok(Self::combine(stars, figures))
    }

    fn combine(stars: Loaded<CelestialObject>, figures: Loaded<Constellation>) -> LoadedCatalog {
        let mut rejected = stars.rejected;
        rejected.extend(figures.rejected);
        let mut assembled = Self::new(stars.items, figures.items);
        rejected.append(&mut assembled.rejected);
        assembled.rejected = rejected;
        assembled
    }

    pub fn iter(&self) -> impl Iterator<Item = &CelestialObject> {
        self.objects.iter()
    }

    pub fn get(&self, id: ObjectId) -> Option<&CelestialObject> {
        self.index.get(&id).map(|&idx| &self.objects[idx])
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn constellations(&self) -> &[Constellation] {
        &self.constellations
    }

    /// Whether the star is an endpoint of any constellation figure edge.
    pub fn is_figure_star(&self, id: ObjectId) -> bool {
        self.figure_stars.contains(&id)
    }
}

impl LoadedCatalog {
    /// Split into the catalog and its rejections.
    pub fn into_parts(self) -> (Catalog, Vec<Error>) {
        (self.catalog, self.rejected)
    }
}

#[derive(Debug, Clone, Copy)]
enum RaUnit {
    Degrees,
    Hours,
}

#[derive(Debug, Clone, Copy)]
struct StarColumns {
    id: usize,
    name: Option<usize>,
    ra: usize,
    ra_unit: RaUnit,
    dec: usize,
    magnitude: usize,
    constellation: Option<usize>,
}

impl StarColumns {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let normalize = |s: &str| {
            s.to_ascii_lowercase()
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
                .collect::<String>()
        };
        let normalized: Vec<String> = headers.iter().map(normalize).collect();
        let find = |synonyms: &[&str]| normalized.iter().position(|h| synonyms.contains(&h.as_str()));

        let missing = |column: &str| Error::CatalogFormat {
            line: 1,
            message: format!("missing required column '{column}'"),
        };

        let id = find(&["hip", "id", "hip_id", "hipparcos"]).ok_or_else(|| missing("hip"))?;
        let (ra, ra_unit) = match find(&["ra_deg", "ra", "ra_degrees", "radeg"]) {
            Some(idx) => (idx, RaUnit::Degrees),
            None => (
                find(&["ra_hours", "rahours", "ra_h"]).ok_or_else(|| missing("ra_deg"))?,
                RaUnit::Hours,
            ),
        };
        let dec = find(&["dec_deg", "dec", "dec_degrees", "decdeg"]).ok_or_else(|| missing("dec_deg"))?;
        let magnitude = find(&["magnitude", "mag", "vmag"]).ok_or_else(|| missing("magnitude"))?;

        Ok(Self {
            id,
            name: find(&["name", "proper", "proper_name"]),
            ra,
            ra_unit,
            dec,
            magnitude,
            constellation: find(&["constellation", "con"]),
        })
    }

    fn parse(&self, record: &StringRecord, line: usize) -> Result<CelestialObject> {
        let field = |idx: usize, column: &str| {
            record.get(idx).ok_or_else(|| Error::CatalogFormat {
                line,
                message: format!("missing value for '{column}'"),
            })
        };
        let number = |idx: usize, column: &str| -> Result<f64> {
            let raw = field(idx, column)?;
            raw.parse::<f64>().map_err(|_| Error::CatalogFormat {
                line,
                message: format!("'{raw}' is not a number in column '{column}'"),
            })
        };
        let optional = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let raw_id = field(self.id, "hip")?;
        let id = raw_id.parse::<ObjectId>().map_err(|_| Error::CatalogFormat {
            line,
            message: format!("'{raw_id}' is not a valid identifier"),
        })?;
        let ra = number(self.ra, "ra")?;

        Ok(CelestialObject {
            id,
            name: optional(self.name),
            ra_deg: match self.ra_unit {
                RaUnit::Degrees => ra,
                RaUnit::Hours => ra * 15.0,
            },
            dec_deg: number(self.dec, "dec")?,
            magnitude: number(self.magnitude, "magnitude")?,
            constellation: optional(self.constellation),
        })
    }
}

/// Read stars from CSV.
///
/// Required columns (case-insensitive, common synonyms accepted): `hip`,
/// `ra_deg` or `ra_hours`, `dec_deg`, `magnitude`. Optional: `name`,
/// `constellation`. Rows that fail to parse are skipped and reported.
pub fn read_stars<R: Read>(reader: R) -> Result<Loaded<CelestialObject>> {
    let mut csv_reader = ReaderBuilder::new()
        .trim(Trim::Fields)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let columns = StarColumns::resolve(&headers)?;

    let mut items = Vec::new();
    let mut rejected = Vec::new();
    for record in csv_reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                let line = err.position().map(|p| p.line() as usize).unwrap_or(0);
                rejected.push(Error::CatalogFormat {
                    line,
                    message: err.to_string(),
                });
                continue;
            }
        };
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        match columns.parse(&record, line) {
            Ok(object) => items.push(object),
            Err(err) => rejected.push(err),
        }
    }

    Ok(Loaded { items, rejected })
}

/// Read constellation figures in Stellarium `constellationship.fab` format.
///
/// Each non-comment line is `<abbr> <segment count> <hip> <hip> ...` with two
/// identifiers per segment. Lines whose identifier count disagrees with the
/// declared segment count are skipped and reported.
pub fn read_constellations<R: BufRead>(reader: R) -> Result<Loaded<Constellation>> {
    let mut items = Vec::new();
    let mut rejected = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match parse_figure_line(trimmed, line_no) {
            Ok(constellation) => items.push(constellation),
            Err(err) => rejected.push(err),
        }
    }

    Ok(Loaded { items, rejected })
}

fn parse_figure_line(line: &str, line_no: usize) -> Result<Constellation> {
    let malformed = |message: String| Error::CatalogFormat {
        line: line_no,
        message,
    };

    let mut tokens = line.split_whitespace();
    let abbreviation = tokens
        .next()
        .ok_or_else(|| malformed("empty figure line".to_string()))?
        .to_string();
    let raw_count = tokens
        .next()
        .ok_or_else(|| malformed(format!("{abbreviation}: missing segment count")))?;
    let count = raw_count
        .parse::<usize>()
        .map_err(|_| malformed(format!("{abbreviation}: '{raw_count}' is not a segment count")))?;

    let ids = tokens
        .map(|token| {
            token
                .parse::<ObjectId>()
                .map_err(|_| malformed(format!("{abbreviation}: '{token}' is not an identifier")))
        })
        .collect::<Result<Vec<_>>>()?;

    if ids.len() != count * 2 {
        return Err(malformed(format!(
            "{abbreviation}: expected {} identifiers, found {}",
            count * 2,
            ids.len()
        )));
    }

    let edges = ids
        .chunks_exact(2)
        .map(|pair| ConstellationEdge {
            start: pair[0],
            end: pair[1],
        })
        .collect();

    Ok(Constellation {
        abbreviation,
        edges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn star(id: ObjectId, magnitude: f64) -> CelestialObject {
        CelestialObject {
            id,
            name: None,
            ra_deg: 10.0,
            dec_deg: 20.0,
            magnitude,
            constellation: None,
        }
    }

    #[test]
    fn reads_degrees_and_hours() {
        let degrees = "hip,ra_deg,dec_deg,mag\n1,30.0,10.0,2.0\n";
        let hours = "HIP,RA_hours,Dec,Vmag\n1,2.0,10.0,2.0\n";
        let a = read_stars(degrees.as_bytes()).unwrap();
        let b = read_stars(hours.as_bytes()).unwrap();
        assert_eq!(a.items[0].ra_deg, 30.0);
        assert_eq!(b.items[0].ra_deg, 30.0);
        assert!(a.items[0].name.is_none());
    }

    #[test]
    fn skips_unparseable_rows() {
        let csv = "hip,name,ra_deg,dec_deg,magnitude\n1,A,10,10,1\nx,B,10,10,1\n3,C,ten,10,1\n";
        let loaded = read_stars(csv.as_bytes()).unwrap();
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.rejected.len(), 2);
        assert!(loaded
            .rejected
            .iter()
            .all(|err| matches!(err, Error::CatalogFormat { .. })));
    }

    #[test]
    fn missing_required_column_fails() {
        let err = read_stars("hip,ra_deg,magnitude\n1,2,3\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("dec_deg"));
    }

    #[test]
    fn parses_figure_lines() {
        let fab = "# comment\nOri 2 1 2 2 3\n\nBad 2 1 2\n";
        let loaded = read_constellations(fab.as_bytes()).unwrap();
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.items[0].edges.len(), 2);
        assert_eq!(loaded.rejected.len(), 1);
        assert_eq!(loaded.items[0].display_name(), "Orion");
    }

    #[test]
    fn drops_edges_with_missing_endpoints() {
        let figures = vec![Constellation {
            abbreviation: "Lyr".to_string(),
            edges: vec![
                ConstellationEdge { start: 1, end: 2 },
                ConstellationEdge { start: 2, end: 99 },
            ],
        }];
        let (catalog, rejected) = Catalog::new(vec![star(1, 1.0), star(2, 2.0)], figures).into_parts();
        assert_eq!(catalog.constellations()[0].edges.len(), 1);
        assert_eq!(rejected.len(), 1);
        assert!(catalog.is_figure_star(1));
        assert!(!catalog.is_figure_star(99));
    }

    #[test]
    fn duplicate_identifiers_keep_first() {
        let (catalog, rejected) =
            Catalog::new(vec![star(7, 1.0), star(7, 5.0)], Vec::new()).into_parts();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(7).map(|s| s.magnitude), Some(1.0));
        assert_eq!(rejected.len(), 1);
    }

    #[test]
    fn bundled_catalog_is_consistent() {
        let loaded = Catalog::bundled().unwrap();
        assert!(loaded.rejected.is_empty(), "{:?}", loaded.rejected);
        let catalog = &loaded.catalog;
        assert!(catalog.len() > 50);
        assert!(catalog.get(91262).is_some(), "Vega present");
        assert!(catalog
            .constellations()
            .iter()
            .any(|c| c.abbreviation == "UMa"));
    }
}
