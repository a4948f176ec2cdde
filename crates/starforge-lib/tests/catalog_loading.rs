mod common;

use starforge_lib::coords::compute_horizontal_positions;
use starforge_lib::{Catalog, Error, Result};

use common::{fixtures_dir, paris};

#[test]
fn loads_fixture_catalog_with_rejections() -> Result<()> {
    let dir = fixtures_dir();
    let loaded = Catalog::from_paths(
        &dir.join("minimal_catalog.csv"),
        Some(&dir.join("minimal_lines.fab")),
    )?;

    let catalog = &loaded.catalog;
    assert_eq!(catalog.len(), 7, "garbled row is skipped");
    let betelgeuse = catalog.get(27989).expect("Betelgeuse present");
    assert!((betelgeuse.ra_deg - 88.7929).abs() < 1e-3, "hours converted to degrees");
    assert_eq!(betelgeuse.constellation.as_deref(), Some("Ori"));

    let figures = catalog.constellations();
    assert_eq!(figures.len(), 1, "Lyra loses its only edge");
    assert_eq!(figures[0].abbreviation, "Ori");
    assert_eq!(figures[0].edges.len(), 3);
    assert!(catalog.is_figure_star(24436));
    assert!(!catalog.is_figure_star(91262));

    let formats = loaded
        .rejected
        .iter()
        .filter(|err| matches!(err, Error::CatalogFormat { .. }))
        .count();
    let missing = loaded
        .rejected
        .iter()
        .filter(|err| matches!(err, Error::Catalog { id: 424242, .. }))
        .count();
    assert_eq!(formats, 2, "garbled star row and bad figure line");
    assert_eq!(missing, 1, "dangling Lyra endpoint");
    assert!(loaded.rejected.iter().all(Error::is_recoverable));
    Ok(())
}

#[test]
fn out_of_range_declination_is_rejected_at_conversion() -> Result<()> {
    let loaded = Catalog::from_paths(&fixtures_dir().join("minimal_catalog.csv"), None)?;
    let batch = compute_horizontal_positions(&paris(), &loaded.catalog)?;

    assert_eq!(batch.positions.len(), 6);
    assert_eq!(batch.rejected.len(), 1);
    assert!(matches!(batch.rejected[0], Error::Catalog { id: 99999, .. }));
    Ok(())
}

#[test]
fn missing_catalog_file_is_an_io_error() {
    let err = Catalog::from_paths(&fixtures_dir().join("does_not_exist.csv"), None).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn custom_figures_pair_with_bundled_stars() -> Result<()> {
    let loaded = Catalog::load(None, Some(&fixtures_dir().join("minimal_lines.fab")))?;

    assert!(loaded.catalog.len() > 7, "bundled stars are used");
    let abbreviations: Vec<_> = loaded
        .catalog
        .constellations()
        .iter()
        .map(|figure| figure.abbreviation.as_str())
        .collect();
    assert_eq!(abbreviations, ["Ori"]);
    Ok(())
}
