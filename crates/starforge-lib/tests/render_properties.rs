mod common;

use std::collections::{BTreeSet, HashMap};

use starforge_lib::catalog::CelestialObject;
use starforge_lib::coords::{compute_horizontal_positions, ObserverFrame};
use starforge_lib::declutter::{label_candidates, OccupancyRegion};
use starforge_lib::scene::{Primitive, CONSTELLATION_STARS, FIELD_STARS, PROCEDURAL_STARS};
use starforge_lib::{
    render, Anchor, Catalog, ProjectionKind, Projector, RenderConfigBuilder, RenderOutput, Result,
};

use common::{bundled_catalog, paris};

fn render_paris(builder: RenderConfigBuilder) -> Result<RenderOutput> {
    let config = builder.build()?;
    render(&bundled_catalog(), &paris(), &config, None)
}

fn ids(output: &RenderOutput) -> BTreeSet<u32> {
    output.points.iter().map(|point| point.id).collect()
}

#[test]
fn lowering_magnitude_limit_only_removes_stars() -> Result<()> {
    let bright = render_paris(RenderConfigBuilder::new().with_magnitude_limit(2.0))?;
    let all = render_paris(RenderConfigBuilder::new().with_magnitude_limit(6.0))?;

    assert!(ids(&bright).is_subset(&ids(&all)));
    assert!(bright.points.iter().all(|point| point.magnitude <= 2.0));
    Ok(())
}

#[test]
fn narrowing_field_of_view_never_adds_stars() -> Result<()> {
    let mut previous = usize::MAX;
    for fov in [180.0, 120.0, 90.0, 60.0, 30.0] {
        let output = render_paris(RenderConfigBuilder::new().with_field_of_view(fov))?;
        assert!(
            output.points.len() <= previous,
            "fov {fov} drew {} stars after {previous}",
            output.points.len()
        );
        previous = output.points.len();
    }
    Ok(())
}

#[test]
fn paris_chart_only_contains_risen_stars_inside_the_disk() -> Result<()> {
    let catalog = bundled_catalog();
    let observer = paris();
    let output = render_paris(RenderConfigBuilder::new())?;
    let altitudes: HashMap<_, _> = compute_horizontal_positions(&observer, &catalog)?
        .positions
        .into_iter()
        .map(|position| (position.id, position.altitude))
        .collect();

    assert!(!output.points.is_empty());
    for point in &output.points {
        assert!(altitudes[&point.id] > 0.0, "{} is below the horizon", point.id);
        assert!(point.magnitude <= 6.0);
        assert!(point.inside, "{} projected outside the disk", point.id);
    }
    Ok(())
}

#[test]
fn plane_radius_grows_with_zenith_distance() -> Result<()> {
    let catalog = bundled_catalog();
    let observer = paris();
    let positions = compute_horizontal_positions(&observer, &catalog)?.positions;

    for kind in [ProjectionKind::Stereographic, ProjectionKind::Equidistant] {
        for sphere in [None, Some(0.6)] {
            let mut builder = RenderConfigBuilder::new()
                .with_field_of_view(180.0)
                .with_projection(kind);
            if let Some(strength) = sphere {
                builder = builder.with_sphere_effect(strength);
            }
            let config = builder.build()?;
            let projector = Projector::new(&config);
            let (cx, cy) = projector.center();

            let mut samples: Vec<(f64, f64)> = positions
                .iter()
                .filter(|position| position.altitude > 0.0)
                .map(|position| {
                    let ((x, y), _) = projector.project(position.altitude, position.azimuth);
                    (90.0 - position.altitude, (x - cx).hypot(y - cy))
                })
                .collect();
            samples.sort_by(|a, b| a.0.total_cmp(&b.0));

            for pair in samples.windows(2) {
                assert!(
                    pair[1].1 + 1e-9 >= pair[0].1,
                    "{kind} sphere={sphere:?}: zenith {} → {} but radius {} → {}",
                    pair[0].0,
                    pair[1].0,
                    pair[0].1,
                    pair[1].1
                );
            }
        }
    }
    Ok(())
}

#[test]
fn every_candidate_is_placed_or_suppressed() -> Result<()> {
    let catalog = bundled_catalog();
    for fov in [60.0, 120.0, 180.0] {
        let config = RenderConfigBuilder::new()
            .with_field_of_view(fov)
            .with_label_magnitude_limit(6.0)
            .build()?;
        let output = render(&catalog, &paris(), &config, None)?;
        let candidates = label_candidates(&output.points, &output.edges, &catalog, &config);
        let placement = &output.placement;
        assert_eq!(placement.placed.len() + placement.suppressed.len(), candidates.len());

        for (i, a) in placement.placed.iter().enumerate() {
            assert!(a.bounds.within(1000.0, 1000.0));
            for b in &placement.placed[i + 1..] {
                assert!(
                    !a.bounds.intersects(&b.bounds),
                    "{} overlaps {}",
                    a.candidate.text,
                    b.candidate.text
                );
            }
        }
    }
    Ok(())
}

#[test]
fn scene_draws_one_marker_per_projected_star() -> Result<()> {
    let output = render_paris(RenderConfigBuilder::new().with_field_of_view(150.0))?;
    let markers: usize = [FIELD_STARS, CONSTELLATION_STARS]
        .iter()
        .filter_map(|name| output.scene.layer(name))
        .map(|layer| {
            layer
                .primitives
                .iter()
                .filter(|primitive| matches!(primitive, Primitive::Circle { .. }))
                .count()
        })
        .sum();
    assert_eq!(markers, output.points.len());
    Ok(())
}

#[test]
fn identical_inputs_give_identical_documents() -> Result<()> {
    let builder = || {
        RenderConfigBuilder::new()
            .with_field_of_view(160.0)
            .with_circular_mask(true)
            .with_sphere_effect(0.4)
            .with_procedural_stars(400)
    };
    let first = render_paris(builder())?;
    let second = render_paris(builder())?;
    assert_eq!(first.svg, second.svg);

    let reseeded = render_paris(builder().with_procedural_stars(401))?;
    assert_ne!(first.svg, reseeded.svg);
    Ok(())
}

#[test]
fn crowded_labels_take_different_anchors() -> Result<()> {
    let observer = paris();
    let lst = ObserverFrame::new(&observer)?.local_sidereal_time();
    let star = |id, name: &str, dec_offset: f64, magnitude| CelestialObject {
        id,
        name: Some(name.to_string()),
        ra_deg: lst,
        dec_deg: observer.latitude + dec_offset,
        magnitude,
        constellation: None,
    };
    let (catalog, rejected) = Catalog::new(
        vec![star(1, "Alpha", 0.0, 1.0), star(2, "Beta", 0.3, 1.5)],
        Vec::new(),
    )
    .into_parts();
    assert!(rejected.is_empty());

    let config = RenderConfigBuilder::new().build()?;
    let output = render(&catalog, &observer, &config, None)?;
    assert_eq!(output.points.len(), 2, "both stars are near the zenith");

    let placement = &output.placement;
    assert_eq!(placement.placed.len() + placement.suppressed.len(), 2);
    assert_eq!(placement.placed[0].candidate.text, "Alpha");
    assert_eq!(placement.placed[0].anchor, Anchor::Right);
    let right = placement
        .placed
        .iter()
        .filter(|label| label.anchor == Anchor::Right)
        .count();
    assert_eq!(right, 1);

    for label in &placement.placed {
        let region = OccupancyRegion::Rect(label.bounds);
        for point in &output.points {
            let marker = OccupancyRegion::Circle {
                x: point.x,
                y: point.y,
                radius: point.radius,
            };
            assert!(!region.intersects(&marker), "{} covers a marker", label.candidate.text);
        }
    }
    Ok(())
}

#[test]
fn view_center_lands_on_canvas_center() -> Result<()> {
    for fov in [30.0, 60.0, 120.0] {
        for kind in [ProjectionKind::Stereographic, ProjectionKind::Equidistant] {
            let config = RenderConfigBuilder::new()
                .with_field_of_view(fov)
                .with_projection(kind)
                .with_view_center(20.0, 120.0)
                .build()?;
            let projector = Projector::new(&config);
            let (cx, cy) = projector.center();

            let ((x, y), inside) = projector.project(20.0, 120.0);
            assert!(inside);
            assert!((x - cx).abs() < 1e-9 && (y - cy).abs() < 1e-9);

            // Half a field above the center sits on the top edge of the disk.
            let ((x, y), inside) = projector.project(20.0 + fov / 2.0, 120.0);
            assert!(inside);
            assert!((x - cx).abs() < 1e-6, "{kind} fov {fov}: x {x}");
            assert!((cy - y - projector.radius()).abs() < 1e-6, "{kind} fov {fov}: y {y}");
        }
    }
    Ok(())
}

#[test]
fn coincident_stars_all_render() -> Result<()> {
    let objects = (1..=40)
        .map(|id| CelestialObject {
            id,
            name: Some(format!("Twin {id}")),
            ra_deg: 83.0,
            dec_deg: 7.0,
            magnitude: 1.0,
            constellation: None,
        })
        .collect();
    let (catalog, rejected) = Catalog::new(objects, Vec::new()).into_parts();
    assert!(rejected.is_empty());

    let config = RenderConfigBuilder::new().with_field_of_view(180.0).build()?;
    let output = render(&catalog, &paris(), &config, None)?;
    assert_eq!(output.points.len(), 40);

    let placement = &output.placement;
    assert_eq!(placement.placed.len() + placement.suppressed.len(), 40);
    assert!(!placement.placed.is_empty());
    Ok(())
}

#[test]
fn masked_chart_keeps_labels_inside_the_disk() -> Result<()> {
    let config = RenderConfigBuilder::new()
        .with_field_of_view(180.0)
        .with_circular_mask(true)
        .with_size(1000, 600)
        .with_label_magnitude_limit(6.0)
        .build()?;
    let output = render(&bundled_catalog(), &paris(), &config, None)?;
    let (cx, cy) = Projector::new(&config).center();
    let radius = config.chart_radius();

    assert!(!output.placement.placed.is_empty());
    for label in &output.placement.placed {
        for (x, y) in label.bounds.corners() {
            let distance = (x - cx).hypot(y - cy);
            assert!(
                distance <= radius + 1e-6,
                "{} reaches {distance} past the disk radius {radius}",
                label.candidate.text
            );
        }
    }
    Ok(())
}

#[test]
fn cropped_render_keeps_everything_inside_the_bounds() -> Result<()> {
    let builder = || {
        RenderConfigBuilder::new()
            .with_field_of_view(180.0)
            .with_label_magnitude_limit(6.0)
            .with_procedural_stars(300)
    };
    let full = render_paris(builder())?;
    let cropped = render_paris(builder().with_bounds(200.0, 150.0, 700.0, 650.0))?;
    assert_eq!(cropped.scene.width, 1000, "cropping keeps the canvas size");

    let inside = |x: f64, y: f64| (200.0..=700.0).contains(&x) && (150.0..=650.0).contains(&y);

    assert!(cropped.report.outside_bounds > 0);
    assert!(ids(&cropped).is_subset(&ids(&full)));
    assert!(cropped.points.len() < full.points.len());
    for point in &cropped.points {
        assert!(inside(point.x, point.y), "{} at ({}, {})", point.id, point.x, point.y);
    }

    assert!(cropped.edges.len() <= full.edges.len());
    for edge in &cropped.edges {
        assert!(edge.points.iter().all(|&(x, y)| inside(x, y)));
    }

    for label in &cropped.placement.placed {
        assert!(
            label.bounds.corners().iter().all(|&(x, y)| inside(x, y)),
            "{} leaves the crop",
            label.candidate.text
        );
    }

    let procedural = cropped.scene.layer(PROCEDURAL_STARS).expect("procedural layer");
    assert!(!procedural.primitives.is_empty());
    for primitive in &procedural.primitives {
        if let Primitive::Circle { cx, cy, .. } = primitive {
            assert!(inside(*cx, *cy));
        }
    }
    Ok(())
}
