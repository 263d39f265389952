use crate::hash::rand_simple;
use crate::heat::{BoundaryFeature, BoundarySet, HeatPoint};
use anyhow::{Context, Result};
use geojson::{GeoJson, Geometry, Value};
use std::fs;
use std::path::Path;

/// Load a JSON array of points: `[{"lat": .., "lng": .., "intensity": .., "label": ..}]`.
/// `lon` and `weight` are accepted as aliases; intensity defaults to 1.
pub fn load_points(path: &Path) -> Result<Vec<HeatPoint>> {
    let mut bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let points: Vec<HeatPoint> = simd_json::serde::from_slice(&mut bytes)
        .with_context(|| format!("parsing points from {}", path.display()))?;
    log::info!("loaded {} points from {}", points.len(), path.display());
    Ok(points)
}

/// Load landmass polygons from GeoJSON. Each feature keeps the outer ring
/// of every polygon it contains; holes are ignored.
pub fn load_boundaries(path: &Path) -> Result<BoundarySet> {
    let content = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let geojson: GeoJson = content
        .parse()
        .with_context(|| format!("parsing GeoJSON from {}", path.display()))?;

    let mut features = Vec::new();
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                if let Some(ref geometry) = feature.geometry {
                    features.push(feature_rings(geometry));
                }
            }
        }
        GeoJson::Feature(f) => {
            if let Some(ref geometry) = f.geometry {
                features.push(feature_rings(geometry));
            }
        }
        GeoJson::Geometry(ref geometry) => features.push(feature_rings(geometry)),
    }

    let set = BoundarySet::new(features);
    log::info!(
        "loaded {} boundary features ({} rings) from {}",
        set.features().len(),
        set.ring_count(),
        path.display()
    );
    Ok(set)
}

fn feature_rings(geometry: &Geometry) -> BoundaryFeature {
    let mut feature = BoundaryFeature::default();
    collect_outer_rings(geometry, &mut feature.rings);
    feature
}

fn collect_outer_rings(geometry: &Geometry, rings: &mut Vec<Vec<(f64, f64)>>) {
    match &geometry.value {
        Value::Polygon(polygon) => {
            if let Some(exterior) = polygon.first() {
                rings.push(to_ring(exterior));
            }
        }
        Value::MultiPolygon(polygons) => {
            for polygon in polygons {
                if let Some(exterior) = polygon.first() {
                    rings.push(to_ring(exterior));
                }
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                collect_outer_rings(g, rings);
            }
        }
        _ => {}
    }
}

/// Positions without two coordinates become NaN so the clipper drops the ring
fn to_ring(positions: &[Vec<f64>]) -> Vec<(f64, f64)> {
    positions
        .iter()
        .map(|c| match c.as_slice() {
            [lng, lat, ..] => (*lng, *lat),
            _ => (f64::NAN, f64::NAN),
        })
        .collect()
}

/// Major cities weighted by metro population, plus a few jittered satellite
/// points around each so the kernels overlap.
pub fn sample_points() -> Vec<HeatPoint> {
    const CITIES: [(&str, f64, f64, f64); 13] = [
        ("New York", 40.7, -74.0, 18.8),
        ("London", 51.5, -0.1, 9.0),
        ("Paris", 48.9, 2.3, 11.0),
        ("Tokyo", 35.7, 139.7, 37.4),
        ("Sydney", -33.9, 151.2, 5.3),
        ("Rio", -22.9, -43.2, 13.5),
        ("Moscow", 55.8, 37.6, 12.5),
        ("Beijing", 39.9, 116.4, 21.5),
        ("Delhi", 28.6, 77.2, 32.9),
        ("Los Angeles", 34.0, -118.2, 12.4),
        ("Washington", 38.9, -77.0, 5.3),
        ("Mexico City", 19.4, -99.1, 21.8),
        ("Buenos Aires", -34.6, -58.4, 15.0),
    ];
    const SATELLITES: u64 = 4;

    let mut points = Vec::with_capacity(CITIES.len() * (SATELLITES as usize + 1));
    for (i, &(name, lat, lng, millions)) in CITIES.iter().enumerate() {
        points.push(HeatPoint {
            label: Some(name.to_string()),
            ..HeatPoint::new(lat, lng, millions)
        });
        for k in 0..SATELLITES {
            let seed = i as u64 * 16 + k;
            let dlat = (rand_simple(seed * 3) - 0.5) * 6.0;
            let dlng = (rand_simple(seed * 3 + 1) - 0.5) * 8.0;
            let share = 0.1 + rand_simple(seed * 3 + 2) * 0.3;
            points.push(HeatPoint::new(lat + dlat, lng + dlng, millions * share));
        }
    }
    points
}

/// Coarse continent outlines for when no boundary file is available
pub fn simple_world() -> BoundarySet {
    let continents: [&[(f64, f64)]; 6] = [
        // North America
        &[
            (-168.0, 65.0), (-166.0, 60.0), (-141.0, 60.0), (-130.0, 55.0),
            (-125.0, 48.0), (-124.0, 40.0), (-117.0, 32.0), (-110.0, 25.0),
            (-97.0, 25.0), (-97.0, 28.0), (-82.0, 24.0), (-80.0, 25.0),
            (-81.0, 31.0), (-75.0, 35.0), (-70.0, 41.0), (-67.0, 45.0),
            (-65.0, 47.0), (-55.0, 47.0), (-52.0, 47.0), (-55.0, 52.0),
            (-58.0, 55.0), (-64.0, 60.0), (-73.0, 62.0), (-80.0, 63.0),
            (-95.0, 62.0), (-110.0, 68.0), (-130.0, 70.0), (-145.0, 70.0),
            (-168.0, 65.0),
        ],
        // South America
        &[
            (-80.0, 10.0), (-75.0, 5.0), (-70.0, 5.0), (-60.0, 5.0),
            (-50.0, 0.0), (-35.0, -5.0), (-35.0, -10.0), (-38.0, -15.0),
            (-40.0, -22.0), (-48.0, -25.0), (-55.0, -34.0), (-58.0, -38.0),
            (-65.0, -42.0), (-68.0, -50.0), (-75.0, -52.0), (-75.0, -45.0),
            (-72.0, -40.0), (-72.0, -30.0), (-70.0, -20.0), (-70.0, -15.0),
            (-80.0, -5.0), (-80.0, 0.0), (-80.0, 10.0),
        ],
        // Europe
        &[
            (-10.0, 36.0), (-5.0, 36.0), (0.0, 38.0), (5.0, 43.0),
            (10.0, 44.0), (15.0, 45.0), (20.0, 40.0), (25.0, 37.0),
            (30.0, 40.0), (35.0, 42.0), (40.0, 43.0), (40.0, 55.0),
            (30.0, 60.0), (25.0, 65.0), (20.0, 70.0), (10.0, 71.0),
            (5.0, 62.0), (5.0, 58.0), (-5.0, 58.0), (-10.0, 52.0),
            (-5.0, 48.0), (-5.0, 43.0), (-10.0, 36.0),
        ],
        // Africa
        &[
            (-17.0, 15.0), (-17.0, 20.0), (-15.0, 28.0), (-5.0, 35.0),
            (10.0, 37.0), (20.0, 33.0), (25.0, 32.0), (35.0, 30.0),
            (35.0, 20.0), (42.0, 12.0), (50.0, 12.0), (45.0, 5.0),
            (35.0, -5.0), (35.0, -20.0), (35.0, -25.0), (30.0, -30.0),
            (20.0, -35.0), (18.0, -35.0), (15.0, -30.0), (10.0, -15.0),
            (10.0, 0.0), (5.0, 5.0), (-5.0, 5.0), (-10.0, 10.0),
            (-17.0, 15.0),
        ],
        // Asia
        &[
            (35.0, 42.0), (40.0, 43.0), (50.0, 40.0), (55.0, 37.0),
            (60.0, 25.0), (65.0, 25.0), (70.0, 20.0), (75.0, 15.0),
            (80.0, 8.0), (80.0, 15.0), (88.0, 22.0), (92.0, 22.0),
            (95.0, 16.0), (100.0, 14.0), (105.0, 10.0), (110.0, 20.0),
            (115.0, 22.0), (120.0, 22.0), (122.0, 25.0), (125.0, 30.0),
            (130.0, 35.0), (135.0, 35.0), (140.0, 40.0), (145.0, 45.0),
            (145.0, 50.0), (140.0, 55.0), (135.0, 55.0), (130.0, 52.0),
            (130.0, 43.0), (120.0, 40.0), (110.0, 45.0), (90.0, 50.0),
            (70.0, 55.0), (60.0, 55.0), (50.0, 50.0), (40.0, 43.0),
            (35.0, 42.0),
        ],
        // Australia
        &[
            (115.0, -20.0), (120.0, -18.0), (130.0, -12.0), (140.0, -12.0),
            (145.0, -15.0), (150.0, -25.0), (153.0, -30.0), (150.0, -35.0),
            (145.0, -38.0), (140.0, -38.0), (135.0, -35.0), (130.0, -32.0),
            (125.0, -32.0), (115.0, -35.0), (115.0, -25.0), (115.0, -20.0),
        ],
    ];

    BoundarySet::new(
        continents
            .iter()
            .map(|ring| BoundaryFeature {
                rings: vec![ring.to_vec()],
            })
            .collect(),
    )
}
