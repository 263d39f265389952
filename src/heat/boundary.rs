use crate::hash::hash2;

/// A closed ring of (lng, lat) positions, GeoJSON order
pub type Ring = Vec<(f64, f64)>;

/// Outer rings of one boundary feature
#[derive(Clone, Debug, Default)]
pub struct BoundaryFeature {
    pub rings: Vec<Ring>,
}

/// Landmass polygons used for clipping and the basemap.
/// Immutable once built; `fingerprint` identifies the geometry in cache keys.
#[derive(Clone, Debug)]
pub struct BoundarySet {
    features: Vec<BoundaryFeature>,
    fingerprint: u64,
}

impl BoundarySet {
    pub fn new(features: Vec<BoundaryFeature>) -> Self {
        let mut fingerprint = hash2(features.len() as u64, 0x5eed);
        for feature in &features {
            fingerprint = hash2(fingerprint, feature.rings.len() as u64);
            for ring in &feature.rings {
                fingerprint = hash2(fingerprint, ring.len() as u64);
                for &(lng, lat) in ring {
                    fingerprint = hash2(fingerprint, lng.to_bits());
                    fingerprint = hash2(fingerprint, lat.to_bits());
                }
            }
        }
        Self { features, fingerprint }
    }

    pub fn features(&self) -> &[BoundaryFeature] {
        &self.features
    }

    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        self.features.iter().flat_map(|f| f.rings.iter())
    }

    pub fn ring_count(&self) -> usize {
        self.features.iter().map(|f| f.rings.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.ring_count() == 0
    }
}
