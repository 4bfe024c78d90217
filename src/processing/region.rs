//! Geographic regions: the footprint of a location's non-zero mass

use geo::{Area, BooleanOps, BoundingRect, Contains, Coord, LineString, MultiPolygon, Point, Polygon, Rect};

/// A possibly non-rectangular area in lon/lat coordinates.
///
/// Axis-aligned rectangles are the common case (maps, loaded
/// locations) and are intersected exactly; everything else goes through
/// polygon boolean operations.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    shape: MultiPolygon<f64>,
}

impl Region {
    pub fn empty() -> Self {
        Self { shape: MultiPolygon::new(vec![]) }
    }

    /// Rectangle from west, south, east, north
    pub fn rect(west: f64, south: f64, east: f64, north: f64) -> Self {
        let rect = Rect::new(Coord { x: west, y: south }, Coord { x: east, y: north });
        Self { shape: MultiPolygon::new(vec![rect.to_polygon()]) }
    }

    pub fn from_polygon(polygon: Polygon<f64>) -> Self {
        Self { shape: MultiPolygon::new(vec![polygon]) }
    }

    pub fn is_empty(&self) -> bool {
        self.shape.0.iter().all(|p| p.exterior().0.is_empty())
    }

    /// (west, south, east, north) of the bounding rectangle, or `None`
    /// for an empty region
    pub fn bounds(&self) -> Option<[f64; 4]> {
        if self.is_empty() {
            return None;
        }
        self.shape
            .bounding_rect()
            .map(|r| [r.min().x, r.min().y, r.max().x, r.max().y])
    }

    /// The rectangle this region is, if it is exactly one axis-aligned rectangle
    fn as_rect(&self) -> Option<[f64; 4]> {
        let [polygon] = self.shape.0.as_slice() else {
            return None;
        };
        if !polygon.interiors().is_empty() {
            return None;
        }
        let ring = &polygon.exterior().0;
        if ring.len() != 5 || ring.first() != ring.last() {
            return None;
        }
        let [west, south, east, north] = self.bounds()?;
        let on_corner = |c: &Coord<f64>| (c.x == west || c.x == east) && (c.y == south || c.y == north);
        let axis_aligned = ring.windows(2).all(|w| w[0].x == w[1].x || w[0].y == w[1].y);
        (ring.iter().all(on_corner) && axis_aligned).then_some([west, south, east, north])
    }

    pub fn intersection(&self, other: &Region) -> Region {
        if self.is_empty() || other.is_empty() {
            return Region::empty();
        }
        if self == other {
            return self.clone();
        }
        if let (Some(a), Some(b)) = (self.as_rect(), other.as_rect()) {
            let (west, south) = (a[0].max(b[0]), a[1].max(b[1]));
            let (east, north) = (a[2].min(b[2]), a[3].min(b[3]));
            if west < east && south < north {
                return Region::rect(west, south, east, north);
            }
            return Region::empty();
        }
        Region { shape: self.shape.intersection(&other.shape) }
    }

    pub fn difference(&self, other: &Region) -> Region {
        if self.is_empty() {
            return Region::empty();
        }
        if other.is_empty() {
            return self.clone();
        }
        Region { shape: self.shape.difference(&other.shape) }
    }

    /// Resolve self-overlaps and coincident edges into a clean shape
    pub fn normalized(&self) -> Region {
        if self.is_empty() {
            return Region::empty();
        }
        Region { shape: self.shape.union(&MultiPolygon::new(vec![])) }
    }

    /// Strict containment: points on the boundary are not contained
    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        self.shape.contains(&Point::new(lon, lat))
    }

    pub fn area(&self) -> f64 {
        self.shape.unsigned_area()
    }

    /// A usable region: non-empty, finite, closed rings and positive area
    pub fn is_valid(&self) -> bool {
        if self.is_empty() {
            return false;
        }
        let ring_ok = |ring: &LineString<f64>| {
            ring.0.len() >= 4
                && ring.0.first() == ring.0.last()
                && ring.0.iter().all(|c| c.x.is_finite() && c.y.is_finite())
        };
        self.shape
            .0
            .iter()
            .all(|p| ring_ok(p.exterior()) && p.interiors().iter().all(ring_ok))
            && self.area() > 0.0
    }

    /// Compact text rendering for diagnostics
    pub fn describe(&self) -> String {
        let polygons: Vec<String> = self
            .shape
            .0
            .iter()
            .map(|p| {
                let coords: Vec<String> = p
                    .exterior()
                    .0
                    .iter()
                    .map(|c| format!("{} {}", c.x, c.y))
                    .collect();
                format!("(({}))", coords.join(", "))
            })
            .collect();
        format!("MULTIPOLYGON ({})", polygons.join(", "))
    }
}
