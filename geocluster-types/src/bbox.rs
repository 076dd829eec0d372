use geo::{Coord, Rect};
use serde::{Deserialize, Serialize};

/// A map viewport in longitude/latitude degrees.
///
/// `west > east` denotes a viewport crossing the antimeridian; the box then
/// covers `[west, 180]` and `[-180, east]`.
///
/// # Examples
///
/// ```
/// use geocluster_types::bbox::BoundingBox;
///
/// let pacific = BoundingBox::new(170.0, -20.0, -170.0, 20.0);
/// assert!(pacific.crosses_antimeridian());
/// assert_eq!(pacific.longitude_ranges(), vec![(170.0, 180.0), (-180.0, -170.0)]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// The whole map.
    pub fn world() -> Self {
        Self::new(-180.0, -90.0, 180.0, 90.0)
    }

    /// Build from the `[west, south, east, north]` layout used by map clients.
    pub fn from_array(bbox: [f64; 4]) -> Self {
        Self::new(bbox[0], bbox[1], bbox[2], bbox[3])
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.east - self.west < 360.0 && self.normalized_west() > self.normalized_east()
    }

    /// Longitude intervals covered by this box after wrapping into [-180, 180].
    ///
    /// Returns one interval, or two when the box crosses the antimeridian.
    /// A box spanning 360 degrees or more covers the full range.
    pub fn longitude_ranges(&self) -> Vec<(f64, f64)> {
        if self.east - self.west >= 360.0 {
            return vec![(-180.0, 180.0)];
        }

        let west = self.normalized_west();
        let east = self.normalized_east();
        if west > east {
            vec![(west, 180.0), (-180.0, east)]
        } else {
            vec![(west, east)]
        }
    }

    /// Latitude interval clamped to [-90, 90].
    pub fn latitude_range(&self) -> (f64, f64) {
        (self.south.clamp(-90.0, 90.0), self.north.clamp(-90.0, 90.0))
    }

    /// Whether a location lies inside the box, honouring antimeridian wrap.
    pub fn contains(&self, longitude: f64, latitude: f64) -> bool {
        let (south, north) = self.latitude_range();
        if latitude < south || latitude > north {
            return false;
        }
        self.longitude_ranges()
            .iter()
            .any(|(west, east)| longitude >= *west && longitude <= *east)
    }

    /// Rectangles covered by this box, one per longitude range.
    pub fn to_rects(&self) -> Vec<Rect<f64>> {
        let (south, north) = self.latitude_range();
        self.longitude_ranges()
            .into_iter()
            .map(|(west, east)| {
                Rect::new(Coord { x: west, y: south }, Coord { x: east, y: north })
            })
            .collect()
    }

    /// A west edge on the antimeridian stays at 180 so it never opens the box.
    fn normalized_west(&self) -> f64 {
        if self.west == 180.0 {
            180.0
        } else {
            wrap_longitude(self.west)
        }
    }

    fn normalized_east(&self) -> f64 {
        if self.east == 180.0 {
            180.0
        } else {
            wrap_longitude(self.east)
        }
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::world()
    }
}

fn wrap_longitude(longitude: f64) -> f64 {
    (longitude + 180.0).rem_euclid(360.0) - 180.0
}
