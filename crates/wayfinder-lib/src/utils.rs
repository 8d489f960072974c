//! Utility functions for coordinate conversions and spatial operations
//!
//! Coordinates are `geo::Coord<f64>` with `x` = longitude and `y` = latitude,
//! matching the persisted graph format. Great-circle measurements go through
//! `geo`'s Haversine metric space; planar work (closest point on a segment,
//! hit-testing) happens in Web Mercator meters.

use geo::{Bearing, Coord, Destination, Distance, Haversine, Point};
use std::f64::consts::PI;

/// Half-width of the Web Mercator plane in meters (EPSG:3857)
pub const EARTH_MERCATOR_MAX: f64 = 20037508.34;

/// Maximum latitude that can be represented in Web Mercator
pub const MAX_LATITUDE: f64 = 85.05112878;

/// Precomputed constant: EARTH_MERCATOR_MAX / 180.0
const LON_TO_X_FACTOR: f64 = EARTH_MERCATOR_MAX / 180.0;

/// Precomputed constant: EARTH_MERCATOR_MAX / PI
const Y_FACTOR: f64 = EARTH_MERCATOR_MAX / PI;

/// Precomputed constant: 180.0 / EARTH_MERCATOR_MAX
const X_TO_LON_FACTOR: f64 = 180.0 / EARTH_MERCATOR_MAX;

/// Precomputed constant: PI / EARTH_MERCATOR_MAX
const Y_TO_LAT_FACTOR: f64 = PI / EARTH_MERCATOR_MAX;

/// Convert WGS84 (lat, lon) to Web Mercator (x, y) in meters
///
/// # Arguments
/// * `lat` - Latitude in degrees (-85.05 to 85.05)
/// * `lon` - Longitude in degrees (-180 to 180)
///
/// # Returns
/// A `Point<f64>` with x (easting) and y (northing) in meters
#[inline(always)]
pub fn wgs84_to_mercator(lat: f64, lon: f64) -> Point<f64> {
    // Clamp latitude to valid Web Mercator range
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);

    let x = lon * LON_TO_X_FACTOR;
    let lat_rad = lat.to_radians();
    let y = (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() * Y_FACTOR;

    Point::new(x, y)
}

/// Convert Web Mercator (x, y) in meters to WGS84 (lat, lon)
#[inline(always)]
pub fn mercator_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let lon = x * X_TO_LON_FACTOR;
    let lat = (PI / 2.0 - 2.0 * ((-y * Y_TO_LAT_FACTOR).exp()).atan()).to_degrees();
    (lat, lon)
}

/// Convert a lon/lat coordinate to a Web Mercator coordinate
#[inline]
pub fn coord_to_mercator(coord: Coord<f64>) -> Coord<f64> {
    wgs84_to_mercator(coord.y, coord.x).into()
}

/// Convert a Web Mercator coordinate back to lon/lat
#[inline]
pub fn mercator_to_coord(mercator: Coord<f64>) -> Coord<f64> {
    let (lat, lon) = mercator_to_wgs84(mercator.x, mercator.y);
    Coord { x: lon, y: lat }
}

/// Great-circle distance in meters between two lon/lat coordinates
#[inline]
pub fn distance_m(a: Coord<f64>, b: Coord<f64>) -> f64 {
    Haversine.distance(Point::from(a), Point::from(b))
}

/// Initial great-circle bearing from `a` to `b`, in radians clockwise from north
#[inline]
pub fn bearing_rad(a: Coord<f64>, b: Coord<f64>) -> f64 {
    normalize_angle(Haversine.bearing(Point::from(a), Point::from(b)).to_radians())
}

/// Move `origin` by `east_m` meters east and `north_m` meters north
pub fn offset_m(origin: Coord<f64>, east_m: f64, north_m: f64) -> Coord<f64> {
    let distance = east_m.hypot(north_m);
    if distance == 0.0 {
        return origin;
    }
    let bearing = east_m.atan2(north_m).to_degrees();
    Haversine
        .destination(Point::from(origin), bearing, distance)
        .into()
}

/// Wrap an angle in radians to the half-open range (-π, π]
#[inline]
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(2.0 * PI);
    if wrapped > PI { wrapped - 2.0 * PI } else { wrapped }
}

/// Signed turn angle at `at` when walking `from -> at -> to`
///
/// Positive values turn right (clockwise), negative values turn left.
pub fn turn_angle(from: Coord<f64>, at: Coord<f64>, to: Coord<f64>) -> f64 {
    let incoming = bearing_rad(from, at);
    let outgoing = bearing_rad(at, to);
    normalize_angle(outgoing - incoming)
}

/// Closest point on a segment to some position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentProjection {
    /// The projected point (lon/lat)
    pub point: Coord<f64>,
    /// Parameter along the segment, clamped to [0, 1]
    pub t: f64,
    /// Great-circle distance from the position to `point` in meters
    pub distance_m: f64,
}

/// Project `position` onto the segment `a -> b`
///
/// The closest point is computed in Web Mercator space, which is conformal and
/// accurate enough at building scale. Degenerate segments project onto `a`.
pub fn project_onto_segment(
    position: Coord<f64>,
    a: Coord<f64>,
    b: Coord<f64>,
) -> SegmentProjection {
    let p = coord_to_mercator(position);
    let ma = coord_to_mercator(a);
    let mb = coord_to_mercator(b);

    let dx = mb.x - ma.x;
    let dy = mb.y - ma.y;
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq <= f64::EPSILON {
        0.0
    } else {
        (((p.x - ma.x) * dx + (p.y - ma.y) * dy) / len_sq).clamp(0.0, 1.0)
    };

    let point = if t == 0.0 {
        a
    } else if t == 1.0 {
        b
    } else {
        mercator_to_coord(Coord {
            x: ma.x + t * dx,
            y: ma.y + t * dy,
        })
    };

    SegmentProjection {
        point,
        t,
        distance_m: distance_m(position, point),
    }
}

/// Converts world coordinates to local screen pixels.
///
/// Implemented by the rendering collaborator; used for pixel-radius hit tests.
pub trait ScreenProjector {
    /// Project a lon/lat coordinate to a pixel position
    fn to_screen(&self, coord: Coord<f64>) -> Coord<f64>;
}

/// A north-up Web Mercator viewport with a fixed scale
#[derive(Debug, Clone, Copy)]
pub struct MercatorViewport {
    /// Lon/lat shown at pixel (0, 0)
    pub origin: Coord<f64>,
    /// Mercator meters covered by one pixel
    pub meters_per_pixel: f64,
}

impl ScreenProjector for MercatorViewport {
    fn to_screen(&self, coord: Coord<f64>) -> Coord<f64> {
        let origin = coord_to_mercator(self.origin);
        let m = coord_to_mercator(coord);
        Coord {
            x: (m.x - origin.x) / self.meters_per_pixel,
            // Screen y grows downwards
            y: (origin.y - m.y) / self.meters_per_pixel,
        }
    }
}

/// Pixel distance from `p` to the segment `a -> b`
pub fn pixel_distance_to_segment(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq <= f64::EPSILON {
        0.0
    } else {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0)
    };
    (p.x - (a.x + t * dx)).hypot(p.y - (a.y + t * dy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const ORIGIN: Coord<f64> = Coord {
        x: -0.1278,
        y: 51.5074,
    };

    #[test]
    fn test_wgs84_to_mercator_origin() {
        let point = wgs84_to_mercator(0.0, 0.0);
        assert!((point.x() - 0.0).abs() < 0.01);
        assert!((point.y() - 0.0).abs() < 0.01);
    }

    #[test]
    fn test_mercator_roundtrip() {
        let back = mercator_to_coord(coord_to_mercator(ORIGIN));
        assert!((back.x - ORIGIN.x).abs() < 1e-9);
        assert!((back.y - ORIGIN.y).abs() < 1e-9);
    }

    #[test]
    fn test_offset_distance() {
        let moved = offset_m(ORIGIN, 30.0, 40.0);
        assert_relative_eq!(distance_m(ORIGIN, moved), 50.0, max_relative = 1e-3);
        assert_eq!(offset_m(ORIGIN, 0.0, 0.0), ORIGIN);
    }

    #[test]
    fn test_bearing_east_is_quarter_turn() {
        let east = offset_m(ORIGIN, 10.0, 0.0);
        assert_relative_eq!(bearing_rad(ORIGIN, east), PI / 2.0, epsilon = 1e-3);
    }

    #[test]
    fn test_normalize_angle_range() {
        assert_relative_eq!(normalize_angle(PI), PI);
        assert_relative_eq!(normalize_angle(-PI), PI);
        assert_relative_eq!(normalize_angle(3.0 * PI / 2.0), -PI / 2.0);
        assert_relative_eq!(normalize_angle(0.25), 0.25);
    }

    #[test]
    fn test_turn_angle_right_and_left() {
        let a = ORIGIN;
        let b = offset_m(ORIGIN, 0.0, 10.0);
        let right = offset_m(ORIGIN, 10.0, 10.0);
        let left = offset_m(ORIGIN, -10.0, 10.0);
        let straight = offset_m(ORIGIN, 0.0, 20.0);

        assert_relative_eq!(turn_angle(a, b, right), PI / 2.0, epsilon = 1e-3);
        assert_relative_eq!(turn_angle(a, b, left), -PI / 2.0, epsilon = 1e-3);
        assert!(turn_angle(a, b, straight).abs() < 1e-3);
    }

    #[test]
    fn test_project_onto_segment_interior_and_clamped() {
        let a = ORIGIN;
        let b = offset_m(ORIGIN, 20.0, 0.0);

        let above_middle = offset_m(ORIGIN, 10.0, 5.0);
        let proj = project_onto_segment(above_middle, a, b);
        assert_relative_eq!(proj.t, 0.5, epsilon = 1e-3);
        assert_relative_eq!(proj.distance_m, 5.0, max_relative = 1e-2);

        let before_start = offset_m(ORIGIN, -10.0, 0.0);
        let proj = project_onto_segment(before_start, a, b);
        assert_eq!(proj.t, 0.0);
        assert_eq!(proj.point, a);
        assert_relative_eq!(proj.distance_m, 10.0, max_relative = 1e-3);
    }

    #[test]
    fn test_project_onto_degenerate_segment() {
        let p = offset_m(ORIGIN, 3.0, 4.0);
        let proj = project_onto_segment(p, ORIGIN, ORIGIN);
        assert_eq!(proj.point, ORIGIN);
        assert_relative_eq!(proj.distance_m, 5.0, max_relative = 1e-3);
    }

    #[test]
    fn test_mercator_viewport_pixels() {
        let viewport = MercatorViewport {
            origin: ORIGIN,
            meters_per_pixel: 0.5,
        };
        let px = viewport.to_screen(ORIGIN);
        assert!(px.x.abs() < 1e-9 && px.y.abs() < 1e-9);

        // Moving north decreases the screen y coordinate
        let north = viewport.to_screen(offset_m(ORIGIN, 0.0, 10.0));
        assert!(north.y < 0.0);
    }

    #[test]
    fn test_pixel_distance_to_segment() {
        let a = Coord { x: 0.0, y: 0.0 };
        let b = Coord { x: 10.0, y: 0.0 };
        assert_relative_eq!(pixel_distance_to_segment(Coord { x: 5.0, y: 3.0 }, a, b), 3.0);
        assert_relative_eq!(pixel_distance_to_segment(Coord { x: 13.0, y: 4.0 }, a, b), 5.0);
    }
}
