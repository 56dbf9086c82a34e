//! Ellipsoid model and cartographic conversions
//!
//! All conversions run in f64. The cartesian-to-cartographic direction goes
//! through an iterative geodetic surface projection and reports failure as
//! `None` when the input point is too close to the ellipsoid center for the
//! surface-relative decomposition to be numerically meaningful.

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// WGS84 semi-major axis (meters).
pub const WGS84_RADIUS_EQUATORIAL: f64 = 6_378_137.0;
/// WGS84 semi-minor axis (meters).
pub const WGS84_RADIUS_POLAR: f64 = 6_356_752.314_245_179;

/// Convergence tolerance for the geodetic surface projection.
const SURFACE_PROJECTION_EPSILON: f64 = 1e-12;

/// Squared-norm threshold (in ellipsoid-scaled space) below which a point is
/// considered too close to the center to project.
const CENTER_TOLERANCE_SQUARED: f64 = 0.1;

/// Geodetic position: longitude/latitude in radians, height in meters.
///
/// Longitude is in (-π, π], latitude in [-π/2, π/2].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cartographic {
    /// Longitude in radians.
    pub longitude: f64,
    /// Latitude in radians.
    pub latitude: f64,
    /// Height above the ellipsoid surface in meters.
    pub height: f64,
}

impl Cartographic {
    /// Create from radians.
    pub fn new(longitude: f64, latitude: f64, height: f64) -> Self {
        Self {
            longitude,
            latitude,
            height,
        }
    }

    /// Create from degrees.
    pub fn from_degrees(longitude: f64, latitude: f64, height: f64) -> Self {
        Self {
            longitude: longitude.to_radians(),
            latitude: latitude.to_radians(),
            height,
        }
    }

    /// Longitude in degrees.
    pub fn longitude_degrees(&self) -> f64 {
        self.longitude.to_degrees()
    }

    /// Latitude in degrees.
    pub fn latitude_degrees(&self) -> f64 {
        self.latitude.to_degrees()
    }

    /// Wrap longitude into (-π, π] and clamp latitude into [-π/2, π/2].
    pub fn normalized(&self) -> Self {
        use std::f64::consts::{PI, TAU};

        let mut longitude = self.longitude.rem_euclid(TAU);
        if longitude > PI {
            longitude -= TAU;
        }

        Self {
            longitude,
            latitude: self.latitude.clamp(-PI / 2.0, PI / 2.0),
            height: self.height,
        }
    }
}

/// An ellipsoid of revolution (or any triaxial ellipsoid) centered at the
/// origin of the ECEF frame.
///
/// Immutable after construction; reciprocal radii are precomputed because
/// every conversion needs them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    radii: DVec3,
    radii_squared: DVec3,
    one_over_radii: DVec3,
    one_over_radii_squared: DVec3,
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::WGS84
    }
}

impl Ellipsoid {
    /// The WGS84 Earth ellipsoid.
    pub const WGS84: Self = Self::from_radii(DVec3::new(
        WGS84_RADIUS_EQUATORIAL,
        WGS84_RADIUS_EQUATORIAL,
        WGS84_RADIUS_POLAR,
    ));

    /// Construct from per-axis radii in meters.
    ///
    /// # Panics
    ///
    /// Panics if any radius is not strictly positive. Persisted input is
    /// validated before reaching this constructor.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        assert!(
            x > 0.0 && y > 0.0 && z > 0.0,
            "ellipsoid radii must be positive: ({x}, {y}, {z})"
        );
        Self::from_radii(DVec3::new(x, y, z))
    }

    const fn from_radii(radii: DVec3) -> Self {
        Self {
            radii,
            radii_squared: DVec3::new(
                radii.x * radii.x,
                radii.y * radii.y,
                radii.z * radii.z,
            ),
            one_over_radii: DVec3::new(1.0 / radii.x, 1.0 / radii.y, 1.0 / radii.z),
            one_over_radii_squared: DVec3::new(
                1.0 / (radii.x * radii.x),
                1.0 / (radii.y * radii.y),
                1.0 / (radii.z * radii.z),
            ),
        }
    }

    /// Per-axis radii in meters.
    pub fn radii(&self) -> DVec3 {
        self.radii
    }

    /// Largest of the three radii.
    pub fn maximum_radius(&self) -> f64 {
        self.radii.x.max(self.radii.y).max(self.radii.z)
    }

    /// Outward unit normal of the ellipsoid surface below `position`.
    ///
    /// Undefined (NaN) at the exact center; callers are expected to keep
    /// positions away from the degenerate point.
    pub fn geodetic_surface_normal(&self, position: DVec3) -> DVec3 {
        (position * self.one_over_radii_squared).normalize()
    }

    /// Outward unit normal at a cartographic position. Always well-defined.
    pub fn geodetic_surface_normal_cartographic(&self, carto: Cartographic) -> DVec3 {
        let cos_lat = carto.latitude.cos();
        DVec3::new(
            cos_lat * carto.longitude.cos(),
            cos_lat * carto.longitude.sin(),
            carto.latitude.sin(),
        )
        .normalize()
    }

    /// Convert a cartographic position to ECEF. Total for finite input.
    pub fn cartographic_to_ecef(&self, carto: Cartographic) -> DVec3 {
        let normal = self.geodetic_surface_normal_cartographic(carto);
        let k = self.radii_squared * normal;
        let gamma = normal.dot(k).sqrt();
        k / gamma + normal * carto.height
    }

    /// Convert an ECEF position to cartographic.
    ///
    /// Returns `None` when the point is too close to the center for the
    /// surface projection to converge.
    pub fn ecef_to_cartographic(&self, position: DVec3) -> Option<Cartographic> {
        let surface = self.scale_to_geodetic_surface(position)?;
        let normal = self.geodetic_surface_normal(surface);
        let height_vector = position - surface;

        let longitude = normal.y.atan2(normal.x);
        let latitude = normal.z.clamp(-1.0, 1.0).asin();
        let height = height_vector.dot(position).signum() * height_vector.length();

        Some(Cartographic::new(longitude, latitude, height))
    }

    /// Project `position` along the geodetic normal onto the ellipsoid
    /// surface.
    ///
    /// Uses the standard iterative scaling: an initial radial intersection
    /// seeds a Newton iteration on the Lagrange multiplier of the closest
    /// surface point. Returns `None` for points so close to the center that
    /// the decomposition is meaningless.
    pub fn scale_to_geodetic_surface(&self, position: DVec3) -> Option<DVec3> {
        let scaled = position * self.one_over_radii;
        let squared_norm = scaled.length_squared();
        if squared_norm < CENTER_TOLERANCE_SQUARED {
            return None;
        }

        let ratio = (1.0 / squared_norm).sqrt();
        if !ratio.is_finite() {
            return None;
        }
        let intersection = position * ratio;

        let p2 = position * position;
        let scaled2 = p2 * self.one_over_radii_squared;

        let gradient = intersection * self.one_over_radii_squared * 2.0;
        let mut lambda = (1.0 - ratio) * position.length() / (0.5 * gradient.length());
        let mut correction = 0.0;

        let mut multiplier;
        loop {
            lambda -= correction;

            multiplier = DVec3::new(
                1.0 / (1.0 + lambda * self.one_over_radii_squared.x),
                1.0 / (1.0 + lambda * self.one_over_radii_squared.y),
                1.0 / (1.0 + lambda * self.one_over_radii_squared.z),
            );

            let m2 = multiplier * multiplier;
            let m3 = m2 * multiplier;

            let func = scaled2.dot(m2) - 1.0;
            if func.abs() < SURFACE_PROJECTION_EPSILON {
                break;
            }

            let denominator = (scaled2 * m3 * self.one_over_radii_squared).element_sum();
            let derivative = -2.0 * denominator;
            correction = func / derivative;
        }

        Some(position * multiplier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn wgs84_equator_prime_meridian() {
        let ecef = Ellipsoid::WGS84.cartographic_to_ecef(Cartographic::from_degrees(0.0, 0.0, 0.0));
        assert_close(ecef.x, WGS84_RADIUS_EQUATORIAL, 1e-6);
        assert_close(ecef.y, 0.0, 1e-6);
        assert_close(ecef.z, 0.0, 1e-6);
    }

    #[test]
    fn wgs84_north_pole() {
        let ecef =
            Ellipsoid::WGS84.cartographic_to_ecef(Cartographic::from_degrees(0.0, 90.0, 0.0));
        assert_close(ecef.x, 0.0, 1e-6);
        assert_close(ecef.y, 0.0, 1e-6);
        assert_close(ecef.z, WGS84_RADIUS_POLAR, 1e-6);
    }

    #[test]
    fn equatorial_point_back_to_cartographic() {
        let carto = Ellipsoid::WGS84
            .ecef_to_cartographic(DVec3::new(WGS84_RADIUS_EQUATORIAL, 0.0, 0.0))
            .unwrap();
        assert_close(carto.longitude, 0.0, 1e-12);
        assert_close(carto.latitude, 0.0, 1e-12);
        assert_close(carto.height, 0.0, 1e-6);
    }

    #[test]
    fn round_trip_mid_latitude() {
        let carto = Cartographic::from_degrees(-73.985, 40.748, 527.0);
        let ellipsoid = Ellipsoid::WGS84;

        let ecef = ellipsoid.cartographic_to_ecef(carto);
        let back = ellipsoid.ecef_to_cartographic(ecef).unwrap();

        assert_close(back.longitude, carto.longitude, 1e-12);
        assert_close(back.latitude, carto.latitude, 1e-12);
        assert_close(back.height, carto.height, 1e-6);
    }

    #[test]
    fn round_trip_ecef_relative_tolerance() {
        let ellipsoid = Ellipsoid::WGS84;
        let points = [
            DVec3::new(4_517_590.0, 832_293.0, 4_487_348.0),
            DVec3::new(-2_694_045.0, -4_293_642.0, 3_857_878.0),
            DVec3::new(0.0, 0.0, 7_000_000.0),
            DVec3::new(1_000_000.0, 1_000_000.0, 1_000_000.0),
        ];

        for p in points {
            let carto = ellipsoid.ecef_to_cartographic(p).unwrap();
            let back = ellipsoid.cartographic_to_ecef(carto);
            let relative = (back - p).length() / p.length();
            assert!(relative < 1e-6, "round trip drifted for {p:?}: {relative}");
        }
    }

    #[test]
    fn near_center_projection_fails() {
        let ellipsoid = Ellipsoid::WGS84;
        assert!(ellipsoid.ecef_to_cartographic(DVec3::ZERO).is_none());
        assert!(ellipsoid
            .ecef_to_cartographic(DVec3::new(1.0, 2.0, -1.0))
            .is_none());
    }

    #[test]
    fn surface_normal_points_outward() {
        let ellipsoid = Ellipsoid::WGS84;
        let normal =
            ellipsoid.geodetic_surface_normal(DVec3::new(WGS84_RADIUS_EQUATORIAL, 0.0, 0.0));
        assert_close(normal.x, 1.0, 1e-12);
        assert_close(normal.y, 0.0, 1e-12);
        assert_close(normal.z, 0.0, 1e-12);
    }

    #[test]
    fn height_below_surface_is_negative() {
        let ellipsoid = Ellipsoid::WGS84;
        let inside = DVec3::new(WGS84_RADIUS_EQUATORIAL - 1_000.0, 0.0, 0.0);
        let carto = ellipsoid.ecef_to_cartographic(inside).unwrap();
        assert_close(carto.height, -1_000.0, 1e-6);
    }

    #[test]
    fn cartographic_normalization() {
        let carto = Cartographic::from_degrees(200.0, 95.0, 0.0).normalized();
        assert_close(carto.longitude_degrees(), -160.0, 1e-9);
        assert_close(carto.latitude_degrees(), 90.0, 1e-9);
    }

    #[test]
    #[should_panic(expected = "ellipsoid radii must be positive")]
    fn rejects_non_positive_radius() {
        let _ = Ellipsoid::new(6_378_137.0, 0.0, 6_356_752.0);
    }
}
