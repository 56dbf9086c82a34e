//! Local horizontal coordinate frames
//!
//! A local frame is anchored at an ECEF point with tangent-plane axes and a
//! uniform scale. The cached matrices are an orthonormal basis times uniform
//! scale composed with translation, never skewed. Every frame-to-frame
//! composition funnels through ECEF so chained conversions cannot accumulate
//! drift.

use glam::{DMat3, DMat4, DVec3, DVec4};

use crate::core::ellipsoid::{Cartographic, Ellipsoid};

/// Axis convention for a local tangent frame.
///
/// `EastNorthUp` is the right-handed geodetic convention; `EastSouthUp`
/// matches left-handed host engines and is what the georeference uses for
/// its world frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FrameAxes {
    EastNorthUp,
    EastSouthUp,
}

/// Tangent-plane basis at an ECEF position, as columns (east, north, up).
///
/// Undefined at the exact poles and at the center; callers are responsible
/// for keeping anchor points away from the degenerate axis.
pub fn east_north_up_to_ecef(position: DVec3, ellipsoid: &Ellipsoid) -> DMat3 {
    let up = ellipsoid.geodetic_surface_normal(position);
    let east = DVec3::new(-position.y, position.x, 0.0).normalize();
    let north = up.cross(east);
    DMat3::from_cols(east, north, up)
}

/// A local frame anchored at an ECEF center point.
///
/// Owns the cached transform pair; recomputed only through construction,
/// never mutated in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalHorizontalCoordinateSystem {
    local_to_ecef: DMat4,
    ecef_to_local: DMat4,
    scale: f64,
}

impl LocalHorizontalCoordinateSystem {
    /// Build a frame at an ECEF origin with the given axes and scale
    /// (meters per local unit).
    pub fn from_ecef(
        origin: DVec3,
        axes: FrameAxes,
        scale: f64,
        ellipsoid: &Ellipsoid,
    ) -> Self {
        let basis = east_north_up_to_ecef(origin, ellipsoid);
        let (x_axis, y_axis) = match axes {
            FrameAxes::EastNorthUp => (basis.x_axis, basis.y_axis),
            FrameAxes::EastSouthUp => (basis.x_axis, -basis.y_axis),
        };
        let z_axis = basis.z_axis;

        let local_to_ecef = DMat4::from_cols(
            (x_axis * scale).extend(0.0),
            (y_axis * scale).extend(0.0),
            (z_axis * scale).extend(0.0),
            origin.extend(1.0),
        );

        Self {
            local_to_ecef,
            ecef_to_local: local_to_ecef.inverse(),
            scale,
        }
    }

    /// Build a frame at a cartographic origin.
    pub fn from_cartographic(
        origin: Cartographic,
        axes: FrameAxes,
        scale: f64,
        ellipsoid: &Ellipsoid,
    ) -> Self {
        Self::from_ecef(ellipsoid.cartographic_to_ecef(origin), axes, scale, ellipsoid)
    }

    /// The identity frame: local coordinates are ECEF itself.
    pub fn ecef_aligned() -> Self {
        Self {
            local_to_ecef: DMat4::IDENTITY,
            ecef_to_local: DMat4::IDENTITY,
            scale: 1.0,
        }
    }

    /// A frame at the ECEF origin with no geodetic alignment: scaled
    /// identity with the Y axis flipped for left-handed hosts.
    pub fn unaligned_at_center(scale: f64) -> Self {
        let local_to_ecef = DMat4::from_cols(
            DVec4::new(scale, 0.0, 0.0, 0.0),
            DVec4::new(0.0, -scale, 0.0, 0.0),
            DVec4::new(0.0, 0.0, scale, 0.0),
            DVec4::new(0.0, 0.0, 0.0, 1.0),
        );
        Self {
            local_to_ecef,
            ecef_to_local: local_to_ecef.inverse(),
            scale,
        }
    }

    /// Meters per local unit.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// ECEF position of the frame center.
    pub fn origin(&self) -> DVec3 {
        self.local_to_ecef.w_axis.truncate()
    }

    /// The cached local-to-ECEF matrix.
    pub fn local_to_ecef_matrix(&self) -> DMat4 {
        self.local_to_ecef
    }

    /// The cached ECEF-to-local matrix.
    pub fn ecef_to_local_matrix(&self) -> DMat4 {
        self.ecef_to_local
    }

    /// Transform an ECEF position into this frame. Always succeeds.
    pub fn ecef_to_local_position(&self, ecef: DVec3) -> DVec3 {
        self.ecef_to_local.transform_point3(ecef)
    }

    /// Transform a local position into ECEF. Always succeeds.
    pub fn local_to_ecef_position(&self, local: DVec3) -> DVec3 {
        self.local_to_ecef.transform_point3(local)
    }

    /// Matrix mapping this frame into `other`, composed through ECEF as the
    /// canonical intermediate.
    pub fn compute_transform_to(&self, other: &LocalHorizontalCoordinateSystem) -> DMat4 {
        other.ecef_to_local * self.local_to_ecef
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ellipsoid::WGS84_RADIUS_EQUATORIAL;

    fn assert_vec_close(a: DVec3, b: DVec3, eps: f64) {
        let diff = (a - b).length();
        assert!(diff <= eps, "expected {a:?} ~= {b:?} (diff {diff})");
    }

    #[test]
    fn enu_basis_at_equator() {
        let basis = east_north_up_to_ecef(
            DVec3::new(WGS84_RADIUS_EQUATORIAL, 0.0, 0.0),
            &Ellipsoid::WGS84,
        );

        assert_vec_close(basis.x_axis, DVec3::Y, 1e-12); // east
        assert_vec_close(basis.y_axis, DVec3::Z, 1e-12); // north
        assert_vec_close(basis.z_axis, DVec3::X, 1e-12); // up
    }

    #[test]
    fn frame_round_trip() {
        let frame = LocalHorizontalCoordinateSystem::from_cartographic(
            Cartographic::from_degrees(12.49, 41.89, 50.0),
            FrameAxes::EastSouthUp,
            1.0,
            &Ellipsoid::WGS84,
        );

        let local = DVec3::new(135.0, -22.5, 7.75);
        let back = frame.ecef_to_local_position(frame.local_to_ecef_position(local));
        assert_vec_close(back, local, 1e-8);
    }

    #[test]
    fn frame_origin_maps_to_local_zero() {
        let origin = Cartographic::from_degrees(-47.88, -15.79, 1_100.0);
        let ellipsoid = Ellipsoid::WGS84;
        let frame = LocalHorizontalCoordinateSystem::from_cartographic(
            origin,
            FrameAxes::EastNorthUp,
            1.0,
            &ellipsoid,
        );

        let local = frame.ecef_to_local_position(ellipsoid.cartographic_to_ecef(origin));
        assert_vec_close(local, DVec3::ZERO, 1e-8);
    }

    #[test]
    fn scale_applies_uniformly() {
        // A frame with 100 meters per unit: one local unit east is 100
        // meters of ECEF displacement.
        let frame = LocalHorizontalCoordinateSystem::from_ecef(
            DVec3::new(WGS84_RADIUS_EQUATORIAL, 0.0, 0.0),
            FrameAxes::EastNorthUp,
            100.0,
            &Ellipsoid::WGS84,
        );

        let moved = frame.local_to_ecef_position(DVec3::X);
        let expected = DVec3::new(WGS84_RADIUS_EQUATORIAL, 100.0, 0.0);
        assert_vec_close(moved, expected, 1e-6);
    }

    #[test]
    fn east_south_up_flips_second_axis() {
        let position = DVec3::new(WGS84_RADIUS_EQUATORIAL, 0.0, 0.0);
        let enu = LocalHorizontalCoordinateSystem::from_ecef(
            position,
            FrameAxes::EastNorthUp,
            1.0,
            &Ellipsoid::WGS84,
        );
        let esu = LocalHorizontalCoordinateSystem::from_ecef(
            position,
            FrameAxes::EastSouthUp,
            1.0,
            &Ellipsoid::WGS84,
        );

        let north_of_origin = position + DVec3::Z * 10.0;
        let in_enu = enu.ecef_to_local_position(north_of_origin);
        let in_esu = esu.ecef_to_local_position(north_of_origin);

        assert_vec_close(in_enu, DVec3::new(0.0, 10.0, 0.0), 1e-6);
        assert_vec_close(in_esu, DVec3::new(0.0, -10.0, 0.0), 1e-6);
    }

    #[test]
    fn unaligned_frame_flips_y() {
        let frame = LocalHorizontalCoordinateSystem::unaligned_at_center(2.0);
        let ecef = frame.local_to_ecef_position(DVec3::new(1.0, 1.0, 1.0));
        assert_vec_close(ecef, DVec3::new(2.0, -2.0, 2.0), 1e-12);
    }

    #[test]
    fn frame_to_frame_goes_through_ecef() {
        let ellipsoid = Ellipsoid::WGS84;
        let a = LocalHorizontalCoordinateSystem::from_cartographic(
            Cartographic::from_degrees(10.0, 20.0, 0.0),
            FrameAxes::EastSouthUp,
            1.0,
            &ellipsoid,
        );
        let b = LocalHorizontalCoordinateSystem::from_cartographic(
            Cartographic::from_degrees(-25.0, 15.0, 0.0),
            FrameAxes::EastSouthUp,
            1.0,
            &ellipsoid,
        );

        let a_to_b = a.compute_transform_to(&b);
        let p = DVec3::new(10.0, 20.0, 30.0);

        let direct = a_to_b.transform_point3(p);
        let via_ecef = b.ecef_to_local_position(a.local_to_ecef_position(p));
        assert_vec_close(direct, via_ecef, 1e-8);
    }
}
