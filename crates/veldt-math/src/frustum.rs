//! View-frustum extraction and AABB containment classification.
//!
//! Planes are extracted from the combined view-projection matrix with the
//! Griggs-Hartmann method. Containment uses the p-vertex/n-vertex test: for
//! each plane the corner furthest along the normal decides rejection, the
//! corner furthest against it decides full containment.

use glam::{Mat4, Vec3, Vec4};

use crate::Aabb;

/// Plane indices into the frustum planes array.
const LEFT: usize = 0;
const RIGHT: usize = 1;
const BOTTOM: usize = 2;
const TOP: usize = 3;
const NEAR: usize = 4;
const FAR: usize = 5;

/// Result of classifying an AABB against the frustum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Containment {
    /// The AABB is fully inside all six planes.
    Inside,
    /// The AABB straddles at least one plane.
    Intersects,
    /// The AABB is fully outside at least one plane.
    Outside,
}

/// A view frustum defined by six inward-pointing planes.
#[derive(Clone, Copy, Debug)]
pub struct Frustum {
    /// Six planes: left, right, bottom, top, near, far.
    /// Each `Vec4(a, b, c, d)` where `(a,b,c)` is the normalized inward
    /// normal and `d` is the signed distance term.
    planes: [Vec4; 6],
}

impl Frustum {
    /// Extract frustum planes from a combined view-projection matrix.
    ///
    /// Works with both perspective and orthographic projections.
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let rows = [vp.row(0), vp.row(1), vp.row(2), vp.row(3)];

        let mut planes = [Vec4::ZERO; 6];
        planes[LEFT] = rows[3] + rows[0];
        planes[RIGHT] = rows[3] - rows[0];
        planes[BOTTOM] = rows[3] + rows[1];
        planes[TOP] = rows[3] - rows[1];
        planes[NEAR] = rows[3] + rows[2];
        planes[FAR] = rows[3] - rows[2];

        // Normalize each plane so that (a,b,c) is a unit vector.
        for plane in &mut planes {
            let len = plane.truncate().length();
            if len > 0.0 {
                *plane /= len;
            }
        }

        Self { planes }
    }

    /// Classify an AABB as inside, intersecting, or outside the frustum.
    ///
    /// The test is conservative toward `Intersects`: an AABB fully outside
    /// near a frustum corner may be misclassified as intersecting, but a
    /// visible AABB is never reported `Outside`.
    pub fn contains(&self, aabb: &Aabb) -> Containment {
        let mut all_inside = true;

        for plane in &self.planes {
            let normal = plane.truncate();
            let d = plane.w;

            // Positive vertex: the corner furthest along the plane normal.
            let p = Vec3::new(
                if normal.x >= 0.0 { aabb.max.x } else { aabb.min.x },
                if normal.y >= 0.0 { aabb.max.y } else { aabb.min.y },
                if normal.z >= 0.0 { aabb.max.z } else { aabb.min.z },
            );
            if normal.dot(p) + d < 0.0 {
                return Containment::Outside;
            }

            // Negative vertex: the corner furthest against the plane normal.
            let n = Vec3::new(
                if normal.x >= 0.0 { aabb.min.x } else { aabb.max.x },
                if normal.y >= 0.0 { aabb.min.y } else { aabb.max.y },
                if normal.z >= 0.0 { aabb.min.z } else { aabb.max.z },
            );
            if normal.dot(n) + d < 0.0 {
                all_inside = false;
            }
        }

        if all_inside {
            Containment::Inside
        } else {
            Containment::Intersects
        }
    }

    /// Returns `true` if the AABB is at least partially inside the frustum.
    pub fn is_visible(&self, aabb: &Aabb) -> bool {
        self.contains(aabb) != Containment::Outside
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec3};

    fn default_camera_vp() -> Mat4 {
        let view = Mat4::look_to_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_4, 16.0 / 9.0, 0.1, 1000.0);
        proj * view
    }

    #[test]
    fn test_small_object_ahead_is_inside() {
        let frustum = Frustum::from_view_projection(&default_camera_vp());
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, -50.0), Vec3::new(1.0, 1.0, -48.0));
        assert_eq!(frustum.contains(&aabb), Containment::Inside);
    }

    #[test]
    fn test_object_behind_camera_is_outside() {
        let frustum = Frustum::from_view_projection(&default_camera_vp());
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, 5.0), Vec3::new(1.0, 1.0, 10.0));
        assert_eq!(frustum.contains(&aabb), Containment::Outside);
    }

    #[test]
    fn test_object_far_to_the_side_is_outside() {
        let frustum = Frustum::from_view_projection(&default_camera_vp());
        let aabb = Aabb::new(Vec3::new(1000.0, -1.0, -6.0), Vec3::new(1002.0, 1.0, -4.0));
        assert_eq!(frustum.contains(&aabb), Containment::Outside);
    }

    #[test]
    fn test_object_straddling_near_plane_intersects() {
        let frustum = Frustum::from_view_projection(&default_camera_vp());
        // Spans from behind the camera to well in front of it.
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, -10.0), Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(frustum.contains(&aabb), Containment::Intersects);
    }

    #[test]
    fn test_huge_object_enclosing_frustum_intersects() {
        let frustum = Frustum::from_view_projection(&default_camera_vp());
        let aabb = Aabb::new(Vec3::splat(-10_000.0), Vec3::splat(10_000.0));
        assert_eq!(frustum.contains(&aabb), Containment::Intersects);
    }

    #[test]
    fn test_is_visible_matches_containment() {
        let frustum = Frustum::from_view_projection(&default_camera_vp());
        let visible = Aabb::new(Vec3::new(-1.0, -1.0, -50.0), Vec3::new(1.0, 1.0, -48.0));
        let hidden = Aabb::new(Vec3::new(-1.0, -1.0, 5.0), Vec3::new(1.0, 1.0, 10.0));
        assert!(frustum.is_visible(&visible));
        assert!(!frustum.is_visible(&hidden));
    }

    #[test]
    fn test_plane_normals_are_normalized() {
        let frustum = Frustum::from_view_projection(&default_camera_vp());
        for plane in &frustum.planes {
            let normal_len = plane.truncate().length();
            assert!(
                (normal_len - 1.0).abs() < 1e-4,
                "plane normal not normalized: {normal_len}"
            );
        }
    }
}
