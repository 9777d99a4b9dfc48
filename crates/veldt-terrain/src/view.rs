//! Camera state consumed by the level-of-detail traversal.

use glam::{Mat4, Vec3};
use veldt_math::Frustum;

/// Immutable snapshot of the camera for one terrain update.
#[derive(Clone, Copy, Debug)]
pub struct ViewState {
    /// Camera position in world space.
    pub position: Vec3,
    /// Unit view direction.
    pub forward: Vec3,
    /// Unit right vector in the view plane.
    pub right: Vec3,
    /// Combined projection * view matrix.
    pub view_projection: Mat4,
    /// Frustum extracted from `view_projection`.
    pub frustum: Frustum,
}

impl ViewState {
    /// Build a view snapshot from camera basis vectors and a projection.
    pub fn new(position: Vec3, forward: Vec3, up: Vec3, projection: Mat4) -> Self {
        let forward = forward.normalize();
        let right = forward.cross(up).normalize();
        let view = Mat4::look_to_rh(position, forward, up);
        let view_projection = projection * view;
        Self {
            position,
            forward,
            right,
            view_projection,
            frustum: Frustum::from_view_projection(&view_projection),
        }
    }

    /// Screen-space width metric used by block subdivision.
    ///
    /// Projects a synthetic point one block width to the right of the point
    /// on the view ray at the block's distance, so the metric measures how
    /// wide the block appears regardless of where it sits on screen. Returns
    /// the absolute normalized-device x coordinate; values above 1 mean the
    /// block spans more than half the viewport.
    pub fn block_screen_width(&self, block_center: Vec3, block_width: f32) -> f32 {
        let distance = self.position.distance(block_center);
        let probe = self.position + self.forward * distance + self.right * block_width;
        let clip = self.view_projection * probe.extend(1.0);
        if clip.w.abs() <= f32::EPSILON {
            // Degenerate projection at the camera plane; treat as maximally
            // large so the block subdivides.
            return f32::MAX;
        }
        (clip.x / clip.w).abs()
    }

    /// Cosine of the angle between the view direction and the direction to
    /// `point`, used for the close-distance visibility override.
    pub fn facing_dot(&self, point: Vec3) -> f32 {
        let to_point = point - self.position;
        let len = to_point.length();
        if len <= f32::EPSILON {
            // The camera is standing on the point.
            return 1.0;
        }
        (to_point / len).dot(self.forward)
    }

    /// Convenience check against `view_projection`'s last row for points at
    /// infinity, used by tests.
    #[cfg(test)]
    fn project(&self, point: Vec3) -> Vec3 {
        use glam::Vec4Swizzles;
        let clip = self.view_projection * point.extend(1.0);
        clip.xyz() / clip.w
    }
}
