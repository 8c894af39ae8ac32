//! Scroll-reactive camera.
//!
//! The camera looks straight down -Z at the stroke and retreats and sinks as
//! the page scrolls. The pose is a pure function of scroll progress.

use glam::{Mat4, Vec3};
use serde::Serialize;

pub const BASE_DEPTH: f32 = 6.0;
pub const SCROLL_DEPTH: f32 = 2.0;
pub const SCROLL_DROP: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraPose {
    /// Camera position in world space.
    pub position: [f32; 3],
    /// Field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self::from_scroll(0.0)
    }
}

impl CameraPose {
    pub fn from_scroll(scroll_progress: f32) -> Self {
        Self {
            position: [
                0.0,
                -scroll_progress * SCROLL_DROP,
                BASE_DEPTH + scroll_progress * SCROLL_DEPTH,
            ],
            fov: 45.0,
            near: 0.1,
            far: 100.0,
        }
    }

    pub fn depth(&self) -> f32 {
        self.position[2]
    }

    pub fn height(&self) -> f32 {
        self.position[1]
    }

    pub fn position_vec3(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    /// View matrix looking along -Z; the camera translates without tilting.
    pub fn view_matrix(&self) -> Mat4 {
        let eye = self.position_vec3();
        Mat4::look_at_rh(eye, eye - Vec3::Z, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), aspect, self.near, self.far)
    }

    pub fn view_projection_matrix(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_pose() {
        let pose = CameraPose::default();
        assert_eq!(pose.position, [0.0, 0.0, 6.0]);
        assert_eq!(pose.fov, 45.0);
    }

    #[test]
    fn test_scroll_moves_camera_back_and_down() {
        let pose = CameraPose::from_scroll(0.5);
        assert!((pose.depth() - 7.0).abs() < 1e-6);
        assert!((pose.height() + 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_origin_in_front_of_camera() {
        let view = CameraPose::from_scroll(1.0).view_matrix();
        let origin_in_view = view.transform_point3(Vec3::ZERO);
        assert!(origin_in_view.z < 0.0);
    }
}
