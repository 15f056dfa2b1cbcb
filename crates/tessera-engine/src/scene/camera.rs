use glam::{Mat4, Vec3};

/// Perspective camera for the 3D pass. Right handed, `fov` is vertical and in radians.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraView3D {
    pub position: [f32; 3],
    pub direction: [f32; 3],
    pub up: [f32; 3],
    pub fov: f32,
    /// `<= 0` uses the surface aspect.
    pub aspect_ratio: f32,
    pub near_plane: f32,
    pub far_plane: f32,
}

impl Default for CameraView3D {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 5.0],
            direction: [0.0, 0.0, -1.0],
            up: [0.0, 1.0, 0.0],
            fov: 60f32.to_radians(),
            aspect_ratio: 0.0,
            near_plane: 0.1,
            far_plane: 1000.0,
        }
    }
}

impl CameraView3D {
    pub fn look_at(position: [f32; 3], target: [f32; 3]) -> Self {
        let dir = (Vec3::from(target) - Vec3::from(position)).normalize_or(Vec3::NEG_Z);
        Self {
            position,
            direction: dir.into(),
            ..Self::default()
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        let dir = Vec3::from(self.direction).normalize_or(Vec3::NEG_Z);
        let mut up = Vec3::from(self.up).normalize_or(Vec3::Y);
        if dir.cross(up).length_squared() < 1e-8 {
            // looking straight along `up`
            up = if dir.y.abs() > 0.9 { Vec3::Z } else { Vec3::Y };
        }
        Mat4::look_to_rh(Vec3::from(self.position), dir, up)
    }

    pub fn projection_matrix(&self, surface_aspect: f32) -> Mat4 {
        let aspect = if self.aspect_ratio > 0.0 {
            self.aspect_ratio
        } else if surface_aspect > 0.0 {
            surface_aspect
        } else {
            1.0
        };
        let near = self.near_plane.max(1e-4);
        let far = self.far_plane.max(near * 2.0);
        let fov = self.fov.clamp(1e-3, std::f32::consts::PI - 1e-3);
        Mat4::perspective_rh(fov, aspect, near, far)
    }

    pub fn view_projection(&self, surface_aspect: f32) -> Mat4 {
        self.projection_matrix(surface_aspect) * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn default_camera_sees_origin_at_center() {
        let cam = CameraView3D::default();
        let clip = cam.view_projection(16.0 / 9.0) * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip / clip.w;
        assert!(ndc.x.abs() < 1e-5);
        assert!(ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn explicit_aspect_overrides_surface() {
        let cam = CameraView3D {
            aspect_ratio: 2.0,
            ..CameraView3D::default()
        };
        assert_eq!(cam.projection_matrix(0.5), cam.projection_matrix(3.0));
    }

    #[test]
    fn degenerate_up_still_yields_finite_view() {
        let cam = CameraView3D {
            direction: [0.0, -1.0, 0.0],
            up: [0.0, 1.0, 0.0],
            ..CameraView3D::default()
        };
        assert!(cam.view_matrix().is_finite());
    }
}
