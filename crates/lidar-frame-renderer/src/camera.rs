use nalgebra::{Isometry3, Perspective3, Point3, Vector3};

use crate::{error::VizError, point::PointCloud};

/// A camera looking at a focal point from a fixed position.
#[derive(Debug, Clone)]
pub struct Camera {
    /// The position of the camera.
    pub position: Point3<f64>,
    /// The point the camera looks at.
    pub focal_point: Point3<f64>,
    /// The direction that is up on screen.
    pub view_up: Vector3<f64>,
    /// The configuration for the camera.
    pub config: CameraConfig,
}

impl Camera {
    /// Creates a camera placed at `focal_point + offset`, looking at `focal_point` with the
    /// z axis up.
    pub fn new(focal_point: Point3<f64>, offset: Vector3<f64>, config: CameraConfig) -> Self {
        Self {
            position: focal_point + offset,
            focal_point,
            view_up: Vector3::z(),
            config,
        }
    }

    /// Creates a chase camera following the centroid of a point cloud from a fixed offset.
    pub fn tracking(cloud: &PointCloud, offset: Vector3<f64>, config: CameraConfig) -> Self {
        Self::new(cloud.centroid(), offset, config)
    }

    /// The normalized viewing direction.
    pub fn direction(&self) -> Vector3<f64> {
        (self.focal_point - self.position).normalize()
    }

    /// The camera's "view" transform, mapping world coordinates to camera coordinates.
    pub fn view(&self) -> Isometry3<f64> {
        Isometry3::look_at_rh(&self.position, &self.focal_point, &self.view_up)
    }

    /// The projection transform for the camera.
    pub fn projection(&self) -> Perspective3<f64> {
        Perspective3::new(
            self.config.aspect_ratio,
            self.config.fov_y,
            self.config.near,
            self.config.far,
        )
    }

    /// Checks that the camera can be turned into valid transforms.
    pub fn validate(&self) -> Result<(), VizError> {
        let finite = |p: &Point3<f64>| p.iter().all(|c| c.is_finite());
        if !finite(&self.position) || !finite(&self.focal_point) {
            return Err(VizError::RenderBackend(
                "camera position or focal point is not finite".to_string(),
            ));
        }

        let offset = self.position - self.focal_point;
        if offset.norm() <= f64::EPSILON {
            return Err(VizError::RenderBackend(
                "camera position coincides with its focal point".to_string(),
            ));
        }
        if offset.cross(&self.view_up).norm() <= f64::EPSILON * offset.norm() {
            return Err(VizError::RenderBackend(
                "camera view direction is parallel to its up vector".to_string(),
            ));
        }

        self.config.validate()
    }

    /// The transforms of the camera, checked for degenerate set-ups.
    pub fn transforms(&self) -> Result<CameraTransforms, VizError> {
        self.validate()?;
        Ok(CameraTransforms {
            view: self.view(),
            proj: self.projection(),
            near: self.config.near,
            far: self.config.far,
        })
    }
}

/// The configuration for a camera.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
    aspect_ratio: f64,
    fov_y: f64,
    near: f64,
    far: f64,
}

impl CameraConfig {
    /// Creates a new camera configuration.
    ///
    /// The fov_y is in degrees.
    pub fn new((width, height): (u32, u32), fov_y: f64, (near, far): (f64, f64)) -> Self {
        Self {
            aspect_ratio: width as f64 / height as f64,
            fov_y: fov_y.to_radians(),
            near,
            far,
        }
    }

    /// Sets the vertical field of view.
    ///
    /// The angle is in degrees.
    pub fn with_fov(mut self, fov_y: f64) -> Self {
        self.fov_y = fov_y.to_radians();
        self
    }

    /// Sets the aspect ratio of the camera.
    pub fn with_aspect_ratio(mut self, width: u32, height: u32) -> Self {
        self.aspect_ratio = width as f64 / height as f64;
        self
    }

    /// Sets the z-near and z-far of the camera.
    pub fn with_range(mut self, near: f64, far: f64) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    fn validate(&self) -> Result<(), VizError> {
        if !(self.near > 0.0 && self.far > self.near && self.far.is_finite()) {
            return Err(VizError::RenderBackend(format!(
                "invalid clipping range [{}, {}]",
                self.near, self.far
            )));
        }
        if !(self.fov_y > 0.0 && self.fov_y < std::f64::consts::PI) {
            return Err(VizError::RenderBackend(format!(
                "invalid field of view {} rad",
                self.fov_y
            )));
        }
        if !(self.aspect_ratio.is_finite() && self.aspect_ratio > 0.0) {
            return Err(VizError::RenderBackend(format!(
                "invalid aspect ratio {}",
                self.aspect_ratio
            )));
        }
        Ok(())
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self::new((800, 600), 30.0, (0.1, 1000.0))
    }
}

/// Contains the various transformations of a camera.
#[derive(Copy, Clone, Debug)]
pub struct CameraTransforms {
    pub view: Isometry3<f64>,
    pub proj: Perspective3<f64>,
    near: f64,
    far: f64,
}

impl CameraTransforms {
    /// Maps a world point to camera coordinates. The camera looks down its -z axis.
    #[inline]
    pub fn to_camera(&self, point: &Point3<f64>) -> Point3<f64> {
        self.view.transform_point(point)
    }

    /// Checks if a depth along the viewing direction lies between the clipping planes.
    #[inline]
    pub fn in_range(&self, depth: f64) -> bool {
        depth >= self.near && depth <= self.far
    }

    /// The clipping planes as a depth range.
    pub fn range(&self) -> (f64, f64) {
        (self.near, self.far)
    }

    /// Projects a point in camera coordinates to normalized device coordinates.
    ///
    /// Returns the depth of the point along the viewing direction with the normalized
    /// `(x, y)` position, or `None` if the point lies outside the clipping range.
    #[inline]
    pub fn project_camera_point(&self, point: &Point3<f64>) -> Option<(f64, (f64, f64))> {
        let depth = -point.z;
        if !self.in_range(depth) {
            return None;
        }
        Some((depth, self.ndc(point)))
    }

    /// Projects a point in camera coordinates to normalized device coordinates without
    /// checking the clipping range.
    #[inline]
    pub fn ndc(&self, point: &Point3<f64>) -> (f64, f64) {
        let projected = self.proj.project_point(point);
        (projected.x, projected.y)
    }

    /// Projects a world point to normalized device coordinates.
    #[inline]
    pub fn project(&self, point: &Point3<f64>) -> Option<(f64, (f64, f64))> {
        self.project_camera_point(&self.to_camera(point))
    }
}
