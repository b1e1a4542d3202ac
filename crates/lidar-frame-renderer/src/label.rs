use nalgebra::Point3;

use crate::geometry;

/// An oriented 3D bounding box labelled with an object class.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    /// The center of the box.
    pub center: Point3<f64>,
    /// The length of the box along its heading.
    pub length: f64,
    /// The width of the box.
    pub width: f64,
    /// The height of the box.
    pub height: f64,
    /// Rotation around the vertical axis in radians, counter-clockwise from +x.
    pub yaw: f64,
    /// The lower-cased class name.
    pub class: String,
}

impl Label {
    /// Creates a new label. The class name is lower-cased.
    pub fn new(
        center: [f64; 3],
        [length, width, height]: [f64; 3],
        yaw: f64,
        class: &str,
    ) -> Self {
        Self {
            center: Point3::from(center),
            length,
            width,
            height,
            yaw,
            class: class.to_lowercase(),
        }
    }

    /// The squared distance of the box center from the sensor origin.
    pub fn squared_distance(&self) -> f64 {
        self.center.coords.norm_squared()
    }

    /// The 8 corners of the box, ordered as expected by [`geometry::BOX_EDGES`].
    pub fn corners(&self) -> [Point3<f64>; 8] {
        geometry::corners(
            self.center.x,
            self.center.y,
            self.center.z,
            self.length,
            self.width,
            self.height,
            self.yaw,
        )
    }

    /// Returns a copy of the label with its center shifted by `-origin`.
    pub fn translated(&self, origin: &Point3<f64>) -> Self {
        Self {
            center: Point3::from(self.center.coords - origin.coords),
            ..self.clone()
        }
    }
}
