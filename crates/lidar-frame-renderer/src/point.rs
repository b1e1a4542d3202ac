use nalgebra::{Point3, Vector3};

use crate::error::VizError;

/// A LiDAR point cloud stored row-major, one row per point.
///
/// The first three channels of every row are x, y, z. Any further channels (intensity,
/// ring, ...) are carried along untouched and ignored by rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud {
    values: Vec<f64>,
    channels: usize,
}

impl PointCloud {
    /// Creates a point cloud from row-major values with the given number of channels.
    pub fn new(values: Vec<f64>, channels: usize) -> Result<Self, VizError> {
        if channels < 3 {
            return Err(VizError::InvalidPointCloud(format!(
                "expected at least 3 channels per point, got {channels}"
            )));
        }
        if values.len() % channels != 0 {
            return Err(VizError::InvalidPointCloud(format!(
                "{} values cannot be split into rows of {channels} channels",
                values.len()
            )));
        }

        Ok(Self { values, channels })
    }

    /// Creates a point cloud holding only positions.
    pub fn from_positions(positions: &[[f64; 3]]) -> Self {
        Self {
            values: positions.iter().flatten().copied().collect(),
            channels: 3,
        }
    }

    /// The number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len() / self.channels
    }

    /// Checks if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The number of channels of every point.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// The full row of the point at `index`, extra channels included.
    pub fn row(&self, index: usize) -> &[f64] {
        &self.values[index * self.channels..(index + 1) * self.channels]
    }

    /// Iterates over the positions of the points.
    pub fn positions(&self) -> impl ExactSizeIterator<Item = Point3<f64>> + '_ {
        self.values
            .chunks_exact(self.channels)
            .map(|row| Point3::new(row[0], row[1], row[2]))
    }

    /// Returns a copy of the cloud with every position shifted by `-origin`.
    pub fn translated(&self, origin: &Point3<f64>) -> Self {
        let mut values = self.values.clone();
        values.chunks_exact_mut(self.channels).for_each(|row| {
            row[0] -= origin.x;
            row[1] -= origin.y;
            row[2] -= origin.z;
        });

        Self {
            values,
            channels: self.channels,
        }
    }

    /// Computes the mean position of the point cloud.
    ///
    /// An empty cloud has its centroid at the origin.
    pub fn centroid(&self) -> Point3<f64> {
        if self.is_empty() {
            return Point3::origin();
        }

        let sum = self
            .positions()
            .fold(Vector3::zeros(), |acc, point| acc + point.coords);
        Point3::from(sum / self.len() as f64)
    }
}
