//! Ego-relative recentering and oriented box geometry.

use log::debug;
use nalgebra::{Point3, Rotation3, Vector3};

use crate::{error::VizError, label::Label, point::PointCloud};

/// The 12 edges of a box wireframe, as pairs of indices into [`corners`].
///
/// Top face, bottom face, then the four verticals.
pub const BOX_EDGES: [[usize; 2]; 12] = [
    [0, 1],
    [1, 2],
    [2, 3],
    [3, 0],
    [4, 5],
    [5, 6],
    [6, 7],
    [7, 4],
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
];

/// Computes the 8 corners of a box of size `l x w x h` centered on `(x, y, z)` and rotated
/// by `yaw` around the vertical axis.
///
/// The first four corners lie on the top face (`+h/2`), starting at `(+l/2, +w/2)` and going
/// through `(+l/2, -w/2)`, `(-l/2, -w/2)`, `(-l/2, +w/2)`. Seen from above (+z) this is a
/// clockwise walk; [`BOX_EDGES`] relies on this order. The last four corners mirror them on
/// the bottom face. Only the horizontal plane is rotated.
pub fn corners(x: f64, y: f64, z: f64, l: f64, w: f64, h: f64, yaw: f64) -> [Point3<f64>; 8] {
    let (hl, hw, hh) = (l / 2.0, w / 2.0, h / 2.0);
    let offsets = [
        Vector3::new(hl, hw, hh),
        Vector3::new(hl, -hw, hh),
        Vector3::new(-hl, -hw, hh),
        Vector3::new(-hl, hw, hh),
        Vector3::new(hl, hw, -hh),
        Vector3::new(hl, -hw, -hh),
        Vector3::new(-hl, -hw, -hh),
        Vector3::new(-hl, hw, -hh),
    ];

    let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), yaw);
    let center = Point3::new(x, y, z);
    offsets.map(|offset| center + rotation * offset)
}

/// Selects the ego vehicle: the label closest to the sensor origin.
///
/// Ties are broken by input order, the first label at the minimum distance wins.
pub fn select_ego(labels: &[Label]) -> Result<usize, VizError> {
    let mut best: Option<(usize, f64)> = None;
    for (index, label) in labels.iter().enumerate() {
        let distance = label.squared_distance();
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((index, distance)),
        }
    }

    best.map(|(index, _)| index).ok_or(VizError::EmptyLabelSet)
}

/// A frame re-expressed relative to its ego vehicle.
#[derive(Debug, Clone)]
pub struct EgoFrame {
    /// The recentered point cloud.
    pub cloud: PointCloud,
    /// The recentered labels, in input order. The ego label is still part of them.
    pub labels: Vec<Label>,
    /// Index of the ego label in `labels`.
    pub ego_index: usize,
    /// The ego center in the original sensor frame.
    pub ego_origin: Point3<f64>,
}

impl EgoFrame {
    /// The ego label.
    pub fn ego(&self) -> &Label {
        &self.labels[self.ego_index]
    }
}

/// Recenters a point cloud and its labels on the ego vehicle.
///
/// The inputs are left untouched, new recentered structures are returned.
pub fn recenter(cloud: &PointCloud, labels: &[Label]) -> Result<EgoFrame, VizError> {
    let ego_index = select_ego(labels)?;
    let ego_origin = labels[ego_index].center;
    debug!(
        "Ego vehicle is label #{ego_index} ({}) at {:?}",
        labels[ego_index].class, ego_origin
    );

    Ok(EgoFrame {
        cloud: cloud.translated(&ego_origin),
        labels: labels
            .iter()
            .map(|label| label.translated(&ego_origin))
            .collect(),
        ego_index,
        ego_origin,
    })
}
