use nalgebra::Point3;

use crate::{
    PixelType,
    camera::Camera,
    font,
    geometry::{BOX_EDGES, EgoFrame},
    palette::Palette,
    render::RenderConfig,
};

/// The point cloud backdrop, drawn as uniformly colored vertices.
#[derive(Debug, Clone)]
pub struct PointActor {
    pub positions: Vec<Point3<f64>>,
    pub color: PixelType,
    /// Size of a point in logical pixels.
    pub point_size: u32,
}

/// The wireframe of one labelled box.
#[derive(Debug, Clone)]
pub struct BoxActor {
    pub class: String,
    pub corners: [Point3<f64>; 8],
    pub color: PixelType,
    /// Width of the lines in logical pixels.
    pub line_width: u32,
}

impl BoxActor {
    /// The 12 segments of the wireframe.
    pub fn segments(&self) -> impl Iterator<Item = (Point3<f64>, Point3<f64>)> + '_ {
        BOX_EDGES
            .iter()
            .map(|&[a, b]| (self.corners[a], self.corners[b]))
    }
}

/// A screen-space text annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct TextActor {
    pub text: String,
    pub color: PixelType,
    /// Lower-left corner of the text in logical pixels, measured from the lower-left
    /// corner of the screen.
    pub position: (u32, u32),
    /// Size of a font pixel in logical pixels.
    pub font_scale: u32,
}

/// A scene with a point cloud, box wireframes, a legend and a camera.
#[derive(Debug, Clone)]
pub struct Scene {
    pub points: PointActor,
    pub boxes: Vec<BoxActor>,
    pub legend: Vec<TextActor>,
    pub camera: Camera,
    pub background: PixelType,
}

impl Scene {
    /// Assembles the scene of an ego-relative frame.
    pub fn new(frame: &EgoFrame, palette: &Palette, config: &RenderConfig) -> Self {
        let points = PointActor {
            positions: frame.cloud.positions().collect(),
            color: PixelType::from(config.point_color),
            point_size: config.point_size,
        };

        let boxes = frame
            .labels
            .iter()
            .map(|label| BoxActor {
                class: label.class.clone(),
                corners: label.corners(),
                color: palette.color_for(&label.class),
                line_width: config.line_width,
            })
            .collect();

        let camera_config = config
            .camera
            .clone()
            .with_aspect_ratio(config.resolution.0, config.resolution.1);
        let camera = Camera::tracking(&frame.cloud, config.camera_offset, camera_config);

        Self {
            points,
            boxes,
            legend: legend(palette, config),
            camera,
            background: PixelType::from(config.background),
        }
    }
}

/// Builds the legend: one line per palette entry, stacked upwards from the lower-right
/// corner of the screen.
pub fn legend(palette: &Palette, config: &RenderConfig) -> Vec<TextActor> {
    let scale = config.legend_font_scale;
    let line_height = font::text_height(scale) + config.legend_spacing;

    palette
        .entries()
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let text = entry.legend_text();
            let width = font::text_width(&text, scale);
            let x = config
                .resolution
                .0
                .saturating_sub(config.legend_margin + width);
            let y = config.legend_margin + index as u32 * line_height;
            TextActor {
                text,
                color: entry.color,
                position: (x, y),
                font_scale: scale,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    use super::*;
    use crate::{geometry::recenter, label::Label, point::PointCloud};

    fn frame() -> EgoFrame {
        let cloud = PointCloud::from_positions(&[[10.0, 0.0, 0.0], [11.0, 0.0, 0.0], [10.0, 1.0, 0.0]]);
        let labels = vec![
            Label::new([10.0, 0.0, 0.0], [2.0, 2.0, 2.0], 0.0, "Vehicle"),
            Label::new([20.0, 5.0, 0.0], [1.0, 1.0, 2.0], 0.5, "dog"),
        ];
        recenter(&cloud, &labels).unwrap()
    }

    #[test]
    fn test_scene_actors() {
        let config = RenderConfig::default();
        let scene = Scene::new(&frame(), &Palette::default(), &config);

        assert_eq!(scene.points.positions.len(), 3);
        assert_eq!(scene.points.color, PixelType::from([128, 128, 128]));
        assert_eq!(scene.boxes.len(), 2);
        assert_eq!(scene.boxes[0].color, PixelType::from([0, 0, 255]));
        assert_eq!(scene.boxes[1].color, PixelType::from([128, 128, 128]));
        assert_eq!(scene.boxes[0].segments().count(), 12);
        assert_eq!(scene.legend.len(), 4);
        assert_eq!(scene.background, PixelType::from([255, 255, 255]));
    }

    #[test]
    fn test_camera_tracks_recentered_cloud() {
        let config = RenderConfig::default().with_camera_offset(Vector3::new(0.0, -50.0, 30.0));
        let scene = Scene::new(&frame(), &Palette::default(), &config);

        assert_relative_eq!(scene.camera.focal_point, Point3::new(1.0 / 3.0, 1.0 / 3.0, 0.0));
        assert_relative_eq!(
            scene.camera.position,
            Point3::new(1.0 / 3.0, -50.0 + 1.0 / 3.0, 30.0)
        );
    }

    #[test]
    fn test_legend_is_stacked_in_lower_right_corner() {
        let config = RenderConfig::default();
        let legend = legend(&Palette::default(), &config);

        let texts = legend.iter().map(|t| t.text.as_str()).collect::<Vec<_>>();
        assert_eq!(
            texts,
            ["Vehicle - Blue", "Pedestrian - Red", "Cyclist - Yellow", "Unknown - Gray"]
        );
        for (index, actor) in legend.iter().enumerate() {
            let width = font::text_width(&actor.text, actor.font_scale);
            assert_eq!(actor.position.0 + width + config.legend_margin, config.resolution.0);
            if index > 0 {
                assert!(actor.position.1 > legend[index - 1].position.1);
            }
        }
        assert_eq!(legend[0].color, PixelType::from([0, 0, 255]));
    }
}
