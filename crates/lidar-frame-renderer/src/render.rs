use std::path::Path;

use image::{ImageFormat, imageops::FilterType};
use log::debug;
use nalgebra::{Point3, Vector3};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::{
    ImageType, PixelType,
    camera::{CameraConfig, CameraTransforms},
    error::VizError,
    font,
    geometry::{self, EgoFrame},
    label::Label,
    palette::Palette,
    point::PointCloud,
    scene::{BoxActor, PointActor, Scene, TextActor},
    screen::Screen,
};

/// The configuration of the frame renderer.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// The logical resolution of a frame.
    pub resolution: (u32, u32),
    /// Every logical pixel is rasterized as `supersample x supersample` pixels.
    pub supersample: u32,
    /// Filter the supersampled raster back to the logical resolution before saving.
    pub downsample: bool,
    pub background: [u8; 3],
    pub point_color: [u8; 3],
    /// Size of a point in logical pixels.
    pub point_size: u32,
    /// Width of box wireframe lines in logical pixels.
    pub line_width: u32,
    /// Offset of the camera from the centroid of the point cloud.
    pub camera_offset: Vector3<f64>,
    pub camera: CameraConfig,
    pub legend_font_scale: u32,
    pub legend_margin: u32,
    pub legend_spacing: u32,
}

impl RenderConfig {
    /// Sets the logical resolution of a frame.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = (width, height);
        self
    }

    /// Sets the supersampling factor.
    pub fn with_supersample(mut self, supersample: u32, downsample: bool) -> Self {
        self.supersample = supersample;
        self.downsample = downsample;
        self
    }

    /// Sets the offset of the camera from the point cloud centroid.
    pub fn with_camera_offset(mut self, offset: impl Into<Vector3<f64>>) -> Self {
        self.camera_offset = offset.into();
        self
    }

    /// Sets the field of view and clipping range of the camera.
    pub fn with_camera(mut self, camera: CameraConfig) -> Self {
        self.camera = camera;
        self
    }

    /// Sets the size of the points.
    pub fn with_point_size(mut self, point_size: u32) -> Self {
        self.point_size = point_size;
        self
    }

    /// Sets the scale of the legend font.
    pub fn with_legend_font_scale(mut self, scale: u32) -> Self {
        self.legend_font_scale = scale;
        self
    }

    /// The size of the images written by the renderer.
    pub fn output_size(&self) -> Result<(u32, u32), VizError> {
        let screen = Screen::new(self.resolution, self.supersample)?;
        if self.downsample {
            Ok(screen.resolution)
        } else {
            Ok(screen.raster_size())
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            resolution: (800, 600),
            supersample: 2,
            downsample: false,
            background: [255, 255, 255],
            point_color: [128, 128, 128],
            point_size: 1,
            line_width: 1,
            camera_offset: Vector3::new(0.0, -200.0, 200.0),
            camera: CameraConfig::default(),
            legend_font_scale: 2,
            legend_margin: 20,
            legend_spacing: 6,
        }
    }
}

/// Renders labelled point cloud frames into images.
#[derive(Debug, Clone, Default)]
pub struct FrameRenderer {
    palette: Palette,
    config: RenderConfig,
}

impl FrameRenderer {
    /// Creates a renderer drawing boxes with the given palette.
    pub fn new(palette: Palette, config: RenderConfig) -> Self {
        Self { palette, config }
    }

    /// Assembles the scene of an ego-relative frame.
    pub fn build_scene(&self, frame: &EgoFrame) -> Scene {
        Scene::new(frame, &self.palette, &self.config)
    }

    /// Recenters a frame on its ego vehicle and renders it.
    pub fn render(&self, cloud: &PointCloud, labels: &[Label]) -> Result<ImageType, VizError> {
        let frame = geometry::recenter(cloud, labels)?;
        let scene = self.build_scene(&frame);
        self.render_scene(&scene)
    }

    /// Renders a frame and saves it as a PNG image.
    ///
    /// Nothing is written if any step fails.
    pub fn render_to_file(
        &self,
        cloud: &PointCloud,
        labels: &[Label],
        path: impl AsRef<Path>,
    ) -> Result<(), VizError> {
        let image = self.render(cloud, labels)?;
        write_png(&image, path.as_ref())
    }

    /// Rasterizes a scene off-screen.
    pub fn render_scene(&self, scene: &Scene) -> Result<ImageType, VizError> {
        let screen = Screen::new(self.config.resolution, self.config.supersample)?;
        let transforms = scene.camera.transforms()?;

        let mut raster = Raster::new(screen, scene.background);
        raster.draw_points(&transforms, &scene.points);
        scene
            .boxes
            .iter()
            .for_each(|actor| raster.draw_box(&transforms, actor));
        scene
            .legend
            .iter()
            .for_each(|actor| raster.draw_text(actor));
        debug!(
            "Rasterized {} points and {} boxes at {:?}",
            scene.points.positions.len(),
            scene.boxes.len(),
            screen.raster_size()
        );

        let image = raster.image;
        if self.config.downsample && screen.supersample > 1 {
            let (width, height) = screen.resolution;
            return Ok(image::imageops::resize(
                &image,
                width,
                height,
                FilterType::Triangle,
            ));
        }
        Ok(image)
    }
}

/// Saves an image as PNG, going through a temporary file so that a failed write never
/// leaves a partial image behind.
pub fn write_png(image: &ImageType, path: &Path) -> Result<(), VizError> {
    let partial = path.with_extension("png.part");
    if let Err(err) = image.save_with_format(&partial, ImageFormat::Png) {
        let _ = std::fs::remove_file(&partial);
        return Err(err.into());
    }
    if let Err(err) = std::fs::rename(&partial, path) {
        let _ = std::fs::remove_file(&partial);
        return Err(err.into());
    }
    Ok(())
}

/// A color image with its 2D depth buffer.
struct Raster {
    screen: Screen,
    image: ImageType,
    depth_buffer: Vec<Vec<f64>>,
}

impl Raster {
    fn new(screen: Screen, background: PixelType) -> Self {
        let (width, height) = screen.raster_size();
        Self {
            screen,
            image: ImageType::from_pixel(width, height, background),
            depth_buffer: vec![vec![f64::INFINITY; width as usize]; height as usize],
        }
    }

    /// Writes a pixel if it lies on the raster and is not behind what was drawn before.
    #[inline]
    fn plot(&mut self, x: i64, y: i64, depth: f64, color: PixelType) {
        if x < 0 || y < 0 || x >= self.image.width() as i64 || y >= self.image.height() as i64 {
            return;
        }

        // Check if the pixel is behind another one
        let stored = &mut self.depth_buffer[y as usize][x as usize];
        if depth < *stored {
            *stored = depth;
            self.image.put_pixel(x as u32, y as u32, color);
        }
    }

    /// Writes a square of `size` pixels centered on `(x, y)`.
    #[inline]
    fn stamp(&mut self, x: i64, y: i64, size: u32, depth: f64, color: PixelType) {
        let size = size as i64;
        let start = -(size - 1) / 2;
        for dy in start..start + size {
            for dx in start..start + size {
                self.plot(x + dx, y + dy, depth, color);
            }
        }
    }

    fn draw_points(&mut self, transforms: &CameraTransforms, actor: &PointActor) {
        let screen = self.screen;
        let size = screen.scale(actor.point_size);

        // Parallelize the projection, then apply the writes in input order
        let collision_list = actor
            .positions
            .par_iter()
            .filter_map(|point| {
                let (depth, (x, y)) = transforms.project(point)?;
                screen
                    .to_pixel_coords(x, y)
                    .map(|pixel| (depth, pixel))
            })
            .collect_vec_list();

        collision_list.into_iter().for_each(|v| {
            v.into_iter().for_each(|(depth, (px, py))| {
                self.stamp(px as i64, py as i64, size, depth, actor.color);
            })
        });
    }

    fn draw_box(&mut self, transforms: &CameraTransforms, actor: &BoxActor) {
        let width = self.screen.scale(actor.line_width);
        let (near, far) = transforms.range();

        for (a, b) in actor.segments() {
            let a = transforms.to_camera(&a);
            let b = transforms.to_camera(&b);
            let Some((a, b)) = clip_depth_range(a, b, near, far) else {
                continue;
            };

            let (ax, ay) = transforms.ndc(&a);
            let (bx, by) = transforms.ndc(&b);
            let start = (self.screen.to_raster_coords(ax, ay), -a.z);
            let end = (self.screen.to_raster_coords(bx, by), -b.z);
            self.draw_line(start, end, width, actor.color);
        }
    }

    /// Draws a line with depth testing using Bresenham's algorithm.
    ///
    /// The depth is interpolated linearly along the line.
    fn draw_line(
        &mut self,
        start: ((f64, f64), f64),
        end: ((f64, f64), f64),
        width: u32,
        color: PixelType,
    ) {
        let (w, h) = (self.image.width() as f64, self.image.height() as f64);
        let Some((((x0, y0), d0), ((x1, y1), d1))) =
            clip_to_rect(start, end, (0.0, 0.0), (w - 1.0, h - 1.0))
        else {
            return;
        };

        let (mut x, mut y) = (x0.round() as i64, y0.round() as i64);
        let (x_end, y_end) = (x1.round() as i64, y1.round() as i64);

        let dx = (x_end - x).abs();
        let dy = (y_end - y).abs();
        let sx = if x < x_end { 1 } else { -1 };
        let sy = if y < y_end { 1 } else { -1 };
        let steps = dx.max(dy).max(1) as f64;

        let mut err = dx - dy;
        let mut step = 0.0;
        loop {
            let depth = d0 + (d1 - d0) * (step / steps);
            self.stamp(x, y, width, depth, color);

            if x == x_end && y == y_end {
                break;
            }

            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x += sx;
            }
            if e2 < dx {
                err += dx;
                y += sy;
            }
            step += 1.0;
        }
    }

    /// Draws a text overlay on top of everything else.
    fn draw_text(&mut self, actor: &TextActor) {
        let scale = self.screen.scale(actor.font_scale);
        let logical_height = self.screen.resolution.1;
        let left = (actor.position.0 * self.screen.supersample) as i64;
        let bottom = (logical_height.saturating_sub(actor.position.1) * self.screen.supersample) as i64;
        let top = bottom - font::text_height(scale) as i64;

        font::rasterize_text(&actor.text, scale, |x, y| {
            self.plot(left + x as i64, top + y as i64, f64::NEG_INFINITY, actor.color);
        });
    }
}

/// Clips a segment in camera coordinates to the depths between `near` and `far`.
fn clip_depth_range(
    a: Point3<f64>,
    b: Point3<f64>,
    near: f64,
    far: f64,
) -> Option<(Point3<f64>, Point3<f64>)> {
    let (da, db) = (-a.z, -b.z);
    let delta = db - da;
    let (t0, t1) = clip_parameters(&[(-delta, da - near), (delta, far - da)])?;
    Some((a + (b - a) * t0, a + (b - a) * t1))
}

type RasterVertex = ((f64, f64), f64);

/// Clips a segment in raster coordinates to a rectangle, interpolating the depth.
fn clip_to_rect(
    start: RasterVertex,
    end: RasterVertex,
    (min_x, min_y): (f64, f64),
    (max_x, max_y): (f64, f64),
) -> Option<(RasterVertex, RasterVertex)> {
    let (((x0, y0), d0), ((x1, y1), d1)) = (start, end);
    let (dx, dy) = (x1 - x0, y1 - y0);
    let (t0, t1) = clip_parameters(&[
        (-dx, x0 - min_x),
        (dx, max_x - x0),
        (-dy, y0 - min_y),
        (dy, max_y - y0),
    ])?;

    let at = |t: f64| ((x0 + dx * t, y0 + dy * t), d0 + (d1 - d0) * t);
    Some((at(t0), at(t1)))
}

/// Liang-Barsky clipping: finds the range of `t` in `[0, 1]` satisfying `p * t <= q` for
/// every `(p, q)` constraint.
fn clip_parameters(constraints: &[(f64, f64)]) -> Option<(f64, f64)> {
    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    for &(p, q) in constraints {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }

        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some((t0, t1))
}
