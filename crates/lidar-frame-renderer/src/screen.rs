use crate::error::VizError;

/// A raster target with a logical resolution and a supersampling factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Screen {
    /// The logical screen resolution in pixels.
    pub resolution: (u32, u32),
    /// Every logical pixel is rendered as `supersample x supersample` raster pixels.
    pub supersample: u32,
}

impl Screen {
    /// Creates a new screen, rejecting empty rasters.
    pub fn new(resolution: (u32, u32), supersample: u32) -> Result<Self, VizError> {
        if resolution.0 == 0 || resolution.1 == 0 || supersample == 0 {
            return Err(VizError::RenderBackend(format!(
                "cannot allocate a {}x{} raster with supersampling {}",
                resolution.0, resolution.1, supersample
            )));
        }
        resolution
            .0
            .checked_mul(supersample)
            .zip(resolution.1.checked_mul(supersample))
            .ok_or_else(|| VizError::RenderBackend("raster size overflows".to_string()))?;

        Ok(Self {
            resolution,
            supersample,
        })
    }

    /// The size of the raster in pixels.
    pub fn raster_size(&self) -> (u32, u32) {
        (
            self.resolution.0 * self.supersample,
            self.resolution.1 * self.supersample,
        )
    }

    /// Converts a logical length to raster pixels, never less than one pixel.
    pub fn scale(&self, logical: u32) -> u32 {
        (logical * self.supersample).max(1)
    }

    /// Converts normalized 2D point on the screen (-1 to 1) into raster coordinates.
    ///
    /// The result is continuous and may fall outside of the raster.
    pub fn to_raster_coords(&self, normalized_x: f64, normalized_y: f64) -> (f64, f64) {
        let (width, height) = self.raster_size();
        let x = (normalized_x + 1.0) * 0.5 * width as f64;
        let y = (1.0 - normalized_y) * 0.5 * height as f64;
        (x, y)
    }

    /// Converts normalized 2D point on the screen (-1 to 1) into pixel coordinates.
    pub fn to_pixel_coords(&self, normalized_x: f64, normalized_y: f64) -> Option<(u32, u32)> {
        let (width, height) = self.raster_size();
        let (x, y) = self.to_raster_coords(normalized_x, normalized_y);

        // Ensure coordinates are within bounds
        if x >= 0.0 && y >= 0.0 && x < width as f64 && y < height as f64 {
            Some((x as u32, y as u32))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_coords() {
        let screen = Screen::new((800, 600), 2).unwrap();
        assert_eq!(screen.raster_size(), (1600, 1200));
        assert_eq!(screen.to_pixel_coords(0.0, 0.0), Some((800, 600)));
        assert_eq!(screen.to_pixel_coords(-1.0, 1.0), Some((0, 0)));
        assert_eq!(screen.to_pixel_coords(1.0, 0.0), None);
        assert_eq!(screen.to_pixel_coords(0.0, -1.5), None);
    }

    #[test]
    fn test_empty_screen_is_rejected() {
        assert!(matches!(Screen::new((0, 600), 1), Err(VizError::RenderBackend(_))));
        assert!(matches!(Screen::new((800, 600), 0), Err(VizError::RenderBackend(_))));
    }
}
