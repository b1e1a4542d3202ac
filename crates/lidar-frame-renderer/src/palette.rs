use crate::PixelType;

/// A class of the palette with its display color.
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteEntry {
    /// The lower-cased class name.
    pub class: String,
    /// The color used for boxes of that class.
    pub color: PixelType,
    /// A human readable name of the color, shown in the legend.
    pub color_name: String,
}

impl PaletteEntry {
    /// The legend text of the entry, e.g. `Vehicle - Blue`.
    pub fn legend_text(&self) -> String {
        let mut chars = self.class.chars();
        let class = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        format!("{} - {}", class, self.color_name)
    }
}

/// Maps label classes to display colors.
///
/// Classes that are not part of the palette are drawn with the fallback color.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    entries: Vec<PaletteEntry>,
    fallback: PixelType,
}

impl Palette {
    /// Creates an empty palette with the given fallback color.
    pub fn new(fallback: [u8; 3]) -> Self {
        Self {
            entries: Vec::new(),
            fallback: PixelType::from(fallback),
        }
    }

    /// Adds or replaces the color of a class.
    pub fn with_entry(mut self, class: &str, color: [u8; 3], color_name: &str) -> Self {
        let entry = PaletteEntry {
            class: class.to_lowercase(),
            color: PixelType::from(color),
            color_name: color_name.to_string(),
        };

        match self.entries.iter_mut().find(|e| e.class == entry.class) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        self
    }

    /// The entries of the palette, in insertion order.
    pub fn entries(&self) -> &[PaletteEntry] {
        &self.entries
    }

    /// The color of classes missing from the palette.
    pub fn fallback(&self) -> PixelType {
        self.fallback
    }

    /// Looks up the color of a class, ignoring case.
    pub fn color_for(&self, class: &str) -> PixelType {
        self.entries
            .iter()
            .find(|entry| entry.class.eq_ignore_ascii_case(class))
            .map(|entry| entry.color)
            .unwrap_or(self.fallback)
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new([128, 128, 128])
            .with_entry("vehicle", [0, 0, 255], "Blue")
            .with_entry("pedestrian", [255, 0, 0], "Red")
            .with_entry("cyclist", [255, 255, 0], "Yellow")
            .with_entry("unknown", [128, 128, 128], "Gray")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_palette() {
        let palette = Palette::default();
        assert_eq!(palette.entries().len(), 4);
        assert_eq!(palette.color_for("vehicle"), PixelType::from([0, 0, 255]));
        assert_eq!(palette.color_for("Pedestrian"), PixelType::from([255, 0, 0]));
        assert_eq!(palette.color_for("CYCLIST"), PixelType::from([255, 255, 0]));
    }

    #[test]
    fn test_unknown_class_uses_fallback() {
        let palette = Palette::new([10, 20, 30]).with_entry("vehicle", [0, 0, 255], "Blue");
        assert_eq!(palette.color_for("dog"), PixelType::from([10, 20, 30]));
        assert_eq!(palette.fallback(), PixelType::from([10, 20, 30]));
        assert_eq!(Palette::default().color_for("dog"), PixelType::from([128, 128, 128]));
    }

    #[test]
    fn test_with_entry_replaces_existing_class() {
        let palette = Palette::default().with_entry("Vehicle", [0, 255, 0], "Green");
        assert_eq!(palette.entries().len(), 4);
        assert_eq!(palette.entries()[0].legend_text(), "Vehicle - Green");
        assert_eq!(palette.color_for("vehicle"), PixelType::from([0, 255, 0]));
    }
}
