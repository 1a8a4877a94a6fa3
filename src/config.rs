//! Configuration types for the recipe library pipeline.
//!
//! All pipeline behaviour is controlled through [`LibraryConfig`], built via
//! its [`LibraryConfigBuilder`]. Page geometry and raster settings live here
//! too, so the renderer, the image converter and the exporter all agree on
//! the same numbers.

use crate::error::RecipeError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category used when none is chosen.
pub const DEFAULT_CATEGORY: &str = "General";

/// Categories a fresh library starts with.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "General",
    "Desserts",
    "Meat",
    "Vegetarian",
    "Vegan",
    "Gluten-Free",
    "Breakfast",
    "Beverages",
    "Soups",
    "Salads",
];

/// A fixed output page in PDF user units (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    /// Applied on all four sides.
    pub margin: f32,
}

impl PageGeometry {
    /// US letter with a half-inch margin: the paginated text layout.
    pub const TEXT: PageGeometry = PageGeometry {
        width: 612.0,
        height: 792.0,
        margin: 36.0,
    };

    /// US letter with a one-inch margin: single-image pages.
    pub const IMAGE: PageGeometry = PageGeometry {
        width: 612.0,
        height: 792.0,
        margin: 72.0,
    };

    /// Width available inside the margins.
    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    /// Height available inside the margins.
    pub fn content_height(&self) -> f32 {
        self.height - 2.0 * self.margin
    }
}

/// Accepted range of [`RenderSettings::density`].
pub const MIN_DENSITY: u32 = 1;
pub const MAX_DENSITY: u32 = 4;

/// Settings for the markup rasterizer.
///
/// Layout is computed in abstract layout units and multiplied by `density`
/// to get raster pixels, so a 680-unit layout at density 2 is 1360 px wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Width of the article box in layout units.
    pub layout_width: u32,
    /// Raster pixels per layout unit.
    pub density: u32,
    /// Inner padding of the article box in layout units.
    pub padding: u32,
    /// Vertical gap between blocks in layout units.
    pub block_gap: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            layout_width: 680,
            density: 2,
            padding: 16,
            block_gap: 8,
        }
    }
}

impl RenderSettings {
    /// Raster width in pixels.
    pub fn raster_width(&self) -> u32 {
        self.layout_width * self.density
    }
}

/// Configuration for import, render, sync and export.
///
/// Built via [`LibraryConfig::builder()`] or using
/// [`LibraryConfig::default()`].
///
/// # Example
/// ```rust
/// use recipebox::LibraryConfig;
///
/// let config = LibraryConfig::builder()
///     .concurrency(2)
///     .default_category("Desserts")
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 2);
/// ```
#[derive(Clone)]
pub struct LibraryConfig {
    /// Number of files converted at once during import. Default: 3.
    ///
    /// Conversion is dominated by decoding and rasterising, which run on the
    /// blocking pool; three in flight keeps memory flat for large photos.
    pub concurrency: usize,

    /// Rasterizer settings used by the paginating renderer and the exporter.
    pub render: RenderSettings,

    /// Page used for rendered markup. Default: [`PageGeometry::TEXT`].
    pub text_page: PageGeometry,

    /// Page used for image files. Default: [`PageGeometry::IMAGE`].
    pub image_page: PageGeometry,

    /// Category for imports that name none. Default: `"General"`.
    pub default_category: String,

    /// Optional batch progress sink for imports and syncs.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            render: RenderSettings::default(),
            text_page: PageGeometry::TEXT,
            image_page: PageGeometry::IMAGE,
            default_category: DEFAULT_CATEGORY.to_string(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for LibraryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryConfig")
            .field("concurrency", &self.concurrency)
            .field("render", &self.render)
            .field("text_page", &self.text_page)
            .field("image_page", &self.image_page)
            .field("default_category", &self.default_category)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl LibraryConfig {
    /// Create a new builder for `LibraryConfig`.
    pub fn builder() -> LibraryConfigBuilder {
        LibraryConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`LibraryConfig`].
#[derive(Debug)]
pub struct LibraryConfigBuilder {
    config: LibraryConfig,
}

impl LibraryConfigBuilder {
    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    /// Replace all raster settings. `density` is checked by [`build`](Self::build).
    pub fn render(mut self, settings: RenderSettings) -> Self {
        self.config.render = settings;
        self
    }

    pub fn density(mut self, density: u32) -> Self {
        self.config.render.density = density.clamp(MIN_DENSITY, MAX_DENSITY);
        self
    }

    pub fn text_page(mut self, page: PageGeometry) -> Self {
        self.config.text_page = page;
        self
    }

    pub fn image_page(mut self, page: PageGeometry) -> Self {
        self.config.image_page = page;
        self
    }

    pub fn default_category(mut self, category: impl Into<String>) -> Self {
        self.config.default_category = category.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<LibraryConfig, RecipeError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(RecipeError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        for (name, page) in [("text", &c.text_page), ("image", &c.image_page)] {
            if page.content_width() <= 0.0 || page.content_height() <= 0.0 {
                return Err(RecipeError::InvalidConfig(format!(
                    "{name} page margin {} leaves no room on a {}x{} page",
                    page.margin, page.width, page.height
                )));
            }
        }
        let r = &c.render;
        if !(MIN_DENSITY..=MAX_DENSITY).contains(&r.density) {
            return Err(RecipeError::InvalidConfig(format!(
                "density {} is outside {MIN_DENSITY}..={MAX_DENSITY}",
                r.density
            )));
        }
        if r.layout_width <= r.padding.saturating_mul(2).saturating_add(8) {
            return Err(RecipeError::InvalidConfig(format!(
                "layout width {} is too narrow for padding {}",
                r.layout_width, r.padding
            )));
        }
        if c.default_category.trim().is_empty() {
            return Err(RecipeError::InvalidConfig(
                "default category must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_letter_geometry() {
        let c = LibraryConfig::default();
        assert_eq!(c.concurrency, 3);
        assert_eq!(c.text_page.content_width(), 540.0);
        assert_eq!(c.text_page.content_height(), 720.0);
        assert_eq!(c.image_page.content_width(), 468.0);
        assert_eq!(c.image_page.content_height(), 648.0);
        assert_eq!(c.render.raster_width(), 1360);
    }

    #[test]
    fn builder_clamps_concurrency() {
        let c = LibraryConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn builder_rejects_oversized_margin() {
        let err = LibraryConfig::builder()
            .text_page(PageGeometry {
                width: 612.0,
                height: 792.0,
                margin: 400.0,
            })
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("margin"));
    }

    #[test]
    fn builder_rejects_density_out_of_range() {
        for density in [0, 5, u32::MAX] {
            let err = LibraryConfig::builder()
                .render(RenderSettings {
                    density,
                    ..RenderSettings::default()
                })
                .build()
                .unwrap_err();
            assert!(err.to_string().contains("density"), "{err}");
        }
        let c = LibraryConfig::builder().density(9).build().unwrap();
        assert_eq!(c.render.density, MAX_DENSITY);
    }

    #[test]
    fn builder_rejects_blank_category() {
        assert!(LibraryConfig::builder()
            .default_category("  ")
            .build()
            .is_err());
    }
}
