//! Page image extraction: render one PDF page (optionally cropped to a table
//! region) to an RGB PNG via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and is not safe to drive from async contexts. Rendering is moved
//! onto tokio's blocking pool so the runtime workers never stall.
//!
//! ## Coordinate spaces
//!
//! Element polygons come from the layout partitioner in the pixel space of
//! its own rasterisation. When the polygon carries its layout size the crop
//! box is rescaled to the rendered image; otherwise the points are taken to
//! be pixels at the configured DPI already.

use crate::config::ParseConfig;
use crate::elements::Coordinates;
use crate::error::TableError;
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Renders a page region to a PNG file.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Render page `page_number` (1-based) of `pdf_path` to `output_path`,
    /// cropped to `crop` when given.
    async fn render_page(
        &self,
        pdf_path: &Path,
        page_number: u32,
        output_path: &Path,
        crop: Option<&CropRegion>,
    ) -> Result<(), TableError>;
}

/// Axis-aligned bounding box of an element polygon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRegion {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    /// Size of the coordinate space the box is expressed in, if known.
    pub layout_size: Option<(f64, f64)>,
}

impl CropRegion {
    /// Bounding box of `points`; `None` for an empty polygon.
    pub fn from_points(points: &[[f64; 2]]) -> Option<Self> {
        let first = points.first()?;
        let mut region = Self {
            left: first[0],
            top: first[1],
            right: first[0],
            bottom: first[1],
            layout_size: None,
        };
        for [x, y] in points.iter().skip(1) {
            region.left = region.left.min(*x);
            region.top = region.top.min(*y);
            region.right = region.right.max(*x);
            region.bottom = region.bottom.max(*y);
        }
        Some(region)
    }

    /// Crop box for an element's coordinates, carrying the layout size when
    /// both dimensions are present and positive.
    pub fn from_coordinates(coords: &Coordinates) -> Option<Self> {
        let mut region = Self::from_points(&coords.points)?;
        if let (Some(w), Some(h)) = (coords.layout_width, coords.layout_height) {
            if w > 0.0 && h > 0.0 {
                region.layout_size = Some((w, h));
            }
        }
        Some(region)
    }

    /// Pixel rectangle `(x, y, width, height)` inside an image of
    /// `image_width × image_height`, grown by `margin_px` on every side and
    /// clamped to the image. `None` when nothing of the box remains.
    pub fn pixel_rect(&self, image_width: u32, image_height: u32, margin_px: u32) -> Option<(u32, u32, u32, u32)> {
        let (sx, sy) = match self.layout_size {
            Some((w, h)) => (image_width as f64 / w, image_height as f64 / h),
            None => (1.0, 1.0),
        };
        let margin = margin_px as f64;
        let left = (self.left * sx - margin).floor().max(0.0);
        let top = (self.top * sy - margin).floor().max(0.0);
        let right = (self.right * sx + margin).ceil().min(image_width as f64);
        let bottom = (self.bottom * sy + margin).ceil().min(image_height as f64);

        if right <= left || bottom <= top {
            return None;
        }
        Some((
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        ))
    }
}

/// Crop (if requested) and write `image` as an RGB PNG.
pub fn write_png(
    image: &DynamicImage,
    page_number: u32,
    output_path: &Path,
    crop: Option<&CropRegion>,
    margin_px: u32,
) -> Result<(), TableError> {
    let cropped = match crop {
        Some(region) => {
            let (x, y, w, h) = region
                .pixel_rect(image.width(), image.height(), margin_px)
                .ok_or_else(|| TableError::RenderFailed {
                    page: page_number,
                    detail: format!(
                        "crop box {region:?} lies outside the {}x{} page image",
                        image.width(),
                        image.height()
                    ),
                })?;
            image.crop_imm(x, y, w, h)
        }
        None => image.clone(),
    };

    let rgb = DynamicImage::ImageRgb8(cropped.to_rgb8());
    rgb.save_with_format(output_path, ImageFormat::Png)
        .map_err(|e| TableError::RenderFailed {
            page: page_number,
            detail: format!("PNG write failed: {e}"),
        })?;
    debug!(
        "Page {} → {}x{} px PNG at {}",
        page_number,
        rgb.width(),
        rgb.height(),
        output_path.display()
    );
    Ok(())
}

/// pdfium-backed [`PageRenderer`].
#[derive(Debug, Clone)]
pub struct PdfiumRenderer {
    dpi: u32,
    margin_px: u32,
    password: Option<String>,
}

impl PdfiumRenderer {
    pub fn new(dpi: u32, margin_px: u32, password: Option<String>) -> Self {
        Self {
            dpi,
            margin_px,
            password,
        }
    }

    pub fn from_config(config: &ParseConfig) -> Self {
        Self::new(config.dpi, config.crop_margin_px(), config.password.clone())
    }
}

#[async_trait]
impl PageRenderer for PdfiumRenderer {
    async fn render_page(
        &self,
        pdf_path: &Path,
        page_number: u32,
        output_path: &Path,
        crop: Option<&CropRegion>,
    ) -> Result<(), TableError> {
        let pdf: PathBuf = pdf_path.to_path_buf();
        let out: PathBuf = output_path.to_path_buf();
        let crop = crop.copied();
        let renderer = self.clone();

        tokio::task::spawn_blocking(move || {
            let image = renderer.rasterise_blocking(&pdf, page_number)?;
            write_png(&image, page_number, &out, crop.as_ref(), renderer.margin_px)
        })
        .await
        .map_err(|e| TableError::ExternalService {
            service: "page-render".to_string(),
            attempts: 1,
            detail: format!("render task panicked: {e}"),
        })?
    }
}

impl PdfiumRenderer {
    /// Blocking rasterisation of one page at the configured DPI.
    fn rasterise_blocking(&self, pdf_path: &Path, page_number: u32) -> Result<DynamicImage, TableError> {
        let render_err = |detail: String| TableError::RenderFailed {
            page: page_number,
            detail,
        };

        let pdfium = pdfium_auto::bind_pdfium_silent().map_err(|e| TableError::ExternalService {
            service: "page-render".to_string(),
            attempts: 1,
            detail: format!("cannot bind pdfium: {e}"),
        })?;

        let document = pdfium
            .load_pdf_from_file(pdf_path, self.password.as_deref())
            .map_err(|e| render_err(format!("cannot open PDF: {e:?}")))?;

        let pages = document.pages();
        let total = pages.len() as u32;
        if page_number == 0 || page_number > total {
            return Err(render_err(format!(
                "page out of range (document has {total} pages)"
            )));
        }

        let page = pages
            .get((page_number - 1) as u16)
            .map_err(|e| render_err(format!("{e:?}")))?;

        let render_config = PdfRenderConfig::new().scale_page_by_factor(self.dpi as f32 / 72.0);
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| render_err(format!("{e:?}")))?;

        Ok(bitmap.as_image())
    }
}
