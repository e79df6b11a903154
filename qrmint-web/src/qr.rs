//! QR code rendering
//!
//! Codes use error correction level H so a centred logo can cover part of
//! the symbol. Dark modules are painted with a vertical gradient from
//! `top_color` at the first row to `bottom_color` at the last.

use std::io::Cursor;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use qrcode::{Color, EcLevel, QrCode};
use tracing::{info, warn};

use crate::error::Result;

/// Rendering parameters
#[derive(Debug, Clone, PartialEq)]
pub struct QrStyle {
    pub top_color: [u8; 3],
    pub bottom_color: [u8; 3],
    pub background: [u8; 3],
    /// Pixels per module edge
    pub module_size: u32,
    /// Light border width, in modules
    pub quiet_zone: u32,
    /// Logo edge length as a fraction of the image width
    pub logo_ratio: f32,
}

impl Default for QrStyle {
    fn default() -> Self {
        Self {
            top_color: [0, 56, 150],
            bottom_color: [0, 0, 0],
            background: [255, 255, 255],
            module_size: 10,
            quiet_zone: 4,
            logo_ratio: 0.25,
        }
    }
}

impl QrStyle {
    /// Foreground colour for pixel row `y` of an image `height` pixels tall
    fn gradient_at(&self, y: u32, height: u32) -> Rgba<u8> {
        let t = y as f32 / height.max(1) as f32;
        let mix = |top: u8, bottom: u8| (top as f32 * (1.0 - t) + bottom as f32 * t).round() as u8;

        Rgba([
            mix(self.top_color[0], self.bottom_color[0]),
            mix(self.top_color[1], self.bottom_color[1]),
            mix(self.top_color[2], self.bottom_color[2]),
            255,
        ])
    }
}

/// Renders styled QR codes, optionally with a centred logo
#[derive(Debug, Clone, Default)]
pub struct QrGenerator {
    style: QrStyle,
    logo: Option<RgbaImage>,
}

impl QrGenerator {
    pub fn new(style: QrStyle) -> Self {
        Self { style, logo: None }
    }

    /// Embed `logo` in the centre of every rendered code
    pub fn with_logo(mut self, logo: RgbaImage) -> Self {
        self.logo = Some(logo);
        self
    }

    /// Build a generator, embedding the logo at `path` when one exists
    ///
    /// A missing logo is normal. A logo that cannot be decoded is logged and
    /// skipped so generation still works.
    pub fn with_optional_logo(style: QrStyle, path: &Path) -> Self {
        let generator = Self::new(style);

        if !path.exists() {
            info!("No logo at {}, generating codes without one", path.display());
            return generator;
        }

        match image::open(path) {
            Ok(logo) => {
                info!("Embedding logo from {}", path.display());
                generator.with_logo(logo.to_rgba8())
            }
            Err(e) => {
                warn!("Ignoring unreadable logo {}: {}", path.display(), e);
                generator
            }
        }
    }

    pub fn has_logo(&self) -> bool {
        self.logo.is_some()
    }

    /// Render `payload` into an RGBA raster
    pub fn render(&self, payload: &str) -> Result<RgbaImage> {
        let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::H)?;
        let modules = code.width() as u32;
        let module_size = self.style.module_size;
        let offset = self.style.quiet_zone * module_size;
        let size = (modules + 2 * self.style.quiet_zone) * module_size;

        let [r, g, b] = self.style.background;
        let mut canvas = RgbaImage::from_pixel(size, size, Rgba([r, g, b, 255]));

        for (idx, color) in code.to_colors().iter().enumerate() {
            if *color != Color::Dark {
                continue;
            }
            let x0 = offset + (idx as u32 % modules) * module_size;
            let y0 = offset + (idx as u32 / modules) * module_size;

            for y in y0..y0 + module_size {
                let fg = self.style.gradient_at(y, size);
                for x in x0..x0 + module_size {
                    canvas.put_pixel(x, y, fg);
                }
            }
        }

        if let Some(logo) = &self.logo {
            self.overlay_logo(&mut canvas, logo);
        }

        Ok(canvas)
    }

    /// Render `payload` and encode the result as PNG
    pub fn render_png(&self, payload: &str) -> Result<Vec<u8>> {
        let canvas = self.render(payload)?;
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(canvas).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    fn overlay_logo(&self, canvas: &mut RgbaImage, logo: &RgbaImage) {
        let edge = (canvas.width() as f32 * self.style.logo_ratio) as u32;
        if edge == 0 {
            return;
        }

        let resized = imageops::resize(logo, edge, edge, FilterType::Lanczos3);
        let pos = ((canvas.width() - edge) / 2) as i64;
        imageops::overlay(canvas, &resized, pos, pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn decode(img: &RgbaImage) -> Vec<String> {
        let luma = DynamicImage::ImageRgba8(img.clone()).to_luma8();
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            luma.width() as usize,
            luma.height() as usize,
            |x, y| luma.get_pixel(x as u32, y as u32).0[0],
        );
        prepared
            .detect_grids()
            .iter()
            .filter_map(|grid| grid.decode().ok())
            .map(|(_meta, content)| content)
            .collect()
    }

    #[test]
    fn rendered_code_decodes_to_payload() {
        let generator = QrGenerator::default();
        let img = generator.render("a@x.com").unwrap();
        assert_eq!(decode(&img), vec!["a@x.com"]);
    }

    #[test]
    fn png_output_decodes_to_payload() {
        let generator = QrGenerator::default();
        let bytes = generator.render_png("volunteer.one@example.org").unwrap();

        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let img = image::load_from_memory_with_format(&bytes, ImageFormat::Png)
            .unwrap()
            .to_rgba8();
        assert_eq!(decode(&img), vec!["volunteer.one@example.org"]);
    }

    #[test]
    fn image_is_square_with_quiet_zone() {
        let generator = QrGenerator::default();
        let img = generator.render("a@x.com").unwrap();

        assert_eq!(img.width(), img.height());
        assert_eq!(img.width() % 10, 0);
        assert_eq!(img.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(img.get_pixel(39, 39), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn finder_pattern_follows_gradient() {
        let generator = QrGenerator::default();
        let img = generator.render("a@x.com").unwrap();
        let size = img.height();

        // Top-left finder pattern starts right after the quiet zone
        let top = img.get_pixel(40, 40);
        // Bottom-left finder pattern ends right before the quiet zone
        let bottom = img.get_pixel(40, size - 41);

        assert_eq!(top.0[0], 0);
        assert!(top.0[2] > 100, "top rows should be close to the blue endpoint");
        assert!(bottom.0[2] < 50, "bottom rows should be close to black");
    }

    #[test]
    fn gradient_endpoints() {
        let style = QrStyle::default();
        assert_eq!(style.gradient_at(0, 100), Rgba([0, 56, 150, 255]));
        assert_eq!(style.gradient_at(100, 100), Rgba([0, 0, 0, 255]));
        assert_eq!(style.gradient_at(50, 100), Rgba([0, 28, 75, 255]));
    }

    #[test]
    fn logo_is_painted_in_the_centre() {
        let logo = RgbaImage::from_pixel(8, 8, Rgba([255, 0, 0, 255]));
        let generator = QrGenerator::default().with_logo(logo);
        let img = generator.render("a@x.com").unwrap();

        let centre = img.width() / 2;
        let [r, g, b, _] = img.get_pixel(centre, centre).0;
        assert!(r > 250 && g < 5 && b < 5, "centre should be covered by the logo");
        assert_eq!(img.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn missing_logo_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let generator = QrGenerator::with_optional_logo(QrStyle::default(), &dir.path().join("logo.png"));
        assert!(!generator.has_logo());
        assert!(generator.render_png("a@x.com").is_ok());
    }

    #[test]
    fn unreadable_logo_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logo.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let generator = QrGenerator::with_optional_logo(QrStyle::default(), &path);
        assert!(!generator.has_logo());
    }

    #[test]
    fn logo_file_is_loaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logo.png");
        RgbaImage::from_pixel(4, 4, Rgba([0, 200, 0, 255])).save(&path).unwrap();

        let generator = QrGenerator::with_optional_logo(QrStyle::default(), &path);
        assert!(generator.has_logo());
    }

    #[test]
    fn oversized_payload_fails() {
        let generator = QrGenerator::default();
        let payload = format!("{}@x.com", "a".repeat(4000));
        assert!(generator.render(&payload).is_err());
    }
}
