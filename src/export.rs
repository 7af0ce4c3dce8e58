//! Vector and raster export of a rendered preview.
//!
//! Both exports are local transformations of a [`Rendering`]; nothing is persisted unless the
//! caller writes the returned [`ExportFile`] somewhere with [`ExportFile::save_to`].

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use thiserror::Error;
use tracing::{debug, warn};

use crate::render::{RenderError, Rendering};

/// Side of the raster export canvas, in pixels.
pub const DEFAULT_PNG_SIZE: u32 = 400;
/// File stem used when a record has no title.
pub const DEFAULT_FILE_STEM: &str = "qrcode";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export size must be at least 1 pixel")]
    ZeroSize,
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),
    #[error("'{0}' is not a plain file name")]
    InvalidFileName(String),
    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
enum LogoError {
    #[error("malformed data URL")]
    MalformedDataUrl,
    #[error("remote logos are not fetched")]
    Remote,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// A downloadable file produced entirely in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportFile {
    /// Writes the file into `directory`, creating the directory if it doesn't exist.
    ///
    /// Returns the full path that was written.
    /// Fails without writing if `file_name` is not a single path component.
    pub fn save_to(&self, directory: &Path) -> Result<PathBuf, ExportError> {
        let name = Path::new(&self.file_name);
        if name.file_name() != Some(name.as_os_str()) {
            return Err(ExportError::InvalidFileName(self.file_name.clone()));
        }
        let path = directory.join(name);
        let write_err = |source| ExportError::Write {
            path: path.clone(),
            source,
        };
        if !directory.exists() {
            fs::create_dir_all(directory).map_err(write_err)?;
        }
        fs::write(&path, &self.bytes).map_err(write_err)?;
        debug!(path = %path.display(), bytes = self.bytes.len(), "export written");
        Ok(path)
    }
}

/// File stem for an export: the title when it has visible characters, otherwise `qrcode`.
///
/// Path separators and control characters become `_` and leading dots are dropped, so the stem
/// always names a file inside the export directory.
pub fn file_stem(title: Option<&str>) -> String {
    let cleaned = title.map(|t| {
        t.chars()
            .map(|c| if matches!(c, '/' | '\\' | ':') || c.is_control() { '_' } else { c })
            .collect::<String>()
    });
    match cleaned.as_deref().map(|t| t.trim().trim_start_matches('.').trim()) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => DEFAULT_FILE_STEM.to_string(),
    }
}

/// Serializes the rendered markup verbatim.
pub fn export_svg(rendering: &Rendering, stem: &str) -> ExportFile {
    ExportFile {
        file_name: format!("{stem}.svg"),
        mime_type: "image/svg+xml",
        bytes: rendering.svg().as_bytes().to_vec(),
    }
}

/// Rasterizes onto a `size × size` canvas pre-filled with the background color and encodes PNG.
pub fn export_png(rendering: &Rendering, stem: &str, size: u32) -> Result<ExportFile, ExportError> {
    let img = rasterize(rendering, size)?;
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(img).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(ExportFile {
        file_name: format!("{stem}.png"),
        mime_type: "image/png",
        bytes,
    })
}

/// Draws the rendering into an in-memory image buffer.
pub fn rasterize(rendering: &Rendering, size: u32) -> Result<RgbaImage, ExportError> {
    if size == 0 {
        return Err(ExportError::ZeroSize);
    }
    let style = rendering.style();
    let [br, bg, bb] = style.bg_color.rgb();
    let [fr, fg, fb] = style.fg_color.rgb();
    let dark = Rgba([fr, fg, fb, 255]);

    let mut img = RgbaImage::from_pixel(size, size, Rgba([br, bg, bb, 255]));
    let modules = i64::from(rendering.modules());
    let size_px = i64::from(size);
    for (px, py, pixel) in img.enumerate_pixels_mut() {
        let x = i64::from(px) * modules / size_px;
        let y = i64::from(py) * modules / size_px;
        if rendering.is_dark(x as i32, y as i32) {
            *pixel = dark;
        }
    }

    if let Some((src, placement)) = rendering.logo() {
        match load_logo(src) {
            Ok(logo) => {
                let scale = f64::from(size) / modules as f64;
                let width = ((placement.width * scale).round() as u32).max(1);
                let height = ((placement.height * scale).round() as u32).max(1);
                let resized = imageops::resize(&logo.to_rgba8(), width, height, FilterType::Triangle);
                let x = (placement.x * scale).round() as i64;
                let y = (placement.y * scale).round() as i64;
                imageops::overlay(&mut img, &resized, x, y);
            }
            Err(err) => warn!(error = %err, "skipping logo in raster export"),
        }
    }
    Ok(img)
}

fn load_logo(src: &str) -> Result<DynamicImage, LogoError> {
    if let Some(rest) = src.strip_prefix("data:") {
        let (meta, data) = rest.split_once(',').ok_or(LogoError::MalformedDataUrl)?;
        if !meta.ends_with(";base64") {
            return Err(LogoError::MalformedDataUrl);
        }
        let bytes = STANDARD.decode(data.trim())?;
        return Ok(image::load_from_memory(&bytes)?);
    }
    if src.starts_with("http://") || src.starts_with("https://") {
        return Err(LogoError::Remote);
    }
    Ok(image::open(src)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Preview;
    use crate::style::{ErrorCorrection, HexColor, QrStyle};

    fn rendering(style: &QrStyle) -> Rendering {
        Preview::render("https://example.com", style).unwrap().unwrap()
    }

    fn red_logo_data_url() -> String {
        let logo = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(logo)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        format!("data:image/png;base64,{}", STANDARD.encode(bytes))
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem(Some("Office WiFi")), "Office WiFi");
        assert_eq!(file_stem(Some("   ")), "qrcode");
        assert_eq!(file_stem(None), "qrcode");
    }

    #[test]
    fn test_file_stem_strips_path_parts() {
        assert_eq!(file_stem(Some("/tmp/outside")), "_tmp_outside");
        assert_eq!(file_stem(Some("../../etc/passwd")), "_.._etc_passwd");
        assert_eq!(file_stem(Some("a\\b")), "a_b");
        assert_eq!(file_stem(Some("..")), "qrcode");
        assert_eq!(file_stem(Some(".hidden")), "hidden");
    }

    #[test]
    fn test_titles_never_escape_the_export_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("exports");
        let r = rendering(&QrStyle::default());
        let escape = dir.path().join("outside");
        for title in [escape.to_str().unwrap(), "../outside", "nested/name"] {
            let path = export_svg(&r, &file_stem(Some(title))).save_to(&out).unwrap();
            assert!(path.starts_with(&out), "{title} wrote to {}", path.display());
        }
        assert!(!dir.path().join("outside.svg").exists());
    }

    #[test]
    fn test_save_to_rejects_non_plain_names() {
        let dir = tempfile::tempdir().unwrap();
        let r = rendering(&QrStyle::default());
        for stem in ["../up", "sub/dir", "/abs"] {
            let file = export_svg(&r, stem);
            assert!(matches!(file.save_to(dir.path()), Err(ExportError::InvalidFileName(_))));
        }
    }

    #[test]
    fn test_svg_export_is_verbatim() {
        let r = rendering(&QrStyle::default());
        let file = export_svg(&r, "menu");
        assert_eq!(file.file_name, "menu.svg");
        assert_eq!(file.mime_type, "image/svg+xml");
        assert_eq!(file.bytes, r.svg().as_bytes());
    }

    #[test]
    fn test_png_export_dimensions_and_background() {
        let style = QrStyle {
            bg_color: HexColor::parse("#00ff00").unwrap(),
            ..QrStyle::default()
        };
        let file = export_png(&rendering(&style), "qrcode", DEFAULT_PNG_SIZE).unwrap();
        assert_eq!(file.file_name, "qrcode.png");
        assert_eq!(file.mime_type, "image/png");

        let img = image::load_from_memory(&file.bytes).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (400, 400));
        // Top-left module is a finder corner; the separator ring is background.
        assert_eq!(*img.get_pixel(0, 0), Rgba([0x1e, 0x29, 0x3b, 255]));
        let r = rendering(&style);
        let cell = 400 / r.modules() as u32;
        assert_eq!(*img.get_pixel(cell + cell / 2, cell + cell / 2), Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn test_png_overlays_data_url_logo() {
        let style = QrStyle {
            error_correction: ErrorCorrection::H,
            logo_url: Some(red_logo_data_url()),
            logo_size: 20,
            ..QrStyle::default()
        };
        let img = rasterize(&rendering(&style), 400).unwrap();
        assert_eq!(*img.get_pixel(200, 200), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_unreadable_logo_is_skipped() {
        let style = QrStyle {
            logo_url: Some("https://cdn.example/logo.png".into()),
            ..QrStyle::default()
        };
        let img = rasterize(&rendering(&style), 200).unwrap();
        assert_eq!(img.dimensions(), (200, 200));
    }

    #[test]
    fn test_zero_size_is_rejected() {
        assert!(matches!(rasterize(&rendering(&QrStyle::default()), 0), Err(ExportError::ZeroSize)));
    }

    #[test]
    fn test_save_to_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("exports");
        let file = export_svg(&rendering(&QrStyle::default()), "menu");
        let path = file.save_to(&target).unwrap();
        assert_eq!(path, target.join("menu.svg"));
        assert_eq!(fs::read(path).unwrap(), file.bytes);
    }
}
