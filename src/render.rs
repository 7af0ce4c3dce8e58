//! Live preview rendering: encoded payload plus style in, SVG markup out.

use std::fmt::Write as _;

use thiserror::Error;
use tracing::debug;

use crate::qrcode::{DataTooLong, QrCode};
use crate::style::QrStyle;

/// Display size of the preview, in SVG user units.
pub const PREVIEW_SIZE: u32 = 180;
/// A logo of size `n` is drawn `n * LOGO_SCALE` units wide on the preview.
pub const LOGO_SCALE: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("content is too long for a QR code: {0}")]
    TooLong(#[from] DataTooLong),
}

/// Where the logo sits, in module units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogoPlacement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Module rectangle forced light under the logo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Excavation {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Excavation {
    fn contains(&self, x: i32, y: i32) -> bool {
        (self.x..self.x + self.width).contains(&x) && (self.y..self.y + self.height).contains(&y)
    }
}

/// A rendered preview. Holds everything the exporter needs.
#[derive(Debug, Clone)]
pub struct Rendering {
    qr: QrCode,
    style: QrStyle,
    logo: Option<(String, LogoPlacement, Excavation)>,
    svg: String,
}

impl Rendering {
    pub fn style(&self) -> &QrStyle {
        &self.style
    }

    /// Side length in modules.
    pub fn modules(&self) -> i32 {
        self.qr.size()
    }

    /// Dark after excavation. Out-of-range coordinates are light.
    pub fn is_dark(&self, x: i32, y: i32) -> bool {
        let excavated = self.logo.as_ref().is_some_and(|(_, _, ex)| ex.contains(x, y));
        !excavated && self.qr.get_module(x, y)
    }

    /// Logo reference and placement, if a logo is overlaid.
    pub fn logo(&self) -> Option<(&str, LogoPlacement)> {
        self.logo.as_ref().map(|(src, placement, _)| (src.as_str(), *placement))
    }

    pub fn excavation(&self) -> Option<Excavation> {
        self.logo.as_ref().map(|(_, _, ex)| *ex)
    }

    pub fn svg(&self) -> &str {
        &self.svg
    }

    /// Block-character drawing for a terminal, with a 4-module quiet zone.
    ///
    /// Dark modules are drawn as `██` on a light terminal. On a dark terminal the drawing is
    /// inverted so scanners still see dark-on-light.
    pub fn to_terminal_string(&self, dark_terminal: bool) -> String {
        let border: i32 = 4;
        let mut out = String::new();
        for y in -border..self.modules() + border {
            for x in -border..self.modules() + border {
                let filled = self.is_dark(x, y) != dark_terminal;
                out.push_str(if filled { "██" } else { "  " });
            }
            out.push('\n');
        }
        out
    }
}

/// The preview renderer.
pub struct Preview;

impl Preview {
    /// Renders `text` with `style`.
    ///
    /// Returns `Ok(None)` for empty text: there is nothing to show and nothing to export.
    ///
    /// # Example
    ///
    /// ```
    /// use qrcraft::render::Preview;
    /// use qrcraft::style::QrStyle;
    ///
    /// let preview = Preview::render("https://example.com", &QrStyle::default()).unwrap().unwrap();
    /// assert!(preview.svg().contains("viewBox"));
    /// ```
    pub fn render(text: &str, style: &QrStyle) -> Result<Option<Rendering>, RenderError> {
        if text.is_empty() {
            return Ok(None);
        }
        let qr = QrCode::encode_text(text, style.error_correction.into(), true)?;
        let logo = style.logo_url.as_ref().map(|src| {
            let (placement, excavation) = logo_geometry(qr.size(), style.logo_size);
            (src.clone(), placement, excavation)
        });
        let mut rendering = Rendering {
            qr,
            style: style.clone(),
            logo,
            svg: String::new(),
        };
        rendering.svg = to_svg_string(&rendering);
        debug!(
            version = rendering.qr.version().value(),
            modules = rendering.modules(),
            level = %style.error_correction,
            logo = rendering.logo.is_some(),
            "rendered preview"
        );
        Ok(Some(rendering))
    }
}

/// Centers a `logo_size * LOGO_SCALE` unit square on the symbol and computes the cells under it.
fn logo_geometry(modules: i32, logo_size: u8) -> (LogoPlacement, Excavation) {
    let units = f64::from(u32::from(logo_size) * LOGO_SCALE);
    let side = (units * f64::from(modules) / f64::from(PREVIEW_SIZE)).min(f64::from(modules));
    let offset = f64::from(modules) / 2.0 - side / 2.0;
    let placement = LogoPlacement {
        x: offset,
        y: offset,
        width: side,
        height: side,
    };
    let floor = offset.floor();
    let cells = (side + offset - floor).ceil() as i32;
    let excavation = Excavation {
        x: floor as i32,
        y: floor as i32,
        width: cells,
        height: cells,
    };
    (placement, excavation)
}

// Returns a string of SVG code for the rendering, without a quiet zone.
// Dark modules are merged into horizontal runs.
// The string always uses Unix newlines (\n), regardless of the platform.
fn to_svg_string(rendering: &Rendering) -> String {
    let n = rendering.modules();
    let style = &rendering.style;
    let mut result = String::new();
    result += "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
    let _ = writeln!(
        result,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" height=\"{PREVIEW_SIZE}\" width=\"{PREVIEW_SIZE}\" viewBox=\"0 0 {n} {n}\">"
    );
    let _ = writeln!(
        result,
        "\t<path fill=\"{}\" d=\"M0,0 h{n}v{n}H0z\" shape-rendering=\"crispEdges\"/>",
        style.bg_color
    );

    let mut path = String::new();
    for y in 0..n {
        let mut x = 0;
        while x < n {
            if !rendering.is_dark(x, y) {
                x += 1;
                continue;
            }
            let start = x;
            while x < n && rendering.is_dark(x, y) {
                x += 1;
            }
            if !path.is_empty() {
                path.push(' ');
            }
            let run = x - start;
            let _ = write!(path, "M{start},{y}h{run}v1h-{run}z");
        }
    }
    let _ = writeln!(
        result,
        "\t<path fill=\"{}\" d=\"{path}\" shape-rendering=\"crispEdges\"/>",
        style.fg_color
    );

    if let Some((src, placement)) = rendering.logo() {
        let _ = writeln!(
            result,
            "\t<image href=\"{}\" height=\"{}\" width=\"{}\" x=\"{}\" y=\"{}\" preserveAspectRatio=\"none\"/>",
            escape_attr(src),
            fmt_units(placement.height),
            fmt_units(placement.width),
            fmt_units(placement.x),
            fmt_units(placement.y),
        );
    }
    result += "</svg>\n";
    result
}

fn fmt_units(value: f64) -> String {
    let fixed = format!("{value:.3}");
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
