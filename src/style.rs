//! Visual options shared by the preview, the exporter and saved records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::qrcode::QrCodeEcc;

/// Default foreground color of a fresh form.
pub const DEFAULT_FG: &str = "#1e293b";
/// Default background color of a fresh form.
pub const DEFAULT_BG: &str = "#ffffff";
/// Default logo size, on the same 10..=30 scale the size slider uses.
pub const DEFAULT_LOGO_SIZE: u8 = 20;
/// Accepted logo sizes.
pub const LOGO_SIZE_RANGE: std::ops::RangeInclusive<u8> = 10..=30;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StyleError {
    #[error("invalid color '{0}', expected #rgb or #rrggbb")]
    InvalidColor(String),
    #[error("invalid error correction level '{0}', expected one of L, M, Q, H")]
    InvalidLevel(String),
    #[error("logo size {0} is outside {min}..={max}", min = LOGO_SIZE_RANGE.start(), max = LOGO_SIZE_RANGE.end())]
    LogoSizeOutOfRange(u8),
}

/// A CSS-style hex color. Stored normalized to lowercase `#rrggbb`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(String);

impl HexColor {
    pub fn parse(input: &str) -> Result<Self, StyleError> {
        let invalid = || StyleError::InvalidColor(input.to_string());
        let hex = input.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let expanded = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect::<String>(),
            6 => hex.to_string(),
            _ => return Err(invalid()),
        };
        Ok(Self(format!("#{}", expanded.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Red, green and blue channels.
    pub fn rgb(&self) -> [u8; 3] {
        let channel = |i: usize| u8::from_str_radix(&self.0[1 + i * 2..3 + i * 2], 16).unwrap_or(0);
        [channel(0), channel(1), channel(2)]
    }
}

impl TryFrom<String> for HexColor {
    type Error = StyleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.0
    }
}

impl FromStr for HexColor {
    type Err = StyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The four error correction strengths, persisted as their single letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ErrorCorrection {
    /// ~7% recovery.
    L,
    /// ~15% recovery.
    #[default]
    M,
    /// ~25% recovery.
    Q,
    /// ~30% recovery.
    H,
}

impl ErrorCorrection {
    pub const ALL: [ErrorCorrection; 4] = [Self::L, Self::M, Self::Q, Self::H];

    pub fn letter(self) -> &'static str {
        match self {
            Self::L => "L",
            Self::M => "M",
            Self::Q => "Q",
            Self::H => "H",
        }
    }

    /// Share of damaged codewords the symbol can recover from, in percent.
    pub fn recovery_percent(self) -> u8 {
        match self {
            Self::L => 7,
            Self::M => 15,
            Self::Q => 25,
            Self::H => 30,
        }
    }
}

impl From<ErrorCorrection> for QrCodeEcc {
    fn from(level: ErrorCorrection) -> Self {
        match level {
            ErrorCorrection::L => QrCodeEcc::Low,
            ErrorCorrection::M => QrCodeEcc::Medium,
            ErrorCorrection::Q => QrCodeEcc::Quartile,
            ErrorCorrection::H => QrCodeEcc::High,
        }
    }
}

impl FromStr for ErrorCorrection {
    type Err = StyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.letter().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StyleError::InvalidLevel(s.to_string()))
    }
}

impl fmt::Display for ErrorCorrection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

/// Colors, error correction and optional logo overlay for one QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrStyle {
    pub fg_color: HexColor,
    pub bg_color: HexColor,
    pub error_correction: ErrorCorrection,
    /// Logo reference: a `data:` URL or a path/URL string.
    pub logo_url: Option<String>,
    pub logo_size: u8,
}

impl QrStyle {
    pub fn set_logo_size(&mut self, size: u8) -> Result<(), StyleError> {
        if !LOGO_SIZE_RANGE.contains(&size) {
            return Err(StyleError::LogoSizeOutOfRange(size));
        }
        self.logo_size = size;
        Ok(())
    }
}

impl Default for QrStyle {
    fn default() -> Self {
        Self {
            fg_color: HexColor(DEFAULT_FG.to_string()),
            bg_color: HexColor(DEFAULT_BG.to_string()),
            error_correction: ErrorCorrection::M,
            logo_url: None,
            logo_size: DEFAULT_LOGO_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color_normalizes() {
        assert_eq!(HexColor::parse("#FFF").unwrap().as_str(), "#ffffff");
        assert_eq!(HexColor::parse("#1E293B").unwrap().as_str(), "#1e293b");
        assert_eq!(HexColor::parse("#1e293b").unwrap().rgb(), [0x1e, 0x29, 0x3b]);
    }

    #[test]
    fn test_hex_color_rejects_garbage() {
        for bad in ["", "fff", "#ff", "#ggg", "#12345", "#1234567"] {
            assert!(HexColor::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_level_letters() {
        assert_eq!("q".parse::<ErrorCorrection>().unwrap(), ErrorCorrection::Q);
        assert!("X".parse::<ErrorCorrection>().is_err());
        assert_eq!(serde_json::to_string(&ErrorCorrection::H).unwrap(), "\"H\"");
        assert_eq!(QrCodeEcc::from(ErrorCorrection::L), QrCodeEcc::Low);
    }

    #[test]
    fn test_recovery_grows_with_level() {
        let percents: Vec<u8> = ErrorCorrection::ALL.iter().map(|l| l.recovery_percent()).collect();
        assert_eq!(percents, [7, 15, 25, 30]);
    }

    #[test]
    fn test_default_style() {
        let style = QrStyle::default();
        assert_eq!(style.fg_color.as_str(), DEFAULT_FG);
        assert_eq!(style.bg_color.as_str(), DEFAULT_BG);
        assert_eq!(style.error_correction, ErrorCorrection::M);
        assert_eq!(style.logo_size, 20);
        assert!(style.logo_url.is_none());
    }

    #[test]
    fn test_logo_size_bounds() {
        let mut style = QrStyle::default();
        assert!(style.set_logo_size(30).is_ok());
        assert_eq!(style.set_logo_size(31), Err(StyleError::LogoSizeOutOfRange(31)));
        assert_eq!(style.logo_size, 30);
    }

    #[test]
    fn test_color_deserialize_validates() {
        let ok: HexColor = serde_json::from_str("\"#ABC\"").unwrap();
        assert_eq!(ok.as_str(), "#aabbcc");
        assert!(serde_json::from_str::<HexColor>("\"red\"").is_err());
    }
}
