//! Saved QR records and user profiles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::payload::{QrContent, QrKind};
use crate::render::{Preview, RenderError, Rendering};
use crate::style::{ErrorCorrection, HexColor, QrStyle, DEFAULT_LOGO_SIZE};

pub type RecordId = Uuid;
pub type UserId = Uuid;

/// A QR code saved to a user's library.
///
/// The content variant is the type tag, so a record can never carry content of another shape.
/// On the wire it is a flat [`RecordRow`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RecordRow", into = "RecordRow")]
pub struct QrRecord {
    pub id: RecordId,
    pub user_id: UserId,
    pub title: Option<String>,
    pub content: QrContent,
    pub style: QrStyle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QrRecord {
    pub fn kind(&self) -> QrKind {
        self.content.kind()
    }

    pub fn encoded(&self) -> String {
        self.content.encode()
    }

    pub fn render(&self) -> Result<Option<Rendering>, RenderError> {
        Preview::render(&self.encoded(), &self.style)
    }

    /// Title for listings: the stored title, or the kind label.
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(t) if !t.trim().is_empty() => t,
            _ => self.kind().label(),
        }
    }
}

/// Persisted row shape of a record.
///
/// `content` is a JSON object whose fields depend on `qr_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordRow {
    pub id: RecordId,
    pub user_id: UserId,
    #[serde(default)]
    pub title: Option<String>,
    pub qr_type: QrKind,
    pub content: serde_json::Value,
    pub fg_color: HexColor,
    pub bg_color: HexColor,
    #[serde(default)]
    pub error_correction: ErrorCorrection,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default = "default_logo_size")]
    pub logo_size: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_logo_size() -> u8 {
    DEFAULT_LOGO_SIZE
}

impl TryFrom<RecordRow> for QrRecord {
    type Error = serde_json::Error;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            content: QrContent::from_value(row.qr_type, row.content)?,
            style: QrStyle {
                fg_color: row.fg_color,
                bg_color: row.bg_color,
                error_correction: row.error_correction,
                logo_url: row.logo_url,
                logo_size: row.logo_size,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl From<QrRecord> for RecordRow {
    fn from(record: QrRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            title: record.title,
            qr_type: record.content.kind(),
            content: record.content.to_value(),
            fg_color: record.style.fg_color,
            bg_color: record.style.bg_color,
            error_correction: record.style.error_correction,
            logo_url: record.style.logo_url,
            logo_size: record.style.logo_size,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// The user-editable part of a record: everything a save or an update sends.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDraft {
    pub title: Option<String>,
    pub content: QrContent,
    pub style: QrStyle,
}

impl RecordDraft {
    pub fn new(content: QrContent) -> Self {
        Self {
            title: None,
            content,
            style: QrStyle::default(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_style(mut self, style: QrStyle) -> Self {
        self.style = style;
        self
    }
}

/// One per user, created lazily on first save or profile visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// Default username: the local part of the email, or `User`.
    pub fn default_username(email: Option<&str>) -> String {
        email
            .and_then(|e| e.split('@').next())
            .filter(|local| !local.is_empty())
            .unwrap_or("User")
            .to_string()
    }
}
