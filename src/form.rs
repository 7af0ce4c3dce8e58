//! Creation form state.
//!
//! One field bundle per kind, so switching kinds back and forth never loses what was typed.
//! The active bundle, encoded, is what the preview shows and what a save persists.

use thiserror::Error;
use tracing::debug;

use crate::library::{QrRecord, RecordDraft, RecordId};
use crate::nav::{NavigationRequest, Route};
use crate::payload::{
    EmailData, EventData, LocationData, PhoneData, QrContent, QrKind, SmsData, TextData, UrlData,
    UnknownEncryption, VcardData, WhatsappData, WifiData,
};
use crate::render::{Preview, RenderError, Rendering};
use crate::style::{ErrorCorrection, HexColor, QrStyle, StyleError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("{kind} has no field '{field}' (expected one of: {})", field_names(*kind).join(", "))]
    UnknownField { kind: QrKind, field: String },
    #[error(transparent)]
    Encryption(#[from] UnknownEncryption),
    #[error(transparent)]
    Style(#[from] StyleError),
}

/// Field names accepted by [`FormState::set_field`] for `kind`.
pub fn field_names(kind: QrKind) -> &'static [&'static str] {
    match kind {
        QrKind::Url | QrKind::Text => &["value"],
        QrKind::Wifi => &["ssid", "password", "encryption"],
        QrKind::Phone => &["phoneNumber"],
        QrKind::Email => &["emailAddress"],
        QrKind::Whatsapp => &["whatsappNumber"],
        QrKind::Vcard => &["firstName", "lastName", "phone", "email", "organization", "website"],
        QrKind::Event => &["title", "location", "startDate", "startTime", "endDate", "endTime"],
        QrKind::Sms => &["smsNumber", "smsBody"],
        QrKind::Location => &["latitude", "longitude"],
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    active: QrKind,
    url: UrlData,
    text: TextData,
    wifi: WifiData,
    phone: PhoneData,
    email: EmailData,
    whatsapp: WhatsappData,
    vcard: VcardData,
    event: EventData,
    sms: SmsData,
    location: LocationData,
    style: QrStyle,
    title: Option<String>,
    editing: Option<RecordId>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh form starting from `style` instead of the built-in defaults.
    pub fn with_style(style: QrStyle) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    pub fn active(&self) -> QrKind {
        self.active
    }

    pub fn select(&mut self, kind: QrKind) {
        self.active = kind;
    }

    /// Sets one field of the active bundle.
    pub fn set_field(&mut self, name: &str, value: &str) -> Result<(), FormError> {
        if self.active == QrKind::Wifi && name == "encryption" {
            self.wifi.encryption = value.parse()?;
            return Ok(());
        }
        let kind = self.active;
        let slot = self.text_field(name).ok_or_else(|| FormError::UnknownField {
            kind,
            field: name.to_string(),
        })?;
        *slot = value.to_string();
        Ok(())
    }

    fn text_field(&mut self, name: &str) -> Option<&mut String> {
        let slot = match self.active {
            QrKind::Url => match name {
                "value" => &mut self.url.value,
                _ => return None,
            },
            QrKind::Text => match name {
                "value" => &mut self.text.value,
                _ => return None,
            },
            QrKind::Wifi => match name {
                "ssid" => &mut self.wifi.ssid,
                "password" => &mut self.wifi.password,
                _ => return None,
            },
            QrKind::Phone => match name {
                "phoneNumber" => &mut self.phone.phone_number,
                _ => return None,
            },
            QrKind::Email => match name {
                "emailAddress" => &mut self.email.email_address,
                _ => return None,
            },
            QrKind::Whatsapp => match name {
                "whatsappNumber" => &mut self.whatsapp.whatsapp_number,
                _ => return None,
            },
            QrKind::Vcard => match name {
                "firstName" => &mut self.vcard.first_name,
                "lastName" => &mut self.vcard.last_name,
                "phone" => &mut self.vcard.phone,
                "email" => &mut self.vcard.email,
                "organization" => &mut self.vcard.organization,
                "website" => &mut self.vcard.website,
                _ => return None,
            },
            QrKind::Event => match name {
                "title" => &mut self.event.title,
                "location" => &mut self.event.location,
                "startDate" => &mut self.event.start_date,
                "startTime" => &mut self.event.start_time,
                "endDate" => &mut self.event.end_date,
                "endTime" => &mut self.event.end_time,
                _ => return None,
            },
            QrKind::Sms => match name {
                "smsNumber" => &mut self.sms.sms_number,
                "smsBody" => &mut self.sms.sms_body,
                _ => return None,
            },
            QrKind::Location => match name {
                "latitude" => &mut self.location.latitude,
                "longitude" => &mut self.location.longitude,
                _ => return None,
            },
        };
        Some(slot)
    }

    /// Replaces the bundle matching `content`'s kind. The active kind is unchanged.
    pub fn load_content(&mut self, content: QrContent) {
        match content {
            QrContent::Url(data) => self.url = data,
            QrContent::Text(data) => self.text = data,
            QrContent::Wifi(data) => self.wifi = data,
            QrContent::Phone(data) => self.phone = data,
            QrContent::Email(data) => self.email = data,
            QrContent::Whatsapp(data) => self.whatsapp = data,
            QrContent::Vcard(data) => self.vcard = data,
            QrContent::Event(data) => self.event = data,
            QrContent::Sms(data) => self.sms = data,
            QrContent::Location(data) => self.location = data,
        }
    }

    /// Content of the active bundle.
    pub fn content(&self) -> QrContent {
        match self.active {
            QrKind::Url => QrContent::Url(self.url.clone()),
            QrKind::Text => QrContent::Text(self.text.clone()),
            QrKind::Wifi => QrContent::Wifi(self.wifi.clone()),
            QrKind::Phone => QrContent::Phone(self.phone.clone()),
            QrKind::Email => QrContent::Email(self.email.clone()),
            QrKind::Whatsapp => QrContent::Whatsapp(self.whatsapp.clone()),
            QrKind::Vcard => QrContent::Vcard(self.vcard.clone()),
            QrKind::Event => QrContent::Event(self.event.clone()),
            QrKind::Sms => QrContent::Sms(self.sms.clone()),
            QrKind::Location => QrContent::Location(self.location.clone()),
        }
    }

    pub fn encoded(&self) -> String {
        self.content().encode()
    }

    /// False only when the encoded payload is empty (an empty plain text).
    pub fn has_payload(&self) -> bool {
        !self.encoded().is_empty()
    }

    pub fn preview(&self) -> Result<Option<Rendering>, RenderError> {
        Preview::render(&self.encoded(), &self.style)
    }

    pub fn style(&self) -> &QrStyle {
        &self.style
    }

    pub fn set_fg_color(&mut self, color: &str) -> Result<(), FormError> {
        self.style.fg_color = HexColor::parse(color)?;
        Ok(())
    }

    pub fn set_bg_color(&mut self, color: &str) -> Result<(), FormError> {
        self.style.bg_color = HexColor::parse(color)?;
        Ok(())
    }

    pub fn set_error_correction(&mut self, level: ErrorCorrection) {
        self.style.error_correction = level;
    }

    /// Sets or clears the logo reference. Blank references clear it.
    pub fn set_logo(&mut self, logo: Option<String>) {
        self.style.logo_url = logo.filter(|l| !l.trim().is_empty());
    }

    pub fn set_logo_size(&mut self, size: u8) -> Result<(), FormError> {
        self.style.set_logo_size(size)?;
        Ok(())
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn set_title(&mut self, title: Option<String>) {
        self.title = title;
    }

    /// The record the next save overwrites, if the form was opened for editing.
    pub fn editing(&self) -> Option<RecordId> {
        self.editing
    }

    /// Forgets the edited record; the next save creates a new one.
    pub fn stop_editing(&mut self) {
        self.editing = None;
    }

    pub fn draft(&self) -> RecordDraft {
        RecordDraft {
            title: self.title.clone(),
            content: self.content(),
            style: self.style.clone(),
        }
    }

    /// Applies the creation-view entry path.
    ///
    /// A requested kind selects that bundle. An edit handoff then loads the whole record. The
    /// `edit` flag without a handoff does nothing. Requests for other routes are ignored.
    pub fn arrive(&mut self, request: NavigationRequest) {
        let (route, handoff) = request.into_parts();
        let Route::Create(params) = route else {
            return;
        };
        if let Some(kind) = params.kind {
            self.select(kind);
        }
        if let Some(handoff) = handoff.filter(|_| params.edit) {
            self.load_record(handoff.into_record());
        }
    }

    fn load_record(&mut self, record: QrRecord) {
        debug!(id = %record.id, kind = %record.kind(), "loading record for edit");
        self.active = record.kind();
        self.load_content(record.content);
        self.style = record.style;
        self.title = record.title;
        self.editing = Some(record.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav::CreateParams;
    use crate::payload::WifiEncryption;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_defaults() {
        let form = FormState::new();
        assert_eq!(form.active(), QrKind::Url);
        assert_eq!(form.style(), &QrStyle::default());
        assert_eq!(form.encoded(), "https://");
        assert!(form.has_payload());
        assert!(form.editing().is_none());
    }

    #[test]
    fn test_switching_kinds_preserves_bundles() {
        let mut form = FormState::new();
        form.select(QrKind::Wifi);
        form.set_field("ssid", "Office").unwrap();
        form.set_field("password", "hunter22").unwrap();

        form.select(QrKind::Phone);
        form.set_field("phoneNumber", "5550100").unwrap();
        assert_eq!(form.encoded(), "tel:5550100");

        form.select(QrKind::Wifi);
        assert_eq!(form.encoded(), "WIFI:T:WPA;S:Office;P:hunter22;;");
    }

    #[test]
    fn test_unknown_field_and_bad_encryption() {
        let mut form = FormState::new();
        form.select(QrKind::Sms);
        assert!(matches!(
            form.set_field("ssid", "x"),
            Err(FormError::UnknownField { kind: QrKind::Sms, .. })
        ));

        form.select(QrKind::Wifi);
        assert!(matches!(form.set_field("encryption", "WPA3"), Err(FormError::Encryption(_))));
        form.set_field("encryption", "nopass").unwrap();
        assert!(form.encoded().starts_with("WIFI:T:nopass;"));
    }

    #[test]
    fn test_every_listed_field_is_settable() {
        let mut form = FormState::new();
        for kind in QrKind::ALL {
            form.select(kind);
            for name in field_names(kind) {
                let value = if *name == "encryption" { "WEP" } else { "v" };
                form.set_field(name, value).unwrap();
            }
        }
    }

    #[test]
    fn test_empty_text_has_no_payload() {
        let mut form = FormState::new();
        form.select(QrKind::Text);
        assert!(!form.has_payload());
        assert!(form.preview().unwrap().is_none());
        form.set_field("value", "hi").unwrap();
        assert!(form.has_payload());
        assert!(form.preview().unwrap().is_some());
    }

    #[test]
    fn test_style_setters() {
        let mut form = FormState::new();
        form.set_fg_color("#ABC").unwrap();
        assert_eq!(form.style().fg_color.as_str(), "#aabbcc");
        assert!(form.set_bg_color("white").is_err());
        assert!(matches!(form.set_logo_size(31), Err(FormError::Style(_))));
        form.set_logo_size(30).unwrap();
        form.set_logo(Some("  ".into()));
        assert!(form.style().logo_url.is_none());
        form.set_error_correction(ErrorCorrection::H);
        assert_eq!(form.style().error_correction, ErrorCorrection::H);
    }

    #[test]
    fn test_arrive_with_type_param() {
        let mut form = FormState::new();
        form.arrive(NavigationRequest::to(Route::Create(CreateParams::from_query("type=location"))));
        assert_eq!(form.active(), QrKind::Location);
        assert!(form.editing().is_none());
    }

    #[test]
    fn test_arrive_with_edit_handoff() {
        let now = Utc::now();
        let record = QrRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: Some("Guest WiFi".into()),
            content: QrContent::Wifi(WifiData {
                ssid: "Guest".into(),
                password: "welcome".into(),
                encryption: WifiEncryption::Wep,
            }),
            style: QrStyle {
                error_correction: ErrorCorrection::Q,
                ..QrStyle::default()
            },
            created_at: now,
            updated_at: now,
        };
        let mut form = FormState::new();
        form.arrive(NavigationRequest::edit(record.clone()));

        assert_eq!(form.active(), QrKind::Wifi);
        assert_eq!(form.encoded(), "WIFI:T:WEP;S:Guest;P:welcome;;");
        assert_eq!(form.title(), Some("Guest WiFi"));
        assert_eq!(form.style().error_correction, ErrorCorrection::Q);
        assert_eq!(form.editing(), Some(record.id));
        assert_eq!(form.draft().content, record.content);
    }
}
