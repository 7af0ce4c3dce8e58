//! Payload encoding: typed QR content to the exact text a scanner expects.
//!
//! Each [`QrKind`] has its own field struct, and [`QrContent`] is the sum of them. Encoding is an
//! exhaustive `match`, so a new kind cannot be added without teaching the encoder about it.
//!
//! No field is validated here. Malformed phone numbers, addresses or coordinates pass through
//! unchanged and an empty form still yields its template (an empty URL becomes `https://`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The ten content kinds, persisted as their lowercase tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QrKind {
    #[default]
    Url,
    Text,
    Wifi,
    Phone,
    Email,
    Whatsapp,
    Vcard,
    Event,
    Sms,
    Location,
}

impl QrKind {
    pub const ALL: [QrKind; 10] = [
        Self::Url,
        Self::Text,
        Self::Wifi,
        Self::Phone,
        Self::Email,
        Self::Whatsapp,
        Self::Vcard,
        Self::Event,
        Self::Sms,
        Self::Location,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Text => "text",
            Self::Wifi => "wifi",
            Self::Phone => "phone",
            Self::Email => "email",
            Self::Whatsapp => "whatsapp",
            Self::Vcard => "vcard",
            Self::Event => "event",
            Self::Sms => "sms",
            Self::Location => "location",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Url => "Website URL",
            Self::Text => "Plain Text",
            Self::Wifi => "WiFi Network",
            Self::Phone => "Phone Number",
            Self::Email => "Email Address",
            Self::Whatsapp => "WhatsApp",
            Self::Vcard => "Contact Card",
            Self::Event => "Calendar Event",
            Self::Sms => "SMS Message",
            Self::Location => "Google Maps",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown QR type '{0}'")]
pub struct UnknownKind(pub String);

impl FromStr for QrKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.tag() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

impl fmt::Display for QrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UrlData {
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextData {
    pub value: String,
}

/// WiFi authentication types understood by scanner apps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WifiEncryption {
    #[default]
    #[serde(rename = "WPA")]
    Wpa,
    #[serde(rename = "WEP")]
    Wep,
    #[serde(rename = "nopass")]
    NoPass,
}

impl WifiEncryption {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wpa => "WPA",
            Self::Wep => "WEP",
            Self::NoPass => "nopass",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown WiFi encryption '{0}', expected WPA, WEP or nopass")]
pub struct UnknownEncryption(pub String);

impl FromStr for WifiEncryption {
    type Err = UnknownEncryption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WPA" => Ok(Self::Wpa),
            "WEP" => Ok(Self::Wep),
            "nopass" => Ok(Self::NoPass),
            other => Err(UnknownEncryption(other.to_string())),
        }
    }
}

impl fmt::Display for WifiEncryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WifiData {
    pub ssid: String,
    pub password: String,
    pub encryption: WifiEncryption,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct PhoneData {
    pub phone_number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct EmailData {
    pub email_address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct WhatsappData {
    pub whatsapp_number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct VcardData {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub organization: String,
    pub website: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct EventData {
    pub title: String,
    pub location: String,
    /// `YYYY-MM-DD`
    pub start_date: String,
    /// `HH:MM`
    pub start_time: String,
    pub end_date: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct SmsData {
    pub sms_number: String,
    pub sms_body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocationData {
    pub latitude: String,
    pub longitude: String,
}

/// Content of one QR code. The variant is the type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrContent {
    Url(UrlData),
    Text(TextData),
    Wifi(WifiData),
    Phone(PhoneData),
    Email(EmailData),
    Whatsapp(WhatsappData),
    Vcard(VcardData),
    Event(EventData),
    Sms(SmsData),
    Location(LocationData),
}

impl QrContent {
    pub fn kind(&self) -> QrKind {
        match self {
            Self::Url(_) => QrKind::Url,
            Self::Text(_) => QrKind::Text,
            Self::Wifi(_) => QrKind::Wifi,
            Self::Phone(_) => QrKind::Phone,
            Self::Email(_) => QrKind::Email,
            Self::Whatsapp(_) => QrKind::Whatsapp,
            Self::Vcard(_) => QrKind::Vcard,
            Self::Event(_) => QrKind::Event,
            Self::Sms(_) => QrKind::Sms,
            Self::Location(_) => QrKind::Location,
        }
    }

    /// Empty content of the given kind.
    pub fn empty(kind: QrKind) -> Self {
        match kind {
            QrKind::Url => Self::Url(UrlData::default()),
            QrKind::Text => Self::Text(TextData::default()),
            QrKind::Wifi => Self::Wifi(WifiData::default()),
            QrKind::Phone => Self::Phone(PhoneData::default()),
            QrKind::Email => Self::Email(EmailData::default()),
            QrKind::Whatsapp => Self::Whatsapp(WhatsappData::default()),
            QrKind::Vcard => Self::Vcard(VcardData::default()),
            QrKind::Event => Self::Event(EventData::default()),
            QrKind::Sms => Self::Sms(SmsData::default()),
            QrKind::Location => Self::Location(LocationData::default()),
        }
    }

    /// The text to embed in the QR matrix.
    pub fn encode(&self) -> String {
        match self {
            Self::Url(d) => {
                if d.value.starts_with("http") {
                    d.value.clone()
                } else {
                    format!("https://{}", d.value)
                }
            }
            Self::Text(d) => d.value.clone(),
            Self::Wifi(d) => format!("WIFI:T:{};S:{};P:{};;", d.encryption, d.ssid, d.password),
            Self::Phone(d) => format!("tel:{}", d.phone_number),
            Self::Email(d) => format!("mailto:{}", d.email_address),
            Self::Whatsapp(d) => {
                let digits: String = d.whatsapp_number.chars().filter(char::is_ascii_digit).collect();
                format!("https://wa.me/{digits}")
            }
            Self::Vcard(d) => [
                "BEGIN:VCARD".to_string(),
                "VERSION:3.0".to_string(),
                format!("N:{};{}", d.last_name, d.first_name),
                format!("FN:{} {}", d.first_name, d.last_name),
                format!("TEL:{}", d.phone),
                format!("EMAIL:{}", d.email),
                format!("ORG:{}", d.organization),
                format!("URL:{}", d.website),
                "END:VCARD".to_string(),
            ]
            .join("\n"),
            Self::Event(d) => [
                "BEGIN:VEVENT".to_string(),
                format!("SUMMARY:{}", d.title),
                format!("LOCATION:{}", d.location),
                format!("DTSTART:{}", compact_stamp(&d.start_date, &d.start_time)),
                format!("DTEND:{}", compact_stamp(&d.end_date, &d.end_time)),
                "END:VEVENT".to_string(),
            ]
            .join("\n"),
            Self::Sms(d) => {
                if d.sms_body.is_empty() {
                    format!("sms:{}", d.sms_number)
                } else {
                    format!("sms:{}?body={}", d.sms_number, urlencoding::encode(&d.sms_body))
                }
            }
            Self::Location(d) => format!("geo:{},{}", d.latitude, d.longitude),
        }
    }

    /// The content fields as a JSON object, without the tag.
    pub fn to_value(&self) -> serde_json::Value {
        let value = match self {
            Self::Url(d) => serde_json::to_value(d),
            Self::Text(d) => serde_json::to_value(d),
            Self::Wifi(d) => serde_json::to_value(d),
            Self::Phone(d) => serde_json::to_value(d),
            Self::Email(d) => serde_json::to_value(d),
            Self::Whatsapp(d) => serde_json::to_value(d),
            Self::Vcard(d) => serde_json::to_value(d),
            Self::Event(d) => serde_json::to_value(d),
            Self::Sms(d) => serde_json::to_value(d),
            Self::Location(d) => serde_json::to_value(d),
        };
        // Plain string-field structs always serialize.
        value.unwrap_or(serde_json::Value::Null)
    }

    /// Rebuilds content from a tag and its JSON fields.
    ///
    /// Fails if `value` is not an object of the shape `kind` requires. Missing fields default to
    /// empty, but a field that belongs to another kind is an error.
    pub fn from_value(kind: QrKind, value: serde_json::Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            QrKind::Url => Self::Url(serde_json::from_value(value)?),
            QrKind::Text => Self::Text(serde_json::from_value(value)?),
            QrKind::Wifi => Self::Wifi(serde_json::from_value(value)?),
            QrKind::Phone => Self::Phone(serde_json::from_value(value)?),
            QrKind::Email => Self::Email(serde_json::from_value(value)?),
            QrKind::Whatsapp => Self::Whatsapp(serde_json::from_value(value)?),
            QrKind::Vcard => Self::Vcard(serde_json::from_value(value)?),
            QrKind::Event => Self::Event(serde_json::from_value(value)?),
            QrKind::Sms => Self::Sms(serde_json::from_value(value)?),
            QrKind::Location => Self::Location(serde_json::from_value(value)?),
        })
    }

    /// One-line summary for library listings.
    pub fn summary(&self) -> String {
        match self {
            Self::Url(d) => d.value.clone(),
            Self::Text(d) => d.value.lines().next().unwrap_or_default().to_string(),
            Self::Wifi(d) => d.ssid.clone(),
            Self::Phone(d) => d.phone_number.clone(),
            Self::Email(d) => d.email_address.clone(),
            Self::Whatsapp(d) => d.whatsapp_number.clone(),
            Self::Vcard(d) => format!("{} {}", d.first_name, d.last_name).trim().to_string(),
            Self::Event(d) => d.title.clone(),
            Self::Sms(d) => d.sms_number.clone(),
            Self::Location(d) => format!("{}, {}", d.latitude, d.longitude),
        }
    }
}

fn compact_stamp(date: &str, time: &str) -> String {
    let mut stamp = date.replace('-', "");
    stamp.push_str(&time.replace(':', ""));
    stamp
}
