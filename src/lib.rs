//! # qrcraft
//!
//! A Rust library for building typed QR payloads, rendering them and keeping a personal library of
//! saved codes.
//!
//! `qrcraft` formats ten kinds of content (URL, text, WiFi, phone, email, WhatsApp, vCard,
//! calendar event, SMS and map location) into the exact text scanner apps expect. It encodes that
//! text as a QR Code Model 2 symbol, renders a styled SVG preview with an optional centered logo,
//! and exports SVG or PNG files. Saved codes live in a per-user library behind a pluggable store.
//!
//! ## Features
//!
//! - Ten payload kinds as one sum type, encoded by an exhaustive match.
//! - QR versions 1 to 40, four error correction levels, automatic mask selection.
//! - SVG preview with custom colors and logo excavation; PNG rasterization via `image`.
//! - Library CRUD over an async [`library::RecordStore`], with in-memory and file-backed stores.
//! - Sign-in and sign-up behind [`auth::IdentityProvider`], theme and session as explicit contexts.
//! - Safe Rust implementation with no unsafe code.
//!
//! ## Installation
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! qrcraft = "0.1" # Replace with the latest version
//! ```
//!
//! ## Example
//!
//! Encode a WiFi network and render it:
//!
//! ```rust
//! use qrcraft::form::FormState;
//! use qrcraft::payload::QrKind;
//!
//! let mut form = FormState::new();
//! form.select(QrKind::Wifi);
//! form.set_field("ssid", "Home").unwrap();
//! form.set_field("password", "secret").unwrap();
//! assert_eq!(form.encoded(), "WIFI:T:WPA;S:Home;P:secret;;");
//!
//! let preview = form.preview().unwrap().unwrap();
//! assert!(preview.svg().contains("<svg"));
//! ```
//!
//! Export a PNG:
//!
//! ```rust
//! use qrcraft::export::{export_png, DEFAULT_PNG_SIZE};
//! use qrcraft::render::Preview;
//! use qrcraft::style::QrStyle;
//!
//! let rendering = Preview::render("https://example.com", &QrStyle::default()).unwrap().unwrap();
//! let file = export_png(&rendering, "example", DEFAULT_PNG_SIZE).unwrap();
//! assert_eq!(file.file_name, "example.png");
//! ```
//!
//! ## Modules
//!
//! - [`payload`]: Content kinds and their scanner-ready encodings.
//! - [`form`]: The creation form, one field bundle per kind.
//! - [`style`]: Colors, error correction and logo options.
//! - [`qrcode`]: Core QR code encoding functionality.
//! - [`render`]: SVG preview rendering.
//! - [`export`]: SVG and PNG export.
//! - [`library`]: Saved records, profiles and stores.
//! - [`auth`]: Identity providers and the sign-in gate.
//! - [`context`], [`nav`], [`views`]: Application state, routes and page controllers.
//! - [`config`], [`logging`]: TOML configuration and tracing setup.

pub mod auth;
pub mod config;
pub mod context;
pub mod export;
pub mod form;
pub mod library;
pub mod logging;
pub mod nav;
pub mod payload;
pub mod qrcode;
pub mod render;
pub mod style;
pub mod views;
