//! Routes and navigation state.
//!
//! Editing a saved record travels with the navigation itself: a [`NavigationRequest`] owns the
//! [`EditHandoff`], and the creation view consumes it by value on arrival. Nothing is left behind
//! if the navigation is abandoned.

use std::fmt;

use crate::library::QrRecord;
use crate::payload::QrKind;

/// Query parameters of the creation view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateParams {
    pub kind: Option<QrKind>,
    pub edit: bool,
}

impl CreateParams {
    /// Parses `type=<tag>&edit=true`. Unknown keys and invalid tags are ignored.
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        for pair in query.trim_start_matches('?').split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = urlencoding::decode(value).map(|v| v.into_owned()).unwrap_or_default();
            match key {
                "type" => params.kind = value.parse().ok(),
                "edit" => params.edit = value == "true",
                _ => {}
            }
        }
        params
    }

    pub fn to_query(&self) -> String {
        let mut parts = Vec::new();
        if let Some(kind) = self.kind {
            parts.push(format!("type={kind}"));
        }
        if self.edit {
            parts.push("edit=true".to_string());
        }
        parts.join("&")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Create(CreateParams),
    Dashboard,
    Profile,
}

impl Route {
    pub fn create() -> Self {
        Self::Create(CreateParams::default())
    }

    /// Parses a path such as `/create?type=wifi`.
    pub fn parse(path: &str) -> Option<Self> {
        let (path, query) = path.split_once('?').unwrap_or((path, ""));
        match path.trim_end_matches('/') {
            "" => Some(Self::Home),
            "/create" => Some(Self::Create(CreateParams::from_query(query))),
            "/dashboard" => Some(Self::Dashboard),
            "/profile" => Some(Self::Profile),
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Home => f.write_str("/"),
            Self::Create(params) => {
                let query = params.to_query();
                if query.is_empty() {
                    f.write_str("/create")
                } else {
                    write!(f, "/create?{query}")
                }
            }
            Self::Dashboard => f.write_str("/dashboard"),
            Self::Profile => f.write_str("/profile"),
        }
    }
}

/// A saved record on its way into the creation view for editing.
#[derive(Debug, Clone, PartialEq)]
pub struct EditHandoff {
    record: QrRecord,
}

impl EditHandoff {
    pub fn into_record(self) -> QrRecord {
        self.record
    }
}

/// A route plus whatever state travels with it.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationRequest {
    pub route: Route,
    handoff: Option<EditHandoff>,
}

impl NavigationRequest {
    pub fn to(route: Route) -> Self {
        Self { route, handoff: None }
    }

    /// Opens the creation view in edit mode for `record`.
    pub fn edit(record: QrRecord) -> Self {
        Self {
            route: Route::Create(CreateParams {
                kind: Some(record.kind()),
                edit: true,
            }),
            handoff: Some(EditHandoff { record }),
        }
    }

    pub fn into_parts(self) -> (Route, Option<EditHandoff>) {
        (self.route, self.handoff)
    }
}
