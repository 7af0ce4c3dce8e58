//! One controller per page: creation, dashboard and profile.
//!
//! Views borrow the [`AppContext`] and a [`LibraryService`] and turn their results into the
//! outcomes and messages a user sees. Failures never escape as panics; each is scoped to the
//! action that caused it.

use thiserror::Error;
use tracing::warn;

use crate::auth::AuthUser;
use crate::config::ExportConfig;
use crate::context::{AppContext, SessionContext};
use crate::export::{self, ExportError, ExportFile};
use crate::form::FormState;
use crate::library::{
    DeleteOutcome, LibraryError, LibraryService, QrRecord, RecordId, RecordStore, UserProfile,
};
use crate::nav::NavigationRequest;
use crate::render::{RenderError, Rendering};

pub const SAVED: &str = "QR Code saved to your library!";
pub const UPDATED: &str = "QR Code updated successfully!";
pub const SAVE_FAILED: &str = "Failed to save QR code. Please try again.";
pub const DELETE_PROMPT: &str = "Are you sure you want to delete this QR code?";
pub const PROFILE_UPDATED: &str = "Profile updated successfully!";
pub const PROFILE_UPDATE_FAILED: &str = "Failed to update profile";

#[derive(Debug, Error)]
pub enum ViewError {
    /// The page needs a signed-in user; the caller goes back home.
    #[error("Please sign in to continue")]
    SignInRequired,
    #[error("Failed to delete QR code")]
    DeleteFailed(#[source] LibraryError),
    #[error(transparent)]
    Library(#[from] LibraryError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Nobody is signed in; the sign-in modal should open.
    SignInRequired,
    /// The payload is empty, so there is nothing to save.
    Skipped,
    Created { record: QrRecord, message: &'static str },
    Updated { record: QrRecord, message: &'static str },
    Failed { message: String },
}

fn save_failure(err: LibraryError) -> SaveOutcome {
    warn!(error = %err, "save failed");
    let message = match err {
        LibraryError::NotFound(_) => err.to_string(),
        LibraryError::Store(_) => SAVE_FAILED.to_string(),
    };
    SaveOutcome::Failed { message }
}

/// Builds the SVG or PNG export of a record, named after its title.
fn record_export(
    record: &QrRecord,
    export: &ExportConfig,
    png: bool,
) -> Result<Option<ExportFile>, ExportError> {
    let Some(rendering) = record.render()? else {
        return Ok(None);
    };
    let stem = export_stem(record.title.as_deref(), export);
    export_rendering(&rendering, &stem, export, png).map(Some)
}

fn export_stem(title: Option<&str>, export: &ExportConfig) -> String {
    match title.map(str::trim) {
        Some(t) if !t.is_empty() => export::file_stem(Some(t)),
        _ => export.file_stem.clone(),
    }
}

fn export_rendering(
    rendering: &Rendering,
    stem: &str,
    export: &ExportConfig,
    png: bool,
) -> Result<ExportFile, ExportError> {
    if png {
        export::export_png(rendering, stem, export.png_size)
    } else {
        Ok(export::export_svg(rendering, stem))
    }
}

/// The creation page: form, live preview, save and export.
pub struct CreateView<'a, S> {
    library: &'a LibraryService<S>,
    session: &'a SessionContext,
    export: &'a ExportConfig,
    form: FormState,
}

impl<'a, S: RecordStore> CreateView<'a, S> {
    /// Opens the page with the configured default style and applies the navigation that led here.
    pub fn open(ctx: &'a AppContext, library: &'a LibraryService<S>, request: NavigationRequest) -> Self {
        let mut form = FormState::with_style(ctx.config.defaults.style());
        form.arrive(request);
        Self {
            library,
            session: &ctx.session,
            export: &ctx.config.export,
            form,
        }
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormState {
        &mut self.form
    }

    pub fn preview(&self) -> Result<Option<Rendering>, RenderError> {
        self.form.preview()
    }

    /// Saves the form: an update when editing, otherwise a new record.
    ///
    /// Takes `&mut self`, so a second save cannot start while one is in flight.
    pub async fn save(&mut self) -> SaveOutcome {
        let Some(user) = self.session.user() else {
            return SaveOutcome::SignInRequired;
        };
        if !self.form.has_payload() {
            return SaveOutcome::Skipped;
        }
        let draft = self.form.draft();
        match self.form.editing() {
            Some(id) => match self.library.update(user, id, draft).await {
                Ok(record) => {
                    self.form.stop_editing();
                    SaveOutcome::Updated {
                        record,
                        message: UPDATED,
                    }
                }
                Err(e) => save_failure(e),
            },
            None => match self.library.create(user, draft).await {
                Ok(record) => SaveOutcome::Created {
                    record,
                    message: SAVED,
                },
                Err(e) => save_failure(e),
            },
        }
    }

    /// `None` when there is nothing rendered to export.
    pub fn export_svg(&self) -> Result<Option<ExportFile>, ExportError> {
        self.build_export(false)
    }

    /// `None` when there is nothing rendered to export.
    pub fn export_png(&self) -> Result<Option<ExportFile>, ExportError> {
        self.build_export(true)
    }

    fn build_export(&self, png: bool) -> Result<Option<ExportFile>, ExportError> {
        let Some(rendering) = self.form.preview()? else {
            return Ok(None);
        };
        let stem = export_stem(self.form.title(), self.export);
        export_rendering(&rendering, &stem, self.export, png).map(Some)
    }
}

/// The library page. Only reachable while signed in.
pub struct DashboardView<'a, S> {
    library: &'a LibraryService<S>,
    user: &'a AuthUser,
    export: &'a ExportConfig,
}

impl<'a, S: RecordStore> DashboardView<'a, S> {
    pub fn open(ctx: &'a AppContext, library: &'a LibraryService<S>) -> Result<Self, ViewError> {
        let user = ctx.session.user().ok_or(ViewError::SignInRequired)?;
        Ok(Self {
            library,
            user,
            export: &ctx.config.export,
        })
    }

    pub async fn records(&self) -> Result<Vec<QrRecord>, ViewError> {
        Ok(self.library.list(self.user).await?)
    }

    pub async fn record(&self, id: RecordId) -> Result<QrRecord, ViewError> {
        Ok(self.library.get(self.user, id).await?)
    }

    /// The navigation that opens `record` in the creation page for editing.
    pub fn edit(&self, record: QrRecord) -> NavigationRequest {
        NavigationRequest::edit(record)
    }

    /// Deletes after `confirm` accepts [`DELETE_PROMPT`] for the record.
    pub async fn delete<F>(&self, id: RecordId, confirm: F) -> Result<DeleteOutcome, ViewError>
    where
        F: FnOnce(&QrRecord) -> bool,
    {
        self.library
            .delete(self.user, id, confirm)
            .await
            .map_err(ViewError::DeleteFailed)
    }

    pub fn export_svg(&self, record: &QrRecord) -> Result<Option<ExportFile>, ExportError> {
        record_export(record, self.export, false)
    }

    pub fn export_png(&self, record: &QrRecord) -> Result<Option<ExportFile>, ExportError> {
        record_export(record, self.export, true)
    }
}

/// What the profile page shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSummary {
    pub profile: UserProfile,
    pub email: String,
}

impl ProfileSummary {
    /// Avatar letter: first letter of the username, else of the email.
    pub fn initial(&self) -> Option<char> {
        self.profile
            .username
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(self.email.as_str())
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    Updated { profile: UserProfile, message: &'static str },
    Failed { message: &'static str },
}

/// The profile page. Only reachable while signed in.
pub struct ProfileView<'a, S> {
    library: &'a LibraryService<S>,
    user: &'a AuthUser,
}

impl<'a, S: RecordStore> ProfileView<'a, S> {
    pub fn open(ctx: &'a AppContext, library: &'a LibraryService<S>) -> Result<Self, ViewError> {
        let user = ctx.session.user().ok_or(ViewError::SignInRequired)?;
        Ok(Self { library, user })
    }

    /// Fetches the profile, creating it on first visit.
    pub async fn load(&self) -> Result<ProfileSummary, ViewError> {
        let profile = self.library.profile(self.user).await?;
        Ok(ProfileSummary {
            profile,
            email: self.user.email.clone(),
        })
    }

    pub async fn rename(&self, username: &str) -> RenameOutcome {
        match self.library.rename(self.user, username).await {
            Ok(profile) => RenameOutcome::Updated {
                profile,
                message: PROFILE_UPDATED,
            },
            Err(e) => {
                warn!(error = %e, "profile update failed");
                RenameOutcome::Failed {
                    message: PROFILE_UPDATE_FAILED,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::library::MemoryStore;
    use crate::nav::{CreateParams, Route};
    use crate::payload::QrKind;
    use uuid::Uuid;

    fn signed_in() -> AppContext {
        let mut ctx = AppContext::ephemeral(Config::default());
        ctx.session
            .sign_in(AuthUser {
                id: Uuid::new_v4(),
                email: "jane@example.com".into(),
            })
            .unwrap();
        ctx
    }

    fn to_create() -> NavigationRequest {
        NavigationRequest::to(Route::create())
    }

    #[tokio::test]
    async fn test_save_requires_sign_in() {
        let ctx = AppContext::ephemeral(Config::default());
        let library = LibraryService::new(MemoryStore::new());
        let mut view = CreateView::open(&ctx, &library, to_create());
        assert_eq!(view.save().await, SaveOutcome::SignInRequired);
    }

    #[tokio::test]
    async fn test_empty_payload_is_skipped() {
        let ctx = signed_in();
        let library = LibraryService::new(MemoryStore::new());
        let request = NavigationRequest::to(Route::Create(CreateParams::from_query("type=text")));
        let mut view = CreateView::open(&ctx, &library, request);
        assert_eq!(view.save().await, SaveOutcome::Skipped);
        assert!(view.export_svg().unwrap().is_none());
        assert!(view.export_png().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_edit_then_update() {
        let ctx = signed_in();
        let library = LibraryService::new(MemoryStore::new());

        let mut view = CreateView::open(&ctx, &library, to_create());
        view.form_mut().set_field("value", "example.com").unwrap();
        view.form_mut().set_title(Some("Site".into()));
        let SaveOutcome::Created { record, message } = view.save().await else {
            panic!("expected a new record");
        };
        assert_eq!(message, SAVED);
        assert_eq!(record.encoded(), "https://example.com");

        let dashboard = DashboardView::open(&ctx, &library).unwrap();
        let request = dashboard.edit(record.clone());
        let mut view = CreateView::open(&ctx, &library, request);
        assert_eq!(view.form().editing(), Some(record.id));
        view.form_mut().set_field("value", "https://example.org").unwrap();
        let SaveOutcome::Updated { record: updated, message } = view.save().await else {
            panic!("expected an update");
        };
        assert_eq!(message, UPDATED);
        assert_eq!(updated.id, record.id);
        assert!(view.form().editing().is_none());

        let records = dashboard.records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].encoded(), "https://example.org");
    }

    #[tokio::test]
    async fn test_edit_can_change_the_kind() {
        let ctx = signed_in();
        let library = LibraryService::new(MemoryStore::new());
        let mut view = CreateView::open(&ctx, &library, to_create());
        view.form_mut().set_field("value", "example.com").unwrap();
        let SaveOutcome::Created { record, .. } = view.save().await else {
            panic!("expected a new record");
        };

        let dashboard = DashboardView::open(&ctx, &library).unwrap();
        let mut view = CreateView::open(&ctx, &library, dashboard.edit(record.clone()));
        view.form_mut().select(QrKind::Phone);
        view.form_mut().set_field("phoneNumber", "+15550100").unwrap();
        let SaveOutcome::Updated { record: updated, .. } = view.save().await else {
            panic!("expected an update");
        };
        assert_eq!(updated.id, record.id);

        let stored = dashboard.record(record.id).await.unwrap();
        assert_eq!(stored.kind(), QrKind::Phone);
        assert_eq!(stored.encoded(), "tel:+15550100");
    }

    #[tokio::test]
    async fn test_updating_a_deleted_record_fails_with_message() {
        let ctx = signed_in();
        let library = LibraryService::new(MemoryStore::new());
        let mut view = CreateView::open(&ctx, &library, to_create());
        let SaveOutcome::Created { record, .. } = view.save().await else {
            panic!("expected a new record");
        };
        let dashboard = DashboardView::open(&ctx, &library).unwrap();
        let mut editor = CreateView::open(&ctx, &library, dashboard.edit(record.clone()));
        assert_eq!(
            dashboard.delete(record.id, |_| true).await.unwrap(),
            DeleteOutcome::Deleted
        );
        assert_eq!(
            editor.save().await,
            SaveOutcome::Failed {
                message: "QR code not found".into()
            }
        );
    }

    #[tokio::test]
    async fn test_dashboard_requires_sign_in() {
        let ctx = AppContext::ephemeral(Config::default());
        let library = LibraryService::new(MemoryStore::new());
        assert!(matches!(
            DashboardView::open(&ctx, &library),
            Err(ViewError::SignInRequired)
        ));
        assert!(matches!(
            ProfileView::open(&ctx, &library),
            Err(ViewError::SignInRequired)
        ));
    }

    #[tokio::test]
    async fn test_dashboard_exports_are_named_after_title() {
        let ctx = signed_in();
        let library = LibraryService::new(MemoryStore::new());
        let mut view = CreateView::open(&ctx, &library, to_create());
        view.form_mut().select(QrKind::Phone);
        view.form_mut().set_field("phoneNumber", "5550100").unwrap();
        view.form_mut().set_title(Some("Front desk".into()));
        view.save().await;
        view.form_mut().set_title(None);
        view.save().await;

        let dashboard = DashboardView::open(&ctx, &library).unwrap();
        let mut names: Vec<_> = Vec::new();
        for record in dashboard.records().await.unwrap() {
            names.push(dashboard.export_svg(&record).unwrap().unwrap().file_name);
            names.push(dashboard.export_png(&record).unwrap().unwrap().file_name);
        }
        names.sort();
        assert_eq!(names, ["Front desk.png", "Front desk.svg", "qrcode.png", "qrcode.svg"]);
    }

    #[tokio::test]
    async fn test_profile_load_and_rename() {
        let ctx = signed_in();
        let library = LibraryService::new(MemoryStore::new());
        let view = ProfileView::open(&ctx, &library).unwrap();

        let summary = view.load().await.unwrap();
        assert_eq!(summary.profile.username.as_deref(), Some("jane"));
        assert_eq!(summary.initial(), Some('J'));

        let RenameOutcome::Updated { profile, message } = view.rename("zed").await else {
            panic!("rename failed");
        };
        assert_eq!(message, PROFILE_UPDATED);
        assert_eq!(profile.username.as_deref(), Some("zed"));
        assert_eq!(view.load().await.unwrap().initial(), Some('Z'));
    }
}
