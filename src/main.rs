use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use qrcraft::auth::{AuthForm, AuthGate, AuthMode, AuthOutcome, LocalIdentityProvider};
use qrcraft::config::Config;
use qrcraft::context::{system_prefers_dark, AppContext};
use qrcraft::export::ExportFile;
use qrcraft::form::{field_names, FormState};
use qrcraft::library::{DeleteOutcome, FileStore, LibraryService, QrRecord};
use qrcraft::logging;
use qrcraft::nav::{CreateParams, NavigationRequest, Route};
use qrcraft::payload::QrKind;
use qrcraft::style::ErrorCorrection;
use qrcraft::views::{
    CreateView, DashboardView, ProfileView, RenameOutcome, SaveOutcome, DELETE_PROMPT,
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(name = "qrcraft")]
struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a QR code, then print, save or export it.
    Create(CreateArgs),
    /// Saved QR codes.
    #[command(subcommand)]
    Library(LibraryCommand),
    #[command(subcommand)]
    Auth(AuthCommand),
    #[command(subcommand)]
    Profile(ProfileCommand),
    #[command(subcommand)]
    Theme(ThemeCommand),
}

#[derive(Args)]
struct EditArgs {
    /// Content field as `name=value`, e.g. `ssid=Home`. Repeatable.
    #[arg(long = "field", short = 'f', value_parser = parse_field)]
    fields: Vec<(String, String)>,
    #[arg(long)]
    title: Option<String>,
    /// Foreground color, `#rgb` or `#rrggbb`.
    #[arg(long)]
    fg: Option<String>,
    /// Background color, `#rgb` or `#rrggbb`.
    #[arg(long)]
    bg: Option<String>,
    /// Error correction level: L, M, Q or H.
    #[arg(long)]
    level: Option<ErrorCorrection>,
    /// Logo as a `data:` URL or a local image path.
    #[arg(long, conflicts_with = "no_logo")]
    logo: Option<String>,
    #[arg(long)]
    no_logo: bool,
    /// Logo size, 10 to 30.
    #[arg(long)]
    logo_size: Option<u8>,
}

#[derive(Args)]
struct OutputArgs {
    /// Draw the code in the terminal.
    #[arg(long)]
    ascii: bool,
    /// Write an SVG file.
    #[arg(long)]
    svg: bool,
    /// Write a PNG file.
    #[arg(long)]
    png: bool,
    /// Directory for exported files. Defaults to the configured one, else the current directory.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct CreateArgs {
    /// Content kind.
    #[arg(long = "type", short = 't', default_value = "url")]
    kind: QrKind,
    #[command(flatten)]
    edit: EditArgs,
    #[command(flatten)]
    output: OutputArgs,
    /// Save to the library (requires sign-in).
    #[arg(long)]
    save: bool,
}

#[derive(Subcommand)]
enum LibraryCommand {
    /// List saved QR codes, newest first.
    List,
    Show {
        id: Uuid,
        /// Also print the SVG markup.
        #[arg(long)]
        svg: bool,
    },
    /// Edit a saved QR code. Every style field not given keeps its stored value.
    Edit {
        id: Uuid,
        /// Switch the content kind. Fields of the new kind start empty.
        #[arg(long = "type", short = 't')]
        kind: Option<QrKind>,
        #[command(flatten)]
        edit: EditArgs,
    },
    Delete {
        id: Uuid,
        /// Skip the confirmation prompt.
        #[arg(long, short = 'y')]
        yes: bool,
    },
    Export {
        id: Uuid,
        #[arg(long, value_enum, default_value_t = Format::Png)]
        format: Format,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Svg,
    Png,
}

#[derive(Subcommand)]
enum AuthCommand {
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },
    /// Confirm a registered account, as the emailed link would.
    Confirm {
        #[arg(long)]
        email: String,
    },
    SignOut,
}

#[derive(Subcommand)]
enum ProfileCommand {
    Show,
    Rename { username: String },
}

#[derive(Subcommand)]
enum ThemeCommand {
    Show,
    Toggle,
    Set { mode: ThemeMode },
}

#[derive(Clone, Copy, ValueEnum)]
enum ThemeMode {
    Dark,
    Light,
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))
}

fn apply_edits(form: &mut FormState, edit: EditArgs) -> Result<()> {
    for (name, value) in &edit.fields {
        form.set_field(name, value).with_context(|| {
            format!(
                "fields for {} are: {}",
                form.active(),
                field_names(form.active()).join(", ")
            )
        })?;
    }
    if let Some(title) = edit.title {
        form.set_title(Some(title).filter(|t| !t.trim().is_empty()));
    }
    if let Some(fg) = &edit.fg {
        form.set_fg_color(fg)?;
    }
    if let Some(bg) = &edit.bg {
        form.set_bg_color(bg)?;
    }
    if let Some(level) = edit.level {
        form.set_error_correction(level);
    }
    if edit.no_logo {
        form.set_logo(None);
    } else if edit.logo.is_some() {
        form.set_logo(edit.logo);
    }
    if let Some(size) = edit.logo_size {
        form.set_logo_size(size)?;
    }
    Ok(())
}

fn export_dir(ctx: &AppContext, out: Option<PathBuf>) -> PathBuf {
    out.or_else(|| ctx.config.export.directory.clone())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn write_export(file: Option<ExportFile>, dir: &Path) -> Result<()> {
    match file {
        Some(file) => {
            let path = file.save_to(dir)?;
            println!("Wrote {}", path.display());
        }
        None => println!("Nothing to export: the QR code is empty."),
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn print_record(record: &QrRecord) {
    println!(
        "{}  {:<14}  {:<24}  {}",
        record.id,
        record.kind().label(),
        record.display_title(),
        record.created_at.format("%Y-%m-%d %H:%M")
    );
}

fn report_save(outcome: SaveOutcome) -> Result<()> {
    match outcome {
        SaveOutcome::SignInRequired => bail!("Sign in first: qrcraft auth sign-in --email ... --password ..."),
        SaveOutcome::Skipped => println!("Nothing to save: the QR code is empty."),
        SaveOutcome::Created { record, message } | SaveOutcome::Updated { record, message } => {
            println!("{message}");
            println!("{}", record.id);
        }
        SaveOutcome::Failed { message } => bail!(message),
    }
    Ok(())
}

async fn create(ctx: &AppContext, library: &LibraryService<FileStore>, args: CreateArgs) -> Result<()> {
    let request = NavigationRequest::to(Route::Create(CreateParams {
        kind: Some(args.kind),
        edit: false,
    }));
    let mut view = CreateView::open(ctx, library, request);
    apply_edits(view.form_mut(), args.edit)?;
    println!("{}", view.form().encoded());
    if args.output.ascii {
        if let Some(rendering) = view.preview()? {
            print!("{}", rendering.to_terminal_string(ctx.theme.is_dark()));
        }
    }

    let dir = export_dir(ctx, args.output.out);
    if args.output.svg {
        write_export(view.export_svg()?, &dir)?;
    }
    if args.output.png {
        write_export(view.export_png()?, &dir)?;
    }
    if args.save {
        report_save(view.save().await)?;
    }
    Ok(())
}

async fn library_command(
    ctx: &AppContext,
    library: &LibraryService<FileStore>,
    command: LibraryCommand,
) -> Result<()> {
    let dashboard = DashboardView::open(ctx, library)?;
    match command {
        LibraryCommand::List => {
            let records = dashboard.records().await?;
            if records.is_empty() {
                println!("No QR codes yet.");
            }
            for record in &records {
                print_record(record);
            }
        }
        LibraryCommand::Show { id, svg } => {
            let record = dashboard.record(id).await?;
            print_record(&record);
            println!("{}", record.content.summary());
            let level = record.style.error_correction;
            println!("Error correction: {level} (~{}% recovery)", level.recovery_percent());
            println!("{}", record.encoded());
            if svg {
                if let Some(rendering) = record.render()? {
                    print!("{}", rendering.svg());
                }
            }
        }
        LibraryCommand::Edit { id, kind, edit } => {
            let record = dashboard.record(id).await?;
            let mut view = CreateView::open(ctx, library, dashboard.edit(record));
            if let Some(kind) = kind {
                view.form_mut().select(kind);
            }
            apply_edits(view.form_mut(), edit)?;
            println!("{}", view.form().encoded());
            report_save(view.save().await)?;
        }
        LibraryCommand::Delete { id, yes } => {
            let outcome = dashboard
                .delete(id, |record| {
                    yes || confirm(&format!("{DELETE_PROMPT} ({})", record.display_title()))
                        .unwrap_or(false)
                })
                .await?;
            match outcome {
                DeleteOutcome::Deleted => println!("Deleted {id}"),
                DeleteOutcome::Cancelled => println!("Cancelled"),
                DeleteOutcome::NotFound => bail!("QR code {id} not found"),
            }
        }
        LibraryCommand::Export { id, format, out } => {
            let record = dashboard.record(id).await?;
            let file = match format {
                Format::Svg => dashboard.export_svg(&record)?,
                Format::Png => dashboard.export_png(&record)?,
            };
            write_export(file, &export_dir(ctx, out))?;
        }
    }
    Ok(())
}

async fn auth_command(ctx: &mut AppContext, command: AuthCommand) -> Result<()> {
    let accounts = ctx.config.store.data_dir().join("accounts.json");
    let gate = AuthGate::new(LocalIdentityProvider::open(accounts)?);
    let form = match command {
        AuthCommand::SignIn { email, password } => AuthForm {
            mode: AuthMode::SignIn,
            email,
            password,
            confirm_password: String::new(),
        },
        AuthCommand::SignUp {
            email,
            password,
            confirm_password,
        } => AuthForm {
            mode: AuthMode::SignUp,
            email,
            password,
            confirm_password,
        },
        AuthCommand::Confirm { email } => {
            gate.provider().confirm(&email)?;
            println!("Account {email} confirmed. You can sign in now.");
            return Ok(());
        }
        AuthCommand::SignOut => {
            ctx.session.sign_out()?;
            println!("Signed out.");
            return Ok(());
        }
    };
    match gate.submit(&form, &mut ctx.session).await {
        AuthOutcome::SignedIn { user, next } => println!("Signed in as {}. Next: {next}", user.email),
        AuthOutcome::SignedUp { message } => println!("{message}"),
        AuthOutcome::Failed { message } => bail!(message),
    }
    Ok(())
}

async fn profile_command(
    ctx: &AppContext,
    library: &LibraryService<FileStore>,
    command: ProfileCommand,
) -> Result<()> {
    let view = ProfileView::open(ctx, library)?;
    match command {
        ProfileCommand::Show => {
            let summary = view.load().await?;
            println!("Username:     {}", summary.profile.username.as_deref().unwrap_or(""));
            println!("Email:        {}", summary.email);
            println!("Account ID:   {}", summary.profile.id);
            println!("Member since: {}", summary.profile.created_at.format("%Y-%m-%d"));
        }
        ProfileCommand::Rename { username } => match view.rename(&username).await {
            RenameOutcome::Updated { message, .. } => println!("{message}"),
            RenameOutcome::Failed { message } => bail!(message),
        },
    }
    Ok(())
}

fn theme_command(ctx: &mut AppContext, command: ThemeCommand) -> Result<()> {
    match command {
        ThemeCommand::Show => {}
        ThemeCommand::Toggle => {
            ctx.theme.toggle()?;
        }
        ThemeCommand::Set { mode } => ctx.theme.set_dark(matches!(mode, ThemeMode::Dark))?,
    }
    println!("{}", if ctx.theme.is_dark() { "dark" } else { "light" });
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    logging::init_tracing(&config.log.level);

    let system_dark = system_prefers_dark(std::env::var("COLORFGBG").ok().as_deref());
    let mut ctx = AppContext::open(config, system_dark)?;
    let library = LibraryService::new(FileStore::new(ctx.config.store.data_dir().join("library")));

    match cli.command {
        Commands::Create(args) => create(&ctx, &library, args).await,
        Commands::Library(command) => library_command(&ctx, &library, command).await,
        Commands::Auth(command) => auth_command(&mut ctx, command).await,
        Commands::Profile(command) => profile_command(&ctx, &library, command).await,
        Commands::Theme(command) => theme_command(&mut ctx, command),
    }
}
