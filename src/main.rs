use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::{Value, json};

use portal::api::ApiError;
use portal::bootstrap::App;
use portal::config::{ConfigError, PortalConfig};
use portal::context::{self, ContextError};
use portal::messages::{Locale, user_message};
use portal::session::{RegisterRequest, SessionError};
use portal::theme::{Theme, ThemeError, ThemeStore};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("backend error: {0}")]
    Api(#[from] ApiError),
    #[error("{message}")]
    Session {
        message: &'static str,
        #[source]
        source: SessionError,
    },
    #[error("theme error: {0}")]
    Theme(#[from] ThemeError),
    #[error("context error: {0}")]
    Context(#[from] ContextError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("not signed in")]
    NotSignedIn,
}

impl CliError {
    fn session(err: SessionError, locale: Locale) -> Self {
        Self::Session { message: user_message(&err, locale), source: err }
    }
}

#[derive(Parser, Debug)]
#[command(name = "portal", about = "Session client for the portal backend")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the hydrated session.
    Status,
    Login(LoginArgs),
    Logout,
    Register(RegisterArgs),
    /// Fetch `/api/me`.
    Me,
    Profile(ProfileArgs),
    EmailChange(EmailChangeCommand),
    PasswordReset(PasswordResetCommand),
    Theme(ThemeArgs),
    /// Concatenate project sources into one text file.
    Context(ContextArgs),
}

#[derive(Args, Debug)]
struct LoginArgs {
    #[arg(long)]
    identity: String,
    #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
    password: String,
    /// Auth collection; defaults to the configured users collection.
    #[arg(long)]
    realm: Option<String>,
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    username: String,
    #[arg(long)]
    phone: String,
    #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
    password: String,
    /// Defaults to `--password`.
    #[arg(long)]
    password_confirm: Option<String>,
}

#[derive(Args, Debug)]
struct ProfileArgs {
    /// JSON object of fields to patch.
    #[arg(long)]
    data: String,
    /// Defaults to the signed-in user.
    #[arg(long)]
    user_id: Option<String>,
}

#[derive(Args, Debug)]
struct EmailChangeCommand {
    #[command(subcommand)]
    command: EmailChangeSubcommand,
}

#[derive(Subcommand, Debug)]
enum EmailChangeSubcommand {
    Request {
        #[arg(long)]
        new_email: String,
    },
    Confirm {
        #[arg(long)]
        token: String,
        #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[derive(Args, Debug)]
struct PasswordResetCommand {
    #[command(subcommand)]
    command: PasswordResetSubcommand,
}

#[derive(Subcommand, Debug)]
enum PasswordResetSubcommand {
    Request {
        #[arg(long)]
        email: String,
    },
    Confirm {
        #[arg(long)]
        token: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        password_confirm: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ThemeChoice {
    Light,
    Dark,
    Toggle,
}

#[derive(Args, Debug)]
struct ThemeArgs {
    /// Omit to print the saved theme.
    choice: Option<ThemeChoice>,
}

#[derive(Args, Debug)]
struct ContextArgs {
    #[arg(long, default_value = ".")]
    root: PathBuf,
    /// Defaults to `<root>/scripts/utils/context.txt`.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<(), CliError> {
    let config = PortalConfig::from_env()?;
    match command {
        Command::Theme(args) => run_theme(&config, args),
        Command::Context(args) => run_context(&args),
        command => {
            let app = App::bootstrap(&config).await?;
            run_session(&app, config.session.locale, command).await
        }
    }
}

async fn run_session(app: &App, locale: Locale, command: Command) -> Result<(), CliError> {
    let session = &app.session;
    let fail = |e| CliError::session(e, locale);
    match command {
        Command::Status => {}
        Command::Login(args) => {
            let realm = args.realm.unwrap_or_else(|| session.config().users_collection.clone());
            session.login(&args.identity, &args.password, &realm).await.map_err(fail)?;
        }
        Command::Logout => session.logout(),
        Command::Register(args) => {
            let request = RegisterRequest {
                password_confirm: args.password_confirm.unwrap_or_else(|| args.password.clone()),
                email: args.email,
                username: args.username,
                phone: args.phone,
                password: args.password,
            };
            session.register(&request).await.map_err(fail)?;
            return print_json(&json!({ "registered": request.username, "verificationRequested": true }));
        }
        Command::Me => {
            let me = session.fetch_me().await.map_err(fail)?;
            return print_json(&serde_json::to_value(me)?);
        }
        Command::Profile(args) => {
            let patch: Value = serde_json::from_str(&args.data)?;
            let user = session.current_user().ok_or(CliError::NotSignedIn)?;
            let user_id = args.user_id.unwrap_or_else(|| user.id.clone());
            session.update_profile(&user_id, &user.collection_name, &patch).await.map_err(fail)?;
        }
        Command::EmailChange(cmd) => match cmd.command {
            EmailChangeSubcommand::Request { new_email } => {
                session.request_email_change(&new_email).await.map_err(fail)?;
            }
            EmailChangeSubcommand::Confirm { token, password } => {
                session.confirm_email_change(&token, &password).await.map_err(fail)?;
            }
        },
        Command::PasswordReset(cmd) => match cmd.command {
            PasswordResetSubcommand::Request { email } => {
                session.request_password_reset(&email).await.map_err(fail)?;
            }
            PasswordResetSubcommand::Confirm { token, password, password_confirm } => {
                let confirm = password_confirm.unwrap_or_else(|| password.clone());
                session.confirm_password_reset(&token, &password, &confirm).await.map_err(fail)?;
            }
        },
        Command::Theme(_) | Command::Context(_) => return Ok(()),
    }
    print_json(&serde_json::to_value(session.snapshot())?)
}

fn run_theme(config: &PortalConfig, args: ThemeArgs) -> Result<(), CliError> {
    let store = ThemeStore::new(&config.preferences_path);
    let mut theme = store.init();
    match args.choice {
        None => {}
        Some(ThemeChoice::Light) => {
            store.set_theme(Theme::Light)?;
            theme = Theme::Light;
        }
        Some(ThemeChoice::Dark) => {
            store.set_theme(Theme::Dark)?;
            theme = Theme::Dark;
        }
        Some(ThemeChoice::Toggle) => theme = store.toggle()?,
    }
    print_json(&json!({ "theme": theme }))
}

fn run_context(args: &ContextArgs) -> Result<(), CliError> {
    let report = context::write_context(&args.root, args.output.as_deref())?;
    print_json(&json!({
        "output": report.output.map(|p| p.display().to_string()),
        "files": report.files.len(),
        "skipped": report.skipped.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
        "bytes": report.bytes,
    }))
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
