use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use dup::commands::{self, AssumeYes, Confirm, LinkStatus, StdinConfirm};
use dup::config::AppConfig;
use dup::output::{self, ProgressLine};
use dup::session::{Session, SessionError};
use dup::vfs::DEFAULT_MAX_DEPTH;
use dup::VfsError;
use dup_core::ApiErrorClass;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dup")]
#[command(about = "Browse and transfer Google Drive files from the command line")]
#[command(version, disable_version_flag = true, arg_required_else_help = true)]
struct Cli {
    /// Print version and exit
    #[arg(
        short = 'v',
        long = "version",
        action = ArgAction::Version,
        value_parser = clap::value_parser!(bool)
    )]
    version: (),

    /// Log filter (trace, debug, info, warn, error or a tracing directive)
    #[arg(long, default_value = "warn", env = "DUP_LOG", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Authenticate with Google Drive in the browser
    Login,
    /// Remove the saved token
    Logout,
    /// List a folder (default: current folder)
    Ls { path: Option<String> },
    /// Show the folder hierarchy
    Tree {
        path: Option<String>,
        /// Maximum folder depth to descend
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        depth: usize,
    },
    /// Change the current folder
    Cd { path: String },
    /// Print the current folder
    Pwd,
    /// Upload a local file or folder into the current folder
    Up { local_path: PathBuf },
    /// Print a share link, offering to make the file public
    Link {
        name: String,
        /// Make the file public without asking
        #[arg(long)]
        yes: bool,
    },
    /// Download a file from the current folder
    Down {
        filename: String,
        /// Destination directory or file path
        #[arg(short = 'd', long = "dest")]
        dest: Option<PathBuf>,
    },
    /// Print version
    Version,
}

impl Commands {
    fn requires_auth(&self) -> bool {
        !matches!(self, Commands::Login | Commands::Logout | Commands::Version)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", describe(&err));
            ExitCode::FAILURE
        }
    }
}

fn init_logging(filter: &str) {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(command: Commands) -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    let page_size = config.page_size;
    let session = Session::new(config);
    if command.requires_auth() && !session.is_authenticated() {
        return Err(VfsError::AuthRequired.into());
    }
    let cursor = session.cursor_store();

    match command {
        Commands::Login => {
            if session.is_authenticated() {
                println!("Already authenticated, re-authenticating...");
            }
            session.login().await?;
            println!("Successfully authenticated with Google Drive");
        }
        Commands::Logout => {
            if session.logout()? {
                println!("Logged out");
            } else {
                println!("Not logged in");
            }
        }
        Commands::Pwd => {
            println!("{}", commands::working_dir(&cursor).current_path);
        }
        Commands::Ls { path } => {
            let accessor = accessor(&session).await?;
            let listing = commands::list(&accessor, &cursor, path.as_deref(), page_size).await?;
            print!("{}", output::render_listing(&listing));
        }
        Commands::Tree { path, depth } => {
            let accessor = accessor(&session).await?;
            let view =
                commands::tree(&accessor, &cursor, path.as_deref(), depth, page_size).await?;
            print!("{}", output::render_tree(&view));
        }
        Commands::Cd { path } => {
            let accessor = accessor(&session).await?;
            let moved = commands::change_dir(&accessor, &cursor, &path).await?;
            println!("Changed to: {}", moved.current_path);
        }
        Commands::Up { local_path } => {
            let accessor = accessor(&session).await?;
            let mut bar: Option<(PathBuf, ProgressLine)> = None;
            let report = commands::upload(
                &accessor,
                &cursor,
                &local_path,
                &mut |file: &Path, fraction: f64| {
                    if bar.as_ref().is_none_or(|(current, _)| current != file) {
                        bar = Some((file.to_path_buf(), ProgressLine::for_path("Uploading", file)));
                    }
                    if let Some((_, line)) = bar.as_mut() {
                        line.update(fraction);
                    }
                },
            )
            .await?;
            if report.folders > 0 {
                println!(
                    "Uploaded folder '{}' ({} files, {} folders)",
                    report.root.name, report.files, report.folders
                );
            } else {
                println!("Uploaded '{}'", report.root.name);
                println!("Link: {}", report.root.share_link());
            }
        }
        Commands::Link { name, yes } => {
            let accessor = accessor(&session).await?;
            let mut confirm: Box<dyn Confirm> = if yes {
                Box::new(AssumeYes(true))
            } else {
                Box::new(StdinConfirm)
            };
            let outcome =
                commands::share_link(&accessor, &cursor, &name, confirm.as_mut()).await?;
            match outcome.status {
                LinkStatus::AlreadyPublic => {
                    println!("Link: {}", outcome.link);
                }
                LinkStatus::MadePublic => {
                    println!("'{}' is now public", outcome.name);
                    println!("Link: {}", outcome.link);
                }
                LinkStatus::Private => {
                    println!("'{}' remains private", outcome.name);
                    println!("Link (requires access): {}", outcome.link);
                }
            }
        }
        Commands::Down { filename, dest } => {
            let accessor = accessor(&session).await?;
            let mut line = ProgressLine::new(format!("Downloading {filename}"));
            let written = commands::download(
                &accessor,
                &cursor,
                &filename,
                dest.as_deref(),
                &mut |fraction: f64| line.update(fraction),
            )
            .await?;
            println!("Downloaded to: {}", written.display());
        }
        Commands::Version => {
            println!("dup version {}", env!("CARGO_PKG_VERSION"));
        }
    }
    Ok(())
}

async fn accessor(session: &Session) -> anyhow::Result<dup::vfs::DriveAccessor> {
    match session.accessor().await {
        Ok(accessor) => Ok(accessor),
        Err(SessionError::NotAuthenticated) => Err(VfsError::AuthRequired.into()),
        Err(err) => Err(err).context("could not open a Google Drive session"),
    }
}

// One line on stderr, even when an API error body spans several.
fn describe(err: &anyhow::Error) -> String {
    let expired = err
        .downcast_ref::<VfsError>()
        .and_then(|err| match err {
            VfsError::Drive(drive) => drive.classification(),
            _ => None,
        })
        .is_some_and(|class| class == ApiErrorClass::Auth);
    let message = format!("{err:#}");
    let message = message.split_whitespace().collect::<Vec<_>>().join(" ");
    if expired {
        format!("{message}; run `dup login` to authenticate again")
    } else {
        message
    }
}
