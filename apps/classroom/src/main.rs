use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use client_core::RestClient;
use serde::Serialize;
use session_engine::{
    build_view, evaluate, label, AccountRoster, Clock, ListingSettings, ManualClock,
    MutationOutcome, Phase, QueryState, SessionBoard, SystemClock, Tab,
};
use shared::{
    domain::{AccountId, AttendanceStatus, BackendStatus, CourseId, Role, SessionId, UserId},
    protocol::{Registration, Session, SessionEntry},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::Settings;

#[derive(Parser, Debug)]
#[command(name = "classroom", about = "Session lifecycle and access checks for virtual classes")]
struct Cli {
    /// Settings file (defaults to ./classroom.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[arg(long, global = true)]
    role: Option<Role>,
    #[arg(long, global = true)]
    page_size: Option<u32>,
    /// Evaluate as of this RFC 3339 instant instead of the system clock.
    #[arg(long, global = true)]
    at: Option<DateTime<Utc>>,
    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate one session without contacting the backend.
    Evaluate(EvaluateArgs),
    /// Print the label table for every phase and role.
    Labels,
    /// List sessions with lifecycle counters.
    Sessions {
        #[arg(long, default_value = "upcoming")]
        tab: Tab,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Register the current actor for an upcoming session.
    Register { session_id: i64 },
    Accounts {
        #[command(subcommand)]
        command: AccountCommand,
    },
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    Enable {
        account_id: i64,
    },
    Disable {
        account_id: i64,
    },
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// JSON file holding a session entry or a bare session (`-` reads stdin).
    #[arg(long, conflicts_with = "scheduled_at")]
    file: Option<PathBuf>,
    #[arg(long, required_unless_present = "file")]
    scheduled_at: Option<DateTime<Utc>>,
    #[arg(long)]
    duration: Option<i64>,
    #[arg(long, default_value = "scheduled")]
    status: BackendStatus,
    #[arg(long, default_value = "none")]
    attendance: AttendanceStatus,
    #[arg(long)]
    meeting_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = config::load_settings(cli.config.as_deref());
    if let Some(api_url) = cli.api_url.clone() {
        settings.api_url = api_url;
    }
    if let Some(role) = cli.role {
        settings.role = role;
    }
    if let Some(page_size) = cli.page_size {
        settings.page_size = page_size.max(1);
    }
    let clock: Arc<dyn Clock> = match cli.at {
        Some(at) => Arc::new(ManualClock::new(at)),
        None => Arc::new(SystemClock),
    };

    match cli.command {
        Command::Evaluate(args) => {
            let entry = load_entry(&args)?;
            let display = evaluate(
                &entry.session,
                &entry.registration,
                settings.role,
                clock.now(),
            );
            emit(cli.json, &display, || render::display_state(&display))?;
        }
        Command::Labels => print_labels(),
        Command::Sessions {
            tab,
            search,
            status,
            page,
        } => {
            let client = rest_client(&settings)?;
            let query = QueryState {
                search: search.unwrap_or_default(),
                status_filter: status,
                page,
                tab,
                ..QueryState::new(settings.page_size)
            };
            let entries = client
                .sessions(tab.upcoming_filter())
                .await
                .context("failed to fetch sessions")?;
            let view = build_view(&entries, settings.role, &query, clock.now());
            emit(cli.json, &view, || render::board(&view))?;
        }
        Command::Register { session_id } => {
            let client = Arc::new(rest_client(&settings)?);
            let board = SessionBoard::new(
                settings.role,
                clock,
                client.clone(),
                client,
                listing_settings(&settings),
            );
            board.refresh_now().await?;
            let outcome = board.register(SessionId(session_id)).await?;
            report(cli.json, &outcome)?;
        }
        Command::Accounts { command } => {
            let client = Arc::new(rest_client(&settings)?);
            match command {
                AccountCommand::List {
                    search,
                    status,
                    page,
                } => {
                    let query = QueryState {
                        search: search.unwrap_or_default(),
                        status_filter: status,
                        page: page.max(1),
                        ..QueryState::new(settings.page_size)
                    };
                    let listing = client
                        .accounts(&query.to_list_query())
                        .await
                        .context("failed to list accounts")?;
                    emit(cli.json, &listing, || render::accounts(&listing))?;
                }
                AccountCommand::Enable { account_id } => {
                    let roster =
                        AccountRoster::new(client.clone(), client, listing_settings(&settings));
                    let outcome = roster.enable(AccountId(account_id)).await?;
                    report(cli.json, &outcome)?;
                }
                AccountCommand::Disable { account_id } => {
                    let roster =
                        AccountRoster::new(client.clone(), client, listing_settings(&settings));
                    let outcome = roster.disable(AccountId(account_id)).await?;
                    report(cli.json, &outcome)?;
                }
            }
        }
    }

    Ok(())
}

fn rest_client(settings: &Settings) -> Result<RestClient> {
    info!(api_url = %settings.api_url, role = %settings.role, "connecting to classroom api");
    RestClient::new(&settings.api_url, settings.request_timeout())
        .context("invalid api configuration")
}

fn listing_settings(settings: &Settings) -> ListingSettings {
    ListingSettings {
        page_size: settings.page_size,
        debounce: settings.debounce(),
    }
}

fn load_entry(args: &EvaluateArgs) -> Result<SessionEntry> {
    if let Some(path) = &args.file {
        let raw = read_input(path)?;
        if let Ok(entry) = serde_json::from_str::<SessionEntry>(&raw) {
            return Ok(entry);
        }
        let session: Session =
            serde_json::from_str(&raw).context("input is neither a session entry nor a session")?;
        return Ok(SessionEntry {
            session,
            registration: Registration::none(),
        });
    }

    let scheduled_at = args
        .scheduled_at
        .context("--scheduled-at is required without --file")?;
    Ok(SessionEntry {
        session: Session {
            id: SessionId(0),
            title: "ad hoc session".to_string(),
            scheduled_at,
            duration_minutes: args.duration,
            backend_status: args.status,
            meeting_url: args.meeting_url.clone(),
            course_ref: CourseId(0),
            instructor_ref: UserId(0),
        },
        registration: Registration::with_status(args.attendance),
    })
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut raw = String::new();
        io::stdin()
            .read_to_string(&mut raw)
            .context("failed to read session from stdin")?;
        return Ok(raw);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn print_labels() {
    println!(
        "{:<20}  {:<22}  {:<22}  {}",
        "phase", "admin", "instructor", "student"
    );
    for phase in Phase::ALL {
        let [admin, instructor, student] = Role::ALL.map(|role| label(phase, role));
        println!(
            "{:<20}  {:<22}  {:<22}  {}",
            phase.as_str(),
            admin,
            instructor,
            student
        );
    }
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", text());
    }
    Ok(())
}

fn report(json: bool, outcome: &MutationOutcome) -> Result<()> {
    emit(json, outcome, || match outcome {
        MutationOutcome::Applied { message } => format!("{message}\n"),
        MutationOutcome::Rejected => "request already in flight; nothing sent\n".to_string(),
    })
}
