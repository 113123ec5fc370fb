use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use portal_login::classify::UNEXPECTED_RESPONSE;
use portal_login::delay::format_countdown;
use portal_login::{
    AuthError, ClientConfig, DelayProgress, FileStore, HttpAuthApi, LoginAttempt, LoginFlow, LoginOutcome, Profile,
    Role,
};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("terminal io failed: {0}")]
    Io(#[from] io::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("login blocked: {0}")]
    Blocked(String),
    #[error("login rejected: {0}")]
    Rejected(String),
    #[error("login abandoned after security warning")]
    Declined,
    #[error("delayed login cancelled")]
    Cancelled,
}

#[derive(Parser, Debug)]
#[command(name = "portal-login", about = "Academic portal login client")]
struct Cli {
    #[arg(long, env = "PORTAL_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "PORTAL_SESSION_FILE")]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in with a NIM, or an admin username with --admin.
    Login {
        identifier: String,
        #[arg(long)]
        admin: bool,
        /// Read from the first line of stdin when unset.
        #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        #[arg(long)]
        accept_warning: bool,
    },
    /// Wait out a student login delay issued earlier and pick up its session.
    Resume {
        delay_token: String,
        #[arg(long, default_value_t = 0)]
        seconds: u32,
    },
    Profile,
    Logout,
    Whoami,
}

fn role(admin: bool) -> Role {
    if admin { Role::Admin } else { Role::Student }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url.trim_end_matches('/').to_owned();
    }
    if let Some(session_file) = cli.session_file {
        config.session_file = session_file;
    }

    let api = Arc::new(HttpAuthApi::from_config(&config)?);
    let store = Arc::new(FileStore::new(config.session_file.clone()));
    let mut flow = LoginFlow::new(api, store).with_tick(config.tick);
    flow.restore()?;

    match cli.command {
        Command::Login { identifier, admin, password, accept_warning } => {
            let password = match password {
                Some(password) => password,
                None => read_line("password: ")?,
            };
            run_login(&mut flow, LoginAttempt::new(role(admin), identifier, password), accept_warning).await
        }
        Command::Resume { delay_token, seconds } => {
            flow.resume_delay(delay_token, seconds);
            watch_delay(&mut flow).await
        }
        Command::Profile => {
            let profile = flow.fetch_profile().await?;
            println!("{}", serde_json::to_string_pretty(profile.as_map())?);
            Ok(())
        }
        Command::Logout => {
            flow.logout().await?;
            eprintln!("logged out");
            Ok(())
        }
        Command::Whoami => {
            let session = flow.session().ok_or(AuthError::NotAuthenticated)?;
            println!("{} ({})", session.profile.display_name().unwrap_or("unknown"), role_label(session.role));
            Ok(())
        }
    }
}

// =============================================================================
// LOGIN
// =============================================================================

async fn run_login(flow: &mut LoginFlow, attempt: LoginAttempt, accept_warning: bool) -> Result<(), CliError> {
    match flow.login(attempt).await? {
        LoginOutcome::Granted { profile, .. } => {
            print_welcome(&profile);
            Ok(())
        }
        LoginOutcome::GrantedWithWarning { advisory_message, .. } => {
            eprintln!("warning: {advisory_message}");
            if accept_warning || confirm("Continue with this login?")? {
                let session = flow.accept_warning()?;
                print_welcome(&session.profile);
                Ok(())
            } else {
                flow.decline_warning();
                Err(CliError::Declined)
            }
        }
        LoginOutcome::Delayed { remaining_seconds, advisory_message, .. } => {
            if let Some(message) = advisory_message {
                eprintln!("{message}");
            }
            eprintln!("login delayed by the server for {}", format_countdown(remaining_seconds));
            watch_delay(flow).await
        }
        LoginOutcome::Blocked { reason } => Err(CliError::Blocked(reason)),
        LoginOutcome::Rejected { reason } => Err(CliError::Rejected(reason)),
    }
}

/// Render countdown progress until the active delay resolves or Ctrl-C.
async fn watch_delay(flow: &mut LoginFlow) -> Result<(), CliError> {
    loop {
        let next = tokio::select! {
            event = flow.next_delay_event() => Some(event?),
            Ok(()) = tokio::signal::ctrl_c() => None,
        };
        let Some(event) = next else {
            flow.cancel_delay();
            eprintln!();
            return Err(CliError::Cancelled);
        };

        match event {
            None => return Ok(()),
            Some(DelayProgress::Counting(remaining)) => {
                eprint!("\rplease wait {}   ", format_countdown(remaining));
                io::stderr().flush()?;
            }
            Some(DelayProgress::Verifying) => {
                eprint!("\rverifying with server...   ");
                io::stderr().flush()?;
            }
            Some(DelayProgress::Resolved(outcome)) => {
                eprintln!();
                return finish_delay(outcome);
            }
        }
    }
}

fn finish_delay(outcome: LoginOutcome) -> Result<(), CliError> {
    match outcome {
        LoginOutcome::Granted { profile, .. } => {
            print_welcome(&profile);
            Ok(())
        }
        LoginOutcome::Blocked { reason } => Err(CliError::Blocked(reason)),
        LoginOutcome::Rejected { reason } => Err(CliError::Rejected(reason)),
        LoginOutcome::GrantedWithWarning { .. } | LoginOutcome::Delayed { .. } => {
            Err(CliError::Rejected(UNEXPECTED_RESPONSE.to_owned()))
        }
    }
}

// =============================================================================
// TERMINAL
// =============================================================================

fn print_welcome(profile: &Profile) {
    let name = profile.display_name().unwrap_or("unknown");
    match profile.risk_level() {
        Some(risk) => println!("logged in as {name} (risk level: {risk})"),
        None => println!("logged in as {name}"),
    }
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::Student => "student",
        Role::Admin => "admin",
    }
}

fn read_line(prompt: &str) -> Result<String, CliError> {
    eprint!("{prompt}");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

fn confirm(prompt: &str) -> Result<bool, CliError> {
    let answer = read_line(&format!("{prompt} [y/N] "))?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
