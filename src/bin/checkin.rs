use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use qr_checkin::{
    CheckInDesk, Config, CsvStore, Decoder, Frame, Operators, QrDecoder, RosterStore, ScanOutcome,
    Session, Tone, captures_in,
};
use rayon::prelude::*;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::info;

#[derive(Parser)]
#[command(name = "checkin", version, about = "Event check-in by attendee QR code")]
struct Cli {
    /// Config file (roster path and operator table)
    #[arg(long, global = true, default_value = "checkin.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Login {
    /// Operator username
    #[arg(long)]
    user: String,
    /// Operator password
    #[arg(long, env = "CHECKIN_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Subcommand)]
enum Command {
    /// Check in the attendee whose code is in one captured image
    Scan {
        #[command(flatten)]
        login: Login,
        #[arg(long)]
        image: PathBuf,
    },
    /// Log in once, then check in one capture path per line from stdin
    Session {
        #[command(flatten)]
        login: Login,
    },
    /// Decode a directory of captures in parallel, then check them in in order
    Batch {
        #[command(flatten)]
        login: Login,
        #[arg(long)]
        dir: PathBuf,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show roster totals and duplicate roll numbers
    Status,
    /// Print the payload of a captured image without touching the roster
    Decode {
        #[arg(long)]
        image: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` when some scan could not be persisted
fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = Config::load(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;

    match cli.command {
        Command::Scan { login, image } => scan_cmd(&config, &login, &image),
        Command::Session { login } => session_cmd(&config, &login),
        Command::Batch { login, dir, limit } => batch_cmd(&config, &login, &dir, limit),
        Command::Status => status_cmd(&config).map(|_| true),
        Command::Decode { image } => decode_cmd(&config, &image).map(|_| true),
    }
}

fn login(operators: &Operators, login: &Login) -> anyhow::Result<Session> {
    operators
        .authenticate(&login.user, &login.password)
        .with_context(|| format!("login as {}", login.user))
}

fn open_desk(config: &Config) -> anyhow::Result<CheckInDesk<CsvStore>> {
    CheckInDesk::open(CsvStore::new(&config.roster), QrDecoder::new(), config.duplicates)
        .with_context(|| format!("loading roster {}", config.roster.display()))
}

fn tone_label(tone: Tone) -> &'static str {
    match tone {
        Tone::Positive => "OK",
        Tone::Warning => "WARN",
        Tone::Informational => "INFO",
        Tone::Alert => "ALERT",
    }
}

/// Print an outcome; returns false for a failed grant
fn report(source: &Path, outcome: &ScanOutcome) -> bool {
    let line = format!("[{}] {}: {}", tone_label(outcome.tone()), source.display(), outcome);
    if outcome.is_fatal() {
        eprintln!("{line}");
        false
    } else {
        println!("{line}");
        true
    }
}

fn scan_cmd(config: &Config, creds: &Login, image: &Path) -> anyhow::Result<bool> {
    let session = login(&config.operators, creds)?;
    let mut desk = open_desk(config)?;

    let frame = Frame::open(image, config.max_dim)?;
    let outcome = desk.handle_capture(&session, &frame);
    Ok(report(image, &outcome))
}

fn session_cmd(config: &Config, creds: &Login) -> anyhow::Result<bool> {
    let session = login(&config.operators, creds)?;
    let mut desk = open_desk(config)?;
    println!(
        "Welcome, {}! Enter one capture path per line (Ctrl-D to finish).",
        session.operator()
    );

    let mut clean = true;
    for line in io::stdin().lock().lines() {
        let line = line.context("reading stdin")?;
        let path = line.trim();
        if path.is_empty() {
            continue;
        }

        let path = Path::new(path);
        match Frame::open(path, config.max_dim) {
            Ok(frame) => clean &= report(path, &desk.handle_capture(&session, &frame)),
            Err(err) => eprintln!("[INFO] {}: {err}", path.display()),
        }
    }

    let roster = desk.roster();
    println!("Served {}/{}", roster.served_count(), roster.len());
    Ok(clean)
}

fn batch_cmd(
    config: &Config,
    creds: &Login,
    dir: &Path,
    limit: Option<usize>,
) -> anyhow::Result<bool> {
    let session = login(&config.operators, creds)?;
    let mut desk = open_desk(config)?;

    if !dir.exists() {
        bail!("capture directory not found: {}", dir.display());
    }
    let captures = captures_in(dir, limit);
    if captures.is_empty() {
        println!("No captures found under {}", dir.display());
        return Ok(true);
    }

    let decoder = QrDecoder::new();
    let start = Instant::now();
    let decoded: Vec<(PathBuf, Option<String>)> = captures
        .into_par_iter()
        .map(|path| {
            let payload = match Frame::open(&path, config.max_dim) {
                Ok(frame) => decoder.decode(&frame),
                Err(err) => {
                    eprintln!("[INFO] {}: {err}", path.display());
                    None
                }
            };
            (path, payload)
        })
        .collect();
    info!(captures = decoded.len(), elapsed = ?start.elapsed(), "decoded captures");

    // Resolution stays sequential, in path order
    let mut clean = true;
    for (path, payload) in decoded {
        let outcome = match payload {
            Some(payload) => ScanOutcome::Resolved(desk.handle_payload(&session, &payload)),
            None => ScanOutcome::NoCodeDetected,
        };
        clean &= report(&path, &outcome);
    }

    let roster = desk.roster();
    println!("Served {}/{}", roster.served_count(), roster.len());
    Ok(clean)
}

fn status_cmd(config: &Config) -> anyhow::Result<()> {
    let store = CsvStore::new(&config.roster);
    let roster = store
        .load()
        .with_context(|| format!("loading roster {}", store.path().display()))?;

    let served = roster.served_count();
    println!("Roster: {}", store.path().display());
    println!("Attendees: {}", roster.len());
    println!("Served: {}", served);
    println!("Remaining: {}", roster.len() - served);

    let duplicates = roster.duplicate_rolls();
    if duplicates.is_empty() {
        println!("Duplicate roll numbers: none");
    } else {
        println!("Duplicate roll numbers: {}", duplicates.join(", "));
    }
    Ok(())
}

fn decode_cmd(config: &Config, image: &Path) -> anyhow::Result<()> {
    let frame = Frame::open(image, config.max_dim)?;
    println!("Image: {} ({}x{})", image.display(), frame.width(), frame.height());

    let start = Instant::now();
    match QrDecoder::new().decode(&frame) {
        Some(payload) => println!("Payload: {payload}"),
        None => println!("{}", ScanOutcome::NoCodeDetected),
    }
    println!("Decoded in {:.2?}", start.elapsed());
    Ok(())
}
