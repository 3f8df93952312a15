use std::fmt;
use std::sync::Arc;

use services::{Clock, StaticIdentity, SurveyLoopService};
use storage::repository::Storage;
use survey_core::model::{QuestionCatalog, UserId};
use tokio::io::BufReader;
use tracing_subscriber::{EnvFilter, fmt as log_fmt};

mod terminal;

const EMBEDDED_CATALOG: &str = include_str!("../catalog/bip.json");

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidUserId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidFlag { name: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidUserId { raw } => write!(f, "invalid --user-id value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidFlag { name, raw } => write!(f, "invalid {name} value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!(
        "  cargo run -p app -- [--db <sqlite_url>] [--user-id <id>] [--catalog <file>] [--autosave]"
    );
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://survey.sqlite3");
    eprintln!("  --catalog <embedded BIP catalog>");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  SURVEY_DB_URL, SURVEY_USER_ID, SURVEY_CATALOG, SURVEY_AUTOSAVE, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Args {
    db_url: String,
    user_id: Option<UserId>,
    catalog_path: Option<String>,
    autosave: bool,
}

fn parse_user_id(raw: String) -> Result<UserId, ArgsError> {
    raw.trim()
        .parse::<u64>()
        .map(UserId::new)
        .map_err(|_| ArgsError::InvalidUserId { raw })
}

fn parse_bool(name: &'static str, raw: String) -> Result<bool, ArgsError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ArgsError::InvalidFlag { name, raw }),
    }
}

impl Args {
    /// Flags win over the environment; `env` is injected so tests stay hermetic.
    fn parse(
        args: &mut impl Iterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut db_url = env("SURVEY_DB_URL")
            .map_or_else(|| "sqlite://survey.sqlite3".into(), normalize_sqlite_url);
        let mut user_id = env("SURVEY_USER_ID").map(parse_user_id).transpose()?;
        let mut catalog_path = env("SURVEY_CATALOG").filter(|p| !p.trim().is_empty());
        let mut autosave = env("SURVEY_AUTOSAVE")
            .map(|raw| parse_bool("SURVEY_AUTOSAVE", raw))
            .transpose()?
            .unwrap_or(false);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--user-id" => {
                    user_id = Some(parse_user_id(require_value(args, "--user-id")?)?);
                }
                "--catalog" => {
                    catalog_path = Some(require_value(args, "--catalog")?);
                }
                "--autosave" => autosave = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            user_id,
            catalog_path,
            autosave,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn load_catalog(path: Option<&str>) -> Result<QuestionCatalog, Box<dyn std::error::Error>> {
    let catalog = match path {
        Some(path) => QuestionCatalog::from_json(&std::fs::read_to_string(path)?)?,
        None => QuestionCatalog::from_json(EMBEDDED_CATALOG)?,
    };
    tracing::info!(
        source = path.unwrap_or("embedded"),
        sections = catalog.len(),
        "catalog loaded"
    );
    Ok(catalog)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    log_fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let parsed = Args::parse(&mut argv, |key| std::env::var(key).ok()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing();
    let catalog = Arc::new(load_catalog(parsed.catalog_path.as_deref())?);

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;

    let identity = parsed
        .user_id
        .map_or_else(StaticIdentity::anonymous, StaticIdentity::authenticated);
    let survey = SurveyLoopService::new(
        Clock::system(),
        catalog,
        Arc::new(identity),
        Arc::clone(&storage.answers),
    )
    .with_autosave(parsed.autosave);

    let mut session = survey.start_session()?;
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    terminal::run_survey(&survey, &mut session, stdin, &mut stdout).await
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
