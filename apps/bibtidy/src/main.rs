//! bibtidy - format, sort and fetch BibTeX entries

use std::fmt;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use arboard::Clipboard;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use bibtidy_core::{
    AbbreviationConfig, ConfigError, DoiSource, FetchError, FetchOutcome, OperationError, Report,
    Session, Settings, StringBuffer,
};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Format, sort and fetch BibTeX entries
#[derive(Parser)]
#[command(name = "bibtidy")]
#[command(version)]
#[command(after_help = "\
Examples:
  bibtidy format refs.bib --in-place
  bibtidy sort refs.bib -o sorted.bib
  bibtidy fetch --doi 10.1103/PhysRevLett.116.061102 --into refs.bib
  bibtidy abbreviate Physical Review Letters")]
struct Cli {
    /// Settings file (default: <config dir>/bibtidy/settings.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Abbreviation table (default: <config dir>/bibtidy/abbreviations.toml)
    #[arg(long, global = true)]
    abbreviations: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize every entry and write them sorted by type and label
    Format(DocumentArgs),

    /// Sort entries by type and label without changing them
    Sort(DocumentArgs),

    /// Fetch the BibTeX entry of a DOI (read from the clipboard by default)
    Fetch {
        /// DOI to fetch instead of the clipboard contents
        #[arg(long)]
        doi: Option<String>,

        /// Insert the entry into this file instead of printing it
        #[arg(long)]
        into: Option<PathBuf>,

        /// Byte offset to insert at (default: end of file)
        #[arg(long, requires = "into")]
        at: Option<usize>,

        /// Accept files without a .bib extension
        #[arg(long)]
        force: bool,
    },

    /// Print the ISO 4 abbreviation of a journal title
    Abbreviate {
        /// Journal title
        #[arg(required = true)]
        title: Vec<String>,
    },

    /// Print the effective settings and abbreviation table
    Config,
}

#[derive(Args)]
struct DocumentArgs {
    /// Input BibTeX file (use '-' for stdin)
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long, conflicts_with = "in_place")]
    output: Option<PathBuf>,

    /// Rewrite the input file
    #[arg(long)]
    in_place: bool,

    /// Accept files without a .bib extension
    #[arg(long)]
    force: bool,
}

// ---------------------------------------------------------------------------
// AppError: semantic exit codes
// ---------------------------------------------------------------------------

enum AppError {
    /// Exit 10: input file not found / unreadable / not a .bib file
    InputFile(String),
    /// Exit 11: settings or abbreviation table invalid
    Config(String),
    /// Exit 12: malformed document
    Malformed(String),
    /// Exit 13: DOI lookup failed
    Fetch(String),
    /// Exit 14: cannot write output
    OutputFile(String),
}

impl AppError {
    fn exit_code(&self) -> i32 {
        match self {
            AppError::InputFile(_) => 10,
            AppError::Config(_) => 11,
            AppError::Malformed(_) => 12,
            AppError::Fetch(_) => 13,
            AppError::OutputFile(_) => 14,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InputFile(msg) => {
                write!(f, "{}\n  hint: verify the file path is correct", msg)
            }
            AppError::Config(msg) => {
                write!(
                    f,
                    "{}\n  hint: run 'bibtidy config' to see the expected layout",
                    msg
                )
            }
            AppError::Malformed(msg) => {
                write!(f, "{}\n  hint: nothing was written", msg)
            }
            AppError::Fetch(msg) => write!(f, "{}", msg),
            AppError::OutputFile(msg) => {
                write!(
                    f,
                    "{}\n  hint: check that the output directory exists and is writable",
                    msg
                )
            }
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<OperationError> for AppError {
    fn from(e: OperationError) -> Self {
        AppError::Malformed(e.to_string())
    }
}

impl From<FetchError> for AppError {
    fn from(e: FetchError) -> Self {
        AppError::Fetch(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Host services
// ---------------------------------------------------------------------------

/// Reads the DOI from the system clipboard
struct ClipboardSource;

impl DoiSource for ClipboardSource {
    fn read_doi(&self) -> Option<String> {
        match Clipboard::new().and_then(|mut clipboard| clipboard.get_text()) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!("Cannot read the clipboard: {}", e);
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn init_logging(verbose: u8) {
    let filter = if verbose > 0 {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = cli.config.as_deref();
    let abbreviations = cli.abbreviations.as_deref();

    match cli.command {
        Commands::Format(args) => {
            let session = load_session(config, abbreviations)?;
            document_command(&args, "formatted", |buffer| session.format(buffer))?;
        }
        Commands::Sort(args) => {
            let session = load_session(config, abbreviations)?;
            document_command(&args, "sorted", |buffer| session.sort(buffer))?;
        }
        Commands::Fetch {
            doi,
            into,
            at,
            force,
        } => {
            let session = load_session(config, abbreviations)?;
            let source: Box<dyn DoiSource> = match doi {
                Some(doi) => Box::new(doi),
                None => Box::new(ClipboardSource),
            };
            fetch_command(session, source.as_ref(), into.as_deref(), at, force).await?;
        }
        Commands::Abbreviate { title } => {
            let table = AbbreviationConfig::discover(abbreviations)?.build();
            println!("{}", table.abbreviate(&title.join(" ")));
        }
        Commands::Config => {
            config_command(config, abbreviations)?;
        }
    }

    Ok(())
}

fn load_session(config: Option<&Path>, abbreviations: Option<&Path>) -> Result<Session, AppError> {
    let settings = Settings::discover(config)?;
    let abbreviations = AbbreviationConfig::discover(abbreviations)?;
    Ok(Session::new(&settings, &abbreviations)?)
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Run Format or Sort over a whole file
fn document_command<F>(args: &DocumentArgs, verb: &str, operation: F) -> Result<(), AppError>
where
    F: FnOnce(&mut StringBuffer) -> Result<Report, OperationError>,
{
    let stdin = args.input == Path::new("-");
    if args.in_place && stdin {
        return Err(AppError::InputFile(
            "--in-place needs a file, not stdin".to_string(),
        ));
    }

    let text = read_input(&args.input, args.force)?;
    let mut buffer = StringBuffer::new(text);
    let report = operation(&mut buffer)?;

    for duplicate in &report.duplicates {
        eprintln!(
            "warning: duplicate entry @{}{{{}}} at line {}, keeping the last one",
            duplicate.kind, duplicate.label, duplicate.line
        );
    }

    let mut output = buffer.into_string();
    if !output.is_empty() {
        output.push('\n');
    }

    let target = if args.in_place {
        Some(args.input.as_path())
    } else {
        args.output.as_deref()
    };

    match target {
        Some(path) => {
            write_file(path, &output)?;
            eprintln!("{} {} entries, wrote {}", verb, report.entries, path.display());
        }
        None => write_stdout(&output)?,
    }

    Ok(())
}

async fn fetch_command(
    session: Session,
    source: &dyn DoiSource,
    into: Option<&Path>,
    at: Option<usize>,
    force: bool,
) -> Result<(), AppError> {
    let Some(path) = into else {
        // Nothing to edit: run the lookup as a background task and print it
        let session = Arc::new(session);
        let input = source.read_doi().unwrap_or_default();
        let outcome = session
            .spawn_fetch(input)
            .await
            .map_err(|e| AppError::Fetch(format!("fetch task failed: {}", e)))??;

        if let FetchOutcome::Fetched { text, .. } = &outcome {
            write_stdout(&format!("{}\n", text))?;
        }
        report_invalid_doi(&outcome);
        return Ok(());
    };

    let text = read_input(path, force)?;
    let mut buffer = match at {
        Some(offset) => StringBuffer::new(text).with_cursor(offset),
        None => StringBuffer::new(text),
    };

    let outcome = session.fetch_into(&mut buffer, source).await?;
    if let FetchOutcome::Fetched { doi, .. } = &outcome {
        write_file(path, buffer.as_str())?;
        eprintln!("inserted {} into {}", doi, path.display());
    }
    report_invalid_doi(&outcome);

    Ok(())
}

fn report_invalid_doi(outcome: &FetchOutcome) {
    if let FetchOutcome::InvalidDoi(input) = outcome {
        if input.is_empty() {
            eprintln!("No DOI given");
        } else {
            eprintln!("No valid DOI in {:?}", input);
        }
    }
}

fn config_command(config: Option<&Path>, abbreviations: Option<&Path>) -> Result<(), AppError> {
    let settings = Settings::discover(config)?;
    let table = AbbreviationConfig::discover(abbreviations)?;

    let settings = settings
        .to_toml()
        .map_err(|e| AppError::Config(e.to_string()))?;
    let table = table.to_toml().map_err(|e| AppError::Config(e.to_string()))?;

    write_stdout(&format!(
        "# settings.toml\n{}\n# abbreviations.toml\n{}",
        settings, table
    ))
}

// ---------------------------------------------------------------------------
// I/O helpers
// ---------------------------------------------------------------------------

fn read_input(path: &Path, force: bool) -> Result<String, AppError> {
    if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| AppError::InputFile(format!("failed to read from stdin: {}", e)))?;
        return Ok(buf);
    }

    let is_bib = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("bib"));
    if !is_bib && !force {
        return Err(AppError::InputFile(format!(
            "'{}' is not a .bib file (pass --force to process it anyway)",
            path.display()
        )));
    }

    fs::read_to_string(path)
        .map_err(|e| AppError::InputFile(format!("'{}': {}", path.display(), e)))
}

fn write_file(path: &Path, contents: &str) -> Result<(), AppError> {
    fs::write(path, contents)
        .map_err(|e| AppError::OutputFile(format!("'{}': {}", path.display(), e)))
}

fn write_stdout(contents: &str) -> Result<(), AppError> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write!(handle, "{}", contents).map_err(|e| AppError::OutputFile(format!("stdout: {}", e)))
}
