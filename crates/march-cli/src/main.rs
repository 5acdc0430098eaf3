//! march: seal a directory into a password-protected archive
//!
//! Commands:
//!   seal <directory>    - zip, encrypt and replace a directory with <directory>.march
//!   open <archive>      - verify, decrypt and unpack an archive next to itself
//!   config show         - display the effective configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use march_archive::{is_archive, is_directory, Archive, Stage};
use march_core::{LogConfig, MarchConfig};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "march",
    version,
    about = "Seal directories into password-protected archives",
    long_about = "march: replace a directory with a single encrypted, authenticated \
                  archive file, and restore it again"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(
        long,
        short = 'c',
        env = "MARCH_CONFIG",
        default_value = "~/.config/march/config.toml"
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "MARCH_LOG")]
    log: Option<String>,

    /// Log format; overrides the config file
    #[arg(long, env = "MARCH_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create and seal a new archive from a directory
    ///
    /// The password is read from MARCH_PASSWORD if set, otherwise prompted
    /// for twice on the terminal.
    Seal {
        /// Directory to seal
        directory: PathBuf,
        /// Keep the source directory after sealing
        #[arg(long)]
        keep: bool,
    },

    /// Open a sealed archive
    ///
    /// Accepts the archive path with or without its extension.
    Open {
        /// Archive to open
        archive: PathBuf,
        /// Keep the archive after opening
        #[arg(long)]
        keep: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

impl From<LogFormat> for march_core::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => march_core::LogFormat::Json,
            LogFormat::Text => march_core::LogFormat::Text,
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = expand_tilde(&cli.config);
    let mut config = MarchConfig::load(&config_path)
        .with_context(|| format!("loading config: {}", config_path.display()))?;
    if let Some(level) = cli.log {
        config.log.level = level;
    }
    if let Some(format) = cli.log_format {
        config.log.format = format.into();
    }

    init_logging(&config.log);
    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "march starting"
    );

    match cli.command {
        Commands::Seal { directory, keep } => cmd_seal(&config, &directory, keep),
        Commands::Open { archive, keep } => cmd_open(&config, &archive, keep),
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&config, &config_path),
    }
}

fn init_logging(log: &LogConfig) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_new(&log.level).unwrap_or_else(|_| EnvFilter::new("warn"));

    match log.format {
        march_core::LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        march_core::LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Expand `~` in path to the user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_default();
        PathBuf::from(home).join(rest)
    } else {
        path.to_path_buf()
    }
}

// ── Password prompts ──────────────────────────────────────────────────────────

const PASSWORD_ENV: &str = "MARCH_PASSWORD";

fn read_password() -> Result<SecretString> {
    if let Ok(pass) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(pass));
    }

    let pass = rpassword::prompt_password("Enter the password for the archive: ")
        .context("reading password")?;
    println!();
    Ok(SecretString::from(pass))
}

fn read_new_password() -> Result<SecretString> {
    if let Ok(pass) = std::env::var(PASSWORD_ENV) {
        anyhow::ensure!(!pass.is_empty(), "seal: {PASSWORD_ENV} is empty");
        return Ok(SecretString::from(pass));
    }

    let first = rpassword::prompt_password("Enter a password for the archive: ")
        .context("reading password")?;
    anyhow::ensure!(!first.is_empty(), "seal: password must not be empty");

    let second = rpassword::prompt_password("Confirm the password for the archive: ")
        .context("reading password")?;
    println!();
    anyhow::ensure!(first == second, "seal: passwords do not match");

    Ok(SecretString::from(first))
}

// ── Progress helpers ──────────────────────────────────────────────────────────

fn make_spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{prefix:.bold} {spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn fmt_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

// ── `march seal` ──────────────────────────────────────────────────────────────

fn cmd_seal(config: &MarchConfig, directory: &Path, keep: bool) -> Result<()> {
    anyhow::ensure!(
        is_directory(directory),
        "seal: '{}' is not a directory",
        directory.display()
    );

    let archive = Archive::from_path(directory, &config.archive.extension)?;
    let mut archive_config = config.archive.clone();
    archive_config.remove_source &= !keep;

    let password = read_new_password()?;

    let pb = make_spinner("seal");
    let report = archive
        .seal(&password, &archive_config, &|stage: Stage| {
            pb.set_message(stage.to_string())
        })
        .map_err(|e| {
            pb.abandon_with_message("failed");
            e
        })
        .with_context(|| format!("sealing {}", directory.display()))?;
    pb.finish_with_message("done");

    println!();
    println!("Successfully created archive '{}'.", archive.name());
    println!("  archive:  {}", report.archive.display());
    println!("  files:    {}", report.files);
    println!("  zipped:   {}", fmt_bytes(report.plaintext_bytes));
    println!("  sealed:   {}", fmt_bytes(report.sealed_bytes));
    if !report.source_removed {
        println!("  source directory kept");
    }
    Ok(())
}

// ── `march open` ──────────────────────────────────────────────────────────────

fn cmd_open(config: &MarchConfig, path: &Path, keep: bool) -> Result<()> {
    let archive = Archive::from_path(path, &config.archive.extension)?;
    anyhow::ensure!(
        is_archive(&archive.archive_path()),
        "open: archive not found: {}",
        archive.archive_path().display()
    );

    let mut archive_config = config.archive.clone();
    archive_config.remove_archive &= !keep;

    let password = read_password()?;

    let pb = make_spinner("open");
    let result = archive.open(&password, &archive_config, &|stage: Stage| {
        pb.set_message(stage.to_string())
    });
    let report = match result {
        Ok(report) => report,
        Err(e) if e.is_authentication() => {
            pb.abandon_with_message("failed");
            anyhow::bail!("open: wrong password or corrupted archive");
        }
        Err(e) => {
            pb.abandon_with_message("failed");
            return Err(e).with_context(|| format!("opening {}", path.display()));
        }
    };
    pb.finish_with_message("done");

    println!();
    println!("Successfully unarchived '{}'.", archive.name());
    println!("  directory: {}", report.directory.display());
    println!("  files:     {}", report.files);
    println!("  bytes:     {}", fmt_bytes(report.bytes));
    if !report.archive_removed {
        println!("  archive kept");
    }
    Ok(())
}

// ── `march config show` ───────────────────────────────────────────────────────

fn cmd_config_show(config: &MarchConfig, path: &Path) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("serializing config")?;
    println!("# config: {}", path.display());
    if !path.exists() {
        println!("# (file not found, showing defaults)");
    }
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_seal_keep() {
        let cli = Cli::try_parse_from(["march", "seal", "photos", "--keep"]).unwrap();
        match cli.command {
            Commands::Seal { directory, keep } => {
                assert_eq!(directory, PathBuf::from("photos"));
                assert!(keep);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_log_format() {
        let cli =
            Cli::try_parse_from(["march", "--log-format", "json", "open", "photos.march"]).unwrap();
        assert!(matches!(cli.log_format, Some(LogFormat::Json)));
    }

    #[test]
    fn test_expand_tilde() {
        let home = std::env::var("HOME").unwrap_or_default();
        assert_eq!(
            expand_tilde(Path::new("~/.config/march/config.toml")),
            PathBuf::from(home).join(".config/march/config.toml")
        );
        assert_eq!(expand_tilde(Path::new("/etc/march.toml")), PathBuf::from("/etc/march.toml"));
    }

    #[test]
    fn test_fmt_bytes() {
        assert_eq!(fmt_bytes(512), "512 B");
        assert_eq!(fmt_bytes(2048), "2.0 KB");
        assert_eq!(fmt_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
