//! CLI entry point for `mboxsession`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand};
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};

use mboxsession::config::Config;
use mboxsession::folder::tree::ALL_MAIL;
use mboxsession::model::folder::FolderNode;
use mboxsession::model::mail::{MessageDetail, Summary};
use mboxsession::{Session, SessionRegistry};

#[derive(Parser)]
#[command(
    name = "mboxsession",
    version,
    about = "Browse large MBOX archives lazily",
    long_about = "Indexes an MBOX archive without loading it into memory, rebuilds \
                  Gmail label folders and prints message summaries, bodies and \
                  attachments on demand."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the folder tree of an archive
    Folders { path: PathBuf },
    /// List one page of a folder
    List {
        path: PathBuf,
        /// Folder id (defaults to the first folder)
        #[arg(short, long)]
        folder: Option<String>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },
    /// Show one message in full
    Show {
        path: PathBuf,
        /// Message id as printed by `list` (`<folder>::<ordinal>`)
        message_id: String,
    },
    /// Save one attachment of a message
    Attachment {
        path: PathBuf,
        message_id: String,
        /// Zero-based attachment index
        index: usize,
        /// Output file (defaults to the attachment's file name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Search summaries of a folder by keyword
    Search {
        path: PathBuf,
        query: String,
        /// Folder loaded before searching (defaults to "All Mail", else the
        /// first folder)
        #[arg(short, long)]
        folder: Option<String>,
        #[arg(short, long, default_value_t = 100)]
        max_results: usize,
    },
    /// Print the effective configuration
    Config {
        /// Write the defaults to the config file first
        #[arg(long)]
        init: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = mboxsession::config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    let json = cli.json;
    match cli.command {
        Commands::Folders { path } => cmd_folders(&config, &path, json),
        Commands::List {
            path,
            folder,
            offset,
            limit,
        } => cmd_list(&config, &path, folder.as_deref(), offset, limit, json),
        Commands::Show { path, message_id } => cmd_show(&config, &path, &message_id, json),
        Commands::Attachment {
            path,
            message_id,
            index,
            output,
        } => cmd_attachment(&config, &path, &message_id, index, output.as_deref()),
        Commands::Search {
            path,
            query,
            folder,
            max_results,
        } => cmd_search(&config, &path, &query, folder.as_deref(), max_results, json),
        Commands::Config { init } => cmd_config(&config, init),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = mboxsession::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mboxsession.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Show where configuration and logs live, optionally writing defaults.
fn cmd_config(config: &Config, init: bool) -> anyhow::Result<()> {
    let path = mboxsession::config::config_file_path();
    if init {
        mboxsession::config::save_config(&Config::default())?;
    }

    println!();
    match &path {
        Some(p) => println!("  {:<12} {}", "Config file", p.display()),
        None => println!("  {:<12} (none)", "Config file"),
    }
    println!(
        "  {:<12} {}",
        "Log file",
        mboxsession::config::log_file_path(config).display()
    );
    println!();

    let effective = if init { Config::default() } else { config.clone() };
    print!("{}", toml::to_string_pretty(&effective)?);
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mboxsession", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Open an archive in a fresh registry, showing scan progress on stderr.
fn open_session(config: &Config, path: &Path) -> anyhow::Result<Arc<Session>> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }

    let file_size = std::fs::metadata(path)?.len();
    let pb = ProgressBar::new(file_size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} Indexing [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let registry = SessionRegistry::new(config.session_settings());
    let (id, _) = registry.open_archive_with_progress(
        path,
        Some(&|current, total| {
            pb.set_length(total);
            pb.set_position(current);
        }),
    )?;
    pb.finish_and_clear();

    let session = registry.session(id)?;
    tracing::info!(
        messages = session.index().len(),
        size = %format_size(file_size, BINARY),
        elapsed = ?start.elapsed(),
        "Archive opened"
    );
    Ok(session)
}

fn cmd_folders(config: &Config, path: &Path, json: bool) -> anyhow::Result<()> {
    let session = open_session(config, path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(session.folders())?);
        return Ok(());
    }

    println!();
    println!("  {:<20} {}", "File", path.display());
    println!("  {:<20} {}", "Messages", session.index().len());
    println!();
    for folder in session.folders() {
        print_folder(folder, 0);
    }
    println!();
    Ok(())
}

fn print_folder(folder: &FolderNode, depth: usize) {
    println!(
        "  {}{:<width$} {:>8}   {}",
        "  ".repeat(depth),
        folder.name,
        folder.message_count,
        folder.id,
        width = 30usize.saturating_sub(depth * 2)
    );
    for child in &folder.children {
        print_folder(child, depth + 1);
    }
}

fn cmd_list(
    config: &Config,
    path: &Path,
    folder: Option<&str>,
    offset: usize,
    limit: usize,
    json: bool,
) -> anyhow::Result<()> {
    let session = open_session(config, path)?;
    let folder_id = match folder {
        Some(f) => f.to_string(),
        None => default_folder(&session)?,
    };

    let page = session.list_messages(&folder_id, offset, limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    println!();
    println!(
        "  {folder_id}: {}-{} of {}",
        offset.min(page.total),
        offset.min(page.total) + page.messages.len(),
        page.total
    );
    print_summary_table(&page.messages);
    Ok(())
}

/// Id of the first top-level folder.
fn default_folder(session: &Session) -> anyhow::Result<String> {
    match session.folders().first() {
        Some(f) => Ok(f.id.clone()),
        None => anyhow::bail!("Archive has no messages"),
    }
}

fn cmd_show(config: &Config, path: &Path, message_id: &str, json: bool) -> anyhow::Result<()> {
    let session = open_session(config, path)?;
    let detail = session.get_message_detail(message_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
    } else {
        print_detail(&detail);
    }
    Ok(())
}

fn cmd_attachment(
    config: &Config,
    path: &Path,
    message_id: &str,
    index: usize,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let session = open_session(config, path)?;
    let content = session.get_attachment(message_id, index)?;

    let output = match output {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(safe_file_name(&content.info.filename, index)),
    };
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(&output, &content.data)?;

    println!(
        "  Saved {} ({}, {}) to {}",
        content.info.filename,
        content.info.content_type,
        format_size(content.info.size, BINARY),
        output.display()
    );
    Ok(())
}

fn cmd_search(
    config: &Config,
    path: &Path,
    query: &str,
    folder: Option<&str>,
    max_results: usize,
    json: bool,
) -> anyhow::Result<()> {
    let session = open_session(config, path)?;
    let folder = match folder {
        Some(f) => f.to_string(),
        None if session.layout().ordinals(ALL_MAIL).is_some() => ALL_MAIL.to_string(),
        None => default_folder(&session)?,
    };
    let folder = folder.as_str();

    // Search only covers loaded summaries, so load the whole folder first.
    let total = session.list_messages(folder, 0, 0)?.total;
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Loading [{bar:40.cyan/blue}] {pos}/{len}")
            .expect("valid template")
            .progress_chars("#>-"),
    );
    const BATCH: usize = 500;
    let mut loaded = 0;
    while loaded < total {
        let page = session.list_messages(folder, loaded, BATCH)?;
        if page.messages.is_empty() {
            break;
        }
        loaded += page.messages.len();
        pb.set_position(loaded as u64);
    }
    pb.finish_and_clear();

    let results = session.search(query, max_results);

    if json {
        let output = serde_json::json!({
            "result_count": results.len(),
            "results": results,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!("  {} result(s)", results.len());
    print_summary_table(&results);
    Ok(())
}

/// Print summaries as a human-readable table.
fn print_summary_table(summaries: &[Summary]) {
    println!();
    if summaries.is_empty() {
        return;
    }

    println!(
        "  {:<18} {:<17} {:<25} {:<40} {:>3}",
        "Id", "Date", "From", "Subject", ""
    );
    println!("  {}", "-".repeat(106));

    for s in summaries {
        let date = s
            .received_date
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        let from = if s.sender_name.is_empty() {
            &s.sender_email
        } else {
            &s.sender_name
        };
        let id_trunc: String = s.id.chars().take(17).collect();
        let from_trunc: String = from.chars().take(24).collect();
        let subj_trunc: String = s.subject.chars().take(39).collect();
        let flags = format!(
            "{}{}",
            if s.is_read { ' ' } else { '*' },
            if s.has_attachments { '@' } else { ' ' }
        );

        println!(
            "  {:<18} {:<17} {:<25} {:<40} {:>3}",
            id_trunc, date, from_trunc, subj_trunc, flags
        );
    }
    println!();
}

fn print_detail(detail: &MessageDetail) {
    let join = |list: &[mboxsession::model::address::EmailAddress]| {
        list.iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };

    println!();
    println!("  {:<10} {}", "Id", detail.id);
    println!("  {:<10} {}", "Subject", detail.subject);
    println!(
        "  {:<10} {} <{}>",
        "From", detail.sender_name, detail.sender_email
    );
    if !detail.to.is_empty() {
        println!("  {:<10} {}", "To", join(&detail.to));
    }
    if !detail.cc.is_empty() {
        println!("  {:<10} {}", "Cc", join(&detail.cc));
    }
    if let Some(date) = detail.received_date {
        println!("  {:<10} {}", "Date", date.to_rfc2822());
    }
    for att in &detail.attachments {
        println!(
            "  {:<10} [{}] {} ({}, {})",
            "Attachment",
            att.index,
            att.filename,
            att.content_type,
            format_size(att.size, BINARY)
        );
    }
    println!();

    match (&detail.text, &detail.html) {
        (Some(text), _) => println!("{text}"),
        (None, Some(html)) => println!("{}", mboxsession::parser::mime::html_to_text(html)),
        (None, None) => println!("  (no body)"),
    }
}

/// File name safe to create in the current directory.
fn safe_file_name(name: &str, index: usize) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.');
    if cleaned.is_empty() {
        format!("attachment-{index}")
    } else {
        cleaned.to_string()
    }
}
