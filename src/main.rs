//! Apex - deal intelligence from the terminal
//!
//! A CLI client for the Apex backend: upload real-estate offering memos,
//! browse extracted metrics across the portfolio, ask questions with
//! page-level citations, and serve document files to a local PDF reader.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (invalid arguments, backend failure, I/O, etc.)

mod analysis;
mod api;
mod cli;
mod config;
mod format;
mod gateway;
mod models;
mod report;
mod session;
mod upload;
mod viewer;

use anyhow::{bail, Context, Result};
use api::ApiClient;
use cli::{Args, Command, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use indicatif::{ProgressBar, ProgressStyle};
use models::DocumentSummary;
use report::DashboardView;
use session::{DocumentSession, QueryOutcome};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use viewer::LoadFault;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Logging level depends on [general] verbose, so config comes first
    let config = match load_config(&args) {
        Ok(mut config) => {
            config.merge_with_args(&args);
            config
        }
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(args.log_level(config.general.verbose));

    info!("Apex v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args, config).await {
        error!("Command failed: {}", e);
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .apex.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to point at your backend or change the gateway port.");
    Ok(())
}

/// Initialize logging at `level`.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("⚠️  Failed to set tracing subscriber: {}", e);
    }
}

/// Build the client and dispatch the command.
async fn run(args: Args, config: Config) -> Result<()> {
    let client = ApiClient::new(&config.api.base_url, config.api.timeout())
        .context("Failed to initialize the API client")?;
    debug!("Using backend {}", client.base_url());

    let Some(command) = args.command.clone() else {
        bail!("A command is required (try --help)");
    };

    match command {
        Command::List { newest_first } => handle_list(&client, &args, newest_first).await,
        Command::Show { id } => handle_show(&client, &args, &id).await,
        Command::Upload { file } => handle_upload(&client, &args, &file).await,
        Command::Ask {
            id,
            question,
            source,
        } => handle_ask(&client, &args, &id, question.as_deref(), source).await,
        Command::File { id, output } => handle_file(&client, &args, &id, &output).await,
        Command::Serve { .. } => {
            println!(
                "🌐 Serving document files on http://{}:{}",
                config.gateway.host, config.gateway.port
            );
            println!("   Backend: {}", client.base_url());
            gateway::serve(Arc::new(client), &config.gateway).await
        }
    }
}

/// `apex list`: portfolio metrics and the deals table.
async fn handle_list(client: &ApiClient, args: &Args, newest_first: bool) -> Result<()> {
    let mut documents = client
        .list_documents()
        .await
        .context("Failed to load documents")?;

    if newest_first {
        sort_newest_first(&mut documents);
    }

    let view = DashboardView {
        metrics: analysis::aggregate(&documents),
        status: analysis::status_breakdown(&documents),
        documents: &documents,
    };

    let output = match args.format {
        OutputFormat::Json => report::generate_json(&view)?,
        OutputFormat::Text => report::generate_dashboard(&view),
    };
    println!("{}", output);
    Ok(())
}

/// Order by creation timestamp, most recent first.
///
/// Timestamps are ISO-8601 so they order lexicographically.
fn sort_newest_first(documents: &mut [DocumentSummary]) {
    documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// `apex show`: one document's metrics and risk summary.
async fn handle_show(client: &ApiClient, args: &Args, id: &str) -> Result<()> {
    let detail = client
        .get_document(id)
        .await
        .with_context(|| format!("Failed to load document {}", id))?;

    let output = match args.format {
        OutputFormat::Json => report::generate_json(&detail)?,
        OutputFormat::Text => report::generate_document_detail(&detail),
    };
    println!("{}", output);
    Ok(())
}

/// `apex upload`: send a PDF and report the refreshed portfolio size.
async fn handle_upload(client: &ApiClient, args: &Args, file: &Path) -> Result<()> {
    if !args.quiet {
        println!("📤 Uploading {}", file.display());
    }

    let options = upload::UploadOptions {
        show_progress: !args.quiet,
    };
    let outcome = upload::upload_pdf(client, file, options).await?;

    if args.format == OutputFormat::Json {
        println!("{}", report::generate_json(&outcome.document)?);
        return Ok(());
    }

    println!(
        "✅ Uploaded {} as {} ({})",
        outcome.document.file_name,
        outcome.document.id,
        report::status_badge(&outcome.document.status)
    );
    match outcome.documents {
        Some(documents) => println!("   Portfolio now has {} deals.", documents.len()),
        None => println!("   Run `apex list` to see the updated portfolio."),
    }
    Ok(())
}

/// `apex ask`: answer one question, or every line read from stdin.
async fn handle_ask(
    client: &ApiClient,
    args: &Args,
    id: &str,
    question: Option<&str>,
    source: Option<usize>,
) -> Result<()> {
    let mut session = DocumentSession::new(id);
    session.load_document(client).await;

    if let Some(question) = question {
        if let QueryOutcome::Failed(message) =
            ask_once(client, args, &mut session, question, source).await?
        {
            bail!("{}", message);
        }
        return Ok(());
    }

    if !args.quiet {
        println!("💬 Ask about document {} (one question per line, Ctrl-D to quit)", id);
        println!("   Viewer commands: :next, :prev, :source N, :reset");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix(':') {
            if let Err(e) = handle_viewer_command(client, &mut session, command).await {
                eprintln!("⚠️  {}", e);
            }
            continue;
        }

        if let QueryOutcome::Failed(message) =
            ask_once(client, args, &mut session, &line, source).await?
        {
            eprintln!("❌ {}", message);
        }
    }

    Ok(())
}

/// Apply a `:command` typed at the `apex ask` prompt.
async fn handle_viewer_command(
    client: &ApiClient,
    session: &mut DocumentSession,
    command: &str,
) -> Result<()> {
    let mut parts = command.split_whitespace();

    match (parts.next(), parts.next()) {
        (Some("next"), None) => {
            session.viewer_mut().next_page();
        }
        (Some("prev"), None) => {
            session.viewer_mut().previous_page();
        }
        (Some("source"), Some(number)) => {
            let number: usize = number
                .parse()
                .with_context(|| format!("Invalid source number: {}", number))?;
            if session.select_source(number)?.is_none() {
                warn!("Source #{} has no page number", number);
            }
            session.viewer_mut().sync();
        }
        (Some("reset"), None) => {
            session.reset();
            session.load_document(client).await;
        }
        _ => bail!("Unknown command :{}", command),
    }

    print!("{}", report::generate_viewer_line(session));
    Ok(())
}

/// Ask one question and print the answer panel when it succeeds.
async fn ask_once(
    client: &ApiClient,
    args: &Args,
    session: &mut DocumentSession,
    question: &str,
    source: Option<usize>,
) -> Result<QueryOutcome> {
    let outcome = session.ask(client, question).await?;
    debug!("Query outcome: {:?}", outcome);

    if !matches!(outcome, QueryOutcome::Answered { .. }) {
        return Ok(outcome);
    }

    if let Some(number) = source {
        match session.select_source(number) {
            Ok(Some(page)) => info!("Source #{} points at page {}", number, page),
            Ok(None) => warn!("Source #{} has no page number", number),
            Err(e) => warn!("{}", e),
        }
    }

    if let Some(target) = session.viewer().pending() {
        debug!("Navigation to page {} requested", target);
        session.viewer_mut().sync();
    }

    match args.format {
        OutputFormat::Json => {
            if let Some(answer) = session.answer() {
                println!("{}", report::generate_json(answer)?);
            }
        }
        OutputFormat::Text => println!("{}", report::generate_answer(session)),
    }

    Ok(outcome)
}

/// `apex file`: download a document's PDF.
async fn handle_file(client: &ApiClient, args: &Args, id: &str, output: &Path) -> Result<()> {
    let written = download_document(client, id, output, !args.quiet).await?;

    println!("✅ Saved {} ({} bytes)", output.display(), written);
    Ok(())
}

/// Download a document's PDF to `output`.
///
/// Bytes go to `<output>.part` first, renamed once complete, so a failed
/// download leaves nothing behind.
async fn download_document(
    client: &ApiClient,
    id: &str,
    output: &Path,
    show_progress: bool,
) -> Result<u64> {
    let mut response = match client.fetch_document_file(id).await {
        Ok(response) => response,
        Err(e) => bail!("{}", LoadFault::from(&e)),
    };

    let progress = show_progress.then(|| create_download_bar(response.content_length()));
    let partial = partial_path(output);

    let result = write_response(&mut response, &partial, progress.as_ref()).await;

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    match result {
        Ok(written) => {
            tokio::fs::rename(&partial, output)
                .await
                .with_context(|| format!("Failed to move download to {}", output.display()))?;
            Ok(written)
        }
        Err(e) => {
            if let Err(remove_err) = tokio::fs::remove_file(&partial).await {
                debug!("Could not remove {}: {}", partial.display(), remove_err);
            }
            Err(e)
        }
    }
}

fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

async fn write_response(
    response: &mut reqwest::Response,
    path: &Path,
    progress: Option<&ProgressBar>,
) -> Result<u64> {
    let mut file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let mut written: u64 = 0;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(api::ApiError::from)
        .context("Download interrupted")?
    {
        file.write_all(&chunk)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written += chunk.len() as u64;
        if let Some(pb) = progress {
            pb.set_position(written);
        }
    }
    file.flush().await?;

    Ok(written)
}

fn create_download_bar(total: Option<u64>) -> ProgressBar {
    match total {
        Some(total) => {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {bytes}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb
        }
    }
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so problems go straight to stderr.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Failed to load {}: {}", CONFIG_FILE_NAME, e);
            Ok(Config::default())
        }
    }
}
