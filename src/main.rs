use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use yt_web_client::client::{
    ClientError, DownloadRequest, FailureReason, FormatSelector, JobSnapshot, MediaType,
    Resolution, SchemeKind, SearchResult, VideoMetadata, VideoRef,
};
use yt_web_client::config::ClientConfig;
use yt_web_client::{build_clients, init_logging};

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
    /// Backend root URL (default: config file, YTWEB_BASE_URL, then http://localhost:5000)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Wire scheme of the backend: 'job' (/api/*) or 'session' (bare paths)
    #[arg(long, global = true)]
    scheme: Option<SchemeKind>,

    /// Status poll interval in milliseconds
    #[arg(long, global = true)]
    poll_ms: Option<u64>,

    /// HTTP or SOCKS5 proxy for backend requests
    #[arg(long, global = true)]
    proxy: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show formats for a video URL, or search results for a query
    Resolve { input: String },

    /// Search for videos by keyword
    Search { query: String },

    /// Start a download job and follow it to the end
    Download {
        url: String,

        /// Download audio instead of video
        #[arg(long)]
        audio: bool,

        /// Format id (video) or quality (session scheme); picked from the list when omitted
        #[arg(long)]
        format: Option<String>,

        /// Save the finished file locally instead of only printing its link
        #[arg(long)]
        fetch: bool,

        /// Directory for --fetch (default: Downloads folder)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config {
        /// Write it to the user config file
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() {
    init_logging();
    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        let client_error = e.downcast_ref::<ClientError>();
        if let Some(reason) = client_error.and_then(ClientError::hint) {
            print_hint(reason);
        }
        let code = match client_error {
            Some(ClientError::Cancelled(_)) => 130,
            _ => 1,
        };
        std::process::exit(code);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = ClientConfig::load().context("Failed to load configuration")?;
    if let Some(url) = args.base_url {
        config.base_url = url;
    }
    if let Some(scheme) = args.scheme {
        config.scheme = scheme;
    }
    if let Some(ms) = args.poll_ms {
        config.poll_interval_ms = Some(ms);
    }
    if let Some(proxy) = args.proxy {
        config.network.proxy = Some(proxy);
    }

    let (metadata, jobs) = build_clients(&config)?;

    match args.command {
        Command::Resolve { input } => match metadata.resolve(&input).await? {
            Resolution::Video(meta) => print_metadata(&meta),
            Resolution::Candidates(results) => print_candidates(&results),
        },
        Command::Search { query } => {
            let results = metadata.search(&query).await?;
            print_candidates(&results);
        }
        Command::Download {
            url,
            audio,
            format,
            fetch,
            output,
        } => {
            let media_type = if audio { MediaType::Audio } else { MediaType::Video };
            let format = match format {
                Some(format) => Some(format),
                None if jobs_need_format(&config, media_type) => {
                    let meta = metadata.fetch_formats(&VideoRef::from_url(url.clone())).await?;
                    let Some(choice) = FormatSelector::default_choice(&meta, media_type) else {
                        bail!("The backend offered no {} formats for this video", media_type);
                    };
                    if let Some(format) = FormatSelector::pick(&meta, media_type, &choice) {
                        tracing::info!("[Job] No format given, using {}", format.label());
                    }
                    Some(choice)
                }
                None => None,
            };

            let request = DownloadRequest {
                url,
                media_type,
                format_id: format,
            };

            // Ctrl-C stops polling; the backend job keeps running
            let file_url = tokio::select! {
                result = jobs.download(request, render_progress) => result?,
                _ = tokio::signal::ctrl_c() => {
                    jobs.cancel();
                    eprintln!();
                    let reason = "Stopped following the job".to_string();
                    return Err(ClientError::Cancelled(reason).into());
                }
            };
            eprintln!();
            println!("{}", file_url);

            if fetch {
                let job_id = jobs
                    .state()
                    .job_id()
                    .map(str::to_string)
                    .context("Finished job has no id")?;
                let dir = output.unwrap_or_else(|| config.download_dir());
                tokio::fs::create_dir_all(&dir)
                    .await
                    .with_context(|| format!("Cannot create {}", dir.display()))?;
                // An interrupted fetch leaves only a `.part` file behind
                let path = tokio::select! {
                    result = jobs.fetch_file(&job_id, &dir) => result?,
                    _ = tokio::signal::ctrl_c() => {
                        let reason = "File fetch interrupted".to_string();
                        return Err(ClientError::Cancelled(reason).into());
                    }
                };
                println!("Saved to {}", path.display());
            }
        }
        Command::Config { save } => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            if save {
                let path = ClientConfig::default_path()
                    .context("No user config directory on this system")?;
                config.save_to(&path)?;
                println!("Saved to {}", path.display());
            }
        }
    }

    Ok(())
}

fn print_hint(reason: FailureReason) {
    eprintln!("Cause: {}", reason.description());
    eprintln!("Hint: {}", reason.suggestion());
    if reason.is_permanent() {
        eprintln!("Retrying will not help for this video.");
    } else if reason.is_retryable() {
        eprintln!("This is usually temporary; try again in a few minutes.");
    }
}

fn jobs_need_format(config: &ClientConfig, media_type: MediaType) -> bool {
    config.scheme.build().format_required(media_type)
}

fn render_progress(job: &JobSnapshot) {
    let sizes = match (job.downloaded_mb, job.total_mb) {
        (Some(done), Some(total)) => format!(" ({:.2} / {:.2} MB)", done, total),
        _ => String::new(),
    };
    eprint!("\r[{}] {:5.1}%{} {}\x1b[K", job.status, job.progress, sizes, job.text);
    let _ = std::io::stderr().flush();
}

fn print_metadata(meta: &VideoMetadata) {
    println!("{}", meta.title);
    if let Some(duration) = meta.duration_label() {
        println!("Duration: {}", duration);
    }
    for media_type in [MediaType::Video, MediaType::Audio] {
        let options = FormatSelector::options(meta, media_type);
        if options.is_empty() {
            continue;
        }
        println!("{} formats:", media_type);
        for option in options {
            let marker = if option.is_default { "*" } else { " " };
            println!(" {} {:<12} {}", marker, option.value, option.label);
        }
    }
}

fn print_candidates(results: &[SearchResult]) {
    if results.is_empty() {
        println!("No results");
        return;
    }
    for (i, result) in results.iter().enumerate() {
        let locator = result
            .video
            .url
            .as_deref()
            .or(result.video.id.as_deref())
            .unwrap_or_default();
        println!(
            "{:>2}. {} [{}] {} {}",
            i + 1,
            result.video.title,
            result.duration.as_deref().unwrap_or("?"),
            result.channel.as_deref().unwrap_or(""),
            locator
        );
    }
}
