//! CLI binary for slidedeck-dl.
//!
//! A thin shim over the library crate that maps CLI flags to `DeckConfig`
//! and either serves the HTTP surface or runs one request in the terminal.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use slidedeck_dl::config::DEFAULT_FREE_PROXY_LIST_URL;
use slidedeck_dl::server::{start_server, AppState};
use slidedeck_dl::{
    decode_deck_url, download, download_to_file, fetch_slide, inspect, DeckConfig,
    DownloadProgressCallback, ProgressCallback, ProxyConfig, Scheduling,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Renders a live progress bar and one log line per chunk and per failure.
/// Slides complete out of order, so only the counter is positional.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Reading viewer page…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl DownloadProgressCallback for CliProgressCallback {
    fn on_download_start(&self, total_slides: u32) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} slides  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(u64::from(total_slides));
        self.bar.set_style(style);
        self.bar.set_prefix("Downloading");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Fetching {total_slides} slides…"))
        ));
    }

    fn on_chunk_start(&self, chunk: usize, slides: usize, proxy: Option<&str>) {
        if let Some(proxy) = proxy {
            self.bar.println(dim(&format!(
                "  chunk {chunk:>3}  {slides} slides via {proxy}"
            )));
        }
    }

    fn on_slide_complete(&self, _slide: u32, _total: u32, _bytes: usize) {
        self.bar.inc(1);
    }

    fn on_slide_error(&self, slide: u32, total: u32, error: &str) {
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Slide {:>3}/{:<3}  {}",
            red("✗"),
            slide,
            total,
            red(&msg)
        ));
        // The download is already lost; later slides only tick the bar.
        self.bar.finish_and_clear();
    }

    fn on_download_complete(&self, total_slides: u32, elapsed_ms: u64) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} slides downloaded in {}",
            green("✔"),
            bold(&total_slides.to_string()),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0))
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP service on port 10000
  deckdl serve

  # Show title, slide count and image template
  deckdl info https://www.slideshare.net/someone/deck

  # Download a deck
  deckdl download https://www.slideshare.net/someone/deck -o deck.pptx

  # Fetch only slide 7
  deckdl slide https://www.slideshare.net/someone/deck 7 -o slide7.jpg

  # Use the base64 form the HTTP service takes
  deckdl --encoded info aHR0cHM6Ly93d3cuc2xpZGVzaGFyZS5uZXQvc29tZW9uZS9kZWNr

ENVIRONMENT VARIABLES:
  PORT                  Listen port for `serve` (default 10000)
  USE_PROXY             Route each chunk through a random free proxy
  DECKDL_PROXY          Comma-separated static proxy pool (overrides USE_PROXY)
  DECKDL_CHUNK_WIDTH    Slides per chunk / concurrent fetches (default 4)
  RUST_LOG              Log filter, e.g. `slidedeck_dl=debug`
"#;

/// Download hosted slide decks as PowerPoint files.
#[derive(Parser, Debug)]
#[command(
    name = "deckdl",
    version,
    about = "Download hosted slide decks as PowerPoint files",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Deck arguments are base64 of a percent-encoded URL.
    #[arg(long, global = true)]
    encoded: bool,

    /// Slides per chunk, which is also the number of concurrent fetches.
    #[arg(long, global = true, env = "DECKDL_CHUNK_WIDTH", default_value_t = 4)]
    chunk_width: usize,

    /// Wait for each chunk to finish before starting the next.
    #[arg(long, global = true, env = "DECKDL_BARRIER")]
    barrier: bool,

    /// Pick a random proxy from a free proxy listing for each chunk.
    #[arg(long, global = true, env = "USE_PROXY")]
    use_proxy: bool,

    /// Listing scraped when --use-proxy is set.
    #[arg(long, global = true, env = "DECKDL_PROXY_LIST_URL", default_value = DEFAULT_FREE_PROXY_LIST_URL)]
    proxy_list_url: String,

    /// Static proxy pool, rotated per chunk. Repeat or comma-separate.
    #[arg(long = "proxy", global = true, env = "DECKDL_PROXY", value_delimiter = ',')]
    proxies: Vec<String>,

    /// Viewer page download timeout in seconds.
    #[arg(long, global = true, env = "DECKDL_PAGE_TIMEOUT", default_value_t = 30)]
    page_timeout: u64,

    /// Per-slide download timeout in seconds.
    #[arg(long, global = true, env = "DECKDL_SLIDE_TIMEOUT", default_value_t = 30)]
    slide_timeout: u64,

    /// JPEG quality for normalised slides (1–100).
    #[arg(long, global = true, env = "DECKDL_JPEG_QUALITY", default_value_t = 75,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Disable progress bar.
    #[arg(long, global = true, env = "DECKDL_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DECKDL_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DECKDL_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API.
    Serve {
        /// Address to bind.
        #[arg(long, env = "HOST", default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on.
        #[arg(short, long, env = "PORT", default_value_t = 10000)]
        port: u16,
    },

    /// Print deck metadata without downloading slides.
    Info {
        /// Viewer page URL.
        deck: String,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Download a whole deck as .pptx.
    Download {
        /// Viewer page URL.
        deck: String,

        /// Output file. Default: the deck title with a .pptx extension.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Download one slide as JPEG.
    Slide {
        /// Viewer page URL.
        deck: String,

        /// 1-based slide number.
        slide: u32,

        /// Output file. Default: slide-<n>.jpg.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs during a download.
    let show_progress =
        !cli.quiet && !cli.no_progress && matches!(cli.command, Command::Download { .. });
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn DownloadProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress)?;

    match &cli.command {
        Command::Serve { host, port } => {
            let addr = format!("{host}:{port}");
            start_server(&addr, AppState::new(config))
                .await
                .with_context(|| format!("Server on {addr} failed"))?;
        }

        Command::Info { deck, json } => {
            let url = resolve_deck(&cli, deck)?;
            let meta = inspect(&url, &config).await.context("Failed to inspect deck")?;

            if *json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
                );
            } else {
                println!("URL:        {}", meta.url);
                println!("Title:      {}", meta.title);
                match meta.slide_count {
                    Some(n) => println!("Slides:     {}", n),
                    None => println!("Slides:     unknown"),
                }
                if let Some(ref t) = meta.template {
                    println!("Width:      {}px", t.pixel_width);
                    println!("Template:   {}", t.pattern);
                }
                println!("Estimate:   ~{}s", meta.estimated_seconds);
            }
        }

        Command::Download { deck, output } => {
            let url = resolve_deck(&cli, deck)?;

            let (path, stats) = match output {
                Some(path) => {
                    let stats = download_to_file(&url, path, &config)
                        .await
                        .context("Download failed")?;
                    (path.clone(), stats)
                }
                None => {
                    let output = download(&url, &config).await.context("Download failed")?;
                    let path = PathBuf::from(format!("{}.pptx", file_stem(&output.metadata.title)));
                    tokio::fs::write(&path, &output.bytes)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    (path, output.stats)
                }
            };

            if !cli.quiet {
                eprintln!(
                    "{}  {} slides  {} chunks  {}ms  →  {}",
                    green("✔"),
                    stats.slide_count,
                    stats.chunks,
                    stats.total_duration_ms,
                    bold(&path.display().to_string()),
                );
            }
        }

        Command::Slide {
            deck,
            slide,
            output,
        } => {
            let url = resolve_deck(&cli, deck)?;
            let image = fetch_slide(&url, *slide, &config)
                .await
                .with_context(|| format!("Failed to fetch slide {slide}"))?;

            let path = output
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("slide-{slide}.jpg")));
            tokio::fs::write(&path, &image.bytes)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;

            if !cli.quiet {
                eprintln!(
                    "{}  slide {}  {}x{}px  →  {}",
                    green("✔"),
                    slide,
                    image.pixel_width,
                    image.pixel_height,
                    bold(&path.display().to_string()),
                );
            }
        }
    }

    Ok(())
}

/// Map CLI args to `DeckConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<DeckConfig> {
    let proxy = if !cli.proxies.is_empty() {
        ProxyConfig::Pool(cli.proxies.clone())
    } else if cli.use_proxy {
        ProxyConfig::FreeList {
            list_url: cli.proxy_list_url.clone(),
        }
    } else {
        ProxyConfig::Disabled
    };

    let scheduling = if cli.barrier {
        Scheduling::ChunkBarrier
    } else {
        Scheduling::Rolling
    };

    let mut builder = DeckConfig::builder()
        .chunk_width(cli.chunk_width)
        .scheduling(scheduling)
        .proxy(proxy)
        .page_timeout_secs(cli.page_timeout)
        .slide_timeout_secs(cli.slide_timeout)
        .jpeg_quality(cli.jpeg_quality);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Turn the positional deck argument into a URL.
fn resolve_deck(cli: &Cli, deck: &str) -> Result<String> {
    if cli.encoded {
        decode_deck_url(deck).context("Failed to decode deck address")
    } else {
        Ok(deck.to_string())
    }
}

/// A file name derived from the deck title.
fn file_stem(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let stem = stem.trim_matches('_');
    if stem.is_empty() {
        "deck".to_string()
    } else {
        stem.to_string()
    }
}
