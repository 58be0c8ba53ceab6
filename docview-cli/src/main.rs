//! docview CLI - headless driver for the docview core
//!
//! Opens a converted document, waits for it to become ready, optionally
//! walks its pages, and prints the session's events and cache statistics.

mod error;
mod runner;

use clap::Parser;
use docview::layout::ZoomValue;
use docview::{Message, SessionOutcome};
use error::CliError;
use runner::CliRunner;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast;

#[derive(Parser)]
#[command(name = "docview")]
#[command(about = "Load a converted document headlessly and report its events", long_about = None)]
struct Args {
    /// Base URL or local directory of the document's assets
    #[arg(long)]
    url: Option<String>,

    /// Config file (default: ~/.docview/config.ini)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Initial layout (vertical, horizontal, presentation, presentation-two-page, text)
    #[arg(long)]
    layout: Option<String>,

    /// Initial page, 1-based
    #[arg(long)]
    page: Option<u32>,

    /// Initial zoom (auto, fitwidth, fitheight, in, out or a level such as 1.5)
    #[arg(long)]
    zoom: Option<String>,

    /// Visit every page after the document is ready
    #[arg(long)]
    load_all: bool,

    /// Seconds to wait for the document before giving up
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// Directory for the log file (overrides the config file)
    #[arg(long)]
    log_dir: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    if let Err(e) = run(args).await {
        e.exit();
    }
}

async fn run(args: Args) -> Result<(), CliError> {
    let runner = CliRunner::new(args.config.as_deref(), args.log_dir.as_deref())?;

    let mut config = runner.config().viewer.clone();
    if let Some(url) = args.url {
        config.url = Some(url);
    }
    if let Some(layout) = args.layout {
        config.layout = layout;
    }
    if let Some(page) = args.page {
        config.page = Some(page);
    }
    if let Some(zoom) = args.zoom {
        let zoom = zoom
            .parse::<ZoomValue>()
            .map_err(|e| CliError::Argument(format!("--zoom {}: {}", zoom, e)))?;
        config.zoom = Some(zoom);
    }

    runner.log_startup(config.url.as_deref().unwrap_or_default());
    let viewer = runner.create_viewer(config)?;
    let events = viewer.subscribe();
    let printer = tokio::spawn(print_events(events));

    viewer.init()?;
    viewer.load_assets()?;

    let outcome = tokio::time::timeout(Duration::from_secs(args.timeout), viewer.ready()).await;
    let result = match outcome {
        Ok(SessionOutcome::Ready { page, num_pages }) => {
            println!(
                "Ready: page {} of {} ({})",
                page,
                num_pages,
                viewer.layout().unwrap_or_default()
            );
            if args.load_all {
                for page in 1..=num_pages {
                    viewer.scroll_to(page)?;
                    tokio::task::yield_now().await;
                }
            }
            Ok(())
        }
        Ok(SessionOutcome::Failed(failure)) => Err(CliError::Load(failure)),
        Ok(SessionOutcome::Destroyed) => Err(CliError::Destroyed),
        Err(_) => Err(CliError::Argument(format!(
            "document not ready after {}s (raise --timeout)",
            args.timeout
        ))),
    };

    if let Some(stats) = viewer.stats() {
        println!("Asset cache:");
        println!("  Requests:  {}", stats.total_requests);
        println!(
            "  Coalesced: {} ({:.1}%)",
            stats.coalesced_requests,
            stats.coalescing_ratio() * 100.0
        );
        println!("  Fetches:   {}", stats.fetch_attempts);
        println!("  Retries:   {}", stats.retries);
        println!("  Failures:  {}", stats.failures);
        println!("  Aborted:   {}", stats.aborted);
    }

    viewer.destroy();
    drop(viewer);
    let _ = tokio::time::timeout(Duration::from_secs(1), printer).await;
    result
}

async fn print_events(mut events: broadcast::Receiver<Message>) {
    loop {
        match events.recv().await {
            Ok(message) => println!("{:<12} {}", message.kind().as_str(), describe(&message)),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                println!("{:<12} {} events dropped", "lagged", skipped)
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn describe(message: &Message) -> String {
    match message {
        Message::Ready { page, num_pages } => format!("page={} num_pages={}", page, num_pages),
        Message::Fail(failure) => failure.to_string(),
        Message::AssetError(error) => error.to_string(),
        Message::LayoutChange {
            previous_layout,
            layout,
        } => format!(
            "{} -> {}",
            previous_layout.as_deref().unwrap_or("none"),
            layout
        ),
        Message::Zoom(event) => format!(
            "zoom={:.3} prev={:.3} draggable={}",
            event.zoom, event.prev_zoom, event.is_draggable
        ),
        Message::PageFocus {
            page,
            prev_page,
            num_pages,
        } => format!("page={} prev={} of {}", page, prev_page, num_pages),
        Message::PageLoad { page } | Message::PageUnload { page } => format!("page={}", page),
        Message::PageFail { page, error } => format!("page={} {}", page, error),
        Message::Resize { width, height } => format!("{}x{}", width, height),
        _ => String::new(),
    }
}
