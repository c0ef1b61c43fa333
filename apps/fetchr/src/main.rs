//! fetchr - fetch files over HTTP, an anonymizing overlay or a paired device
//!
//! Thin CLI over `fetchr-net`: it loads configuration, builds a
//! `DownloaderFactory` for this host, renders transfer events while the
//! command runs and prints the final report.

mod cli;
mod display;
mod error;
mod events;
mod logging;

use crate::cli::{Cli, Commands, GetArgs};
use crate::display::{OutputRenderer, RouteInfo};
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use fetchr_config::Config;
use fetchr_events::EventReceiver;
use fetchr_net::{
    can_use_native_downloader, pairing_address, parse_url, select as select_transport,
    ChannelListener, DownloadRequest, DownloaderFactory, FetchReport, ListenerEvent,
    TerminalOutcome, TransportKind,
};
use fetchr_platform::{NoPairingAdapter, Platform};
use std::future::Future;
use std::process;
use std::sync::Arc;
use tokio::select;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Parse command line arguments first to check for JSON mode
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if json_mode {
            let value = serde_json::json!({
                "error": e.to_string(),
                "failure": e.failure_kind(),
                "details": e.source_error().and_then(|err| serde_json::to_value(err).ok()),
            });
            println!("{value}");
        } else {
            eprintln!("Error: {e}");
        }
        process::exit(if matches!(e, CliError::Cancelled) { 130 } else { 1 });
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting fetchr v{}", env!("CARGO_PKG_VERSION"));

    // File config (or defaults), then environment overrides
    let mut config = Config::load_or_default(cli.global.config.as_deref())
        .await
        .map_err(CliError::Config)?;
    config.merge_env().map_err(CliError::Config)?;

    // A desktop host has neither a native download facility nor a pairing radio
    let platform = Platform::new(config.platform.api_level, None, Arc::new(NoPairingAdapter));
    let renderer = OutputRenderer::new(cli.global.json);

    match cli.command {
        Commands::Route { url } => {
            let route = describe_route(&url, &platform)?;
            renderer.render_route(&route)?;
        }
        Commands::Get(args) => {
            let (event_sender, event_receiver) = fetchr_events::channel();
            let factory = DownloaderFactory::new(&config, platform)
                .map_err(CliError::Config)?
                .with_events(event_sender);
            let mut event_handler = EventHandler::new(!cli.global.json, cli.global.debug);

            let report =
                run_with_events(get(&factory, args), event_receiver, &mut event_handler).await?;
            renderer.render_report(&report)?;
        }
    }

    info!("Command completed successfully");
    Ok(())
}

/// Drive `command` while rendering the events it emits
async fn run_with_events<F>(
    command: F,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<FetchReport, CliError>
where
    F: Future<Output = Result<FetchReport, CliError>>,
{
    let mut command_future = Box::pin(command);

    loop {
        select! {
            result = &mut command_future => {
                // Drain any remaining events
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                return result;
            }

            event = event_receiver.recv() => {
                match event {
                    Some(event) => event_handler.handle_event(event),
                    None => { /* Channel closed: keep waiting for command to finish */ }
                }
            }
        }
    }
}

/// Execute `fetchr get`
async fn get(factory: &DownloaderFactory, args: GetArgs) -> Result<FetchReport, CliError> {
    if args.background {
        return get_in_background(factory, args).await;
    }

    let mut transport = factory.build(&args.url, args.output.as_deref())?;
    if let Some(tag) = args.etag {
        transport = transport.with_cache_tag(tag);
    }
    if let Some(hash) = args.blake3 {
        transport = transport.with_expected_hash(hash);
    }

    let cancel = transport.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling download");
            cancel.cancel();
        }
    });

    let result = transport.fetch(|_| {}).await;
    interrupt.abort();
    Ok(result?)
}

/// Execute `fetchr get --async`; Ctrl-C cancels the handle
async fn get_in_background(
    factory: &DownloaderFactory,
    args: GetArgs,
) -> Result<FetchReport, CliError> {
    let request = DownloadRequest::new(
        args.title.unwrap_or_else(|| args.url.clone()),
        args.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
    );
    let (listener, mut outcomes) = ChannelListener::new();
    let handle = factory.build_async(&args.url, args.output.as_deref(), request, listener)?;
    info!(
        native = handle.is_native(),
        destination = %handle.destination().display(),
        "Download started in background"
    );

    loop {
        select! {
            interrupted = tokio::signal::ctrl_c() => {
                interrupted?;
                warn!("Interrupt received, cancelling download");
                handle.cancel();
            }

            event = outcomes.recv() => match event {
                Some(ListenerEvent::Result(outcome)) => {
                    return match outcome {
                        TerminalOutcome::Success(report) => Ok(report),
                        TerminalOutcome::Failure(e) => Err(CliError::Fetch(e)),
                        TerminalOutcome::Cancelled => Err(CliError::Cancelled),
                    };
                }
                // Progress is rendered from the event stream
                Some(ListenerEvent::Progress(_)) => {}
                None => {
                    return Err(CliError::Fetch(fetchr_errors::Error::internal(
                        "download ended without a result",
                    )));
                }
            }
        }
    }
}

/// Execute `fetchr route`
fn describe_route(url: &str, platform: &Platform) -> Result<RouteInfo, CliError> {
    let source = parse_url(url)?;
    let transport = select_transport(&source);
    let pairing_address = match transport {
        TransportKind::ShortRangePairing => Some(pairing_address(&source)?),
        _ => None,
    };
    let native_eligible = platform
        .api_level()
        .is_some_and(|level| can_use_native_downloader(&source, level));

    Ok(RouteInfo {
        url: source.to_string(),
        transport,
        pairing_address,
        native_eligible,
        native_available: native_eligible && platform.native_downloads().is_some(),
    })
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled_flag: bool) {
    let default_filter = if debug_enabled_flag {
        "info,fetchr=debug,fetchr_net=debug"
    } else {
        "warn,fetchr=info,fetchr_net=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    if json_mode {
        // JSON mode: structured records on stderr keep stdout clean for results
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(debug_enabled_flag)
            .with_env_filter(filter)
            .init();
    }
}
