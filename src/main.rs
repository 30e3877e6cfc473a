mod cli;

use castplay::{
    cast::CastSession,
    config::{self, PlaybackSettings, ServerSettings},
    playback::{MediaRequest, MonitorOutcome, PlaybackMonitor, SubtitleTrack},
    server,
    source::{self, SUBTITLES_PATH, VIDEO_PATH},
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

async fn cast(cli: Cli) -> Result<()> {
    let server_settings = ServerSettings::with_local_ip(cli.local_ip, cli.local_port);
    let playback_settings = PlaybackSettings {
        idle_timeout: Duration::from_secs(cli.idle_timeout),
        wait_timeout: Duration::from_secs(cli.wait_timeout),
        ..Default::default()
    };
    config::validate_settings(&server_settings, &playback_settings)?;

    let cancel = CancellationToken::new();
    let session = CastSession::connect(cli.device.clone(), playback_settings.wait_timeout)
        .await
        .with_context(|| format!("Could not connect to cast device {}", cli.device))?
        .with_cancellation(cancel.clone());
    println!("Casting to: {}", session.target());

    // The device connects back to us on the address it sees us on.
    let advertised_ip = server_settings
        .advertised_ip
        .unwrap_or_else(|| session.local_ip());
    let advertised = SocketAddr::new(advertised_ip, server_settings.port);

    let video = source::prepare_source(
        &cli.video_source,
        cli.video_mimetype.as_deref(),
        advertised,
        VIDEO_PATH,
    )
    .with_context(|| format!("Failed to prepare video source: {}", cli.video_source))?;

    let subs = cli
        .subs
        .as_deref()
        .map(|subs| {
            source::prepare_source(subs, cli.subs_mimetype.as_deref(), advertised, SUBTITLES_PATH)
                .with_context(|| format!("Failed to prepare subtitles source: {}", subs))
        })
        .transpose()?;

    let inventory = source::build_inventory(std::iter::once(&video).chain(subs.as_ref()));
    if !inventory.is_empty() {
        let bind = SocketAddr::new(server_settings.bind_ip, server_settings.port);
        let _server = server::start_server(bind, Arc::new(inventory)).await?;
    }

    println!("Video URL: {} ({})", video.url, video.content_type);
    if let Some(ref subs) = subs {
        println!("Subtitles URL: {} ({})", subs.url, subs.content_type);
    }

    let request = MediaRequest {
        media_url: video.url,
        content_type: video.content_type,
        subtitles: subs.map(|s| SubtitleTrack {
            url: s.url,
            content_type: s.content_type,
        }),
    };

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        server::shutdown_signal().await;
        signal_cancel.cancel();
    });

    let mut monitor = PlaybackMonitor::new(Arc::new(session), playback_settings, cancel);
    let outcome = monitor.run(&request).await;
    println!("Exiting");

    match outcome? {
        MonitorOutcome::Finished => tracing::info!("Playback finished"),
        MonitorOutcome::Interrupted => tracing::info!("Playback interrupted"),
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "castplay=debug".to_string()
        } else {
            "castplay=info".to_string()
        }
    });

    // stdout belongs to the status line
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(cast(cli))
}
