//! VoxWave: voice-chat music relay
//!
//! Wires the catalog client, playback pipeline and session controller to a
//! local playout sink and a line-oriented operator console. Commands read
//! from stdin stand in for the messaging transport.

mod sink;

use anyhow::Context;
use sink::LocalPlayoutSink;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use voxcatalog::RemoteCatalog;
use voxconfig::Config;
use voxcore::{
    Command, FfmpegTranscoder, HttpFetcher, PlaybackPipeline, RadioSession, SessionController,
    SinkEvent, StreamFormat,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ========== Phase 1: configuration and catalog ==========

    let config = Config::load("").context("failed to load configuration")?;

    info!("🎵 Connecting to the music catalog...");
    let token = config.catalog_token();
    let username = config.catalog_username();
    let password = config.catalog_password();
    let credentials = match (username.as_deref(), password.as_deref()) {
        (Some(u), Some(p)) => Some((u, p)),
        _ => None,
    };

    let catalog = Arc::new(
        RemoteCatalog::connect(token.as_deref(), credentials)
            .await
            .context("catalog authentication failed")?,
    );
    if token.as_deref() != Some(catalog.token()) {
        config
            .set_catalog_token(catalog.token())
            .context("failed to persist catalog token")?;
        info!("Fresh catalog token persisted");
    }

    let station_spec = config.station()?;
    let station = catalog
        .resolve_station(&station_spec)
        .await
        .with_context(|| format!("cannot resolve station {station_spec}"))?;
    info!("✅ Catalog ready, station {}", station.id());

    // ========== Phase 2: playback plumbing ==========

    let format = StreamFormat::default();
    let work_dir = config.work_dir()?;
    let output_path = config.output_path()?;

    let pipeline = Arc::new(
        PlaybackPipeline::new(
            catalog.clone(),
            Arc::new(HttpFetcher::new()?),
            Arc::new(FfmpegTranscoder::new(config.ffmpeg_path())),
            work_dir,
            output_path,
        )
        .with_timeouts(
            Duration::from_secs(config.download_timeout_secs()),
            Duration::from_secs(config.transcode_timeout_secs()),
        ),
    );

    let (events_tx, mut events_rx) = mpsc::channel::<SinkEvent>(8);
    let audio_sink = Arc::new(LocalPlayoutSink::new(format, events_tx));

    let session = RadioSession::new(catalog.clone(), station);
    let controller = SessionController::new(session, pipeline, audio_sink.clone());

    if let Err(e) = controller
        .handle(Command::SetVolume(config.volume()))
        .await
    {
        warn!(error = %e, "Configured volume rejected, keeping the default");
    }

    // ========== Phase 3: operator console ==========

    info!("✅ VoxWave is ready! Commands: !play [query], !skip, !stop, !np ...");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("stdin closed unexpectedly")? else {
                    break;
                };
                let Some(parsed) = Command::parse(&line) else {
                    continue;
                };
                match parsed {
                    Ok(command) => match controller.handle(command).await {
                        Ok(reply) => println!("{reply}"),
                        Err(e) => println!("{e}"),
                    },
                    Err(e) => println!("{e}"),
                }
            }
            event = events_rx.recv() => {
                match event {
                    Some(SinkEvent::PlayoutEnded) => {
                        if let Err(e) = controller.on_playout_ended().await {
                            warn!(error = %e, "Advance after playout failed");
                        }
                    }
                    None => break,
                }
            }
        }
    }

    info!("Shutting down");
    Ok(())
}
