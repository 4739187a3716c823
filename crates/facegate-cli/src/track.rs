use std::time::Duration;

use anyhow::Result;
use facegate_client::ClientConfig;
use facegate_core::{CapturePolicy, Challenge};

use crate::terminal::{server_api, start_session};
use crate::CameraArgs;

pub async fn run(config: &ClientConfig, camera: &CameraArgs, seconds: Option<u64>) -> Result<()> {
    let started = start_session(
        config,
        server_api(config),
        camera,
        CapturePolicy::RenderOnly,
        Challenge::Blink,
        config.login_notice(),
    )
    .await?;
    tracing::info!(session = %started.session.id(), "tracking; Ctrl-C to stop");

    match seconds {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                _ = tokio::signal::ctrl_c() => {}
            }
        }
        None => tokio::signal::ctrl_c().await?,
    }

    if let Some(stats) = started.session.teardown().await {
        println!(
            "ticks: {}  faces: {}  no face: {}  errors: {}",
            stats.ticks, stats.detections, stats.no_face, stats.errors
        );
    }
    Ok(())
}
