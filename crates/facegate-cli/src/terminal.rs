//! Terminal stand-ins for the page: popup, alert, overlay target, and the
//! session bootstrap shared by every command.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use facegate_client::{
    ClientConfig, HttpApi, LogSink, Navigation, Notice, NoticeKind, Notifier, OverlaySink, Session,
    SnapshotSink, TrackingConfig, CAMERA_ALERT,
};
use facegate_core::{CapturePolicy, Challenge, Frame, Overlay};
use facegate_hw::ReplayCamera;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::CameraArgs;

/// Prints popups and alerts to stderr.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notice: Notice) {
        let mark = match notice.kind {
            NoticeKind::Success => "✔",
            NoticeKind::Error => "✘",
        };
        eprintln!("{mark} {}", notice.text);
        tracing::debug!(text = %notice.text, display_ms = notice.display_for.as_millis() as u64, "notice shown");
    }

    fn alert(&self, text: &str) {
        eprintln!("ALERT: {text}");
    }
}

/// Overlay target chosen on the command line.
pub enum CliSink {
    Log(LogSink),
    Snapshot(SnapshotSink),
}

impl OverlaySink for CliSink {
    fn draw(&mut self, overlay: &Overlay, frame: &Frame) {
        match self {
            CliSink::Log(sink) => sink.draw(overlay, frame),
            CliSink::Snapshot(sink) => sink.draw(overlay, frame),
        }
    }

    fn clear(&mut self, frame: &Frame) {
        match self {
            CliSink::Log(sink) => sink.clear(frame),
            CliSink::Snapshot(sink) => sink.clear(frame),
        }
    }
}

pub struct Started {
    pub session: Arc<Session<ReplayCamera>>,
    pub api: Arc<HttpApi>,
    pub notifier: Arc<TerminalNotifier>,
}

/// Client for the configured server. One instance per command, so every
/// request of a session shares its cookies.
pub fn server_api(config: &ClientConfig) -> Arc<HttpApi> {
    Arc::new(HttpApi::new(&config.server_url, config.request_timeout()))
}

/// Open the camera, create the session and start tracking.
pub async fn start_session(
    config: &ClientConfig,
    api: Arc<HttpApi>,
    camera: &CameraArgs,
    policy: CapturePolicy,
    challenge: Challenge,
    notice_for: Duration,
) -> Result<Started> {
    let notifier = Arc::new(TerminalNotifier);

    let fps = camera.fps.unwrap_or(config.replay_fps);
    let (source, readiness) = match ReplayCamera::start(&camera.camera, fps) {
        Ok(opened) => opened,
        Err(e) => {
            notifier.alert(CAMERA_ALERT);
            return Err(e).with_context(|| format!("failed to open camera {}", camera.camera.display()));
        }
    };

    let sink = match &camera.snapshot {
        Some(path) => CliSink::Snapshot(SnapshotSink::new(path)),
        None => CliSink::Log(LogSink),
    };

    let session = Arc::new(Session::new(source));
    session
        .start_tracking(
            readiness,
            Arc::clone(&api),
            sink,
            Arc::clone(&notifier),
            TrackingConfig {
                interval: config.tick_interval(),
                policy,
                challenge,
                ear_threshold: config.ear_threshold,
                mesh: config.mesh_style(),
                notice_for,
            },
        )
        .await;

    Ok(Started {
        session,
        api,
        notifier,
    })
}

/// Button presses, one per stdin line.
pub fn presses() -> Lines<BufReader<Stdin>> {
    BufReader::new(tokio::io::stdin()).lines()
}

/// Wait out the success delay, then "navigate".
pub async fn navigate(nav: &Navigation) {
    tokio::time::sleep(nav.after).await;
    println!("navigating to {}", nav.path);
}
