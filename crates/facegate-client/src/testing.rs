//! Test doubles shared by the flow and loop tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use facegate_core::landmarks::{LEFT_EYE, RIGHT_EYE};
use facegate_core::{Challenge, Frame, Geometry, LandmarkSet, Overlay, Point};
use facegate_hw::{CameraError, FrameSource};
use image::{Rgb, RgbImage};
use tokio::sync::Notify;

use crate::api::{ApiError, AuthClient, AuthResponse, LandmarkClient, LoginRequest, RegisterRequest};
use crate::notify::{Notice, Notifier};
use crate::overlay::OverlaySink;

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn still() -> Frame {
    Frame::encode(&RgbImage::from_pixel(8, 8, Rgb([90, 90, 90])), 80).unwrap()
}

pub fn transport_error() -> ApiError {
    ApiError::Transport {
        endpoint: "/test",
        message: "connection refused".into(),
    }
}

fn eye_at(x: f32, y: f32, open: f32) -> Vec<Point> {
    let h = open / 2.0;
    vec![
        (x, y),
        (x + 2.0, y - h),
        (x + 4.0, y - h),
        (x + 6.0, y),
        (x + 4.0, y + h),
        (x + 2.0, y + h),
    ]
}

/// Both eyes at the given EAR (corners 6 px apart).
pub fn face_with_ear(ear: f32) -> LandmarkSet {
    LandmarkSet::new()
        .with_region(LEFT_EYE, eye_at(100.0, 50.0, ear * 6.0))
        .with_region(RIGHT_EYE, eye_at(140.0, 50.0, ear * 6.0))
        .with_region("chin", vec![(100.0, 120.0), (120.0, 130.0), (140.0, 120.0)])
}

pub struct MockCamera {
    frame: Frame,
    stopped: AtomicBool,
    stops: AtomicUsize,
}

impl MockCamera {
    pub fn ready() -> Self {
        Self {
            frame: still(),
            stopped: AtomicBool::new(false),
            stops: AtomicUsize::new(0),
        }
    }

    pub fn not_ready() -> Self {
        Self {
            frame: Frame::degenerate(),
            ..Self::ready()
        }
    }

    /// Calls to `stop` that actually stopped the feed.
    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl FrameSource for MockCamera {
    fn geometry(&self) -> Geometry {
        self.frame.geometry()
    }

    async fn capture_still(&self) -> Result<Frame, CameraError> {
        if self.is_stopped() {
            return Err(CameraError::Stopped);
        }
        Ok(self.frame.clone())
    }

    fn stop(&self) -> bool {
        let first = !self.stopped.swap(true, Ordering::SeqCst);
        if first {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
        first
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// A camera whose every still is different, so tests can tell which tick a
/// frame came from. Frames are recorded in the order they were handed out.
#[derive(Default)]
pub struct SequenceCamera {
    issued: Mutex<Vec<Frame>>,
}

impl SequenceCamera {
    pub fn issued(&self) -> Vec<Frame> {
        lock(&self.issued).clone()
    }
}

impl FrameSource for SequenceCamera {
    fn geometry(&self) -> Geometry {
        Geometry::new(8, 8)
    }

    async fn capture_still(&self) -> Result<Frame, CameraError> {
        let mut issued = lock(&self.issued);
        let shade = (issued.len() * 40 % 256) as u8;
        let frame = Frame::encode(&RgbImage::from_pixel(8, 8, Rgb([shade, 255 - shade, 0])), 80)
            .map_err(CameraError::from)?;
        issued.push(frame.clone());
        Ok(frame)
    }

    fn stop(&self) -> bool {
        false
    }

    fn is_stopped(&self) -> bool {
        false
    }
}

/// Replays scripted detection results. Once the script is exhausted every
/// call returns "no face" and wakes [`ScriptedClient::drained`].
pub struct ScriptedClient {
    script: Mutex<VecDeque<Result<Option<LandmarkSet>, ApiError>>>,
    latency: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    drained: Notify,
}

impl ScriptedClient {
    pub fn new(script: Vec<Result<Option<LandmarkSet>, ApiError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            latency: Duration::from_millis(20),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            drained: Notify::new(),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Resolves once a call arrives after the script ran out, which means
    /// every scripted result has been fully handled by the caller.
    pub async fn drained(&self) {
        self.drained.notified().await;
    }
}

impl LandmarkClient for ScriptedClient {
    async fn detect(&self, _frame: &Frame) -> Result<Option<LandmarkSet>, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.latency).await;

        let next = lock(&self.script).pop_front();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match next {
            Some(result) => result,
            None => {
                self.drained.notify_one();
                Ok(None)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEvent {
    Draw,
    Clear,
}

#[derive(Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl RecordingSink {
    pub fn events(&self) -> Arc<Mutex<Vec<SinkEvent>>> {
        Arc::clone(&self.events)
    }
}

impl OverlaySink for RecordingSink {
    fn draw(&mut self, _overlay: &Overlay, _frame: &Frame) {
        lock(&self.events).push(SinkEvent::Draw);
    }

    fn clear(&mut self, _frame: &Frame) {
        lock(&self.events).push(SinkEvent::Clear);
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
    alerts: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        lock(&self.notices).clone()
    }

    pub fn texts(&self) -> Vec<String> {
        lock(&self.notices).iter().map(|n| n.text.clone()).collect()
    }

    pub fn alerts(&self) -> Vec<String> {
        lock(&self.alerts).clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        lock(&self.notices).push(notice);
    }

    fn alert(&self, text: &str) {
        lock(&self.alerts).push(text.to_string());
    }
}

/// Auth service double with queued responses and request capture.
pub struct MockAuth {
    logins: Mutex<VecDeque<Result<AuthResponse, ApiError>>>,
    registers: Mutex<VecDeque<Result<AuthResponse, ApiError>>>,
    login_requests: Mutex<Vec<LoginRequest>>,
    register_requests: Mutex<Vec<RegisterRequest>>,
    latency: Duration,
}

impl MockAuth {
    pub fn new() -> Self {
        Self {
            logins: Mutex::new(VecDeque::new()),
            registers: Mutex::new(VecDeque::new()),
            login_requests: Mutex::new(Vec::new()),
            register_requests: Mutex::new(Vec::new()),
            latency: Duration::from_millis(10),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn push_login(self, response: Result<AuthResponse, ApiError>) -> Self {
        lock(&self.logins).push_back(response);
        self
    }

    pub fn push_register(self, response: Result<AuthResponse, ApiError>) -> Self {
        lock(&self.registers).push_back(response);
        self
    }

    pub fn login_requests(&self) -> Vec<LoginRequest> {
        lock(&self.login_requests).clone()
    }

    pub fn register_requests(&self) -> Vec<RegisterRequest> {
        lock(&self.register_requests).clone()
    }
}

pub fn reply(status: &str, message: Option<&str>) -> Result<AuthResponse, ApiError> {
    Ok(AuthResponse {
        status: status.to_string(),
        message: message.map(str::to_string),
    })
}

impl AuthClient for MockAuth {
    async fn login(&self, request: LoginRequest) -> Result<AuthResponse, ApiError> {
        lock(&self.login_requests).push(request);
        tokio::time::sleep(self.latency).await;
        let next = lock(&self.logins).pop_front();
        next.unwrap_or_else(|| Err(transport_error()))
    }

    async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, ApiError> {
        lock(&self.register_requests).push(request);
        tokio::time::sleep(self.latency).await;
        let next = lock(&self.registers).pop_front();
        next.unwrap_or_else(|| Err(transport_error()))
    }

    async fn challenge(&self) -> Result<Challenge, ApiError> {
        Ok(Challenge::Blink)
    }
}
