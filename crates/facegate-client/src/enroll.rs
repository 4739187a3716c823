//! Enrollment: five manual captures, then one registration request.

use std::sync::Arc;
use std::time::Duration;

use facegate_core::capture::BATCH_SIZE;
use facegate_core::{CaptureProgress, CaptureSession};
use facegate_hw::FrameSource;
use tokio::sync::Mutex;

use crate::api::{AuthClient, RegisterRequest};
use crate::flow::{trimmed_username, FlowError, Navigation, GENERIC_FAILURE, USERNAME_REQUIRED};
use crate::notify::{Notice, Notifier};
use crate::session::Session;

#[derive(Debug, Clone)]
pub struct EnrollSettings {
    pub notice_for: Duration,
    pub navigate_delay: Duration,
    pub redirect: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollOutcome {
    /// Capture stored; `count` of five collected.
    Collected { count: usize },
    /// The batch was refused or the request failed; capturing restarts at 0.
    Rejected,
    Navigate(Navigation),
}

pub struct EnrollmentFlow<S, A, N> {
    session: Arc<Session<S>>,
    auth: Arc<A>,
    notifier: Arc<N>,
    capture: Mutex<CaptureSession>,
    settings: EnrollSettings,
}

impl<S, A, N> EnrollmentFlow<S, A, N>
where
    S: FrameSource,
    A: AuthClient,
    N: Notifier,
{
    pub fn new(
        session: Arc<Session<S>>,
        auth: Arc<A>,
        notifier: Arc<N>,
        settings: EnrollSettings,
    ) -> Self {
        Self {
            session,
            auth,
            notifier,
            capture: Mutex::new(CaptureSession::new()),
            settings,
        }
    }

    fn notify_success(&self, text: &str) {
        self.notifier
            .notify(Notice::success(text, self.settings.notice_for));
    }

    fn notify_error(&self, text: &str) {
        self.notifier
            .notify(Notice::error(text, self.settings.notice_for));
    }

    /// Current capture button text.
    pub async fn button_label(&self) -> String {
        self.capture.lock().await.button_label()
    }

    pub async fn is_accepting(&self) -> bool {
        self.capture.lock().await.is_accepting()
    }

    /// One press of the capture button. Calls made while the batch is being
    /// submitted are refused with [`facegate_core::CaptureError::Submitting`].
    pub async fn capture(&self, username: &str) -> Result<EnrollOutcome, FlowError> {
        let Some(username) = trimmed_username(username) else {
            self.notify_error(USERNAME_REQUIRED);
            return Err(FlowError::UsernameRequired);
        };

        let frame = self.session.source().capture_still().await?;

        // lock only for the state change, never across the request
        let progress = self.capture.lock().await.add_capture(frame).map_err(|e| {
            tracing::debug!(error = %e, "capture refused");
            FlowError::from(e)
        })?;

        let batch = match progress {
            CaptureProgress::Collected { count } => {
                self.notify_success(&format!("Captured {count}/{BATCH_SIZE}"));
                return Ok(EnrollOutcome::Collected { count });
            }
            CaptureProgress::BatchReady(batch) => batch,
        };
        self.notify_success(&format!("Captured {BATCH_SIZE}/{BATCH_SIZE}"));

        tracing::info!(
            session = %self.session.id(),
            user = username,
            images = batch.len(),
            oldest_ms = batch.frames().first().map_or(0, |f| f.age().num_milliseconds()),
            "registration submitted"
        );
        let request = RegisterRequest {
            username: username.to_string(),
            images: batch.data_urls(),
        };
        let result = self.auth.register(request).await;

        let mut capture = self.capture.lock().await;
        match result {
            Ok(response) if response.is_register_ok() => {
                capture.finish_submission(true)?;
                drop(capture);
                tracing::info!(user = username, "registration accepted");
                self.notify_success(response.message_or("Registered successfully"));
                self.session.teardown().await;
                Ok(EnrollOutcome::Navigate(Navigation {
                    path: self.settings.redirect.clone(),
                    after: self.settings.navigate_delay,
                }))
            }
            Ok(response) => {
                capture.finish_submission(false)?;
                tracing::warn!(user = username, status = %response.status, "registration rejected");
                self.notify_error(response.message_or("Registration failed"));
                Ok(EnrollOutcome::Rejected)
            }
            Err(e) => {
                capture.finish_submission(false)?;
                tracing::warn!(user = username, error = %e, "registration request failed");
                self.notify_error(GENERIC_FAILURE);
                Ok(EnrollOutcome::Rejected)
            }
        }
    }
}
