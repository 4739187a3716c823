use std::sync::Arc;
use std::time::Duration;

use facegate_core::{CapturePolicy, Challenge, Frame};
use facegate_hw::FrameSource;

use crate::api::{AuthClient, LoginRequest};
use crate::flow::{trimmed_username, FlowError, Navigation, GENERIC_FAILURE, USERNAME_REQUIRED};
use crate::notify::{Notice, Notifier};
use crate::session::Session;

#[derive(Debug, Clone)]
pub struct LoginSettings {
    pub policy: CapturePolicy,
    /// Challenge issued by the server, echoed back as `liveness`.
    pub challenge: Option<Challenge>,
    pub notice_for: Duration,
    pub navigate_delay: Duration,
    pub redirect: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The server said no, or the request failed. The page stays interactive.
    Rejected,
    Navigate(Navigation),
}

pub struct LoginFlow<S, A, N> {
    session: Arc<Session<S>>,
    auth: Arc<A>,
    notifier: Arc<N>,
    settings: LoginSettings,
}

impl<S, A, N> LoginFlow<S, A, N>
where
    S: FrameSource,
    A: AuthClient,
    N: Notifier,
{
    pub fn new(
        session: Arc<Session<S>>,
        auth: Arc<A>,
        notifier: Arc<N>,
        settings: LoginSettings,
    ) -> Self {
        Self {
            session,
            auth,
            notifier,
            settings,
        }
    }

    fn error(&self, text: &str) {
        self.notifier
            .notify(Notice::error(text, self.settings.notice_for));
    }

    /// Frame to authenticate with: the gated frame for blink-gated logins,
    /// otherwise a fresh still.
    async fn login_frame(&self) -> Result<Frame, FlowError> {
        if self.settings.policy.runs_liveness() {
            return self.session.gated_frame().take().await.ok_or_else(|| {
                let prompt = match self.settings.challenge {
                    Some(challenge) if challenge != Challenge::Blink => challenge.prompt(),
                    _ => "Please blink first!",
                };
                self.error(prompt);
                FlowError::LivenessRequired
            });
        }

        let frame = self.session.source().capture_still().await?;
        if frame.is_degenerate() {
            self.error("Camera is not ready yet");
            return Err(FlowError::CameraNotReady);
        }
        Ok(frame)
    }

    /// One press of the login button.
    pub async fn login(&self, username: &str) -> Result<LoginOutcome, FlowError> {
        let Some(username) = trimmed_username(username) else {
            self.error(USERNAME_REQUIRED);
            return Err(FlowError::UsernameRequired);
        };

        let frame = self.login_frame().await?;
        let request = LoginRequest {
            username: username.to_string(),
            image: frame.to_data_url(),
            liveness: self.settings.challenge,
        };

        tracing::info!(
            session = %self.session.id(),
            user = username,
            policy = %self.settings.policy,
            frame_age_ms = frame.age().num_milliseconds(),
            "login requested"
        );

        // the gated frame was taken above, so it is cleared whatever the result
        match self.auth.login(request).await {
            Ok(response) if response.is_login_success() => {
                tracing::info!(user = username, "login accepted");
                self.notifier
                    .notify(Notice::success("Login successful!", self.settings.notice_for));
                self.session.teardown().await;
                Ok(LoginOutcome::Navigate(Navigation {
                    path: self.settings.redirect.clone(),
                    after: self.settings.navigate_delay,
                }))
            }
            Ok(response) => {
                tracing::warn!(user = username, status = %response.status, "login rejected");
                self.error(response.message_or("Login failed"));
                Ok(LoginOutcome::Rejected)
            }
            Err(e) => {
                tracing::warn!(user = username, error = %e, "login request failed");
                self.error(GENERIC_FAILURE);
                Ok(LoginOutcome::Rejected)
            }
        }
    }
}
