use std::sync::Arc;

use anyhow::{bail, Context, Result};
use facegate_client::{
    AuthClient, ClientConfig, LoginFlow, LoginOutcome, LoginSettings, Notice, Notifier,
};
use facegate_core::{CapturePolicy, Challenge};

use crate::terminal::{navigate, presses, server_api, start_session};
use crate::CameraArgs;

pub async fn run(
    config: &ClientConfig,
    camera: &CameraArgs,
    username: &str,
    policy: CapturePolicy,
    use_challenge: bool,
) -> Result<()> {
    if policy == CapturePolicy::ManualBatch {
        bail!("manual-batch is the enrollment policy; use blink-gated or render-only to log in");
    }
    if use_challenge && !policy.runs_liveness() {
        bail!("--challenge requires the blink-gated policy");
    }

    // the server remembers the challenge in its session cookie, so it is
    // fetched on the same client that later sends the login
    let api = server_api(config);
    let challenge = if use_challenge {
        Some(
            api.challenge()
                .await
                .context("failed to fetch liveness challenge")?,
        )
    } else {
        None
    };

    let started = start_session(
        config,
        api,
        camera,
        policy,
        challenge.unwrap_or(Challenge::Blink),
        config.login_notice(),
    )
    .await?;

    if let Some(challenge) = challenge {
        started
            .notifier
            .notify(Notice::success(challenge.prompt(), config.login_notice()));
    }

    let flow = LoginFlow::new(
        Arc::clone(&started.session),
        Arc::clone(&started.api),
        Arc::clone(&started.notifier),
        LoginSettings {
            policy,
            challenge,
            notice_for: config.login_notice(),
            navigate_delay: config.navigate_delay(),
            redirect: config.login_redirect.clone(),
        },
    );

    eprintln!("press Enter to log in as '{username}' (Ctrl-D or Ctrl-C to quit)");
    let mut lines = presses();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                if line?.is_none() {
                    break;
                }
                match flow.login(username).await {
                    Ok(LoginOutcome::Navigate(nav)) => {
                        navigate(&nav).await;
                        return Ok(());
                    }
                    Ok(LoginOutcome::Rejected) => {}
                    Err(e) => tracing::debug!(error = %e, "login not sent"),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    started.session.teardown().await;
    Ok(())
}
