use std::sync::Arc;

use anyhow::Result;
use facegate_client::{ClientConfig, EnrollOutcome, EnrollSettings, EnrollmentFlow, FlowError};
use facegate_core::{CapturePolicy, Challenge};
use tokio::sync::mpsc;

use crate::terminal::{navigate, presses, server_api, start_session};
use crate::CameraArgs;

pub async fn run(config: &ClientConfig, camera: &CameraArgs, username: &str) -> Result<()> {
    let started = start_session(
        config,
        server_api(config),
        camera,
        CapturePolicy::ManualBatch,
        Challenge::Blink,
        config.register_notice(),
    )
    .await?;

    let flow = Arc::new(EnrollmentFlow::new(
        Arc::clone(&started.session),
        Arc::clone(&started.api),
        Arc::clone(&started.notifier),
        EnrollSettings {
            notice_for: config.register_notice(),
            navigate_delay: config.navigate_delay(),
            redirect: config.register_redirect.clone(),
        },
    ));

    eprintln!("press Enter to capture ({})", flow.button_label().await);

    // presses run concurrently so that ones arriving mid-submission are refused
    let (tx, mut results) = mpsc::channel::<Result<EnrollOutcome, FlowError>>(8);
    let mut lines = presses();
    let mut stdin_open = true;
    let mut in_flight = 0usize;
    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                if line?.is_none() {
                    stdin_open = false;
                    if in_flight == 0 {
                        break;
                    }
                    continue;
                }
                in_flight += 1;
                let flow = Arc::clone(&flow);
                let tx = tx.clone();
                let username = username.to_string();
                tokio::spawn(async move {
                    let _ = tx.send(flow.capture(&username).await).await;
                });
            }
            Some(result) = results.recv() => {
                in_flight -= 1;
                match result {
                    Ok(EnrollOutcome::Navigate(nav)) => {
                        navigate(&nav).await;
                        return Ok(());
                    }
                    Ok(_) => {}
                    Err(e) => eprintln!("capture refused: {e}"),
                }
                eprintln!("[{}]", flow.button_label().await);
                if !stdin_open && in_flight == 0 {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    started.session.teardown().await;
    Ok(())
}
