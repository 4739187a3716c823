use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What a tracking session does with each frame besides drawing the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapturePolicy {
    /// Draw the mesh only; login captures a fresh still on demand.
    RenderOnly,
    /// Draw the mesh and run the liveness gate; login uses the gated frame.
    #[default]
    BlinkGated,
    /// Draw the mesh only; stills are collected by explicit capture actions.
    ManualBatch,
}

impl CapturePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapturePolicy::RenderOnly => "render-only",
            CapturePolicy::BlinkGated => "blink-gated",
            CapturePolicy::ManualBatch => "manual-batch",
        }
    }

    /// Whether frames are fed to the liveness gate.
    pub fn runs_liveness(&self) -> bool {
        matches!(self, CapturePolicy::BlinkGated)
    }
}

impl fmt::Display for CapturePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapturePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "render-only" => Ok(CapturePolicy::RenderOnly),
            "blink-gated" => Ok(CapturePolicy::BlinkGated),
            "manual-batch" => Ok(CapturePolicy::ManualBatch),
            other => Err(format!(
                "unknown capture policy '{other}' (expected render-only, blink-gated or manual-batch)"
            )),
        }
    }
}
