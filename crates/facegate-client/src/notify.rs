use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// A transient status message (the popup).
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
    /// How long the message stays visible.
    pub display_for: Duration,
}

impl Notice {
    pub fn success(text: impl Into<String>, display_for: Duration) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
            display_for,
        }
    }

    pub fn error(text: impl Into<String>, display_for: Duration) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
            display_for,
        }
    }
}

/// Where user-facing messages go.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, notice: Notice);

    /// Blocking alert for errors the user must fix outside the app.
    fn alert(&self, text: &str);
}

/// Sends every message to the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice.kind {
            NoticeKind::Success => tracing::info!(text = %notice.text, "notice"),
            NoticeKind::Error => tracing::warn!(text = %notice.text, "notice"),
        }
    }

    fn alert(&self, text: &str) {
        tracing::error!(text, "alert");
    }
}
