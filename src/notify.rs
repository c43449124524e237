#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

/// Transient messages for the person driving the dashboard. Fire and forget.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, kind: NotificationKind, message: &str);

    fn success(&self, message: &str) {
        self.notify(NotificationKind::Success, message)
    }

    fn error(&self, message: &str) {
        self.notify(NotificationKind::Error, message)
    }
}

/// Success lines on stdout, errors on stderr.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn notify(&self, kind: NotificationKind, message: &str) {
        match kind {
            NotificationKind::Success => {
                tracing::info!("{message}");
                println!("ok: {message}");
            }
            NotificationKind::Error => {
                tracing::warn!("{message}");
                eprintln!("error: {message}");
            }
        }
    }
}

#[cfg(test)]
pub use recording::RecordingSink;
