use tracing_subscriber::fmt;

/// Installs the fmt subscriber. Logs go to stderr so command output on stdout stays clean.
/// Calling it again is a no-op.
pub fn init(level: tracing::Level) {
    let _ = fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
pub mod tests {
    #[tokio::test]
    pub async fn test_init_twice() {
        super::init(tracing::Level::DEBUG);
        super::init(tracing::Level::TRACE);
        tracing::debug!("still alive");
    }
}
