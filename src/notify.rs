use tracing::{error, info};

/// Sink for transient user-facing notices (the toast popups in a UI shell).
pub trait Notify: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// Default sink: routes notices to the log.
pub struct LogNotifier;

impl Notify for LogNotifier {
    fn success(&self, message: &str) {
        info!("{}", message);
    }

    fn error(&self, message: &str) {
        error!("{}", message);
    }
}
