use tracing::info;

/// Where the session manager sends the user after logout or when an
/// already signed-in user hits a guest-only page.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Navigator for front ends without routing: records the request in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, path: &str) {
        info!(path, "Navigation requested");
    }
}
