use std::time::Duration;

/// Standard SMTP port probed by default.
pub const DEFAULT_SMTP_PORT: u16 = 25;

/// Overall budget used by [`check`](crate::check()) when the caller gives none.
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(30);

/// Controls how [`check_with_options`](crate::check_with_options) and
/// [`check_mailbox`](crate::check_mailbox) talk to mail servers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOptions {
    pub port: u16,
    /// Name announced in `EHLO`/`HELO`.
    pub helo_name: String,
    /// Budget for [`check`](crate::check()); the deadline-taking entry points ignore it.
    pub timeout: Duration,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_SMTP_PORT,
            helo_name: "localhost".to_string(),
            timeout: DEFAULT_CHECK_TIMEOUT,
        }
    }
}

impl CheckOptions {
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_helo_name(mut self, name: impl Into<String>) -> Self {
        self.helo_name = name.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `helo_name`, or `localhost` when left blank.
    pub fn helo_name(&self) -> &str {
        let trimmed = self.helo_name.trim();
        if trimmed.is_empty() { "localhost" } else { trimmed }
    }
}
