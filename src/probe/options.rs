use std::time::Duration;

/// Identity and limits used by every probe conversation.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    pub port: u16,
    /// Name announced in `EHLO`/`HELO`.
    pub helo_name: String,
    /// Envelope sender for `MAIL FROM`. Empty means the null sender `<>`.
    pub mail_from: String,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            port: 25,
            helo_name: "localhost".to_string(),
            mail_from: "test@example.com".to_string(),
            connect_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(5),
        }
    }
}

impl ProbeOptions {
    /// Falls back to `localhost` when the configured name is blank or would
    /// not fit on one command line.
    pub(crate) fn helo_name(&self) -> &str {
        let trimmed = self.helo_name.trim();
        if trimmed.is_empty() || !is_command_argument(trimmed) {
            "localhost"
        } else {
            trimmed
        }
    }

    /// A sender that cannot be sent verbatim becomes the null sender `<>`.
    pub(crate) fn mail_from_command(&self) -> String {
        let sender = self.mail_from.trim();
        if is_command_argument(sender) && !sender.contains(['<', '>']) {
            format!("MAIL FROM:<{sender}>")
        } else {
            tracing::warn!(sender, "unusable envelope sender, using <>");
            "MAIL FROM:<>".to_string()
        }
    }

    /// Applies one timeout to both connect and command deadlines.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self.command_timeout = timeout;
        self
    }
}

/// No whitespace and no control character: CR/LF would start a new command.
pub fn is_command_argument(value: &str) -> bool {
    !value
        .chars()
        .any(|c| c.is_control() || c.is_whitespace())
}
