use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A non-fatal condition reported to whoever renders the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

/// Ordered collection of notices raised while handling one or more actions.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Notices(Vec<Notice>);

impl Notices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, severity: Severity, message: impl Into<String>) {
        self.0.push(Notice {
            severity,
            message: message.into(),
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Severity::Info, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(Severity::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Severity::Error, message);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages at or above `severity`, oldest first.
    pub fn messages_at_least(&self, severity: Severity) -> Vec<&str> {
        self.0
            .iter()
            .filter(|n| rank(n.severity) >= rank(severity))
            .map(|n| n.message.as_str())
            .collect()
    }

    /// Hand every collected notice to the caller, leaving the collection empty.
    pub fn take(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.0)
    }
}

fn rank(severity: Severity) -> u8 {
    match severity {
        Severity::Info => 0,
        Severity::Warning => 1,
        Severity::Error => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_by_severity() {
        let mut notices = Notices::new();
        notices.info("prepared");
        notices.warning("column missing");
        notices.error("build failed");
        assert_eq!(notices.len(), 3);
        assert_eq!(
            notices.messages_at_least(Severity::Warning),
            vec!["column missing", "build failed"]
        );
    }

    #[test]
    fn take_drains() {
        let mut notices = Notices::new();
        notices.warning("x");
        let taken = notices.take();
        assert_eq!(taken.len(), 1);
        assert!(notices.is_empty());
    }
}
