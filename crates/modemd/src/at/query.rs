//! A single AT command transaction and its matched reply.

use std::time::Duration;

use regex::bytes::{Regex, RegexBuilder};

use super::AtError;

/// Command text, expected reply pattern, and deadline for one exchange.
#[derive(Debug, Clone)]
pub struct AtQuery {
    command: Vec<u8>,
    pattern: Regex,
    timeout: Duration,
}

impl AtQuery {
    /// Builds a query; `\r\n` is appended to `command`.
    ///
    /// `.` in `pattern` also matches line breaks so multi-line replies can be
    /// described with a single expression.
    pub fn new(command: &str, pattern: &str, timeout: Duration) -> Result<Self, AtError> {
        let pattern = RegexBuilder::new(pattern)
            .dot_matches_new_line(true)
            .build()?;
        let mut bytes = Vec::with_capacity(command.len() + 2);
        bytes.extend_from_slice(command.as_bytes());
        bytes.extend_from_slice(b"\r\n");
        Ok(Self {
            command: bytes,
            pattern,
            timeout,
        })
    }

    /// Bytes written to the channel.
    #[must_use]
    pub fn command(&self) -> &[u8] {
        &self.command
    }

    /// Command text for diagnostics, without the terminator.
    #[must_use]
    pub fn label(&self) -> String {
        String::from_utf8_lossy(self.command.trim_ascii_end()).into_owned()
    }

    /// Expected reply pattern.
    #[must_use]
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Deadline measured from submission.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Matches the pattern against `buffer`.
    ///
    /// Returns the owned response and the offset just past the match.
    pub(crate) fn try_match(&self, buffer: &[u8]) -> Option<(AtResponse, usize)> {
        let captures = self.pattern.captures(buffer)?;
        let whole = captures.get(0)?;
        let groups = captures
            .iter()
            .skip(1)
            .map(|group| group.map(|found| String::from_utf8_lossy(found.as_bytes()).into_owned()))
            .collect();
        let response = AtResponse {
            raw: String::from_utf8_lossy(whole.as_bytes()).into_owned(),
            groups,
        };
        Some((response, whole.end()))
    }
}

/// Matched reply with its capture groups copied out of the read buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtResponse {
    raw: String,
    groups: Vec<Option<String>>,
}

impl AtResponse {
    /// Text consumed by the match.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Capture group `index`, counted from 1.
    #[must_use]
    pub fn group(&self, index: usize) -> Option<&str> {
        self.groups.get(index.checked_sub(1)?)?.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pattern: &str) -> AtQuery {
        AtQuery::new("AT+CGSN", pattern, Duration::from_secs(1)).expect("valid pattern")
    }

    #[test]
    fn command_gains_line_terminator() {
        let query = query("OK\r\n");
        assert_eq!(query.command(), b"AT+CGSN\r\n");
        assert_eq!(query.label(), "AT+CGSN");
    }

    #[test]
    fn captures_are_owned_and_one_based() {
        let query = query("\r\n([0-9]+)\r\n\r\nOK\r\n");
        let buffer = b"+CREG: 1\r\n\r\n359072066322327\r\n\r\nOK\r\ntail";
        let (response, end) = query.try_match(buffer).expect("match");
        assert_eq!(response.group(1), Some("359072066322327"));
        assert_eq!(response.group(0), None);
        assert_eq!(response.group(2), None);
        assert_eq!(buffer.get(end..), Some(&b"tail"[..]));
    }

    #[test]
    fn dot_spans_lines() {
        let query = query("!GSMINFO:.*\r\nCell ID:[\t]*([0-9]+)\r\n.*\r\nOK\r\n");
        let buffer = b"!GSMINFO:\r\nPLMN: 250 02\r\nCell ID:\t1234\r\nLAC: 7\r\n\r\nOK\r\n";
        let (response, _) = query.try_match(buffer).expect("match");
        assert_eq!(response.group(1), Some("1234"));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let error = AtQuery::new("AT", "(", Duration::from_secs(1)).expect_err("must fail");
        assert!(matches!(error, AtError::Pattern { .. }));
    }
}
