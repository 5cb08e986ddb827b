/// Read-only view of a message as the evaluator sees it.
///
/// The evaluator never mutates a record; the embedding application builds
/// one per message from its own store and hands it in by reference.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageFlags {
    pub unread: bool,
    pub new: bool,
    pub marked: bool,
    pub deleted: bool,
    pub replied: bool,
    pub forwarded: bool,
    pub locked: bool,
    pub spam: bool,
    pub ignore_thread: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub subject: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub cc: Option<String>,
    pub newsgroups: Option<String>,
    pub inreplyto: Option<String>,
    pub references: Option<String>,
    /// Raw header fields in message order; duplicates allowed.
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    /// Age in whole days.
    pub age_days: i64,
    /// Size in bytes.
    pub size: i64,
    pub score: i32,
    pub color_label: u8,
    pub flags: MessageFlags,
    /// Path of the message file, used by `%F` command expansion.
    pub file_path: Option<String>,
}

impl MessageRecord {
    /// Value of the first header whose name matches case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_text(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Header lines in `Name: value` form, as `headers_part` matches them.
    pub fn header_lines(&self) -> impl Iterator<Item = String> + '_ {
        self.headers.iter().map(|(n, v)| format!("{n}: {v}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let msg = MessageRecord {
            headers: vec![
                ("X-Mailer".to_string(), "foo".to_string()),
                ("X-MAILER".to_string(), "bar".to_string()),
            ],
            ..Default::default()
        };
        assert_eq!(msg.header("x-mailer"), Some("foo"));
        assert_eq!(msg.header("X-Missing"), None);
    }

    #[test]
    fn test_header_lines() {
        let msg = MessageRecord {
            headers: vec![("List-Id".to_string(), "dev".to_string())],
            ..Default::default()
        };
        let lines: Vec<String> = msg.header_lines().collect();
        assert_eq!(lines, vec!["List-Id: dev".to_string()]);
    }
}
