/// `%`-placeholders in `execute` actions and `test` commands.
///
/// The parser only checks that placeholders are well formed; expansion
/// against a message happens at invocation time, in whatever collaborator
/// actually spawns the process.
use crate::matcher::parser::ParseError;
use crate::model::MessageRecord;

/// Placeholder letters and the message field each one expands to.
/// `%%` stands for a literal percent sign.
const PLACEHOLDERS: &[char] = &['s', 'f', 't', 'c', 'n', 'i', 'r', 'F'];

pub(crate) fn validate_command(cmd: &str) -> Result<(), ParseError> {
    let mut chars = cmd.chars();
    while let Some(ch) = chars.next() {
        if ch != '%' {
            continue;
        }
        match chars.next() {
            Some('%') => {}
            Some(c) if PLACEHOLDERS.contains(&c) => {}
            Some(c) => return Err(ParseError::InvalidPlaceholder(format!("%{c}"))),
            None => return Err(ParseError::InvalidPlaceholder("%".to_string())),
        }
    }
    Ok(())
}

/// Substitute placeholders with the message's fields. A missing field
/// expands to the empty string; anything validation would have rejected is
/// passed through untouched.
pub fn expand_command(cmd: &str, msg: &MessageRecord) -> String {
    let mut out = String::with_capacity(cmd.len());
    let mut chars = cmd.chars();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some('s') => out.push_str(msg.subject.as_deref().unwrap_or("")),
            Some('f') => out.push_str(msg.from.as_deref().unwrap_or("")),
            Some('t') => out.push_str(msg.to.as_deref().unwrap_or("")),
            Some('c') => out.push_str(msg.cc.as_deref().unwrap_or("")),
            Some('n') => out.push_str(msg.newsgroups.as_deref().unwrap_or("")),
            Some('i') => out.push_str(msg.inreplyto.as_deref().unwrap_or("")),
            Some('r') => out.push_str(msg.references.as_deref().unwrap_or("")),
            Some('F') => out.push_str(msg.file_path.as_deref().unwrap_or("")),
            Some(c) => {
                out.push('%');
                out.push(c);
            }
            None => out.push('%'),
        }
    }

    out
}
