use regex::Regex;
use std::sync::OnceLock;

/// Longest snippet kept on an issue
pub const SNIPPET_CHARS: usize = 100;

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b").expect("invalid email regex")
    })
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"\b\d{4}[ -]\d{4}[ -]\d{4}[ -]\d{1,7}\b",
            r"|\(?\b\d{3}\)?[ .-]\d{3}[ .-]\d{4}\b",
            r"|\b\d{8,}\b",
        ))
        .expect("invalid number regex")
    })
}

/// Short, PII-free excerpt of a text block for issue reports and logs.
///
/// Whitespace is collapsed, e-mail addresses and card/phone/account numbers
/// are masked, then the result is cut to `SNIPPET_CHARS` characters.
pub fn redact_snippet(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let masked = email_re().replace_all(&collapsed, "[email]");
    let masked = number_re().replace_all(&masked, "[number]");
    masked.chars().take(SNIPPET_CHARS).collect()
}
