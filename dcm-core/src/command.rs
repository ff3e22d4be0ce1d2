//! Command lines for the external compose tool
//!
//! Custom start/stop overrides come from the config file as plain strings and
//! are split here into an argument vector. Nothing is ever passed through a
//! shell.

/// Lists live processes for the project; empty output means nothing is up
pub const DEFAULT_STATUS: &[&str] = &["docker-compose", "top"];
/// Brings the project up, detached
pub const DEFAULT_START: &[&str] = &["docker-compose", "up", "-d"];
/// Brings the project down
pub const DEFAULT_STOP: &[&str] = &["docker-compose", "down"];

/// Split a command string into arguments.
///
/// Whitespace outside double quotes separates tokens, whitespace inside them
/// is kept, and a backslash takes the next character literally (quotes and
/// backslashes included). The quote characters themselves are dropped.
///
/// Input is accepted leniently on purpose: an unterminated quote runs to the
/// end of the string and a trailing backslash is ignored, neither is an error.
/// A quoted segment that ends up empty (`""`) does not produce a token.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape_next = false;

    for c in input.chars() {
        if escape_next {
            current.push(c);
            escape_next = false;
            continue;
        }

        match c {
            '\\' => escape_next = true,
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() => {
                if in_quotes {
                    current.push(c);
                } else if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if !current.is_empty() {
        args.push(current);
    }

    args
}

/// Argument vector for an optional override, falling back to `default`.
///
/// A blank override counts as not configured.
pub fn resolve(custom: Option<&str>, default: &[&str]) -> Vec<String> {
    match custom.map(str::trim) {
        Some(s) if !s.is_empty() => tokenize(s),
        _ => owned(default),
    }
}

pub fn owned(argv: &[&str]) -> Vec<String> {
    argv.iter().map(|s| s.to_string()).collect()
}

/// Render an argument vector for logs, quoting arguments that need it
pub fn render_argv(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| {
            if arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || c == '"' || c == '\\') {
                let escaped = arg.replace('\\', "\\\\").replace('"', "\\\"");
                format!("\"{}\"", escaped)
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
