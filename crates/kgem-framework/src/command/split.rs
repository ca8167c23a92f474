//! Text splitting for command invocations.

/// Strips `prefix` and `body` from the start of `text`.
///
/// Returns the remainder when `text` is an invocation of `prefix` + `body`:
/// the remainder must be empty or start with a space or a newline, so
/// `.ping` and `.ping now` match `.` + `ping` but `.pingpong` does not.
pub fn strip_invocation<'a>(text: &'a str, prefix: &str, body: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(prefix)?.strip_prefix(body)?;
    match rest.chars().next() {
        None | Some(' ') | Some('\n') => Some(rest),
        Some(_) => None,
    }
}

/// Splits the arguments of a command invocation.
///
/// Everything after the first whitespace-delimited token is split into lines,
/// and every line into whitespace-delimited tokens. Lines without tokens are
/// kept as empty lists so line positions stay stable. A text with a single
/// token has no arguments.
pub fn parse_arguments(text: &str) -> Vec<Vec<String>> {
    let text = text.trim_start();
    let Some(split_at) = text.find(char::is_whitespace) else {
        return Vec::new();
    };

    let rest = text[split_at..].trim_start();
    if rest.is_empty() {
        return Vec::new();
    }

    rest.lines()
        .map(|line| line.split_whitespace().map(str::to_owned).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_invocation_boundary() {
        assert_eq!(strip_invocation(".ping", ".", "ping"), Some(""));
        assert_eq!(strip_invocation(".ping now", ".", "ping"), Some(" now"));
        assert_eq!(strip_invocation(".ping\nnow", ".", "ping"), Some("\nnow"));
        assert_eq!(strip_invocation(".pingpong", ".", "ping"), None);
        assert_eq!(strip_invocation("/ping", ".", "ping"), None);
        assert_eq!(strip_invocation(".Ping", ".", "ping"), None);
    }

    #[test]
    fn test_strip_invocation_tab_is_not_a_boundary() {
        assert_eq!(strip_invocation(".ping\tnow", ".", "ping"), None);
    }

    #[test]
    fn test_parse_arguments_by_line() {
        assert_eq!(
            parse_arguments(".ping arg1\narg2 arg3"),
            vec![vec!["arg1"], vec!["arg2", "arg3"]]
        );
    }

    #[test]
    fn test_parse_arguments_single_token() {
        assert!(parse_arguments(".ping").is_empty());
        assert!(parse_arguments(".ping   ").is_empty());
        assert!(parse_arguments("").is_empty());
    }

    #[test]
    fn test_parse_arguments_keeps_blank_lines() {
        assert_eq!(
            parse_arguments(".note a\n\n b  c"),
            vec![vec!["a"], vec![], vec!["b", "c"]]
        );
    }

    #[test]
    fn test_parse_arguments_first_line_empty() {
        assert_eq!(parse_arguments(".note\nfirst"), vec![vec!["first"]]);
    }
}
