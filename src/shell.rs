//! Shell-argument escaping

/// Escapes `value` so a POSIX shell reads it back as exactly one argument.
///
/// Characters outside `[A-Za-z0-9_\-.,:+/@]` are backslash-escaped and a
/// newline becomes `'\n'` (a backslash-newline would be a line
/// continuation). An empty string becomes `''`.
pub fn escape(value: &str) -> String {
    if value.is_empty() {
        return "''".to_string();
    }

    let mut escaped = String::with_capacity(value.len() * 2);
    for ch in value.chars() {
        match ch {
            '\n' => escaped.push_str("'\n'"),
            c if is_safe(c) => escaped.push(c),
            c => {
                escaped.push('\\');
                escaped.push(c);
            }
        }
    }
    escaped
}

fn is_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ',' | ':' | '+' | '/' | '@')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    /// What `sh` sees when `escaped` is spliced into a command line
    fn reparse(escaped: &str) -> String {
        let output = Command::new("sh")
            .arg("-c")
            .arg(format!("printf %s {}", escaped))
            .output()
            .unwrap();
        String::from_utf8(output.stdout).unwrap()
    }

    #[test]
    fn test_escape_space() {
        assert_eq!(escape("hello world"), "hello\\ world");
    }

    #[test]
    fn test_safe_characters_untouched() {
        assert_eq!(escape("pkg-1.2.0+b1/gem@host:a,b"), "pkg-1.2.0+b1/gem@host:a,b");
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(escape(""), "''");
    }

    #[test]
    fn test_newline() {
        assert_eq!(escape("a\nb"), "a'\n'b");
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_reads_back_single_token() {
        for input in ["hello world", "it's $HOME", "a;b|c&d", "tab\there", "\"q\"", "a\nb", ""] {
            assert_eq!(reparse(&escape(input)), input, "input {:?}", input);
        }
    }
}
