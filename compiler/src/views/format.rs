//! Output Formatting
//!
//! Re-indents generated code with tabs by bracket depth. Only
//! leading whitespace changes; lines inside multi-line block
//! comments are left as they are.
//!

// ------------------------------------------------------------- Public Functions

/// Formats generated code. Blank lines are removed and every
/// other line is indented one tab per open bracket.
///
pub fn format(code: &str) -> String {
    let mut formatted = String::with_capacity(code.len() + code.len() / 4);
    let mut depth: usize = 0;
    let mut in_comment = false;

    for line in code.lines() {
        if in_comment {
            formatted.push_str(line);
            formatted.push('\n');
            in_comment = scan(line, true).in_comment;
            continue;
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let leading_closers = line
            .chars()
            .take_while(|c| matches!(c, '}' | ')' | ']'))
            .count();

        for _ in 0..depth.saturating_sub(leading_closers) {
            formatted.push('\t');
        }
        formatted.push_str(line);
        formatted.push('\n');

        let summary = scan(line, false);
        depth = (depth + summary.opened).saturating_sub(summary.closed);
        in_comment = summary.in_comment;
    }

    formatted
}

// ------------------------------------------------------------- Private Types

/// Bracket counts of one line, ignoring strings and comments.
///
struct LineSummary {
    opened: usize,
    closed: usize,
    in_comment: bool,
}

// ------------------------------------------------------------- Private Functions

fn scan(line: &str, starts_in_comment: bool) -> LineSummary {
    let mut summary = LineSummary {
        opened: 0,
        closed: 0,
        in_comment: starts_in_comment,
    };
    let mut quote: Option<char> = None;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if summary.in_comment {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                summary.in_comment = false;
            }
            continue;
        }

        if let Some(open) = quote {
            if c == '\\' {
                chars.next();
            } else if c == open {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => quote = Some(c),
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                summary.in_comment = true;
            }
            '/' if chars.peek() == Some(&'/') => break,
            '{' | '(' | '[' => summary.opened += 1,
            '}' | ')' | ']' => summary.closed += 1,
            _ => {}
        }
    }

    summary
}

// ------------------------------------------------------------- Unit Tests

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_indents_blocks() {
        let code = "function a() {\nvar b;\nif (b) {\nc();\n}\nreturn b;\n};";

        assert_eq!(
            format(code),
            "function a() {\n\tvar b;\n\tif (b) {\n\t\tc();\n\t}\n\treturn b;\n};\n"
        );
    }

    #[test]
    fn test_format_ignores_brackets_in_strings() {
        let code = "a = {\nb: \"}{\",\nc: '(('\n};";
        assert_eq!(format(code), "a = {\n\tb: \"}{\",\n\tc: '(('\n};\n");
    }

    #[test]
    fn test_format_keeps_comment_lines() {
        let code = "f() {\n/* one {\n  two\n*/\ng();\n}";
        assert_eq!(format(code), "f() {\n\t/* one {\n  two\n*/\n\tg();\n}\n");
    }

    #[test]
    fn test_format_drops_blank_lines() {
        assert_eq!(format("a;\n\n   \nb;"), "a;\nb;\n");
    }

    #[test]
    fn test_format_is_idempotent() {
        let code = "function a() {\nif (b) {\nc();\n}\n};";
        assert_eq!(format(&format(code)), format(code));
    }
}
