use std::borrow::Cow;

/// Whether `c` may appear in an XML 1.0 text node.
///
/// Tab, newline and carriage return are the only C0 controls XML accepts.
/// DEL is legal XML but never meaningful in titles or backend diagnostics.
fn is_xml_char(c: char) -> bool {
    match c {
        '\t' | '\n' | '\r' => true,
        '\u{0}'..='\u{1f}' | '\u{7f}' => false,
        '\u{fffe}' | '\u{ffff}' => false,
        _ => true,
    }
}

/// Strip control characters and ANSI escape sequences from text.
///
/// Upstream metadata (titles, descriptions) and backend stderr routinely
/// carry terminal colour codes or stray control bytes. Those are illegal in
/// an XML text node and unreadable in logs, so both the feed renderer and
/// the backend adapter run text through here first.
///
/// Strips:
/// - C0 control chars except tab, newline and carriage return, plus DEL
/// - ANSI CSI sequences: `\x1b[` ... (final byte 0x40-0x7E)
/// - ANSI OSC sequences: `\x1b]` ... (until BEL or ST `\x1b\\`)
/// - Bare ESC
/// - The XML non-characters U+FFFE and U+FFFF
///
/// Returns `Cow::Borrowed` when nothing needs removing (the common case).
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if s.chars().all(is_xml_char) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\u{1b}' {
            if is_xml_char(c) {
                out.push(c);
            }
            continue;
        }

        match chars.peek() {
            Some('[') => {
                chars.next();
                // Parameter and intermediate bytes run until the final byte.
                for c in chars.by_ref() {
                    if ('\u{40}'..='\u{7e}').contains(&c) {
                        break;
                    }
                }
            }
            Some(']') => {
                chars.next();
                while let Some(c) = chars.next() {
                    if c == '\u{7}' {
                        break;
                    }
                    if c == '\u{1b}' && chars.peek() == Some(&'\\') {
                        chars.next();
                        break;
                    }
                }
            }
            _ => {}
        }
    }

    Cow::Owned(out)
}

/// Return the last `max_lines` non-blank lines of `s`, joined by newlines.
///
/// Used to keep backend diagnostics short enough for an error message.
pub fn tail_lines(s: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = s
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}
