use std::fmt;

/// Indentable in-memory text sink for diagnostics and dumps.
///
/// Each line written is prefixed with the current indentation.
#[derive(Debug, Clone)]
pub struct TextLog {
    buf: String,
    indent: usize,
    at_line_start: bool,
}

const INDENT: &str = "  ";

impl TextLog {
    pub fn new() -> Self {
        Self {
            buf: String::new(),
            indent: 0,
            at_line_start: true,
        }
    }

    pub fn push_indent(&mut self) {
        self.indent += 1;
    }

    pub fn pop_indent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// Write one line at the current indentation.
    pub fn line(&mut self, text: impl AsRef<str>) {
        use fmt::Write;
        // Writing into a String cannot fail.
        let _ = writeln!(self, "{}", text.as_ref());
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}

impl Default for TextLog {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Write for TextLog {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for piece in s.split_inclusive('\n') {
            if self.at_line_start && piece != "\n" {
                for _ in 0..self.indent {
                    self.buf.push_str(INDENT);
                }
            }
            self.buf.push_str(piece);
            self.at_line_start = piece.ends_with('\n');
        }
        Ok(())
    }
}

impl fmt::Display for TextLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write;

    #[test]
    fn test_indentation_applies_per_line() {
        let mut log = TextLog::new();
        log.line("brep");
        log.push_indent();
        write!(log, "a\nb").unwrap();
        writeln!(log, "c").unwrap();
        log.pop_indent();
        log.line("end");
        assert_eq!(log.as_str(), "brep\n  a\n  bc\nend\n");
    }
}
