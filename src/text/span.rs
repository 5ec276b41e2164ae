use std::fmt;

use super::annotation::{ AnnotationBuilder, Underline };
use super::Input;

/// A region of an Input paired with some associated contents, such as an
/// error reason. The start/stop pair is an inclusive/exclusive byte range.
#[derive(Clone, PartialEq, Eq)]
pub struct Span<'a, T> {
    input: &'a Input,
    start: usize,
    stop: usize,
    pub contents: T
}

impl<'a, T> Span<'a, T> {
    pub(super) fn new(input: &'a Input, start: usize, stop: usize, contents: T) -> Self {
        Span { input, start, stop, contents }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn stop(&self) -> usize {
        self.stop
    }

    pub fn as_str(&self) -> &'a str {
        &self.input.as_str()[self.start..self.stop]
    }
}

impl<'a, T> fmt::Display for Span<'a, T>
    where
        T: fmt::Display {

    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = AnnotationBuilder::new(self.input);

        let lower_pos = self.input.get_pos(self.start);
        let upper_pos = self.input.get_pos(self.stop.max(self.start));

        match upper_pos.line - lower_pos.line {
            0 => {
                let underline = Underline {
                    start: lower_pos.col,
                    len: upper_pos.col.saturating_sub(lower_pos.col).max(1)
                };
                builder.add_line_underlined(lower_pos.line, underline);
            },
            _ => {
                let underline1 = Underline {
                    start: lower_pos.col,
                    len: self.input.get_line_slice(lower_pos.line).len().saturating_sub(lower_pos.col)
                };
                builder.add_line_underlined(lower_pos.line, underline1);

                let underline2 = Underline {
                    start: 0,
                    len: upper_pos.col
                };
                builder.add_line_underlined(upper_pos.line, underline2);
            }
        }

        builder.set_message(format!("{}", self.contents));

        write!(f, "{}", builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_span_underlines_range() {
        let input = Input::new("let x = 1 + foo".into());
        let span = input.get_span(12, 15, "unknown identifier");

        let rendered = format!("{}", span);
        assert!(rendered.contains("let x = 1 + foo"));
        assert!(rendered.contains("unknown identifier"));
    }

    #[test]
    fn multi_line_span_underlines_both_lines() {
        let input = Input::new("abc\ndefgh".into());
        let span = input.get_span(1, 7, "spans two lines");

        let rendered = format!("{}", span);
        assert!(rendered.contains("abc"));
        assert!(rendered.contains("defgh"));
        assert!(rendered.contains("spans two lines"));
    }
}
