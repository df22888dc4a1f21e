use std::fmt;
use std::sync::Arc;

use crate::error::{CompileError, CompileLog, SourceRange};
use crate::pattern::normalize_core;
use crate::source::SourceFile;

/// The three delimiters an input can be written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BracketKind {
    /// `[...]`: text, or any value when it appears in a pattern.
    Text,
    /// `(...)`: an object: number, variable, reporter call or expression.
    Object,
    /// `{...}`: a reference to a nested statement.
    Statement,
}

impl BracketKind {
    pub fn from_open(c: char) -> Option<Self> {
        match c {
            '[' => Some(Self::Text),
            '(' => Some(Self::Object),
            '{' => Some(Self::Statement),
            _ => None,
        }
    }

    pub fn from_close(c: char) -> Option<Self> {
        match c {
            ']' => Some(Self::Text),
            ')' => Some(Self::Object),
            '}' => Some(Self::Statement),
            _ => None,
        }
    }

    pub fn open(self) -> char {
        match self {
            Self::Text => '[',
            Self::Object => '(',
            Self::Statement => '{',
        }
    }

    pub fn close(self) -> char {
        match self {
            Self::Text => ']',
            Self::Object => ')',
            Self::Statement => '}',
        }
    }
}

impl fmt::Display for BracketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.open(), self.close())
    }
}

/// The contents of one top-level bracket group.
#[derive(Debug, Clone, PartialEq)]
pub struct Input {
    /// Trimmed text between the delimiters.
    pub text: String,
    pub range: SourceRange,
    pub kind: BracketKind,
}

/// A tokenized logical line.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLine {
    /// The trimmed logical line as written.
    pub code: String,
    /// Literal words with every input collapsed to its empty delimiters,
    /// whitespace normalized: `print [Hello]` -> `print []`.
    pub core: String,
    pub inputs: Vec<Input>,
    pub range: SourceRange,
}

// ---------------------------------------------------------------------------
// Line splitting
// ---------------------------------------------------------------------------

/// Split file text into logical lines, each with the 1-based number of its
/// first physical line and the column its code starts at.
///
/// A `\` right before a line break joins the next physical line. Blank lines
/// and lines starting with `#` are dropped.
pub fn split_lines(code: &str) -> Vec<(usize, usize, String)> {
    let mut lines = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (index, raw) in code.split('\n').enumerate() {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        let (first_line, mut text) = match pending.take() {
            Some((n, mut acc)) => {
                acc.push_str(raw.trim_start());
                (n, acc)
            }
            None => (index + 1, raw.to_string()),
        };

        if text.ends_with('\\') {
            text.pop();
            pending = Some((first_line, text));
            continue;
        }
        push_logical(&mut lines, first_line, &text);
    }
    if let Some((first_line, text)) = pending {
        push_logical(&mut lines, first_line, &text);
    }

    lines
}

fn push_logical(lines: &mut Vec<(usize, usize, String)>, line: usize, text: &str) {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return;
    }
    let column = text.chars().take_while(|c| c.is_whitespace()).count();
    lines.push((line, column, trimmed.to_string()));
}

// ---------------------------------------------------------------------------
// Bracket tokenizer
// ---------------------------------------------------------------------------

/// Split one element into its raw core and its top-level inputs.
///
/// `origin` is the range of `text` itself; input ranges are computed relative
/// to its start column. Inside `[...]` only the matching `]` is recognized,
/// so brackets in text literals are never balanced.
pub fn split_element(
    text: &str,
    origin: &SourceRange,
) -> Result<(String, Vec<Input>), CompileError> {
    let mut core = String::new();
    let mut inputs = Vec::new();
    let mut current = String::new();
    let mut input_start = 0;
    let mut stack: Vec<(BracketKind, usize)> = Vec::new();

    for (i, c) in text.chars().enumerate() {
        let in_text = matches!(stack.last(), Some((BracketKind::Text, _)));
        if in_text && c != ']' {
            current.push(c);
            continue;
        }

        if !in_text {
            if let Some(kind) = BracketKind::from_open(c) {
                if stack.is_empty() {
                    core.push(c);
                    current.clear();
                    input_start = i + 1;
                } else {
                    current.push(c);
                }
                stack.push((kind, i));
                continue;
            }
        }

        if let Some(kind) = BracketKind::from_close(c) {
            let (open, _) = stack.pop().ok_or_else(|| CompileError::LineImbalance {
                message: format!(
                    "There are more '{}' than '{}' in this line.",
                    c,
                    kind.open()
                ),
                range: origin.shifted(i, 1),
            })?;
            if open != kind {
                return Err(CompileError::ParameterMismatch {
                    message: format!(
                        "Parameters must match one another. Cannot have '{}' matched with '{}'.",
                        open.open(),
                        c
                    ),
                    range: origin.shifted(i, 1),
                });
            }
            if stack.is_empty() {
                inputs.push(Input {
                    text: current.trim().to_string(),
                    range: origin.shifted(input_start, i - input_start),
                    kind,
                });
                core.push(c);
            } else {
                current.push(c);
            }
            continue;
        }

        if stack.is_empty() {
            core.push(c);
        } else {
            current.push(c);
        }
    }

    if let Some(&(kind, at)) = stack.last() {
        return Err(CompileError::LineImbalance {
            message: format!(
                "There are more '{}' than '{}' in this line.",
                kind.open(),
                kind.close()
            ),
            range: origin.shifted(at, 1),
        });
    }

    Ok((core, inputs))
}

/// Tokenize one logical line whose code starts at `column`.
pub fn tokenize_line(
    file: &Arc<str>,
    line: usize,
    column: usize,
    code: &str,
) -> Result<SourceLine, CompileError> {
    let range = SourceRange::new(file.clone(), line, column, column + code.chars().count());
    let (core, inputs) = split_element(code, &range)?;
    Ok(SourceLine {
        code: code.to_string(),
        core: normalize_core(&core),
        inputs,
        range,
    })
}

/// Tokenize a whole file. Every faulty line is reported to `log`; the
/// returned lines are only meaningful when nothing was reported.
pub fn tokenize(file: &SourceFile, log: &mut CompileLog) -> Vec<SourceLine> {
    let mut lines = Vec::new();
    for (number, column, code) in split_lines(&file.code) {
        match tokenize_line(&file.name, number, column, &code) {
            Ok(line) => lines.push(line),
            Err(e) => log.push(e),
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn line(code: &str) -> Result<SourceLine, CompileError> {
        tokenize_line(&Arc::from("main"), 1, 0, code)
    }

    #[test]
    fn continuation_joins_physical_lines() {
        let lines = split_lines("when started\n\tprint [Hello \\\n\t\tWorld]\nend");
        assert_eq!(
            lines,
            vec![
                (1, 0, "when started".to_string()),
                (2, 1, "print [Hello World]".to_string()),
                (4, 0, "end".to_string()),
            ]
        );
    }

    #[test]
    fn comments_and_blank_lines_are_dropped() {
        let lines = split_lines("# heading\r\n\r\n   \nwhen started\n  # indented comment\nend\n");
        assert_eq!(
            lines,
            vec![(4, 0, "when started".to_string()), (6, 0, "end".to_string())]
        );
    }

    #[test]
    fn splits_core_and_inputs() {
        let l = line("set [x] to (value of [y])").unwrap();
        assert_eq!(l.core, "set [] to ()");
        assert_eq!(l.inputs.len(), 2);
        assert_eq!(l.inputs[0].text, "x");
        assert_eq!(l.inputs[0].kind, BracketKind::Text);
        assert_eq!(l.inputs[1].text, "value of [y]");
        assert_eq!(l.inputs[1].kind, BracketKind::Object);
        assert_eq!(l.inputs[1].range.char_start, 12);
        assert_eq!(l.inputs[1].range.char_end, 24);
    }

    #[test]
    fn core_whitespace_is_normalized() {
        let l = line("print    [a]   ").unwrap();
        assert_eq!(l.core, "print []");
    }

    #[test]
    fn text_inputs_do_not_track_nested_brackets() {
        let l = line("print [a (b { c]").unwrap();
        assert_eq!(l.inputs[0].text, "a (b { c");
        assert!(matches!(
            line("print [a [b] c]"),
            Err(CompileError::LineImbalance { .. })
        ));
    }

    #[test]
    fn unmatched_close_reports_its_column() {
        match line("print (x))") {
            Err(CompileError::LineImbalance { range, .. }) => {
                assert_eq!(range.char_start, 9);
            }
            other => panic!("expected imbalance, got {:?}", other),
        }
    }

    #[test]
    fn indentation_shifts_every_column() {
        let file = SourceFile::new("main", "when started\n\t\tprint [a] )\n  set [x] to (y)\nend");
        let mut log = CompileLog::default();
        let lines = tokenize(&file, &mut log);
        assert_eq!(log.diagnostics[0].to_string(), "main:2:12-2:13: There are more ')' than '(' in this line. (line imbalance)");

        let set = &lines[1];
        assert_eq!(set.range.char_start, 2);
        assert_eq!(set.range.char_end, 16);
        assert_eq!(set.inputs[0].range.char_start, 7);
        assert_eq!(set.inputs[1].range.char_start, 14);
    }

    #[test]
    fn mismatched_close_is_a_parameter_mismatch() {
        assert!(matches!(
            line("print (x}"),
            Err(CompileError::ParameterMismatch { .. })
        ));
    }

    #[test]
    fn unclosed_open_is_an_imbalance() {
        match line("print ((x)") {
            Err(CompileError::LineImbalance { message, range }) => {
                assert!(message.contains("more '('"));
                assert_eq!(range.char_start, 6);
            }
            other => panic!("expected imbalance, got {:?}", other),
        }
    }

    #[test]
    fn tokenize_collects_every_faulty_line() {
        let file = SourceFile::new("main", "when started\nprint (x\nprint [y\nend");
        let mut log = CompileLog::default();
        tokenize(&file, &mut log);
        assert_eq!(log.diagnostics.len(), 2);
        assert_eq!(log.diagnostics[0].range.as_ref().unwrap().line_start, 2);
        assert_eq!(log.diagnostics[1].range.as_ref().unwrap().line_start, 3);
    }

    fn group() -> impl Strategy<Value = (BracketKind, String)> {
        (
            prop_oneof![
                Just(BracketKind::Text),
                Just(BracketKind::Object),
                Just(BracketKind::Statement),
            ],
            "[a-z0-9 ]{0,8}",
        )
    }

    proptest! {
        #[test]
        fn balanced_lines_yield_one_input_per_group(groups in proptest::collection::vec(group(), 0..6)) {
            let mut code = String::from("say");
            for (kind, text) in &groups {
                code.push(' ');
                code.push(kind.open());
                code.push_str(text);
                code.push(kind.close());
            }
            let l = line(&code).unwrap();
            prop_assert_eq!(l.inputs.len(), groups.len());
            for (input, (kind, text)) in l.inputs.iter().zip(&groups) {
                prop_assert_eq!(input.kind, *kind);
                prop_assert_eq!(&input.text, text.trim());
            }
        }

        #[test]
        fn injected_close_is_rejected(
            groups in proptest::collection::vec(group(), 0..4),
            close in prop_oneof![Just(')'), Just('}'), Just(']')],
        ) {
            let mut code = String::from("say");
            for (kind, text) in &groups {
                code.push(' ');
                code.push(kind.open());
                code.push_str(text);
                code.push(kind.close());
            }
            code.push(close);
            prop_assert!(line(&code).is_err());
        }
    }
}
