use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// A span of source text: 1-based line numbers, 0-based character columns.
///
/// Columns of a line joined with `\` continuations keep counting past the end
/// of the first physical line, so a range always points into the logical line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceRange {
    pub file: Arc<str>,
    pub line_start: usize,
    pub char_start: usize,
    pub line_end: usize,
    pub char_end: usize,
}

impl SourceRange {
    pub fn new(file: Arc<str>, line: usize, char_start: usize, char_end: usize) -> Self {
        Self {
            file,
            line_start: line,
            char_start,
            line_end: line,
            char_end,
        }
    }

    /// A sub-range of the same line, shifted by `offset` columns.
    pub fn shifted(&self, offset: usize, len: usize) -> Self {
        let start = self.char_start + offset;
        Self::new(self.file.clone(), self.line_start, start, start + len)
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line_start == self.line_end && self.char_start == self.char_end {
            write!(f, "{}:{}:{}", self.file, self.line_start, self.char_start)
        } else {
            write!(
                f,
                "{}:{}:{}-{}:{}",
                self.file, self.line_start, self.char_start, self.line_end, self.char_end
            )
        }
    }
}

// ---------------------------------------------------------------------------
// Compile-time errors
// ---------------------------------------------------------------------------

/// A failure that aborts a whole compilation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("{message}")]
    LineImbalance { message: String, range: SourceRange },

    #[error("{message}")]
    ParameterMismatch { message: String, range: SourceRange },

    #[error("'{code}' is not a valid Hat")]
    InvalidHat { code: String, range: SourceRange },

    #[error("'{code}' is not a valid Command")]
    InvalidCommand { code: String, range: SourceRange },

    #[error("{message}")]
    InvalidValue { message: String, range: SourceRange },

    #[error("{message}")]
    EndImbalance { message: String, range: SourceRange },

    #[error("'{word}' is a reserved word and cannot be used in '{code}'")]
    ReservedWord {
        word: String,
        code: String,
        range: SourceRange,
    },

    #[error("'{pattern}' is already defined")]
    DuplicateDefinition { pattern: String, range: SourceRange },

    #[error("the project does not contain any code")]
    EmptyProject,
}

impl CompileError {
    /// Short machine-readable category, shown next to the message in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LineImbalance { .. } => "line imbalance",
            Self::ParameterMismatch { .. } => "parameter mismatch",
            Self::InvalidHat { .. } | Self::InvalidCommand { .. } => "invalid code",
            Self::InvalidValue { .. } => "invalid value",
            Self::EndImbalance { .. } => "end imbalance",
            Self::ReservedWord { .. } => "reserved word",
            Self::DuplicateDefinition { .. } => "duplicate definition",
            Self::EmptyProject => "empty project",
        }
    }

    pub fn range(&self) -> Option<&SourceRange> {
        match self {
            Self::LineImbalance { range, .. }
            | Self::ParameterMismatch { range, .. }
            | Self::InvalidHat { range, .. }
            | Self::InvalidCommand { range, .. }
            | Self::InvalidValue { range, .. }
            | Self::EndImbalance { range, .. }
            | Self::ReservedWord { range, .. }
            | Self::DuplicateDefinition { range, .. } => Some(range),
            Self::EmptyProject => None,
        }
    }
}

/// One entry of a [`CompileLog`].
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: &'static str,
    pub message: String,
    pub range: Option<SourceRange>,
}

impl From<CompileError> for Diagnostic {
    fn from(e: CompileError) -> Self {
        Diagnostic {
            kind: e.kind(),
            message: e.to_string(),
            range: e.range().cloned(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.range {
            Some(range) => write!(f, "{}: {} ({})", range, self.message, self.kind),
            None => write!(f, "{} ({})", self.message, self.kind),
        }
    }
}

/// The diagnostics of a failed compilation. Returned by value, never shared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompileLog {
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileLog {
    pub fn push(&mut self, error: CompileError) {
        self.diagnostics.push(error.into());
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

impl From<CompileError> for CompileLog {
    fn from(e: CompileError) -> Self {
        CompileLog {
            diagnostics: vec![e.into()],
        }
    }
}

impl fmt::Display for CompileLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", d)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileLog {}

// ---------------------------------------------------------------------------
// Run-time errors
// ---------------------------------------------------------------------------

/// A failure raised while a hat is running. Aborts that hat invocation only.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{range}: {message}")]
pub struct RuntimeError {
    pub message: String,
    pub range: SourceRange,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>, range: &SourceRange) -> Self {
        RuntimeError {
            message: message.into(),
            range: range.clone(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
