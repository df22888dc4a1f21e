//! The compiled program: a flat arena of nodes addressed by integer handles.
//!
//! Back-references (command -> hat, command -> enclosing c-block,
//! reporter -> triggering command) are plain handles into the same arena.

use std::ops::Range;
use std::sync::Arc;

use crate::error::SourceRange;
use crate::vocabulary::Vocabulary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HatId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReporterId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefinitionId(pub usize);

/// What running a command does, resolved once at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Index into the vocabulary's commands.
    Native(usize),
    /// Index into the vocabulary's c-blocks.
    Block(usize),
    /// Call a user-defined command.
    Invoke(DefinitionId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterKind {
    Native(usize),
    Invoke(DefinitionId),
}

/// An entry point: an event hat or the body of a definition.
#[derive(Debug, Clone)]
pub struct Hat {
    /// The registered hat pattern, or the definition's pattern.
    pub pattern: String,
    /// Names bound to the arguments the hat is started with.
    pub params: Vec<String>,
    pub body: Vec<CommandId>,
    pub range: SourceRange,
    pub definition: Option<DefinitionId>,
}

/// One compiled statement. C-blocks additionally use `body` and `chain`.
#[derive(Debug, Clone)]
pub struct CommandNode {
    pub kind: CommandKind,
    pub inputs: Vec<Value>,
    pub hat: HatId,
    /// Innermost enclosing c-block.
    pub parent: Option<CommandId>,
    pub range: SourceRange,
    pub body: Vec<CommandId>,
    /// Next alternative in an if / else if / else sequence.
    pub chain: Option<CommandId>,
}

#[derive(Debug, Clone)]
pub struct ReporterNode {
    pub kind: ReporterKind,
    pub inputs: Vec<Value>,
    /// The command whose evaluation triggers this reporter.
    pub command: Option<CommandId>,
    pub range: SourceRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionKind {
    Command,
    Reporter,
}

/// A `define command ...` / `define reporter ...` template.
#[derive(Debug, Clone)]
pub struct Definition {
    pub kind: DefinitionKind,
    pub pattern: String,
    pub params: Vec<String>,
    pub hat: HatId,
}

/// A lazily evaluated input.
#[derive(Debug, Clone)]
pub enum Value {
    /// `[...]` text with `#name#` spans.
    Text { parts: Vec<TextPart>, range: SourceRange },
    Number { value: f64, range: SourceRange },
    Variable { name: String, range: SourceRange },
    Reporter(ReporterId),
    /// Arithmetic / logic text; `embedded` spans are replaced by their
    /// values before evaluation.
    Expression {
        text: String,
        embedded: Vec<Embedded>,
        range: SourceRange,
    },
    /// `{...}` input. Never evaluated as a value.
    Statement { text: String, range: SourceRange },
}

#[derive(Debug, Clone)]
pub enum TextPart {
    Literal(String),
    Interpolated(Value),
}

/// A sub-value of an expression, at a character span of its text.
#[derive(Debug, Clone)]
pub struct Embedded {
    pub span: Range<usize>,
    pub value: Value,
}

/// An executable program. Immutable once compiled.
pub struct Program {
    pub(crate) vocabulary: Arc<Vocabulary>,
    pub(crate) hats: Vec<Hat>,
    pub(crate) commands: Vec<CommandNode>,
    pub(crate) reporters: Vec<ReporterNode>,
    pub(crate) definitions: Vec<Definition>,
}

impl Program {
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn hats(&self) -> &[Hat] {
        &self.hats
    }

    pub fn hat(&self, id: HatId) -> &Hat {
        &self.hats[id.0]
    }

    pub fn command(&self, id: CommandId) -> &CommandNode {
        &self.commands[id.0]
    }

    pub fn reporter(&self, id: ReporterId) -> &ReporterNode {
        &self.reporters[id.0]
    }

    pub fn definition(&self, id: DefinitionId) -> &Definition {
        &self.definitions[id.0]
    }

    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    /// Event hats registered under exactly `pattern`, in source order.
    pub fn hats_matching<'a>(&'a self, pattern: &'a str) -> impl Iterator<Item = HatId> + 'a {
        self.hats
            .iter()
            .enumerate()
            .filter(move |(_, hat)| hat.definition.is_none() && hat.pattern == pattern)
            .map(|(i, _)| HatId(i))
    }

    /// The chain of alternatives starting at `id`, `id` included.
    pub fn chain(&self, id: CommandId) -> impl Iterator<Item = CommandId> + '_ {
        std::iter::successors(Some(id), move |c| self.command(*c).chain)
    }
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("hats", &self.hats.len())
            .field("commands", &self.commands.len())
            .field("reporters", &self.reporters.len())
            .field("definitions", &self.definitions.len())
            .finish()
    }
}
