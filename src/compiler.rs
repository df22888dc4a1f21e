use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use crate::error::{CompileError, CompileLog, SourceRange};
use crate::expression::OPERATOR_CHARS;
use crate::lexer::{self, BracketKind, Input, SourceLine};
use crate::pattern::{matches, normalize_core, reserved_word};
use crate::program::{
    CommandId, CommandKind, CommandNode, Definition, DefinitionId, DefinitionKind, Embedded, Hat,
    HatId, Program, ReporterId, ReporterKind, ReporterNode, TextPart, Value,
};
use crate::source::SourceFile;
use crate::vocabulary::Vocabulary;

static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?$").unwrap());

const END: &str = "end";
const DEFINE_COMMAND: &str = "define command ";
const DEFINE_REPORTER: &str = "define reporter ";

/// Characters that end an `#identifier#` interpolation candidate.
const BREAK_CHARS: &[char] = &[
    ' ', '+', '-', '*', '/', '^', '=', '<', '>', '&', '|', '\'', '"', '(', ')', '[', ']', '{', '}',
];

type CompileResult<T> = std::result::Result<T, CompileError>;

/// Compile `files` against `vocabulary` into an executable program.
///
/// Bracket errors of every file are reported together; any later error
/// stops compilation at the first offending line. Nothing is returned on
/// failure but the log.
pub fn compile(vocabulary: Arc<Vocabulary>, files: &[SourceFile]) -> Result<Program, CompileLog> {
    debug!(files = files.len(), "compiling");

    let mut log = CompileLog::default();
    let tokenized: Vec<Vec<SourceLine>> = files.iter().map(|f| lexer::tokenize(f, &mut log)).collect();
    if !log.is_empty() {
        return Err(log);
    }
    if tokenized.iter().all(|lines| lines.is_empty()) {
        return Err(CompileError::EmptyProject.into());
    }

    let mut builder = Builder::new(vocabulary);
    let definitions = tokenized
        .iter()
        .map(|lines| builder.collect_definitions(lines))
        .collect::<CompileResult<Vec<_>>>()?;
    for (lines, definitions) in tokenized.iter().zip(&definitions) {
        builder.build_file(lines, definitions)?;
    }

    let program = builder.finish();
    debug!(
        hats = program.hats.len(),
        commands = program.commands.len(),
        reporters = program.reporters.len(),
        definitions = program.definitions.len(),
        "compiled"
    );
    Ok(program)
}

struct Builder {
    vocabulary: Arc<Vocabulary>,
    hats: Vec<Hat>,
    commands: Vec<CommandNode>,
    reporters: Vec<ReporterNode>,
    definitions: Vec<Definition>,
}

impl Builder {
    fn new(vocabulary: Arc<Vocabulary>) -> Self {
        Self {
            vocabulary,
            hats: Vec::new(),
            commands: Vec::new(),
            reporters: Vec::new(),
            definitions: Vec::new(),
        }
    }

    fn finish(self) -> Program {
        Program {
            vocabulary: self.vocabulary,
            hats: self.hats,
            commands: self.commands,
            reporters: self.reporters,
            definitions: self.definitions,
        }
    }

    // -----------------------------------------------------------------------
    // Definitions
    // -----------------------------------------------------------------------

    /// Register every definition header of a file, so that calls can appear
    /// before the definition. Returns the body hat of each header line.
    fn collect_definitions(&mut self, lines: &[SourceLine]) -> CompileResult<Vec<Option<HatId>>> {
        lines.iter().map(|line| self.define(line)).collect()
    }

    fn define(&mut self, line: &SourceLine) -> CompileResult<Option<HatId>> {
        let Some((kind, pattern)) = definition_header(&line.core) else {
            return Ok(None);
        };
        if pattern.is_empty() {
            return Err(CompileError::InvalidHat {
                code: line.code.clone(),
                range: line.range.clone(),
            });
        }
        if let Some(word) = reserved_word(&pattern) {
            return Err(CompileError::ReservedWord {
                word: word.to_string(),
                code: line.code.clone(),
                range: line.range.clone(),
            });
        }
        if self.definitions.iter().any(|d| d.pattern == pattern) {
            return Err(CompileError::DuplicateDefinition {
                pattern,
                range: line.range.clone(),
            });
        }

        let params: Vec<String> = line.inputs.iter().map(|i| i.text.clone()).collect();
        let hat = HatId(self.hats.len());
        let definition = DefinitionId(self.definitions.len());
        self.hats.push(Hat {
            pattern: pattern.clone(),
            params: params.clone(),
            body: Vec::new(),
            range: line.range.clone(),
            definition: Some(definition),
        });
        self.definitions.push(Definition {
            kind,
            pattern,
            params,
            hat,
        });
        trace!(line = %line.range, "definition");
        Ok(Some(hat))
    }

    fn find_definition(&self, kind: DefinitionKind, core: &str) -> Option<DefinitionId> {
        self.definitions
            .iter()
            .position(|d| d.kind == kind && matches(&d.pattern, core))
            .map(DefinitionId)
    }

    // -----------------------------------------------------------------------
    // Tree building
    // -----------------------------------------------------------------------

    fn build_file(&mut self, lines: &[SourceLine], definitions: &[Option<HatId>]) -> CompileResult<()> {
        let mut hat: Option<HatId> = None;
        let mut blocks: Vec<CommandId> = Vec::new();

        for (line, definition) in lines.iter().zip(definitions) {
            let Some(current) = hat else {
                hat = Some(self.open_hat(line, *definition)?);
                continue;
            };

            if line.core == END {
                if blocks.pop().is_none() {
                    hat = None;
                }
                continue;
            }
            if definition.is_some() {
                return Err(CompileError::InvalidCommand {
                    code: line.code.clone(),
                    range: line.range.clone(),
                });
            }
            self.add_command(line, current, &mut blocks)?;
        }

        if hat.is_some() {
            let range = lines.last().map(|l| l.range.clone()).unwrap_or_default();
            return Err(CompileError::EndImbalance {
                message: "There are not enough 'end's!".to_string(),
                range,
            });
        }
        Ok(())
    }

    fn open_hat(&mut self, line: &SourceLine, definition: Option<HatId>) -> CompileResult<HatId> {
        if line.core == END {
            return Err(CompileError::EndImbalance {
                message: "There are more 'end's than Hats or CBlocks!".to_string(),
                range: line.range.clone(),
            });
        }
        if let Some(hat) = definition {
            return Ok(hat);
        }

        let template = self
            .vocabulary
            .find_hat(&line.core)
            .ok_or_else(|| CompileError::InvalidHat {
                code: line.code.clone(),
                range: line.range.clone(),
            })?;
        let hat = HatId(self.hats.len());
        self.hats.push(Hat {
            pattern: self.vocabulary.hats[template].pattern.clone(),
            params: line.inputs.iter().map(|i| i.text.clone()).collect(),
            body: Vec::new(),
            range: line.range.clone(),
            definition: None,
        });
        trace!(line = %line.range, hat = hat.0, "hat");
        Ok(hat)
    }

    fn add_command(
        &mut self,
        line: &SourceLine,
        hat: HatId,
        blocks: &mut Vec<CommandId>,
    ) -> CompileResult<()> {
        let vocabulary = Arc::clone(&self.vocabulary);
        let kind = if let Some(i) = vocabulary.find_command(&line.core) {
            CommandKind::Native(i)
        } else if let Some(i) = vocabulary.find_cblock(&line.core) {
            CommandKind::Block(i)
        } else if let Some(d) = self.find_definition(DefinitionKind::Command, &line.core) {
            CommandKind::Invoke(d)
        } else {
            return Err(CompileError::InvalidCommand {
                code: line.code.clone(),
                range: line.range.clone(),
            });
        };

        let id = CommandId(self.commands.len());
        let parent = blocks.last().copied();
        self.commands.push(CommandNode {
            kind,
            inputs: Vec::new(),
            hat,
            parent,
            range: line.range.clone(),
            body: Vec::new(),
            chain: None,
        });
        let inputs = line
            .inputs
            .iter()
            .map(|input| self.compile_input(input, Some(id)))
            .collect::<CompileResult<Vec<_>>>()?;
        self.commands[id.0].inputs = inputs;
        trace!(line = %line.range, ?kind, "command");

        let CommandKind::Block(template) = kind else {
            self.append(hat, parent, id);
            return Ok(());
        };

        if let Some(top) = parent.filter(|&top| self.continues(top, template)) {
            let outer = self.commands[top.0].parent;
            self.commands[top.0].chain = Some(id);
            self.commands[id.0].parent = outer;
            if let Some(slot) = blocks.last_mut() {
                *slot = id;
            }
        } else {
            self.append(hat, parent, id);
            blocks.push(id);
        }
        Ok(())
    }

    /// Whether a c-block of `template` continues the open block `top`.
    fn continues(&self, top: CommandId, template: usize) -> bool {
        let CommandKind::Block(open) = self.commands[top.0].kind else {
            return false;
        };
        let pattern = &self.vocabulary.cblocks[template].pattern;
        self.vocabulary.cblocks[open].chains.iter().any(|c| c == pattern)
    }

    fn append(&mut self, hat: HatId, parent: Option<CommandId>, id: CommandId) {
        match parent {
            Some(block) => self.commands[block.0].body.push(id),
            None => self.hats[hat.0].body.push(id),
        }
    }

    // -----------------------------------------------------------------------
    // Values
    // -----------------------------------------------------------------------

    fn compile_input(&mut self, input: &Input, command: Option<CommandId>) -> CompileResult<Value> {
        match input.kind {
            BracketKind::Text => self.compile_text(&input.text, &input.range, command),
            BracketKind::Object => self.compile_object(&input.text, &input.range, command),
            BracketKind::Statement => Ok(Value::Statement {
                text: input.text.clone(),
                range: input.range.clone(),
            }),
        }
    }

    /// Text with `#identifier#` spans compiled as object inputs.
    fn compile_text(
        &mut self,
        text: &str,
        range: &SourceRange,
        command: Option<CommandId>,
    ) -> CompileResult<Value> {
        let chars: Vec<char> = text.chars().collect();
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut i = 0;

        while i < chars.len() {
            if chars[i] == '#' {
                let end = chars[i + 1..]
                    .iter()
                    .position(|c| *c == '#' || BREAK_CHARS.contains(c))
                    .map(|p| p + i + 1);
                if let Some(end) = end.filter(|&e| chars[e] == '#' && e > i + 1) {
                    let name: String = chars[i + 1..end].iter().collect();
                    let value = self.compile_object(&name, &range.shifted(i + 1, end - i - 1), command)?;
                    if !literal.is_empty() {
                        parts.push(TextPart::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(TextPart::Interpolated(value));
                    i = end + 1;
                    continue;
                }
            }
            literal.push(chars[i]);
            i += 1;
        }
        if !literal.is_empty() || parts.is_empty() {
            parts.push(TextPart::Literal(literal));
        }

        Ok(Value::Text {
            parts,
            range: range.clone(),
        })
    }

    /// Number, reporter call, expression or variable, tried in that order.
    fn compile_object(
        &mut self,
        text: &str,
        range: &SourceRange,
        command: Option<CommandId>,
    ) -> CompileResult<Value> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CompileError::InvalidValue {
                message: "Empty values are not allowed".to_string(),
                range: range.clone(),
            });
        }
        if NUMBER.is_match(text) {
            let value = text.parse().map_err(|_| CompileError::InvalidValue {
                message: format!("'{}' is not a valid number", text),
                range: range.clone(),
            })?;
            return Ok(Value::Number {
                value,
                range: range.clone(),
            });
        }

        let (core, inputs) = lexer::split_element(text, range)?;
        let core = normalize_core(&core);
        let vocabulary = Arc::clone(&self.vocabulary);
        let kind = vocabulary
            .find_reporter(&core)
            .map(ReporterKind::Native)
            .or_else(|| {
                self.find_definition(DefinitionKind::Reporter, &core)
                    .map(ReporterKind::Invoke)
            });

        if let Some(kind) = kind {
            let id = ReporterId(self.reporters.len());
            self.reporters.push(ReporterNode {
                kind,
                inputs: Vec::new(),
                command,
                range: range.clone(),
            });
            let inputs = inputs
                .iter()
                .map(|input| self.compile_input(input, command))
                .collect::<CompileResult<Vec<_>>>()?;
            self.reporters[id.0].inputs = inputs;
            return Ok(Value::Reporter(id));
        }

        if !inputs.is_empty() || text.contains(OPERATOR_CHARS) || text == "true" || text == "false" {
            return self.compile_expression(text, range, command);
        }

        Ok(Value::Variable {
            name: text.to_string(),
            range: range.clone(),
        })
    }

    /// Record every top-level group of `text` that needs evaluating before
    /// the arithmetic runs.
    fn compile_expression(
        &mut self,
        text: &str,
        range: &SourceRange,
        command: Option<CommandId>,
    ) -> CompileResult<Value> {
        let chars: Vec<char> = text.chars().collect();
        let mut embedded = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            let Some(kind) = BracketKind::from_open(chars[i]) else {
                i += 1;
                continue;
            };
            let close = group_end(&chars, i).ok_or_else(|| CompileError::LineImbalance {
                message: format!("There are more '{}' than '{}' in this value.", kind.open(), kind.close()),
                range: range.shifted(i, 1),
            })?;
            let inner: String = chars[i + 1..close].iter().collect();
            let inner_range = range.shifted(i + 1, close - i - 1);

            match kind {
                BracketKind::Statement => {
                    return Err(CompileError::InvalidValue {
                        message: format!("'{{{}}}' cannot be used in an expression", inner),
                        range: range.shifted(i, close - i + 1),
                    });
                }
                BracketKind::Text => embedded.push(Embedded {
                    span: i..close + 1,
                    value: self.compile_text(&inner, &inner_range, command)?,
                }),
                BracketKind::Object => match self.compile_object(&inner, &inner_range, command)? {
                    Value::Number { .. } => {}
                    Value::Expression {
                        embedded: nested, ..
                    } => {
                        let offset = i + 1 + inner.chars().take_while(|c| c.is_whitespace()).count();
                        embedded.extend(nested.into_iter().map(|e| Embedded {
                            span: e.span.start + offset..e.span.end + offset,
                            value: e.value,
                        }));
                    }
                    value => embedded.push(Embedded {
                        span: i..close + 1,
                        value,
                    }),
                },
            }
            i = close + 1;
        }

        Ok(Value::Expression {
            text: text.to_string(),
            embedded,
            range: range.clone(),
        })
    }
}

fn definition_header(core: &str) -> Option<(DefinitionKind, String)> {
    if let Some(rest) = core.strip_prefix(DEFINE_COMMAND) {
        Some((DefinitionKind::Command, normalize_core(rest)))
    } else if let Some(rest) = core.strip_prefix(DEFINE_REPORTER) {
        Some((DefinitionKind::Reporter, normalize_core(rest)))
    } else {
        None
    }
}

/// Index of the delimiter closing the group opened at `open`.
fn group_end(chars: &[char], open: usize) -> Option<usize> {
    let mut stack: Vec<BracketKind> = Vec::new();
    for (i, &c) in chars.iter().enumerate().skip(open) {
        if stack.last() == Some(&BracketKind::Text) {
            if c == ']' {
                stack.pop();
            }
        } else if let Some(kind) = BracketKind::from_open(c) {
            stack.push(kind);
        } else if BracketKind::from_close(c).is_some() {
            stack.pop();
        }
        if stack.is_empty() {
            return Some(i);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn build(code: &str) -> Result<Program, CompileLog> {
        compile(
            Arc::new(Vocabulary::standard()),
            &[SourceFile::new("main", code)],
        )
    }

    fn first_error(code: &str) -> (&'static str, String) {
        let log = build(code).unwrap_err();
        let d = &log.diagnostics[0];
        (d.kind, d.message.clone())
    }

    #[test]
    fn hello_world_has_one_hat_and_command() {
        let program = build("when started\n\tprint [Hello World]\nend").unwrap();
        assert_eq!(program.hats().len(), 1);
        assert_eq!(program.hat(HatId(0)).pattern, "when started");
        assert_eq!(program.hat(HatId(0)).body, vec![CommandId(0)]);
        assert!(matches!(
            program.command(CommandId(0)).inputs[0],
            Value::Text { .. }
        ));
    }

    #[test]
    fn cblocks_nest_and_record_their_parent() {
        let program = build(
            "when started\n\
             repeat [2]\n\
             repeat [3]\n\
             print [x]\n\
             end\n\
             end\n\
             end",
        )
        .unwrap();
        let outer = program.command(CommandId(0));
        assert_eq!(outer.body, vec![CommandId(1)]);
        assert_eq!(program.command(CommandId(1)).parent, Some(CommandId(0)));
        assert_eq!(program.command(CommandId(2)).parent, Some(CommandId(1)));
    }

    #[test]
    fn else_chains_instead_of_nesting() {
        let program = build(
            "when started\n\
             if [false]\n\
             print [a]\n\
             else if [false]\n\
             print [b]\n\
             else\n\
             print [c]\n\
             end\n\
             end",
        )
        .unwrap();
        let hat = program.hat(HatId(0));
        assert_eq!(hat.body, vec![CommandId(0)]);
        let chain: Vec<_> = program.chain(CommandId(0)).collect();
        assert_eq!(chain, vec![CommandId(0), CommandId(2), CommandId(4)]);
        assert_eq!(program.command(CommandId(4)).body, vec![CommandId(5)]);
        assert_eq!(program.command(CommandId(4)).parent, None);
    }

    #[test]
    fn object_inputs_are_classified() {
        let program = build(
            "when started\n\
             print (5)\n\
             print (x)\n\
             print (length of [abc])\n\
             print ((x) + 1)\n\
             end",
        )
        .unwrap();
        let input = |i: usize| &program.command(CommandId(i)).inputs[0];
        assert!(matches!(input(0), Value::Number { value, .. } if *value == 5.0));
        assert!(matches!(input(1), Value::Variable { name, .. } if name == "x"));
        assert!(matches!(input(2), Value::Reporter(_)));
        match input(3) {
            Value::Expression { text, embedded, .. } => {
                assert_eq!(text, "(x) + 1");
                assert_eq!(embedded.len(), 1);
                assert_eq!(embedded[0].span, 0..3);
            }
            other => panic!("expected an expression, got {:?}", other),
        }
    }

    #[test]
    fn nested_expression_spans_are_hoisted() {
        let program = build("when started\nprint (2 * ( (x) + 1))\nend").unwrap();
        match &program.command(CommandId(0)).inputs[0] {
            Value::Expression { embedded, .. } => {
                assert_eq!(embedded.len(), 1);
                assert_eq!(embedded[0].span, 6..9);
            }
            other => panic!("expected an expression, got {:?}", other),
        }
    }

    #[test]
    fn interpolation_spans() {
        let program = build("when started\nprint [a #x# b #3+2=5#]\nend").unwrap();
        match &program.command(CommandId(0)).inputs[0] {
            Value::Text { parts, .. } => {
                assert_eq!(parts.len(), 3);
                assert!(matches!(&parts[0], TextPart::Literal(s) if s == "a "));
                assert!(matches!(&parts[1], TextPart::Interpolated(Value::Variable { .. })));
                assert!(matches!(&parts[2], TextPart::Literal(s) if s == " b #3+2=5#"));
            }
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn definitions_may_be_called_before_they_appear() {
        let program = build(
            "when started\n\
             greet [Bob]\n\
             end\n\
             define command greet [name]\n\
             print [Hi #name#]\n\
             end",
        )
        .unwrap();
        assert_eq!(program.definitions().len(), 1);
        assert_eq!(program.definitions()[0].params, vec!["name"]);
        assert!(matches!(
            program.command(CommandId(0)).kind,
            CommandKind::Invoke(DefinitionId(0))
        ));
        assert_eq!(program.hats_matching("when started").count(), 1);
    }

    #[test]
    fn structural_errors() {
        assert_eq!(first_error("").0, "empty project");
        assert_eq!(first_error("hello there\nend").0, "invalid code");
        assert_eq!(
            first_error("when started\nfly away\nend"),
            ("invalid code", "'fly away' is not a valid Command".to_string())
        );
        assert_eq!(
            first_error("when started\nprint [x]"),
            ("end imbalance", "There are not enough 'end's!".to_string())
        );
        assert_eq!(
            first_error("when started\nend\nend"),
            (
                "end imbalance",
                "There are more 'end's than Hats or CBlocks!".to_string()
            )
        );
        assert_eq!(first_error("when started\nprint (x\nend").0, "line imbalance");
    }

    #[test]
    fn definition_errors() {
        assert_eq!(
            first_error("define command run for [x]\nend").0,
            "reserved word"
        );
        assert_eq!(
            first_error("define command hi\nend\ndefine command hi\nend").0,
            "duplicate definition"
        );
        assert_eq!(
            first_error("when started\ndefine command hi\nend\nend").0,
            "invalid code"
        );
    }

    #[test]
    fn missing_end_points_at_the_last_line() {
        let log = build("when started\nrepeat [2]\nprint [x]\nend").unwrap_err();
        assert_eq!(log.diagnostics[0].range.as_ref().unwrap().line_start, 4);
    }
}
