use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Result, RuntimeError};
use crate::expression;
use crate::object::Object;
use crate::pattern::normalize_core;
use crate::params::{BlockParams, Params};
use crate::program::{
    CommandId, CommandKind, Embedded, HatId, Program, ReporterId, ReporterKind, TextPart, Value,
};

/// Hat pattern run by [`Script::start`].
pub const DEFAULT_HAT: &str = "when started";

/// Default for [`ScriptOptions::max_call_depth`]. Every level of user-defined
/// calls costs several native stack frames; this fits a 1 MiB stack.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 64;

/// How control leaves a command sequence.
#[derive(Debug, Clone)]
pub enum Signal {
    Continue,
    /// Stop the innermost enclosing c-block.
    StopLoop,
    /// Stop every enclosing c-block and the hat, optionally with a result.
    Return(Option<Object>),
}

#[derive(Debug, Clone)]
pub struct ScriptOptions {
    /// Also write printed lines to stdout (native targets only).
    pub echo: bool,
    /// Maximum nesting of hat invocations, user-defined calls included.
    pub max_call_depth: usize,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            echo: false,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

/// Variables of one running hat invocation.
struct Frame {
    hat: HatId,
    locals: HashMap<String, Object>,
    /// Scopes of the c-blocks currently running, outermost first.
    blocks: Vec<HashMap<String, Object>>,
}

/// A compiled program together with its run-time state: the global
/// variables, the stack of running hats and the output log.
pub struct Script {
    program: Rc<Program>,
    options: ScriptOptions,
    globals: HashMap<String, Object>,
    frames: Vec<Frame>,
    output: Vec<String>,
}

impl Script {
    pub fn new(program: Program) -> Self {
        Self::with_options(program, ScriptOptions::default())
    }

    pub fn with_options(program: Program, options: ScriptOptions) -> Self {
        Self {
            program: Rc::new(program),
            options,
            globals: HashMap::new(),
            frames: Vec::new(),
            output: Vec::new(),
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Every line printed so far.
    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// The output joined with newlines.
    pub fn output_log(&self) -> String {
        self.output.join("\n")
    }

    pub fn global(&self, name: &str) -> Option<&Object> {
        self.globals.get(name)
    }

    // -----------------------------------------------------------------------
    // Entry points
    // -----------------------------------------------------------------------

    /// Run every `when started` hat.
    pub fn start(&mut self) -> Vec<RuntimeError> {
        self.start_hat(DEFAULT_HAT)
    }

    pub fn start_hat(&mut self, pattern: &str) -> Vec<RuntimeError> {
        self.start_with(pattern, &[])
    }

    /// Run every hat registered under `pattern`, binding `args` to the hat
    /// parameters. A failing hat does not prevent the others from running;
    /// the errors are returned in hat order.
    pub fn start_with(&mut self, pattern: &str, args: &[Object]) -> Vec<RuntimeError> {
        let program = Rc::clone(&self.program);
        let pattern = normalize_core(pattern);
        let mut errors = Vec::new();
        for hat in program.hats_matching(&pattern) {
            if let Err(e) = self.run_hat(hat, args.to_vec()) {
                warn!(hat = %pattern, error = %e, "hat aborted");
                errors.push(e);
            }
        }
        errors
    }

    /// Run one hat to completion and return the value it returned, if any.
    pub fn run_hat(&mut self, hat: HatId, args: Vec<Object>) -> Result<Option<Object>> {
        let program = Rc::clone(&self.program);
        let node = program.hat(hat);

        if self.frames.len() >= self.options.max_call_depth {
            return Err(RuntimeError::new(
                format!(
                    "Maximum call depth of {} exceeded in '{}'",
                    self.options.max_call_depth, node.pattern
                ),
                &node.range,
            ));
        }

        let locals = node.params.iter().cloned().zip(args).collect();
        debug!(hat = %node.pattern, depth = self.frames.len(), "hat started");
        self.frames.push(Frame {
            hat,
            locals,
            blocks: Vec::new(),
        });
        let result = self.run_sequence(&node.body);
        self.frames.pop();
        debug!(hat = %node.pattern, ok = result.is_ok(), "hat finished");

        match result? {
            Signal::Return(value) => Ok(value),
            Signal::Continue | Signal::StopLoop => Ok(None),
        }
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    pub(crate) fn run_sequence(&mut self, commands: &[CommandId]) -> Result<Signal> {
        for &command in commands {
            match self.run_command(command)? {
                Signal::Continue => {}
                signal => return Ok(signal),
            }
        }
        Ok(Signal::Continue)
    }

    pub(crate) fn run_command(&mut self, id: CommandId) -> Result<Signal> {
        let program = Rc::clone(&self.program);
        let node = program.command(id);

        match node.kind {
            CommandKind::Native(index) => {
                let behavior = Arc::clone(&program.vocabulary.commands[index].behavior);
                let mut params = Params::command(self, id);
                behavior.run(&mut params)?;
                Ok(params.into_signal())
            }
            CommandKind::Block(index) => {
                let behavior = Arc::clone(&program.vocabulary.cblocks[index].behavior);
                self.enter_block();
                let mut params = BlockParams::new(self, id);
                let result = behavior.run(&mut params);
                let signal = params.into_signal();
                self.leave_block();
                result?;
                // A stop-loop request ends here: this is the innermost block.
                Ok(match signal {
                    Signal::Return(value) => Signal::Return(value),
                    Signal::Continue | Signal::StopLoop => Signal::Continue,
                })
            }
            CommandKind::Invoke(definition) => {
                let args = self.evaluate_all(&node.inputs)?;
                let hat = program.definition(definition).hat;
                self.run_hat(hat, args)?;
                Ok(Signal::Continue)
            }
        }
    }

    pub(crate) fn run_reporter(&mut self, id: ReporterId) -> Result<Object> {
        let program = Rc::clone(&self.program);
        let node = program.reporter(id);

        match node.kind {
            ReporterKind::Native(index) => {
                let behavior = Arc::clone(&program.vocabulary.reporters[index].behavior);
                let mut params = Params::reporter(self, id);
                behavior.report(&mut params)
            }
            ReporterKind::Invoke(definition) => {
                let args = self.evaluate_all(&node.inputs)?;
                let definition = program.definition(definition);
                self.run_hat(definition.hat, args)?.ok_or_else(|| {
                    RuntimeError::new(
                        format!("'{}' finished without returning a value", definition.pattern),
                        &node.range,
                    )
                })
            }
        }
    }

    fn enter_block(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.blocks.push(HashMap::new());
        }
    }

    fn leave_block(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.blocks.pop();
        }
    }

    // -----------------------------------------------------------------------
    // Values
    // -----------------------------------------------------------------------

    pub(crate) fn evaluate_all(&mut self, values: &[Value]) -> Result<Vec<Object>> {
        values.iter().map(|v| self.evaluate(v)).collect()
    }

    pub(crate) fn evaluate(&mut self, value: &Value) -> Result<Object> {
        match value {
            Value::Text { parts, .. } => {
                let mut text = String::new();
                for part in parts {
                    match part {
                        TextPart::Literal(s) => text.push_str(s),
                        TextPart::Interpolated(v) => text.push_str(&self.evaluate(v)?.to_string()),
                    }
                }
                Ok(Object::Text(text))
            }
            Value::Number { value, .. } => Ok(Object::Number(*value)),
            Value::Variable { name, range } => self.lookup(name).ok_or_else(|| {
                RuntimeError::new(format!("Variable '{}' could not be found!", name), range)
            }),
            Value::Reporter(id) => self.run_reporter(*id),
            Value::Expression {
                text,
                embedded,
                range,
            } => {
                let (text, values) = self.substitute(text, embedded)?;
                expression::evaluate(&text, &values, &|name: &str| self.lookup(name), range)
            }
            Value::Statement { text, range } => Err(RuntimeError::new(
                format!("'{{{}}}' is a statement and cannot be used as a value", text),
                range,
            )),
        }
    }

    /// Evaluate every embedded value and replace its span with a slot.
    fn substitute(&mut self, text: &str, embedded: &[Embedded]) -> Result<(String, Vec<Object>)> {
        let values = embedded
            .iter()
            .map(|e| self.evaluate(&e.value))
            .collect::<Result<Vec<_>>>()?;

        let mut chars: Vec<char> = text.chars().collect();
        for (i, e) in embedded.iter().enumerate().rev() {
            chars.splice(e.span.clone(), expression::slot(i).chars());
        }
        Ok((chars.into_iter().collect(), values))
    }

    // -----------------------------------------------------------------------
    // Variables
    // -----------------------------------------------------------------------

    /// Innermost c-block outward, then the hat, then the globals.
    pub fn lookup(&self, name: &str) -> Option<Object> {
        if let Some(frame) = self.frames.last() {
            for scope in frame.blocks.iter().rev() {
                if let Some(v) = scope.get(name) {
                    return Some(v.clone());
                }
            }
            if let Some(v) = frame.locals.get(name) {
                return Some(v.clone());
            }
        }
        self.globals.get(name).cloned()
    }

    /// Update the variable where [`lookup`](Self::lookup) finds it, or create
    /// it hat-local.
    pub(crate) fn set_variable(&mut self, name: &str, value: Object) {
        let Some(frame) = self.frames.last_mut() else {
            self.globals.insert(name.to_string(), value);
            return;
        };
        for scope in frame.blocks.iter_mut().rev() {
            if let Some(slot) = scope.get_mut(name) {
                *slot = value;
                return;
            }
        }
        if let Some(slot) = frame.locals.get_mut(name) {
            *slot = value;
            return;
        }
        if let Some(slot) = self.globals.get_mut(name) {
            *slot = value;
            return;
        }
        frame.locals.insert(name.to_string(), value);
    }

    pub(crate) fn set_global(&mut self, name: &str, value: Object) {
        self.globals.insert(name.to_string(), value);
    }

    /// Create or update `name` in the innermost running c-block of the
    /// current hat, or in the hat itself.
    pub(crate) fn set_local(&mut self, name: &str, value: Object) {
        let Some(frame) = self.frames.last_mut() else {
            self.globals.insert(name.to_string(), value);
            return;
        };
        match frame.blocks.last_mut() {
            Some(scope) => scope.insert(name.to_string(), value),
            None => frame.locals.insert(name.to_string(), value),
        };
    }

    pub(crate) fn current_hat(&self) -> Option<HatId> {
        self.frames.last().map(|f| f.hat)
    }

    pub(crate) fn print(&mut self, line: String) {
        #[cfg(not(target_arch = "wasm32"))]
        if self.options.echo {
            println!("{}", line);
        }
        self.output.push(line);
    }

    pub(crate) fn program_rc(&self) -> Rc<Program> {
        Rc::clone(&self.program)
    }
}
