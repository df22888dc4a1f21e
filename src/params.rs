use std::cell::RefCell;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use crate::error::{Result, RuntimeError, SourceRange};
use crate::interpreter::{Script, Signal};
use crate::object::{CustomObject, Object};
use crate::program::{CommandId, HatId, ReporterId, Value};

#[derive(Debug, Clone, Copy)]
enum Element {
    Command(CommandId),
    Reporter(ReporterId),
}

/// What a native command or reporter gets to work with: its inputs, the
/// running script and the node it was called for.
///
/// Inputs are evaluated on access, so a reporter input runs every time it is
/// read.
pub struct Params<'a> {
    script: &'a mut Script,
    element: Element,
    signal: Signal,
}

impl<'a> Params<'a> {
    pub(crate) fn command(script: &'a mut Script, id: CommandId) -> Self {
        Self {
            script,
            element: Element::Command(id),
            signal: Signal::Continue,
        }
    }

    pub(crate) fn reporter(script: &'a mut Script, id: ReporterId) -> Self {
        Self {
            script,
            element: Element::Reporter(id),
            signal: Signal::Continue,
        }
    }

    pub(crate) fn into_signal(self) -> Signal {
        self.signal
    }

    fn input(&self, index: usize) -> Result<Value> {
        let program = self.script.program();
        let inputs = match self.element {
            Element::Command(id) => &program.command(id).inputs,
            Element::Reporter(id) => &program.reporter(id).inputs,
        };
        inputs.get(index).cloned().ok_or_else(|| {
            self.err(format!(
                "Input {} does not exist, only {} were given",
                index + 1,
                inputs.len()
            ))
        })
    }

    /// Number of inputs, variadic ones included.
    pub fn len(&self) -> usize {
        let program = self.script.program();
        match self.element {
            Element::Command(id) => program.command(id).inputs.len(),
            Element::Reporter(id) => program.reporter(id).inputs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -----------------------------------------------------------------------
    // Typed accessors
    // -----------------------------------------------------------------------

    pub fn get(&mut self, index: usize) -> Result<Object> {
        let value = self.input(index)?;
        self.script.evaluate(&value)
    }

    /// Every input from `from` on, evaluated in order.
    pub fn rest(&mut self, from: usize) -> Result<Vec<Object>> {
        (from..self.len()).map(|i| self.get(i)).collect()
    }

    pub fn num(&mut self, index: usize) -> Result<f64> {
        let value = self.get(index)?;
        value
            .as_number()
            .ok_or_else(|| self.err(format!("'{}' is not a number", value)))
    }

    /// A number with no fractional part.
    pub fn int(&mut self, index: usize) -> Result<i64> {
        let n = self.num(index)?;
        if n.fract() != 0.0 {
            return Err(self.err(format!("'{}' is not a whole number", n)));
        }
        Ok(n as i64)
    }

    pub fn str(&mut self, index: usize) -> Result<String> {
        Ok(self.get(index)?.to_string())
    }

    pub fn bool(&mut self, index: usize) -> Result<bool> {
        let value = self.get(index)?;
        value
            .as_bool()
            .ok_or_else(|| self.err(format!("'{}' is not a boolean", value)))
    }

    pub fn list(&mut self, index: usize) -> Result<Rc<RefCell<Vec<Object>>>> {
        match self.get(index)? {
            Object::List(items) => Ok(items),
            other => Err(self.err(format!("'{}' is not a list", other))),
        }
    }

    pub fn custom(&mut self, index: usize) -> Result<Rc<RefCell<CustomObject>>> {
        match self.get(index)? {
            Object::Custom(obj) => Ok(obj),
            other => Err(self.err(format!("'{}' is not a custom object", other))),
        }
    }

    // -----------------------------------------------------------------------
    // Context
    // -----------------------------------------------------------------------

    pub fn range(&self) -> SourceRange {
        let program = self.script.program();
        match self.element {
            Element::Command(id) => program.command(id).range.clone(),
            Element::Reporter(id) => program.reporter(id).range.clone(),
        }
    }

    /// A run-time error attributed to this element.
    pub fn err(&self, message: impl Into<String>) -> RuntimeError {
        RuntimeError::new(message, &self.range())
    }

    /// The hat this element belongs to.
    pub fn hat(&self) -> Option<HatId> {
        let program = self.script.program();
        match self.element {
            Element::Command(id) => Some(program.command(id).hat),
            Element::Reporter(id) => program
                .reporter(id)
                .command
                .map(|c| program.command(c).hat)
                .or_else(|| self.script.current_hat()),
        }
    }

    /// The innermost c-block enclosing this element.
    pub fn cblock(&self) -> Option<CommandId> {
        let program = self.script.program();
        let command = match self.element {
            Element::Command(id) => id,
            Element::Reporter(id) => program.reporter(id).command?,
        };
        program.command(command).parent
    }

    pub fn script(&mut self) -> &mut Script {
        &mut *self.script
    }

    // -----------------------------------------------------------------------
    // Control
    // -----------------------------------------------------------------------

    /// Stop the innermost enclosing c-block once this command returns.
    pub fn stop_loop(&mut self) -> Result<()> {
        if self.cblock().is_none() {
            return Err(self.err("'stop loop' must be used inside a c-block"));
        }
        self.signal = Signal::StopLoop;
        Ok(())
    }

    /// Stop every enclosing c-block and the hat, handing `value` to whoever
    /// invoked the hat.
    pub fn hat_return(&mut self, value: Option<Object>) {
        self.signal = Signal::Return(value);
    }

    pub fn print(&mut self, line: impl Into<String>) {
        self.script.print(line.into());
    }

    // -----------------------------------------------------------------------
    // Variables
    // -----------------------------------------------------------------------

    pub fn variable(&self, name: &str) -> Option<Object> {
        self.script.lookup(name)
    }

    pub fn set_variable(&mut self, name: &str, value: Object) {
        self.script.set_variable(name, value);
    }

    pub fn set_global(&mut self, name: &str, value: Object) {
        self.script.set_global(name, value);
    }

    /// Create or update `name` in the innermost running c-block, or the hat
    /// when no c-block is running.
    pub fn set_local(&mut self, name: &str, value: Object) {
        self.script.set_local(name, value);
    }
}

/// [`Params`] for a c-block, plus the means to run its body and chain.
pub struct BlockParams<'a> {
    inner: Params<'a>,
    id: CommandId,
}

impl<'a> BlockParams<'a> {
    pub(crate) fn new(script: &'a mut Script, id: CommandId) -> Self {
        Self {
            inner: Params::command(script, id),
            id,
        }
    }

    pub(crate) fn into_signal(self) -> Signal {
        self.inner.into_signal()
    }

    /// Run the body once. Returns `false` once the block was asked to stop,
    /// by `stop loop` or a return.
    pub fn run_body(&mut self) -> Result<bool> {
        if self.should_stop() {
            return Ok(false);
        }
        let program = self.inner.script.program_rc();
        let body = &program.command(self.id).body;
        match self.inner.script.run_sequence(body)? {
            Signal::Continue => Ok(true),
            signal => {
                self.inner.signal = signal;
                Ok(false)
            }
        }
    }

    /// Hand control to the chained alternative. Returns `false` when there
    /// is none.
    pub fn run_chain(&mut self) -> Result<bool> {
        if self.should_stop() {
            return Ok(false);
        }
        let Some(chain) = self.inner.script.program().command(self.id).chain else {
            return Ok(false);
        };
        if let Signal::Return(value) = self.inner.script.run_command(chain)? {
            self.inner.signal = Signal::Return(value);
        }
        Ok(true)
    }

    pub fn should_stop(&self) -> bool {
        !matches!(self.inner.signal, Signal::Continue)
    }
}

impl<'a> Deref for BlockParams<'a> {
    type Target = Params<'a>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<'a> DerefMut for BlockParams<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
