//! Tree-walking interpreter with trace notifications.
//!
//! The [`Interpreter`] executes a parsed [`Module`] and reports every frame
//! entry, statement, frame exit and propagating exception to the hook
//! installed in the caller's [`HookSlot`]:
//!
//! - `Call` when a frame is pushed, at the `def` line, with the bound
//!   arguments as locals (the module frame reports line 0).
//! - `Line` before each statement, and again at a loop header each time the
//!   loop condition or iterator is consulted.
//! - `Exception` once per frame an exception passes through, at the line
//!   that was executing in that frame.
//! - `Return` when a frame is popped: the returned value, or `None` when the
//!   frame is being unwound by an exception.
//!
//! Notifications are synchronous; the interpreter does not continue until
//! the hook returns.

pub mod builtins;
pub mod eval;
pub mod prelude;
pub mod state;

use std::rc::Rc;

use indexmap::IndexMap;

use codeflow_core::{HookSlot, TraceEvent};

use crate::ast::{Module, Stmt, StmtKind};
use crate::error::{Raised, TracebackEntry};
use crate::value::{Function, Value};

use self::builtins::Args;
use self::state::{Environment, Flow, Frame, FrameView};

/// Tunables for one interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterConfig {
    /// Maximum number of live frames, the module frame included.
    pub max_recursion_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            max_recursion_depth: 256,
        }
    }
}

/// Runs modules against caller-owned globals and hook slots.
///
/// The interpreter keeps the prelude namespace and the printed output
/// between runs; everything else belongs to the caller.
#[derive(Debug)]
pub struct Interpreter {
    config: InterpreterConfig,
    prelude: Environment,
    output: Vec<String>,
}

impl Interpreter {
    pub fn new(config: InterpreterConfig) -> Self {
        Interpreter {
            config,
            prelude: prelude::load(),
            output: Vec::new(),
        }
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Executes `module` as the source unit `file` with `globals` as its
    /// namespace. Notifications go to whatever hook is installed in `hooks`.
    ///
    /// An exception that escapes the module is returned with the frames it
    /// passed through.
    pub fn execute(
        &mut self,
        module: &Module,
        file: &str,
        globals: &mut Environment,
        hooks: &mut HookSlot<'_>,
    ) -> Result<(), Raised> {
        let mut machine = Machine {
            config: &self.config,
            globals,
            prelude: &self.prelude,
            hooks,
            output: &mut self.output,
            frames: Vec::new(),
        };
        machine.run_module(module, Rc::from(file))
    }

    /// Lines printed so far.
    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new(InterpreterConfig::default())
    }
}

/// Execution state of a single `execute` call.
pub(crate) struct Machine<'a, 'h> {
    config: &'a InterpreterConfig,
    globals: &'a mut Environment,
    prelude: &'a Environment,
    hooks: &'a mut HookSlot<'h>,
    output: &'a mut Vec<String>,
    frames: Vec<Frame>,
}

impl Machine<'_, '_> {
    fn run_module(&mut self, module: &Module, file: Rc<str>) -> Result<(), Raised> {
        self.frames.push(Frame::module(file));
        self.emit(TraceEvent::Call);
        let outcome = self.exec_block(&module.body).map(|_| ());
        self.emit(TraceEvent::Return(&Value::None));
        self.frames.pop();
        outcome
    }

    pub(crate) fn call_function(&mut self, function: &Rc<Function>, args: Args) -> Result<Value, Raised> {
        let def = &function.def;
        check_arity(function, args.len())?;
        if self.frames.len() >= self.config.max_recursion_depth {
            return Err(Raised::new("RecursionError", "maximum recursion depth exceeded"));
        }

        let locals: IndexMap<String, Value> = def.params.iter().cloned().zip(args).collect();
        self.frames.push(Frame::call(function, locals));
        self.emit(TraceEvent::Call);

        let outcome = match self.exec_block(&def.body) {
            Ok(Flow::Return(value)) => Ok(value),
            Ok(_) => Ok(Value::None),
            Err(raised) => Err(raised),
        };
        match &outcome {
            Ok(value) => self.emit(TraceEvent::Return(value)),
            Err(_) => self.emit(TraceEvent::Return(&Value::None)),
        }
        self.frames.pop();
        outcome
    }

    fn exec_block(&mut self, body: &[Stmt]) -> Result<Flow, Raised> {
        for stmt in body {
            match self.exec_stmt(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow, Raised> {
        self.step(stmt.line);
        self.run_stmt(stmt).map_err(|raised| self.note_exception(raised))
    }

    fn run_stmt(&mut self, stmt: &Stmt) -> Result<Flow, Raised> {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.eval(expr)?;
            }
            StmtKind::Assign { target, value } => {
                let value = self.eval(value)?;
                self.assign(target, value)?;
            }
            StmtKind::AugAssign { target, op, value } => {
                self.aug_assign(target, *op, value)?;
            }
            StmtKind::FunctionDef(def) => {
                let frame = self.frame()?;
                let function = Function::new(Rc::clone(def), Rc::clone(&frame.file), frame.scope);
                self.store(&def.name, Value::Function(Rc::new(function)));
            }
            StmtKind::If { test, body, orelse } => {
                return if self.eval(test)?.is_truthy() {
                    self.exec_block(body)
                } else {
                    self.exec_block(orelse)
                };
            }
            StmtKind::While { test, body } => {
                let mut first = true;
                loop {
                    if !first {
                        self.step(stmt.line);
                    }
                    first = false;
                    if !self.eval(test)?.is_truthy() {
                        break;
                    }
                    match self.exec_block(body)? {
                        Flow::Break => break,
                        Flow::Normal | Flow::Continue => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
            }
            StmtKind::For { target, iter, body } => {
                let iterable = self.eval(iter)?;
                let mut index = 0;
                loop {
                    if index > 0 {
                        self.step(stmt.line);
                    }
                    let Some(item) = self.nth_item(&iterable, index)? else {
                        break;
                    };
                    index += 1;
                    self.store(target, item);
                    match self.exec_block(body)? {
                        Flow::Break => break,
                        Flow::Normal | Flow::Continue => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::None,
                };
                return Ok(Flow::Return(value));
            }
            StmtKind::Raise(value) => {
                let raised = match value {
                    None => Raised::new("RuntimeError", "No active exception to reraise"),
                    Some(expr) => match self.eval(expr)? {
                        Value::Exception(info) => Raised::from_info((*info).clone()),
                        Value::ExceptionType(name) => Raised::new(name, ""),
                        _ => Raised::type_error("exceptions must derive from BaseException"),
                    },
                };
                return Err(raised);
            }
            StmtKind::Pass => {}
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
        }
        Ok(Flow::Normal)
    }

    /// Moves the current frame to `line` and reports it.
    fn step(&mut self, line: u32) {
        if let Some(frame) = self.frames.last_mut() {
            frame.line = line;
        }
        self.emit(TraceEvent::Line);
    }

    /// Reports `raised` in the current frame unless that already happened.
    fn note_exception(&mut self, mut raised: Raised) -> Raised {
        let depth = self.frames.len();
        if raised.reported_depth == depth {
            return raised;
        }
        raised.reported_depth = depth;
        if let Some(frame) = self.frames.last() {
            raised.traceback.push(TracebackEntry {
                function: frame.function.to_string(),
                file: frame.file.to_string(),
                line: frame.line,
            });
        }
        self.emit(TraceEvent::Exception(&raised.info));
        raised
    }

    fn emit(&mut self, event: TraceEvent<'_>) {
        if !self.hooks.is_installed() {
            return;
        }
        let Some(frame) = self.frames.last() else {
            return;
        };
        let view = FrameView {
            frame,
            globals: &*self.globals,
        };
        self.hooks.emit(&view, event);
    }

    fn frame(&self) -> Result<&Frame, Raised> {
        self.frames
            .last()
            .ok_or_else(|| Raised::new("RuntimeError", "no active frame"))
    }

    /// Binds `name` in the current frame.
    fn store(&mut self, name: &str, value: Value) {
        match self.frames.last_mut().and_then(|f| f.locals.as_mut()) {
            Some(locals) => {
                if let Some(slot) = locals.get_mut(name) {
                    *slot = value;
                } else {
                    locals.insert(name.to_string(), value);
                }
            }
            None => self.globals.set(name, value),
        }
    }
}

fn check_arity(function: &Function, given: usize) -> Result<(), Raised> {
    let params = &function.def.params;
    let name = &function.name;
    if given > params.len() {
        let expected = params.len();
        let plural = if expected == 1 { "" } else { "s" };
        let were = if given == 1 { "was" } else { "were" };
        return Err(Raised::type_error(format!(
            "{name}() takes {expected} positional argument{plural} but {given} {were} given"
        )));
    }
    if given < params.len() {
        let missing: Vec<String> = params[given..].iter().map(|p| format!("'{p}'")).collect();
        let plural = if missing.len() == 1 { "" } else { "s" };
        return Err(Raised::type_error(format!(
            "{name}() missing {} required positional argument{plural}: {}",
            missing.len(),
            missing.join(" and ")
        )));
    }
    Ok(())
}
