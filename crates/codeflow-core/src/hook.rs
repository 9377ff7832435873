//! The contract between an instrumented runtime and a trace consumer.
//!
//! A runtime owns one [`HookSlot`] and reports every call, line step, return
//! and exception through [`HookSlot::emit`], synchronously and in the order
//! the occurrences happen. A consumer implements [`TraceHook`] and is
//! installed for a bounded scope with [`HookSlot::install`]; the returned
//! [`HookGuard`] empties the slot again when it goes out of scope, whether
//! execution finished normally, failed, or unwound.
//!
//! The slot belongs to a runtime instance rather than the process, so two
//! runtimes never observe each other's hooks.

use std::fmt;
use std::ops::{Deref, DerefMut};

/// Read-only view of the frame an occurrence belongs to.
pub trait TraceFrame {
    fn function_name(&self) -> &str;

    /// Identity of the source unit the function was defined in.
    fn source_file(&self) -> &str;

    fn line_number(&self) -> u32;

    /// Calls `visit` once per local binding of the frame.
    fn visit_locals(&self, visit: &mut dyn FnMut(&str, &dyn fmt::Display));
}

/// Structured description of an exception, built once where the failure is
/// first observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionInfo {
    pub type_name: String,
    pub message: String,
}

impl ExceptionInfo {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        ExceptionInfo {
            type_name: type_name.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ExceptionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            f.write_str(&self.type_name)
        } else {
            write!(f, "{}: {}", self.type_name, self.message)
        }
    }
}

/// One notification from the runtime.
#[derive(Clone, Copy)]
pub enum TraceEvent<'a> {
    /// A frame was entered; its locals are the bound arguments.
    Call,
    /// A line is about to execute.
    Line,
    /// The frame is exiting with this value.
    Return(&'a dyn fmt::Display),
    /// An exception is passing through the frame.
    Exception(&'a ExceptionInfo),
}

impl fmt::Debug for TraceEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceEvent::Call => f.write_str("Call"),
            TraceEvent::Line => f.write_str("Line"),
            TraceEvent::Return(value) => write!(f, "Return({value})"),
            TraceEvent::Exception(info) => write!(f, "Exception({info})"),
        }
    }
}

/// A consumer of runtime notifications.
///
/// Implementations must not fail and should return quickly; the runtime is
/// blocked until `on_event` returns.
pub trait TraceHook {
    fn on_event(&mut self, frame: &dyn TraceFrame, event: TraceEvent<'_>);
}

/// The single active-callback slot of a runtime.
#[derive(Default)]
pub struct HookSlot<'h> {
    active: Option<&'h mut dyn TraceHook>,
}

impl<'h> HookSlot<'h> {
    pub fn new() -> Self {
        HookSlot { active: None }
    }

    /// Installs `hook` until the returned guard is dropped.
    ///
    /// Any previously installed hook is replaced.
    pub fn install<'s>(&'s mut self, hook: &'h mut dyn TraceHook) -> HookGuard<'s, 'h> {
        self.active = Some(hook);
        HookGuard { slot: self }
    }

    pub fn is_installed(&self) -> bool {
        self.active.is_some()
    }

    /// Forwards one notification to the installed hook, if any.
    pub fn emit(&mut self, frame: &dyn TraceFrame, event: TraceEvent<'_>) {
        if let Some(hook) = self.active.as_deref_mut() {
            hook.on_event(frame, event);
        }
    }

    fn uninstall(&mut self) {
        self.active = None;
    }
}

/// Scope of one hook installation. Dereferences to the slot so the runtime
/// can be driven through it.
pub struct HookGuard<'s, 'h> {
    slot: &'s mut HookSlot<'h>,
}

impl<'h> Deref for HookGuard<'_, 'h> {
    type Target = HookSlot<'h>;

    fn deref(&self) -> &Self::Target {
        self.slot
    }
}

impl<'h> DerefMut for HookGuard<'_, 'h> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.slot
    }
}

impl Drop for HookGuard<'_, '_> {
    fn drop(&mut self) {
        self.slot.uninstall();
    }
}
