//!
//! # Extraction Result, Error, and Diagnostic Types
//!
//! Two tiers of trouble, matching the engine's never-abort philosophy:
//!
//! * [ExtError] is *fatal to one cell*: an unreadable definition or an
//!   unwritable output file. The driver counts it and moves on to siblings.
//! * [ExtWarning] is recoverable: questionable geometry for which extraction
//!   proceeds with a best-effort value. Warnings never unwind the stack;
//!   they accumulate on the [ExtContext] and surface in the final summary.
//!

// Std-Lib
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// Local Imports
use crate::geom::Rect;
pub use ext21utils::{ErrorHelper, Unwrapper};

/// # [ExtError] Result Type
pub type ExtResult<T> = Result<T, ExtError>;

///
/// # Extraction Error Enumeration
///
pub enum ExtError {
    /// Error compiling or resolving a technology style
    Tech {
        message: String,
        stack: Vec<ErrorContext>,
    },
    /// Error extracting a cell definition
    Cell {
        message: String,
        stack: Vec<ErrorContext>,
    },
    /// Boxed External Errors
    Boxed(Box<dyn std::error::Error + Send + Sync>),
    /// Uncategorized Error, with String Message
    Str(String),
    /// # [Ptr] Locking
    /// Caused by trouble with a shared pointer: either deadlock, or panic while holding a lock.
    /// Generally caused by a [std::sync::PoisonError], which is not forwardable due to lifetime constraints.
    PtrLock,
}
impl ExtError {
    /// Create an [ExtError] from anything String-convertible
    pub fn msg(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }
    /// Create an error-variant [Result] from anything String-convertible
    pub fn fail<T>(s: impl Into<String>) -> Result<T, Self> {
        Err(Self::msg(s))
    }
}
impl std::fmt::Debug for ExtError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ExtError::Tech { message, stack } => {
                write!(f, "Technology Error: \n - {} \n - {:?}", message, stack)
            }
            ExtError::Cell { message, stack } => {
                write!(f, "Cell Extraction Error: \n - {} \n - {:?}", message, stack)
            }
            ExtError::Boxed(err) => err.fmt(f),
            ExtError::Str(err) => err.fmt(f),
            ExtError::PtrLock => write!(f, "[std::sync::PoisonError]"),
        }
    }
}
impl std::fmt::Display for ExtError {
    /// Display an [ExtError]. Delegates to the [std::fmt::Debug] implementation.
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}
impl std::error::Error for ExtError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Boxed(e) => Some(&**e),
            _ => None,
        }
    }
}
impl From<String> for ExtError {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}
impl From<&str> for ExtError {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}
impl From<std::io::Error> for ExtError {
    fn from(e: std::io::Error) -> Self {
        Self::Boxed(Box::new(e))
    }
}
impl From<ext21utils::ser::Error> for ExtError {
    fn from(e: ext21utils::ser::Error) -> Self {
        Self::Boxed(Box::new(e))
    }
}
impl<T> From<std::sync::PoisonError<T>> for ExtError {
    fn from(_e: std::sync::PoisonError<T>) -> Self {
        Self::PtrLock
    }
}

/// Enumerated extraction contexts
/// Generally used for error reporting
#[derive(Debug, Clone)]
pub enum ErrorContext {
    Library(String),
    Def(String),
    Use(String),
    Node(String),
    Device(String),
    Plane(usize),
    Geometry,
    Unknown,
}

/// Enumerated warning kinds, one per recoverable-geometry condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarnKind {
    /// The same name-label attached to electrically-distinct nodes
    DuplicateLabel,
    /// A device missing one or more declared terminals, repaired by cloning
    MissingTerminal,
    /// Two different substrate regions found under one device
    SplitSubstrate,
    /// A resistor or capacitor with an unexpected terminal count
    TerminalCount,
    /// A non-rectangular device whose channel length varies along its boundary
    MultipleLengths,
}

/// # Extraction Warning
///
/// A recoverable diagnostic: the kind of trouble, a human-readable message,
/// and optionally the offending location for visual feedback.
#[derive(Debug, Clone)]
pub struct ExtWarning {
    pub kind: WarnKind,
    pub message: String,
    pub loc: Option<Rect>,
}

/// # Extraction Statistics
///
/// Counters accumulated across an extraction run and surfaced in its summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtStats {
    /// Cells which could not be extracted at all
    pub fatals: usize,
    /// Recoverable-geometry warnings
    pub warnings: usize,
    /// Cells extracted
    pub cells: usize,
    /// Cells skipped as up-to-date (incremental mode)
    pub skipped: usize,
    /// Nodes written
    pub nodes: usize,
    /// Devices written
    pub devices: usize,
}
impl ExtStats {
    /// One-line human-readable run summary
    pub fn summary(&self) -> String {
        format!("{} fatal errors, {} warnings", self.fatals, self.warnings)
    }
}

/// # Extraction Context
///
/// The mutable state threaded through every pass:
/// the warning sink, run statistics, and the cooperative-interrupt flag.
/// Passes poll [ExtContext::interrupted] at their natural checkpoints
/// (per node, per device, per cell) and return early with valid partial
/// results when it is raised; nothing is torn down abnormally.
///
#[derive(Debug, Default)]
pub struct ExtContext {
    pub warnings: Vec<ExtWarning>,
    pub stats: ExtStats,
    interrupt: Arc<AtomicBool>,
}
impl ExtContext {
    /// Create a new, empty context
    pub fn new() -> Self {
        Self::default()
    }
    /// Record warning `kind` at (optional) location `loc`
    pub fn warn(&mut self, kind: WarnKind, loc: Option<Rect>, msg: impl Into<String>) {
        let message = msg.into();
        log::warn!("{}", message);
        self.stats.warnings += 1;
        self.warnings.push(ExtWarning { kind, message, loc });
    }
    /// Record a fatal-to-one-cell failure
    pub fn fatal(&mut self, err: &ExtError) {
        log::error!("{}", err);
        self.stats.fatals += 1;
    }
    /// Get a cloneable handle to the interrupt flag,
    /// for delivery from signal handlers or UI threads.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupt.clone()
    }
    /// Poll the cooperative-interrupt flag
    pub fn interrupted(&self) -> bool {
        self.interrupt.load(Ordering::Relaxed)
    }
}
