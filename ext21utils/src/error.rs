//!
//! # Error-Helper Utilities
//!
//! The [ErrorHelper] trait factors out the error-construction boilerplate
//! shared by the workspace's many stateful tree-walkers
//! (extraction passes, writers, technology compilers).
//! Each implementer provides a single `err` method which folds in
//! whatever internal state it wants reported upon failure;
//! the provided `fail`, `unwrap`, and `assert` methods build on it.
//!
//! ```rust
//! use ext21utils::error::{ErrorHelper, Unwrapper};
//!
//! /// Example implementer, reporting which cell it was working on.
//! struct CellWalker {
//!     cellname: String,
//! }
//! impl ErrorHelper for CellWalker {
//!     type Error = String;
//!     fn err(&self, msg: impl Into<String>) -> Self::Error {
//!         format!("In cell {}: {}", self.cellname, msg.into())
//!     }
//! }
//! impl CellWalker {
//!     fn walk(&self) -> Result<(), String> {
//!         // Unwrap an [`Option`]
//!         Some(5).unwrapper(self, "no such tile")?;
//!         // And check an invariant
//!         self.assert(1 + 1 == 2, "arithmetic failed")
//!     }
//! }
//! ```
//!

///
/// # ErrorHelper
///
/// Failure-constructor trait for stateful walkers.
/// Implementers provide `err`; everything else is default-implemented atop it.
///
pub trait ErrorHelper {
    type Error;

    /// Create and return a [Self::Error] value.
    fn err(&self, msg: impl Into<String>) -> Self::Error;
    /// Return failure
    fn fail<T>(&self, msg: impl Into<String>) -> Result<T, Self::Error> {
        Err(self.err(msg))
    }
    /// Unwrap the [Option] `opt` if it is [Some], and return our error if not.
    fn unwrap<T>(&self, opt: Option<T>, msg: impl Into<String>) -> Result<T, Self::Error> {
        match opt {
            Some(val) => Ok(val),
            None => self.fail(msg),
        }
    }
    /// Assert boolean condition `b`. Returns through `self.fail` if not satisfied.
    fn assert(&self, b: bool, msg: impl Into<String>) -> Result<(), Self::Error> {
        match b {
            true => Ok(()),
            false => self.fail(msg),
        }
    }
}

///
/// # Unwrapper
///
/// Post-fix companion to [ErrorHelper], for the especially common cases of
/// unwrapping [`Option`]s and [`Result`]s mid-expression.
/// Generally imported for use on the standard-library types,
/// not implemented anew:
///
/// ```rust
/// use ext21utils::error::{ErrorHelper, Unwrapper};
///
/// fn example(h: &impl ErrorHelper<Error = String>) -> Result<(), String> {
///     Some(5).unwrapper(h, "Option failed")?;
///     let r: Result<(), String> = Ok(());
///     r.unwrapper(h, "Result failed")
/// }
/// ```
///
pub trait Unwrapper {
    type Ok;
    fn unwrapper<H>(self, helper: &H, msg: impl Into<String>) -> Result<Self::Ok, H::Error>
    where
        H: ErrorHelper;
}

/// # Unwrapper for [`Option`]
///
/// Like [`Option::unwrap`], but routing failures to the paired [`ErrorHelper`]
/// rather than panicking.
impl<T> Unwrapper for Option<T> {
    type Ok = T;
    fn unwrapper<H>(self, helper: &H, msg: impl Into<String>) -> Result<Self::Ok, H::Error>
    where
        H: ErrorHelper,
    {
        match self {
            Some(t) => Ok(t),
            None => helper.fail(msg),
        }
    }
}

/// # Unwrapper for [`Result`]
///
/// Like [`Result::unwrap`], but routing failures to the paired [`ErrorHelper`]
/// rather than panicking. The incoming error value is dropped.
impl<T, E> Unwrapper for Result<T, E> {
    type Ok = T;
    fn unwrapper<H>(
        self,
        helper: &H,
        msg: impl Into<String>,
    ) -> Result<<Self as Unwrapper>::Ok, H::Error>
    where
        H: ErrorHelper,
    {
        match self {
            Ok(t) => Ok(t),
            Err(_) => helper.fail(msg),
        }
    }
}
