//! Contract checks.
//!
//! A broken precondition is a programmer error, never a recoverable one. Under
//! [`ViolationPolicy::Abort`] the process is terminated after reporting the
//! location. Under [`ViolationPolicy::Capture`] the violation becomes the
//! pending failure of the current thread and the stack unwinds with the
//! [`Violation`] as payload, so tests can observe it.
//!
//! The pending slot belongs to the thread: the test harness runs every test
//! case on its own thread, and [`capture`] resets the slot when a case starts.

use std::borrow::Cow;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;

use crate::config::{self, ViolationPolicy};
use crate::raii::{make_raii, Raii};

/// Reports a violation located at `file:line` of the invocation.
#[macro_export]
macro_rules! violation {
    ($message:expr) => {
        $crate::assertion::fail(concat!(file!(), ":", line!()), $message)
    };
}

/// Checks a precondition, reporting `file:line` of the check when it fails.
///
/// ```
/// use lazy_frame::assertion::{capture, expect_violation};
///
/// let _scope = capture();
/// let violation = expect_violation(|| lazy_frame::contract!(2 < 1, "two is less than one"));
/// assert_eq!("two is less than one", violation.message());
/// ```
#[macro_export]
macro_rules! contract {
    ($condition:expr, $message:expr) => {
        if !$condition {
            $crate::violation!($message)
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("contract violation at {location}: {message}")]
pub struct Violation {
    location: &'static str,
    message: Cow<'static, str>,
}

impl Violation {
    pub fn location(&self) -> &'static str {
        self.location
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

thread_local! {
    static PENDING: RefCell<Option<Violation>> = const { RefCell::new(None) };
}

/// Reports a violated contract. Never returns normally.
#[cold]
pub fn fail(location: &'static str, message: impl Into<Cow<'static, str>>) -> ! {
    let violation = Violation {
        location,
        message: message.into(),
    };

    match config::settings().violations {
        ViolationPolicy::Abort => fatal(&violation),
        ViolationPolicy::Capture => {
            let previous = PENDING.with(|pending| pending.borrow_mut().replace(violation.clone()));
            if let Some(previous) = previous {
                log::error!("unhandled previous violation: {previous}");
                fatal(&violation);
            }
            log::debug!("captured {violation}");
            panic::resume_unwind(Box::new(violation))
        }
    }
}

fn fatal(violation: &Violation) -> ! {
    log::error!("{violation}");
    eprintln!("{} :=> {}", violation.location, violation.message);
    std::process::abort()
}

/// Takes the pending violation of this thread, if any.
pub fn rethrow() -> Result<(), Violation> {
    match PENDING.with(|pending| pending.borrow_mut().take()) {
        Some(violation) => Err(violation),
        None => Ok(()),
    }
}

pub fn reset() {
    PENDING.with(|pending| pending.borrow_mut().take());
}

pub fn has_pending() -> bool {
    PENDING.with(|pending| pending.borrow().is_some())
}

/// Scope of a test case running under the capture policy.
///
/// A violation left pending when the scope ends is raised as a panic, unless
/// the thread is already unwinding.
pub struct CaptureScope(#[allow(dead_code)] Raii<fn()>);

pub fn capture() -> CaptureScope {
    config::set_violation_policy(ViolationPolicy::Capture);
    reset();
    CaptureScope(make_raii(reraise as fn()))
}

fn reraise() {
    if let Err(violation) = rethrow() {
        if !std::thread::panicking() {
            panic!("{violation}");
        }
    }
}

/// Runs `f` and returns the violation it reported.
///
/// Panics if `f` completes without one; other panics pass through untouched.
pub fn expect_violation<R>(f: impl FnOnce() -> R) -> Violation {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(_) => panic!("expected a contract violation"),
        Err(payload) => match payload.downcast::<Violation>() {
            Ok(violation) => {
                reset();
                *violation
            }
            Err(payload) => panic::resume_unwind(payload),
        },
    }
}
