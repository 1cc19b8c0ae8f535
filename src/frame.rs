//! Resumable computation frames.
//!
//! A [`Frame`] owns a [`Routine`] and tracks where it stands: not started,
//! suspended half way, or terminal. Callers drive it with
//! [`Frame::resume_step`] until [`Frame::is_terminal`] holds, then take the one
//! value it produced. The routine is released by [`Frame::destroy`], or when
//! the frame is dropped without having been destroyed.

use std::cell::Cell;
use std::fmt;
use std::future::Future;
use std::num::NonZeroU64;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use futures::task::noop_waker_ref;

use crate::config;
use crate::error::FrameError;

/// Outcome of one resume of a [`Routine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<T> {
    /// More work left, resume again.
    Suspend,
    Return(T),
}

/// The logic executed by a frame, one step per resume.
///
/// A routine must reach [`Step::Return`] or fail after a finite number of
/// resumes. It is never resumed again after that.
pub trait Routine {
    type Output;

    fn resume(&mut self) -> anyhow::Result<Step<Self::Output>>;
}

impl<T, F: FnMut() -> anyhow::Result<Step<T>>> Routine for F {
    type Output = T;

    fn resume(&mut self) -> anyhow::Result<Step<T>> {
        self()
    }
}

struct OnceRoutine<F>(Option<F>);

impl<T, F: FnOnce() -> anyhow::Result<T>> Routine for OnceRoutine<F> {
    type Output = T;

    fn resume(&mut self) -> anyhow::Result<Step<T>> {
        match self.0.take() {
            Some(f) => f().map(Step::Return),
            None => violation!("one step routine resumed twice"),
        }
    }
}

thread_local! {
    /// Set by [`Suspend`] when the poll in progress stopped at it.
    static SUSPENDED_BY_FRAME: Cell<bool> = const { Cell::new(false) };
}

/// Polls a future with a waker that does nothing: every `Pending` is one
/// suspension of the frame, and the frame itself decides when to poll again.
///
/// Only [`suspend`] may leave the body pending. Any other future would wait
/// for a wake up that never comes, so stopping at one is a violation.
struct FutureRoutine<F>(Pin<Box<F>>);

impl<T, F: Future<Output = anyhow::Result<T>>> Routine for FutureRoutine<F> {
    type Output = T;

    fn resume(&mut self) -> anyhow::Result<Step<T>> {
        let mut cx = Context::from_waker(noop_waker_ref());
        // Saved and restored, as a body may drive another frame.
        let outer = SUSPENDED_BY_FRAME.with(|flag| flag.replace(false));
        let poll = self.0.as_mut().poll(&mut cx);
        let own = SUSPENDED_BY_FRAME.with(|flag| flag.replace(outer));
        match poll {
            Poll::Pending if own => Ok(Step::Suspend),
            Poll::Pending => violation!("frame awaited a foreign future"),
            Poll::Ready(result) => result.map(Step::Return),
        }
    }
}

/// Suspends the enclosing async frame body once.
///
/// This is the only suspension point a frame body may use: the body is
/// resumed by its own frame, never by anything it waits for.
pub fn suspend() -> Suspend {
    Suspend { suspended: false }
}

#[must_use = "futures do nothing unless awaited"]
#[derive(Debug)]
pub struct Suspend {
    suspended: bool,
}

impl Future for Suspend {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.suspended {
            Poll::Ready(())
        } else {
            self.suspended = true;
            SUSPENDED_BY_FRAME.with(|flag| flag.set(true));
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    NotStarted,
    Suspended,
    Returned,
    Failed,
    Destroyed,
}

enum State<T> {
    NotStarted,
    Suspended,
    /// `None` once the result was taken.
    Returned(Option<T>),
    Failed,
}

static NEXT_FRAME_ID: AtomicU64 = AtomicU64::new(1);

pub struct Frame<T> {
    id: u64,
    routine: Option<Box<dyn Routine<Output = T>>>,
    state: State<T>,
    steps: u64,
    step_limit: Option<NonZeroU64>,
}

impl<T> Frame<T> {
    /// Creates a suspended frame. Nothing runs until the first resume.
    pub fn new<R: Routine<Output = T> + 'static>(routine: R) -> Self {
        let id = NEXT_FRAME_ID.fetch_add(1, Ordering::Relaxed);
        log::trace!("frame {id} created");
        Frame {
            id,
            routine: Some(Box::new(routine)),
            state: State::NotStarted,
            steps: 0,
            step_limit: config::settings().step_limit,
        }
    }

    /// A frame stepping through `f` until it returns [`Step::Return`].
    pub fn from_steps<F>(f: F) -> Self
    where
        F: FnMut() -> anyhow::Result<Step<T>> + 'static,
    {
        Frame::new(f)
    }

    /// A frame running `f` in a single step.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<T> + 'static,
    {
        Frame::new(OnceRoutine(Some(f)))
    }

    /// A frame running an async body; every poll is one resume step.
    pub fn from_future<F>(future: F) -> Self
    where
        F: Future<Output = anyhow::Result<T>> + 'static,
    {
        Frame::new(FutureRoutine(Box::pin(future)))
    }

    /// Bounds the number of resume steps; going past it is a contract
    /// violation.
    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = NonZeroU64::new(limit);
        contract!(self.step_limit.is_some(), "step limit must be positive");
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn status(&self) -> FrameStatus {
        if self.routine.is_none() {
            return FrameStatus::Destroyed;
        }
        match self.state {
            State::NotStarted => FrameStatus::NotStarted,
            State::Suspended => FrameStatus::Suspended,
            State::Returned(_) => FrameStatus::Returned,
            State::Failed => FrameStatus::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, State::Returned(_) | State::Failed)
    }

    pub fn is_destroyed(&self) -> bool {
        self.routine.is_none()
    }

    /// Runs one step of the routine.
    ///
    /// A failing routine surfaces its error here, once; the frame is then
    /// terminal and can only be destroyed.
    pub fn resume_step(&mut self) -> Result<(), FrameError> {
        contract!(!self.is_terminal(), "frame resumed past its terminal state");
        if let Some(limit) = self.step_limit {
            contract!(self.steps < limit.get(), "frame exceeded its step limit");
        }
        let routine = match self.routine.as_mut() {
            Some(routine) => routine,
            None => violation!("destroyed frame resumed"),
        };

        self.steps += 1;
        log::trace!("frame {} step {}", self.id, self.steps);

        match routine.resume() {
            Ok(Step::Suspend) => {
                self.state = State::Suspended;
                Ok(())
            }
            Ok(Step::Return(value)) => {
                log::debug!("frame {} returned after {} steps", self.id, self.steps);
                self.state = State::Returned(Some(value));
                Ok(())
            }
            Err(err) => {
                log::debug!("frame {} failed after {} steps: {err:#}", self.id, self.steps);
                self.state = State::Failed;
                Err(FrameError::computation(err))
            }
        }
    }

    /// Takes the value of a frame that returned.
    pub fn take_result(&mut self) -> T {
        match self.state {
            State::Returned(ref mut result) => match result.take() {
                Some(value) => value,
                None => violation!("frame result taken twice"),
            },
            State::Failed => violation!("failed frame has no result"),
            _ => violation!("result taken from a frame that did not finish"),
        }
    }

    /// Resumes until terminal, then takes the result.
    pub fn run_to_completion(&mut self) -> Result<T, FrameError> {
        while !self.is_terminal() {
            self.resume_step()?;
        }
        Ok(self.take_result())
    }

    /// Releases the routine, whatever state the frame is in.
    pub fn destroy(&mut self) {
        contract!(!self.is_destroyed(), "frame destroyed twice");
        self.release();
    }

    fn release(&mut self) {
        if let Some(routine) = self.routine.take() {
            log::debug!("frame {} destroyed after {} steps", self.id, self.steps);
            drop(routine);
        }
    }
}

impl<T> Drop for Frame<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T> fmt::Debug for Frame<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("id", &self.id)
            .field("status", &self.status())
            .field("steps", &self.steps)
            .finish()
    }
}
