//! Deferred values backed by a computation frame.
//!
//! Forcing a [`FrameLazy`] resumes its frame until it is terminal, takes the
//! single result and destroys the frame. A failure is cached: the frame is
//! never run again and every later access reports the same error. A frame
//! whose value is never demanded is destroyed together with the container.
//!
//! Accessing the value from inside the frame's own body is not supported.

use std::future::Future;

use crate::error::FrameError;
use crate::frame::Frame;
use crate::lazy::Lazy;
use crate::Producer;

pub type FrameLazy<T> = Lazy<T, FrameError>;

impl<T> Producer for Frame<T> {
    type Output = T;
    type Error = FrameError;

    fn produce(mut self) -> Result<T, FrameError> {
        let result = self.run_to_completion();
        self.destroy();
        result
    }
}

/// Starts `body` as a suspended frame and hands back the deferred value it
/// will produce.
pub fn deferred<T, F>(body: F) -> FrameLazy<T>
where
    T: 'static,
    F: Future<Output = anyhow::Result<T>> + 'static,
{
    Lazy::from_frame(Frame::from_future(body))
}

/// Accessors of a frame-backed value. These are the names to use; the
/// `try_*` methods they forward to exist for producers in general.
impl<T: 'static> Lazy<T, FrameError> {
    pub fn from_frame(frame: Frame<T>) -> Self {
        log::trace!("frame {} deferred", frame.id());
        Lazy::new(frame)
    }

    pub fn value(&self) -> Result<&T, FrameError> {
        self.try_value()
    }

    pub fn value_mut(&mut self) -> Result<&mut T, FrameError> {
        self.try_value_mut()
    }

    pub fn into_value(self) -> Result<T, FrameError> {
        self.try_into_value()
    }

    /// Drives the frame to completion now, if it was not already.
    pub fn initialize(&self) -> Result<(), FrameError> {
        self.try_initialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{suspend, Step};
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Tally {
        steps: Cell<u32>,
        releases: Cell<u32>,
    }

    struct Release(Rc<Tally>);

    impl Drop for Release {
        fn drop(&mut self) {
            self.0.releases.set(self.0.releases.get() + 1);
        }
    }

    /// Terminates on its `total`-th step with `value`, failing instead on
    /// step `fail_at` when given.
    fn tallied(tally: &Rc<Tally>, total: u32, value: i32, fail_at: Option<u32>) -> Frame<i32> {
        let release = Release(tally.clone());
        Frame::from_steps(move || {
            let tally = &release.0;
            let step = tally.steps.get() + 1;
            tally.steps.set(step);
            if Some(step) == fail_at {
                anyhow::bail!("failed on step {step}");
            }
            if step == total {
                Ok(Step::Return(value))
            } else {
                Ok(Step::Suspend)
            }
        })
    }

    #[test]
    fn frame_runs_only_when_demanded() {
        let tally = Rc::new(Tally::default());
        let lazy = Lazy::from_frame(tallied(&tally, 3, 7, None));

        assert!(!lazy.has_value());
        assert_eq!(0, tally.steps.get());

        assert_eq!(&7, lazy.value().unwrap());
        assert!(lazy.has_value());
        assert_eq!(3, tally.steps.get());
        assert_eq!(1, tally.releases.get());
    }

    #[test]
    fn frame_is_destroyed_right_after_extraction() {
        let tally = Rc::new(Tally::default());
        let lazy: FrameLazy<i32> = Lazy::from_frame(tallied(&tally, 1, 7, None));

        lazy.initialize().unwrap();
        assert_eq!(1, tally.releases.get());

        assert_eq!(&7, lazy.value().unwrap());
        drop(lazy);
        assert_eq!(1, tally.releases.get());
        assert_eq!(1, tally.steps.get());
    }

    #[test]
    fn abandoned_frame_is_destroyed_once() {
        let tally = Rc::new(Tally::default());

        drop(Lazy::from_frame(tallied(&tally, 3, 7, None)));

        assert_eq!(0, tally.steps.get());
        assert_eq!(1, tally.releases.get());
    }

    #[test]
    fn failure_is_cached_and_reraised() {
        let tally = Rc::new(Tally::default());
        let lazy = Lazy::from_frame(tallied(&tally, 3, 7, Some(2)));

        let first = lazy.value().unwrap_err();
        assert_eq!("failed on step 2", first.inner().to_string());
        assert!(!lazy.has_value());
        assert!(lazy.is_failed());

        let second = lazy.value().unwrap_err();
        assert!(first.same_failure(&second));
        assert_eq!(2, tally.steps.get());
        assert_eq!(1, tally.releases.get());
    }

    #[test]
    fn plain_accessors_match_the_general_ones() {
        let tally = Rc::new(Tally::default());
        let lazy = Lazy::from_frame(tallied(&tally, 2, 5, None));

        lazy.initialize().unwrap();

        assert_eq!(lazy.try_value().unwrap(), lazy.value().unwrap());
        assert_eq!(2, tally.steps.get());
    }

    #[test]
    fn value_or_does_not_drive_the_frame() {
        let tally = Rc::new(Tally::default());
        let lazy = Lazy::from_frame(tallied(&tally, 2, 7, None));

        assert_eq!(-1, lazy.value_or(-1));
        assert_eq!(0, tally.steps.get());
    }

    #[test]
    fn deferred_async_body() {
        let lazy = deferred(async {
            suspend().await;
            anyhow::Ok(String::from("computed"))
        });

        assert!(!lazy.has_value());
        assert_eq!("computed", lazy.into_value().unwrap());
    }

    #[test]
    fn value_mut_after_forcing() {
        let mut lazy = deferred(async { anyhow::Ok(vec![1]) });

        lazy.value_mut().unwrap().push(2);

        assert_eq!(&vec![1, 2], lazy.value().unwrap());
    }

    #[test]
    fn take_moves_the_frame_along() {
        let tally = Rc::new(Tally::default());
        let mut source = Lazy::from_frame(tallied(&tally, 1, 9, None));

        let destination = source.take();
        drop(source);
        assert_eq!(0, tally.releases.get());

        assert_eq!(9, destination.into_value().unwrap());
        assert_eq!(1, tally.releases.get());
    }
}
