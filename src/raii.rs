use debug_unreachable::debug_unreachable;

/// Runs a finalizer exactly once when it goes out of scope, also while
/// unwinding.
#[must_use = "the finalizer runs as soon as the guard is dropped"]
pub struct Raii<F: FnOnce()> {
    finalizer: Option<F>,
}

impl<F: FnOnce()> Raii<F> {
    pub fn new(finalizer: F) -> Self {
        Raii {
            finalizer: Some(finalizer),
        }
    }

    /// Disarms the guard and hands the finalizer back without running it.
    pub fn dismiss(mut self) -> F {
        match self.finalizer.take() {
            Some(finalizer) => finalizer,
            None => unsafe { debug_unreachable!() },
        }
    }
}

impl<F: FnOnce()> Drop for Raii<F> {
    fn drop(&mut self) {
        if let Some(finalizer) = self.finalizer.take() {
            finalizer();
        }
    }
}

pub fn make_raii<F: FnOnce()>(finalizer: F) -> Raii<F> {
    Raii::new(finalizer)
}
