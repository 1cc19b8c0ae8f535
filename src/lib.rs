//! Deferred values: a handle that produces its payload on first demand and
//! never computes it twice.
//!
//! A [`Lazy`] is built either from a plain closure or from a [`Frame`], a
//! resumable computation that is driven to completion the first time the value
//! is needed. Both go through the same [`Producer`] abstraction.
//!
//! ```
//! use lazy_frame::{deferred, suspend, Lazy};
//!
//! let plain = Lazy::new(|| 6 * 7);
//! assert_eq!(42, *plain);
//!
//! let framed = deferred(async {
//!     suspend().await;
//!     anyhow::Ok(7)
//! });
//! assert!(!framed.has_value());
//! assert_eq!(&7, framed.value().unwrap());
//! ```

#[macro_use]
pub mod assertion;

pub mod config;
mod error;
mod frame;
mod frame_lazy;
mod lazy;
mod not_empty;
mod raii;
mod repeat;

use std::convert::Infallible;

pub use assertion::Violation;
pub use config::{settings, ConfigError, Settings, ViolationPolicy};
pub use error::FrameError;
pub use frame::{suspend, Frame, FrameStatus, Routine, Step, Suspend};
pub use frame_lazy::{deferred, FrameLazy};
pub use lazy::Lazy;
pub use not_empty::{NotEmpty, Nullable};
pub use raii::{make_raii, Raii};
pub use repeat::{repeat, repeat_indexed};

/// Something able to compute one value, consuming itself in the process.
pub trait Producer {
    type Output;
    type Error;

    fn produce(self) -> Result<Self::Output, Self::Error>;
}

impl<V, F: FnOnce() -> V> Producer for F {
    type Output = V;
    type Error = Infallible;

    fn produce(self) -> Result<V, Infallible> {
        Ok(self())
    }
}

/// Object safe face of [`Producer`], used to erase the producer type.
pub trait ProducerBox<T, E> {
    fn produce_boxed(self: Box<Self>) -> Result<T, E>;
}

impl<P: Producer> ProducerBox<P::Output, P::Error> for P {
    fn produce_boxed(self: Box<Self>) -> Result<P::Output, P::Error> {
        (*self).produce()
    }
}

/// A type erased producer, as stored by [`Lazy`].
pub type Initializer<T, E = Infallible> = Box<dyn ProducerBox<T, E>>;
