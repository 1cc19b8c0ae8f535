use std::cell::UnsafeCell;
use std::convert::Infallible;
use std::fmt;
use std::mem;
use std::ops::{Deref, DerefMut};

use debug_unreachable::debug_unreachable;

use crate::not_empty::NotEmpty;
use crate::{Initializer, Producer};

enum Field<T, E> {
    Deferred(NotEmpty<Option<Initializer<T, E>>>),
    /// The initializer is running, or panicked while running.
    Forcing,
    Ready(T),
    Failed(E),
    /// Contents were moved out.
    Vacant,
}

/// A value computed on first demand, at most once.
///
/// `E` is the failure the initializer may report. Plain closures never fail,
/// so a `Lazy<T>` hands out its value directly and dereferences to it.
///
/// Not thread safe: forcing happens through `&self`.
pub struct Lazy<T, E = Infallible> {
    field: UnsafeCell<Field<T, E>>,
}

impl<T, E> Lazy<T, E> {
    pub fn new<P>(producer: P) -> Self
    where
        P: Producer<Output = T, Error = E> + 'static,
    {
        Self::from_initializer(Some(Box::new(producer)))
    }

    /// Type erased construction. `None` is a contract violation, reported
    /// right away.
    pub fn from_initializer(initializer: Option<Initializer<T, E>>) -> Self {
        Lazy {
            field: UnsafeCell::new(Field::Deferred(NotEmpty::new(initializer))),
        }
    }

    /// An already computed value.
    pub fn from_value(value: T) -> Self {
        Lazy {
            field: UnsafeCell::new(Field::Ready(value)),
        }
    }

    fn field(&self) -> &Field<T, E> {
        // Only `force` writes through a shared reference, and only while no
        // reference into the field is alive.
        unsafe { &*self.field.get() }
    }

    pub fn has_value(&self) -> bool {
        matches!(self.field(), Field::Ready(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.field(), Field::Failed(_))
    }

    /// The value, if already computed. Never forces.
    pub fn peek(&self) -> Option<&T> {
        match self.field() {
            Field::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// The computed value or `default`. Never forces.
    pub fn value_or(&self, default: T) -> T
    where
        T: Clone,
    {
        self.peek().cloned().unwrap_or(default)
    }

    /// Moves the contents out, leaving a husk that must not be used again.
    pub fn take(&mut self) -> Self {
        let field = mem::replace(self.field.get_mut(), Field::Vacant);
        contract!(!matches!(field, Field::Vacant), "deferred value moved out twice");
        Lazy {
            field: UnsafeCell::new(field),
        }
    }
}

/// Fallible access, for producers with their own error type.
///
/// `Lazy<T>` and [`FrameLazy`](crate::FrameLazy) offer these under the plain
/// names `value`, `value_mut`, `into_value` and `initialize`; use those there.
impl<T, E: Clone> Lazy<T, E> {
    fn force(&self) -> Result<(), E> {
        match self.field() {
            Field::Ready(_) => return Ok(()),
            Field::Failed(err) => return Err(err.clone()),
            Field::Forcing => violation!("deferred value accessed while being initialized"),
            Field::Vacant => violation!("deferred value accessed after being moved out"),
            Field::Deferred(_) => {}
        }

        // No reference into the field exists: it held no value so far.
        let initializer = match mem::replace(unsafe { &mut *self.field.get() }, Field::Forcing) {
            Field::Deferred(initializer) => initializer.into_value(),
            _ => unsafe { debug_unreachable!() },
        };

        log::trace!("forcing deferred value");
        let outcome = initializer.produce_boxed();

        let field = unsafe { &mut *self.field.get() };
        match outcome {
            Ok(value) => {
                *field = Field::Ready(value);
                Ok(())
            }
            Err(err) => {
                log::debug!("deferred value failed, caching the failure");
                *field = Field::Failed(err.clone());
                Err(err)
            }
        }
    }

    pub fn try_initialize(&self) -> Result<(), E> {
        self.force()
    }

    pub fn try_value(&self) -> Result<&T, E> {
        self.force()?;
        match self.field() {
            Field::Ready(value) => Ok(value),
            _ => unsafe { debug_unreachable!() },
        }
    }

    pub fn try_value_mut(&mut self) -> Result<&mut T, E> {
        self.force()?;
        match self.field.get_mut() {
            Field::Ready(value) => Ok(value),
            _ => unsafe { debug_unreachable!() },
        }
    }

    pub fn try_into_value(self) -> Result<T, E> {
        self.force()?;
        match self.field.into_inner() {
            Field::Ready(value) => Ok(value),
            _ => unsafe { debug_unreachable!() },
        }
    }
}

fn infallible<T>(result: Result<T, Infallible>) -> T {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

impl<T> Lazy<T> {
    pub fn value(&self) -> &T {
        infallible(self.try_value())
    }

    pub fn value_mut(&mut self) -> &mut T {
        infallible(self.try_value_mut())
    }

    pub fn into_value(self) -> T {
        infallible(self.try_into_value())
    }

    /// Computes the value now, if it was not already.
    pub fn initialize(&self) {
        infallible(self.try_initialize())
    }
}

impl<T> Deref for Lazy<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.value()
    }
}

impl<T> DerefMut for Lazy<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value_mut()
    }
}

impl<T, E> From<T> for Lazy<T, E> {
    fn from(value: T) -> Self {
        Lazy::from_value(value)
    }
}

/// Only computed values can be cloned: cloning an initializer would run the
/// computation twice.
impl<T: Clone, E> Clone for Lazy<T, E> {
    fn clone(&self) -> Self {
        match self.field() {
            Field::Ready(value) => Lazy::from_value(value.clone()),
            _ => violation!("only computed deferred values can be cloned"),
        }
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for Lazy<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.field() {
            Field::Deferred(_) => f.write_str("Lazy(<deferred>)"),
            Field::Forcing => f.write_str("Lazy(<forcing>)"),
            Field::Ready(value) => f.debug_tuple("Lazy").field(value).finish(),
            Field::Failed(err) => f.debug_tuple("Lazy").field(&Err::<(), _>(err)).finish(),
            Field::Vacant => f.write_str("Lazy(<moved>)"),
        }
    }
}
