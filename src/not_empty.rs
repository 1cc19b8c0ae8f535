use std::ops::Deref;

use debug_unreachable::debug_unreachable;

/// A handle that may be null.
pub trait Nullable {
    fn is_null(&self) -> bool;
}

impl<T> Nullable for Option<T> {
    fn is_null(&self) -> bool {
        self.is_none()
    }
}

impl<T: ?Sized> Nullable for *const T {
    fn is_null(&self) -> bool {
        <*const T>::is_null(*self)
    }
}

impl<T: ?Sized> Nullable for *mut T {
    fn is_null(&self) -> bool {
        <*mut T>::is_null(*self)
    }
}

/// Wraps a nullable handle that is known not to be null.
///
/// Construction with a null handle is a contract violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotEmpty<T: Nullable>(T);

impl<T: Nullable> NotEmpty<T> {
    pub fn new(value: T) -> Self {
        contract!(!value.is_null(), "not empty handle constructed from a null one");
        NotEmpty(value)
    }

    pub fn get(&self) -> &T {
        &self.0
    }

    /// Swaps in another handle, which must not be null either.
    pub fn replace(&mut self, value: T) -> T {
        contract!(!value.is_null(), "null handle assigned to a not empty one");
        std::mem::replace(&mut self.0, value)
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> NotEmpty<Option<T>> {
    pub fn value(&self) -> &T {
        match self.0 {
            Some(ref value) => value,
            None => unsafe { debug_unreachable!() },
        }
    }

    pub fn into_value(self) -> T {
        match self.0 {
            Some(value) => value,
            None => unsafe { debug_unreachable!() },
        }
    }
}

impl<T> Deref for NotEmpty<Option<T>> {
    type Target = T;

    fn deref(&self) -> &T {
        self.value()
    }
}
