//! vault/global: shared owner handle.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

/// Handle to a value whose state lives in a region across upgrades.
///
/// Clones share the value. The program keeps one clone and hands another to
/// `Vault::register_global` / `Vault::post_upgrade`.
pub struct Global<T> {
    inner: Arc<RwLock<T>>,
}

impl<T> Global<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(value)),
        }
    }

    /// Run `f` with shared access to the value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.read())
    }

    /// Run `f` with exclusive access to the value.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.inner.write())
    }

    /// Swap in a new value, returning the previous one.
    pub fn replace(&self, value: T) -> T {
        std::mem::replace(&mut *self.inner.write(), value)
    }

    /// Whether both handles point at the same value.
    pub fn ptr_eq(&self, other: &Global<T>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone> Global<T> {
    pub fn get(&self) -> T {
        self.inner.read().clone()
    }
}

impl<T> Clone for Global<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Default> Default for Global<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Global<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Global").field(&*self.inner.read()).finish()
    }
}
