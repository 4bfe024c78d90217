//! Compute-once cells for lazily derived values

use std::cell::OnceCell;
use std::fmt;

/// A value that is computed at most once, on first access.
///
/// Unlike `OnceCell::get_or_init`, the computation may fail; a failed
/// computation leaves the cell unset so the error surfaces again on the
/// next access.
pub struct Memo<T> {
    cell: OnceCell<T>,
}

impl<T> Memo<T> {
    pub fn new() -> Self {
        Self { cell: OnceCell::new() }
    }

    /// A cell that starts out already set
    pub fn with_value(value: T) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(value);
        Self { cell }
    }

    pub fn get_or_try_init<E, F>(&self, compute: F) -> Result<&T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(value) = self.cell.get() {
            return Ok(value);
        }
        let value = compute()?;
        Ok(self.cell.get_or_init(|| value))
    }
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some(v) => write!(f, "Memo({:?})", v),
            None => write!(f, "Memo(<unset>)"),
        }
    }
}
