use std::cell::{Cell, RefCell};

/// Lazily recomputed derived value with an explicit dirty flag.
///
/// Any mutation of an input calls [`DerivedCache::invalidate`]; readers go
/// through [`DerivedCache::get_or_try_recompute`], which checks and clears the
/// flag right before reading. Interior mutability keeps render and hit-test
/// passes `&self`.
#[derive(Debug)]
pub struct DerivedCache<T> {
    value: RefCell<Option<T>>,
    needs_recompute: Cell<bool>,
}

impl<T: Clone> DerivedCache<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            value: RefCell::new(None),
            needs_recompute: Cell::new(true),
        }
    }

    pub fn invalidate(&self) {
        self.needs_recompute.set(true);
    }

    #[must_use]
    pub fn needs_recompute(&self) -> bool {
        self.needs_recompute.get()
    }

    pub fn get_or_try_recompute<E>(&self, recompute: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        if !self.needs_recompute.get() {
            if let Some(value) = self.value.borrow().as_ref() {
                return Ok(value.clone());
            }
        }
        let fresh = recompute()?;
        *self.value.borrow_mut() = Some(fresh.clone());
        self.needs_recompute.set(false);
        Ok(fresh)
    }
}

impl<T: Clone> Default for DerivedCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A clone starts dirty so it never serves a value computed for its source.
impl<T: Clone> Clone for DerivedCache<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recomputes_only_when_dirty() {
        let cache = DerivedCache::<u32>::new();
        let calls = Cell::new(0);
        let compute = || -> Result<u32, ()> {
            calls.set(calls.get() + 1);
            Ok(7)
        };

        assert_eq!(cache.get_or_try_recompute(compute), Ok(7));
        assert_eq!(cache.get_or_try_recompute(compute), Ok(7));
        assert_eq!(calls.get(), 1);

        cache.invalidate();
        assert!(cache.needs_recompute());
        assert_eq!(cache.get_or_try_recompute(compute), Ok(7));
        assert_eq!(calls.get(), 2);
        assert!(!cache.needs_recompute());
    }

    #[test]
    fn failed_recompute_stays_dirty() {
        let cache = DerivedCache::<u32>::new();
        assert_eq!(cache.get_or_try_recompute(|| Err::<u32, _>("boom")), Err("boom"));
        assert!(cache.needs_recompute());
    }
}
