use std::sync::Arc;

use parking_lot::RwLock;

/// Shared, lock-guarded state. Cloning shares the same underlying value.
pub type Atomic<T> = Arc<RwLock<T>>;

#[inline]
pub fn atomic<T>(t: T) -> Atomic<T> {
    Arc::new(RwLock::new(t))
}

pub trait ReadExecutor<T: ?Sized> {
    fn read_with<R>(&self, f: impl FnOnce(&T) -> R) -> R;
}

impl<T> ReadExecutor<T> for Atomic<T> {
    #[inline]
    fn read_with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let read_guard = self.read();
        f(&*read_guard)
    }
}

pub trait WriteExecutor<T: ?Sized> {
    fn write_with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R;
}

impl<T> WriteExecutor<T> for Atomic<T> {
    #[inline]
    fn write_with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        // parking_lot locks are not reentrant; never call back into the same Atomic from `f`
        let mut write_guard = self.write();
        f(&mut *write_guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let names = atomic(vec!["post".to_string()]);
        let other = names.clone();
        other.write_with(|v| v.push("comment".to_string()));
        assert_eq!(names.read_with(|v| v.len()), 2);
    }

    #[test]
    fn read_with_returns_closure_result() {
        let counter = atomic(41);
        assert_eq!(counter.read_with(|v| *v + 1), 42);
    }

    #[test]
    fn write_with_returns_closure_result() {
        let list = atomic(im::Vector::<i32>::new());
        let len = list.write_with(|v| {
            v.push_back(1);
            v.push_back(2);
            v.len()
        });
        assert_eq!(len, 2);
    }
}
