//! Elapsed-time wrapper for operation results.

use std::time::{Duration, Instant};

/// A result together with the wall time spent producing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timed<T> {
    /// The result.
    pub value: T,
    /// Wall time spent.
    pub elapsed: Duration,
}

impl<T> Timed<T> {
    /// Wraps a value with an explicit elapsed time.
    pub const fn new(value: T, elapsed: Duration) -> Self {
        Self { value, elapsed }
    }

    /// Runs `f` and records how long it took.
    pub fn measure(f: impl FnOnce() -> T) -> Self {
        let start = Instant::now();
        let value = f();
        Self {
            value,
            elapsed: start.elapsed(),
        }
    }

    /// Runs a fallible `f`, timing it only if it succeeds.
    pub fn try_measure<E>(f: impl FnOnce() -> Result<T, E>) -> Result<Self, E> {
        let start = Instant::now();
        let value = f()?;
        Ok(Self {
            value,
            elapsed: start.elapsed(),
        })
    }

    /// Maps the value, keeping the elapsed time.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Timed<U> {
        Timed {
            value: f(self.value),
            elapsed: self.elapsed,
        }
    }

    /// Discards the timing.
    pub fn into_inner(self) -> T {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_and_map() {
        let timed = Timed::measure(|| 21).map(|v| v * 2);
        assert_eq!(timed.value, 42);

        let failed: Result<Timed<u8>, &str> = Timed::try_measure(|| Err("nope"));
        assert!(failed.is_err());
    }
}
