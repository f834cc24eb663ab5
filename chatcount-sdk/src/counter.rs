//! The shared counter.

use parking_lot::Mutex;

/// Authoritative counter value, shared between the chat worker and hotkey
/// callers. Every operation takes the same lock; values are unbounded and may
/// go negative.
#[derive(Debug, Default)]
pub struct CounterState {
    value: Mutex<i64>,
}

impl CounterState {
    pub fn new(initial: i64) -> Self {
        Self {
            value: Mutex::new(initial),
        }
    }

    /// Add one and return the new value.
    pub fn increment(&self) -> i64 {
        let mut value = self.value.lock();
        *value += 1;
        *value
    }

    /// Subtract one and return the new value.
    pub fn decrement(&self) -> i64 {
        let mut value = self.value.lock();
        *value -= 1;
        *value
    }

    pub fn get(&self) -> i64 {
        *self.value.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn increments_and_decrements() {
        let counter = CounterState::new(5);
        assert_eq!(counter.increment(), 6);
        assert_eq!(counter.decrement(), 5);
        assert_eq!(counter.get(), 5);
    }

    #[test]
    fn goes_negative() {
        let counter = CounterState::new(0);
        assert_eq!(counter.decrement(), -1);
        assert_eq!(counter.decrement(), -2);
    }

    #[test]
    fn concurrent_mutations_are_not_lost() {
        let counter = Arc::new(CounterState::new(0));
        let up = {
            let counter = counter.clone();
            std::thread::spawn(move || {
                for _ in 0..10_000 {
                    counter.increment();
                }
            })
        };
        let down = {
            let counter = counter.clone();
            std::thread::spawn(move || {
                for i in 0..7_000 {
                    if i % 2 == 0 {
                        counter.decrement();
                    } else {
                        counter.increment();
                    }
                }
            })
        };
        up.join().unwrap();
        down.join().unwrap();
        // 10_000 up, then 3_500 down and 3_500 up.
        assert_eq!(counter.get(), 10_000);
    }
}
