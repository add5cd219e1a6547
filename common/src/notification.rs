//! Functionality for cross-thread notifying.
//!
//! A notification can be signaled only once. Other threads can block
//! on the notification, probe it without blocking, or wait with a
//! timeout. All waiting threads are resumed when the notification is
//! signaled. The asset manager uses this as the startup gate that
//! holds application boot until the preload batch drains.

use std::ops::Deref;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// Sender part capable of signaling the notification.
pub struct Sender(Arc<(Mutex<bool>, Condvar)>);

/// Receiver part of notification capable of blocking the current thread
/// until the notification is signaled.
#[derive(Clone)]
pub struct Receiver(Arc<(Mutex<bool>, Condvar)>);

impl Sender {
    /// Signals the notification and resumes all threads that
    /// are blocked on a `wait()` call.
    #[inline]
    pub fn signal(&self) {
        let (mutex, condvar) = self.0.deref();
        let mut ready = mutex.lock().unwrap();
        *ready = true;
        condvar.notify_all()
    }
}

impl Receiver {
    /// Blocks current thread until this notification becomes
    /// signaled.
    #[inline]
    pub fn wait(&self) {
        let (mutex, condvar) = self.0.deref();
        let mut ready = mutex.lock().unwrap();
        while !*ready {
            ready = condvar.wait(ready).unwrap();
        }
    }

    /// Blocks current thread until this notification becomes signaled
    /// or the timeout elapses. Returns whether the notification was
    /// signaled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (mutex, condvar) = self.0.deref();
        let deadline = Instant::now() + timeout;
        let mut ready = mutex.lock().unwrap();
        while !*ready {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = condvar.wait_timeout(ready, deadline - now).unwrap();
            ready = guard;
        }
        true
    }

    /// Returns whether the notification has already been signaled
    /// without blocking.
    #[inline]
    pub fn is_signaled(&self) -> bool {
        let (mutex, _) = self.0.deref();
        *mutex.lock().unwrap()
    }
}

/// Creates a new notification. Returns a `Sender` and `Receiver`
/// structs. `Sender` can be used to signal the notification and
/// `Receiver` struct can be used to block the thread until the
/// notification becomes signaled.
#[allow(clippy::mutex_atomic)] // need mutex for CondVar
pub fn notification() -> (Sender, Receiver) {
    let arc = Arc::new((Mutex::new(false), Condvar::new()));
    (Sender(arc.clone()), Receiver(arc))
}

#[cfg(test)]
mod tests {
    use crate::notification::notification;
    use std::time::Duration;

    #[test]
    fn signal_resumes_waiting_thread() {
        let (send, recv) = notification();

        let waiter = std::thread::spawn(move || recv.wait());
        send.signal();
        waiter.join().unwrap();
    }

    #[test]
    fn wait_timeout_reports_signal_state() {
        let (send, recv) = notification();

        assert!(!recv.is_signaled());
        assert!(!recv.wait_timeout(Duration::from_millis(10)));

        send.signal();
        assert!(recv.is_signaled());
        assert!(recv.wait_timeout(Duration::from_millis(10)));
    }
}
