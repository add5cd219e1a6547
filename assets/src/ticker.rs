//! The poll scheduler owned by the asset manager.
//!
//! Completions are observed on a fixed short cadence rather than
//! event-driven. The cadence runs on a dedicated timer thread that
//! parks on a condition variable while no loads are outstanding, so
//! an idle manager costs nothing.

use crate::manager::AssetManager;
use log::error;
use parking_lot::{Condvar, Mutex};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

#[derive(Default)]
struct State {
    active: bool,
    shutdown: bool,
}

struct Shared {
    state: Mutex<State>,
    wake: Condvar,
}

pub(crate) struct Ticker {
    shared: Arc<Shared>,
}

impl Ticker {
    /// Spawns the timer thread. It holds only a weak reference to the
    /// manager and exits once the manager is dropped or `shutdown` is
    /// called.
    pub fn spawn(manager: Weak<AssetManager>, interval: Duration) -> Ticker {
        let shared = Arc::new(Shared {
            state: Mutex::new(State::default()),
            wake: Condvar::new(),
        });

        let thread_shared = shared.clone();
        thread::spawn(move || run(thread_shared, manager, interval));

        Ticker { shared }
    }

    /// Begins polling. A no-op when polling is already active.
    pub fn activate(&self) {
        let mut state = self.shared.state.lock();
        if !state.active {
            state.active = true;
            self.shared.wake.notify_all();
        }
    }

    /// Stops polling until the next `activate`.
    pub fn deactivate(&self) {
        self.shared.state.lock().active = false;
    }

    pub fn shutdown(&self) {
        self.shared.state.lock().shutdown = true;
        self.shared.wake.notify_all();
    }
}

fn run(shared: Arc<Shared>, manager: Weak<AssetManager>, interval: Duration) {
    loop {
        {
            let mut state = shared.state.lock();
            while !state.active {
                if state.shutdown {
                    return;
                }
                shared.wake.wait(&mut state);
            }
            if state.shutdown {
                return;
            }
        }

        match manager.upgrade() {
            None => return,
            Some(manager) => {
                // poll deactivates this ticker and releases the startup
                // gate itself when a fault arrives or a batch drains
                if let Err(fault) = manager.poll() {
                    error!("{}", fault);
                }
            }
        }

        let mut state = shared.state.lock();
        if state.shutdown {
            return;
        }
        if state.active {
            let _ = shared.wake.wait_for(&mut state, interval);
        }
    }
}
