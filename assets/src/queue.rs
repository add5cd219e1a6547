//! The thread-safe priority queue between the control thread and the
//! loader worker.

use crate::asset::Asset;
use parking_lot::{Condvar, Mutex};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

/// One pending load request. The ordering key is the asset's priority
/// (higher first) with the creation id breaking ties (lower first, so
/// equal-priority requests are served in submission order).
///
/// The priority is snapshotted when the request is built: a later
/// priority override on the asset never moves a request already in the
/// queue.
pub struct LoadRequest {
    priority: i64,
    id: u64,
    asset: Arc<Asset>,
}

impl LoadRequest {
    pub fn new(asset: Arc<Asset>, priority: i64) -> Self {
        LoadRequest {
            priority,
            id: asset.id(),
            asset,
        }
    }

    pub fn asset(&self) -> &Arc<Asset> {
        &self.asset
    }

    pub fn into_asset(self) -> Arc<Asset> {
        self.asset
    }
}

impl PartialEq for LoadRequest {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.id == other.id
    }
}

impl Eq for LoadRequest {}

impl PartialOrd for LoadRequest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LoadRequest {
    fn cmp(&self, other: &Self) -> Ordering {
        // max-heap: higher priority first, then lower creation id
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.id.cmp(&self.id))
    }
}

struct State {
    heap: BinaryHeap<LoadRequest>,
    closed: bool,
}

/// Blocking priority queue with a single logical producer (the manager,
/// from any calling context) and a single consumer (the loader worker).
pub struct LoadQueue {
    state: Mutex<State>,
    available: Condvar,
}

impl LoadQueue {
    pub fn new() -> Arc<LoadQueue> {
        Arc::new(LoadQueue {
            state: Mutex::new(State {
                heap: BinaryHeap::new(),
                closed: false,
            }),
            available: Condvar::new(),
        })
    }

    /// Inserts a request and wakes the consumer. Requests pushed after
    /// `close` are dropped.
    pub fn push(&self, request: LoadRequest) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.heap.push(request);
        self.available.notify_one();
    }

    /// Blocks until a request is available and returns the one with the
    /// highest (priority, -creation id) key. Returns `None` once the
    /// queue has been closed and drained.
    pub fn pop(&self) -> Option<LoadRequest> {
        let mut state = self.state.lock();
        loop {
            if let Some(request) = state.heap.pop() {
                return Some(request);
            }
            if state.closed {
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    /// Closes the queue, waking the consumer so it can exit.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.available.notify_all();
    }

    pub fn len(&self) -> usize {
        self.state.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use crate::asset::Asset;
    use crate::config::AssetConfig;
    use crate::kind::{AssetKind, MediaLoader};
    use crate::queue::{LoadQueue, LoadRequest};
    use crate::LoadResult;
    use std::path::PathBuf;
    use std::sync::{Arc, Weak};

    struct NullLoader;

    impl MediaLoader for NullLoader {
        fn load(&self, _asset: &Asset) -> LoadResult {
            Ok(())
        }

        fn unload(&self, _asset: &Asset) {}
    }

    fn request(name: &str, id: u64, priority: i64) -> LoadRequest {
        let kind = Arc::new(AssetKind::new(
            "images",
            "images",
            "images",
            &[".png"],
            0,
            Arc::new(NullLoader),
        ));
        let asset = Asset::new(
            name.to_string(),
            kind,
            PathBuf::from(name),
            AssetConfig::default(),
            id,
            Weak::new(),
        );
        LoadRequest::new(asset, priority)
    }

    #[test]
    fn pops_by_priority_descending() {
        let queue = LoadQueue::new();
        queue.push(request("low", 1, 0));
        queue.push(request("high", 2, 100));
        queue.push(request("mid", 3, 50));

        assert_eq!(queue.pop().unwrap().asset().name(), "high");
        assert_eq!(queue.pop().unwrap().asset().name(), "mid");
        assert_eq!(queue.pop().unwrap().asset().name(), "low");
    }

    #[test]
    fn equal_priorities_pop_in_submission_order() {
        let queue = LoadQueue::new();
        for (name, id) in &[("first", 1u64), ("second", 2), ("third", 3)] {
            queue.push(request(name, *id, 10));
        }

        assert_eq!(queue.pop().unwrap().asset().name(), "first");
        assert_eq!(queue.pop().unwrap().asset().name(), "second");
        assert_eq!(queue.pop().unwrap().asset().name(), "third");
    }

    #[test]
    fn multi_digit_ids_compare_numerically() {
        // ids 9 and 10 would order wrongly under lexicographic
        // comparison of "priority, id" strings
        let queue = LoadQueue::new();
        queue.push(request("ninth", 9, 10));
        queue.push(request("tenth", 10, 10));
        queue.push(request("second", 2, 10));

        assert_eq!(queue.pop().unwrap().asset().name(), "second");
        assert_eq!(queue.pop().unwrap().asset().name(), "ninth");
        assert_eq!(queue.pop().unwrap().asset().name(), "tenth");
    }

    #[test]
    fn close_wakes_and_ends_consumer() {
        let queue = LoadQueue::new();
        let consumer = {
            let queue = queue.clone();
            std::thread::spawn(move || queue.pop().is_none())
        };

        queue.close();
        assert!(consumer.join().unwrap());
    }
}
