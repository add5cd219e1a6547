//! The dedicated background thread that performs the actual loads.

use crate::asset::Asset;
use crate::queue::LoadQueue;
use crate::LoaderFault;
use crossbeam::channel::Sender;
use log::{error, trace};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

/// Spawns the loader worker bound to the given queue. The worker
/// block-pops requests, runs the kind's load primitive (skipping it
/// for assets that are already loaded, since an asset may be enqueued
/// twice) and publishes every completed asset on `loaded`.
///
/// A primitive that returns an error or panics produces a
/// [`LoaderFault`] on `faults` and ends the worker: there is only one
/// worker, so the control thread has to treat the fault as fatal. A
/// silently dropped fault would stall all future load-completion
/// detection.
pub(crate) fn spawn_loader_thread(
    queue: Arc<LoadQueue>,
    loaded: Sender<Arc<Asset>>,
    faults: Sender<LoaderFault>,
) {
    thread::spawn(move || {
        while let Some(request) = queue.pop() {
            let asset = request.into_asset();

            if !asset.is_loaded() {
                trace!("starting to load asset {:?}", asset.name());

                let result = catch_unwind(AssertUnwindSafe(|| asset.kind().loader().load(&asset)));
                let fault = match result {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => Some(e.to_string()),
                    Err(payload) => Some(panic_message(payload)),
                };

                if let Some(message) = fault {
                    error!("cannot load asset {:?}: {}", asset.name(), message);
                    let _ = faults.send(LoaderFault {
                        asset: asset.name().to_string(),
                        message,
                    });
                    return;
                }

                trace!("loaded asset {:?}", asset.name());
            }

            if loaded.send(asset).is_err() {
                // manager is gone, nobody will drain completions
                return;
            }
        }
    });
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic in load primitive".to_string()
    }
}
