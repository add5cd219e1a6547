//! Functionality shared between the pipeline crates: cross-thread
//! notification and the named-event capability consumed by the asset
//! pipeline.

pub mod events;
pub mod notification;
