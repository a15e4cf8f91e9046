//! Keeping the note collection in step with its durable mirrors.

mod bridge;
mod connectivity;
mod engine;

pub use bridge::{PersistenceBridge, SyncOutcome, DEFAULT_LOCAL_KEY, DEFAULT_STORE_NAME};
pub use connectivity::{Connectivity, ConnectivityMonitor, ConnectivitySignal, Subscription};
pub use engine::{Engine, EngineHandle, EngineOptions};
