//! Offline-first network boundary
//!
//! Sits below every other component, at the platform's fetch boundary:
//!
//! - [`OfflineInterceptor`]: serves precached responses when available,
//!   forwards everything else to the network. Its precache is populated
//!   once, atomically, at install time under a versioned namespace.
//! - [`DeferredWriteQueue`]: captures writes attempted while offline and
//!   replays them in FIFO order when a sync signal fires.
//!
//! # Precache states
//!
//! | State | Served | Description |
//! |-------|--------|-------------|
//! | Absent | network | Install never ran or failed; nothing retained |
//! | Ready | cache-first | Full manifest committed for this version |
//!
//! A half-populated precache never exists: any single resource failure
//! during install fails the whole install, because a cache mixing assets
//! from different deploys is worse than none.

pub mod fetch;
pub mod interceptor;
pub mod storage;
pub mod write_queue;

pub use fetch::{Method, NetworkFetcher, Request, Response};
pub use interceptor::{OfflineInterceptor, PrecacheManifest};
pub use storage::{CacheStorage, MemoryStorage};
pub use write_queue::{DeferredWriteQueue, QueuedWrite, ReplayOutcome, WriteReplayer, WriteStatus};
