/// Channel selector resolution.
pub mod channel;
/// Track → source → feature track lookup.
pub mod context;
/// Consumer-facing feature descriptors and selectors.
pub mod descriptor;
/// Analysis data model: feature tracks and per-source caches.
pub mod model;
/// Frame timebases (tick or seconds hops).
pub mod timebase;
