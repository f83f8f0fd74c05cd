/// Per-feature-track sample memo.
pub mod cache;
/// Diagnostics records and log.
pub mod diagnostics;
/// Frame-range extraction over tick windows.
pub mod range;
/// Caching frame and history sampler.
pub mod sampler;
/// Tempo-aligned view adapter and its default implementation.
pub mod view;
