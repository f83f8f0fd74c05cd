/// Timeline tracks, placement and state snapshots.
pub mod model;
/// Copy-on-write owner of timeline state.
pub mod store;
