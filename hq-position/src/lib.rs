//! Position tracker and account state (spec §4.9): one map keyed by pair, updated either
//! by a full venue snapshot or incrementally by individual fills.

pub mod tracker;

pub use tracker::PositionTracker;
