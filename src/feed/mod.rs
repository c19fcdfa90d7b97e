// Feed core: data model, merge rules, and the per-level aggregator.

pub mod aggregator;
pub mod events;
pub mod merge;
pub mod models;
