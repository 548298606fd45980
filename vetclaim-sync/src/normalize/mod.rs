//! Field Normalizer
//!
//! Pure mapping from the heterogeneous VA.gov record shapes onto the
//! canonical model. No I/O, no panics, no errors: anything missing or
//! malformed degrades to `None`, `false` or an empty collection.
//!
//! Each canonical attribute has an ordered list of candidate fields
//! ([`fields::Field`]); the first present one wins. Several API generations
//! may populate different subsets of the same record at once, so the order
//! of each list is part of the contract.

pub mod appeal;
pub mod claim;
pub mod fields;
pub mod phase;
pub mod rating;

pub use appeal::normalize_appeals;
pub use claim::normalize_claim;
pub use fields::to_bool;
pub use phase::phase_from_label;
pub use rating::normalize_rating;
