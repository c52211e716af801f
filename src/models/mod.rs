//! Application layer over the domain: the study store and its views.

pub mod snapshot;
pub mod study;

pub use snapshot::{MoveSnapshot, NodeSnapshot, StudySnapshot};
pub use study::{LineEntry, Study};
