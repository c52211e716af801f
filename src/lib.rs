//! Chess repertoire study: a move tree fed by interactive play and PGN
//! imports, written back out as PGN with nested variations.

pub mod config;
pub mod domain;
pub mod models;

pub use config::StudyConfig;
pub use domain::{ImportReport, MoveNodeId, MoveTree, TreeError};
pub use models::{Study, StudySnapshot};
