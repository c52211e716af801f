//! Study configuration, read from an optional TOML file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::domain::{Board, PieceKind};

/// Settings for a study
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StudyConfig {
    /// Root position of a fresh or cleared study; standard start if absent
    pub start_fen: Option<String>,
    /// Piece chosen when a coordinate move promotes without saying to what
    pub promotion: PieceKind,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            start_fen: None,
            promotion: PieceKind::Queen,
        }
    }
}

impl StudyConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: StudyConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.promotion.is_promotion_piece() {
            bail!("cannot promote to {:?}", self.promotion);
        }
        self.start_board()?;
        Ok(())
    }

    /// The configured root position
    pub fn start_board(&self) -> Result<Board> {
        match &self.start_fen {
            Some(fen) => Ok(Board::from_fen(fen)?),
            None => Ok(Board::new()),
        }
    }
}
