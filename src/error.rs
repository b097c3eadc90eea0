use thiserror::Error;

use crate::types::{PieceData, Rect};

#[derive(Error, Debug)]
pub enum LayoutError {
    /// The piece exceeds the sheet in both orientations, so no number of new
    /// sheets can hold it.
    #[error("piece {piece} does not fit on a {sheet} sheet")]
    PieceTooLarge { piece: Box<PieceData>, sheet: Rect },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The rows ask for more unit pieces than `maxUnits` allows.
    #[error("{units} pieces requested, limit is {limit}")]
    TooManyUnits { units: u64, limit: u64 },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] LayoutError),
}

pub type Result<T> = std::result::Result<T, LayoutError>;
