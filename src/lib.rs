//! Cut-layout engine for panel stock.
//!
//! Given the pieces of a furniture design, [`generate_cut_layout`] works out
//! how many standard sheets are needed and where every piece is cut from,
//! using guillotine packing with rotation and a kerf margin. Pieces of
//! different material, thickness or color never share a sheet.
//!
//! ```no_run
//! use cut_layout::{LayoutConfig, PieceData, generate_cut_layout};
//!
//! let pieces = vec![PieceData::new("MDF", "18mm", "White", 800, 400, 4)];
//! let plan = generate_cut_layout(&pieces, &LayoutConfig::default())?;
//! println!("{} sheets", plan.total_sheets);
//! # Ok::<(), cut_layout::LayoutError>(())
//! ```
//!
//! [`estimate_sheet_count`] is a faster area-only count for pricing. It does
//! not place pieces and may report fewer sheets than the real layout needs.

pub mod config;
pub mod error;
pub mod estimate;
pub mod grouping;
pub mod guillotine;
pub mod layout;
pub mod render;
pub mod stats;
pub mod types;

pub use config::{LayoutConfig, OversizePolicy};
pub use error::{ConfigError, LayoutError};
pub use estimate::{SheetEstimate, estimate_sheet_count};
pub use layout::generate_cut_layout;
pub use stats::LayoutStats;
pub use types::{CutPlanData, MaterialKey, PieceData, PlacedPiece, Rect, Rotation, Sheet};
