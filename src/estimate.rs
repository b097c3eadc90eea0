//! Area-only sheet count estimate for cost summaries.
//!
//! Pieces are packed by area alone, with no geometry, so the count can come
//! out lower than what [`generate_cut_layout`](crate::layout::generate_cut_layout)
//! actually needs. Use it for quick pricing, never for placements.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LayoutConfig;
use crate::error::Result;
use crate::grouping::{expand_quantities, group_by_material, screen_pieces, sort_by_area_desc};
use crate::types::{MaterialKey, PieceData, RejectedPiece};

/// Grain direction guessed from a piece's proportions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Vein {
    Horizontal,
    Vertical,
    Any,
}

impl Vein {
    pub fn classify(piece: &PieceData) -> Self {
        let (w, d) = (piece.width as u64, piece.depth as u64);
        if w > 2 * d {
            Vein::Horizontal
        } else if d > 2 * w {
            Vein::Vertical
        } else {
            Vein::Any
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupEstimate {
    #[serde(flatten)]
    pub key: MaterialKey,
    pub sheets: usize,
    pub horizontal: usize,
    pub vertical: usize,
    pub any: usize,
    pub piece_area: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetEstimate {
    pub total_sheets: usize,
    /// Raw stock bought: sheets times sheet area.
    pub optimized_area: u64,
    pub total_piece_area: u64,
    pub groups: Vec<GroupEstimate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedPiece>,
}

/// Best fit over remaining sheet area: each piece goes to the open sheet
/// with the least room left that still holds its area, lowest index on ties.
fn best_fit_by_area(areas: impl IntoIterator<Item = u64>, sheet_area: u64) -> usize {
    let mut remaining: Vec<u64> = Vec::new();
    for area in areas {
        let best = remaining
            .iter()
            .enumerate()
            .filter(|&(_, &left)| left >= area)
            .min_by_key(|&(i, &left)| (left, i))
            .map(|(i, _)| i);
        match best {
            Some(i) => remaining[i] -= area,
            None => remaining.push(sheet_area.saturating_sub(area)),
        }
    }
    remaining.len()
}

pub fn estimate_sheet_count(pieces: &[PieceData], config: &LayoutConfig) -> Result<SheetEstimate> {
    config.validate()?;

    let sheet_area = config.sheet.area();
    let (valid, rejected) = screen_pieces(pieces, config)?;
    let mut groups = Vec::new();

    for group in group_by_material(valid.iter().copied()) {
        let mut buckets: [Vec<PieceData>; 3] = Default::default();
        for unit in expand_quantities(group.pieces.iter().copied()) {
            let bucket = match Vein::classify(&unit) {
                Vein::Horizontal => 0,
                Vein::Vertical => 1,
                Vein::Any => 2,
            };
            buckets[bucket].push(unit);
        }
        for bucket in &mut buckets {
            sort_by_area_desc(bucket);
        }

        let piece_area: u64 = buckets.iter().flatten().map(|p| p.area()).sum();
        let sheets = best_fit_by_area(buckets.iter().flatten().map(|p| p.area()), sheet_area);
        debug!(group = %group.key, sheets, piece_area, "estimated material group");

        let [horizontal, vertical, any] = &buckets;
        groups.push(GroupEstimate {
            key: group.key,
            sheets,
            horizontal: horizontal.len(),
            vertical: vertical.len(),
            any: any.len(),
            piece_area,
        });
    }

    let total_sheets = groups.iter().map(|g| g.sheets).sum::<usize>();
    Ok(SheetEstimate {
        total_sheets,
        optimized_area: total_sheets as u64 * sheet_area,
        total_piece_area: groups.iter().map(|g| g.piece_area).sum(),
        groups,
        rejected,
    })
}
