use crate::types::{CutPlanData, RejectedPiece, Sheet};

/// Aggregate figures over a finished set of sheets.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayoutStats {
    pub total_sheets: usize,
    pub total_pieces: usize,
    pub total_used_area: u64,
    pub total_waste_area: u64,
    pub average_utilization: f64,
    /// Sum of piece perimeters. Shared cut lines between neighbours are
    /// counted once per piece, so this overestimates the real saw path.
    pub total_cut_length: u64,
}

impl LayoutStats {
    pub fn from_sheets(sheets: &[Sheet]) -> Self {
        let total_sheets = sheets.len();
        let total_pieces = sheets.iter().map(|s| s.pieces.len()).sum();
        let total_used_area = sheets.iter().map(|s| s.used_area).sum();
        let total_waste_area = sheets.iter().map(|s| s.waste_area).sum();
        let average_utilization = if total_sheets == 0 {
            0.0
        } else {
            sheets.iter().map(|s| s.utilization).sum::<f64>() / total_sheets as f64
        };
        let total_cut_length = sheets
            .iter()
            .flat_map(|s| &s.pieces)
            .map(|p| p.perimeter())
            .sum();

        Self {
            total_sheets,
            total_pieces,
            total_used_area,
            total_waste_area,
            average_utilization,
            total_cut_length,
        }
    }
}

impl CutPlanData {
    pub fn from_sheets(sheets: Vec<Sheet>, rejected: Vec<RejectedPiece>) -> Self {
        let stats = LayoutStats::from_sheets(&sheets);
        Self {
            sheets,
            total_sheets: stats.total_sheets,
            total_pieces: stats.total_pieces,
            total_used_area: stats.total_used_area,
            total_waste_area: stats.total_waste_area,
            average_utilization: stats.average_utilization,
            total_cut_length: stats.total_cut_length,
            rejected,
        }
    }
}
