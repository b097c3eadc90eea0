use tracing::{debug, info};

use crate::config::LayoutConfig;
use crate::error::{LayoutError, Result};
use crate::grouping::{expand_quantities, group_by_material, screen_pieces, sort_by_area_desc};
use crate::guillotine::{Fit, FreeSpaceTracker};
use crate::types::{CutPlanData, MaterialKey, PieceData, PlacedPiece, Rotation, Sheet};

/// Sheet and piece identifiers shared by every group of one run.
#[derive(Debug, Clone, Copy)]
pub struct Numbering {
    next_sheet: usize,
    next_piece: usize,
}

impl Numbering {
    pub fn new() -> Self {
        Self {
            next_sheet: 0,
            next_piece: 1,
        }
    }

    fn sheet(&mut self) -> usize {
        let n = self.next_sheet;
        self.next_sheet += 1;
        n
    }

    fn piece(&mut self) -> usize {
        let n = self.next_piece;
        self.next_piece += 1;
        n
    }
}

impl Default for Numbering {
    fn default() -> Self {
        Self::new()
    }
}

struct OpenSheet {
    sheet: Sheet,
    free: FreeSpaceTracker,
}

impl OpenSheet {
    fn new(index: usize, key: &MaterialKey, config: &LayoutConfig) -> Self {
        Self {
            sheet: Sheet::new(index, config.sheet, key.clone()),
            free: FreeSpaceTracker::from_config(config),
        }
    }

    fn place(&mut self, fit: Fit, piece: &PieceData, piece_number: usize) {
        let placement = self.free.commit(fit, piece.rect());
        self.sheet.push(PlacedPiece {
            piece: PieceData {
                width: placement.rect.w,
                depth: placement.rect.h,
                quantity: 1,
                ..piece.clone()
            },
            x: placement.x,
            y: placement.y,
            rotation: if placement.rotated {
                Rotation::Quarter
            } else {
                Rotation::None
            },
            sheet_index: self.sheet.index,
            piece_number,
        });
    }

    fn finish(mut self) -> Sheet {
        self.sheet.finalize();
        self.sheet
    }
}

pub struct GuillotinePacker<'c> {
    config: &'c LayoutConfig,
}

impl<'c> GuillotinePacker<'c> {
    pub fn new(config: &'c LayoutConfig) -> Self {
        Self { config }
    }

    /// Packs one group's unit pieces, in the given order, onto as many sheets
    /// as needed. Only the newest sheet is ever offered a piece.
    ///
    /// Pieces are expected to have passed [`screen_pieces`]; one that still
    /// cannot fit an empty sheet fails with [`LayoutError::PieceTooLarge`].
    pub fn pack_group(
        &self,
        key: &MaterialKey,
        pieces: &[PieceData],
        numbering: &mut Numbering,
    ) -> Result<Vec<Sheet>> {
        let allow_rotate = self.config.allow_rotate;
        let mut sheets = Vec::new();
        let mut open: Option<OpenSheet> = None;

        for piece in pieces {
            let rect = piece.rect();
            let existing = open
                .as_ref()
                .and_then(|o| o.free.find_best_fit(rect, allow_rotate));
            let fit = match existing {
                Some(fit) => fit,
                None => {
                    if let Some(done) = open.take() {
                        sheets.push(done.finish());
                    }
                    let fresh = OpenSheet::new(numbering.sheet(), key, self.config);
                    let fit = fresh
                        .free
                        .fit_on_empty_sheet(rect, allow_rotate)
                        .ok_or_else(|| self.too_large(piece))?;
                    open = Some(fresh);
                    fit
                }
            };

            if let Some(current) = open.as_mut() {
                current.place(fit, piece, numbering.piece());
            }
        }

        if let Some(done) = open.take()
            && !done.sheet.pieces.is_empty()
        {
            sheets.push(done.finish());
        }

        Ok(sheets)
    }

    fn too_large(&self, piece: &PieceData) -> LayoutError {
        LayoutError::PieceTooLarge {
            piece: Box::new(piece.clone()),
            sheet: self.config.sheet,
        }
    }
}

/// Lays out every piece on standard sheets, one material group at a time.
///
/// Sheets come back grouped by material in order of first appearance, with
/// sheet indices and piece numbers running across all groups.
pub fn generate_cut_layout(pieces: &[PieceData], config: &LayoutConfig) -> Result<CutPlanData> {
    config.validate()?;

    let (valid, rejected) = screen_pieces(pieces, config)?;
    let packer = GuillotinePacker::new(config);
    let mut numbering = Numbering::new();
    let mut sheets = Vec::new();

    for group in group_by_material(valid.iter().copied()) {
        let mut units = expand_quantities(group.pieces.iter().copied());
        sort_by_area_desc(&mut units);

        let packed = packer.pack_group(&group.key, &units, &mut numbering)?;
        debug!(
            group = %group.key,
            pieces = units.len(),
            sheets = packed.len(),
            "packed material group"
        );
        sheets.extend(packed);
    }

    let plan = CutPlanData::from_sheets(sheets, rejected);
    info!(
        sheets = plan.total_sheets,
        pieces = plan.total_pieces,
        rejected = plan.rejected.len(),
        utilization = plan.average_utilization,
        "cut layout generated"
    );
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OversizePolicy;
    use crate::types::{Rect, RejectReason};

    fn piece(material: &str, thickness: &str, color: &str, w: u32, d: u32, qty: u32) -> PieceData {
        PieceData::new(material, thickness, color, w, d, qty)
    }

    fn white(w: u32, d: u32, qty: u32) -> PieceData {
        piece("MDF", "18mm", "White", w, d, qty)
    }

    /// Validates a complete plan:
    /// 1. Every piece lies within its sheet
    /// 2. Pieces on a sheet are at least `margin` apart
    /// 3. Area bookkeeping and totals add up
    /// 4. Each sheet holds a single material group
    fn assert_layout_valid(plan: &CutPlanData, margin: u32, expected_pieces: usize) {
        assert_eq!(
            plan.total_pieces, expected_pieces,
            "expected {} pieces placed, got {}",
            expected_pieces, plan.total_pieces
        );
        assert_eq!(plan.total_sheets, plan.sheets.len());

        for sheet in &plan.sheets {
            let si = sheet.index;
            for (pi, p) in sheet.pieces.iter().enumerate() {
                assert_eq!(p.sheet_index, si);
                assert_eq!(p.piece.quantity, 1);
                assert_eq!(p.piece.key(), sheet.key, "sheet {si} mixes materials");
                assert!(
                    p.x + p.piece.width <= sheet.width,
                    "sheet {si}, piece {pi} ({}) exceeds sheet width: x={} + {} > {}",
                    p.rect(),
                    p.x,
                    p.piece.width,
                    sheet.width
                );
                assert!(
                    p.y + p.piece.depth <= sheet.height,
                    "sheet {si}, piece {pi} ({}) exceeds sheet height: y={} + {} > {}",
                    p.rect(),
                    p.y,
                    p.piece.depth,
                    sheet.height
                );
            }

            assert_separated(si, &sheet.pieces, margin);

            let used: u64 = sheet.pieces.iter().map(|p| p.rect().area()).sum();
            assert_eq!(sheet.used_area, used);
            assert_eq!(sheet.used_area + sheet.waste_area, sheet.area());
        }

        let numbers: Vec<usize> = plan
            .sheets
            .iter()
            .flat_map(|s| &s.pieces)
            .map(|p| p.piece_number)
            .collect();
        let mut sorted = numbers.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), numbers.len(), "piece numbers must be unique");
    }

    fn assert_separated(sheet_idx: usize, pieces: &[PlacedPiece], margin: u32) {
        for i in 0..pieces.len() {
            for j in (i + 1)..pieces.len() {
                let a = &pieces[i];
                let b = &pieces[j];

                let apart = a.x + a.piece.width + margin <= b.x
                    || b.x + b.piece.width + margin <= a.x
                    || a.y + a.piece.depth + margin <= b.y
                    || b.y + b.piece.depth + margin <= a.y;

                assert!(
                    apart,
                    "sheet {sheet_idx}: piece {i} ({} @ ({},{})) too close to piece {j} ({} @ ({},{}))",
                    a.rect(),
                    a.x,
                    a.y,
                    b.rect(),
                    b.x,
                    b.y
                );
            }
        }
    }

    #[test]
    fn test_empty_input() {
        let plan = generate_cut_layout(&[], &LayoutConfig::default()).unwrap();
        assert_eq!(plan.total_sheets, 0);
        assert_eq!(plan.total_pieces, 0);
        assert_eq!(plan.total_used_area, 0);
        assert_eq!(plan.total_waste_area, 0);
        assert_eq!(plan.total_cut_length, 0);
        assert_eq!(plan.average_utilization, 0.0);
    }

    #[test]
    fn test_six_pieces_one_sheet() {
        let pieces = vec![white(800, 400, 4), white(600, 300, 2)];
        let plan = generate_cut_layout(&pieces, &LayoutConfig::default()).unwrap();
        assert_layout_valid(&plan, 5, 6);
        assert_eq!(plan.total_sheets, 1);
        assert_eq!(plan.total_used_area, 1_640_000);
        assert!((plan.average_utilization - 32.588).abs() < 0.01);
        assert_eq!(plan.total_cut_length, 4 * 2400 + 2 * 1800);
    }

    #[test]
    fn test_first_piece_at_origin_unrotated() {
        let pieces = vec![white(800, 400, 1)];
        let plan = generate_cut_layout(&pieces, &LayoutConfig::default()).unwrap();
        let p = &plan.sheets[0].pieces[0];
        assert_eq!((p.x, p.y), (0, 0));
        assert_eq!(p.rotation, Rotation::None);
        assert_eq!(p.piece_number, 1);
    }

    #[test]
    fn test_oversized_piece_aborts() {
        let mut big = white(3000, 500, 1);
        big.description = "Worktop".to_string();
        let pieces = vec![white(800, 400, 1), big];
        let err = generate_cut_layout(&pieces, &LayoutConfig::default()).unwrap_err();
        match err {
            LayoutError::PieceTooLarge { piece, sheet } => {
                assert_eq!(piece.width, 3000);
                assert_eq!(piece.description, "Worktop");
                assert_eq!(sheet, Rect::new(2750, 1830));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_oversized_piece_skipped() {
        let config = LayoutConfig::default().with_oversize_policy(OversizePolicy::Skip);
        let pieces = vec![white(800, 400, 2), white(3000, 500, 1)];
        let plan = generate_cut_layout(&pieces, &config).unwrap();
        assert_layout_valid(&plan, 5, 2);
        assert_eq!(plan.rejected.len(), 1);
        assert_eq!(plan.rejected[0].reason, RejectReason::TooLarge);
        assert_eq!(plan.rejected[0].piece.width, 3000);
    }

    #[test]
    fn test_oversized_row_skipped_conserves_quantity() {
        let config = LayoutConfig::default().with_oversize_policy(OversizePolicy::Skip);
        let pieces = vec![white(800, 400, 3), white(3000, 500, 5), white(0, 400, 2)];
        let plan = generate_cut_layout(&pieces, &config).unwrap();
        assert_layout_valid(&plan, 5, 3);

        // one entry per input row, quantity intact
        assert_eq!(plan.rejected.len(), 2);
        let too_large: Vec<_> = plan
            .rejected
            .iter()
            .filter(|r| r.reason == RejectReason::TooLarge)
            .collect();
        assert_eq!(too_large.len(), 1);
        assert_eq!(too_large[0].piece.quantity, 5);

        let requested: u32 = pieces.iter().map(|p| p.quantity).sum();
        let rejected: u32 = plan.rejected.iter().map(|r| r.piece.quantity).sum();
        assert_eq!(plan.total_pieces as u32 + rejected, requested);
    }

    #[test]
    fn test_huge_oversized_row_rejected_once() {
        let config = LayoutConfig::default().with_oversize_policy(OversizePolicy::Skip);
        let pieces = vec![white(3000, 500, 2_000_000)];
        let plan = generate_cut_layout(&pieces, &config).unwrap();
        assert_eq!(plan.total_sheets, 0);
        assert_eq!(plan.rejected.len(), 1);
        assert_eq!(plan.rejected[0].piece.quantity, 2_000_000);
    }

    #[test]
    fn test_unit_budget_checked_before_expansion() {
        let pieces = vec![white(100, 100, u32::MAX)];
        let err = generate_cut_layout(&pieces, &LayoutConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            LayoutError::TooManyUnits {
                units: 4_294_967_295,
                limit: 100_000
            }
        ));

        let config = LayoutConfig::default().with_max_units(6);
        let pieces = vec![white(800, 400, 4), white(600, 300, 2)];
        assert_eq!(generate_cut_layout(&pieces, &config).unwrap().total_pieces, 6);
        let pieces = vec![white(800, 400, 4), white(600, 300, 3)];
        assert!(generate_cut_layout(&pieces, &config).is_err());
    }

    #[test]
    fn test_fits_only_when_rotated() {
        // 2000 is too tall for the 1830 side, but fine along the 2750 side
        let pieces = vec![white(500, 2000, 1)];
        let plan = generate_cut_layout(&pieces, &LayoutConfig::default()).unwrap();
        assert_layout_valid(&plan, 5, 1);
        let p = &plan.sheets[0].pieces[0];
        assert!(p.is_rotated());
        assert_eq!((p.piece.width, p.piece.depth), (2000, 500));

        let no_rotate = LayoutConfig::default().with_rotation(false);
        assert!(generate_cut_layout(&pieces, &no_rotate).is_err());
    }

    #[test]
    fn test_full_sheet_piece() {
        let pieces = vec![white(2750, 1830, 2)];
        let plan = generate_cut_layout(&pieces, &LayoutConfig::default()).unwrap();
        assert_layout_valid(&plan, 5, 2);
        assert_eq!(plan.total_sheets, 2);
        assert!(plan.sheets.iter().all(|s| s.waste_area == 0));
        assert!((plan.average_utilization - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_pieces_skipped() {
        let pieces = vec![white(0, 400, 1), white(800, 400, 0), white(800, 400, 1)];
        let plan = generate_cut_layout(&pieces, &LayoutConfig::default()).unwrap();
        assert_layout_valid(&plan, 5, 1);
        assert_eq!(plan.rejected.len(), 2);
        assert!(
            plan.rejected
                .iter()
                .all(|r| r.reason == RejectReason::Malformed)
        );
    }

    #[test]
    fn test_two_material_groups_never_mix() {
        let pieces = vec![
            piece("MDF", "18mm", "White", 1200, 800, 3),
            piece("MDF", "15mm", "Black", 1200, 800, 2),
        ];
        let config = LayoutConfig::default();
        let plan = generate_cut_layout(&pieces, &config).unwrap();
        assert_layout_valid(&plan, 5, 5);

        let white_only = generate_cut_layout(&pieces[..1], &config).unwrap();
        let black_only = generate_cut_layout(&pieces[1..], &config).unwrap();
        assert_eq!(
            plan.total_sheets,
            white_only.total_sheets + black_only.total_sheets
        );

        // groups stay contiguous and in input order
        let thicknesses: Vec<&str> = plan
            .sheets
            .iter()
            .map(|s| s.key.thickness.as_str())
            .collect();
        let first_black = thicknesses.iter().position(|t| *t == "15mm").unwrap();
        assert!(thicknesses[..first_black].iter().all(|t| *t == "18mm"));
        assert!(thicknesses[first_black..].iter().all(|t| *t == "15mm"));
    }

    #[test]
    fn test_numbering_is_global() {
        let pieces = vec![
            piece("MDF", "18mm", "White", 2000, 1500, 2),
            piece("Oak", "18mm", "Natural", 2000, 1500, 2),
        ];
        let plan = generate_cut_layout(&pieces, &LayoutConfig::default()).unwrap();
        assert_layout_valid(&plan, 5, 4);
        let indices: Vec<usize> = plan.sheets.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        let numbers: Vec<usize> = plan
            .sheets
            .iter()
            .flat_map(|s| &s.pieces)
            .map(|p| p.piece_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_margin_forces_second_sheet() {
        let sheet = Rect::new(100, 100);
        let pieces = vec![white(50, 100, 2)];

        let tight = LayoutConfig::default()
            .with_sheet(sheet)
            .with_cut_margin(0)
            .with_rotation(false);
        let plan = generate_cut_layout(&pieces, &tight).unwrap();
        assert_layout_valid(&plan, 0, 2);
        assert_eq!(plan.total_sheets, 1);

        // 50 + 5 + 50 > 100
        let kerf = tight.clone().with_cut_margin(5);
        let plan = generate_cut_layout(&pieces, &kerf).unwrap();
        assert_layout_valid(&plan, 5, 2);
        assert_eq!(plan.total_sheets, 2);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let pieces = vec![white(800, 400, 3), white(500, 2000, 1)];
        let before = pieces.clone();
        generate_cut_layout(&pieces, &LayoutConfig::default()).unwrap();
        assert_eq!(pieces, before);
    }

    #[test]
    fn test_metadata_carried_through() {
        let mut source = white(800, 400, 1);
        source.edge_top = "X".to_string();
        source.family = "Drawer".to_string();
        source.description = "Front".to_string();
        let plan = generate_cut_layout(&[source], &LayoutConfig::default()).unwrap();
        let placed = &plan.sheets[0].pieces[0].piece;
        assert_eq!(placed.edge_top, "X");
        assert_eq!(placed.family, "Drawer");
        assert_eq!(placed.description, "Front");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = LayoutConfig::default().with_sheet(Rect::new(0, 0));
        let err = generate_cut_layout(&[white(10, 10, 1)], &config).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidConfig(_)));
    }

    fn cabinet_job() -> Vec<PieceData> {
        vec![
            white(720, 560, 8),
            white(1200, 600, 3),
            white(400, 300, 12),
            white(564, 100, 10),
            white(2100, 580, 2),
            white(450, 450, 5),
            piece("MDF", "15mm", "Black", 900, 350, 6),
            piece("MDF", "15mm", "Black", 1800, 400, 2),
            piece("Oak", "19mm", "Natural", 600, 250, 9),
            white(300, 200, 7),
        ]
    }

    #[test]
    fn test_complex_job_conserves_pieces() {
        let pieces = cabinet_job();
        let expected: u32 = pieces.iter().map(|p| p.quantity).sum();
        let plan = generate_cut_layout(&pieces, &LayoutConfig::default()).unwrap();
        assert_layout_valid(&plan, 5, expected as usize);
        assert_eq!(plan.summary().groups.len(), 3);

        // Lower bound per group: total piece area / sheet area
        let sheet_area = LayoutConfig::default().sheet.area();
        for group in group_by_material(&pieces) {
            let area: u64 = group
                .pieces
                .iter()
                .map(|p| p.area() * p.quantity as u64)
                .sum();
            let sheets = plan.sheets.iter().filter(|s| s.key == group.key).count();
            assert!(sheets as u64 >= area.div_ceil(sheet_area));
        }
    }

    #[test]
    fn test_deterministic() {
        let pieces = cabinet_job();
        let config = LayoutConfig::default();
        let a = generate_cut_layout(&pieces, &config).unwrap();
        let b = generate_cut_layout(&pieces, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_small_sheet_many_sheets() {
        let config = LayoutConfig::default()
            .with_sheet(Rect::new(500, 400))
            .with_cut_margin(3);
        let pieces = vec![
            white(200, 150, 8),
            white(300, 200, 6),
            white(150, 100, 7),
            white(250, 180, 5),
            white(400, 300, 6),
        ];
        let plan = generate_cut_layout(&pieces, &config).unwrap();
        assert_layout_valid(&plan, 3, 32);
        assert!(plan.total_sheets >= 6);
    }
}
