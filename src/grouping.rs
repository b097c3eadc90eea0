use std::collections::HashMap;

use tracing::warn;

use crate::config::{LayoutConfig, OversizePolicy};
use crate::error::{LayoutError, Result};
use crate::types::{MaterialKey, PieceData, RejectReason, RejectedPiece};

/// Pieces cut from the same stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialGroup<'a> {
    pub key: MaterialKey,
    pub pieces: Vec<&'a PieceData>,
}

/// Partitions `pieces` by material, thickness and color.
///
/// Groups come out in the order their first piece appears in the input and
/// each group keeps the input order of its pieces.
pub fn group_by_material<'a, I>(pieces: I) -> Vec<MaterialGroup<'a>>
where
    I: IntoIterator<Item = &'a PieceData>,
{
    let mut groups: Vec<MaterialGroup<'a>> = Vec::new();
    let mut index: HashMap<MaterialKey, usize> = HashMap::new();

    for piece in pieces {
        let key = piece.key();
        match index.get(&key) {
            Some(&gi) => groups[gi].pieces.push(piece),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(MaterialGroup {
                    key,
                    pieces: vec![piece],
                });
            }
        }
    }

    groups
}

/// One owned copy per requested unit, each with `quantity == 1`.
pub fn expand_quantities<'a, I>(pieces: I) -> Vec<PieceData>
where
    I: IntoIterator<Item = &'a PieceData>,
{
    let mut expanded = Vec::new();
    for piece in pieces {
        for _ in 0..piece.quantity {
            expanded.push(PieceData {
                quantity: 1,
                ..piece.clone()
            });
        }
    }
    expanded
}

/// Largest first. The sort is stable so equal areas keep input order.
pub fn sort_by_area_desc(pieces: &mut [PieceData]) {
    pieces.sort_by(|a, b| b.area().cmp(&a.area()));
}

/// Splits off rows no placement could honour, one rejection per row with
/// its quantity intact:
///
/// - zero width, depth or quantity, always skipped
/// - larger than the sheet in both orientations, skipped or fatal per
///   [`OversizePolicy`]
///
/// Runs before any quantity is expanded, and fails with
/// [`LayoutError::TooManyUnits`] when the remaining rows ask for more units
/// than `config.max_units`.
pub fn screen_pieces<'a>(
    pieces: &'a [PieceData],
    config: &LayoutConfig,
) -> Result<(Vec<&'a PieceData>, Vec<RejectedPiece>)> {
    let mut valid = Vec::with_capacity(pieces.len());
    let mut rejected = Vec::new();
    let mut units: u64 = 0;

    for piece in pieces {
        if piece.width == 0 || piece.depth == 0 || piece.quantity == 0 {
            warn!(
                piece = %piece.rect(),
                quantity = piece.quantity,
                material = %piece.key(),
                "skipping malformed piece"
            );
            rejected.push(RejectedPiece {
                piece: piece.clone(),
                reason: RejectReason::Malformed,
            });
            continue;
        }

        if !config.fits_sheet(piece.rect()) {
            if config.oversize_policy == OversizePolicy::Abort {
                return Err(LayoutError::PieceTooLarge {
                    piece: Box::new(piece.clone()),
                    sheet: config.sheet,
                });
            }
            warn!(
                piece = %piece.rect(),
                quantity = piece.quantity,
                sheet = %config.sheet,
                description = %piece.description,
                "skipping piece larger than the sheet"
            );
            rejected.push(RejectedPiece {
                piece: piece.clone(),
                reason: RejectReason::TooLarge,
            });
            continue;
        }

        units += piece.quantity as u64;
        valid.push(piece);
    }

    if units > config.max_units {
        return Err(LayoutError::TooManyUnits {
            units,
            limit: config.max_units,
        });
    }
    Ok((valid, rejected))
}
