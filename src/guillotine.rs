use crate::config::LayoutConfig;
use crate::types::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeRect {
    pub x: u32,
    pub y: u32,
    pub rect: Rect,
}

/// A chosen free rectangle and orientation for one piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fit {
    pub free_idx: usize,
    pub rotated: bool,
    /// Free area left in the rectangle after the piece goes in.
    pub leftover: u64,
}

/// Where a committed piece landed, with its post-rotation footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub rect: Rect,
    pub rotated: bool,
}

/// Free space of the sheet currently being packed.
///
/// Free rectangles never overlap each other. Every piece is placed at the
/// top-left of a free rectangle with `margin` reserved on its right and
/// bottom, so placed pieces are always at least `margin` apart.
#[derive(Debug, Clone)]
pub struct FreeSpaceTracker {
    stock: Rect,
    margin: u32,
    min_side: u32,
    max_rects: usize,
    placed: usize,
    pub free_rects: Vec<FreeRect>,
}

impl FreeSpaceTracker {
    pub fn new(stock: Rect, margin: u32) -> Self {
        Self {
            stock,
            margin,
            min_side: 1,
            max_rects: usize::MAX,
            placed: 0,
            free_rects: vec![FreeRect {
                x: 0,
                y: 0,
                rect: stock,
            }],
        }
    }

    pub fn from_config(config: &LayoutConfig) -> Self {
        Self {
            min_side: config.min_free_side.max(1),
            max_rects: config.max_free_rects.max(1),
            ..Self::new(config.sheet, config.cut_margin)
        }
    }

    /// Back to a single rectangle spanning the whole sheet.
    pub fn reset(&mut self) {
        self.placed = 0;
        self.free_rects.clear();
        self.free_rects.push(FreeRect {
            x: 0,
            y: 0,
            rect: self.stock,
        });
    }

    pub fn is_fresh(&self) -> bool {
        self.placed == 0
    }

    pub fn free_area(&self) -> u64 {
        self.free_rects.iter().map(|f| f.rect.area()).sum()
    }

    /// Best-area fit over every free rectangle and both orientations.
    ///
    /// Ties go to the lowest free-rectangle index, then to the unrotated
    /// orientation.
    pub fn find_best_fit(&self, piece: Rect, allow_rotate: bool) -> Option<Fit> {
        let mut best: Option<Fit> = None;
        let try_rotated = allow_rotate && piece.w != piece.h;

        for (idx, free) in self.free_rects.iter().enumerate() {
            let leftover = free.rect.area().saturating_sub(piece.area());

            if piece.with_margin(self.margin).fits_in(&free.rect)
                && best.is_none_or(|b| leftover < b.leftover)
            {
                best = Some(Fit {
                    free_idx: idx,
                    rotated: false,
                    leftover,
                });
            }
            if try_rotated
                && piece.rotated().with_margin(self.margin).fits_in(&free.rect)
                && best.is_none_or(|b| leftover < b.leftover)
            {
                best = Some(Fit {
                    free_idx: idx,
                    rotated: true,
                    leftover,
                });
            }
        }

        best
    }

    /// Fit at the origin of an untouched sheet, where the piece only has to
    /// fit the sheet itself since the sheet edge needs no kerf.
    pub fn fit_on_empty_sheet(&self, piece: Rect, allow_rotate: bool) -> Option<Fit> {
        if !self.is_fresh() {
            return None;
        }
        if let Some(fit) = self.find_best_fit(piece, allow_rotate) {
            return Some(fit);
        }
        let leftover = self.stock.area().saturating_sub(piece.area());
        if piece.fits_in(&self.stock) {
            Some(Fit {
                free_idx: 0,
                rotated: false,
                leftover,
            })
        } else if allow_rotate && piece.rotated().fits_in(&self.stock) {
            Some(Fit {
                free_idx: 0,
                rotated: true,
                leftover,
            })
        } else {
            None
        }
    }

    /// Places `piece` per `fit` and guillotine-splits what is left of the
    /// rectangle into a right strip, a bottom strip and the corner between.
    pub fn commit(&mut self, fit: Fit, piece: Rect) -> Placement {
        let free = self.free_rects.remove(fit.free_idx);
        let placed = if fit.rotated { piece.rotated() } else { piece };

        self.split(free, placed);
        self.enforce_limit();
        self.placed += 1;

        Placement {
            x: free.x,
            y: free.y,
            rect: placed,
            rotated: fit.rotated,
        }
    }

    fn split(&mut self, free: FreeRect, placed: Rect) {
        let reserved = placed.with_margin(self.margin);
        let right_w = free.rect.w.saturating_sub(reserved.w);
        let bottom_h = free.rect.h.saturating_sub(reserved.h);
        let right_x = free.x.saturating_add(reserved.w);
        let bottom_y = free.y.saturating_add(reserved.h);

        // Right of the piece, as tall as the piece
        self.push_free(FreeRect {
            x: right_x,
            y: free.y,
            rect: Rect::new(right_w, placed.h),
        });
        // Below the piece, as wide as the piece
        self.push_free(FreeRect {
            x: free.x,
            y: bottom_y,
            rect: Rect::new(placed.w, bottom_h),
        });
        // Corner
        self.push_free(FreeRect {
            x: right_x,
            y: bottom_y,
            rect: Rect::new(right_w, bottom_h),
        });
    }

    fn push_free(&mut self, free: FreeRect) {
        if free.rect.w >= self.min_side && free.rect.h >= self.min_side {
            self.free_rects.push(free);
        }
    }

    /// Evicts the smallest rectangles, first one found on equal area.
    fn enforce_limit(&mut self) {
        while self.free_rects.len() > self.max_rects {
            let smallest = self
                .free_rects
                .iter()
                .enumerate()
                .min_by_key(|(i, f)| (f.rect.area(), *i))
                .map(|(i, _)| i);
            match smallest {
                Some(i) => {
                    self.free_rects.remove(i);
                }
                None => break,
            }
        }
    }
}
