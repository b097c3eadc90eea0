use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, LayoutError};
use crate::types::Rect;

pub const DEFAULT_SHEET_WIDTH: u32 = 2750;
pub const DEFAULT_SHEET_HEIGHT: u32 = 1830;
pub const DEFAULT_CUT_MARGIN: u32 = 5;
pub const DEFAULT_MAX_UNITS: u64 = 100_000;

/// What to do with a piece that cannot fit on a sheet in either orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OversizePolicy {
    /// Fail the whole run.
    #[default]
    Abort,
    /// Report the piece in `CutPlanData::rejected` and keep packing.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    /// Standard raw sheet, used for every sheet in a run.
    pub sheet: Rect,
    /// Saw kerf reserved between pieces.
    pub cut_margin: u32,
    pub allow_rotate: bool,
    pub oversize_policy: OversizePolicy,
    /// Free rectangles with a side shorter than this are dropped.
    pub min_free_side: u32,
    /// Upper bound on free rectangles tracked per sheet.
    pub max_free_rects: usize,
    /// Upper bound on the summed quantity of all placeable rows in one run.
    pub max_units: u64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            sheet: Rect::new(DEFAULT_SHEET_WIDTH, DEFAULT_SHEET_HEIGHT),
            cut_margin: DEFAULT_CUT_MARGIN,
            allow_rotate: true,
            oversize_policy: OversizePolicy::Abort,
            min_free_side: 1,
            max_free_rects: 4096,
            max_units: DEFAULT_MAX_UNITS,
        }
    }
}

impl LayoutConfig {
    pub fn with_sheet(mut self, sheet: Rect) -> Self {
        self.sheet = sheet;
        self
    }

    pub fn with_cut_margin(mut self, margin: u32) -> Self {
        self.cut_margin = margin;
        self
    }

    pub fn with_rotation(mut self, allow_rotate: bool) -> Self {
        self.allow_rotate = allow_rotate;
        self
    }

    pub fn with_oversize_policy(mut self, policy: OversizePolicy) -> Self {
        self.oversize_policy = policy;
        self
    }

    pub fn with_max_units(mut self, max_units: u64) -> Self {
        self.max_units = max_units;
        self
    }

    /// Whether `piece` fits an empty sheet in some allowed orientation.
    pub fn fits_sheet(&self, piece: Rect) -> bool {
        piece.fits_in(&self.sheet) || (self.allow_rotate && piece.rotated().fits_in(&self.sheet))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: LayoutConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.sheet.w == 0 || self.sheet.h == 0 {
            return Err(LayoutError::InvalidConfig(format!(
                "sheet dimensions must be non-zero, got {}",
                self.sheet
            )));
        }
        if self.cut_margin >= self.sheet.w.min(self.sheet.h) {
            return Err(LayoutError::InvalidConfig(format!(
                "cut margin {} leaves no usable space on a {} sheet",
                self.cut_margin, self.sheet
            )));
        }
        if self.max_free_rects == 0 {
            return Err(LayoutError::InvalidConfig(
                "maxFreeRects must be at least 1".to_string(),
            ));
        }
        if self.max_units == 0 {
            return Err(LayoutError::InvalidConfig(
                "maxUnits must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
