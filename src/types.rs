use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub w: u32,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub h: u32,
}

impl Rect {
    pub fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }

    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }

    pub fn rotated(&self) -> Self {
        Self {
            w: self.h,
            h: self.w,
        }
    }

    pub fn fits_in(&self, other: &Rect) -> bool {
        self.w <= other.w && self.h <= other.h
    }

    /// Grows both sides by `margin`, the footprint a piece reserves on the saw.
    pub fn with_margin(&self, margin: u32) -> Self {
        Self {
            w: self.w.saturating_add(margin),
            h: self.h.saturating_add(margin),
        }
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.w, self.h)
    }
}

/// Accepts `800` as well as `800.0`, since the design-file parsers emit
/// dimensions as JSON floats.
pub fn deserialize_u32_from_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = serde_json::Number::deserialize(deserializer)?;
    if let Some(n) = value.as_u64() {
        return u32::try_from(n).map_err(|_| D::Error::custom(format!("{n} is out of range")));
    }
    match value.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 => Ok(f as u32),
        _ => Err(D::Error::custom(format!(
            "expected a non-negative whole number, got {value}"
        ))),
    }
}

fn default_quantity() -> u32 {
    1
}

/// Stock identity: pieces may only share a sheet when all three match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialKey {
    pub material: String,
    pub thickness: String,
    pub color: String,
}

impl std::fmt::Display for MaterialKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.material, self.thickness, self.color)
    }
}

/// One row of a parsed design file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PieceData {
    pub material: String,
    pub thickness: String,
    pub color: String,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub width: u32,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub depth: u32,
    #[serde(
        default = "default_quantity",
        deserialize_with = "deserialize_u32_from_number"
    )]
    pub quantity: u32,
    /// Edge-banding flags, `""` or `"X"`.
    #[serde(default)]
    pub edge_top: String,
    #[serde(default)]
    pub edge_bottom: String,
    #[serde(default)]
    pub edge_left: String,
    #[serde(default)]
    pub edge_right: String,
    #[serde(default)]
    pub family: String,
    #[serde(default)]
    pub description: String,
}

impl PieceData {
    pub fn new(
        material: &str,
        thickness: &str,
        color: &str,
        width: u32,
        depth: u32,
        quantity: u32,
    ) -> Self {
        Self {
            material: material.to_string(),
            thickness: thickness.to_string(),
            color: color.to_string(),
            width,
            depth,
            quantity,
            ..Default::default()
        }
    }

    pub fn key(&self) -> MaterialKey {
        MaterialKey {
            material: self.material.clone(),
            thickness: self.thickness.clone(),
            color: self.color.clone(),
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.width, self.depth)
    }

    pub fn area(&self) -> u64 {
        self.rect().area()
    }
}

impl std::fmt::Display for PieceData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{} ({} {} {})",
            self.width, self.depth, self.material, self.thickness, self.color
        )?;
        if !self.description.is_empty() {
            write!(f, " \"{}\"", self.description)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum Rotation {
    #[default]
    None,
    Quarter,
}

impl From<Rotation> for u16 {
    fn from(r: Rotation) -> u16 {
        match r {
            Rotation::None => 0,
            Rotation::Quarter => 90,
        }
    }
}

impl TryFrom<u16> for Rotation {
    type Error = String;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Rotation::None),
            90 => Ok(Rotation::Quarter),
            other => Err(format!("rotation must be 0 or 90, got {other}")),
        }
    }
}

/// A unit piece on a sheet. `piece.width`/`piece.depth` are the footprint
/// after rotation and `piece.quantity` is always 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedPiece {
    #[serde(flatten)]
    pub piece: PieceData,
    pub x: u32,
    pub y: u32,
    pub rotation: Rotation,
    pub sheet_index: usize,
    pub piece_number: usize,
}

impl PlacedPiece {
    pub fn rect(&self) -> Rect {
        self.piece.rect()
    }

    pub fn is_rotated(&self) -> bool {
        self.rotation == Rotation::Quarter
    }

    pub fn perimeter(&self) -> u64 {
        2 * (self.piece.width as u64 + self.piece.depth as u64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    pub index: usize,
    pub width: u32,
    pub height: u32,
    #[serde(flatten)]
    pub key: MaterialKey,
    pub pieces: Vec<PlacedPiece>,
    pub used_area: u64,
    pub waste_area: u64,
    pub utilization: f64,
}

impl Sheet {
    pub fn new(index: usize, stock: Rect, key: MaterialKey) -> Self {
        Self {
            index,
            width: stock.w,
            height: stock.h,
            key,
            pieces: Vec::new(),
            used_area: 0,
            waste_area: stock.area(),
            utilization: 0.0,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn push(&mut self, placed: PlacedPiece) {
        self.used_area += placed.rect().area();
        self.waste_area = self.area() - self.used_area;
        self.pieces.push(placed);
    }

    pub fn finalize(&mut self) {
        let area = self.area();
        self.utilization = if area == 0 {
            0.0
        } else {
            self.used_area as f64 / area as f64 * 100.0
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RejectReason {
    /// Zero width, depth or quantity.
    Malformed,
    /// Larger than the sheet in both orientations.
    TooLarge,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedPiece {
    pub piece: PieceData,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CutPlanData {
    pub sheets: Vec<Sheet>,
    pub total_sheets: usize,
    pub total_pieces: usize,
    pub total_used_area: u64,
    pub total_waste_area: u64,
    pub average_utilization: f64,
    pub total_cut_length: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedPiece>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    #[serde(flatten)]
    pub key: MaterialKey,
    pub sheets: usize,
    pub pieces: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub total_sheets: usize,
    pub groups: Vec<GroupSummary>,
}

impl CutPlanData {
    /// Sheet counts per material group, in the order the groups were packed.
    pub fn summary(&self) -> PlanSummary {
        let mut groups: Vec<GroupSummary> = Vec::new();
        for sheet in &self.sheets {
            match groups.last_mut() {
                Some(last) if last.key == sheet.key => {
                    last.sheets += 1;
                    last.pieces += sheet.pieces.len();
                }
                _ => groups.push(GroupSummary {
                    key: sheet.key.clone(),
                    sheets: 1,
                    pieces: sheet.pieces.len(),
                }),
            }
        }
        PlanSummary {
            total_sheets: self.sheets.len(),
            groups,
        }
    }
}
