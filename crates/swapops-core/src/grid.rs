//! Station grid projection
//!
//! Projects a sparse slot list onto the fixed 5-row x 6-column layout of a
//! swap cabinet. Missing coordinates become empty cells, duplicate claims
//! keep the first slot, and out-of-window coordinates are skipped. None of
//! these are errors.
//!
//! The occupied count is computed over the full slot list, independently of
//! the projection.

use crate::types::{BatteryRef, Slot};
use serde::Serialize;

/// Grid rows (coordinate Y)
pub const GRID_ROWS: usize = 5;
/// Grid columns (coordinate X)
pub const GRID_COLS: usize = 6;
/// Status shown on cells without a slot
pub const EMPTY_STATUS: &str = "Empty";

/// One grid position
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    /// 1-based row (coordinate Y)
    pub row: u8,
    /// 1-based column (coordinate X)
    pub col: u8,
    pub slot_id: Option<String>,
    pub status: String,
    pub battery: Option<BatteryRef>,
}

impl Cell {
    fn placeholder(row: u8, col: u8) -> Self {
        Self {
            row,
            col,
            slot_id: None,
            status: EMPTY_STATUS.to_string(),
            battery: None,
        }
    }

    fn from_slot(row: u8, col: u8, slot: &Slot) -> Self {
        Self {
            row,
            col,
            slot_id: Some(slot.slot_id.clone()),
            status: slot.status.clone(),
            battery: slot.battery.clone(),
        }
    }

    /// Whether no slot was projected onto this position
    #[inline]
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.slot_id.is_none()
    }

    /// Whether the cell holds a battery
    #[inline]
    #[must_use]
    pub fn is_occupied(&self) -> bool {
        self.battery.is_some()
    }
}

/// How the slot list mapped onto the grid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridStats {
    /// Cells backed by a slot
    pub filled_cells: usize,
    /// Cells whose slot holds a battery
    pub occupied_cells: usize,
    /// Slots with coordinates outside the grid
    pub out_of_window: usize,
    /// Slots ignored because an earlier slot claimed the same cell
    pub duplicates: usize,
}

/// Fixed 5x6 projection of a station's slots
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationGrid {
    cells: [[Cell; GRID_COLS]; GRID_ROWS],
    /// Slots holding a battery, across the full unprojected list
    pub occupied: usize,
    pub stats: GridStats,
}

impl StationGrid {
    /// Cell at 1-based `row`/`col`; `None` outside the grid
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        if row == 0 || col == 0 {
            return None;
        }
        self.cells.get(row - 1)?.get(col - 1)
    }

    /// Rows top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[Cell; GRID_COLS]> {
        self.cells.iter()
    }

    /// All cells row-major
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().flatten()
    }

    /// Total cell count, always `GRID_ROWS * GRID_COLS`
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        GRID_ROWS * GRID_COLS
    }

    /// Always false; present for API symmetry with `len`
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Number of slots holding a battery
#[must_use]
pub fn occupied_count(slots: &[Slot]) -> usize {
    slots.iter().filter(|s| s.is_occupied()).count()
}

/// 0-based grid index for a slot, if its coordinates are present and in the window
fn grid_index(slot: &Slot) -> Option<(usize, usize)> {
    let col = usize::try_from(slot.coordinate_x?).ok()?;
    let row = usize::try_from(slot.coordinate_y?).ok()?;
    ((1..=GRID_COLS).contains(&col) && (1..=GRID_ROWS).contains(&row)).then(|| (row - 1, col - 1))
}

/// Build the grid; for each cell the first slot claiming it wins
#[must_use]
pub fn build_grid(slots: &[Slot]) -> StationGrid {
    let mut claimed: [[Option<&Slot>; GRID_COLS]; GRID_ROWS] = [[None; GRID_COLS]; GRID_ROWS];
    let mut stats = GridStats::default();

    for slot in slots {
        match grid_index(slot) {
            Some((r, c)) if claimed[r][c].is_none() => claimed[r][c] = Some(slot),
            Some(_) => stats.duplicates += 1,
            None => stats.out_of_window += 1,
        }
    }

    let cells = std::array::from_fn(|r| {
        std::array::from_fn(|c| {
            // indices are bounded by GRID_ROWS/GRID_COLS
            let (row, col) = (r as u8 + 1, c as u8 + 1);
            match claimed[r][c] {
                Some(slot) => Cell::from_slot(row, col, slot),
                None => Cell::placeholder(row, col),
            }
        })
    });

    let grid = StationGrid {
        cells,
        occupied: occupied_count(slots),
        stats,
    };
    let stats = GridStats {
        filled_cells: grid.cells().filter(|c| !c.is_placeholder()).count(),
        occupied_cells: grid.cells().filter(|c| c.is_occupied()).count(),
        ..grid.stats
    };

    if stats.out_of_window > 0 || stats.duplicates > 0 {
        tracing::debug!(
            "Grid projection skipped {} out-of-window and {} duplicate slots",
            stats.out_of_window,
            stats.duplicates
        );
    }
    StationGrid { stats, ..grid }
}
