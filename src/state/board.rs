//! Interactive and randomized construction of 5x5 Bingo boards.

use rand::seq::SliceRandom;

/// Number of cells on a board.
pub const CELL_COUNT: usize = 25;
/// Highest cell value; boards hold a permutation of `1..=MAX_VALUE`.
pub const MAX_VALUE: u8 = 25;

/// A finalized board: a permutation of `1..=25` in row-major order.
pub type FinalBoard = [u8; CELL_COUNT];

/// A board under construction, filled one cell at a time or all at once.
///
/// Cells start empty and receive sequential values as the owner taps them
/// during setup. A board is only published once it is a full permutation;
/// incomplete boards are completed by [`Board::finalize_or_shuffle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Board {
    cells: [Option<u8>; CELL_COUNT],
}

impl Default for Board {
    fn default() -> Self {
        Self {
            cells: [None; CELL_COUNT],
        }
    }
}

impl Board {
    /// Empty board with no cells filled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a board from an already-finalized layout.
    pub fn from_final(layout: FinalBoard) -> Self {
        let mut cells = [None; CELL_COUNT];
        for (cell, value) in cells.iter_mut().zip(layout) {
            *cell = Some(value);
        }
        Self { cells }
    }

    /// Uniformly random full permutation of `1..=25`.
    pub fn shuffled() -> Self {
        Self::from_final(shuffled_layout())
    }

    /// Place the next sequential value into the cell at `index`.
    ///
    /// No-op when the cell is already occupied, when all 25 values have been
    /// placed, or when `index` is out of range. Never fails.
    pub fn fill_next_cell(&mut self, index: usize) {
        let Some(cell) = self.cells.get(index) else {
            return;
        };
        if cell.is_some() {
            return;
        }

        let next = self.filled_count() as u8 + 1;
        if next > MAX_VALUE {
            return;
        }

        self.cells[index] = Some(next);
    }

    /// Number of cells that currently hold a value.
    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    /// Whether all 25 cells are filled.
    pub fn is_complete(&self) -> bool {
        self.filled_count() == CELL_COUNT
    }

    /// Raw cell contents, `None` for unfilled positions.
    pub fn cells(&self) -> &[Option<u8>; CELL_COUNT] {
        &self.cells
    }

    /// The finalized layout, if the board is complete.
    pub fn finalized(&self) -> Option<FinalBoard> {
        if !self.is_complete() {
            return None;
        }

        let mut layout = [0u8; CELL_COUNT];
        for (slot, cell) in layout.iter_mut().zip(&self.cells) {
            *slot = (*cell)?;
        }
        Some(layout)
    }

    /// The finalized layout, replacing an incomplete board with a fresh
    /// shuffle so gameplay never starts with empty cells.
    pub fn finalize_or_shuffle(&mut self) -> FinalBoard {
        if let Some(layout) = self.finalized() {
            return layout;
        }

        let layout = shuffled_layout();
        *self = Self::from_final(layout);
        layout
    }
}

/// Whether `layout` is a bijection over `1..=25`.
pub fn is_permutation(layout: &FinalBoard) -> bool {
    let mut seen = [false; CELL_COUNT];
    for &value in layout {
        if value == 0 || value > MAX_VALUE {
            return false;
        }
        let slot = &mut seen[usize::from(value) - 1];
        if *slot {
            return false;
        }
        *slot = true;
    }
    true
}

fn shuffled_layout() -> FinalBoard {
    let mut layout = [0u8; CELL_COUNT];
    for (slot, value) in layout.iter_mut().zip(1..=MAX_VALUE) {
        *slot = value;
    }
    let mut rng = rand::rng();
    layout.shuffle(&mut rng);
    layout
}
