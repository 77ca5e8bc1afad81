//! Win detection over the fixed 5x5 line table.

use std::collections::HashSet;

use crate::state::board::FinalBoard;

/// Number of fixed winning lines on a 5x5 board.
pub const LINE_COUNT: usize = 12;

/// Completed lines required to win the game: all of B-I-N-G-O.
pub const LINES_TO_WIN: usize = 5;

/// The 12 winning lines over row-major cell indices: 5 rows, 5 columns,
/// and the two diagonals.
pub const LINES: [[usize; 5]; LINE_COUNT] = [
    [0, 1, 2, 3, 4],
    [5, 6, 7, 8, 9],
    [10, 11, 12, 13, 14],
    [15, 16, 17, 18, 19],
    [20, 21, 22, 23, 24],
    [0, 5, 10, 15, 20],
    [1, 6, 11, 16, 21],
    [2, 7, 12, 17, 22],
    [3, 8, 13, 18, 23],
    [4, 9, 14, 19, 24],
    [0, 6, 12, 18, 24],
    [4, 8, 12, 16, 20],
];

/// Count how many lines are fully contained in the marked-cell set.
///
/// Pure and order-independent; the result is always in `0..=12`.
pub fn completed_lines(marked: &HashSet<usize>) -> usize {
    LINES
        .iter()
        .filter(|line| line.iter().all(|index| marked.contains(index)))
        .count()
}

/// Cell indices of `board` whose values appear in the shared picked sequence.
pub fn marked_indices(board: &FinalBoard, picked: &[u8]) -> HashSet<usize> {
    board
        .iter()
        .enumerate()
        .filter(|(_, value)| picked.contains(value))
        .map(|(index, _)| index)
        .collect()
}
