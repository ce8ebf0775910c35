//! Stack of locked blocks: occupancy, collision, line clear and gravity.

use crate::piece::{BlockColor, Cell};
use std::collections::HashMap;

/// Default playfield width in columns.
pub const COLUMNS: i32 = 10;
/// Default playfield height in rows.
pub const ROWS: i32 = 20;

/// Locked blocks keyed by grid cell. y=0 is top; rows grow downward.
#[derive(Debug, Clone)]
pub struct Stack {
    width: i32,
    height: i32,
    cells: HashMap<Cell, BlockColor>,
}

impl Stack {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            cells: HashMap::new(),
        }
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[cfg(test)]
    pub fn get(&self, cell: Cell) -> Option<BlockColor> {
        self.cells.get(&cell).copied()
    }

    #[inline]
    pub fn is_occupied(&self, cell: Cell) -> bool {
        self.cells.contains_key(&cell)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Cell, BlockColor)> + '_ {
        self.cells.iter().map(|(c, color)| (*c, *color))
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// True if any cell overlaps the stack, sits below the floor, or leaves the side walls.
    /// Rows above the top are allowed: pieces spawn at row 0 and some shapes extend upward.
    pub fn collides(&self, cells: &[Cell]) -> bool {
        cells.iter().any(|c| {
            c.y >= self.height || c.x < 0 || c.x >= self.width || self.is_occupied(*c)
        })
    }

    /// Write piece cells into the stack. Callers validate placement first.
    pub fn lock(&mut self, cells: &[Cell], color: BlockColor) {
        for cell in cells {
            self.cells.insert(*cell, color);
        }
    }

    /// Clear full rows until none remain. Returns the row cleared by each pass, in order.
    pub fn clear_lines(&mut self) -> Vec<i32> {
        let mut cleared = Vec::new();
        while let Some(row) = self.lowest_full_row() {
            self.remove_row(row);
            self.drop_above(row);
            cleared.push(row);
        }
        cleared
    }

    /// Game over if any locked block reached the top row.
    /// Cells above row 0 only exist when a piece locked across the top edge, so they count too.
    pub fn reaches_top(&self) -> bool {
        self.cells.keys().any(|c| c.y <= 0)
    }

    fn row_counts(&self) -> HashMap<i32, i32> {
        let mut counts = HashMap::new();
        for cell in self.cells.keys() {
            *counts.entry(cell.y).or_insert(0) += 1;
        }
        counts
    }

    fn lowest_full_row(&self) -> Option<i32> {
        self.row_counts()
            .into_iter()
            .filter(|&(_, n)| n == self.width)
            .map(|(row, _)| row)
            .max()
    }

    fn remove_row(&mut self, row: i32) {
        for x in 0..self.width {
            self.cells.remove(&Cell::new(x, row));
        }
    }

    /// Gravity after a clear: every cell at or above `row` moves down one row.
    fn drop_above(&mut self, row: i32) {
        self.cells = self
            .cells
            .drain()
            .map(|(c, color)| {
                if c.y <= row {
                    (c.offset(0, 1), color)
                } else {
                    (c, color)
                }
            })
            .collect();
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new(COLUMNS, ROWS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fill_row(stack: &mut Stack, row: i32, color: BlockColor) {
        let cells: Vec<Cell> = (0..stack.width()).map(|x| Cell::new(x, row)).collect();
        stack.lock(&cells, color);
    }

    #[test]
    fn collides_with_walls_floor_and_blocks() {
        let mut stack = Stack::default();
        stack.lock(&[Cell::new(3, 10)], BlockColor::Red);
        assert!(stack.collides(&[Cell::new(-1, 5)]));
        assert!(stack.collides(&[Cell::new(COLUMNS, 5)]));
        assert!(stack.collides(&[Cell::new(0, ROWS)]));
        assert!(stack.collides(&[Cell::new(3, 10)]));
        assert!(!stack.collides(&[Cell::new(3, 9), Cell::new(0, 0), Cell::new(9, 19)]));
    }

    #[test]
    fn rows_above_top_do_not_collide() {
        let stack = Stack::default();
        assert!(!stack.collides(&[Cell::new(4, -2), Cell::new(4, -1)]));
    }

    #[test]
    fn clear_single_row_shifts_cells_above() {
        let mut stack = Stack::default();
        fill_row(&mut stack, 15, BlockColor::Blue);
        stack.lock(&[Cell::new(2, 14), Cell::new(7, 3)], BlockColor::Green);
        stack.lock(&[Cell::new(0, 17), Cell::new(9, 19)], BlockColor::Yellow);

        assert_eq!(stack.clear_lines(), vec![15]);

        assert_eq!(stack.len(), 4);
        assert_eq!(stack.get(Cell::new(2, 15)), Some(BlockColor::Green));
        assert_eq!(stack.get(Cell::new(7, 4)), Some(BlockColor::Green));
        assert_eq!(stack.get(Cell::new(0, 17)), Some(BlockColor::Yellow));
        assert_eq!(stack.get(Cell::new(9, 19)), Some(BlockColor::Yellow));
        assert!(!stack.is_occupied(Cell::new(2, 14)));
    }

    #[test]
    fn two_full_rows_clear_with_cumulative_shift() {
        let mut stack = Stack::default();
        fill_row(&mut stack, 18, BlockColor::Red);
        fill_row(&mut stack, 19, BlockColor::Blue);
        stack.lock(&[Cell::new(4, 16)], BlockColor::Yellow);
        stack.lock(&[Cell::new(6, 17)], BlockColor::Green);

        let cleared = stack.clear_lines();

        assert_eq!(cleared.len(), 2);
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.get(Cell::new(4, 18)), Some(BlockColor::Yellow));
        assert_eq!(stack.get(Cell::new(6, 19)), Some(BlockColor::Green));
    }

    #[test]
    fn separated_full_rows_both_clear() {
        let mut stack = Stack::default();
        fill_row(&mut stack, 12, BlockColor::Red);
        fill_row(&mut stack, 19, BlockColor::Red);
        stack.lock(&[Cell::new(1, 11), Cell::new(1, 15)], BlockColor::Blue);

        assert_eq!(stack.clear_lines().len(), 2);
        // (1,11) sat above both cleared rows; (1,15) only above row 19.
        assert_eq!(stack.get(Cell::new(1, 13)), Some(BlockColor::Blue));
        assert_eq!(stack.get(Cell::new(1, 16)), Some(BlockColor::Blue));
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn completing_bottom_row_with_i_piece() {
        let mut stack = Stack::default();
        let rest: Vec<Cell> = (4..COLUMNS).map(|x| Cell::new(x, 19)).collect();
        stack.lock(&rest, BlockColor::Green);
        stack.lock(
            &[Cell::new(1, 19), Cell::new(2, 19), Cell::new(0, 19), Cell::new(3, 19)],
            BlockColor::Red,
        );

        assert_eq!(stack.clear_lines(), vec![19]);
        assert!(stack.is_empty());
    }

    #[test]
    fn partial_rows_are_left_alone() {
        let mut stack = Stack::default();
        let cells: Vec<Cell> = (0..COLUMNS - 1).map(|x| Cell::new(x, 19)).collect();
        stack.lock(&cells, BlockColor::Red);
        assert!(stack.clear_lines().is_empty());
        assert_eq!(stack.len(), (COLUMNS - 1) as usize);
    }

    #[test]
    fn reaches_top() {
        let mut stack = Stack::default();
        stack.lock(&[Cell::new(0, 1)], BlockColor::Red);
        assert!(!stack.reaches_top());
        stack.lock(&[Cell::new(5, 0)], BlockColor::Red);
        assert!(stack.reaches_top());
    }

    proptest! {
        #[test]
        fn out_of_bounds_stays_out_of_bounds(
            x in -10i32..20,
            y in -5i32..30,
            push in 0i32..10,
        ) {
            let stack = Stack::default();
            let cell = Cell::new(x, y);
            if stack.collides(&[cell]) {
                if x < 0 {
                    prop_assert!(stack.collides(&[cell.offset(-push, 0)]));
                }
                if x >= COLUMNS {
                    prop_assert!(stack.collides(&[cell.offset(push, 0)]));
                }
                if y >= ROWS {
                    prop_assert!(stack.collides(&[cell.offset(0, push)]));
                }
            }
        }

        #[test]
        fn full_row_clears_and_shifts_everything_above(
            row in 1i32..ROWS,
            above in proptest::collection::hash_set((0i32..COLUMNS, 0i32..ROWS), 0..40),
            below in proptest::collection::hash_set((0i32..COLUMNS, 0i32..ROWS), 0..40),
        ) {
            let mut stack = Stack::default();
            fill_row(&mut stack, row, BlockColor::Red);
            // Keep partial rows partial so only `row` is full.
            let above: Vec<Cell> = above
                .into_iter()
                .map(|(x, y)| Cell::new(x, y % row))
                .filter(|c| c.x != 0)
                .collect::<std::collections::HashSet<_>>()
                .into_iter()
                .collect();
            let below: Vec<Cell> = below
                .into_iter()
                .filter(|&(_, y)| y > row)
                .map(|(x, y)| Cell::new(x, y))
                .filter(|c| c.x != 0)
                .collect();
            stack.lock(&above, BlockColor::Blue);
            stack.lock(&below, BlockColor::Green);

            let cleared = stack.clear_lines();

            prop_assert_eq!(cleared, vec![row]);
            prop_assert_eq!(stack.len(), above.len() + below.len());
            for c in &above {
                prop_assert_eq!(stack.get(c.offset(0, 1)), Some(BlockColor::Blue));
            }
            for c in &below {
                prop_assert_eq!(stack.get(*c), Some(BlockColor::Green));
            }
        }
    }
}
