//! Cached lookup table with 1D and 2D interpolation.
//!
//! Storage is a `(rows + 1) x (cols + 1)` matrix. A 1D table (`cols == 1`)
//! holds keys in column 0 and values in column 1, starting at row 1. A 2D
//! table holds column keys in row 0, row keys in column 0 and values in the
//! interior. Values are streamed in row-major order with [`Table::push`].
//!
//! Queries remember the last bracketing row/column and search outward from
//! there, so slowly varying keys resolve in O(1) on average.

use crate::{CoreError, CoreResult, Real};
use nalgebra::DMatrix;
use std::cell::Cell;

#[derive(Clone, Debug)]
pub struct Table {
    rows: usize,
    cols: usize,
    data: DMatrix<Real>,
    write_row: usize,
    write_col: usize,
    last_row: Cell<usize>,
    last_col: Cell<usize>,
}

#[inline]
fn lerp(a: Real, b: Real, f: Real) -> Real {
    (1.0 - f) * a + f * b
}

#[inline]
fn factor(key: Real, lo: Real, hi: Real) -> Real {
    let span = hi - lo;
    if span == 0.0 {
        return 1.0;
    }
    ((key - lo) / span).clamp(0.0, 1.0)
}

impl Table {
    pub fn new(rows: usize, cols: usize) -> CoreResult<Self> {
        if rows < 2 || cols == 0 {
            return Err(CoreError::InvalidArg {
                what: "table needs at least two rows and one column",
            });
        }
        let one_d = cols == 1;
        Ok(Self {
            rows,
            cols,
            data: DMatrix::zeros(rows + 1, cols + 1),
            write_row: if one_d { 1 } else { 0 },
            write_col: if one_d { 0 } else { 1 },
            last_row: Cell::new(2),
            last_col: Cell::new(2),
        })
    }

    /// Build a table and stream `values` into it.
    pub fn from_values(rows: usize, cols: usize, values: &[Real]) -> CoreResult<Self> {
        let mut table = Self::new(rows, cols)?;
        for &v in values {
            table.push(v)?;
        }
        Ok(table)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_one_d(&self) -> bool {
        self.cols == 1
    }

    pub fn is_full(&self) -> bool {
        self.write_row > self.rows
    }

    /// Append the next value in row-major order.
    pub fn push(&mut self, v: Real) -> CoreResult<&mut Self> {
        if self.is_full() {
            return Err(CoreError::TableFull {
                capacity: self.data.len(),
            });
        }
        self.data[(self.write_row, self.write_col)] = v;
        if self.write_col >= self.cols {
            self.write_col = 0;
            self.write_row += 1;
        } else {
            self.write_col += 1;
        }
        Ok(self)
    }

    fn bracket_row(&self, key: Real) -> usize {
        let mut r = self.last_row.get().clamp(2, self.rows);
        while r > 2 && self.data[(r - 1, 0)] > key {
            r -= 1;
        }
        while r < self.rows && self.data[(r, 0)] < key {
            r += 1;
        }
        self.last_row.set(r);
        r
    }

    fn bracket_col(&self, key: Real) -> usize {
        let mut c = self.last_col.get().clamp(2, self.cols);
        while c > 2 && self.data[(0, c - 1)] > key {
            c -= 1;
        }
        while c < self.cols && self.data[(0, c)] < key {
            c += 1;
        }
        self.last_col.set(c);
        c
    }

    /// Piecewise-linear lookup, clamped to the first/last value.
    pub fn value(&self, key: Real) -> Real {
        if key <= self.data[(1, 0)] {
            self.last_row.set(2);
            return self.data[(1, 1)];
        }
        if key >= self.data[(self.rows, 0)] {
            self.last_row.set(self.rows);
            return self.data[(self.rows, 1)];
        }
        let r = self.bracket_row(key);
        let f = factor(key, self.data[(r - 1, 0)], self.data[(r, 0)]);
        lerp(self.data[(r - 1, 1)], self.data[(r, 1)], f)
    }

    /// Bilinear lookup, clamped in each axis.
    pub fn value_2d(&self, row_key: Real, col_key: Real) -> Real {
        if self.cols < 2 {
            return self.value(row_key);
        }
        let r = self.bracket_row(row_key);
        let c = self.bracket_col(col_key);

        let rf = factor(row_key, self.data[(r - 1, 0)], self.data[(r, 0)]);
        let cf = factor(col_key, self.data[(0, c - 1)], self.data[(0, c)]);

        let lo = lerp(self.data[(r - 1, c - 1)], self.data[(r, c - 1)], rf);
        let hi = lerp(self.data[(r - 1, c)], self.data[(r, c)], rf);
        lerp(lo, hi, cf)
    }
}
