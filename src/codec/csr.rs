// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Row-compressed sparse matrices.
//!
//! [`CsrMatrix`] is the canonical input of the codec and the reference the
//! decoded product is checked against.
//!
//! ## Representation
//!
//! ```text
//! row r owns values[row_offset[r] .. row_offset[r + 1]]
//!        and col_index[row_offset[r] .. row_offset[r + 1]]
//! ```
//!
//! Column indices within a row need not be sorted. Column indices are stored
//! as `u32`; the all-ones pattern is reserved for row-advance markers, so a
//! matrix may have at most `u32::MAX` columns.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{CodecError, Result};
use crate::scalar::Scalar;

/// Number of entries printed per array by the `Display` impl.
const DISPLAY_LIMIT: usize = 72;

/// A sparse matrix in compressed sparse row form.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix<T> {
    num_rows: usize,
    num_cols: usize,
    values: Vec<T>,
    col_index: Vec<u32>,
    row_offset: Vec<usize>,
}

impl<T: Scalar> CsrMatrix<T> {
    /// Build a matrix from raw row-compressed arrays.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidMatrix`] if:
    /// - `row_offset.len() != num_rows + 1`
    /// - `row_offset[0] != 0` or offsets decrease
    /// - `row_offset[num_rows] != values.len()`
    /// - `values` and `col_index` differ in length
    /// - any column index is `>= num_cols`
    /// - `num_cols` exceeds the 32-bit index space
    pub fn new(
        num_rows: usize,
        num_cols: usize,
        values: Vec<T>,
        col_index: Vec<u32>,
        row_offset: Vec<usize>,
    ) -> Result<Self> {
        if u32::try_from(num_cols).is_err() {
            return Err(CodecError::InvalidMatrix(format!(
                "{num_cols} columns exceed the 32-bit index space"
            )));
        }
        if row_offset.len() != num_rows + 1 {
            return Err(CodecError::InvalidMatrix(format!(
                "row_offset has {} entries, expected {}",
                row_offset.len(),
                num_rows + 1
            )));
        }
        if values.len() != col_index.len() {
            return Err(CodecError::InvalidMatrix(format!(
                "{} values but {} column indices",
                values.len(),
                col_index.len()
            )));
        }
        if row_offset[0] != 0 {
            return Err(CodecError::InvalidMatrix(format!(
                "row_offset[0] is {}, expected 0",
                row_offset[0]
            )));
        }
        if let Some(r) = row_offset.windows(2).position(|w| w[1] < w[0]) {
            return Err(CodecError::InvalidMatrix(format!(
                "row_offset decreases at row {r}"
            )));
        }
        if row_offset[num_rows] != values.len() {
            return Err(CodecError::InvalidMatrix(format!(
                "row_offset ends at {}, but there are {} non-zeros",
                row_offset[num_rows],
                values.len()
            )));
        }
        if let Some(&col) = col_index.iter().find(|&&c| c as usize >= num_cols) {
            return Err(CodecError::InvalidMatrix(format!(
                "column index {col} out of bounds for {num_cols} columns"
            )));
        }

        Ok(Self {
            num_rows,
            num_cols,
            values,
            col_index,
            row_offset,
        })
    }

    /// An empty matrix with no non-zeros.
    #[must_use]
    pub fn zeros(num_rows: usize, num_cols: usize) -> Self {
        Self {
            num_rows,
            num_cols,
            values: Vec::new(),
            col_index: Vec::new(),
            row_offset: vec![0; num_rows + 1],
        }
    }

    /// Build a matrix from `(row, col, value)` triplets.
    ///
    /// Triplets may arrive in any order; entries of one row keep their
    /// relative order. Duplicates are kept as separate non-zeros.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidMatrix`] if a triplet lies outside the
    /// matrix.
    pub fn from_triplets(
        num_rows: usize,
        num_cols: usize,
        triplets: &[(usize, usize, T)],
    ) -> Result<Self> {
        let mut row_len = vec![0usize; num_rows];
        for &(r, c, _) in triplets {
            if r >= num_rows || c >= num_cols {
                return Err(CodecError::InvalidMatrix(format!(
                    "triplet ({r}, {c}) outside {num_rows}x{num_cols} matrix"
                )));
            }
            row_len[r] += 1;
        }

        let mut row_offset = Vec::with_capacity(num_rows + 1);
        row_offset.push(0);
        for len in &row_len {
            row_offset.push(row_offset[row_offset.len() - 1] + len);
        }

        let nnz = triplets.len();
        let mut values = vec![T::ZERO; nnz];
        let mut col_index = vec![0u32; nnz];
        let mut cursor = row_offset[..num_rows].to_vec();
        for &(r, c, v) in triplets {
            let slot = cursor[r];
            values[slot] = v;
            col_index[slot] = u32::try_from(c).map_err(|_| {
                CodecError::InvalidMatrix(format!("column {c} exceeds the 32-bit index space"))
            })?;
            cursor[r] += 1;
        }

        Self::new(num_rows, num_cols, values, col_index, row_offset)
    }

    /// Matrix with `avg_degree` non-zeros per row laid out on a fixed stride.
    ///
    /// Row `i` holds columns `((i % d) + j * (num_cols / d)) % num_cols` for
    /// `j` in `0..d`, all set to `value`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidMatrix`] if `avg_degree` is zero or
    /// larger than `num_cols`.
    pub fn uniform(num_rows: usize, num_cols: usize, avg_degree: usize, value: T) -> Result<Self> {
        if avg_degree == 0 || avg_degree > num_cols {
            return Err(CodecError::InvalidMatrix(format!(
                "degree {avg_degree} not in 1..={num_cols}"
            )));
        }
        let stride = num_cols / avg_degree;
        let mut col_index = Vec::with_capacity(num_rows * avg_degree);
        for i in 0..num_rows {
            for j in 0..avg_degree {
                col_index.push(index_u32(((i % avg_degree) + j * stride) % num_cols));
            }
        }
        let row_offset = (0..=num_rows).map(|i| i * avg_degree).collect();
        Self::new(
            num_rows,
            num_cols,
            vec![value; num_rows * avg_degree],
            col_index,
            row_offset,
        )
    }

    /// Matrix with a pseudo-random sorted column set in every row.
    ///
    /// Each row gets a degree in `avg_degree - deg_var ..= avg_degree + deg_var - 1`
    /// (or exactly `avg_degree` when `deg_var` is zero). The pattern is a pure
    /// function of `seed`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidMatrix`] if `deg_var > avg_degree` or the
    /// largest possible degree exceeds `num_cols`.
    pub fn random(
        num_rows: usize,
        num_cols: usize,
        avg_degree: usize,
        deg_var: usize,
        value: T,
        seed: u64,
    ) -> Result<Self> {
        if deg_var > avg_degree || avg_degree + deg_var > num_cols {
            return Err(CodecError::InvalidMatrix(format!(
                "degree {avg_degree} +/- {deg_var} does not fit {num_cols} columns"
            )));
        }

        let mut col_index = Vec::with_capacity(num_rows * (avg_degree + deg_var));
        let mut row_offset = Vec::with_capacity(num_rows + 1);
        row_offset.push(0);
        for row in 0..num_rows {
            let degree = if deg_var == 0 {
                avg_degree
            } else {
                let spread = hashed(seed, row as u64, u64::MAX) % (2 * deg_var as u64);
                #[allow(clippy::cast_possible_truncation)]
                {
                    avg_degree - deg_var + spread as usize
                }
            };

            // selection sampling keeps the chosen columns sorted and distinct
            let mut needed = degree;
            for col in 0..num_cols {
                if needed == 0 {
                    break;
                }
                let remaining = (num_cols - col) as u64;
                if hashed(seed, row as u64, col as u64) % remaining < needed as u64 {
                    col_index.push(index_u32(col));
                    needed -= 1;
                }
            }
            row_offset.push(col_index.len());
        }

        let nnz = col_index.len();
        Self::new(num_rows, num_cols, vec![value; nnz], col_index, row_offset)
    }

    /// Fully dense matrix stored in row-compressed form.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidMatrix`] if `num_cols` exceeds the 32-bit
    /// index space.
    pub fn dense(num_rows: usize, num_cols: usize, value: T) -> Result<Self> {
        let col_index = (0..num_rows * num_cols)
            .map(|i| index_u32(i % num_cols))
            .collect();
        let row_offset = (0..=num_rows).map(|i| i * num_cols).collect();
        Self::new(
            num_rows,
            num_cols,
            vec![value; num_rows * num_cols],
            col_index,
            row_offset,
        )
    }

    /// Round the dimensions up to multiples of the given divisors.
    ///
    /// Added rows are empty; added columns hold no non-zeros. This is the
    /// usual way to satisfy the lane divisibility precondition.
    ///
    /// # Panics
    ///
    /// Panics if either divisor is zero.
    #[must_use]
    pub fn round_dim(mut self, row_divisor: usize, col_divisor: usize) -> Self {
        assert!(row_divisor > 0 && col_divisor > 0, "divisors must be positive");
        let new_rows = self.num_rows.next_multiple_of(row_divisor);
        let nnz = self.values.len();
        self.row_offset.resize(new_rows + 1, nnz);
        self.num_rows = new_rows;
        self.num_cols = self.num_cols.next_multiple_of(col_divisor);
        self
    }

    /// Convert every value, keeping the sparsity pattern.
    #[must_use]
    pub fn map_values<U: Scalar>(&self, f: impl Fn(T) -> U) -> CsrMatrix<U> {
        CsrMatrix {
            num_rows: self.num_rows,
            num_cols: self.num_cols,
            values: self.values.iter().map(|&v| f(v)).collect(),
            col_index: self.col_index.clone(),
            row_offset: self.row_offset.clone(),
        }
    }

    /// Direct row-by-row sparse matrix-vector product.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::ShapeMismatch`] if `x.len() != num_cols`.
    pub fn spmv_reference(&self, x: &[T]) -> Result<Vec<T>> {
        if x.len() != self.num_cols {
            return Err(CodecError::ShapeMismatch {
                expected: vec![self.num_cols],
                actual: vec![x.len()],
            });
        }
        let mut y = vec![T::ZERO; self.num_rows];
        for (r, out) in y.iter_mut().enumerate() {
            let (cols, vals) = self.row(r);
            for (&c, &v) in cols.iter().zip(vals) {
                *out = *out + v * x[c as usize];
            }
        }
        Ok(y)
    }
}

impl<T> CsrMatrix<T> {
    /// Number of rows.
    #[must_use]
    pub const fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Number of columns.
    #[must_use]
    pub const fn num_cols(&self) -> usize {
        self.num_cols
    }

    /// Number of stored non-zeros.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Stored values.
    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Stored column indices.
    #[must_use]
    pub fn col_index(&self) -> &[u32] {
        &self.col_index
    }

    /// Row offsets (`num_rows + 1` entries).
    #[must_use]
    pub fn row_offset(&self) -> &[usize] {
        &self.row_offset
    }

    /// Column indices and values of one row.
    ///
    /// # Panics
    ///
    /// Panics if `row >= num_rows`.
    #[must_use]
    pub fn row(&self, row: usize) -> (&[u32], &[T]) {
        assert!(row < self.num_rows, "row {row} out of bounds");
        let range = self.row_offset[row]..self.row_offset[row + 1];
        (&self.col_index[range.clone()], &self.values[range])
    }

    /// Non-zeros in one row.
    ///
    /// # Panics
    ///
    /// Panics if `row >= num_rows`.
    #[must_use]
    pub fn row_nnz(&self, row: usize) -> usize {
        assert!(row < self.num_rows, "row {row} out of bounds");
        self.row_offset[row + 1] - self.row_offset[row]
    }

    /// Fraction of zero entries.
    #[must_use]
    pub fn sparsity(&self) -> f32 {
        let total = self.num_rows * self.num_cols;
        if total == 0 {
            return 1.0;
        }
        // Precision loss acceptable for sparsity metric calculation
        #[allow(clippy::cast_precision_loss)]
        {
            1.0 - (self.nnz() as f32 / total as f32)
        }
    }

    pub(crate) fn from_parts_unchecked(
        num_rows: usize,
        num_cols: usize,
        values: Vec<T>,
        col_index: Vec<u32>,
        row_offset: Vec<usize>,
    ) -> Self {
        debug_assert_eq!(row_offset.len(), num_rows + 1);
        debug_assert_eq!(values.len(), col_index.len());
        Self {
            num_rows,
            num_cols,
            values,
            col_index,
            row_offset,
        }
    }
}

impl<T: fmt::Debug> fmt::Display for CsrMatrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CsrMatrix {}x{} nnz={}", self.num_rows, self.num_cols, self.values.len())?;
        write_truncated(f, "Data       ", &self.values)?;
        write_truncated(f, "Indices    ", &self.col_index)?;
        write_truncated(f, "Row pointer", &self.row_offset)
    }
}

fn write_truncated<V: fmt::Debug>(f: &mut fmt::Formatter<'_>, label: &str, items: &[V]) -> fmt::Result {
    write!(f, "{label}: [")?;
    for item in items.iter().take(DISPLAY_LIMIT) {
        write!(f, "{item:?}, ")?;
    }
    if items.len() > DISPLAY_LIMIT {
        write!(f, "...")?;
    }
    writeln!(f, "]")
}

/// First disagreement between a computed vector and its reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    /// Position of the mismatch, or `None` for a length mismatch.
    pub index: Option<usize>,
    /// Expected value (or length).
    pub expected: String,
    /// Actual value (or length).
    pub actual: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "value mismatch at {i}: expected {}, got {}", self.expected, self.actual),
            None => write!(f, "size mismatch: expected {}, got {}", self.expected, self.actual),
        }
    }
}

/// Compare a computed output against a reference, exactly.
///
/// Returns the first mismatch, or `None` when both vectors are equal.
#[must_use]
pub fn compare_outputs<T: Scalar>(actual: &[T], expected: &[T]) -> Option<Mismatch> {
    if actual.len() != expected.len() {
        return Some(Mismatch {
            index: None,
            expected: expected.len().to_string(),
            actual: actual.len().to_string(),
        });
    }
    actual
        .iter()
        .zip(expected)
        .position(|(a, e)| a != e)
        .map(|i| Mismatch {
            index: Some(i),
            expected: format!("{:?}", expected[i]),
            actual: format!("{:?}", actual[i]),
        })
}

#[allow(clippy::cast_possible_truncation)]
fn index_u32(col: usize) -> u32 {
    // callers only pass indices below a validated `num_cols`
    col as u32
}

fn hashed(seed: u64, row: u64, salt: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    (seed, row, salt).hash(&mut hasher);
    hasher.finish()
}
