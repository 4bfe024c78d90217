//! Sparse probability matrices over a longitude x latitude grid
//!
//! Rows are longitude indices, columns latitude indices, stored in
//! compressed-row form with column indices sorted within each row.
//! Everything that walks the matrix goes through `iter_nonzero`, which
//! streams entries without building an intermediate list.

use std::ops::Range;

#[derive(Debug, Clone, PartialEq)]
pub struct SparseGrid {
    rows: usize,
    cols: usize,
    /// Row `i` occupies `indices[indptr[i]..indptr[i + 1]]`
    indptr: Vec<usize>,
    indices: Vec<u32>,
    data: Vec<f64>,
}

impl SparseGrid {
    /// An all-zero matrix
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            indptr: vec![0; rows + 1],
            indices: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Build from coordinate triplets in any order. Duplicate
    /// coordinates are summed; out-of-range coordinates are dropped.
    pub fn from_triplets(rows: usize, cols: usize, is: &[usize], js: &[usize], vs: &[f64]) -> Self {
        let n = is.len().min(js.len()).min(vs.len());
        let mut counts = vec![0usize; rows + 1];
        for k in 0..n {
            if is[k] < rows && js[k] < cols {
                counts[is[k] + 1] += 1;
            }
        }
        for i in 0..rows {
            counts[i + 1] += counts[i];
        }
        let indptr = counts.clone();
        let mut next = counts;
        let total = indptr[rows];
        let mut indices = vec![0u32; total];
        let mut data = vec![0.0; total];
        for k in 0..n {
            let (i, j) = (is[k], js[k]);
            if i < rows && j < cols {
                let slot = next[i];
                indices[slot] = j as u32;
                data[slot] = vs[k];
                next[i] += 1;
            }
        }

        let mut grid = Self { rows, cols, indptr, indices, data };
        grid.sort_and_merge_rows();
        grid
    }

    /// Build from a dense matrix given as a list of rows
    pub fn from_dense(dense: &[Vec<f64>]) -> Self {
        let rows = dense.len();
        let cols = dense.iter().map(Vec::len).max().unwrap_or(0);
        let mut indptr = Vec::with_capacity(rows + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);
        for row in dense {
            for (j, &v) in row.iter().enumerate() {
                if v != 0.0 {
                    indices.push(j as u32);
                    data.push(v);
                }
            }
            indptr.push(indices.len());
        }
        Self { rows, cols, indptr, indices, data }
    }

    fn sort_and_merge_rows(&mut self) {
        let mut new_indptr = Vec::with_capacity(self.rows + 1);
        let mut new_indices = Vec::with_capacity(self.indices.len());
        let mut new_data = Vec::with_capacity(self.data.len());
        new_indptr.push(0);
        for i in 0..self.rows {
            let range = self.indptr[i]..self.indptr[i + 1];
            let mut entries: Vec<(u32, f64)> = self.indices[range.clone()]
                .iter()
                .copied()
                .zip(self.data[range].iter().copied())
                .collect();
            entries.sort_by_key(|&(j, _)| j);
            for (j, v) in entries {
                if new_indices.len() > new_indptr[i] && new_indices.last() == Some(&j) {
                    if let Some(last) = new_data.last_mut() {
                        *last += v;
                    }
                } else {
                    new_indices.push(j);
                    new_data.push(v);
                }
            }
            new_indptr.push(new_indices.len());
        }
        self.indptr = new_indptr;
        self.indices = new_indices;
        self.data = new_data;
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        if i >= self.rows || j >= self.cols {
            return 0.0;
        }
        let range = self.indptr[i]..self.indptr[i + 1];
        match self.indices[range.clone()].binary_search(&(j as u32)) {
            Ok(pos) => self.data[range.start + pos],
            Err(_) => 0.0,
        }
    }

    /// Stream (row, column, value) for every stored entry, row-major.
    /// Calling again restarts from the beginning.
    pub fn iter_nonzero(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.rows).flat_map(move |i| {
            let range = self.indptr[i]..self.indptr[i + 1];
            self.indices[range.clone()]
                .iter()
                .zip(self.data[range].iter())
                .map(move |(&j, &v)| (i, j as usize, v))
        })
    }

    /// Multiply every entry by `factor`
    pub fn scale(&mut self, factor: f64) {
        for v in &mut self.data {
            *v *= factor;
        }
    }

    /// Drop stored entries that are exactly zero
    pub fn eliminate_zeros(&mut self) {
        let mut write = 0;
        let mut start = 0;
        for i in 0..self.rows {
            let end = self.indptr[i + 1];
            for k in start..end {
                if self.data[k] != 0.0 {
                    self.indices[write] = self.indices[k];
                    self.data[write] = self.data[k];
                    write += 1;
                }
            }
            start = end;
            self.indptr[i + 1] = write;
        }
        self.indices.truncate(write);
        self.data.truncate(write);
    }

    /// Keep only entries with row in `rows` and column in `cols`. This
    /// equals an element-wise product with the 0/1 mask of that
    /// rectangle, without building the mask.
    pub fn restrict(&self, rows: Range<usize>, cols: Range<usize>) -> Self {
        let mut indptr = Vec::with_capacity(self.rows + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);
        for i in 0..self.rows {
            if rows.contains(&i) {
                let range = self.indptr[i]..self.indptr[i + 1];
                let row = &self.indices[range.clone()];
                let lo = row.partition_point(|&j| (j as usize) < cols.start);
                let hi = row.partition_point(|&j| (j as usize) < cols.end);
                indices.extend_from_slice(&row[lo..hi]);
                data.extend_from_slice(&self.data[range.start + lo..range.start + hi]);
            }
            indptr.push(indices.len());
        }
        Self { rows: self.rows, cols: self.cols, indptr, indices, data }
    }

    /// Element-wise product. Only entries stored in both matrices survive.
    pub fn multiply(&self, other: &SparseGrid) -> Self {
        let mut indptr = Vec::with_capacity(self.rows + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);
        for i in 0..self.rows.min(other.rows) {
            let (a0, a1) = (self.indptr[i], self.indptr[i + 1]);
            let (b0, b1) = (other.indptr[i], other.indptr[i + 1]);
            let (mut a, mut b) = (a0, b0);
            while a < a1 && b < b1 {
                let (ja, jb) = (self.indices[a], other.indices[b]);
                if ja == jb {
                    indices.push(ja);
                    data.push(self.data[a] * other.data[b]);
                    a += 1;
                    b += 1;
                } else if ja < jb {
                    a += 1;
                } else {
                    b += 1;
                }
            }
            indptr.push(indices.len());
        }
        while indptr.len() < self.rows + 1 {
            indptr.push(indices.len());
        }
        Self { rows: self.rows, cols: self.cols, indptr, indices, data }
    }

    /// True when both matrices store entries at exactly the same positions
    pub fn same_pattern(&self, other: &SparseGrid) -> bool {
        self.shape() == other.shape() && self.indptr == other.indptr && self.indices == other.indices
    }

    /// True when every stored value is close to the first one, with
    /// |v - first| <= atol + rtol * |first|
    pub fn is_nearly_uniform(&self, rtol: f64, atol: f64) -> bool {
        match self.data.first() {
            None => true,
            Some(&first) => self.data.iter().all(|&v| (v - first).abs() <= atol + rtol * first.abs()),
        }
    }

    pub fn transpose(&self) -> Self {
        let mut is = Vec::with_capacity(self.nnz());
        let mut js = Vec::with_capacity(self.nnz());
        let mut vs = Vec::with_capacity(self.nnz());
        for (i, j, v) in self.iter_nonzero() {
            is.push(j);
            js.push(i);
            vs.push(v);
        }
        Self::from_triplets(self.cols, self.rows, &is, &js, &vs)
    }

    /// Smallest and largest (row, column) holding a positive entry:
    /// (min_row, max_row, min_col, max_col)
    pub fn positive_extent(&self) -> Option<(usize, usize, usize, usize)> {
        let mut extent: Option<(usize, usize, usize, usize)> = None;
        for (i, j, v) in self.iter_nonzero() {
            if v > 0.0 {
                extent = Some(match extent {
                    None => (i, i, j, j),
                    Some((i0, i1, j0, j1)) => (i0.min(i), i1.max(i), j0.min(j), j1.max(j)),
                });
            }
        }
        extent
    }
}
