//! Dense evidence images and perspective warping

mod warp;

pub use warp::{BilinearWarp, ImageWarp};

/// A dense row-major grid of real-valued evidence, one cell per pixel.
///
/// Rectified and warped event images are carried in this form; counts become
/// fractional once they pass through interpolation.
#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceImage {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl EvidenceImage {
    /// Create a zero-filled image.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Build an image by evaluating `f(row, col)` for every pixel.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                data.push(f(row, col));
            }
        }
        Self { rows, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        (row < self.rows && col < self.cols).then(|| self.data[row * self.cols + col])
    }

    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        if row < self.rows && col < self.cols {
            self.data[row * self.cols + col] = value;
        }
    }

    pub fn sum(&self) -> f32 {
        self.data.iter().sum()
    }

    /// Bilinear sample at column `x`, row `y`. Neighbours outside the image
    /// contribute zero.
    pub fn sample_bilinear(&self, x: f64, y: f64) -> f32 {
        if !x.is_finite() || !y.is_finite() {
            return 0.0;
        }
        if x <= -1.0 || y <= -1.0 || x >= self.cols as f64 || y >= self.rows as f64 {
            return 0.0;
        }

        let x0 = x.floor();
        let y0 = y.floor();
        let ax = x - x0;
        let ay = y - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let mut value = 0.0;
        for (dy, wy) in [(0, 1.0 - ay), (1, ay)] {
            for (dx, wx) in [(0, 1.0 - ax), (1, ax)] {
                let weight = wx * wy;
                if weight == 0.0 {
                    continue;
                }
                let (r, c) = (y0 + dy, x0 + dx);
                if r < 0 || c < 0 || r >= self.rows as i64 || c >= self.cols as i64 {
                    continue;
                }
                value += weight * self.data[r as usize * self.cols + c as usize] as f64;
            }
        }
        value as f32
    }
}
