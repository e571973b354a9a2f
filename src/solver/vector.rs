use std::ops::{Index, IndexMut};

/// Dense column vector of `f32` coefficients.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DenseVector {
    data: Vec<f32>,
}

impl DenseVector {
    /// Zero vector of length `n`.
    pub fn zeros(n: usize) -> Self {
        Self { data: vec![0.0; n] }
    }

    pub fn from_vec(data: Vec<f32>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Overwrite `self` with the contents of `other`.
    pub fn copy_from(&mut self, other: &DenseVector) {
        assert_eq!(self.len(), other.len(), "vector sizes must match");
        self.data.copy_from_slice(&other.data);
    }

    /// `out = a - b`
    pub fn sub(out: &mut DenseVector, a: &DenseVector, b: &DenseVector) {
        assert_eq!(a.len(), b.len(), "vector sizes must match");
        assert_eq!(out.len(), a.len(), "vector sizes must match");
        for ((o, x), y) in out.data.iter_mut().zip(&a.data).zip(&b.data) {
            *o = x - y;
        }
    }

    pub fn dot(&self, other: &DenseVector) -> f32 {
        assert_eq!(self.len(), other.len(), "vector sizes must match");
        self.data.iter().zip(&other.data).map(|(a, b)| a * b).sum()
    }

    /// Fused multiply-add: `out = v * a + b`.
    pub fn mul_add(out: &mut DenseVector, v: &DenseVector, a: f32, b: &DenseVector) {
        assert_eq!(v.len(), b.len(), "vector sizes must match");
        assert_eq!(out.len(), v.len(), "vector sizes must match");
        for ((o, x), y) in out.data.iter_mut().zip(&v.data).zip(&b.data) {
            *o = x * a + y;
        }
    }

    /// In-place `self = v * a + self`.
    pub fn add_scaled(&mut self, v: &DenseVector, a: f32) {
        assert_eq!(self.len(), v.len(), "vector sizes must match");
        for (o, x) in self.data.iter_mut().zip(&v.data) {
            *o += x * a;
        }
    }

    /// In-place `self = self * a + b`.
    pub fn scale_add(&mut self, a: f32, b: &DenseVector) {
        assert_eq!(self.len(), b.len(), "vector sizes must match");
        for (o, y) in self.data.iter_mut().zip(&b.data) {
            *o = *o * a + y;
        }
    }
}

impl Index<usize> for DenseVector {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        &self.data[index]
    }
}

impl IndexMut<usize> for DenseVector {
    fn index_mut(&mut self, index: usize) -> &mut f32 {
        &mut self.data[index]
    }
}
