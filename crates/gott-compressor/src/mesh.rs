// SPDX-License-Identifier: LGPL-3.0-or-later

//! Visualization meshes.
//!
//! A mesh is a pair of X/Y arrays with a fixed capacity. The engine
//! writes a mesh only while it is empty; the consumer reads it and calls
//! [`Mesh::consume`] to ask for the next one.

/// Paired X/Y buffer handed from the engine to a consumer.
///
/// # Examples
/// ```
/// use gott_compressor::mesh::Mesh;
///
/// let mut mesh = Mesh::new(4);
/// assert!(mesh.is_empty());
/// assert!(mesh.data().is_none());
///
/// mesh.consume();
/// assert!(mesh.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Mesh {
    x: Vec<f32>,
    y: Vec<f32>,
    len: usize,
    filled: bool,
}

impl Mesh {
    /// Allocate a mesh for up to `capacity` points.
    pub fn new(capacity: usize) -> Self {
        Self {
            x: vec![0.0; capacity],
            y: vec![0.0; capacity],
            len: 0,
            filled: false,
        }
    }

    /// Largest number of points.
    pub fn capacity(&self) -> usize {
        self.x.len()
    }

    /// No data is waiting for the consumer.
    pub fn is_empty(&self) -> bool {
        !self.filled
    }

    /// Number of points of the pending data (may be zero).
    pub fn len(&self) -> usize {
        if self.filled { self.len } else { 0 }
    }

    /// Pending X and Y values, if any.
    pub fn data(&self) -> Option<(&[f32], &[f32])> {
        self.filled
            .then(|| (&self.x[..self.len], &self.y[..self.len]))
    }

    /// Mark the data as read.
    pub fn consume(&mut self) {
        self.filled = false;
    }

    /// Fill the mesh if it is empty.
    ///
    /// `f` receives the X and Y buffers and returns the number of points
    /// it wrote. Returns `false` when the previous data was not consumed.
    pub(crate) fn fill(&mut self, f: impl FnOnce(&mut [f32], &mut [f32]) -> usize) -> bool {
        if self.filled {
            return false;
        }
        let n = f(&mut self.x, &mut self.y);
        self.len = n.min(self.x.len());
        self.filled = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_then_consume() {
        let mut mesh = Mesh::new(3);
        assert!(mesh.fill(|x, y| {
            x.copy_from_slice(&[1.0, 2.0, 3.0]);
            y.copy_from_slice(&[4.0, 5.0, 6.0]);
            3
        }));
        assert!(!mesh.is_empty());
        assert_eq!(mesh.len(), 3);
        let (x, y) = mesh.data().expect("filled");
        assert_eq!(x, &[1.0, 2.0, 3.0]);
        assert_eq!(y, &[4.0, 5.0, 6.0]);

        assert!(!mesh.fill(|_, _| 0));
        mesh.consume();
        assert!(mesh.is_empty());
        assert!(mesh.data().is_none());
    }

    #[test]
    fn zero_length_data_is_still_pending() {
        let mut mesh = Mesh::new(8);
        mesh.fill(|_, _| 0);
        assert!(!mesh.is_empty());
        assert_eq!(mesh.data().map(|(x, _)| x.len()), Some(0));
    }

    #[test]
    fn length_is_capped() {
        let mut mesh = Mesh::new(2);
        mesh.fill(|_, _| 10);
        assert_eq!(mesh.len(), 2);
        assert_eq!(mesh.capacity(), 2);
    }
}
