use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeSeq, Serializer};

/// Triangular arena addressed by (down-move count j, time step i), j <= i.
///
/// Row i holds i+1 cells starting at offset i(i+1)/2, so j varies fastest
/// within a time step.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangularGrid {
    steps: usize,
    cells: Vec<Decimal>,
}

fn row_offset(i: usize) -> usize {
    i * (i + 1) / 2
}

impl TriangularGrid {
    /// Zero-filled grid for time steps `0..=steps`.
    pub fn new(steps: usize) -> Self {
        Self {
            steps,
            cells: vec![Decimal::ZERO; row_offset(steps + 1)],
        }
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Cell (j, i), or `None` outside the triangle.
    pub fn get(&self, j: usize, i: usize) -> Option<Decimal> {
        if i > self.steps || j > i {
            return None;
        }
        Some(self.cells[row_offset(i) + j])
    }

    /// All cells of time step i, indexed by j.
    pub fn row(&self, i: usize) -> &[Decimal] {
        let start = row_offset(i);
        &self.cells[start..start + i + 1]
    }

    pub(crate) fn row_mut(&mut self, i: usize) -> &mut [Decimal] {
        let start = row_offset(i);
        &mut self.cells[start..start + i + 1]
    }

    /// Iterate `(j, i, value)` over every valid cell.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, Decimal)> + '_ {
        (0..=self.steps).flat_map(move |i| {
            self.row(i)
                .iter()
                .enumerate()
                .map(move |(j, &v)| (j, i, v))
        })
    }
}

impl Serialize for TriangularGrid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.steps + 1))?;
        for i in 0..=self.steps {
            seq.serialize_element(self.row(i))?;
        }
        seq.end()
    }
}
