use crate::model::Classifier;
use anyhow::{ensure, Result};
use ndarray::{Array2, Array4, Axis};

/// Finalized class activation maps for one mosaic
///
/// One `(nrows, ncols)` array per class, aligned 1:1 with the tile grid:
/// cell (r, c) holds the class's activation strength for tile (r, c).
pub struct ActivationMaps {
    classes: Vec<String>,
    maps: Vec<Array2<f32>>,
}

impl ActivationMaps {
    pub fn class_names(&self) -> &[String] {
        &self.classes
    }

    pub fn map(&self, class: usize) -> &Array2<f32> {
        &self.maps[class]
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Array2<f32>)> {
        self.classes
            .iter()
            .map(String::as_str)
            .zip(self.maps.iter())
    }
}

/// Accumulates class activation maps row by row
///
/// The accumulator is an explicit owned buffer: the driver creates one per
/// image, feeds it every row batch in index order, and consumes it with
/// [`retrieve`] once the last row is done.
///
/// [`retrieve`]: ActivationMapper::retrieve
pub struct ActivationMapper {
    nrows: usize,
    ncols: usize,
    classes: Vec<String>,
    maps: Vec<Array2<f32>>,
}

impl ActivationMapper {
    /// Allocate zeroed `(nrows, ncols)` buffers, one per class
    pub fn new(nrows: usize, ncols: usize, classes: &[String]) -> Self {
        Self {
            nrows,
            ncols,
            classes: classes.to_vec(),
            maps: vec![Array2::zeros((nrows, ncols)); classes.len()],
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    /// Accumulate activations for one tile row
    ///
    /// Runs its own forward pass over `batch` and writes each class's
    /// activation into row `row` of that class's map, column order
    /// preserved.
    pub fn generate(
        &mut self,
        model: &dyn Classifier,
        batch: &Array4<f32>,
        row: usize,
        batch_size: usize,
    ) -> Result<()> {
        let scores = model.predict(batch, batch_size)?;
        ensure!(
            scores.nrows() == self.ncols && row < self.nrows,
            "activation batch does not fit the {}x{} tile grid",
            self.nrows,
            self.ncols
        );

        for (col, tile_scores) in scores.axis_iter(Axis(0)).enumerate() {
            for (class, value) in tile_scores.iter().enumerate() {
                self.maps[class][[row, col]] = *value;
            }
        }

        Ok(())
    }

    /// Finalize and hand over the accumulated maps
    pub fn retrieve(self) -> ActivationMaps {
        ActivationMaps {
            classes: self.classes,
            maps: self.maps,
        }
    }
}
