use super::error::CubeError;
use super::types::{Cube, CubeSpan};

/// Supplier of cubes for the scheduler.
///
/// Loads happen on the coordinating thread, one span at a time, in the plan's
/// enumeration order; implementations may block on I/O.
pub trait CubeSource {
    /// Number of samples per row
    fn channels(&self) -> usize;

    /// Load the rows described by `span`
    fn load_cube(&mut self, span: &CubeSpan) -> Result<Cube, CubeError>;

    /// Persist the (possibly modified) rows of `cube` back to the dataset
    fn store_cube(&mut self, _cube: &Cube) -> Result<(), CubeError> {
        Err(CubeError::ReadOnly)
    }
}

impl<S: CubeSource + ?Sized> CubeSource for &mut S {
    fn channels(&self) -> usize {
        (**self).channels()
    }

    fn load_cube(&mut self, span: &CubeSpan) -> Result<Cube, CubeError> {
        (**self).load_cube(span)
    }

    fn store_cube(&mut self, cube: &Cube) -> Result<(), CubeError> {
        (**self).store_cube(cube)
    }
}
