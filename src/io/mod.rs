//! Input and output of rasters.
mod limits;
pub(crate) mod free_functions;

pub use self::limits::Limits;
