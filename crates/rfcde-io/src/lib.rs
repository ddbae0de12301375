//! File I/O, validation, and serialization for the rfcde command line.

mod align;
mod domain;
mod error;
mod reader;
mod writer;

pub use align::{AlignedData, align};
pub use domain::{ExperimentName, Matrix, RowId};
pub use error::IoError;
pub use reader::MatrixReader;
pub use writer::ResultWriter;
