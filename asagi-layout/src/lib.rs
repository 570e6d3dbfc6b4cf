//! Convert gridded material and stress models between the SeisSol/ASAGI record layout, where
//! related quantities are packed into compound records, and the Paraview layout, where every
//! quantity is its own scalar variable.
//!
//! The file format itself is abstracted behind the `Source` and `Sink` traits.
//!
pub mod catalog;
mod classify;
mod container;
mod convert;
mod errors;
mod geometry;
mod plan;
mod report;
mod transpose;

#[cfg(test)]
mod testing;

pub use classify::{classify, Input, Inventory, AXES};
pub use container::{Member, Sink, Source, VariableKind};
pub use convert::{default_output, ConvertOptions, Conversion, CREATOR, DEFAULT_CHUNK_SIZE};
pub use errors::{Error, Result};
pub use geometry::{Axis, Geometry};
pub use plan::{plan, Dataset, Extract, Field, Plan, Record};
pub use report::{Direction, Output, Report, Warning};
pub use transpose::{deinterleave, flatten, group, interleave, Scratch};
