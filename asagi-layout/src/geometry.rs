use std::cmp;

use tracing::info;

use crate::{
    classify::{Inventory, AXES},
    container::{Sink, Source},
    errors::{Error, Result},
};

/// One coordinate axis of the grid
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Axis {
    /// Canonical name, "x", "y" or "z"
    pub name: &'static str,

    /// Name of the coordinate variable in the input file
    pub stored: String,

    pub len: usize,
    pub units: Option<String>,
}

/// The grid shared by every field, axes in declaration order (x first)
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Geometry {
    pub axes: Vec<Axis>,
}

impl Geometry {
    /// Read lengths and units of the classified coordinate axes from the input file.
    ///
    /// The dimension of an axis is looked up by its canonical name first, then by the stored
    /// name of its coordinate variable.
    ///
    pub fn read<S: Source>(inventory: &Inventory, source: &S) -> Result<Self> {
        let mut axes = Vec::with_capacity(inventory.axes.len());
        for (name, stored) in AXES.iter().zip(&inventory.axes) {
            let len = source
                .dimension_len(name)
                .or_else(|_| source.dimension_len(stored))
                .map_err(|err| {
                    Error::Configuration(format!("no dimension found for coordinate {stored}: {err}"))
                })?;
            if len == 0 {
                return Err(Error::Configuration(format!("dimension {stored} is empty")));
            }
            let units = source.text_attribute(stored, "units")?;

            axes.push(Axis {
                name: *name,
                stored: stored.clone(),
                len,
                units,
            });
        }

        Ok(Self { axes })
    }

    /// Number of grid points
    ///
    pub fn points(&self) -> usize {
        self.axes.iter().map(|axis| axis.len).product()
    }

    /// Dimension names of a data variable, slowest varying first.
    ///
    /// This is the reverse of declaration order, so the last declared axis varies fastest.
    ///
    pub fn storage_dims(&self) -> Vec<&'static str> {
        self.axes.iter().rev().map(|axis| axis.name).collect()
    }

    /// Chunk extents of a data variable, in storage order.
    ///
    /// Each extent is `chunk_size` bounded by the length of its axis. Returns `None` when
    /// `chunk_size` is 0, which means no chunking.
    ///
    pub fn chunks(&self, chunk_size: usize) -> Option<Vec<usize>> {
        if chunk_size == 0 {
            return None;
        }

        Some(
            self.axes
                .iter()
                .rev()
                .map(|axis| cmp::min(chunk_size, axis.len))
                .collect(),
        )
    }

    /// Define dimensions and coordinate variables in the output file.
    ///
    pub fn define<W: Sink>(&self, sink: &mut W) -> Result<()> {
        for axis in self.axes.iter().rev() {
            sink.define_dimension(axis.name, axis.len)?;
        }
        for axis in &self.axes {
            sink.define_f32(axis.name, &[axis.name])?;
            if let Some(units) = &axis.units {
                sink.put_text(axis.name, "units", units)?;
            }
        }

        Ok(())
    }

    /// Copy coordinate values from the input file to the output file.
    ///
    pub fn copy_coordinates<S: Source, W: Sink>(&self, source: &S, sink: &mut W) -> Result<()> {
        for axis in &self.axes {
            let mut values = vec![0.0; axis.len];
            source.read_f32(&axis.stored, &mut values)?;
            sink.write_f32(axis.name, &values)?;
        }

        Ok(())
    }

    /// Log the chunk extents about to be used, if any.
    ///
    pub(crate) fn log_chunks(&self, chunk_size: usize) {
        if let Some(chunks) = self.chunks(chunk_size) {
            let extents: Vec<String> = chunks.iter().map(|n| n.to_string()).collect();
            info!("Setting chunk size to ({})", extents.join(", "));
        }
    }
}
