//! Move values between scalar fields and interleaved records.
//!
//! No arithmetic is done on values, so a round trip through records reproduces every field bit
//! for bit. Point order is never changed, only which field a value is packed next to.
//!
use ndarray::{ArrayView2, ArrayViewMut2, ShapeError};
use num_traits::Zero;
use tracing::debug;

use crate::{
    container::{Sink, Source},
    errors::{Error, Result},
    plan::{Dataset, Record},
};

/// Working buffers reused across every dataset or record of a conversion
///
/// `records` is sized for the widest record, `field` for a single field.
///
pub struct Scratch<N> {
    points: usize,
    records: Vec<N>,
    field: Vec<N>,
}

impl<N> Scratch<N>
where
    N: Zero + Copy,
{
    pub fn new(points: usize, max_variables: usize) -> Self {
        Self {
            points,
            records: vec![N::zero(); points * max_variables],
            field: vec![N::zero(); points],
        }
    }

    pub fn points(&self) -> usize {
        self.points
    }

    /// Borrow both buffers, with the records buffer viewed as `(points, width)`.
    ///
    fn split(&mut self, width: usize) -> Result<(ArrayViewMut2<N>, &mut [N])> {
        let len = self.points * width;
        if len > self.records.len() {
            return Err(Error::Layout(format!(
                "records of width {width} do not fit the scratch buffer"
            )));
        }
        let records = ArrayViewMut2::from_shape((self.points, width), &mut self.records[..len])
            .map_err(shape_error)?;

        Ok((records, &mut self.field[..]))
    }
}

fn shape_error(err: ShapeError) -> Error {
    Error::Layout(err.to_string())
}

/// Scatter one field into its slot of every record.
///
/// `records` has one row per point and one column per slot, so afterwards
/// `records[[j, slot]] == field[j]` for every point `j`.
///
pub fn interleave<N: Copy>(records: &mut ArrayViewMut2<N>, slot: usize, field: &[N]) {
    let mut column = records.column_mut(slot);
    for (dest, value) in column.iter_mut().zip(field) {
        *dest = *value;
    }
}

/// Gather one member of every record into a field.
///
/// The inverse of `interleave`: afterwards `field[j] == records[[j, element]]` for every point
/// `j`.
///
pub fn deinterleave<N: Copy>(records: &ArrayView2<N>, element: usize, field: &mut [N]) {
    for (dest, value) in field.iter_mut().zip(records.column(element)) {
        *dest = *value;
    }
}

/// Pack the scalar fields of each dataset into records and write one record variable per
/// dataset.
///
/// Every field of a dataset is scattered before its records are written, in one bulk write.
///
pub fn group<S, W>(
    source: &S,
    sink: &mut W,
    datasets: &[Dataset],
    scratch: &mut Scratch<f32>,
) -> Result<()>
where
    S: Source,
    W: Sink,
{
    for dataset in datasets {
        let (mut records, field) = scratch.split(dataset.width())?;
        for (slot, source_field) in dataset.fields.iter().enumerate() {
            debug!("Packing {} into slot {} of {}", source_field.stored, slot, dataset.name);
            source.read_f32(&source_field.stored, field)?;
            interleave(&mut records, slot, field);
        }

        let values = records
            .as_slice()
            .ok_or_else(|| Error::Layout(String::from("records are not contiguous")))?;
        sink.write_records(&dataset.name, values)?;
    }

    Ok(())
}

/// Split each compound input variable into one scalar output variable per member.
///
/// Each record variable is read once, then its members are gathered and written one at a time.
///
pub fn flatten<S, W>(
    source: &S,
    sink: &mut W,
    records: &[Record],
    scratch: &mut Scratch<f32>,
) -> Result<()>
where
    S: Source,
    W: Sink,
{
    for record in records {
        if record.extracts.is_empty() {
            continue;
        }

        let (mut buffer, field) = scratch.split(record.width)?;
        {
            let values = buffer
                .as_slice_mut()
                .ok_or_else(|| Error::Layout(String::from("records are not contiguous")))?;
            source.read_records(&record.stored, values)?;
        }

        let buffer = buffer.view();
        for extract in &record.extracts {
            debug!("Extracting {} from {}", extract.name, record.stored);
            deinterleave(&buffer, extract.element, field);
            sink.write_f32(&extract.name, field)?;
        }
    }

    Ok(())
}
