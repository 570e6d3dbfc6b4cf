//! Partition an input file's variables into coordinate axes and data fields, and decide which way
//! the conversion goes.
//!
use std::collections::BTreeMap;

use crate::{
    catalog,
    errors::{Error, Result},
};

/// Canonical axis names, in declaration order.
///
pub const AXES: [&str; 3] = ["x", "y", "z"];

/// The variables found in an input file
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inventory {
    /// Stored names of the coordinate variables, x first. Between one and three of them.
    pub axes: Vec<String>,

    /// Remaining variables, keyed by lower-cased name, mapping to the stored name
    pub fields: BTreeMap<String, String>,
}

impl Inventory {
    /// Number of spatial dimensions of the grid
    ///
    pub fn dimensions(&self) -> usize {
        self.axes.len()
    }
}

/// The result of classifying an input file
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    /// Every quantity is its own scalar variable. Will be grouped into records.
    Flat(Inventory),

    /// Quantities are packed into compound records. Will be flattened into scalars.
    Grouped(Inventory),
}

impl Input {
    pub fn inventory(&self) -> &Inventory {
        match self {
            Input::Flat(inventory) | Input::Grouped(inventory) => inventory,
        }
    }
}

/// Classify the variables of an input file.
///
/// # Arguments
///
/// * `names` - Stored variable names, in any order.
/// * `dimension_count` - Number of dimensions defined by the input file.
///
/// # Errors
///
/// `Error::Configuration` if the file doesn't define between one and three dimensions, or if the
/// coordinate axes found are not exactly `x`, `x, y` or `x, y, z`.
///
pub fn classify<S: AsRef<str>>(names: &[S], dimension_count: usize) -> Result<Input> {
    if !(1..=3).contains(&dimension_count) {
        return Err(Error::Configuration(format!(
            "unsupported number of dimensions found: {dimension_count}"
        )));
    }

    let mut axes: [Option<String>; 3] = [None, None, None];
    let mut fields = BTreeMap::new();
    let mut grouped = false;

    for name in names {
        let stored = name.as_ref();
        let lower = stored.to_lowercase();
        match AXES.iter().position(|axis| *axis == lower) {
            Some(axis) => {
                axes[axis] = Some(stored.to_string());
            }
            None => {
                if catalog::is_dataset(&lower) {
                    grouped = true;
                }
                fields.insert(lower, stored.to_string());
            }
        }
    }

    let count = axes.iter().filter(|axis| axis.is_some()).count();
    if count == 0 {
        return Err(Error::Configuration(String::from(
            "no coordinate variables (x, y, z) found",
        )));
    }
    let axes: Vec<String> = axes.into_iter().map_while(|axis| axis).collect();
    if axes.len() != count {
        return Err(Error::Configuration(format!(
            "coordinate variables must be x, (x, y) or (x, y, z), found {count} with a gap at {}",
            AXES[axes.len()]
        )));
    }

    let inventory = Inventory { axes, fields };
    if grouped {
        Ok(Input::Grouped(inventory))
    } else {
        Ok(Input::Flat(inventory))
    }
}
