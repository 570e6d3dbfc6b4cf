//! The fixed table of physical quantities known to the SeisSol/ASAGI record layout.
//!
//! Every known field belongs to exactly one dataset and occupies a fixed slot in that dataset's
//! record. `mu` and `g` are two names for the same quantity and share a slot.

/// Names of the datasets, in the order they are written to an output file.
///
pub const DATASETS: [&str; 4] = ["data", "stress", "rsf", "lsw"];

/// Where a field lives in the grouped layout
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slot {
    pub dataset: &'static str,
    pub index: usize,
}

const CATALOG: [(&str, &str, usize); 17] = [
    ("rho", "data", 0),
    ("mu", "data", 1),
    ("g", "data", 1),
    ("lambda", "data", 2),
    ("sxx", "stress", 0),
    ("syy", "stress", 1),
    ("szz", "stress", 2),
    ("sxy", "stress", 3),
    ("sxz", "stress", 4),
    ("syz", "stress", 5),
    ("p", "stress", 6),
    ("rs_srw", "rsf", 0),
    ("rs_a", "rsf", 1),
    ("coh", "lsw", 0),
    ("d_c", "lsw", 1),
    ("mu_s", "lsw", 2),
    ("mu_d", "lsw", 3),
];

/// Look up the dataset and slot for a canonical (lower-cased) field name.
///
/// Returns `None` for any name outside the catalog. Callers are expected to warn about and drop
/// such fields.
///
pub fn lookup(name: &str) -> Option<Slot> {
    CATALOG
        .iter()
        .find(|(field, _, _)| *field == name)
        .map(|&(_, dataset, index)| Slot { dataset, index })
}

/// Whether `name` is one of the reserved dataset names.
///
/// The presence of a variable with such a name marks an input file as already grouped.
///
pub fn is_dataset(name: &str) -> bool {
    DATASETS.contains(&name)
}

/// Name of the compound record type used for a dataset's output variable
///
/// Types and variables share one namespace in a netCDF-4 group, so a type is never named after
/// its dataset.
///
pub fn record_type_name(dataset: &str) -> String {
    match dataset {
        "data" => String::from("material"),
        other => format!("{other}_t"),
    }
}
