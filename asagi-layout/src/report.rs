use serde::Serialize;

/// Which way a conversion goes
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Scalar variables are packed into compound records (SeisSol/ASAGI layout)
    Group,

    /// Compound records are split into scalar variables (Paraview layout)
    Flatten,
}

/// A non fatal problem found while planning a conversion
///
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A scalar variable has no catalog entry and was dropped.
    UnmappedField { name: String },

    /// A variable of a grouped file is not a compound record and was dropped.
    NotCompound { name: String },
}

/// One output variable and the number of values packed per grid point
///
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Output {
    pub name: String,
    pub width: usize,
}

/// Machine readable summary of a conversion
///
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Report {
    pub direction: Direction,
    pub outputs: Vec<Output>,
    pub max_variables: usize,
    pub warnings: Vec<Warning>,
}

impl Report {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            outputs: vec![],
            max_variables: 0,
            warnings: vec![],
        }
    }

    /// Names of the fields dropped because the catalog doesn't know them
    ///
    pub fn unmapped(&self) -> Vec<&str> {
        self.warnings
            .iter()
            .filter_map(|warning| match warning {
                Warning::UnmappedField { name } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }
}
