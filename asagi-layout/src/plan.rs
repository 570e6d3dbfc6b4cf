//! Decide which output variable every input field ends up in, and where within that variable's
//! records.
//!
use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::{
    catalog,
    classify::{Input, Inventory},
    container::{Source, VariableKind},
    errors::{Error, Result},
    report::{Direction, Output, Report, Warning},
};

/// A scalar input field
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    /// Canonical, lower-cased name, used for the record member
    pub name: String,

    /// Name of the input variable
    pub stored: String,
}

/// An output dataset: several scalar fields packed into one compound variable
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dataset {
    pub name: String,
    pub type_name: String,

    /// Members of the record, in slot order
    pub fields: Vec<Field>,
}

impl Dataset {
    /// Number of floats per record
    ///
    pub fn width(&self) -> usize {
        self.fields.len()
    }
}

/// One member of a compound input variable that becomes a scalar output variable
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Extract {
    pub name: String,

    /// Index of the member's float within a record
    pub element: usize,
}

/// A compound input variable to be split up
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub stored: String,

    /// Number of members, and so floats, per record
    pub width: usize,

    /// Members to write out. Members shadowed by a later record of the same name are left out.
    pub extracts: Vec<Extract>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Plan {
    Group {
        datasets: Vec<Dataset>,
    },
    Flatten {
        records: Vec<Record>,
        max_variables: usize,
    },
}

impl Plan {
    /// Largest number of floats per record across the conversion.
    ///
    /// This sizes the scratch buffer used for records.
    ///
    pub fn max_variables(&self) -> usize {
        match self {
            Plan::Group { datasets } => datasets.iter().map(Dataset::width).max().unwrap_or(0),
            Plan::Flatten { max_variables, .. } => *max_variables,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Plan::Group { .. } => Direction::Group,
            Plan::Flatten { .. } => Direction::Flatten,
        }
    }

    /// The output variables this plan produces
    ///
    pub fn outputs(&self) -> Vec<Output> {
        match self {
            Plan::Group { datasets } => datasets
                .iter()
                .map(|dataset| Output {
                    name: dataset.name.clone(),
                    width: dataset.width(),
                })
                .collect(),
            Plan::Flatten { records, .. } => records
                .iter()
                .flat_map(|record| record.extracts.iter())
                .map(|extract| Output {
                    name: extract.name.clone(),
                    width: 1,
                })
                .collect(),
        }
    }
}

/// Plan a conversion for a classified input file.
///
/// Grouped inputs need `source` to look up the layout of their compound types.
///
pub fn plan<S: Source>(input: &Input, source: &S) -> Result<(Plan, Report)> {
    let (plan, warnings) = match input {
        Input::Flat(inventory) => plan_group(inventory),
        Input::Grouped(inventory) => plan_flatten(inventory, source)?,
    };

    let mut report = Report::new(plan.direction());
    report.outputs = plan.outputs();
    report.max_variables = plan.max_variables();
    report.warnings = warnings;

    Ok((plan, report))
}

/// Assign every known scalar field to its dataset and slot.
///
/// Fields are visited in name order. When two fields claim the same slot, the later one wins.
///
fn plan_group(inventory: &Inventory) -> (Plan, Vec<Warning>) {
    let mut warnings = vec![];
    let mut slots: BTreeMap<&str, BTreeMap<usize, Field>> = BTreeMap::new();

    for (name, stored) in &inventory.fields {
        match catalog::lookup(name) {
            Some(slot) => {
                let field = Field {
                    name: name.clone(),
                    stored: stored.clone(),
                };
                let dataset = slots.entry(slot.dataset).or_default();
                if let Some(previous) = dataset.insert(slot.index, field) {
                    debug!(
                        "{} replaces {} in slot {} of {}",
                        name, previous.name, slot.index, slot.dataset
                    );
                }
            }
            None => {
                warn!("Unknown variable {} found, ignoring it", stored);
                warnings.push(Warning::UnmappedField {
                    name: stored.clone(),
                });
            }
        }
    }

    let datasets = catalog::DATASETS
        .iter()
        .filter_map(|dataset| {
            slots.remove(dataset).map(|fields| Dataset {
                name: dataset.to_string(),
                type_name: catalog::record_type_name(dataset),
                fields: fields.into_values().collect(),
            })
        })
        .collect();

    (Plan::Group { datasets }, warnings)
}

/// Lay out the members of every compound input variable as scalar outputs.
///
/// Variables are visited in name order. When a member name appears in more than one compound
/// variable, the last one wins.
///
fn plan_flatten<S: Source>(inventory: &Inventory, source: &S) -> Result<(Plan, Vec<Warning>)> {
    let mut warnings = vec![];
    let mut records = vec![];
    let mut winners: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    let mut max_variables = 0;

    for stored in inventory.fields.values() {
        let members = match source.variable_kind(stored)? {
            VariableKind::Compound(members) => members,
            _ => {
                warn!("Variable {} is not compound data, ignoring it", stored);
                warnings.push(Warning::NotCompound {
                    name: stored.clone(),
                });
                continue;
            }
        };

        let width = members.len();
        if width == 0 {
            return Err(Error::Layout(format!("{stored} has no members")));
        }
        let index = records.len();
        for member in &members {
            let element = member.offset / 4;
            if member.offset % 4 != 0 || element >= width {
                return Err(Error::Layout(format!(
                    "member {} of {} at byte offset {} is not a float within the record",
                    member.name, stored, member.offset
                )));
            }
            if winners
                .insert(member.name.clone(), (index, element))
                .is_some()
            {
                debug!("{} in {} replaces an earlier member", member.name, stored);
            }
        }

        max_variables = max_variables.max(width);
        records.push(Record {
            stored: stored.clone(),
            width,
            extracts: members
                .into_iter()
                .map(|member| Extract {
                    element: member.offset / 4,
                    name: member.name,
                })
                .collect(),
        });
    }

    for (index, record) in records.iter_mut().enumerate() {
        record
            .extracts
            .retain(|extract| winners.get(&extract.name) == Some(&(index, extract.element)));
    }

    Ok((
        Plan::Flatten {
            records,
            max_variables,
        },
        warnings,
    ))
}
