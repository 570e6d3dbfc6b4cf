use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
};

use chrono::Local;
use tracing::info;

use crate::{
    classify::{classify, Input},
    container::{Sink, Source},
    errors::Result,
    geometry::Geometry,
    plan::{plan, Plan},
    report::{Direction, Report},
    transpose::{self, Scratch},
};

/// Written to the `creator` attribute of every output file
pub const CREATOR: &str = "asagi2paraview";

/// Default chunk extent along each axis
pub const DEFAULT_CHUNK_SIZE: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Chunk extent along each axis of the output data variables. 0 disables chunking.
    pub chunk_size: usize,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// A conversion of one input file, planned but not yet written
///
/// Planning only reads from the input, so an input that cannot be converted is rejected before
/// any output file needs to exist.
///
pub struct Conversion {
    input: Input,
    geometry: Geometry,
    plan: Plan,
    report: Report,
}

impl Conversion {
    /// Classify the variables of `source`, read its grid and plan the output layout.
    ///
    pub fn prepare<S: Source>(source: &S) -> Result<Self> {
        let names = source.variables()?;
        let input = classify(&names, source.dimension_count()?)?;
        match &input {
            Input::Flat(_) => info!("Compound data not found, converting to SeisSol format"),
            Input::Grouped(_) => info!("Found compound data, converting to Paraview format"),
        }

        let geometry = Geometry::read(input.inventory(), source)?;
        let (plan, report) = plan(&input, source)?;

        Ok(Self {
            input,
            geometry,
            plan,
            report,
        })
    }

    pub fn input(&self) -> &Input {
        &self.input
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn direction(&self) -> Direction {
        self.plan.direction()
    }

    /// Where to write the output when no path is given. See `default_output`.
    ///
    pub fn default_output<P: AsRef<Path>>(&self, input: P) -> PathBuf {
        default_output(input.as_ref(), self.direction())
    }

    /// Write the converted file to `sink`, then close it.
    ///
    /// Any error aborts the conversion. The partially written sink is dropped without being
    /// finished.
    ///
    pub fn run<S, W>(&self, source: &S, mut sink: W, options: &ConvertOptions) -> Result<()>
    where
        S: Source,
        W: Sink,
    {
        info!("Creating output file");
        sink.put_global_text("creator", CREATOR)?;
        sink.put_global_text("created", &timestamp())?;

        self.geometry.define(&mut sink)?;
        self.geometry.log_chunks(options.chunk_size);
        self.define_outputs(&mut sink, options)?;

        info!("Copying data");
        self.geometry.copy_coordinates(source, &mut sink)?;

        let mut scratch = Scratch::new(self.geometry.points(), self.plan.max_variables());
        match &self.plan {
            Plan::Group { datasets } => transpose::group(source, &mut sink, datasets, &mut scratch)?,
            Plan::Flatten { records, .. } => {
                transpose::flatten(source, &mut sink, records, &mut scratch)?
            }
        }

        sink.finish()
    }

    fn define_outputs<W: Sink>(&self, sink: &mut W, options: &ConvertOptions) -> Result<()> {
        let dims = self.geometry.storage_dims();
        let chunks = self.geometry.chunks(options.chunk_size);

        let mut outputs = vec![];
        match &self.plan {
            Plan::Group { datasets } => {
                for dataset in datasets {
                    let members: Vec<&str> =
                        dataset.fields.iter().map(|field| field.name.as_str()).collect();
                    sink.define_compound(&dataset.type_name, &members)?;
                    sink.define_records(&dataset.name, &dataset.type_name, &dims)?;
                    outputs.push(dataset.name.as_str());
                }
            }
            Plan::Flatten { records, .. } => {
                for extract in records.iter().flat_map(|record| record.extracts.iter()) {
                    sink.define_f32(&extract.name, &dims)?;
                    outputs.push(extract.name.as_str());
                }
            }
        }

        if let Some(chunks) = chunks {
            for output in outputs {
                sink.set_chunking(output, &chunks)?;
            }
        }

        Ok(())
    }
}

/// Output path derived from the input path.
///
/// The last occurrence of ".nc" is removed from `input`, then "_s.nc" is appended for files
/// grouped into records (SeisSol) or "_p.nc" for files flattened into scalars (Paraview). A path
/// that is not valid UTF-8 only loses a trailing ".nc" extension and is otherwise kept as is.
///
pub fn default_output(input: &Path, direction: Direction) -> PathBuf {
    let mut output = match input.to_str() {
        Some(text) => match text.rfind(".nc") {
            Some(index) => OsString::from(format!("{}{}", &text[..index], &text[index + 3..])),
            None => OsString::from(text),
        },
        None if input.extension() == Some(OsStr::new("nc")) => {
            input.with_extension("").into_os_string()
        }
        None => input.as_os_str().to_owned(),
    };
    output.push(match direction {
        Direction::Group => "_s.nc",
        Direction::Flatten => "_p.nc",
    });

    PathBuf::from(output)
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
