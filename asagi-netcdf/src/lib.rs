//! A concrete implementation of the `asagi_layout::Source` and `asagi_layout::Sink` interfaces
//! for netCDF-4 files.
//!
use std::{
    collections::HashMap,
    ffi::{c_int, CString},
    io,
    path::{Path, PathBuf},
    result,
};

use asagi_layout::{Member, Sink, Source, VariableKind};
use netcdf::{
    types::{CompoundType, CompoundTypeField, FloatType, NcVariableType},
    AttributeValue, Options,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("netCDF error on {path}: {source}")]
    NetCdf {
        path: String,
        source: netcdf::Error,
    },

    #[error(transparent)]
    Convert(#[from] asagi_layout::Error),

    #[error(transparent)]
    IO(#[from] io::Error),

    #[error("cannot encode report: {0}")]
    Report(#[from] serde_json::Error),
}

pub type Result<T> = result::Result<T, Error>;

type LayoutResult<T> = asagi_layout::Result<T>;

const FLOAT: NcVariableType = NcVariableType::Float(FloatType::F32);

fn nc_error(context: &str) -> impl FnOnce(netcdf::Error) -> asagi_layout::Error + '_ {
    move |err| asagi_layout::Error::container(context, err)
}

fn missing(context: &str) -> asagi_layout::Error {
    asagi_layout::Error::container(context, "not found")
}

/// Open an existing netCDF file for reading.
///
pub fn open<P: AsRef<Path>>(path: P) -> Result<NcSource> {
    let path = path.as_ref();
    let file = netcdf::open(path).map_err(|source| Error::NetCdf {
        path: path.display().to_string(),
        source,
    })?;

    Ok(NcSource { file })
}

/// Create a new netCDF-4 file, replacing any file already at `path`.
///
pub fn create<P: AsRef<Path>>(path: P) -> Result<NcSink> {
    let path = path.as_ref();
    let file = netcdf::create_with(path, Options::NETCDF4).map_err(|source| Error::NetCdf {
        path: path.display().to_string(),
        source,
    })?;

    Ok(NcSink {
        path: path.to_path_buf(),
        file,
        types: HashMap::new(),
        records: vec![],
    })
}

/// A netCDF file opened for reading
///
pub struct NcSource {
    file: netcdf::File,
}

impl NcSource {
    fn variable(&self, name: &str) -> LayoutResult<netcdf::Variable<'_>> {
        self.file.variable(name).ok_or_else(|| missing(name))
    }
}

fn fill<T: Copy>(var: &str, values: Vec<T>, out: &mut [T]) -> LayoutResult<()> {
    if values.len() != out.len() {
        return Err(asagi_layout::Error::Layout(format!(
            "{var} holds {} values, expected {}",
            values.len(),
            out.len()
        )));
    }
    out.copy_from_slice(&values);

    Ok(())
}

fn record_kind(compound: CompoundType) -> VariableKind {
    let mut members = Vec::with_capacity(compound.fields.len());
    for field in compound.fields {
        if field.basetype != FLOAT || field.arraydims.is_some() {
            return VariableKind::Other(format!(
                "compound with non float member {}",
                field.name
            ));
        }
        members.push(Member {
            name: field.name,
            offset: field.offset,
        });
    }

    VariableKind::Compound(members)
}

impl Source for NcSource {
    fn dimension_count(&self) -> LayoutResult<usize> {
        Ok(self.file.dimensions().count())
    }

    fn variables(&self) -> LayoutResult<Vec<String>> {
        Ok(self.file.variables().map(|var| var.name()).collect())
    }

    fn dimension_len(&self, name: &str) -> LayoutResult<usize> {
        self.file.dimension_len(name).ok_or_else(|| missing(name))
    }

    fn variable_kind(&self, var: &str) -> LayoutResult<VariableKind> {
        let kind = match self.variable(var)?.vartype() {
            NcVariableType::Float(FloatType::F32) => VariableKind::Scalar,
            NcVariableType::Compound(compound) => record_kind(compound),
            _ => VariableKind::Other(String::from("not a 32 bit float")),
        };

        Ok(kind)
    }

    fn text_attribute(&self, var: &str, name: &str) -> LayoutResult<Option<String>> {
        let variable = self.variable(var)?;
        let attribute = match variable.attribute(name) {
            Some(attribute) => attribute,
            None => return Ok(None),
        };
        match attribute.value().map_err(nc_error(var))? {
            AttributeValue::Str(value) => Ok(Some(value)),
            _ => Err(asagi_layout::Error::container(
                var,
                format!("attribute {name} is not text"),
            )),
        }
    }

    fn read_f32(&self, var: &str, out: &mut [f32]) -> LayoutResult<()> {
        let values = self
            .variable(var)?
            .get_values::<f32, _>(..)
            .map_err(nc_error(var))?;

        fill(var, values, out)
    }

    fn read_records(&self, var: &str, out: &mut [f32]) -> LayoutResult<()> {
        let bytes = self
            .variable(var)?
            .get_raw_values(..)
            .map_err(nc_error(var))?;
        let values = bytes
            .chunks_exact(4)
            .map(|word| f32::from_ne_bytes([word[0], word[1], word[2], word[3]]))
            .collect();

        fill(var, values, out)
    }
}

/// A netCDF-4 file being written
///
/// The typed API of the `netcdf` crate only writes compound values whose layout is known at
/// compile time. Records are therefore kept until `finish`, which closes the file and then
/// stores them through the C library.
///
pub struct NcSink {
    path: PathBuf,
    file: netcdf::FileMut,
    types: HashMap<String, NcVariableType>,
    records: Vec<(String, Vec<f32>)>,
}

impl NcSink {
    fn variable_mut(&mut self, name: &str) -> LayoutResult<netcdf::VariableMut<'_>> {
        self.file.variable_mut(name).ok_or_else(|| missing(name))
    }
}

impl Sink for NcSink {
    fn put_global_text(&mut self, name: &str, value: &str) -> LayoutResult<()> {
        self.file
            .add_attribute(name, value)
            .map_err(nc_error(name))?;

        Ok(())
    }

    fn put_text(&mut self, var: &str, name: &str, value: &str) -> LayoutResult<()> {
        self.variable_mut(var)?
            .put_attribute(name, value)
            .map_err(nc_error(var))?;

        Ok(())
    }

    fn define_dimension(&mut self, name: &str, len: usize) -> LayoutResult<()> {
        self.file
            .add_dimension(name, len)
            .map_err(nc_error(name))?;

        Ok(())
    }

    fn define_f32(&mut self, name: &str, dims: &[&str]) -> LayoutResult<()> {
        self.file
            .add_variable::<f32>(name, dims)
            .map_err(nc_error(name))?;

        Ok(())
    }

    fn define_compound(&mut self, type_name: &str, members: &[&str]) -> LayoutResult<()> {
        let fields = members
            .iter()
            .enumerate()
            .map(|(slot, member)| CompoundTypeField {
                name: member.to_string(),
                basetype: FLOAT,
                arraydims: None,
                offset: slot * 4,
            })
            .collect();
        let typ = NcVariableType::Compound(CompoundType {
            name: type_name.to_string(),
            size: members.len() * 4,
            fields,
        });
        self.file
            .add_type_from_descriptor(typ.clone())
            .map_err(nc_error(type_name))?;
        self.types.insert(type_name.to_string(), typ);

        Ok(())
    }

    fn define_records(&mut self, name: &str, type_name: &str, dims: &[&str]) -> LayoutResult<()> {
        let typ = self.types.get(type_name).ok_or_else(|| missing(type_name))?;
        self.file
            .add_variable_with_type(name, dims, typ)
            .map_err(nc_error(name))?;

        Ok(())
    }

    fn set_chunking(&mut self, var: &str, chunks: &[usize]) -> LayoutResult<()> {
        self.variable_mut(var)?
            .set_chunking(chunks)
            .map_err(nc_error(var))
    }

    fn write_f32(&mut self, var: &str, values: &[f32]) -> LayoutResult<()> {
        self.variable_mut(var)?
            .put_values(values, ..)
            .map_err(nc_error(var))
    }

    fn write_records(&mut self, var: &str, values: &[f32]) -> LayoutResult<()> {
        let expected = {
            let variable = self.variable_mut(var)?;
            match variable.vartype() {
                NcVariableType::Compound(compound) => variable.len() * compound.size / 4,
                _ => return Err(asagi_layout::Error::container(var, "not a compound variable")),
            }
        };
        if values.len() != expected {
            return Err(asagi_layout::Error::container(
                var,
                "records do not fit the variable",
            ));
        }
        self.records.push((var.to_string(), values.to_vec()));

        Ok(())
    }

    fn finish(self) -> LayoutResult<()> {
        let context = self.path.display().to_string();
        self.file.close().map_err(nc_error(&context))?;
        if self.records.is_empty() {
            return Ok(());
        }

        put_records(&self.path, &self.records)
    }
}

fn checked(context: &str, status: c_int) -> LayoutResult<()> {
    if status == netcdf_sys::NC_NOERR {
        Ok(())
    } else {
        Err(asagi_layout::Error::container(
            context,
            netcdf::Error::Netcdf(status),
        ))
    }
}

/// Reopen a closed file and store whole compound variables, each from one buffer of records.
///
fn put_records(path: &Path, records: &[(String, Vec<f32>)]) -> LayoutResult<()> {
    let context = path.display().to_string();
    let cpath = path
        .to_str()
        .and_then(|path| CString::new(path).ok())
        .ok_or_else(|| asagi_layout::Error::container(&context, "path cannot be passed to netCDF"))?;

    let _lock = netcdf_sys::libnetcdf_lock.lock();
    let mut ncid = 0;
    checked(&context, unsafe {
        netcdf_sys::nc_open(cpath.as_ptr(), netcdf_sys::NC_WRITE, &mut ncid)
    })?;

    let written = records
        .iter()
        .try_for_each(|(name, values)| put_var(ncid, name, values));
    let closed = checked(&context, unsafe { netcdf_sys::nc_close(ncid) });

    written.and(closed)
}

fn put_var(ncid: c_int, name: &str, values: &[f32]) -> LayoutResult<()> {
    let cname = CString::new(name).map_err(|err| asagi_layout::Error::container(name, err))?;
    let mut varid = 0;
    checked(name, unsafe {
        netcdf_sys::nc_inq_varid(ncid, cname.as_ptr(), &mut varid)
    })?;

    // Lengths were checked against the variable in `write_records`
    checked(name, unsafe {
        netcdf_sys::nc_put_var(ncid, varid, values.as_ptr().cast())
    })
}
