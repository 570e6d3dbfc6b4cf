use std::{collections::HashMap, sync::Arc};

use ndarray::{Array, Dimension};
use parking_lot::Mutex;

use crate::{
    container::{Member, Sink, Source, VariableKind},
    errors::{Error, Result},
};

/// A test implementation of `Source` and `Sink` that keeps a whole file in RAM
///
/// As in netCDF-4, compound types and variables share one namespace.
///
/// Clones share the same contents, so a test can keep a handle on a file after handing another
/// handle to the conversion as its sink.
///
#[derive(Clone, Default)]
pub(crate) struct MemoryFile {
    contents: Arc<Mutex<Contents>>,
}

#[derive(Default)]
struct Contents {
    dimensions: Vec<(String, usize)>,
    variables: Vec<StoredVariable>,
    types: HashMap<String, Vec<String>>,
    globals: HashMap<String, String>,
    broken: Option<String>,
    finished: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct StoredVariable {
    pub name: String,
    pub dims: Vec<String>,
    pub kind: VariableKind,
    pub attributes: HashMap<String, String>,
    pub chunks: Option<Vec<usize>>,
    pub values: Vec<f32>,
}

impl StoredVariable {
    fn width(&self) -> usize {
        match &self.kind {
            VariableKind::Compound(members) => members.len(),
            _ => 1,
        }
    }
}

impl Contents {
    fn variable(&self, name: &str) -> Result<&StoredVariable> {
        self.variables
            .iter()
            .find(|var| var.name == name)
            .ok_or_else(|| Error::container(name, "no such variable"))
    }

    fn variable_mut(&mut self, name: &str) -> Result<&mut StoredVariable> {
        self.variables
            .iter_mut()
            .find(|var| var.name == name)
            .ok_or_else(|| Error::container(name, "no such variable"))
    }

    fn dimension_len(&self, name: &str) -> Result<usize> {
        self.dimensions
            .iter()
            .find(|(dim, _)| dim == name)
            .map(|(_, len)| *len)
            .ok_or_else(|| Error::container(name, "no such dimension"))
    }

    fn points(&self, dims: &[String]) -> Result<usize> {
        dims.iter()
            .map(|dim| self.dimension_len(dim))
            .product()
    }

    fn add_variable(&mut self, name: &str, dims: &[&str], kind: VariableKind) -> Result<()> {
        if self.variables.iter().any(|var| var.name == name) {
            return Err(Error::container(name, "variable already defined"));
        }
        if self.types.contains_key(name) {
            return Err(Error::container(name, "name already used by a type"));
        }
        let dims: Vec<String> = dims.iter().map(|dim| dim.to_string()).collect();
        for dim in &dims {
            self.dimension_len(dim)?;
        }
        self.variables.push(StoredVariable {
            name: name.to_string(),
            dims,
            kind,
            attributes: HashMap::new(),
            chunks: None,
            values: vec![],
        });

        Ok(())
    }

    fn check_readable(&self, var: &str) -> Result<()> {
        if self.broken.as_deref() == Some(var) {
            Err(Error::container(var, "simulated I/O failure"))
        } else {
            Ok(())
        }
    }

    fn check_open(&self, var: &str) -> Result<()> {
        if self.finished {
            Err(Error::container(var, "file already closed"))
        } else {
            self.check_readable(var)
        }
    }
}

impl MemoryFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dimension along with a coordinate variable of the same name.
    ///
    pub fn axis(self, name: &str, len: usize, units: Option<&str>) -> Self {
        {
            let mut contents = self.contents.lock();
            contents.dimensions.push((name.to_string(), len));
            let mut attributes = HashMap::new();
            if let Some(units) = units {
                attributes.insert(String::from("units"), units.to_string());
            }
            contents.variables.push(StoredVariable {
                name: name.to_string(),
                dims: vec![name.to_string()],
                kind: VariableKind::Scalar,
                attributes,
                chunks: None,
                values: (0..len).map(|i| i as f32 * 0.5).collect(),
            });
        }

        self
    }

    /// Add a dimension without a coordinate variable.
    ///
    pub fn dimension(self, name: &str, len: usize) -> Self {
        self.contents
            .lock()
            .dimensions
            .push((name.to_string(), len));

        self
    }

    /// Add a scalar variable over the given dimensions, taking its values in logical order.
    ///
    pub fn scalar<D: Dimension>(self, name: &str, dims: &[&str], values: Array<f32, D>) -> Self {
        {
            let mut contents = self.contents.lock();
            contents
                .add_variable(name, dims, VariableKind::Scalar)
                .expect("bad test fixture");
            contents.variable_mut(name).unwrap().values = values.iter().copied().collect();
        }

        self
    }

    /// Add a compound variable whose members are packed 4 bytes apart.
    ///
    /// `records` holds every record end to end.
    ///
    pub fn compound(self, name: &str, dims: &[&str], members: &[&str], records: Vec<f32>) -> Self {
        let members = members
            .iter()
            .enumerate()
            .map(|(i, member)| Member {
                name: member.to_string(),
                offset: i * 4,
            })
            .collect();
        {
            let mut contents = self.contents.lock();
            contents
                .add_variable(name, dims, VariableKind::Compound(members))
                .expect("bad test fixture");
            contents.variable_mut(name).unwrap().values = records;
        }

        self
    }

    /// Add a variable that is neither scalar nor compound.
    ///
    pub fn other(self, name: &str, dims: &[&str]) -> Self {
        self.contents
            .lock()
            .add_variable(name, dims, VariableKind::Other(String::from("int")))
            .expect("bad test fixture");

        self
    }

    /// Make every access to `var` fail.
    ///
    pub fn break_variable(self, var: &str) -> Self {
        self.contents.lock().broken = Some(var.to_string());

        self
    }

    pub fn variable(&self, name: &str) -> Option<StoredVariable> {
        self.contents.lock().variable(name).ok().cloned()
    }

    pub fn values(&self, name: &str) -> Vec<f32> {
        self.variable(name).expect("no such variable").values
    }

    pub fn variable_names(&self) -> Vec<String> {
        self.contents
            .lock()
            .variables
            .iter()
            .map(|var| var.name.clone())
            .collect()
    }

    pub fn dimensions(&self) -> Vec<(String, usize)> {
        self.contents.lock().dimensions.clone()
    }

    pub fn compound_type(&self, type_name: &str) -> Option<Vec<String>> {
        self.contents.lock().types.get(type_name).cloned()
    }

    pub fn global(&self, name: &str) -> Option<String> {
        self.contents.lock().globals.get(name).cloned()
    }

    pub fn is_finished(&self) -> bool {
        self.contents.lock().finished
    }
}

impl Source for MemoryFile {
    fn dimension_count(&self) -> Result<usize> {
        Ok(self.contents.lock().dimensions.len())
    }

    fn variables(&self) -> Result<Vec<String>> {
        Ok(self.variable_names())
    }

    fn dimension_len(&self, name: &str) -> Result<usize> {
        self.contents.lock().dimension_len(name)
    }

    fn variable_kind(&self, var: &str) -> Result<VariableKind> {
        let contents = self.contents.lock();
        contents.check_readable(var)?;
        Ok(contents.variable(var)?.kind.clone())
    }

    fn text_attribute(&self, var: &str, name: &str) -> Result<Option<String>> {
        Ok(self
            .contents
            .lock()
            .variable(var)?
            .attributes
            .get(name)
            .cloned())
    }

    fn read_f32(&self, var: &str, out: &mut [f32]) -> Result<()> {
        let contents = self.contents.lock();
        contents.check_readable(var)?;
        let stored = contents.variable(var)?;
        if stored.kind != VariableKind::Scalar {
            return Err(Error::container(var, "not a scalar variable"));
        }
        if stored.values.len() != out.len() {
            return Err(Error::Layout(format!(
                "{var} holds {} values, expected {}",
                stored.values.len(),
                out.len()
            )));
        }
        out.copy_from_slice(&stored.values);

        Ok(())
    }

    fn read_records(&self, var: &str, out: &mut [f32]) -> Result<()> {
        let contents = self.contents.lock();
        contents.check_readable(var)?;
        let stored = contents.variable(var)?;
        if !matches!(stored.kind, VariableKind::Compound(_)) {
            return Err(Error::container(var, "not a compound variable"));
        }
        if stored.values.len() != out.len() {
            return Err(Error::Layout(format!(
                "{var} holds {} values, expected {}",
                stored.values.len(),
                out.len()
            )));
        }
        out.copy_from_slice(&stored.values);

        Ok(())
    }
}

impl Sink for MemoryFile {
    fn put_global_text(&mut self, name: &str, value: &str) -> Result<()> {
        let mut contents = self.contents.lock();
        contents.check_open(name)?;
        contents.globals.insert(name.to_string(), value.to_string());

        Ok(())
    }

    fn put_text(&mut self, var: &str, name: &str, value: &str) -> Result<()> {
        let mut contents = self.contents.lock();
        contents.check_open(var)?;
        contents
            .variable_mut(var)?
            .attributes
            .insert(name.to_string(), value.to_string());

        Ok(())
    }

    fn define_dimension(&mut self, name: &str, len: usize) -> Result<()> {
        let mut contents = self.contents.lock();
        contents.check_open(name)?;
        if contents.dimension_len(name).is_ok() {
            return Err(Error::container(name, "dimension already defined"));
        }
        contents.dimensions.push((name.to_string(), len));

        Ok(())
    }

    fn define_f32(&mut self, name: &str, dims: &[&str]) -> Result<()> {
        let mut contents = self.contents.lock();
        contents.check_open(name)?;
        contents.add_variable(name, dims, VariableKind::Scalar)
    }

    fn define_compound(&mut self, type_name: &str, members: &[&str]) -> Result<()> {
        let mut contents = self.contents.lock();
        contents.check_open(type_name)?;
        if contents.types.contains_key(type_name) {
            return Err(Error::container(type_name, "type already defined"));
        }
        if contents.variable(type_name).is_ok() {
            return Err(Error::container(type_name, "name already used by a variable"));
        }
        let members = members.iter().map(|member| member.to_string()).collect();
        contents.types.insert(type_name.to_string(), members);

        Ok(())
    }

    fn define_records(&mut self, name: &str, type_name: &str, dims: &[&str]) -> Result<()> {
        let mut contents = self.contents.lock();
        contents.check_open(name)?;
        let members = contents
            .types
            .get(type_name)
            .ok_or_else(|| Error::container(type_name, "no such type"))?
            .iter()
            .enumerate()
            .map(|(i, member)| Member {
                name: member.clone(),
                offset: i * 4,
            })
            .collect();
        contents.add_variable(name, dims, VariableKind::Compound(members))
    }

    fn set_chunking(&mut self, var: &str, chunks: &[usize]) -> Result<()> {
        let mut contents = self.contents.lock();
        contents.check_open(var)?;
        let stored = contents.variable_mut(var)?;
        if stored.dims.len() != chunks.len() {
            return Err(Error::container(var, "chunk rank does not match variable"));
        }
        stored.chunks = Some(chunks.to_vec());

        Ok(())
    }

    fn write_f32(&mut self, var: &str, values: &[f32]) -> Result<()> {
        let mut contents = self.contents.lock();
        contents.check_open(var)?;
        let dims = contents.variable(var)?.dims.clone();
        let expected = contents.points(&dims)?;
        let stored = contents.variable_mut(var)?;
        if stored.kind != VariableKind::Scalar || values.len() != expected {
            return Err(Error::container(var, "values do not fit the variable"));
        }
        stored.values = values.to_vec();

        Ok(())
    }

    fn write_records(&mut self, var: &str, values: &[f32]) -> Result<()> {
        let mut contents = self.contents.lock();
        contents.check_open(var)?;
        let dims = contents.variable(var)?.dims.clone();
        let points = contents.points(&dims)?;
        let stored = contents.variable_mut(var)?;
        let compound = matches!(stored.kind, VariableKind::Compound(_));
        if !compound || values.len() != points * stored.width() {
            return Err(Error::container(var, "records do not fit the variable"));
        }
        stored.values = values.to_vec();

        Ok(())
    }

    fn finish(self) -> Result<()> {
        let mut contents = self.contents.lock();
        contents.check_open("finish")?;
        contents.finished = true;

        Ok(())
    }
}
