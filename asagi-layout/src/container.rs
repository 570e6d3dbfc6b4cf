use crate::errors::Result;

/// A member of a compound (fixed layout, multi-field) record type
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Member {
    pub name: String,

    /// Byte offset of the member within one record
    pub offset: usize,
}

/// What kind of values a variable stores
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VariableKind {
    /// One 32 bit float per grid point
    Scalar,

    /// One record of 32 bit float members per grid point
    Compound(Vec<Member>),

    /// Anything else, with a human readable description of the stored type
    Other(String),
}

/// Read access to a structured-array file.
///
/// Variables are addressed by their stored names, exactly as returned by `variables`.
///
pub trait Source {
    /// Number of dimensions defined in the file.
    ///
    fn dimension_count(&self) -> Result<usize>;

    /// Stored names of all variables, in file order.
    ///
    fn variables(&self) -> Result<Vec<String>>;

    /// Length of the named dimension.
    ///
    fn dimension_len(&self, name: &str) -> Result<usize>;

    /// The kind of values stored in `var`.
    ///
    fn variable_kind(&self, var: &str) -> Result<VariableKind>;

    /// Get a text attribute of a variable, or `None` if the variable doesn't have it.
    ///
    fn text_attribute(&self, var: &str, name: &str) -> Result<Option<String>>;

    /// Read every value of a scalar variable into `out`.
    ///
    /// `out` must be exactly as long as the number of values stored.
    ///
    fn read_f32(&self, var: &str, out: &mut [f32]) -> Result<()>;

    /// Read every record of a compound variable into `out`, one float per member.
    ///
    /// Records are laid end to end, so `out` must be as long as the number of stored records
    /// times the number of members.
    ///
    fn read_records(&self, var: &str, out: &mut [f32]) -> Result<()>;
}

/// Write access to a newly created structured-array file.
///
pub trait Sink {
    /// Set a text attribute on the file itself.
    ///
    fn put_global_text(&mut self, name: &str, value: &str) -> Result<()>;

    /// Set a text attribute on a variable.
    ///
    fn put_text(&mut self, var: &str, name: &str, value: &str) -> Result<()>;

    /// Define a new dimension.
    ///
    fn define_dimension(&mut self, name: &str, len: usize) -> Result<()>;

    /// Define a new 32 bit float variable over `dims`, slowest varying dimension first.
    ///
    fn define_f32(&mut self, name: &str, dims: &[&str]) -> Result<()>;

    /// Define a compound record type made of 32 bit float members.
    ///
    /// Member `i` is packed at byte offset `4 * i`.
    ///
    fn define_compound(&mut self, type_name: &str, members: &[&str]) -> Result<()>;

    /// Define a new variable of a previously defined compound type over `dims`.
    ///
    fn define_records(&mut self, name: &str, type_name: &str, dims: &[&str]) -> Result<()>;

    /// Store `var` in chunks of the given extent, one entry per dimension of the variable.
    ///
    fn set_chunking(&mut self, var: &str, chunks: &[usize]) -> Result<()>;

    /// Write every value of a scalar variable.
    ///
    fn write_f32(&mut self, var: &str, values: &[f32]) -> Result<()>;

    /// Write every record of a compound variable, one float per member, records end to end.
    ///
    fn write_records(&mut self, var: &str, values: &[f32]) -> Result<()>;

    /// Flush and close the file.
    ///
    fn finish(self) -> Result<()>
    where
        Self: Sized;
}
