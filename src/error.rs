use thiserror::Error;

/// Error type for all fallible EFTS operations.
#[derive(Error, Debug)]
pub enum EftsError {
    #[error("NetCDF error: {0}")]
    Netcdf(#[from] netcdf::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("identifier '{identifier}' not found in the dimension '{dimension}'")]
    NotFound {
        identifier: String,
        dimension: String,
    },

    #[error("Variable not found: {0}")]
    MissingVariable(String),

    #[error("Dimension not found: {0}")]
    MissingDimension(String),

    #[error("Attribute not found: {0}")]
    MissingAttribute(String),

    #[error("Missing mandatory global attributes: {0}")]
    MissingGlobalAttributes(String),

    #[error("Invalid dimensions for a data variable: {0}")]
    InvalidDimensions(String),

    #[error("Invalid dimension specifications for {count} variables ({names}), only codes 2, 3 and 4 are supported")]
    InvalidDimensionCode { count: usize, names: String },

    #[error("Expected a vector of {expected} dimension sizes, got {got}")]
    DimensionCount { expected: usize, got: usize },

    #[error("Dimension names to slice but not found in array dim names: {0}")]
    UnknownDimNames(String),

    #[error("Cannot drop non-degenerate dimension '{0}' when subsetting")]
    NonDegenerateDrop(String),

    #[error("dim names count {names} differs from the array rank {rank}")]
    DimNamesMismatch { names: usize, rank: usize },

    #[error("specified dim names are not unique: {0}")]
    DuplicateDimNames(String),

    #[error("Variable '{0}' clashes with an existing variable definition")]
    VariableNameClash(String),

    #[error("Data conversion error: {0}")]
    Conversion(String),

    #[error("Invalid time units: {0}")]
    InvalidTimeUnits(String),

    #[error("File already exists: {0}")]
    FileExists(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Shape mismatch for '{name}': expected {expected} values, got {got}")]
    ShapeMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),
}
