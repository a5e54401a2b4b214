pub mod attributes;
pub mod conventions;
pub mod data_io;
pub mod dataset;
pub mod dimensions;
pub mod error;
pub mod time_utils;
pub mod variables;

pub use data_io::{create_efts, open_efts, CreateEftsOptions};
pub use dataset::{EftsDataset, EftsSchema};
pub use error::EftsError;
