//! Reading an EFTS data set from a netCDF file.

use std::collections::HashMap;
use std::path::Path;

use ndarray::{ArrayD, IxDyn};
use tracing::{debug, info};

use crate::attributes::{AttributeValue, Attributes};
use crate::conventions::{
    ENS_MEMBER_DIMNAME, LEAD_TIME_DIMNAME, STATION_DIMNAME, STATION_ID_VARNAME,
    STATION_NAME_VARNAME, TIME_DIMNAME, TIME_STANDARD_ATTR_KEY, UNITS_ATTR_KEY,
};
use crate::data_io::byte_rows_to_strings;
use crate::dataset::EftsDataset;
use crate::dimensions::NamedArray;
use crate::error::EftsError;
use crate::time_utils::{parse_lead_time_step, TimeUnits};
use crate::variables::DataArray;

fn require_variable<'f>(
    file: &'f netcdf::File,
    name: &str,
) -> Result<netcdf::Variable<'f>, EftsError> {
    file.variable(name)
        .ok_or_else(|| EftsError::MissingVariable(name.to_string()))
}

fn attr_string(var: &netcdf::Variable, name: &str) -> Option<String> {
    var.attribute(name)
        .and_then(|a| a.value().ok())
        .and_then(|v| match v {
            netcdf::AttributeValue::Str(s) => Some(s),
            _ => None,
        })
}

fn convert_attr(value: netcdf::AttributeValue) -> Option<AttributeValue> {
    match value {
        netcdf::AttributeValue::Str(s) => Some(AttributeValue::Str(s)),
        netcdf::AttributeValue::Int(v) => Some(AttributeValue::Int(v)),
        netcdf::AttributeValue::Float(v) => Some(AttributeValue::Float(v)),
        netcdf::AttributeValue::Double(v) => Some(AttributeValue::Double(v)),
        netcdf::AttributeValue::Ints(v) => Some(AttributeValue::IntArray(v)),
        netcdf::AttributeValue::Floats(v) => Some(AttributeValue::FloatArray(v)),
        netcdf::AttributeValue::Doubles(v) => Some(AttributeValue::DoubleArray(v)),
        _ => None,
    }
}

fn global_attr_to_string(value: netcdf::AttributeValue) -> Option<String> {
    match value {
        netcdf::AttributeValue::Str(s) => Some(s),
        netcdf::AttributeValue::Int(v) => Some(v.to_string()),
        netcdf::AttributeValue::Float(v) => Some(v.to_string()),
        netcdf::AttributeValue::Double(v) => Some(v.to_string()),
        _ => None,
    }
}

/// Open an EFTS netCDF data set and load it into memory.
///
/// The time coordinate is not decoded by the container but read raw and
/// converted here, using the units attribute together with the
/// `time_standard` attribute of the time variable. Generic calendar
/// decoders mistake the relative lead time axis for a time coordinate,
/// so the explicit conversion sidesteps them entirely. Byte encoded
/// station names are converted to text on the way in.
pub fn open_efts(path: impl AsRef<Path>) -> Result<EftsDataset, EftsError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(EftsError::FileNotFound(
            path.to_string_lossy().to_string(),
        ));
    }
    let file = netcdf::open(path)?;

    let time_var = require_variable(&file, TIME_DIMNAME)?;
    let raw_time: Vec<f64> = time_var.get_values(..)?;
    let units = attr_string(&time_var, UNITS_ATTR_KEY).ok_or_else(|| {
        EftsError::MissingAttribute(format!("{}:{}", TIME_DIMNAME, UNITS_ATTR_KEY))
    })?;
    let time_units = TimeUnits::parse(&units)?;
    let time_zone =
        attr_string(&time_var, TIME_STANDARD_ATTR_KEY).unwrap_or_else(|| "UTC".to_string());
    let time = time_units.decode(&raw_time);

    let lead_var = require_variable(&file, LEAD_TIME_DIMNAME)?;
    let lead_times: Vec<f64> = lead_var.get_values(..)?;
    let lead_time_step = attr_string(&lead_var, UNITS_ATTR_KEY)
        .and_then(|u| parse_lead_time_step(&u).ok())
        .unwrap_or_default();

    let ens_var = require_variable(&file, ENS_MEMBER_DIMNAME)?;
    let ens_values: Vec<f64> = ens_var.get_values(..)?;
    let ens_members: Vec<i64> = ens_values.iter().map(|v| *v as i64).collect();

    let id_var = require_variable(&file, STATION_ID_VARNAME)?;
    let id_values: Vec<f64> = id_var.get_values(..)?;
    let station_ids: Vec<String> = id_values.iter().map(|v| (*v as i64).to_string()).collect();
    let n_stations = station_ids.len();

    let name_var = require_variable(&file, STATION_NAME_VARNAME)?;
    let str_len = name_var
        .dimensions()
        .iter()
        .map(|d| d.len())
        .last()
        .unwrap_or(0);
    let name_bytes: Vec<u8> = name_var.get_values(..)?;
    let station_names = byte_rows_to_strings(&name_bytes, n_stations, str_len)?;

    let coordinate_names = [
        TIME_DIMNAME,
        STATION_DIMNAME,
        LEAD_TIME_DIMNAME,
        ENS_MEMBER_DIMNAME,
        STATION_ID_VARNAME,
        STATION_NAME_VARNAME,
    ];
    let mut variables = HashMap::new();
    for var in file.variables() {
        let name = var.name().to_string();
        if coordinate_names.contains(&name.as_str()) {
            continue;
        }
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        let dim_names: Vec<String> = var
            .dimensions()
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        let raw: Vec<f64> = var.get_values(..)?;
        let data = ArrayD::from_shape_vec(IxDyn(&shape), raw)
            .map_err(|e| EftsError::Conversion(e.to_string()))?;
        let mut attrs = Attributes::new();
        for attr in var.attributes() {
            if let Ok(value) = attr.value() {
                if let Some(converted) = convert_attr(value) {
                    attrs.insert(attr.name().to_string(), converted);
                }
            }
        }
        debug!(variable = %name, ?shape, "loaded variable");
        variables.insert(
            name,
            DataArray::new(NamedArray::new(data, dim_names)?, attrs),
        );
    }

    let mut global_attributes = HashMap::new();
    for attr in file.attributes() {
        if let Ok(value) = attr.value() {
            if let Some(text) = global_attr_to_string(value) {
                global_attributes.insert(attr.name().to_string(), text);
            }
        }
    }

    info!(
        path = %path.display(),
        n_stations,
        n_time = time.len(),
        n_variables = variables.len(),
        "EFTS data set loaded"
    );

    let mut ds = EftsDataset::from_parts(
        time,
        station_ids,
        station_names,
        ens_members,
        lead_times,
        lead_time_step,
        variables,
        global_attributes,
        time_units,
        time_zone,
        None,
    );
    ds.set_path(path.to_path_buf());
    Ok(ds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_nonexistent_file_fails_early() {
        let result = open_efts("no_such_directory/no_such_file.nc");
        assert!(matches!(result, Err(EftsError::FileNotFound(_))));
    }
}
