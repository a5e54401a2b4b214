//! Naming conventions for the EFTS netCDF file format (STF 2.0).

use std::collections::HashSet;

use crate::dataset::EftsDataset;

pub const TIME_DIMNAME: &str = "time";
pub const STATION_DIMNAME: &str = "station";
pub const ENS_MEMBER_DIMNAME: &str = "ens_member";
pub const LEAD_TIME_DIMNAME: &str = "lead_time";
pub const STR_LEN_DIMNAME: &str = "str_len";

// int station_id[station]
pub const STATION_ID_VARNAME: &str = "station_id";
// char station_name[station,str_len]
pub const STATION_NAME_VARNAME: &str = "station_name";
// float lat[station]
pub const LAT_VARNAME: &str = "lat";
// float lon[station]
pub const LON_VARNAME: &str = "lon";
// float x[station]
pub const X_VARNAME: &str = "x";
// float y[station]
pub const Y_VARNAME: &str = "y";
// float area[station]
pub const AREA_VARNAME: &str = "area";
// float elevation[station]
pub const ELEVATION_VARNAME: &str = "elevation";

pub const TITLE_ATTR_KEY: &str = "title";
pub const INSTITUTION_ATTR_KEY: &str = "institution";
pub const SOURCE_ATTR_KEY: &str = "source";
pub const CATCHMENT_ATTR_KEY: &str = "catchment";
pub const STF_CONVENTION_VERSION_ATTR_KEY: &str = "STF_convention_version";
pub const STF_NC_SPEC_ATTR_KEY: &str = "STF_nc_spec";
pub const COMMENT_ATTR_KEY: &str = "comment";
pub const HISTORY_ATTR_KEY: &str = "history";

pub const TIME_STANDARD_ATTR_KEY: &str = "time_standard";
pub const STANDARD_NAME_ATTR_KEY: &str = "standard_name";
pub const LONG_NAME_ATTR_KEY: &str = "long_name";
pub const AXIS_ATTR_KEY: &str = "axis";
pub const UNITS_ATTR_KEY: &str = "units";
pub const FILL_VALUE_ATTR_KEY: &str = "_FillValue";

/// URL of the STF 2.0 convention document.
pub const STF_2_0_URL: &str = "https://github.com/csiro-hydroinformatics/efts/blob/d7d43a995fb5e459bcb894e09b7bb89de03e285c/docs/netcdf_for_water_forecasting.md";

/// Names reserved by the convention for dimensions and metadata variables.
pub fn conventional_varnames() -> [&'static str; 13] {
    [
        STATION_DIMNAME,
        LEAD_TIME_DIMNAME,
        TIME_DIMNAME,
        ENS_MEMBER_DIMNAME,
        STR_LEN_DIMNAME,
        STATION_ID_VARNAME,
        STATION_NAME_VARNAME,
        LAT_VARNAME,
        LON_VARNAME,
        X_VARNAME,
        Y_VARNAME,
        AREA_VARNAME,
        ELEVATION_VARNAME,
    ]
}

pub fn mandatory_global_attributes() -> [&'static str; 8] {
    [
        TITLE_ATTR_KEY,
        INSTITUTION_ATTR_KEY,
        SOURCE_ATTR_KEY,
        CATCHMENT_ATTR_KEY,
        STF_CONVENTION_VERSION_ATTR_KEY,
        STF_NC_SPEC_ATTR_KEY,
        COMMENT_ATTR_KEY,
        HISTORY_ATTR_KEY,
    ]
}

/// Dimensions a conforming netCDF file must declare, `str_len` included.
pub fn mandatory_netcdf_dimensions() -> [&'static str; 5] {
    [
        TIME_DIMNAME,
        STATION_DIMNAME,
        LEAD_TIME_DIMNAME,
        STR_LEN_DIMNAME,
        ENS_MEMBER_DIMNAME,
    ]
}

/// Dimensions of the in-memory data set, where station names are plain
/// strings and `str_len` does not exist.
pub fn mandatory_dataset_dimensions() -> [&'static str; 4] {
    [
        TIME_DIMNAME,
        STATION_DIMNAME,
        LEAD_TIME_DIMNAME,
        ENS_MEMBER_DIMNAME,
    ]
}

pub fn mandatory_varnames() -> [&'static str; 8] {
    [
        TIME_DIMNAME,
        STATION_DIMNAME,
        LEAD_TIME_DIMNAME,
        STATION_ID_VARNAME,
        STATION_NAME_VARNAME,
        ENS_MEMBER_DIMNAME,
        LAT_VARNAME,
        LON_VARNAME,
    ]
}

/// Default order of dimensions in the netCDF file:
/// `[lead_time, station, ens_member, time]`.
pub fn default_dim_order() -> [&'static str; 4] {
    [
        LEAD_TIME_DIMNAME,
        STATION_DIMNAME,
        ENS_MEMBER_DIMNAME,
        TIME_DIMNAME,
    ]
}

fn has_all_members<'a, I, J>(tested: I, reference: J) -> bool
where
    I: IntoIterator<Item = &'a str>,
    J: IntoIterator<Item = &'a str>,
{
    let tested: HashSet<&str> = tested.into_iter().collect();
    reference.into_iter().all(|r| tested.contains(r))
}

/// True when the data set has exactly the four in-memory EFTS dimensions.
pub fn has_required_dimensions(d: &EftsDataset) -> bool {
    let dims: HashSet<String> = d.get_dim_names().into_iter().collect();
    let reference: HashSet<String> = mandatory_dataset_dimensions()
        .iter()
        .map(|s| s.to_string())
        .collect();
    dims == reference
}

/// True when the netCDF file declares exactly the five STF 2.0 dimensions.
pub fn has_required_stf2_dimensions(file: &netcdf::File) -> bool {
    let dims: HashSet<String> = file.dimensions().map(|d| d.name().to_string()).collect();
    let reference: HashSet<String> = mandatory_netcdf_dimensions()
        .iter()
        .map(|s| s.to_string())
        .collect();
    dims == reference
}

/// True when all mandatory global attributes are present. Extra
/// attributes are allowed, so this is a superset check.
pub fn has_required_global_attributes(d: &EftsDataset) -> bool {
    let tested: Vec<String> = d.get_global_attribute_names();
    has_all_members(
        tested.iter().map(|s| s.as_str()),
        mandatory_global_attributes(),
    )
}

/// True when all mandatory variables (coordinates included) are present.
pub fn has_required_variables(d: &EftsDataset) -> bool {
    let tested: Vec<String> = d.get_variable_names();
    has_all_members(tested.iter().map(|s| s.as_str()), mandatory_varnames())
}
