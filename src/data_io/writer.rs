//! Creating and writing EFTS netCDF data sets.

use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use tracing::info;

use crate::attributes::{AttributeValue, Attributes};
use crate::conventions::{
    AXIS_ATTR_KEY, CATCHMENT_ATTR_KEY, COMMENT_ATTR_KEY, ENS_MEMBER_DIMNAME, FILL_VALUE_ATTR_KEY,
    HISTORY_ATTR_KEY, INSTITUTION_ATTR_KEY, LEAD_TIME_DIMNAME, LONG_NAME_ATTR_KEY,
    SOURCE_ATTR_KEY, STANDARD_NAME_ATTR_KEY, STATION_DIMNAME, STATION_ID_VARNAME,
    STATION_NAME_VARNAME, STF_2_0_URL, STF_CONVENTION_VERSION_ATTR_KEY, STF_NC_SPEC_ATTR_KEY,
    STR_LEN_DIMNAME, TIME_DIMNAME, TIME_STANDARD_ATTR_KEY, TITLE_ATTR_KEY, UNITS_ATTR_KEY,
};
use crate::data_io::strings_to_byte_rows;
use crate::dataset::EftsDataset;
use crate::dimensions::STR_LEN;
use crate::error::EftsError;
use crate::time_utils::{TimeDimInfo, TimeStep};
use crate::variables::{create_efts_variables, DataArray, OptionalVarDef, VariableDefinition};

/// Options of [`create_efts`] with conventional defaults: no optional
/// variables, 48 lead steps, 50 ensemble members, hourly lead times.
#[derive(Debug, Clone)]
pub struct CreateEftsOptions {
    pub station_names: Option<Vec<String>>,
    pub optional_vars: Option<Vec<OptionalVarDef>>,
    pub lead_length: usize,
    pub ensemble_length: usize,
    pub lead_time_step: TimeStep,
}

impl Default for CreateEftsOptions {
    fn default() -> Self {
        Self {
            station_names: None,
            optional_vars: None,
            lead_length: 48,
            ensemble_length: 50,
            lead_time_step: TimeStep::Hours,
        }
    }
}

fn check_user_attributes(attrs: &HashMap<String, String>) -> Result<(), EftsError> {
    let required = [
        TITLE_ATTR_KEY,
        INSTITUTION_ATTR_KEY,
        SOURCE_ATTR_KEY,
        CATCHMENT_ATTR_KEY,
        COMMENT_ATTR_KEY,
    ];
    let missing: Vec<&str> = required
        .into_iter()
        .filter(|k| !attrs.contains_key(*k))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(EftsError::MissingGlobalAttributes(missing.join(", ")))
    }
}

fn pad_history(attrs: &mut HashMap<String, String>) {
    let line = format!(
        "{} UTC file created with the Rust package efts_rust {}",
        Utc::now().format("%Y-%m-%d %H:%M:%S"),
        env!("CARGO_PKG_VERSION")
    );
    match attrs.get_mut(HISTORY_ATTR_KEY) {
        Some(history) if !history.is_empty() => {
            history.push('\n');
            history.push_str(&line);
        }
        _ => {
            attrs.insert(HISTORY_ATTR_KEY.to_string(), line);
        }
    }
}

/// Create a new EFTS netCDF data set for write access.
///
/// The target file must not exist already; an existing file is never
/// touched. Station identifiers and the user half of the mandatory
/// global attributes (title, institution, source, catchment, comment)
/// are checked before anything is written, so a failed creation leaves
/// no partial file behind. The convention version, spec URL and a
/// creation history line are filled in here.
pub fn create_efts(
    fname: impl AsRef<Path>,
    time_dim_info: &TimeDimInfo,
    data_var_definitions: &[VariableDefinition],
    stations_ids: &[i64],
    nc_attributes: &HashMap<String, String>,
    options: CreateEftsOptions,
) -> Result<EftsDataset, EftsError> {
    let fname = fname.as_ref();
    if fname.exists() {
        return Err(EftsError::FileExists(fname.to_string_lossy().to_string()));
    }
    if stations_ids.is_empty() {
        return Err(EftsError::InvalidArgument(
            "station identifiers are required when creating a new EFTS netCDF data set"
                .to_string(),
        ));
    }
    check_user_attributes(nc_attributes)?;

    let built = create_efts_variables(
        data_var_definitions,
        time_dim_info,
        stations_ids,
        options.lead_length,
        options.ensemble_length,
        options.optional_vars.as_deref(),
        options.lead_time_step,
    )?;

    let station_ids: Vec<String> = stations_ids.iter().map(|v| v.to_string()).collect();
    let station_names = options
        .station_names
        .unwrap_or_else(|| station_ids.clone());
    if station_names.len() != station_ids.len() {
        return Err(EftsError::ShapeMismatch {
            name: STATION_NAME_VARNAME.to_string(),
            expected: station_ids.len(),
            got: station_names.len(),
        });
    }

    // Axis backing variables become wrapper coordinates; the per
    // station metadata stays in the variables map.
    let mut variables: HashMap<String, DataArray> = built.data_vars;
    for (name, var) in built.metadata_vars {
        match name.as_str() {
            STATION_ID_VARNAME | STATION_NAME_VARNAME | ENS_MEMBER_DIMNAME
            | LEAD_TIME_DIMNAME => {}
            _ => {
                variables.insert(name, var);
            }
        }
    }

    let mut global_attributes = nc_attributes.clone();
    global_attributes
        .entry(STF_CONVENTION_VERSION_ATTR_KEY.to_string())
        .or_insert_with(|| "2.0".to_string());
    global_attributes
        .entry(STF_NC_SPEC_ATTR_KEY.to_string())
        .or_insert_with(|| STF_2_0_URL.to_string());
    pad_history(&mut global_attributes);

    let lead_times: Vec<f64> = (1..=options.lead_length).map(|v| v as f64).collect();
    let ens_members: Vec<i64> = (1..=options.ensemble_length as i64).collect();

    let mut ds = EftsDataset::from_parts(
        time_dim_info.decode(),
        station_ids,
        station_names,
        ens_members,
        lead_times,
        options.lead_time_step,
        variables,
        global_attributes,
        time_dim_info.units,
        "UTC".to_string(),
        None,
    );
    ds.to_netcdf(fname)?;
    ds.set_path(fname.to_path_buf());

    info!(
        path = %fname.display(),
        n_stations = stations_ids.len(),
        n_data_vars = data_var_definitions.len(),
        "EFTS data set created"
    );
    Ok(ds)
}

fn put_attributes(
    var: &mut netcdf::VariableMut<'_>,
    attrs: &Attributes,
) -> Result<(), EftsError> {
    for (key, value) in attrs {
        match value {
            AttributeValue::Str(s) => {
                var.put_attribute(key, s.as_str())?;
            }
            AttributeValue::Int(v) => {
                var.put_attribute(key, *v)?;
            }
            AttributeValue::Float(v) => {
                var.put_attribute(key, *v)?;
            }
            AttributeValue::Double(v) => {
                var.put_attribute(key, *v)?;
            }
            AttributeValue::IntArray(v) => {
                var.put_attribute(key, v.clone())?;
            }
            AttributeValue::FloatArray(v) => {
                var.put_attribute(key, v.clone())?;
            }
            AttributeValue::DoubleArray(v) => {
                var.put_attribute(key, v.clone())?;
            }
        }
    }
    Ok(())
}

impl EftsDataset {
    /// Write the data set to a netCDF file, replacing any existing file.
    pub fn to_netcdf(&self, path: impl AsRef<Path>) -> Result<(), EftsError> {
        let path = path.as_ref();
        let mut file = netcdf::create(path)?;

        let [n_lead, n_stations, n_ens, _] = self.dim_sizes();
        file.add_unlimited_dimension(TIME_DIMNAME)?;
        file.add_dimension(STATION_DIMNAME, n_stations)?;
        file.add_dimension(LEAD_TIME_DIMNAME, n_lead)?;
        file.add_dimension(ENS_MEMBER_DIMNAME, n_ens)?;
        file.add_dimension(STR_LEN_DIMNAME, STR_LEN)?;

        for (key, value) in self.get_global_attributes() {
            file.add_attribute(key, value.as_str())?;
        }

        // The time coordinate goes first so that the unlimited
        // dimension has its full length before any data variable is
        // written against it.
        {
            let mut time_var = file.add_variable::<f64>(TIME_DIMNAME, &[TIME_DIMNAME])?;
            time_var.put_attribute(STANDARD_NAME_ATTR_KEY, TIME_DIMNAME)?;
            time_var.put_attribute(LONG_NAME_ATTR_KEY, TIME_DIMNAME)?;
            time_var.put_attribute(UNITS_ATTR_KEY, self.time_units().to_string())?;
            time_var.put_attribute(TIME_STANDARD_ATTR_KEY, self.get_time_zone())?;
            time_var.put_attribute(AXIS_ATTR_KEY, "t")?;
            let values = self.time_units().encode(self.get_time_dim());
            time_var.put_values(&values, 0..values.len())?;
        }

        {
            let mut station_var = file.add_variable::<i32>(STATION_DIMNAME, &[STATION_DIMNAME])?;
            let values: Vec<i32> = self.stations().iter().map(|v| *v as i32).collect();
            station_var.put_values(&values, ..)?;
        }

        {
            let mut lead_var = file.add_variable::<f64>(LEAD_TIME_DIMNAME, &[LEAD_TIME_DIMNAME])?;
            put_attributes(&mut lead_var, &self.lead_time_attrs())?;
            lead_var.put_values(self.get_lead_time_values(), ..)?;
        }

        {
            let mut ens_var =
                file.add_variable::<i32>(ENS_MEMBER_DIMNAME, &[ENS_MEMBER_DIMNAME])?;
            ens_var.put_attribute(STANDARD_NAME_ATTR_KEY, ENS_MEMBER_DIMNAME)?;
            ens_var.put_attribute(LONG_NAME_ATTR_KEY, "ensemble member")?;
            ens_var.put_attribute(UNITS_ATTR_KEY, "member id")?;
            ens_var.put_attribute(AXIS_ATTR_KEY, "u")?;
            let values: Vec<i32> = self.ens_members().iter().map(|v| *v as i32).collect();
            ens_var.put_values(&values, ..)?;
        }

        {
            let mut id_var = file.add_variable::<i64>(STATION_ID_VARNAME, &[STATION_DIMNAME])?;
            id_var.put_attribute(LONG_NAME_ATTR_KEY, "station or node identification code")?;
            let values: Result<Vec<i64>, EftsError> = self
                .get_station_ids()
                .iter()
                .map(|s| {
                    s.parse::<i64>().map_err(|_| {
                        EftsError::Conversion(format!(
                            "station identifier '{}' cannot be stored as an integer",
                            s
                        ))
                    })
                })
                .collect();
            id_var.put_values(&values?, ..)?;
        }

        {
            let mut name_var = file
                .add_variable::<u8>(STATION_NAME_VARNAME, &[STATION_DIMNAME, STR_LEN_DIMNAME])?;
            name_var.put_attribute(LONG_NAME_ATTR_KEY, "station or node name")?;
            let bytes = strings_to_byte_rows(self.get_station_names(), STR_LEN);
            name_var.put_values(&bytes, (.., ..))?;
        }

        for (name, da) in self.variables() {
            let dim_names: Vec<&str> = da.values.dim_names().iter().map(|s| s.as_str()).collect();
            let mut var = file.add_variable::<f64>(name, &dim_names)?;
            put_attributes(&mut var, &da.attrs)?;
            let fill = match da.attrs.get("missval") {
                Some(AttributeValue::Double(v)) => *v,
                _ => -9999.0,
            };
            var.put_attribute(FILL_VALUE_ATTR_KEY, fill)?;
            let flat: Vec<f64> = da
                .values
                .values()
                .iter()
                .map(|v| if v.is_nan() { fill } else { *v })
                .collect();
            var.put_values(&flat, ..)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::create_global_attributes;
    use crate::time_utils::create_time_info;
    use chrono::{TimeZone, Utc};
    use std::io::Write;

    fn sample_attrs() -> HashMap<String, String> {
        create_global_attributes(
            "data set title",
            "my org",
            "A journal reference, URL",
            "Upper_Murray",
            "example",
            false,
        )
        .unwrap()
    }

    fn sample_time_info() -> TimeDimInfo {
        let start = Utc.with_ymd_and_hms(2010, 8, 1, 14, 0, 0).unwrap();
        create_time_info(start, 12, TimeStep::Hours)
    }

    #[test]
    fn create_refuses_existing_file() {
        let mut existing = tempfile::NamedTempFile::new().unwrap();
        existing.write_all(b"do not touch").unwrap();
        existing.flush().unwrap();

        let result = create_efts(
            existing.path(),
            &sample_time_info(),
            &[],
            &[123, 456],
            &sample_attrs(),
            CreateEftsOptions::default(),
        );
        assert!(matches!(result, Err(EftsError::FileExists(_))));
        let content = std::fs::read(existing.path()).unwrap();
        assert_eq!(content, b"do not touch");
    }

    #[test]
    fn create_requires_station_ids() {
        let dir = tempfile::tempdir().unwrap();
        let result = create_efts(
            dir.path().join("new.nc"),
            &sample_time_info(),
            &[],
            &[],
            &sample_attrs(),
            CreateEftsOptions::default(),
        );
        assert!(matches!(result, Err(EftsError::InvalidArgument(_))));
    }

    #[test]
    fn create_requires_mandatory_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let mut attrs = sample_attrs();
        attrs.remove(CATCHMENT_ATTR_KEY);
        attrs.remove(COMMENT_ATTR_KEY);
        let result = create_efts(
            dir.path().join("new.nc"),
            &sample_time_info(),
            &[],
            &[1],
            &attrs,
            CreateEftsOptions::default(),
        );
        match result {
            Err(EftsError::MissingGlobalAttributes(names)) => {
                assert!(names.contains(CATCHMENT_ATTR_KEY));
                assert!(names.contains(COMMENT_ATTR_KEY));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn history_line_is_appended() {
        let mut attrs = sample_attrs();
        attrs.insert(HISTORY_ATTR_KEY.to_string(), "earlier entry".to_string());
        pad_history(&mut attrs);
        let history = &attrs[HISTORY_ATTR_KEY];
        assert!(history.starts_with("earlier entry\n"));
        assert!(history.contains("efts_rust"));
    }
}
