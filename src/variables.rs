//! EFTS variable definitions and their dimensionality dispatch.
//!
//! Data variables come in three layouts, identified in STF variable
//! tables by the dimensionality codes "2", "3" and "4". The codes are
//! parsed once into [`VarDims`] so that downstream code cannot hold an
//! invalid layout.

use std::collections::HashMap;

use ndarray::{ArrayD, IxDyn};

use crate::attributes::{AttributeValue, Attributes};
use crate::conventions::{
    ENS_MEMBER_DIMNAME, LAT_VARNAME, LEAD_TIME_DIMNAME, LON_VARNAME, LONG_NAME_ATTR_KEY,
    STATION_DIMNAME, STATION_ID_VARNAME, STATION_NAME_VARNAME, STR_LEN_DIMNAME, TIME_DIMNAME,
    UNITS_ATTR_KEY,
};
use crate::dimensions::{NamedArray, STR_LEN};
use crate::error::EftsError;
use crate::time_utils::{lead_time_units, TimeDimInfo, TimeStep};

/// The set of axes a data variable is defined on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarDims {
    /// Code "2": `[station, time]`
    PointTimeSeries,
    /// Code "3": `[station, ens_member, time]`
    EnsembleTimeSeries,
    /// Code "4": `[lead_time, station, ens_member, time]`
    EnsembleForecast,
}

impl VarDims {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "2" => Some(VarDims::PointTimeSeries),
            "3" => Some(VarDims::EnsembleTimeSeries),
            "4" => Some(VarDims::EnsembleForecast),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            VarDims::PointTimeSeries => "2",
            VarDims::EnsembleTimeSeries => "3",
            VarDims::EnsembleForecast => "4",
        }
    }

    pub fn dim_names(&self) -> &'static [&'static str] {
        match self {
            VarDims::PointTimeSeries => &[STATION_DIMNAME, TIME_DIMNAME],
            VarDims::EnsembleTimeSeries => {
                &[STATION_DIMNAME, ENS_MEMBER_DIMNAME, TIME_DIMNAME]
            }
            VarDims::EnsembleForecast => &[
                LEAD_TIME_DIMNAME,
                STATION_DIMNAME,
                ENS_MEMBER_DIMNAME,
                TIME_DIMNAME,
            ],
        }
    }
}

/// Storage precision of a variable, as named in STF definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    #[default]
    Double,
    Float,
    Integer,
    Char,
}

impl Precision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Double => "double",
            Precision::Float => "float",
            Precision::Integer => "integer",
            Precision::Char => "char",
        }
    }
}

/// Definition of one data variable: metadata only, consumed to allocate
/// a backing array and attach attributes.
#[derive(Debug, Clone)]
pub struct VariableDefinition {
    pub name: String,
    pub long_name: String,
    pub units: String,
    pub missing_value: f64,
    pub precision: Precision,
    pub dims: VarDims,
    pub attributes: Attributes,
}

impl VariableDefinition {
    /// Build a definition from a dimensionality code, rejecting codes
    /// outside "2", "3" and "4".
    pub fn new(
        name: &str,
        long_name: &str,
        units: &str,
        missing_value: f64,
        precision: Precision,
        dim_code: &str,
        attributes: Option<Attributes>,
    ) -> Result<Self, EftsError> {
        let dims = VarDims::from_code(dim_code).ok_or_else(|| EftsError::InvalidDimensionCode {
            count: 1,
            names: name.to_string(),
        })?;
        let long_name = if long_name.is_empty() { name } else { long_name };
        Ok(Self {
            name: name.to_string(),
            long_name: long_name.to_string(),
            units: units.to_string(),
            missing_value,
            precision,
            dims,
            attributes: attributes.unwrap_or_default(),
        })
    }

    /// Variable attributes to attach to the allocated array.
    pub fn variable_attributes(&self) -> Attributes {
        let mut attrs = self.attributes.clone();
        attrs.insert(
            LONG_NAME_ATTR_KEY.to_string(),
            AttributeValue::from(self.long_name.as_str()),
        );
        attrs.insert(
            UNITS_ATTR_KEY.to_string(),
            AttributeValue::from(self.units.as_str()),
        );
        attrs.insert(
            "missval".to_string(),
            AttributeValue::Double(self.missing_value),
        );
        attrs.insert(
            "precision".to_string(),
            AttributeValue::from(self.precision.as_str()),
        );
        attrs
    }
}

/// One row of a variable definition table, with the dimensionality code
/// still in its raw string form.
#[derive(Debug, Clone)]
pub struct VariableRecord {
    pub name: String,
    pub long_name: String,
    pub units: String,
    pub missing_value: f64,
    pub precision: Precision,
    pub dimensions: String,
    pub attributes: Attributes,
}

impl VariableRecord {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            long_name: String::new(),
            units: "mm".to_string(),
            missing_value: -9999.0,
            precision: Precision::Double,
            dimensions: "4".to_string(),
            attributes: Attributes::new(),
        }
    }
}

/// Turn a table of records into variable definitions.
///
/// Records with a dimensionality code outside "2", "3" and "4" are all
/// reported in a single error, with their count and names.
pub fn create_variable_definitions(
    records: &[VariableRecord],
) -> Result<Vec<VariableDefinition>, EftsError> {
    let invalid: Vec<&str> = records
        .iter()
        .filter(|r| VarDims::from_code(&r.dimensions).is_none())
        .map(|r| r.name.as_str())
        .collect();
    if !invalid.is_empty() {
        return Err(EftsError::InvalidDimensionCode {
            count: invalid.len(),
            names: invalid.join(", "),
        });
    }
    records
        .iter()
        .map(|r| {
            VariableDefinition::new(
                &r.name,
                &r.long_name,
                &r.units,
                r.missing_value,
                r.precision,
                &r.dimensions,
                Some(r.attributes.clone()),
            )
        })
        .collect()
}

/// Definition of an optional per-station geolocation variable.
#[derive(Debug, Clone)]
pub struct OptionalVarDef {
    pub name: String,
    pub long_name: String,
    pub standard_name: String,
    pub units: String,
    pub missing_value: f64,
    pub precision: Precision,
}

/// Template definitions of the optional geolocation variables x, y,
/// area and elevation.
pub fn default_optional_variable_definitions() -> Vec<OptionalVarDef> {
    vec![
        OptionalVarDef {
            name: "x".to_string(),
            long_name: "easting from the GDA94 datum in MGA Zone 55".to_string(),
            standard_name: "easting_GDA94_zone55".to_string(),
            units: String::new(),
            missing_value: f64::NAN,
            precision: Precision::Float,
        },
        OptionalVarDef {
            name: "y".to_string(),
            long_name: "northing from the GDA94 datum in MGA Zone 55".to_string(),
            standard_name: "northing_GDA94_zone55".to_string(),
            units: String::new(),
            missing_value: f64::NAN,
            precision: Precision::Float,
        },
        OptionalVarDef {
            name: "area".to_string(),
            long_name: "catchment area".to_string(),
            standard_name: "area".to_string(),
            units: "km^2".to_string(),
            missing_value: -9999.0,
            precision: Precision::Float,
        },
        OptionalVarDef {
            name: "elevation".to_string(),
            long_name: "station elevation above sea level".to_string(),
            standard_name: "elevation".to_string(),
            units: "m".to_string(),
            missing_value: -9999.0,
            precision: Precision::Float,
        },
    ]
}

/// A variable instance: the allocated array and its attributes.
#[derive(Debug, Clone)]
pub struct DataArray {
    pub values: NamedArray,
    pub attrs: Attributes,
}

impl DataArray {
    pub fn new(values: NamedArray, attrs: Attributes) -> Self {
        Self { values, attrs }
    }

    /// Allocate a NaN filled array on the given named axes.
    pub fn nan_filled(dims: &[(String, usize)], attrs: Attributes) -> Self {
        Self {
            values: NamedArray::from_elem(dims, f64::NAN),
            attrs,
        }
    }
}

/// The variables of an EFTS schema, split into convention metadata
/// variables and user data variables.
#[derive(Debug)]
pub struct EftsVariables {
    pub metadata_vars: HashMap<String, DataArray>,
    pub data_vars: HashMap<String, DataArray>,
}

fn metadata_attrs(long_name: &str, units: &str, precision: Precision) -> Attributes {
    let mut attrs = Attributes::new();
    attrs.insert(
        LONG_NAME_ATTR_KEY.to_string(),
        AttributeValue::from(long_name),
    );
    attrs.insert(UNITS_ATTR_KEY.to_string(), AttributeValue::from(units));
    attrs.insert(
        "precision".to_string(),
        AttributeValue::from(precision.as_str()),
    );
    attrs
}

/// Build the six mandatory metadata variables from the dimension sizes.
fn create_mandatory_vars(
    stations_ids: &[i64],
    lead_length: usize,
    ensemble_length: usize,
    lead_time_step: TimeStep,
) -> HashMap<String, DataArray> {
    let n_stations = stations_ids.len();
    let station_dim = (STATION_DIMNAME.to_string(), n_stations);
    let mut vars = HashMap::new();

    let ids = ArrayD::from_shape_vec(
        IxDyn(&[n_stations]),
        stations_ids.iter().map(|v| *v as f64).collect(),
    )
    .expect("station id shape is its own length");
    vars.insert(
        STATION_ID_VARNAME.to_string(),
        DataArray::new(
            NamedArray::new(ids, vec![STATION_DIMNAME.to_string()])
                .expect("one name for one axis"),
            metadata_attrs(
                "station or node identification code",
                "",
                Precision::Integer,
            ),
        ),
    );
    vars.insert(
        STATION_NAME_VARNAME.to_string(),
        DataArray::nan_filled(
            &[station_dim.clone(), (STR_LEN_DIMNAME.to_string(), STR_LEN)],
            metadata_attrs("station or node name", "", Precision::Char),
        ),
    );
    vars.insert(
        ENS_MEMBER_DIMNAME.to_string(),
        DataArray::new(
            NamedArray::new(
                ArrayD::from_shape_vec(
                    IxDyn(&[ensemble_length]),
                    (1..=ensemble_length).map(|v| v as f64).collect(),
                )
                .expect("member index shape is its own length"),
                vec![ENS_MEMBER_DIMNAME.to_string()],
            )
            .expect("one name for one axis"),
            metadata_attrs("ensemble member", "member id", Precision::Integer),
        ),
    );
    vars.insert(
        LEAD_TIME_DIMNAME.to_string(),
        DataArray::new(
            NamedArray::new(
                ArrayD::from_shape_vec(
                    IxDyn(&[lead_length]),
                    (1..=lead_length).map(|v| v as f64).collect(),
                )
                .expect("lead index shape is its own length"),
                vec![LEAD_TIME_DIMNAME.to_string()],
            )
            .expect("one name for one axis"),
            metadata_attrs(
                "forecast lead time",
                &lead_time_units(lead_time_step),
                Precision::Integer,
            ),
        ),
    );
    vars.insert(
        LAT_VARNAME.to_string(),
        DataArray::nan_filled(
            &[station_dim.clone()],
            metadata_attrs("latitude", "degrees north", Precision::Float),
        ),
    );
    vars.insert(
        LON_VARNAME.to_string(),
        DataArray::nan_filled(
            &[station_dim],
            metadata_attrs("longitude", "degrees east", Precision::Float),
        ),
    );
    vars
}

/// Create all netCDF variables for a new EFTS schema.
///
/// Data definitions are partitioned by their dimensionality and each
/// gets a NaN filled backing array shaped on the matching axis tuple.
/// A name clash between data or optional variables and the mandatory
/// metadata variables is an error.
pub fn create_efts_variables(
    data_var_defs: &[VariableDefinition],
    time_dim_info: &TimeDimInfo,
    stations_ids: &[i64],
    lead_length: usize,
    ensemble_length: usize,
    optional_vars: Option<&[OptionalVarDef]>,
    lead_time_step: TimeStep,
) -> Result<EftsVariables, EftsError> {
    let n_time = time_dim_info.values.len();
    let n_stations = stations_ids.len();

    let mut metadata_vars =
        create_mandatory_vars(stations_ids, lead_length, ensemble_length, lead_time_step);

    if let Some(optional) = optional_vars {
        for def in optional {
            if metadata_vars.contains_key(&def.name) {
                return Err(EftsError::VariableNameClash(def.name.clone()));
            }
            let mut attrs = metadata_attrs(&def.long_name, &def.units, def.precision);
            attrs.insert(
                "standard_name".to_string(),
                AttributeValue::from(def.standard_name.as_str()),
            );
            attrs.insert("missval".to_string(), AttributeValue::Double(def.missing_value));
            metadata_vars.insert(
                def.name.clone(),
                DataArray::nan_filled(&[(STATION_DIMNAME.to_string(), n_stations)], attrs),
            );
        }
    }

    let size_for = |name: &str| -> usize {
        match name {
            n if n == LEAD_TIME_DIMNAME => lead_length,
            n if n == STATION_DIMNAME => n_stations,
            n if n == ENS_MEMBER_DIMNAME => ensemble_length,
            _ => n_time,
        }
    };

    let mut data_vars = HashMap::new();
    for def in data_var_defs {
        if metadata_vars.contains_key(&def.name) || data_vars.contains_key(&def.name) {
            return Err(EftsError::VariableNameClash(def.name.clone()));
        }
        let dims: Vec<(String, usize)> = def
            .dims
            .dim_names()
            .iter()
            .map(|n| (n.to_string(), size_for(n)))
            .collect();
        data_vars.insert(
            def.name.clone(),
            DataArray::nan_filled(&dims, def.variable_attributes()),
        );
    }

    Ok(EftsVariables {
        metadata_vars,
        data_vars,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_utils::create_time_info;
    use chrono::{TimeZone, Utc};

    fn records(codes: &[&str]) -> Vec<VariableRecord> {
        codes
            .iter()
            .enumerate()
            .map(|(i, code)| {
                let mut r = VariableRecord::new(&format!("var_{}", i));
                r.dimensions = code.to_string();
                r
            })
            .collect()
    }

    #[test]
    fn definitions_partition_by_code() {
        let defs =
            create_variable_definitions(&records(&["4", "2", "3", "4", "2", "3"])).unwrap();
        assert_eq!(defs.len(), 6);
        let count = |d: VarDims| defs.iter().filter(|v| v.dims == d).count();
        assert_eq!(count(VarDims::EnsembleForecast), 2);
        assert_eq!(count(VarDims::EnsembleTimeSeries), 2);
        assert_eq!(count(VarDims::PointTimeSeries), 2);
        assert_eq!(
            count(VarDims::EnsembleForecast)
                + count(VarDims::EnsembleTimeSeries)
                + count(VarDims::PointTimeSeries),
            defs.len()
        );
    }

    #[test]
    fn invalid_code_rejected_with_names() {
        let result = create_variable_definitions(&records(&["4", "5", "2", "7"]));
        match result {
            Err(EftsError::InvalidDimensionCode { count, names }) => {
                assert_eq!(count, 2);
                assert!(names.contains("var_1"));
                assert!(names.contains("var_3"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn var_dims_shapes() {
        assert_eq!(
            VarDims::EnsembleForecast.dim_names(),
            &["lead_time", "station", "ens_member", "time"]
        );
        assert_eq!(VarDims::PointTimeSeries.dim_names(), &["station", "time"]);
        assert_eq!(VarDims::from_code("5"), None);
        assert_eq!(VarDims::from_code("3"), Some(VarDims::EnsembleTimeSeries));
    }

    fn sample_time_info() -> crate::time_utils::TimeDimInfo {
        let start = Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).unwrap();
        create_time_info(start, 31, TimeStep::Days)
    }

    #[test]
    fn efts_variables_shapes_follow_codes() {
        let mut r4 = VariableRecord::new("rain_fcast_ens");
        r4.dimensions = "4".to_string();
        let mut r3 = VariableRecord::new("rain_ens");
        r3.dimensions = "3".to_string();
        let mut r2 = VariableRecord::new("rain_obs");
        r2.dimensions = "2".to_string();
        let defs = create_variable_definitions(&[r4, r3, r2]).unwrap();

        let built = create_efts_variables(
            &defs,
            &sample_time_info(),
            &[123, 456],
            3,
            10,
            None,
            TimeStep::Hours,
        )
        .unwrap();

        assert_eq!(
            built.data_vars["rain_fcast_ens"].values.shape(),
            &[3, 2, 10, 31]
        );
        assert_eq!(built.data_vars["rain_ens"].values.shape(), &[2, 10, 31]);
        assert_eq!(built.data_vars["rain_obs"].values.shape(), &[2, 31]);
        assert_eq!(built.metadata_vars.len(), 6);
        assert!(built.metadata_vars.contains_key("station_id"));
        assert!(built.metadata_vars.contains_key("lat"));
    }

    #[test]
    fn name_clash_with_mandatory_is_rejected() {
        let mut r = VariableRecord::new("lat");
        r.dimensions = "2".to_string();
        let defs = create_variable_definitions(&[r]).unwrap();
        let result = create_efts_variables(
            &defs,
            &sample_time_info(),
            &[1],
            1,
            1,
            None,
            TimeStep::Hours,
        );
        assert!(matches!(
            result,
            Err(EftsError::VariableNameClash(name)) if name == "lat"
        ));
    }

    #[test]
    fn optional_vars_join_metadata() {
        let optional = default_optional_variable_definitions();
        let built = create_efts_variables(
            &[],
            &sample_time_info(),
            &[1, 2],
            4,
            5,
            Some(&optional),
            TimeStep::Hours,
        )
        .unwrap();
        assert_eq!(built.metadata_vars.len(), 10);
        assert_eq!(built.metadata_vars["area"].values.shape(), &[2]);
    }
}
