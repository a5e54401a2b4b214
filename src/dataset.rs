//! In-memory wrapper for an Ensemble Forecast Time Series data set.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::attributes::{default_global_attributes, AttributeValue, Attributes};
use crate::conventions::{
    conventional_varnames, default_dim_order, AREA_VARNAME, AXIS_ATTR_KEY, ENS_MEMBER_DIMNAME,
    LAT_VARNAME, LEAD_TIME_DIMNAME, LON_VARNAME, LONG_NAME_ATTR_KEY, STANDARD_NAME_ATTR_KEY,
    STATION_DIMNAME, STATION_ID_VARNAME, STATION_NAME_VARNAME, TIME_DIMNAME, UNITS_ATTR_KEY,
};
use crate::dimensions::{reduce_dimensions, splice_dims, NamedArray};
use crate::error::EftsError;
use crate::time_utils::{lead_time_units, TimeStep, TimeUnits};
use crate::variables::{DataArray, VariableDefinition};

/// Definition of a new in-memory EFTS data set.
///
/// Only issue times and station identifiers are required; everything
/// else has a conventional default.
#[derive(Debug, Clone)]
pub struct EftsSchema {
    pub issue_times: Vec<DateTime<Utc>>,
    pub station_ids: Vec<String>,
    pub lead_times: Vec<f64>,
    pub lead_time_step: TimeStep,
    pub ensemble_size: usize,
    pub station_names: Option<Vec<String>>,
    pub latitudes: Option<Vec<f64>>,
    pub longitudes: Option<Vec<f64>>,
    pub areas: Option<Vec<f64>>,
    pub global_attributes: Option<HashMap<String, String>>,
}

impl EftsSchema {
    pub fn new(issue_times: Vec<DateTime<Utc>>, station_ids: Vec<String>) -> Self {
        Self {
            issue_times,
            station_ids,
            lead_times: vec![0.0],
            lead_time_step: TimeStep::Hours,
            ensemble_size: 1,
            station_names: None,
            latitudes: None,
            longitudes: None,
            areas: None,
            global_attributes: None,
        }
    }
}

/// Convenience wrapper for access to an Ensemble Forecast Time Series.
///
/// The wrapper owns its state outright: coordinate vectors, the
/// variables map and the global attributes. Nothing is lazily cached,
/// so there is no invalidation to get wrong when values are replaced.
#[derive(Debug)]
pub struct EftsDataset {
    time: Vec<DateTime<Utc>>,
    stations: Vec<i64>,
    station_ids: Vec<String>,
    station_names: Vec<String>,
    ens_members: Vec<i64>,
    lead_times: Vec<f64>,
    lead_time_step: TimeStep,
    variables: HashMap<String, DataArray>,
    global_attributes: HashMap<String, String>,
    time_units: TimeUnits,
    time_zone: String,
    path: Option<PathBuf>,
}

fn station_var_attrs(long_name: &str, units: &str, axis: Option<&str>) -> Attributes {
    let mut attrs = Attributes::new();
    attrs.insert(
        LONG_NAME_ATTR_KEY.to_string(),
        AttributeValue::from(long_name),
    );
    if !units.is_empty() {
        attrs.insert(UNITS_ATTR_KEY.to_string(), AttributeValue::from(units));
    }
    if let Some(axis) = axis {
        attrs.insert(AXIS_ATTR_KEY.to_string(), AttributeValue::from(axis));
    }
    attrs
}

impl EftsDataset {
    /// Create a new in-memory data set from a schema definition.
    pub fn new(schema: EftsSchema) -> Result<Self, EftsError> {
        let n_stations = schema.station_ids.len();
        if n_stations == 0 {
            return Err(EftsError::InvalidArgument(
                "at least one station identifier is required".to_string(),
            ));
        }
        if schema.issue_times.is_empty() {
            return Err(EftsError::InvalidArgument(
                "at least one issue time is required".to_string(),
            ));
        }
        let check_len = |name: &str, len: Option<usize>| -> Result<(), EftsError> {
            match len {
                Some(l) if l != n_stations => Err(EftsError::ShapeMismatch {
                    name: name.to_string(),
                    expected: n_stations,
                    got: l,
                }),
                _ => Ok(()),
            }
        };
        check_len(STATION_NAME_VARNAME, schema.station_names.as_ref().map(Vec::len))?;
        check_len(LAT_VARNAME, schema.latitudes.as_ref().map(Vec::len))?;
        check_len(LON_VARNAME, schema.longitudes.as_ref().map(Vec::len))?;
        check_len(AREA_VARNAME, schema.areas.as_ref().map(Vec::len))?;

        let station_names = schema
            .station_names
            .unwrap_or_else(|| schema.station_ids.clone());

        let origin = schema.issue_times[0];
        let station_dim = vec![(STATION_DIMNAME.to_string(), n_stations)];
        let station_values = |values: Option<Vec<f64>>| -> Result<NamedArray, EftsError> {
            match values {
                Some(v) => NamedArray::new(
                    ndarray::ArrayD::from_shape_vec(ndarray::IxDyn(&[n_stations]), v)
                        .map_err(|e| EftsError::Conversion(e.to_string()))?,
                    vec![STATION_DIMNAME.to_string()],
                ),
                None => Ok(NamedArray::from_elem(&station_dim, f64::NAN)),
            }
        };

        let mut variables = HashMap::new();
        variables.insert(
            LAT_VARNAME.to_string(),
            DataArray::new(
                station_values(schema.latitudes)?,
                station_var_attrs("latitude", "degrees_north", Some("y")),
            ),
        );
        variables.insert(
            LON_VARNAME.to_string(),
            DataArray::new(
                station_values(schema.longitudes)?,
                station_var_attrs("longitude", "degrees_east", Some("x")),
            ),
        );
        let mut area_attrs = station_var_attrs("station area", "km^2", None);
        area_attrs.insert(
            STANDARD_NAME_ATTR_KEY.to_string(),
            AttributeValue::from(AREA_VARNAME),
        );
        variables.insert(
            AREA_VARNAME.to_string(),
            DataArray::new(station_values(schema.areas)?, area_attrs),
        );

        Ok(Self {
            stations: (1..=n_stations as i64).collect(),
            station_ids: schema.station_ids,
            station_names,
            ens_members: (1..=schema.ensemble_size as i64).collect(),
            lead_times: schema.lead_times,
            lead_time_step: schema.lead_time_step,
            time: schema.issue_times,
            variables,
            global_attributes: schema
                .global_attributes
                .unwrap_or_else(default_global_attributes),
            time_units: TimeUnits::new(TimeStep::Hours, origin),
            time_zone: "UTC".to_string(),
            path: None,
        })
    }

    /// Assemble a data set from already loaded parts. Used by the file
    /// reader and the schema writer.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        time: Vec<DateTime<Utc>>,
        station_ids: Vec<String>,
        station_names: Vec<String>,
        ens_members: Vec<i64>,
        lead_times: Vec<f64>,
        lead_time_step: TimeStep,
        variables: HashMap<String, DataArray>,
        global_attributes: HashMap<String, String>,
        time_units: TimeUnits,
        time_zone: String,
        path: Option<PathBuf>,
    ) -> Self {
        let n_stations = station_ids.len();
        Self {
            time,
            stations: (1..=n_stations as i64).collect(),
            station_ids,
            station_names,
            ens_members,
            lead_times,
            lead_time_step,
            variables,
            global_attributes,
            time_units,
            time_zone,
            path,
        }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    pub(crate) fn set_path(&mut self, path: PathBuf) {
        self.path = Some(path);
    }

    /// Names of all dimensions of the data set.
    pub fn get_dim_names(&self) -> Vec<String> {
        default_dim_order().iter().map(|s| s.to_string()).collect()
    }

    /// Size of a named dimension, if it exists.
    pub fn dim_size(&self, name: &str) -> Option<usize> {
        match name {
            n if n == TIME_DIMNAME => Some(self.time.len()),
            n if n == STATION_DIMNAME => Some(self.station_ids.len()),
            n if n == ENS_MEMBER_DIMNAME => Some(self.ens_members.len()),
            n if n == LEAD_TIME_DIMNAME => Some(self.lead_times.len()),
            _ => None,
        }
    }

    /// Sizes of the four dimensions in the default order.
    pub fn dim_sizes(&self) -> [usize; 4] {
        [
            self.lead_times.len(),
            self.station_ids.len(),
            self.ens_members.len(),
            self.time.len(),
        ]
    }

    /// Names of all variables, coordinate variables included.
    pub fn get_variable_names(&self) -> Vec<String> {
        let mut names: Vec<String> = [
            TIME_DIMNAME,
            STATION_DIMNAME,
            LEAD_TIME_DIMNAME,
            ENS_MEMBER_DIMNAME,
            STATION_ID_VARNAME,
            STATION_NAME_VARNAME,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let mut vars: Vec<String> = self.variables.keys().cloned().collect();
        vars.sort();
        names.extend(vars);
        names
    }

    pub fn get_global_attribute_names(&self) -> Vec<String> {
        self.global_attributes.keys().cloned().collect()
    }

    pub fn get_global_attributes(&self) -> &HashMap<String, String> {
        &self.global_attributes
    }

    /// Look up a variable by name.
    pub fn get_variable(&self, variable_name: &str) -> Result<&DataArray, EftsError> {
        self.variables
            .get(variable_name)
            .ok_or_else(|| EftsError::MissingVariable(variable_name.to_string()))
    }

    /// Names of the dimensions that define the geometry of a variable.
    pub fn get_variable_dim_names(&self, variable_name: &str) -> Result<Vec<String>, EftsError> {
        Ok(self
            .get_variable(variable_name)?
            .values
            .dim_names()
            .to_vec())
    }

    pub fn get_ensemble_size(&self) -> usize {
        self.ens_members.len()
    }

    pub fn get_lead_time_count(&self) -> usize {
        self.lead_times.len()
    }

    pub fn get_station_count(&self) -> usize {
        self.station_ids.len()
    }

    /// The time dimension as date-time stamps.
    pub fn get_time_dim(&self) -> &[DateTime<Utc>] {
        &self.time
    }

    /// Step of the time axis units, e.g. "hours".
    pub fn get_time_unit(&self) -> &'static str {
        self.time_units.step.unit_name()
    }

    pub fn get_time_zone(&self) -> &str {
        &self.time_zone
    }

    pub fn get_station_ids(&self) -> &[String] {
        &self.station_ids
    }

    pub fn get_station_names(&self) -> &[String] {
        &self.station_names
    }

    pub fn get_lead_time_values(&self) -> &[f64] {
        &self.lead_times
    }

    /// Replace the values of the lead time dimension.
    pub fn put_lead_time_values(&mut self, values: &[f64]) -> Result<(), EftsError> {
        if values.len() != self.lead_times.len() {
            return Err(EftsError::ShapeMismatch {
                name: LEAD_TIME_DIMNAME.to_string(),
                expected: self.lead_times.len(),
                got: values.len(),
            });
        }
        self.lead_times = values.to_vec();
        Ok(())
    }

    /// Name of the variable holding the station identifiers.
    pub fn get_stations_varname(&self) -> &'static str {
        STATION_ID_VARNAME
    }

    /// All values of a conventional numeric variable as a named array.
    ///
    /// Only the variables reserved by the convention can be retrieved
    /// this way; data variables go through the series accessors, and
    /// the time axis and station names have typed accessors.
    pub fn get_values(&self, variable_name: &str) -> Result<NamedArray, EftsError> {
        if !conventional_varnames().contains(&variable_name) {
            return Err(EftsError::InvalidArgument(format!(
                "'{}' cannot be directly retrieved. Must be in {}",
                variable_name,
                conventional_varnames().join(", ")
            )));
        }
        let vec_to_named = |values: Vec<f64>, dim: &str| -> Result<NamedArray, EftsError> {
            NamedArray::new(
                ndarray::ArrayD::from_shape_vec(ndarray::IxDyn(&[values.len()]), values)
                    .map_err(|e| EftsError::Conversion(e.to_string()))?,
                vec![dim.to_string()],
            )
        };
        match variable_name {
            n if n == STATION_DIMNAME => vec_to_named(
                self.stations.iter().map(|v| *v as f64).collect(),
                STATION_DIMNAME,
            ),
            n if n == ENS_MEMBER_DIMNAME => vec_to_named(
                self.ens_members.iter().map(|v| *v as f64).collect(),
                ENS_MEMBER_DIMNAME,
            ),
            n if n == LEAD_TIME_DIMNAME => {
                vec_to_named(self.lead_times.clone(), LEAD_TIME_DIMNAME)
            }
            n if n == TIME_DIMNAME => Err(EftsError::InvalidArgument(
                "the time axis is returned as timestamps by get_time_dim".to_string(),
            )),
            n if n == STATION_NAME_VARNAME => Err(EftsError::InvalidArgument(
                "station names are returned as text by get_station_names".to_string(),
            )),
            n if n == STATION_ID_VARNAME => {
                let parsed: Result<Vec<f64>, _> = self
                    .station_ids
                    .iter()
                    .map(|s| {
                        s.parse::<f64>().map_err(|_| {
                            EftsError::Conversion(format!(
                                "station identifier '{}' is not numeric",
                                s
                            ))
                        })
                    })
                    .collect();
                vec_to_named(parsed?, STATION_DIMNAME)
            }
            _ => {
                let var = self.get_variable(variable_name)?;
                Ok(var.values.clone())
            }
        }
    }

    fn identifier_values(&self, dimension_id: &str) -> Result<Vec<String>, EftsError> {
        match dimension_id {
            n if n == STATION_ID_VARNAME => Ok(self.station_ids.clone()),
            n if n == STATION_NAME_VARNAME => Ok(self.station_names.clone()),
            n if n == STATION_DIMNAME => {
                Ok(self.stations.iter().map(|v| v.to_string()).collect())
            }
            n if n == ENS_MEMBER_DIMNAME => {
                Ok(self.ens_members.iter().map(|v| v.to_string()).collect())
            }
            other => Err(EftsError::InvalidArgument(format!(
                "'{}' cannot be used for identifier lookups",
                other
            ))),
        }
    }

    /// Index at which an identifier is found in a dimension variable.
    ///
    /// The default dimension is the station identifier variable. The
    /// first exact match wins; no match is an error naming both the
    /// identifier and the dimension searched.
    pub fn index_for_identifier(
        &self,
        identifier: Option<&str>,
        dimension_id: Option<&str>,
    ) -> Result<usize, EftsError> {
        let identifier = identifier.ok_or_else(|| {
            EftsError::InvalidArgument("identifier cannot be missing".to_string())
        })?;
        let dimension_id = dimension_id.unwrap_or(STATION_ID_VARNAME);
        let values = self.identifier_values(dimension_id)?;
        values
            .iter()
            .position(|v| v == identifier)
            .ok_or_else(|| EftsError::NotFound {
                identifier: identifier.to_string(),
                dimension: dimension_id.to_string(),
            })
    }

    /// Index at which a date-time is found in the main time axis.
    pub fn index_for_time(&self, date_time: &DateTime<Utc>) -> Result<usize, EftsError> {
        self.time
            .iter()
            .position(|t| t == date_time)
            .ok_or_else(|| EftsError::NotFound {
                identifier: date_time.to_rfc3339(),
                dimension: TIME_DIMNAME.to_string(),
            })
    }

    /// Apply a start/count window, expressed on the variable's own
    /// axes, to its backing array.
    fn slice_window(
        &self,
        variable_name: &str,
        start: &[(String, usize)],
        count: &[(String, usize)],
    ) -> Result<NamedArray, EftsError> {
        let var = self.get_variable(variable_name)?;
        let mut window = var.values.clone();
        for ((name, from), (_, n)) in start.iter().zip(count.iter()) {
            window.slice_axis(name, *from, *n)?;
        }
        Ok(window)
    }

    fn variable_window(
        &self,
        variable_name: &str,
        start4: [usize; 4],
        count4: [usize; 4],
    ) -> Result<NamedArray, EftsError> {
        let dim_names = self.get_variable_dim_names(variable_name)?;
        let subset: Vec<&str> = dim_names.iter().map(|s| s.as_str()).collect();
        let start = splice_dims(&start4, &subset)?;
        let count = splice_dims(&count4, &subset)?;
        self.slice_window(variable_name, &start, &count)
    }

    /// Ensemble of forecasts over the lead time, for one station and
    /// one issue time.
    ///
    /// The window defaults to the full ensemble and lead time sizes,
    /// starting at the first value of the time axis. The result has the
    /// axes `[lead_time, ens_member]`, kept even when degenerate.
    pub fn get_ensemble_forecasts(
        &self,
        variable_name: &str,
        identifier: &str,
        dimension_id: Option<&str>,
        start_time: Option<DateTime<Utc>>,
        lead_time_count: Option<usize>,
    ) -> Result<NamedArray, EftsError> {
        let index_id = self.index_for_identifier(Some(identifier), dimension_id)?;
        let start_time = match start_time {
            Some(t) => t,
            None => *self.time.first().ok_or_else(|| EftsError::NotFound {
                identifier: "first value".to_string(),
                dimension: TIME_DIMNAME.to_string(),
            })?,
        };
        let indx_time = self.index_for_time(&start_time)?;
        let n_ens = self.get_ensemble_size();
        let lead_time_count = lead_time_count.unwrap_or_else(|| self.get_lead_time_count());

        let dim_names = self.get_variable_dim_names(variable_name)?;
        if dim_names != default_dim_order() {
            return Err(EftsError::InvalidDimensions(dim_names.join(",")));
        }
        // float rain_sim[lead_time,station,ens_member,time]
        let window = self.variable_window(
            variable_name,
            [0, index_id, 0, indx_time],
            [lead_time_count, 1, n_ens, 1],
        )?;
        reduce_dimensions(&window, Some(&[LEAD_TIME_DIMNAME, ENS_MEMBER_DIMNAME]))
    }

    /// A multivariate series over the whole station set, one column per
    /// station, on the axes `[time, station]`.
    pub fn get_all_series(&self, variable_name: &str) -> Result<NamedArray, EftsError> {
        let [_, n_stations, _, n_time] = self.dim_sizes();
        let window =
            self.variable_window(variable_name, [0, 0, 0, 0], [1, n_stations, 1, n_time])?;
        reduce_dimensions(&window, Some(&[TIME_DIMNAME, STATION_DIMNAME]))
    }

    /// A single point time series for one station, on the `[time]` axis.
    pub fn get_single_series(
        &self,
        variable_name: &str,
        identifier: &str,
        dimension_id: Option<&str>,
    ) -> Result<NamedArray, EftsError> {
        let index_id = self.index_for_identifier(Some(identifier), dimension_id)?;
        let n_time = self.time.len();
        let window =
            self.variable_window(variable_name, [0, index_id, 0, 0], [1, 1, 1, n_time])?;
        reduce_dimensions(&window, Some(&[TIME_DIMNAME]))
    }

    /// Create data variables in the data set.
    ///
    /// Each definition is dispatched on its dimensionality and gets a
    /// NaN filled array shaped from this data set's dimension sizes.
    /// Clashes with existing variables or coordinates are rejected
    /// before anything is inserted.
    pub fn create_data_variables(
        &mut self,
        data_var_defs: &[VariableDefinition],
    ) -> Result<(), EftsError> {
        let coordinate_names = [
            TIME_DIMNAME,
            STATION_DIMNAME,
            LEAD_TIME_DIMNAME,
            ENS_MEMBER_DIMNAME,
            STATION_ID_VARNAME,
            STATION_NAME_VARNAME,
        ];
        for def in data_var_defs {
            if self.variables.contains_key(&def.name)
                || coordinate_names.contains(&def.name.as_str())
            {
                return Err(EftsError::VariableNameClash(def.name.clone()));
            }
        }
        for def in data_var_defs {
            let dims: Vec<(String, usize)> = def
                .dims
                .dim_names()
                .iter()
                .map(|n| {
                    let size = self.dim_size(n).unwrap_or(0);
                    (n.to_string(), size)
                })
                .collect();
            self.variables.insert(
                def.name.clone(),
                DataArray::nan_filled(&dims, def.variable_attributes()),
            );
        }
        Ok(())
    }

    pub(crate) fn time_units(&self) -> &TimeUnits {
        &self.time_units
    }

    pub(crate) fn stations(&self) -> &[i64] {
        &self.stations
    }

    pub(crate) fn ens_members(&self) -> &[i64] {
        &self.ens_members
    }

    pub(crate) fn variables(&self) -> &HashMap<String, DataArray> {
        &self.variables
    }

    /// Attributes of the lead time coordinate as written to file.
    pub(crate) fn lead_time_attrs(&self) -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert(
            STANDARD_NAME_ATTR_KEY.to_string(),
            AttributeValue::from("lead time"),
        );
        attrs.insert(
            LONG_NAME_ATTR_KEY.to_string(),
            AttributeValue::from("forecast lead time"),
        );
        attrs.insert(
            UNITS_ATTR_KEY.to_string(),
            AttributeValue::from(lead_time_units(self.lead_time_step).as_str()),
        );
        attrs.insert(AXIS_ATTR_KEY.to_string(), AttributeValue::from("v"));
        attrs
    }

    // The accessors below are part of the interface but not yet
    // implemented. They fail loudly instead of silently doing nothing.

    /// Not yet implemented.
    pub fn get_ensemble_for_stations(
        &self,
        _variable_name: &str,
        _identifier: &str,
        _start_time: Option<DateTime<Utc>>,
        _lead_time_count: Option<usize>,
    ) -> Result<NamedArray, EftsError> {
        Err(EftsError::NotImplemented("get_ensemble_for_stations"))
    }

    /// Not yet implemented.
    pub fn get_ensemble_forecasts_for_station(
        &self,
        _variable_name: &str,
        _identifier: &str,
        _dimension_id: Option<&str>,
    ) -> Result<NamedArray, EftsError> {
        Err(EftsError::NotImplemented(
            "get_ensemble_forecasts_for_station",
        ))
    }

    /// Not yet implemented.
    pub fn get_ensemble_series(
        &self,
        _variable_name: &str,
        _identifier: &str,
        _dimension_id: Option<&str>,
    ) -> Result<NamedArray, EftsError> {
        Err(EftsError::NotImplemented("get_ensemble_series"))
    }

    /// Not yet implemented.
    pub fn put_ensemble_forecasts(
        &mut self,
        _x: &NamedArray,
        _variable_name: &str,
        _identifier: &str,
        _start_time: Option<DateTime<Utc>>,
    ) -> Result<(), EftsError> {
        Err(EftsError::NotImplemented("put_ensemble_forecasts"))
    }

    /// Not yet implemented.
    pub fn put_ensemble_forecasts_for_station(
        &mut self,
        _x: &NamedArray,
        _variable_name: &str,
        _identifier: &str,
        _start_time: Option<DateTime<Utc>>,
    ) -> Result<(), EftsError> {
        Err(EftsError::NotImplemented(
            "put_ensemble_forecasts_for_station",
        ))
    }

    /// Not yet implemented.
    pub fn put_ensemble_series(
        &mut self,
        _x: &NamedArray,
        _variable_name: &str,
        _identifier: &str,
    ) -> Result<(), EftsError> {
        Err(EftsError::NotImplemented("put_ensemble_series"))
    }

    /// Not yet implemented.
    pub fn put_single_series(
        &mut self,
        _x: &NamedArray,
        _variable_name: &str,
        _identifier: &str,
        _start_time: Option<DateTime<Utc>>,
    ) -> Result<(), EftsError> {
        Err(EftsError::NotImplemented("put_single_series"))
    }

    /// Not yet implemented.
    pub fn put_values(&mut self, _x: &NamedArray, _variable_name: &str) -> Result<(), EftsError> {
        Err(EftsError::NotImplemented("put_values"))
    }

    /// Not yet implemented.
    pub fn set_time_zone(&mut self, _tzone_id: &str) -> Result<(), EftsError> {
        Err(EftsError::NotImplemented("set_time_zone"))
    }

    /// Not yet implemented.
    pub fn summary(&self) -> Result<String, EftsError> {
        Err(EftsError::NotImplemented("summary"))
    }
}
