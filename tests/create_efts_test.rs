use std::collections::HashMap;

use chrono::{TimeZone, Utc};

use efts_rust::attributes::create_global_attributes;
use efts_rust::conventions::{
    has_required_dimensions, has_required_global_attributes, has_required_stf2_dimensions,
    has_required_variables, ENS_MEMBER_DIMNAME, LEAD_TIME_DIMNAME, STATION_DIMNAME,
    STATION_ID_VARNAME, STF_CONVENTION_VERSION_ATTR_KEY, TIME_DIMNAME,
};
use efts_rust::error::EftsError;
use efts_rust::time_utils::{create_time_info, TimeDimInfo, TimeStep};
use efts_rust::variables::{
    create_variable_definitions, default_optional_variable_definitions, VariableRecord,
};
use efts_rust::{create_efts, open_efts, CreateEftsOptions};

fn sample_time_info() -> TimeDimInfo {
    let start = Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).unwrap();
    create_time_info(start, 31, TimeStep::Days)
}

fn sample_global_attributes() -> HashMap<String, String> {
    create_global_attributes(
        "data set title",
        "my org",
        "A journal reference, URL",
        "Upper_Murray",
        "integration test data",
        false,
    )
    .unwrap()
}

fn sample_records() -> Vec<VariableRecord> {
    let mut fcast = VariableRecord::new("rain_fcast_ens");
    fcast.dimensions = "4".to_string();
    fcast.long_name = "Rainfall ensemble forecast".to_string();
    let mut ens = VariableRecord::new("rain_ens");
    ens.dimensions = "3".to_string();
    let mut obs = VariableRecord::new("rain_obs");
    obs.dimensions = "2".to_string();
    vec![fcast, ens, obs]
}

fn sample_options() -> CreateEftsOptions {
    CreateEftsOptions {
        station_names: Some(vec!["upper".to_string(), "lower".to_string()]),
        optional_vars: Some(default_optional_variable_definitions()),
        lead_length: 3,
        ensemble_length: 10,
        lead_time_step: TimeStep::Hours,
    }
}

#[test]
fn create_efts_builds_a_conforming_data_set() {
    let dir = tempfile::tempdir().unwrap();
    let fname = dir.path().join("ensemble_rain.nc");

    let defs = create_variable_definitions(&sample_records()).unwrap();
    let ds = create_efts(
        &fname,
        &sample_time_info(),
        &defs,
        &[123, 456],
        &sample_global_attributes(),
        sample_options(),
    )
    .unwrap();

    assert_eq!(ds.dim_size(TIME_DIMNAME), Some(31));
    assert_eq!(ds.dim_size(STATION_DIMNAME), Some(2));
    assert_eq!(ds.dim_size(LEAD_TIME_DIMNAME), Some(3));
    assert_eq!(ds.dim_size(ENS_MEMBER_DIMNAME), Some(10));

    assert!(has_required_dimensions(&ds));
    assert!(has_required_global_attributes(&ds));
    assert!(has_required_variables(&ds));

    // The file on disk carries the full five dimension layout.
    let file = netcdf::open(&fname).unwrap();
    assert!(has_required_stf2_dimensions(&file));
}

#[test]
fn reopened_data_set_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let fname = dir.path().join("round_trip.nc");

    let defs = create_variable_definitions(&sample_records()).unwrap();
    create_efts(
        &fname,
        &sample_time_info(),
        &defs,
        &[123, 456],
        &sample_global_attributes(),
        sample_options(),
    )
    .unwrap();

    let ds = open_efts(&fname).unwrap();
    assert_eq!(ds.get_station_ids(), &["123", "456"]);
    assert_eq!(ds.get_station_names(), &["upper", "lower"]);
    assert_eq!(ds.get_ensemble_size(), 10);
    assert_eq!(ds.get_lead_time_count(), 3);
    assert_eq!(ds.get_lead_time_values(), &[1.0, 2.0, 3.0]);
    assert_eq!(
        ds.get_time_dim()[0],
        Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).unwrap()
    );
    assert_eq!(ds.get_time_dim().len(), 31);
    assert_eq!(ds.get_time_zone(), "UTC");

    let attrs = ds.get_global_attributes();
    assert_eq!(attrs["catchment"], "Upper_Murray");
    assert_eq!(attrs[STF_CONVENTION_VERSION_ATTR_KEY], "2.0");
    assert!(attrs["history"].contains("file created"));

    // Optional geolocation variables survive the round trip.
    for name in ["x", "y", "area", "elevation"] {
        let var = ds.get_variable(name).unwrap();
        assert_eq!(var.values.dim_names(), &[STATION_DIMNAME]);
        assert_eq!(var.values.shape(), &[2]);
    }

    let fcast = ds.get_variable("rain_fcast_ens").unwrap();
    assert_eq!(
        fcast.values.dim_names(),
        &[
            LEAD_TIME_DIMNAME,
            STATION_DIMNAME,
            ENS_MEMBER_DIMNAME,
            TIME_DIMNAME
        ]
    );
    assert_eq!(fcast.values.shape(), &[3, 2, 10, 31]);
    // No values were written, so the cube is all fill values.
    assert!(fcast.values.values().iter().all(|v| *v == -9999.0));
}

#[test]
fn ensemble_forecast_window_works_on_a_reopened_file() {
    let dir = tempfile::tempdir().unwrap();
    let fname = dir.path().join("window.nc");

    let defs = create_variable_definitions(&sample_records()).unwrap();
    create_efts(
        &fname,
        &sample_time_info(),
        &defs,
        &[123, 456],
        &sample_global_attributes(),
        sample_options(),
    )
    .unwrap();

    let ds = open_efts(&fname).unwrap();
    let start = ds.get_time_dim()[1];
    let fc = ds
        .get_ensemble_forecasts("rain_fcast_ens", "456", None, Some(start), None)
        .unwrap();
    assert_eq!(fc.dim_names(), &[LEAD_TIME_DIMNAME, ENS_MEMBER_DIMNAME]);
    assert_eq!(fc.shape(), &[3, 10]);
}

#[test]
fn unknown_station_identifier_names_identifier_and_dimension() {
    let dir = tempfile::tempdir().unwrap();
    let fname = dir.path().join("lookup.nc");

    let defs = create_variable_definitions(&sample_records()).unwrap();
    let ds = create_efts(
        &fname,
        &sample_time_info(),
        &defs,
        &[123, 456],
        &sample_global_attributes(),
        sample_options(),
    )
    .unwrap();

    let err = ds.index_for_identifier(Some("999"), None).unwrap_err();
    match err {
        EftsError::NotFound {
            identifier,
            dimension,
        } => {
            assert_eq!(identifier, "999");
            assert_eq!(dimension, STATION_ID_VARNAME);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
