use std::path::Path;

use envlog_converter::container::builder::{
    Provenance, INTEGRATION_TIME_VAR, MAX_FIXED_INTENSITY_VAR, SPECTRUM_VAR,
};
use envlog_converter::container::storage::read_container;
use envlog_converter::container::{TIME_DIM, WAVELENGTH_DIM};
use envlog_converter::data::sample::{render_raw_log, RawReading};
use envlog_converter::data::units::ConversionConfig;
use envlog_converter::driver::{convert_file, plan_jobs, run_jobs, ConversionJob};

fn three_readings() -> Vec<RawReading> {
    let wl = vec![500.0, 600.0, 700.0];
    vec![
        RawReading::example("2016.04.07-12:00:07", wl.clone(), vec![0.1, 0.2, 0.3]),
        RawReading::example("2016.04.07-12:00:12", wl.clone(), vec![0.15, 0.25, 0.35]),
        RawReading::example("2016.04.07-12:00:17", wl, vec![0.2, 0.3, 0.4]),
    ]
}

fn provenance() -> Provenance {
    Provenance {
        timestamp: "Thu Apr 07 12:30:00 2016".into(),
        command_line: "envlog-converter raw out".into(),
    }
}

fn write_raw(path: &Path, readings: &[RawReading]) {
    std::fs::write(path, render_raw_log(readings)).unwrap();
}

#[test]
fn three_reading_log_round_trips_through_parquet() {
    let dir = tempfile::tempdir().unwrap();
    let job = ConversionJob {
        input: dir.path().join("envlog.json"),
        output: dir.path().join("envlog.parquet"),
    };
    write_raw(&job.input, &three_readings());

    convert_file(&job, &ConversionConfig::default(), &provenance()).unwrap();
    let c = read_container(&job.output).unwrap();

    assert_eq!(c.time_len(), 3);
    assert_eq!(c.dimension(WAVELENGTH_DIM).unwrap().len, 3);
    assert_eq!(
        c.variable(WAVELENGTH_DIM).unwrap().data.as_float().unwrap(),
        &[500.0, 600.0, 700.0]
    );
    assert_eq!(
        c.variable(SPECTRUM_VAR).unwrap().data.as_float().unwrap(),
        &[0.1, 0.2, 0.3, 0.15, 0.25, 0.35, 0.2, 0.3, 0.4]
    );
    assert_eq!(
        c.attribute("history"),
        Some("Thu Apr 07 12:30:00 2016: envlog-converter raw out")
    );
}

#[test]
fn every_time_indexed_variable_has_one_value_per_reading() {
    let dir = tempfile::tempdir().unwrap();
    let job = ConversionJob {
        input: dir.path().join("envlog.json"),
        output: dir.path().join("envlog.parquet"),
    };
    write_raw(&job.input, &three_readings());
    convert_file(&job, &ConversionConfig::default(), &provenance()).unwrap();
    let c = read_container(&job.output).unwrap();

    for var in c.variables().iter().filter(|v| v.dims == [TIME_DIM]) {
        assert_eq!(var.data.len(), 3, "variable {}", var.name);
    }

    let temperature = c.variable("temperature").unwrap();
    assert_eq!(
        temperature.attributes.get("units").map(String::as_str),
        Some("Celsius")
    );
    assert_eq!(
        c.variable("temperature_rawValue").unwrap().data.as_float().unwrap(),
        &[2150.0; 3]
    );
    assert!(c.variable("air_pressure_rawValue").is_none());
    assert_eq!(
        c.variable("Sensor_Photosynthetical_Active_Radiation")
            .unwrap()
            .attributes
            .get("units")
            .map(String::as_str),
        Some("micromole meters-2 second-1")
    );
    assert_eq!(
        c.variable(MAX_FIXED_INTENSITY_VAR).unwrap().data.len(),
        3
    );
    assert_eq!(c.variable(INTEGRATION_TIME_VAR).unwrap().data.len(), 3);

    let station = c.variable("weather_station").unwrap();
    assert!(station.dims.is_empty());
    assert_eq!(station.data.as_text().unwrap(), &["Thies Clima".to_string()]);
}

#[test]
fn batch_run_keeps_going_after_a_bad_log() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("raw");
    std::fs::create_dir_all(raw.join("day2")).unwrap();
    write_raw(&raw.join("good_a.json"), &three_readings());
    write_raw(&raw.join("day2").join("good_b.json"), &three_readings()[..2]);
    std::fs::write(
        raw.join("bad.json"),
        render_raw_log(&three_readings()).replace("\"wavelength\": 600.0", "\"wavelength\": 6o0.0"),
    )
    .unwrap();

    let out = dir.path().join("out");
    let jobs = plan_jobs(&raw, &out).unwrap();
    assert_eq!(jobs.len(), 3);

    let report = run_jobs(&jobs, &ConversionConfig::default(), "envlog-converter raw out");
    assert_eq!(report.converted, 2);
    assert_eq!(report.failed, vec![raw.join("bad.json")]);

    let b = read_container(&out.join("good_b.parquet")).unwrap();
    assert_eq!(b.time_len(), 2);
    assert!(b
        .attribute("history")
        .unwrap()
        .ends_with(": envlog-converter raw out"));
}

#[test]
fn unknown_unit_fails_the_conversion() {
    let dir = tempfile::tempdir().unwrap();
    let mut readings = three_readings();
    for r in &mut readings {
        r.scalars[2].unit = Some("mmHg".into());
    }
    let job = ConversionJob {
        input: dir.path().join("envlog.json"),
        output: dir.path().join("envlog.parquet"),
    };
    write_raw(&job.input, &readings);

    let err = convert_file(&job, &ConversionConfig::default(), &provenance()).unwrap_err();
    assert!(format!("{err:#}").contains("mmHg"));
}
