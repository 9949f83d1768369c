use std::io::Write;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::predict::types::StationPasses;

pub const CSV_HEADER: [&str; 5] = [
    "Ground Station",
    "Start Time",
    "End Time",
    "Duration (s)",
    "Max Elevation (°)",
];

fn timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// One row per contact window, grouped in station order.
pub fn write_passes_csv<W: Write>(writer: W, passes: &[StationPasses]) -> Result<(), csv::Error> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(CSV_HEADER)?;
    for station in passes {
        for pass in &station.passes {
            csv.write_record([
                station.ground_station_name.clone(),
                timestamp(&pass.start_time),
                timestamp(&pass.end_time),
                pass.duration_seconds.to_string(),
                pass.max_elevation_deg.to_string(),
            ])?;
        }
    }
    csv.flush()?;
    Ok(())
}

pub fn passes_to_csv_string(passes: &[StationPasses]) -> Result<String, csv::Error> {
    let mut buffer = Vec::new();
    write_passes_csv(&mut buffer, passes)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::types::ContactWindow;
    use chrono::{Duration, TimeZone};

    #[test]
    fn csv_round_trips_two_windows() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let first = ContactWindow::new(t0, t0 + Duration::seconds(420), 57.31);
        let second = ContactWindow::new(
            t0 + Duration::hours(2),
            t0 + Duration::hours(2) + Duration::milliseconds(95_500),
            12.5,
        );
        let passes = vec![
            StationPasses {
                ground_station_id: "svalbard".into(),
                ground_station_name: "Svalbard, Norway".into(),
                passes: vec![first.clone()],
            },
            StationPasses {
                ground_station_id: "kiruna".into(),
                ground_station_name: "Kiruna".into(),
                passes: vec![second.clone()],
            },
        ];

        let text = passes_to_csv_string(&passes).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert_eq!(
            text.lines().next().unwrap(),
            "Ground Station,Start Time,End Time,Duration (s),Max Elevation (°)"
        );

        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);

        for (row, (name, window)) in rows
            .iter()
            .zip([("Svalbard, Norway", &first), ("Kiruna", &second)])
        {
            assert_eq!(&row[0], name);
            let start = DateTime::parse_from_rfc3339(&row[1]).unwrap().with_timezone(&Utc);
            let end = DateTime::parse_from_rfc3339(&row[2]).unwrap().with_timezone(&Utc);
            assert_eq!(start, window.start_time);
            assert_eq!(end, window.end_time);
            assert_eq!(row[3].parse::<i64>().unwrap(), window.duration_seconds);
            assert_eq!(row[4].parse::<f64>().unwrap(), window.max_elevation_deg);
        }
    }

    #[test]
    fn empty_export_has_only_header() {
        let text = passes_to_csv_string(&[]).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
