//! CSV export for ledger rows and peer trades.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::types::{IntervalResult, PeerTrade};

/// Column header for ledger CSV export.
const LEDGER_HEADER: &str = "timestamp,entity_id,consumption_kwh,production_kwh,\
                             battery_charge_kwh,battery_discharge_kwh,battery_level_kwh,\
                             peer_sold_kwh,peer_bought_kwh,grid_import_kwh,grid_export_kwh";

/// Column header for peer trade CSV export.
const TRADES_HEADER: &str = "timestamp,seller,buyer,energy_kwh";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Exports ledger rows to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_ledger_csv(rows: &[IntervalResult], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_ledger_csv(rows, io::BufWriter::new(file))
}

/// Exports peer trades to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_trades_csv(trades: &[PeerTrade], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_trades_csv(trades, io::BufWriter::new(file))
}

/// Writes ledger rows as CSV to any writer.
///
/// One header row, then one row per entity-interval in ledger order. Energy
/// values carry four decimals, so identical ledgers produce identical bytes.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_ledger_csv(rows: &[IntervalResult], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(LEDGER_HEADER.split(',').map(str::trim))?;

    for r in rows {
        wtr.write_record(&[
            r.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            r.entity_id.clone(),
            format!("{:.4}", r.consumption_kwh),
            format!("{:.4}", r.production_kwh),
            format!("{:.4}", r.battery_charge_kwh),
            format!("{:.4}", r.battery_discharge_kwh),
            format!("{:.4}", r.battery_level_kwh),
            format!("{:.4}", r.peer_sold_kwh),
            format!("{:.4}", r.peer_bought_kwh),
            format!("{:.4}", r.grid_import_kwh),
            format!("{:.4}", r.grid_export_kwh),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes peer trades as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_trades_csv(trades: &[PeerTrade], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(TRADES_HEADER.split(','))?;

    for t in trades {
        wtr.write_record(&[
            t.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            t.seller.clone(),
            t.buyer.clone(),
            format!("{:.4}", t.energy_kwh),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 2)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .unwrap()
    }

    fn make_row(hour: u32) -> IntervalResult {
        IntervalResult {
            timestamp: at(hour),
            entity_id: "user_1".into(),
            consumption_kwh: 2.0,
            production_kwh: 5.0,
            battery_charge_kwh: 2.5,
            battery_discharge_kwh: 0.0,
            battery_level_kwh: 7.5,
            peer_sold_kwh: 0.5,
            peer_bought_kwh: 0.0,
            grid_import_kwh: 0.0,
            grid_export_kwh: 0.0,
        }
    }

    fn ledger_csv(rows: &[IntervalResult]) -> String {
        let mut buf = Vec::new();
        write_ledger_csv(rows, &mut buf).ok();
        String::from_utf8(buf).unwrap_or_default()
    }

    #[test]
    fn ledger_header_and_first_row() {
        let output = ledger_csv(&[make_row(12)]);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines[0],
            "timestamp,entity_id,consumption_kwh,production_kwh,\
             battery_charge_kwh,battery_discharge_kwh,battery_level_kwh,\
             peer_sold_kwh,peer_bought_kwh,grid_import_kwh,grid_export_kwh"
        );
        assert_eq!(
            lines[1],
            "2025-06-02T12:00:00,user_1,2.0000,5.0000,2.5000,0.0000,7.5000,0.5000,0.0000,0.0000,0.0000"
        );
    }

    #[test]
    fn row_count_matches_ledger() {
        let rows: Vec<IntervalResult> = (0..24).map(make_row).collect();
        // 1 header + 24 data rows
        assert_eq!(ledger_csv(&rows).lines().count(), 25);
    }

    #[test]
    fn deterministic_output() {
        let rows: Vec<IntervalResult> = (0..5).map(make_row).collect();
        assert_eq!(ledger_csv(&rows), ledger_csv(&rows));
    }

    #[test]
    fn numeric_columns_parse() {
        let rows: Vec<IntervalResult> = (0..3).map(make_row).collect();
        let mut buf = Vec::new();
        write_ledger_csv(&rows, &mut buf).ok();

        let mut rdr = csv::ReaderBuilder::new().from_reader(buf.as_slice());
        assert_eq!(rdr.headers().map(csv::StringRecord::len).ok(), Some(11));
        let mut count = 0;
        for record in rdr.records() {
            let rec = record.ok();
            assert!(rec.is_some(), "every row should parse");
            for i in 2..11 {
                let val = rec.as_ref().and_then(|r| r[i].parse::<f64>().ok());
                assert!(val.is_some(), "column {i} should parse as f64");
            }
            count += 1;
        }
        assert_eq!(count, 3);
    }

    #[test]
    fn trades_csv_layout() {
        let trades = [PeerTrade {
            timestamp: at(13),
            seller: "user_1".into(),
            buyer: "user_2".into(),
            energy_kwh: 1.234_56,
        }];
        let mut buf = Vec::new();
        write_trades_csv(&trades, &mut buf).ok();
        let output = String::from_utf8(buf).unwrap_or_default();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines, vec![
            "timestamp,seller,buyer,energy_kwh",
            "2025-06-02T13:00:00,user_1,user_2,1.2346",
        ]);
    }

    #[test]
    fn export_to_path() {
        let path = std::env::temp_dir().join(format!("p2p-ledger-{}.csv", std::process::id()));
        assert!(export_ledger_csv(&[make_row(0)], &path).is_ok());
        let written = std::fs::read_to_string(&path).unwrap_or_default();
        std::fs::remove_file(&path).ok();
        assert_eq!(written.lines().count(), 2);
    }
}
