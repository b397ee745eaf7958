use std::{
    io,
    path::{Path, PathBuf},
};

use rust_xlsxwriter::{Workbook, XlsxError};

use super::{ReportEmitter, UsageReport};

const HEADER: [&str; 5] = ["house", "electricity kWh", "heat kWh", "water m3", "hot water m3"];

/// Spreadsheet emitter for `path`: CSV when it ends in `.csv`, an xlsx workbook otherwise.
pub fn for_path(path: impl Into<PathBuf>) -> Box<dyn ReportEmitter> {
    let path = path.into();
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    if is_csv {
        Box::new(CsvSpreadsheet::new(path))
    } else {
        Box::new(XlsxSpreadsheet::new(path))
    }
}

/// Builds a one-sheet workbook: header row, then one row per house with float cells.
pub fn workbook(report: &UsageReport) -> Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Sheet1")?;

    for (col, title) in (0u16..).zip(HEADER) {
        sheet.write_string(0, col, title)?;
    }

    for (row, (house, t)) in (1u32..).zip(report) {
        sheet.write_string(row, 0, house.as_str())?;
        sheet.write_number(row, 1, t.electricity_kwh)?;
        sheet.write_number(row, 2, t.heat_kwh)?;
        sheet.write_number(row, 3, t.cold_water_m3)?;
        sheet.write_number(row, 4, t.hot_water_m3)?;
    }

    Ok(workbook)
}

/// Excel export of the report.
#[derive(Debug, Clone)]
pub struct XlsxSpreadsheet {
    path: PathBuf,
}

impl XlsxSpreadsheet {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportEmitter for XlsxSpreadsheet {
    fn emit(&self, report: &UsageReport) -> anyhow::Result<()> {
        workbook(report)?.save(&self.path)?;
        tracing::info!(path = %self.path.display(), houses = report.len(), "usage workbook written");
        Ok(())
    }
}

/// Writes one header row and one row per house.
pub fn write_rows<W: io::Write>(wtr: &mut csv::Writer<W>, report: &UsageReport) -> Result<(), csv::Error> {
    wtr.write_record(HEADER)?;

    for (house, t) in report {
        wtr.write_record([
            house.clone(),
            t.electricity_kwh.to_string(),
            t.heat_kwh.to_string(),
            t.cold_water_m3.to_string(),
            t.hot_water_m3.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Plain CSV export of the report, same layout as the workbook.
#[derive(Debug, Clone)]
pub struct CsvSpreadsheet {
    path: PathBuf,
}

impl CsvSpreadsheet {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl ReportEmitter for CsvSpreadsheet {
    fn emit(&self, report: &UsageReport) -> anyhow::Result<()> {
        let mut wtr = csv::Writer::from_path(&self.path)?;
        write_rows(&mut wtr, report)?;
        tracing::info!(path = %self.path.display(), houses = report.len(), "usage spreadsheet written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::HouseTotals;

    fn sample() -> UsageReport {
        let mut report = UsageReport::new();
        report.insert(
            "101".to_string(),
            HouseTotals {
                electricity_kwh: 12.5,
                heat_kwh: 5.0,
                cold_water_m3: 1.25,
                hot_water_m3: 0.5,
            },
        );
        report.insert("102".to_string(), HouseTotals::default());
        report
    }

    #[test]
    fn workbook_serializes_to_a_zip_container() {
        let mut workbook = workbook(&sample()).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn xlsx_emitter_writes_the_file() {
        let path = std::env::temp_dir().join(format!("usage-report-{}.xlsx", std::process::id()));
        let emitter = XlsxSpreadsheet::new(&path);

        emitter.emit(&sample()).unwrap();

        let bytes = std::fs::read(emitter.path()).unwrap();
        assert!(bytes.starts_with(b"PK"));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn emitter_follows_the_extension() {
        let path = std::env::temp_dir().join(format!("usage-report-{}.CSV", std::process::id()));

        for_path(&path).emit(&sample()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("house,electricity kWh"));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn writes_header_and_one_row_per_house() {
        let report = sample();

        let mut wtr = csv::Writer::from_writer(Vec::new());
        write_rows(&mut wtr, &report).unwrap();
        let out = String::from_utf8(wtr.into_inner().unwrap()).unwrap();

        assert_eq!(
            out,
            "house,electricity kWh,heat kWh,water m3,hot water m3\n101,12.5,5,1.25,0.5\n102,0,0,0,0\n"
        );
    }
}
