use std::io::{self, Write};

use tabled::{Table, Tabled};

use super::{ReportEmitter, UsageReport};

#[derive(Tabled)]
struct Row {
    house: String,
    power: String,
    heat: String,
    coldwater: String,
    hotwater: String,
}

/// Renders the report as a `house|power|heat|coldwater|hotwater` table, two decimals per value.
pub fn render(report: &UsageReport) -> String {
    let rows = report.iter().map(|(house, t)| Row {
        house: house.clone(),
        power: format!("{:.2}", t.electricity_kwh),
        heat: format!("{:.2}", t.heat_kwh),
        coldwater: format!("{:.2}", t.cold_water_m3),
        hotwater: format!("{:.2}", t.hot_water_m3),
    });

    Table::new(rows).to_string()
}

/// Prints the report table to standard output.
#[derive(Debug, Default)]
pub struct ConsoleTable;

impl ReportEmitter for ConsoleTable {
    fn emit(&self, report: &UsageReport) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", render(report))?;
        Ok(())
    }
}
