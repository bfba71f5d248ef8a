use std::io::Write;

use csv::WriterBuilder;

use super::error::Result;
use super::types::PaymentRow;

pub const EXPORT_FILE_NAME: &str = "cronograma_pagos.csv";

// Header expected by everything downstream that already imports these
// files; order and wording are fixed.
const HEADER: [&str; 9] = [
    "N°",
    "Saldo Inicial",
    "Interés",
    "Amortización",
    "Seguro Desgravamen",
    "Seguro Riesgo",
    "Gastos",
    "Cuota Total",
    "Saldo Final",
];

pub fn write_schedule_csv<W: Write>(writer: W, rows: &[PaymentRow]) -> Result<()> {
    let mut out = WriterBuilder::new().from_writer(writer);
    out.write_record(HEADER)?;

    for row in rows {
        out.write_record(&[
            row.n.to_string(),
            row.saldo_inicial.to_string(),
            row.interes.to_string(),
            row.amortizacion.to_string(),
            row.seguro_desgravamen.to_string(),
            row.seguro_riesgo.to_string(),
            row.gastos.to_string(),
            row.cuota_total.to_string(),
            row.saldo_final.to_string(),
        ])?;
    }

    out.flush()?;
    Ok(())
}

pub fn schedule_csv_string(rows: &[PaymentRow]) -> Result<String> {
    let mut buf = Vec::new();
    write_schedule_csv(&mut buf, rows)?;
    Ok(String::from_utf8(buf).expect("csv output is utf-8"))
}
