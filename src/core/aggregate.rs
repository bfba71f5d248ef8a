use super::types::{PaymentRow, ScheduleTotals};

pub fn aggregate_schedule(rows: &[PaymentRow]) -> ScheduleTotals {
    let mut totals = ScheduleTotals::zero();
    for row in rows {
        totals.total_intereses += row.interes;
        totals.total_amortizacion += row.amortizacion;
        totals.total_cuotas += row.cuota_total;
    }
    totals
}
