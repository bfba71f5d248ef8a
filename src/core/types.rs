use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// Field names are the persisted wire contract shared with the legacy front
// end; renaming any of them invalidates previously saved data.

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PaymentRow {
    pub n: u32,
    pub saldo_inicial: Decimal,
    pub interes: Decimal,
    pub amortizacion: Decimal,
    pub seguro_desgravamen: Decimal,
    pub seguro_riesgo: Decimal,
    pub gastos: Decimal,
    pub cuota_total: Decimal,
    pub saldo_final: Decimal,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Pen,
    Usd,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SimulationRecord {
    pub id: String,
    pub nombre: String,
    pub fecha: DateTime<Utc>,
    pub cliente: String,
    pub cliente_dni: String,
    pub inmueble: String,
    pub moneda: Currency,
    #[serde(rename = "montoFinanciado", default)]
    pub monto_financiado: Option<Decimal>,
    #[serde(rename = "cuotaMensual", default)]
    pub cuota_mensual: Option<Decimal>,
    #[serde(default)]
    pub tcea: Option<Decimal>,
    pub cronograma: Vec<PaymentRow>,
}

#[derive(Debug, Clone)]
pub struct SimulationDraft {
    pub nombre: Option<String>,
    pub cliente: String,
    pub cliente_dni: String,
    pub inmueble: String,
    pub moneda: Currency,
    pub monto_financiado: Option<Decimal>,
    pub cuota_mensual: Option<Decimal>,
    pub tcea: Option<Decimal>,
    pub cronograma: Vec<PaymentRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleTotals {
    pub total_intereses: Decimal,
    pub total_amortizacion: Decimal,
    pub total_cuotas: Decimal,
}

impl ScheduleTotals {
    pub fn zero() -> Self {
        ScheduleTotals {
            total_intereses: Decimal::ZERO,
            total_amortizacion: Decimal::ZERO,
            total_cuotas: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationSummary {
    pub id: String,
    pub nombre: String,
    pub fecha: DateTime<Utc>,
}

// Resolved once per session from whichever storage key is populated; the
// two persisted shapes are never mixed after this point.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredState {
    Archive(Vec<SimulationRecord>),
    Legacy(Vec<PaymentRow>),
    Empty,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScheduleSource {
    Archive,
    Legacy,
    Empty,
}
