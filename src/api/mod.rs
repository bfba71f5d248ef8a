use axum::{
    Router,
    extract::{Json, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tracing::info;

use crate::core::{
    Currency, EXPORT_FILE_NAME, FileStore, KeyStore, PaymentRow, ScheduleSource, ScheduleTotals,
    SimulationDraft, SimulationRecord, SimulationSession, SimulationSummary, schedule_csv_string,
};

type SharedSession = Arc<Mutex<SimulationSession<FileStore>>>;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
enum ApiCurrency {
    #[serde(rename = "PEN", alias = "pen")]
    Pen,
    #[serde(rename = "USD", alias = "usd")]
    Usd,
}

impl From<ApiCurrency> for Currency {
    fn from(value: ApiCurrency) -> Self {
        match value {
            ApiCurrency::Pen => Currency::Pen,
            ApiCurrency::Usd => Currency::Usd,
        }
    }
}

impl From<Currency> for ApiCurrency {
    fn from(value: Currency) -> Self {
        match value {
            Currency::Pen => ApiCurrency::Pen,
            Currency::Usd => ApiCurrency::Usd,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
enum ApiScheduleSource {
    Archivo,
    Legado,
    Vacio,
}

impl From<ScheduleSource> for ApiScheduleSource {
    fn from(value: ScheduleSource) -> Self {
        match value {
            ScheduleSource::Archive => ApiScheduleSource::Archivo,
            ScheduleSource::Legacy => ApiScheduleSource::Legado,
            ScheduleSource::Empty => ApiScheduleSource::Vacio,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SavePayload {
    nombre: Option<String>,
    cliente: Option<String>,
    #[serde(alias = "cliente_dni")]
    cliente_dni: Option<String>,
    inmueble: Option<String>,
    moneda: Option<ApiCurrency>,
    #[serde(alias = "monto_financiado")]
    monto_financiado: Option<Decimal>,
    #[serde(alias = "cuota_mensual")]
    cuota_mensual: Option<Decimal>,
    tcea: Option<Decimal>,
    cronograma: Option<Vec<PaymentRow>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SelectPayload {
    id: Option<String>,
}

#[derive(Debug, Serialize)]
struct SimulationListResponse {
    simulaciones: Vec<SimulationSummary>,
    activa: Option<String>,
}

#[derive(Debug, Serialize)]
struct SaveResponse {
    id: String,
    simulaciones: Vec<SimulationSummary>,
}

#[derive(Debug, Serialize)]
struct ActiveSimulationDto {
    id: String,
    nombre: String,
    fecha: DateTime<Utc>,
    cliente: String,
    cliente_dni: String,
    inmueble: String,
    moneda: ApiCurrency,
    #[serde(rename = "montoFinanciado")]
    monto_financiado: Option<Decimal>,
    #[serde(rename = "cuotaMensual")]
    cuota_mensual: Option<Decimal>,
    tcea: Option<Decimal>,
}

impl From<&SimulationRecord> for ActiveSimulationDto {
    fn from(record: &SimulationRecord) -> Self {
        ActiveSimulationDto {
            id: record.id.clone(),
            nombre: record.nombre.clone(),
            fecha: record.fecha,
            cliente: record.cliente.clone(),
            cliente_dni: record.cliente_dni.clone(),
            inmueble: record.inmueble.clone(),
            moneda: record.moneda.into(),
            monto_financiado: record.monto_financiado,
            cuota_mensual: record.cuota_mensual,
            tcea: record.tcea,
        }
    }
}

#[derive(Debug, Serialize)]
struct ScheduleResponse {
    simulacion: Option<ActiveSimulationDto>,
    cronograma: Vec<PaymentRow>,
    totales: ScheduleTotals,
    fuente: ApiScheduleSource,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn draft_from_payload(payload: SavePayload) -> Result<SimulationDraft, String> {
    let cliente = required_text(payload.cliente, "cliente")?;
    let cliente_dni = required_text(payload.cliente_dni, "clienteDni")?;
    let inmueble = required_text(payload.inmueble, "inmueble")?;

    let Some(moneda) = payload.moneda else {
        return Err("moneda is required (PEN or USD)".to_string());
    };

    let cronograma = payload.cronograma.unwrap_or_default();
    if cronograma.is_empty() {
        return Err("cronograma must contain at least one row".to_string());
    }

    Ok(SimulationDraft {
        nombre: payload.nombre,
        cliente,
        cliente_dni,
        inmueble,
        moneda: moneda.into(),
        monto_financiado: payload.monto_financiado,
        cuota_mensual: payload.cuota_mensual,
        tcea: payload.tcea,
        cronograma,
    })
}

fn required_text(value: Option<String>, field: &str) -> Result<String, String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(format!("{field} must not be blank")),
    }
}

pub async fn run_http_server(port: u16, data_dir: PathBuf) -> std::io::Result<()> {
    let mut session = SimulationSession::new(FileStore::new(data_dir));
    session.initialize();
    let shared: SharedSession = Arc::new(Mutex::new(session));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/api/simulaciones", get(list_handler).post(save_handler))
        .route("/api/simulaciones/seleccion", post(select_handler))
        .route("/api/cronograma", get(schedule_handler))
        .route("/api/cronograma/export", get(export_handler))
        .fallback(not_found_handler)
        .with_state(shared);

    let listener = TcpListener::bind(addr).await?;
    info!("simulation archive API listening on http://{addr}");
    info!("local access: http://127.0.0.1:{port}/api/cronograma");

    axum::serve(listener, app).await
}

async fn list_handler(State(session): State<SharedSession>) -> Response {
    let session = session.lock().expect("session mutex poisoned");
    let response = SimulationListResponse {
        simulaciones: session.summaries(),
        activa: session.active_record().map(|r| r.id.clone()),
    };
    json_response(StatusCode::OK, response)
}

async fn save_handler(
    State(session): State<SharedSession>,
    Json(payload): Json<SavePayload>,
) -> Response {
    let draft = match draft_from_payload(payload) {
        Ok(draft) => draft,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let mut session = session.lock().expect("session mutex poisoned");
    match session.archive_simulation(draft) {
        Ok(record) => {
            let id = record.id.clone();
            let response = SaveResponse {
                id,
                simulaciones: session.summaries(),
            };
            json_response(StatusCode::CREATED, response)
        }
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("failed to persist the simulation: {e}"),
        ),
    }
}

async fn select_handler(
    State(session): State<SharedSession>,
    Json(payload): Json<SelectPayload>,
) -> Response {
    let mut session = session.lock().expect("session mutex poisoned");
    session.select_simulation(payload.id.as_deref());
    json_response(StatusCode::OK, schedule_view(&session))
}

async fn schedule_handler(State(session): State<SharedSession>) -> Response {
    let session = session.lock().expect("session mutex poisoned");
    json_response(StatusCode::OK, schedule_view(&session))
}

async fn export_handler(State(session): State<SharedSession>) -> Response {
    let session = session.lock().expect("session mutex poisoned");
    export_response(session.schedule())
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

fn schedule_view<S: KeyStore>(session: &SimulationSession<S>) -> ScheduleResponse {
    ScheduleResponse {
        simulacion: session.active_record().map(ActiveSimulationDto::from),
        cronograma: session.schedule().to_vec(),
        totales: session.totals().clone(),
        fuente: session.source().into(),
    }
}

fn export_response(rows: &[PaymentRow]) -> Response {
    match schedule_csv_string(rows) {
        Ok(csv) => with_cache_control((
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{EXPORT_FILE_NAME}\""),
                ),
            ],
            csv,
        )),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("CSV export failed: {e}"),
        ),
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn draft_from_json(json: &str) -> Result<SimulationDraft, String> {
    let payload = serde_json::from_str::<SavePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    draft_from_payload(payload)
}
