use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use super::aggregate::aggregate_schedule;
use super::archive::SimulationArchive;
use super::error::Result;
use super::store::KeyStore;
use super::types::{
    PaymentRow, ScheduleSource, ScheduleTotals, SimulationDraft, SimulationRecord,
    SimulationSummary, StoredState,
};

// The record index is kept in bounds by every method that replaces
// `records`.
enum ActiveView {
    Record(usize),
    LegacySchedule(Vec<PaymentRow>),
    Nothing,
}

pub struct SimulationSession<S> {
    archive: SimulationArchive<S>,
    records: Vec<SimulationRecord>,
    view: ActiveView,
    totals: ScheduleTotals,
}

impl<S: KeyStore> SimulationSession<S> {
    pub fn new(store: S) -> Self {
        SimulationSession {
            archive: SimulationArchive::new(store),
            records: Vec::new(),
            view: ActiveView::Nothing,
            totals: ScheduleTotals::zero(),
        }
    }

    // An archived collection activates its most recently saved record;
    // failing that, a schedule saved by the pre-archive format is shown.
    pub fn initialize(&mut self) {
        match self.archive.load_state() {
            StoredState::Archive(records) => {
                self.view = ActiveView::Record(records.len() - 1);
                self.records = records;
            }
            StoredState::Legacy(rows) => {
                self.records = Vec::new();
                self.view = ActiveView::LegacySchedule(rows);
            }
            StoredState::Empty => {
                self.records = Vec::new();
                self.view = ActiveView::Nothing;
            }
        }
        self.recompute_totals();
    }

    // An unknown id clears the view instead of failing; `None` is an
    // explicit empty selection. The loaded record list stays put.
    pub fn select_simulation(&mut self, id: Option<&str>) {
        self.view = match id {
            Some(id) => match self.records.iter().position(|r| r.id == id) {
                Some(index) => ActiveView::Record(index),
                None => {
                    warn!("simulation '{id}' is not in the loaded archive; clearing the selection");
                    ActiveView::Nothing
                }
            },
            None => ActiveView::Nothing,
        };
        self.recompute_totals();
    }

    // Materializes the draft (fresh id, current timestamp, default name
    // when none was given), persists it and activates it.
    pub fn archive_simulation(&mut self, draft: SimulationDraft) -> Result<&SimulationRecord> {
        let record = materialize_draft(draft, Utc::now());
        self.records = self.archive.append(record)?;
        let last = self.records.len() - 1;
        self.view = ActiveView::Record(last);
        self.recompute_totals();
        Ok(&self.records[last])
    }

    pub fn schedule(&self) -> &[PaymentRow] {
        match &self.view {
            ActiveView::Record(index) => &self.records[*index].cronograma,
            ActiveView::LegacySchedule(rows) => rows,
            ActiveView::Nothing => &[],
        }
    }

    pub fn totals(&self) -> &ScheduleTotals {
        &self.totals
    }

    pub fn active_record(&self) -> Option<&SimulationRecord> {
        match &self.view {
            ActiveView::Record(index) => Some(&self.records[*index]),
            _ => None,
        }
    }

    pub fn source(&self) -> ScheduleSource {
        match &self.view {
            ActiveView::Record(_) => ScheduleSource::Archive,
            ActiveView::LegacySchedule(_) => ScheduleSource::Legacy,
            ActiveView::Nothing => ScheduleSource::Empty,
        }
    }

    pub fn summaries(&self) -> Vec<SimulationSummary> {
        self.records
            .iter()
            .map(|r| SimulationSummary {
                id: r.id.clone(),
                nombre: r.nombre.clone(),
                fecha: r.fecha,
            })
            .collect()
    }

    fn recompute_totals(&mut self) {
        self.totals = aggregate_schedule(self.schedule());
    }
}

fn materialize_draft(draft: SimulationDraft, fecha: DateTime<Utc>) -> SimulationRecord {
    let nombre = match draft.nombre.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => default_simulation_name(fecha, &draft.cliente, &draft.inmueble),
    };

    SimulationRecord {
        id: Uuid::new_v4().to_string(),
        nombre,
        fecha,
        cliente: draft.cliente,
        cliente_dni: draft.cliente_dni,
        inmueble: draft.inmueble,
        moneda: draft.moneda,
        monto_financiado: draft.monto_financiado,
        cuota_mensual: draft.cuota_mensual,
        tcea: draft.tcea,
        cronograma: draft.cronograma,
    }
}

fn default_simulation_name(fecha: DateTime<Utc>, cliente: &str, inmueble: &str) -> String {
    format!(
        "Simulación {} - {cliente} - {inmueble}",
        fecha.format("%d/%m/%Y")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::{LEGACY_SCHEDULE_KEY, MemoryStore};
    use crate::core::types::Currency;
    use rust_decimal::Decimal;

    fn flat_row(n: u32, interes: i64, amortizacion: i64, cuota_total: i64) -> PaymentRow {
        PaymentRow {
            n,
            saldo_inicial: Decimal::ZERO,
            interes: Decimal::from(interes),
            amortizacion: Decimal::from(amortizacion),
            seguro_desgravamen: Decimal::ZERO,
            seguro_riesgo: Decimal::ZERO,
            gastos: Decimal::ZERO,
            cuota_total: Decimal::from(cuota_total),
            saldo_final: Decimal::ZERO,
        }
    }

    fn sample_draft(nombre: Option<&str>, rows: Vec<PaymentRow>) -> SimulationDraft {
        SimulationDraft {
            nombre: nombre.map(str::to_string),
            cliente: "Ana Torres".to_string(),
            cliente_dni: "45871236".to_string(),
            inmueble: "Departamento 45 m2".to_string(),
            moneda: Currency::Pen,
            monto_financiado: Some(Decimal::from(120_000)),
            cuota_mensual: Some(Decimal::new(95025, 2)),
            tcea: None,
            cronograma: rows,
        }
    }

    fn session_with_two_records() -> (SimulationSession<MemoryStore>, String, String) {
        let mut session = SimulationSession::new(MemoryStore::new());
        session.initialize();

        let first_id = session
            .archive_simulation(sample_draft(Some("Primera"), vec![flat_row(1, 10, 90, 100)]))
            .expect("archive")
            .id
            .clone();
        let second_id = session
            .archive_simulation(sample_draft(
                Some("Segunda"),
                vec![flat_row(1, 7, 93, 100), flat_row(2, 6, 94, 100)],
            ))
            .expect("archive")
            .id
            .clone();

        (session, first_id, second_id)
    }

    #[test]
    fn initialize_with_an_empty_store_shows_nothing() {
        let mut session = SimulationSession::new(MemoryStore::new());
        session.initialize();

        assert_eq!(session.source(), ScheduleSource::Empty);
        assert!(session.schedule().is_empty());
        assert!(session.summaries().is_empty());
        assert_eq!(*session.totals(), ScheduleTotals::zero());
    }

    #[test]
    fn archiving_activates_the_new_record() {
        let (session, _, second_id) = session_with_two_records();

        assert_eq!(session.source(), ScheduleSource::Archive);
        let active = session.active_record().expect("active record");
        assert_eq!(active.id, second_id);
        assert_eq!(session.schedule().len(), 2);
        assert_eq!(session.totals().total_intereses, Decimal::from(13));
    }

    #[test]
    fn records_get_distinct_ids() {
        let (_, first_id, second_id) = session_with_two_records();
        assert_ne!(first_id, second_id);
    }

    #[test]
    fn a_fresh_session_initializes_to_the_most_recent_record() {
        let store = MemoryStore::new();
        let second_id = {
            let mut session = SimulationSession::new(&store);
            session.initialize();
            session
                .archive_simulation(sample_draft(Some("Primera"), vec![flat_row(1, 10, 90, 100)]))
                .expect("archive");
            session
                .archive_simulation(sample_draft(Some("Segunda"), vec![flat_row(1, 7, 93, 100)]))
                .expect("archive")
                .id
                .clone()
        };

        let mut session = SimulationSession::new(&store);
        session.initialize();

        assert_eq!(session.summaries().len(), 2);
        assert_eq!(session.active_record().expect("active").id, second_id);
    }

    #[test]
    fn selecting_an_older_record_recomputes_its_totals() {
        let (mut session, first_id, _) = session_with_two_records();

        session.select_simulation(Some(&first_id));

        assert_eq!(session.active_record().expect("active").id, first_id);
        assert_eq!(session.schedule().len(), 1);
        assert_eq!(session.totals().total_intereses, Decimal::from(10));
        assert_eq!(session.totals().total_cuotas, Decimal::from(100));
    }

    #[test]
    fn a_stale_id_clears_the_view_but_keeps_the_list() {
        let (mut session, _, _) = session_with_two_records();

        session.select_simulation(Some("no-such-id"));

        assert_eq!(session.source(), ScheduleSource::Empty);
        assert!(session.schedule().is_empty());
        assert!(session.active_record().is_none());
        assert_eq!(*session.totals(), ScheduleTotals::zero());
        assert_eq!(session.summaries().len(), 2);
    }

    #[test]
    fn selecting_none_is_an_explicit_empty_selection() {
        let (mut session, _, _) = session_with_two_records();

        session.select_simulation(None);

        assert_eq!(session.source(), ScheduleSource::Empty);
        assert!(session.schedule().is_empty());
        assert_eq!(*session.totals(), ScheduleTotals::zero());
    }

    #[test]
    fn legacy_schedule_is_shown_when_no_archive_exists() {
        let store = MemoryStore::new();
        let rows = vec![flat_row(1, 10, 90, 100), flat_row(2, 9, 91, 100)];
        store
            .write(
                LEGACY_SCHEDULE_KEY,
                &serde_json::to_string(&rows).expect("rows serialize"),
            )
            .expect("write");

        let mut session = SimulationSession::new(store);
        session.initialize();

        assert_eq!(session.source(), ScheduleSource::Legacy);
        assert_eq!(session.schedule(), rows.as_slice());
        assert!(session.summaries().is_empty());
        assert!(session.active_record().is_none());
        assert_eq!(session.totals().total_intereses, Decimal::from(19));
    }

    #[test]
    fn archiving_from_legacy_mode_switches_to_the_archive() {
        let store = MemoryStore::new();
        store
            .write(
                LEGACY_SCHEDULE_KEY,
                &serde_json::to_string(&vec![flat_row(1, 10, 90, 100)]).expect("rows serialize"),
            )
            .expect("write");

        let mut session = SimulationSession::new(&store);
        session.initialize();
        session
            .archive_simulation(sample_draft(None, vec![flat_row(1, 5, 95, 100)]))
            .expect("archive");

        assert_eq!(session.source(), ScheduleSource::Archive);
        assert_eq!(session.summaries().len(), 1);

        // The legacy key is still there, it just no longer wins resolution.
        assert!(store.read(LEGACY_SCHEDULE_KEY).expect("read").is_some());
    }

    #[test]
    fn blank_draft_names_get_the_dated_default() {
        let fecha: DateTime<Utc> = "2024-05-01T12:00:00Z".parse().expect("valid timestamp");

        let from_none = materialize_draft(sample_draft(None, Vec::new()), fecha);
        assert_eq!(
            from_none.nombre,
            "Simulación 01/05/2024 - Ana Torres - Departamento 45 m2"
        );

        let from_blank = materialize_draft(sample_draft(Some("   "), Vec::new()), fecha);
        assert_eq!(from_blank.nombre, from_none.nombre);
    }

    #[test]
    fn supplied_draft_names_are_kept_trimmed() {
        let fecha: DateTime<Utc> = "2024-05-01T12:00:00Z".parse().expect("valid timestamp");
        let record = materialize_draft(sample_draft(Some("  Casa playa  "), Vec::new()), fecha);
        assert_eq!(record.nombre, "Casa playa");
    }

    #[test]
    fn failed_appends_leave_the_session_unchanged() {
        struct ReadOnlyStore;

        impl KeyStore for ReadOnlyStore {
            fn read(&self, _key: &str) -> crate::core::error::Result<Option<String>> {
                Ok(None)
            }

            fn write(&self, _key: &str, _value: &str) -> crate::core::error::Result<()> {
                Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
            }
        }

        let mut session = SimulationSession::new(ReadOnlyStore);
        session.initialize();

        assert!(
            session
                .archive_simulation(sample_draft(Some("x"), vec![flat_row(1, 1, 1, 2)]))
                .is_err()
        );
        assert_eq!(session.source(), ScheduleSource::Empty);
        assert!(session.summaries().is_empty());
    }
}
