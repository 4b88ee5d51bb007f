//! Per-session dashboard state and view computation.
//!
//! The interactive page is modeled as an explicit context object: the
//! uploaded table and the current selections live in [`DashboardSession`],
//! and [`DashboardSession::view`] recomputes the filtered subset, the
//! prediction, and every chart from scratch on each call. There are exactly
//! two page states (no file, file loaded) with nothing in between.

use std::io::Read;
use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::charts::{build_all_charts, ChartData};
use crate::classifier::{classify, Prediction, SequenceClassifier};
use crate::columns;
use crate::error::DashboardError;
use crate::sequence::build_model_input;
use crate::table::{DateFilter, RecordTable};
use crate::{COGWATCH_VERSION, PRODUCER_NAME};

/// Prompt shown while no file is loaded, in the export locale.
pub const UPLOAD_PROMPT: &str = "파일을 업로드 해주세요.";

/// Producer metadata stamped on every view payload.
#[derive(Debug, Clone, Serialize)]
pub struct ProducerInfo {
    pub name: String,
    pub version: String,
    pub session_id: String,
}

/// One row of the filtered subset, for tabular display.
#[derive(Debug, Clone, Serialize)]
pub struct RawRow {
    pub identity: String,
    pub date: String,
    pub values: Vec<f64>,
}

/// The filtered subset as shown in the raw-data table.
#[derive(Debug, Clone, Serialize)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// Everything the loaded page shows.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub identity: String,
    pub date: String,
    pub identity_options: Vec<String>,
    pub date_options: Vec<String>,
    pub prediction: Prediction,
    /// Readout line for the prediction, in the export locale.
    pub result_text: String,
    pub charts: Vec<ChartData>,
    pub table: RawTable,
}

/// Page content: either the upload prompt or a fully computed dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PageState {
    NoFile { prompt: String },
    Loaded(DashboardView),
}

/// One computed page, with provenance.
#[derive(Debug, Clone, Serialize)]
pub struct ViewModel {
    pub producer: ProducerInfo,
    pub computed_at_utc: String,
    pub page: PageState,
}

/// Session context for one interactive user.
///
/// Holds the uploaded table, the current identity/date selection, and the
/// classifier behind its narrow seam. Nothing persists across sessions.
pub struct DashboardSession {
    session_id: Uuid,
    classifier: Box<dyn SequenceClassifier>,
    table: Option<RecordTable>,
    identity: Option<String>,
    date: DateFilter,
}

impl DashboardSession {
    pub fn new(classifier: Box<dyn SequenceClassifier>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            classifier,
            table: None,
            identity: None,
            date: DateFilter::All,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn table(&self) -> Option<&RecordTable> {
        self.table.as_ref()
    }

    /// Load an uploaded CSV file, replacing any previous table and resetting
    /// the selection to the first identity over all dates.
    pub fn load_csv_path(&mut self, path: &Path) -> Result<(), DashboardError> {
        let table = RecordTable::from_path(path)?;
        self.load_table(table);
        Ok(())
    }

    /// Same as [`Self::load_csv_path`] for any CSV byte stream.
    pub fn load_csv<R: Read>(&mut self, reader: R) -> Result<(), DashboardError> {
        let table = RecordTable::from_reader(reader)?;
        self.load_table(table);
        Ok(())
    }

    /// Install an already-parsed table, same reset semantics as the loaders.
    pub fn load_table(&mut self, table: RecordTable) {
        info!(
            rows = table.len(),
            identities = table.identities().len(),
            "table uploaded"
        );
        self.identity = table.identities().first().map(|s| s.to_string());
        self.date = DateFilter::All;
        self.table = Some(table);
    }

    /// Select whose records to analyze. The identity must exist in the table.
    pub fn select_identity(&mut self, identity: &str) -> Result<(), DashboardError> {
        let table = self.table.as_ref().ok_or(DashboardError::NoFile)?;
        if !table.identities().contains(&identity) {
            return Err(DashboardError::UnknownIdentity(identity.to_string()));
        }
        self.identity = Some(identity.to_string());
        Ok(())
    }

    /// Restrict the charts and the raw table to one date, or back to all.
    /// A date with no matching rows is allowed; it yields blank charts.
    pub fn select_date(&mut self, date: DateFilter) {
        self.date = date;
    }

    /// Recompute the whole page from current state.
    pub fn view(&self) -> Result<ViewModel, DashboardError> {
        let producer = ProducerInfo {
            name: PRODUCER_NAME.to_string(),
            version: COGWATCH_VERSION.to_string(),
            session_id: self.session_id.to_string(),
        };
        let computed_at_utc = Utc::now().to_rfc3339();

        let Some(table) = &self.table else {
            return Ok(ViewModel {
                producer,
                computed_at_utc,
                page: PageState::NoFile {
                    prompt: UPLOAD_PROMPT.to_string(),
                },
            });
        };
        let identity = self.identity.clone().ok_or(DashboardError::NoFile)?;

        // The prediction always runs over the identity's full history; the
        // date selection narrows only the charts and the raw table.
        let tensor = build_model_input(table, &identity)?;
        let prediction = classify(self.classifier.as_ref(), &tensor)?;
        let result_text = prediction.result_text();

        let slice = table.filter(&identity, self.date);
        let charts = build_all_charts(&slice)?;

        let identity_options = table
            .identities()
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        let mut date_options = vec![columns::DATE_ALL.to_string()];
        date_options.extend(
            table
                .dates()
                .into_iter()
                .map(|d| d.format("%Y-%m-%d").to_string()),
        );

        let raw_table = RawTable {
            columns: table.display_columns(),
            rows: slice
                .rows()
                .iter()
                .map(|row| RawRow {
                    identity: row.identity.clone(),
                    date: row.date.format("%Y-%m-%d").to_string(),
                    values: row.metrics.clone(),
                })
                .collect(),
        };

        Ok(ViewModel {
            producer,
            computed_at_utc,
            page: PageState::Loaded(DashboardView {
                identity,
                date: self.date.as_label(),
                identity_options,
                date_options,
                prediction,
                result_text,
                charts,
                table: raw_table,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::CHART_SPECS;
    use crate::classifier::{RiskClass, StaticClassifier};
    use crate::sequence::MODEL_FEATURES;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    /// Chart columns in spec order, padded with filler metrics to the model's
    /// 51-feature contract.
    fn metric_names() -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for spec in &CHART_SPECS {
            for label in spec.labels {
                if !names.iter().any(|n| n == label) {
                    names.push((*label).to_string());
                }
            }
        }
        let mut filler = 0;
        while names.len() < MODEL_FEATURES {
            names.push(format!("extra_{filler}"));
            filler += 1;
        }
        names
    }

    /// Every chart column gets `value`; filler columns get zero.
    fn csv_row(identity: &str, date: &str, value: f64, names: &[String]) -> String {
        let mut row = format!("{identity},{date}");
        for name in names {
            if name.starts_with("extra_") {
                row.push_str(",0");
            } else {
                row.push_str(&format!(",{value}"));
            }
        }
        row.push('\n');
        row
    }

    fn dashboard_csv() -> String {
        let names = metric_names();
        assert_eq!(names.len(), MODEL_FEATURES);
        let mut csv = format!("{},{}", columns::IDENTITY, columns::SUMMARY_DATE);
        for name in &names {
            csv.push(',');
            csv.push_str(name);
        }
        csv.push('\n');
        csv.push_str(&csv_row("a@x.com", "2024-01-01", 10.0, &names));
        csv.push_str(&csv_row("a@x.com", "2024-01-02", 20.0, &names));
        csv.push_str(&csv_row("b@x.com", "2024-01-01", 80.0, &names));
        csv
    }

    fn loaded_session() -> DashboardSession {
        let mut session =
            DashboardSession::new(Box::new(StaticClassifier::new(vec![0.1, 0.2, 0.7])));
        session.load_csv(dashboard_csv().as_bytes()).unwrap();
        session
    }

    fn loaded_view(session: &DashboardSession) -> DashboardView {
        match session.view().unwrap().page {
            PageState::Loaded(view) => view,
            PageState::NoFile { .. } => panic!("expected a loaded page"),
        }
    }

    #[test]
    fn view_without_a_file_is_the_upload_prompt() {
        let session = DashboardSession::new(Box::new(StaticClassifier::new(vec![1.0, 0.0, 0.0])));
        let model = session.view().unwrap();
        match model.page {
            PageState::NoFile { prompt } => assert_eq!(prompt, UPLOAD_PROMPT),
            PageState::Loaded(_) => panic!("expected the no-file page"),
        }
        assert_eq!(model.producer.name, PRODUCER_NAME);
    }

    #[test]
    fn loading_selects_the_first_identity_over_all_dates() {
        let session = loaded_session();
        let view = loaded_view(&session);
        assert_eq!(view.identity, "a@x.com");
        assert_eq!(view.date, columns::DATE_ALL);
    }

    #[test]
    fn selector_options_cover_the_whole_table() {
        let session = loaded_session();
        let view = loaded_view(&session);
        assert_eq!(view.identity_options, vec!["a@x.com", "b@x.com"]);
        assert_eq!(
            view.date_options,
            vec![columns::DATE_ALL, "2024-01-01", "2024-01-02"]
        );
    }

    #[test]
    fn charts_aggregate_exactly_the_selected_identity() {
        let session = loaded_session();
        let view = loaded_view(&session);
        // a@x.com has rows valued 10 and 20; b@x.com's 80 must not leak in.
        let distance = view.charts.iter().find(|c| c.id == "distance_steps").unwrap();
        assert_eq!(distance.points[0].value, Some(15.0));
        assert_eq!(view.table.rows.len(), 2);
        assert!(view.table.rows.iter().all(|r| r.identity == "a@x.com"));
    }

    #[test]
    fn date_selection_narrows_charts_and_raw_table() {
        let mut session = loaded_session();
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        session.select_date(DateFilter::On(day));
        let view = loaded_view(&session);
        let distance = view.charts.iter().find(|c| c.id == "distance_steps").unwrap();
        assert_eq!(distance.points[0].value, Some(20.0));
        assert_eq!(view.table.rows.len(), 1);
        assert_eq!(view.date, "2024-01-02");
    }

    #[test]
    fn unmatched_date_renders_blank_charts_not_an_error() {
        let mut session = loaded_session();
        session.select_date(DateFilter::On(
            NaiveDate::from_ymd_opt(2030, 6, 1).unwrap(),
        ));
        let view = loaded_view(&session);
        assert!(view
            .charts
            .iter()
            .all(|c| c.points.iter().all(|p| p.value.is_none())));
        assert!(view.table.rows.is_empty());
        // The prediction still runs over the full history.
        assert_eq!(view.prediction.class, RiskClass::Dementia);
    }

    #[test]
    fn prediction_and_result_text_follow_the_classifier() {
        let session = loaded_session();
        let view = loaded_view(&session);
        assert_eq!(view.prediction.class, RiskClass::Dementia);
        assert_eq!(view.prediction.confidence_pct, 70.0);
        assert_eq!(view.result_text, "분석결과 70.00% 확률로 치매 입니다.");
    }

    #[test]
    fn selecting_an_absent_identity_is_an_error() {
        let mut session = loaded_session();
        let err = session.select_identity("ghost@x.com").unwrap_err();
        assert!(matches!(err, DashboardError::UnknownIdentity(_)));
    }

    #[test]
    fn selecting_before_upload_is_an_error() {
        let mut session =
            DashboardSession::new(Box::new(StaticClassifier::new(vec![1.0, 0.0, 0.0])));
        let err = session.select_identity("a@x.com").unwrap_err();
        assert!(matches!(err, DashboardError::NoFile));
    }

    #[test]
    fn switching_identity_recomputes_everything() {
        let mut session = loaded_session();
        session.select_identity("b@x.com").unwrap();
        let view = loaded_view(&session);
        let distance = view.charts.iter().find(|c| c.id == "distance_steps").unwrap();
        assert_eq!(distance.points[0].value, Some(80.0));
        assert_eq!(view.table.rows.len(), 1);
    }

    #[test]
    fn reloading_a_file_resets_the_selection() {
        let mut session = loaded_session();
        session.select_identity("b@x.com").unwrap();
        session.load_csv(dashboard_csv().as_bytes()).unwrap();
        let view = loaded_view(&session);
        assert_eq!(view.identity, "a@x.com");
    }
}
