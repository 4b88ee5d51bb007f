//! Cogwatch - cognitive-risk dashboard engine for wearable wellness exports
//!
//! Cogwatch turns a personal activity/sleep CSV export into a dashboard page
//! through a synchronous per-interaction pipeline: upload parsing →
//! identity/date selection → sequence classification → mean aggregation into
//! chart inputs. Every user interaction recomputes the page from scratch.
//!
//! ## Modules
//!
//! - **table**: uploaded CSV parsed into an in-memory record table
//! - **sequence**: fixed-shape model input built from one identity's history
//! - **classifier**: narrow seam to the pretrained sequence classifier
//! - **charts**: mean aggregation mapped into pie/bar/radar chart inputs
//! - **session**: per-session context composing everything into a view model

pub mod charts;
pub mod classifier;
pub mod columns;
pub mod error;
pub mod sequence;
pub mod session;
pub mod table;

pub use charts::{
    build_all_charts, build_chart, ChartData, ChartKind, ChartPoint, ChartSpec, CHART_SPECS,
};
pub use classifier::{
    classify, CommandClassifier, Prediction, RiskClass, SequenceClassifier, StaticClassifier,
    CLASS_COUNT,
};
pub use error::DashboardError;
pub use sequence::{
    build_model_input, SequenceTensor, HOLD_LAST_TARGET, MODEL_FEATURES, SEQUENCE_LEN,
};
pub use session::{
    DashboardSession, DashboardView, PageState, ProducerInfo, ViewModel, UPLOAD_PROMPT,
};
pub use table::{DateFilter, Record, RecordTable, TableSlice};

/// Cogwatch version embedded in all view payloads
pub const COGWATCH_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for view payloads
pub const PRODUCER_NAME: &str = "cogwatch";
