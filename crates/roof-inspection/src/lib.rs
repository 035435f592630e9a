mod enumerator;
mod error;
mod inspector;
mod record;
mod run;
mod verdict;

pub use enumerator::{ensure_directory, list_entries};
pub use error::{InspectionError, InspectionResult};
pub use inspector::{RoofInspector, VisionInspector, ROOF_PROMPT};
pub use record::AnalyzedImageRecord;
pub use run::{start_run, InspectionSettings, RecordStream};
pub use verdict::{is_alert, InferenceResult, VerdictPolicy, NO, YES};
