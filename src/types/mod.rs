pub mod analysis;
pub mod review;

pub use analysis::{AnalysisPayload, CategoryAnalysis, CombinedResult, InsightPoint, PointKind, PromptResponse};
pub use review::{ReviewCollection, ReviewRecord, Subcategory};
