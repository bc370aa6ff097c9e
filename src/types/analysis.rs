use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Key used to tag model output that could not be parsed as JSON
pub const RAW_RESPONSE_KEY: &str = "raw_response";

/// Validated model output for one prompt.
///
/// `Raw` is written as `{"raw_response": text}` so downstream readers can
/// detect and skip it.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisPayload {
    Structured(Value),
    Raw(String),
}

impl AnalysisPayload {
    /// Parse candidate JSON text, degrading to `Raw` when it is not valid JSON
    pub fn from_json_text(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => AnalysisPayload::Structured(value),
            Err(_) => AnalysisPayload::Raw(text.to_string()),
        }
    }

    /// Resolve a stored value into its variant
    pub fn from_value(value: Value) -> Self {
        if let Value::Object(map) = &value
            && map.len() == 1
            && let Some(Value::String(text)) = map.get(RAW_RESPONSE_KEY)
        {
            return AnalysisPayload::Raw(text.clone());
        }
        AnalysisPayload::Structured(value)
    }

    pub fn to_value(&self) -> Value {
        match self {
            AnalysisPayload::Structured(value) => value.clone(),
            AnalysisPayload::Raw(text) => {
                let mut map = Map::new();
                map.insert(RAW_RESPONSE_KEY.to_string(), Value::String(text.clone()));
                Value::Object(map)
            }
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, AnalysisPayload::Raw(_))
    }
}

impl Serialize for AnalysisPayload {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            AnalysisPayload::Structured(value) => value.serialize(serializer),
            AnalysisPayload::Raw(_) => self.to_value().serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for AnalysisPayload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(AnalysisPayload::from_value)
    }
}

/// Persisted form of one prompt's output: `{"response": payload}`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PromptResponse {
    pub response: AnalysisPayload,
}

impl PromptResponse {
    pub fn new(response: AnalysisPayload) -> Self {
        Self { response }
    }

    /// Unwrap a loaded response file.
    ///
    /// Files without a top-level `response` key are taken as a whole.
    pub fn unwrap_loaded(value: Value) -> AnalysisPayload {
        match value {
            Value::Object(mut map) if map.contains_key("response") => {
                let inner = map.remove("response").unwrap_or(Value::Null);
                AnalysisPayload::from_value(inner)
            }
            other => AnalysisPayload::from_value(other),
        }
    }
}

/// Merged report of one analysis run, ordered by prompt id
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct CombinedResult {
    pub categories: Vec<AnalysisPayload>,
}

/// Which list of a category analysis to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    Positive,
    Critical,
}

impl PointKind {
    pub fn key(&self) -> &'static str {
        match self {
            PointKind::Positive => "positive_points",
            PointKind::Critical => "critical_points",
        }
    }
}

/// One aggregated statement with the reviews supporting it
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct InsightPoint {
    pub point: String,
    pub count: u64,
    #[serde(default)]
    pub references: Vec<Reference>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Reference {
    pub review_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct CategoryAnalysis {
    #[serde(default)]
    pub positive_points: Vec<InsightPoint>,
    #[serde(default)]
    pub critical_points: Vec<InsightPoint>,
}

impl CategoryAnalysis {
    pub fn points(&self, kind: PointKind) -> &[InsightPoint] {
        match kind {
            PointKind::Positive => &self.positive_points,
            PointKind::Critical => &self.critical_points,
        }
    }
}

impl CombinedResult {
    /// Keys of all single-key category entries, in report order
    pub fn category_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .filter_map(|payload| match payload {
                AnalysisPayload::Structured(Value::Object(map)) if map.len() == 1 => {
                    map.keys().next().cloned()
                }
                _ => None,
            })
            .collect()
    }

    /// Locate a category by key and decode it.
    ///
    /// Returns `None` for missing categories, raw payloads and any shape that
    /// does not decode, never an error.
    pub fn find_category(&self, name: &str) -> Option<CategoryAnalysis> {
        self.categories.iter().find_map(|payload| match payload {
            AnalysisPayload::Structured(Value::Object(map)) => map
                .get(name)
                .and_then(|value| serde_json::from_value(value.clone()).ok()),
            _ => None,
        })
    }

    /// Points of one kind for a category; `None` when there is nothing to chart
    pub fn points(&self, name: &str, kind: PointKind) -> Option<Vec<InsightPoint>> {
        let category = self.find_category(name)?;
        let points = category.points(kind);
        if points.is_empty() {
            None
        } else {
            Some(points.to_vec())
        }
    }
}
