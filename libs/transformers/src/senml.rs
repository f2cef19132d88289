use serde::{Deserialize, Serialize};

/// Resolved SenML measurement record, one row of the default table.
///
/// At most one of the value slots (`value`, `string_value`,
/// `data_value`, `bool_value`) is set per record; `sum` may accompany
/// or replace them. `time` and `update_time` are Unix seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub channel: String,
    pub subtopic: String,
    pub publisher: String,
    pub protocol: String,
    pub name: String,
    pub unit: String,
    pub time: f64,
    pub update_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    /// Base64-encoded opaque data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bool_value: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sum: Option<f64>,
}
