use serde::{Deserialize, Serialize};

use fluxion_transformers::senml;

use crate::error::ReadError;

/// Storage format selector — picks the table and the row shape.
///
/// Closed allow-list: caller input is parsed into this enum before any
/// SQL is built, so it never reaches a table-name position verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    /// Default table of typed SenML records.
    #[default]
    Senml,
    /// Generic JSON records.
    Json,
}

impl Format {
    /// Parse the wire-level format value. Empty or absent means the
    /// default SenML table; anything outside the allow-list is an error.
    pub fn parse(raw: Option<&str>) -> Result<Self, ReadError> {
        match raw.unwrap_or("") {
            "" | "messages" => Ok(Format::Senml),
            "json" => Ok(Format::Json),
            other => Err(ReadError::InvalidFormat(other.to_string())),
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            Format::Senml => "messages",
            Format::Json => "json",
        }
    }

    /// Column results are ordered by (descending). The SenML table
    /// carries a trustworthy event-time column; JSON tables only
    /// guarantee insertion order.
    pub fn order_column(self) -> &'static str {
        match self {
            Format::Senml => "time",
            Format::Json => "created",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

fn default_limit() -> u64 {
    10
}

/// Page request: sparse filters plus limit/offset.
///
/// A filter participates in the predicate iff it is `Some`. Wire tag
/// names are fixed: `format`, `subtopic`, `publisher`, `name`,
/// `protocol`, `v`, `vb`, `vs`, `vd`, `from`, `to`, `limit`, `offset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtopic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    /// Numeric value filter. The four value filters are mutually
    /// exclusive by convention; this is not enforced.
    #[serde(rename = "v", default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(rename = "vb", default, skip_serializing_if = "Option::is_none")]
    pub bool_value: Option<bool>,
    #[serde(rename = "vs", default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    #[serde(rename = "vd", default, skip_serializing_if = "Option::is_none")]
    pub data_value: Option<String>,
    /// Inclusive lower time bound (`time >= from`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<f64>,
    /// Exclusive upper time bound (`time < to`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<f64>,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

impl Default for PageMetadata {
    fn default() -> Self {
        Self {
            format: None,
            subtopic: None,
            publisher: None,
            name: None,
            protocol: None,
            value: None,
            bool_value: None,
            string_value: None,
            data_value: None,
            from: None,
            to: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

/// One decoded message. The variant is selected once per read by
/// `Format`, never mixed within a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Message {
    Senml(senml::Message),
    /// Generic mapping with a nested, unflattened `payload` object.
    Json(serde_json::Map<String, serde_json::Value>),
}

/// A bounded slice of matching rows plus the total count of rows
/// matching the filter, independent of limit/offset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessagesPage {
    #[serde(flatten)]
    pub page: PageMetadata,
    pub total: u64,
    pub messages: Vec<Message>,
}
