use std::future::Future;
use std::pin::Pin;

use serde_json::{Map, Value};
use sqlx::types::Uuid;
use sqlx::{PgPool, Postgres, QueryBuilder};

use fluxion_readers::{Format, Message, MessageReader, MessagesPage, PageMetadata, ReadError};
use fluxion_transformers::{json, senml};

/// PostgreSQL MessageReader backend.
///
/// Stateless per call: two sequential round trips (page select, then
/// a COUNT with the identical predicate), nothing shared across calls
/// beyond the pool.
pub struct PostgresReader {
    pool: PgPool,
}

impl PostgresReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn do_read_all(
        &self,
        channel: &str,
        page: PageMetadata,
    ) -> Result<MessagesPage, ReadError> {
        let format = Format::parse(page.format.as_deref())?;

        tracing::debug!(
            channel = %channel,
            table = %format.table(),
            limit = page.limit,
            offset = page.offset,
            "reading messages"
        );

        let mut query =
            QueryBuilder::new(format!("SELECT * FROM {} WHERE ", format.table()));
        push_conditions(&mut query, channel, &page);
        query
            .push(format!(" ORDER BY {} DESC LIMIT ", format.order_column()))
            .push_bind(i64::try_from(page.limit).unwrap_or(i64::MAX))
            .push(" OFFSET ")
            .push_bind(i64::try_from(page.offset).unwrap_or(i64::MAX));

        let messages: Vec<Message> = match format {
            Format::Senml => query
                .build_query_as::<senml::Message>()
                .fetch_all(&self.pool)
                .await
                .map_err(classify_fetch)?
                .into_iter()
                .map(Message::Senml)
                .collect(),
            Format::Json => query
                .build_query_as::<JsonRow>()
                .fetch_all(&self.pool)
                .await
                .map_err(classify_fetch)?
                .into_iter()
                .map(JsonRow::into_message)
                .collect::<Result<_, _>>()?,
        };

        let mut count =
            QueryBuilder::new(format!("SELECT COUNT(*) FROM {} WHERE ", format.table()));
        push_conditions(&mut count, channel, &page);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(ReadError::count)?;

        tracing::debug!(total, returned = messages.len(), "messages read");

        Ok(MessagesPage {
            page,
            total: total as u64,
            messages,
        })
    }
}

impl MessageReader for PostgresReader {
    fn read_all(
        &self,
        channel: &str,
        page: &PageMetadata,
    ) -> Pin<Box<dyn Future<Output = Result<MessagesPage, ReadError>> + Send + '_>> {
        let channel = channel.to_string();
        let page = page.clone();
        Box::pin(async move { self.do_read_all(&channel, page).await })
    }
}

/// Append the boolean predicate to `qb`: `channel` always, then each
/// present filter in fixed enumeration order, every value a bound
/// parameter. `from` is inclusive, `to` exclusive.
fn push_conditions(qb: &mut QueryBuilder<'_, Postgres>, channel: &str, page: &PageMetadata) {
    qb.push("channel = ").push_bind(channel.to_owned());
    if let Some(ref subtopic) = page.subtopic {
        qb.push(" AND subtopic = ").push_bind(subtopic.clone());
    }
    if let Some(ref publisher) = page.publisher {
        qb.push(" AND publisher = ").push_bind(publisher.clone());
    }
    if let Some(ref name) = page.name {
        qb.push(" AND name = ").push_bind(name.clone());
    }
    if let Some(ref protocol) = page.protocol {
        qb.push(" AND protocol = ").push_bind(protocol.clone());
    }
    if let Some(value) = page.value {
        qb.push(" AND value = ").push_bind(value);
    }
    if let Some(bool_value) = page.bool_value {
        qb.push(" AND bool_value = ").push_bind(bool_value);
    }
    if let Some(ref string_value) = page.string_value {
        qb.push(" AND string_value = ").push_bind(string_value.clone());
    }
    if let Some(ref data_value) = page.data_value {
        qb.push(" AND data_value = ").push_bind(data_value.clone());
    }
    if let Some(from) = page.from {
        qb.push(" AND time >= ").push_bind(from);
    }
    if let Some(to) = page.to {
        qb.push(" AND time < ").push_bind(to);
    }
}

/// Decode errors abort the whole read; everything else on the fetch
/// path is a query failure.
fn classify_fetch(err: sqlx::Error) -> ReadError {
    match err {
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_) => ReadError::decode(err),
        other => ReadError::query(other),
    }
}

/// Row shape every non-default table is expected to expose.
#[derive(Debug, sqlx::FromRow)]
struct JsonRow {
    id: Uuid,
    channel: String,
    created: i64,
    subtopic: String,
    publisher: String,
    protocol: String,
    payload: Vec<u8>,
}

impl JsonRow {
    fn into_message(self) -> Result<Message, ReadError> {
        let payload: Value =
            serde_json::from_slice(&self.payload).map_err(ReadError::decode)?;
        if !payload.is_object() {
            return Err(ReadError::decode(format!(
                "payload of row {} is not a JSON object",
                self.id
            )));
        }

        let mut map = Map::new();
        map.insert("id".into(), Value::String(self.id.to_string()));
        map.insert("channel".into(), Value::String(self.channel));
        map.insert("created".into(), Value::from(self.created));
        map.insert("subtopic".into(), Value::String(self.subtopic));
        map.insert("publisher".into(), Value::String(self.publisher));
        map.insert("protocol".into(), Value::String(self.protocol));
        map.insert("payload".into(), json::parse_flat(&payload));
        Ok(Message::Json(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn condition_sql(channel: &str, page: &PageMetadata) -> String {
        let mut qb = QueryBuilder::new("");
        push_conditions(&mut qb, channel, page);
        qb.sql().to_string()
    }

    #[test]
    fn no_filters_yields_channel_only_predicate() {
        assert_eq!(
            condition_sql("ch1", &PageMetadata::default()),
            "channel = $1"
        );
    }

    #[test]
    fn all_filters_in_fixed_enumeration_order() {
        let page = PageMetadata {
            subtopic: Some("temp".into()),
            publisher: Some("pub1".into()),
            name: Some("sensor".into()),
            protocol: Some("mqtt".into()),
            value: Some(4.2),
            bool_value: Some(true),
            string_value: Some("low".into()),
            data_value: Some("aGk=".into()),
            from: Some(1.0),
            to: Some(2.0),
            ..PageMetadata::default()
        };
        assert_eq!(
            condition_sql("ch1", &page),
            "channel = $1 AND subtopic = $2 AND publisher = $3 AND name = $4 \
             AND protocol = $5 AND value = $6 AND bool_value = $7 \
             AND string_value = $8 AND data_value = $9 \
             AND time >= $10 AND time < $11"
        );
    }

    #[test]
    fn sparse_filters_keep_relative_order() {
        let page = PageMetadata {
            publisher: Some("pub1".into()),
            to: Some(9.0),
            ..PageMetadata::default()
        };
        assert_eq!(
            condition_sql("ch1", &page),
            "channel = $1 AND publisher = $2 AND time < $3"
        );
    }

    #[test]
    fn json_row_decodes_and_unflattens_payload() {
        let row = JsonRow {
            id: Uuid::nil(),
            channel: "ch1".into(),
            created: 1234,
            subtopic: "engine".into(),
            publisher: "pub1".into(),
            protocol: "mqtt".into(),
            payload: json!({"coolant/temp": 95, "rpm": 3000})
                .to_string()
                .into_bytes(),
        };
        let Message::Json(map) = row.into_message().unwrap() else {
            panic!("expected json message");
        };
        assert_eq!(map["channel"], json!("ch1"));
        assert_eq!(map["created"], json!(1234));
        assert_eq!(
            map["payload"],
            json!({"coolant": {"temp": 95}, "rpm": 3000})
        );
    }

    #[test]
    fn malformed_payload_is_a_decode_failure() {
        let row = JsonRow {
            id: Uuid::nil(),
            channel: "ch1".into(),
            created: 0,
            subtopic: String::new(),
            publisher: String::new(),
            protocol: String::new(),
            payload: b"{not json".to_vec(),
        };
        assert!(matches!(row.into_message(), Err(ReadError::Decode { .. })));
    }

    #[test]
    fn non_object_payload_is_a_decode_failure() {
        let row = JsonRow {
            id: Uuid::nil(),
            channel: "ch1".into(),
            created: 0,
            subtopic: String::new(),
            publisher: String::new(),
            protocol: String::new(),
            payload: b"[1, 2, 3]".to_vec(),
        };
        assert!(matches!(row.into_message(), Err(ReadError::Decode { .. })));
    }

    #[tokio::test]
    async fn unknown_format_is_rejected_before_any_query() {
        // Lazy pool: no server behind it, so reaching the database
        // would fail with a query error instead.
        let pool = PgPool::connect_lazy("postgres://localhost:1/nowhere")
            .expect("lazy pool");
        let reader = PostgresReader::new(pool);
        let page = PageMetadata {
            format: Some("messages; DROP TABLE messages".into()),
            ..PageMetadata::default()
        };
        let err = reader.read_all("ch1", &page).await.unwrap_err();
        assert!(matches!(err, ReadError::InvalidFormat(_)));
    }
}
