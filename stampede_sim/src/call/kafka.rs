//! The Kafka backend.

use super::{DispatchError, Dispatcher};
use crate::attributes::Attributes;
use crate::scope::Scope;
use async_trait::async_trait;
use rskafka::client::partition::{Compression, PartitionClient, UnknownTopicHandling};
use rskafka::client::{Client, ClientBuilder};
use rskafka::record::Record;
use stampede_config::{Call, ParameterKind, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Reserved attribute naming the destination topic.
pub const MESSAGE_TOPIC_ATTRIBUTE: &str = "message-topic";

/// Reserved attribute holding the message-key template, rendered against the
/// message body values.
pub const MESSAGE_KEY_ATTRIBUTE: &str = "message-key";

/// Publishes one record per call.
///
/// The record body is a JSON object built from the call's `body` parameters
/// plus an RFC3339 `timestamp`; `header` parameters become record headers.
/// Topic and key come from the reserved attributes. No results are returned,
/// so the input store passes through unchanged.
pub struct KafkaDispatcher {
    client: Client,
    partitions: tokio::sync::Mutex<HashMap<String, Arc<PartitionClient>>>,
}

impl KafkaDispatcher {
    /// Connects to the given bootstrap brokers, identifying as `client_id`.
    pub async fn connect(
        brokers: Vec<String>,
        client_id: impl Into<String>,
    ) -> Result<Self, DispatchError> {
        let client = ClientBuilder::new(brokers)
            .client_id(client_id.into())
            .build()
            .await
            .map_err(|err| DispatchError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            partitions: tokio::sync::Mutex::new(HashMap::new()),
        })
    }

    /// Returns the partition client for `topic`, creating and caching it on
    /// first use. Every message goes to partition zero; the broker side is
    /// free to rebalance consumers however it likes.
    async fn partition(&self, topic: &str) -> Result<Arc<PartitionClient>, DispatchError> {
        let mut partitions = self.partitions.lock().await;
        if let Some(client) = partitions.get(topic) {
            return Ok(client.clone());
        }
        let client = Arc::new(
            self.client
                .partition_client(topic, 0, UnknownTopicHandling::Retry)
                .await
                .map_err(|err| DispatchError::Transport(err.to_string()))?,
        );
        partitions.insert(topic.to_string(), client.clone());
        Ok(client)
    }
}

#[async_trait]
impl Dispatcher for KafkaDispatcher {
    async fn dispatch(
        &self,
        _scope: &Scope,
        call: &Call,
        attributes: &Attributes,
    ) -> Result<Attributes, DispatchError> {
        let (topic, record) = build_record(call, attributes, OffsetDateTime::now_utc())?;
        let partition = self.partition(&topic).await?;
        partition
            .produce(vec![record], Compression::default())
            .await
            .map_err(|err| DispatchError::Transport(err.to_string()))?;
        Ok(attributes.clone())
    }
}

/// Assembles the destination topic and the record for one call.
fn build_record(
    call: &Call,
    attributes: &Attributes,
    now: OffsetDateTime,
) -> Result<(String, Record), DispatchError> {
    let timestamp = now
        .format(&Rfc3339)
        .map_err(|err| DispatchError::Encode(err.to_string()))?;

    let mut content = Attributes::new();
    content.insert("timestamp", Value::Str(timestamp));
    for parameter in &call.parameters {
        if parameter.kind != ParameterKind::Body {
            continue;
        }
        if let Some(value) = attributes.get(&parameter.attribute) {
            content.insert(parameter.key.clone(), value.clone());
        }
    }

    let mut body = serde_json::Map::new();
    for (key, value) in content.iter() {
        body.insert(
            key.clone(),
            serde_json::to_value(value).map_err(|err| DispatchError::Encode(err.to_string()))?,
        );
    }
    let data = serde_json::to_vec(&serde_json::Value::Object(body))
        .map_err(|err| DispatchError::Encode(err.to_string()))?;

    let topic = attributes
        .get(MESSAGE_TOPIC_ATTRIBUTE)
        .ok_or_else(|| DispatchError::MissingAttribute(MESSAGE_TOPIC_ATTRIBUTE.to_string()))?
        .to_string();
    let key_template = attributes
        .get(MESSAGE_KEY_ATTRIBUTE)
        .ok_or_else(|| DispatchError::MissingAttribute(MESSAGE_KEY_ATTRIBUTE.to_string()))?
        .to_string();
    let key = content.render(&key_template);

    let mut headers = BTreeMap::new();
    for parameter in &call.parameters {
        if parameter.kind != ParameterKind::Header {
            continue;
        }
        if let Some(value) = attributes.get(&parameter.attribute) {
            headers.insert(parameter.key.clone(), value.to_string().into_bytes());
        }
    }

    let record = Record {
        key: Some(key.into_bytes()),
        value: Some(data),
        headers,
        timestamp: rskafka::chrono::DateTime::from_timestamp(now.unix_timestamp(), now.nanosecond())
            .ok_or_else(|| DispatchError::Encode("timestamp out of range".to_string()))?,
    };
    Ok((topic, record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stampede_config::CallParameter;
    use time::macros::datetime;

    fn call() -> Call {
        Call {
            method: String::new(),
            url: String::new(),
            parameters: vec![
                CallParameter {
                    kind: ParameterKind::Body,
                    attribute: "device-id".to_string(),
                    key: "device".to_string(),
                },
                CallParameter {
                    kind: ParameterKind::Header,
                    attribute: "region".to_string(),
                    key: "x-region".to_string(),
                },
            ],
            results: Vec::new(),
        }
    }

    fn attributes() -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert(MESSAGE_TOPIC_ATTRIBUTE, Value::from("events"));
        attributes.insert(MESSAGE_KEY_ATTRIBUTE, Value::from("key-{device}"));
        attributes.insert("device-id", Value::from("d-17"));
        attributes.insert("region", Value::from("eu-1"));
        attributes
    }

    #[test]
    fn test_builds_one_record_per_call() {
        let now = datetime!(2020-01-02 03:04:05 UTC);
        let (topic, record) = build_record(&call(), &attributes(), now).expect("record");

        assert_eq!(topic, "events");
        // the key template renders against the body values
        assert_eq!(record.key.as_deref(), Some(&b"key-d-17"[..]));
        assert_eq!(
            record.timestamp,
            rskafka::chrono::DateTime::from_timestamp(now.unix_timestamp(), now.nanosecond())
                .unwrap()
        );
        assert_eq!(
            record.headers.get("x-region").map(Vec::as_slice),
            Some(&b"eu-1"[..])
        );

        let body: serde_json::Value =
            serde_json::from_slice(record.value.as_deref().expect("body")).expect("json");
        assert_eq!(body["device"], "d-17");
        assert_eq!(body["timestamp"], "2020-01-02T03:04:05Z");
    }

    #[test]
    fn test_missing_topic_or_key_fails() {
        let now = datetime!(2020-01-02 03:04:05 UTC);

        let mut store = Attributes::new();
        store.insert(MESSAGE_KEY_ATTRIBUTE, Value::from("key"));
        assert_eq!(
            build_record(&call(), &store, now).map(|_| ()),
            Err(DispatchError::MissingAttribute(
                MESSAGE_TOPIC_ATTRIBUTE.to_string()
            ))
        );

        let mut store = Attributes::new();
        store.insert(MESSAGE_TOPIC_ATTRIBUTE, Value::from("events"));
        assert_eq!(
            build_record(&call(), &store, now).map(|_| ()),
            Err(DispatchError::MissingAttribute(
                MESSAGE_KEY_ATTRIBUTE.to_string()
            ))
        );
    }

    #[test]
    fn test_missing_attributes_are_omitted() {
        let now = datetime!(2020-01-02 03:04:05 UTC);
        let mut store = Attributes::new();
        store.insert(MESSAGE_TOPIC_ATTRIBUTE, Value::from("events"));
        store.insert(MESSAGE_KEY_ATTRIBUTE, Value::from("fixed"));

        let (_, record) = build_record(&call(), &store, now).expect("record");
        let body: serde_json::Value =
            serde_json::from_slice(record.value.as_deref().expect("body")).expect("json");
        assert!(body.get("device").is_none());
        assert!(record.headers.is_empty());
        assert_eq!(record.key.as_deref(), Some(&b"fixed"[..]));
    }
}
