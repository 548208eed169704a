//! The HTTP backend.

use super::{DispatchError, Dispatcher};
use crate::attributes::Attributes;
use crate::scope::Scope;
use async_trait::async_trait;
use stampede_config::{Call, ParameterKind, Value};
use std::collections::HashMap;

/// Performs one HTTP request per call.
///
/// The URL template is rendered against the attribute store; `body`
/// parameters are gathered into a JSON object, `form` parameters into the
/// query string and `header` parameters into request headers. A non-2xx
/// status is a failure. When the call declares results, the response body is
/// decoded as a flat JSON object of strings and the declared keys are copied
/// into attributes.
pub struct HttpDispatcher {
    client: reqwest::Client,
}

impl HttpDispatcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn dispatch(
        &self,
        _scope: &Scope,
        call: &Call,
        attributes: &Attributes,
    ) -> Result<Attributes, DispatchError> {
        if call.method.is_empty() {
            return Err(DispatchError::MissingMethod);
        }
        if call.url.is_empty() {
            return Err(DispatchError::MissingUrl);
        }
        let method = reqwest::Method::from_bytes(call.method.as_bytes())
            .map_err(|_| DispatchError::InvalidMethod(call.method.clone()))?;

        let url = attributes.render(&call.url);
        let mut request = self.client.request(method, &url);
        let mut body = serde_json::Map::new();
        for parameter in &call.parameters {
            let value = attributes.get(&parameter.attribute);
            match parameter.kind {
                ParameterKind::Body => {
                    let encoded = match value {
                        Some(value) => serde_json::to_value(value)
                            .map_err(|err| DispatchError::Encode(err.to_string()))?,
                        None => serde_json::Value::Null,
                    };
                    body.insert(parameter.key.clone(), encoded);
                }
                ParameterKind::Form => {
                    let rendered =
                        value.map(Value::to_string).unwrap_or_default();
                    request = request.query(&[(parameter.key.as_str(), rendered)]);
                }
                ParameterKind::Header => {
                    let rendered =
                        value.map(Value::to_string).unwrap_or_default();
                    request = request.header(&parameter.key, rendered);
                }
            }
        }
        if !body.is_empty() {
            request = request.json(&serde_json::Value::Object(body));
        }

        let response = request
            .send()
            .await
            .map_err(|err| DispatchError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Status(status.as_u16()));
        }

        let mut result = attributes.clone();
        if !call.results.is_empty() {
            let values: HashMap<String, String> = response
                .json()
                .await
                .map_err(|err| DispatchError::Decode(err.to_string()))?;
            for declared in &call.results {
                let value = values
                    .get(&declared.key)
                    .ok_or_else(|| DispatchError::MissingResultKey(declared.key.clone()))?;
                result.insert(declared.attribute.clone(), Value::Str(value.clone()));
            }
        }
        Ok(result)
    }
}
