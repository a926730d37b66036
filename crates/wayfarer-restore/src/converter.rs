//! Restoration converters
//!
//! Routes whose state does not fit in a location string name a converter
//! key; the registry maps that key to the codec for the payload.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::RestoreError;
use crate::Result;

pub trait RouteConverter<R>: Send + Sync {
    fn encode(&self, route: &R) -> anyhow::Result<Value>;
    fn decode(&self, value: &Value) -> anyhow::Result<R>;
}

/// Converter for routes whose payload is a serde type.
pub struct SerdeConverter<R, P> {
    to_payload: fn(&R) -> Option<P>,
    from_payload: fn(P) -> R,
}

impl<R, P> SerdeConverter<R, P> {
    pub fn new(to_payload: fn(&R) -> Option<P>, from_payload: fn(P) -> R) -> Self {
        Self {
            to_payload,
            from_payload,
        }
    }
}

impl<R, P> RouteConverter<R> for SerdeConverter<R, P>
where
    R: std::fmt::Debug + Send + Sync,
    P: Serialize + DeserializeOwned + Send + Sync,
{
    fn encode(&self, route: &R) -> anyhow::Result<Value> {
        let payload = (self.to_payload)(route)
            .ok_or_else(|| anyhow::anyhow!("converter does not handle route {:?}", route))?;
        Ok(serde_json::to_value(payload)?)
    }

    fn decode(&self, value: &Value) -> anyhow::Result<R> {
        let payload: P = serde_json::from_value(value.clone())?;
        Ok((self.from_payload)(payload))
    }
}

/// Append-only map from converter key to converter.
pub struct ConverterRegistry<R> {
    converters: HashMap<String, Arc<dyn RouteConverter<R>>>,
}

impl<R> ConverterRegistry<R> {
    pub fn new() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        key: impl Into<String>,
        converter: impl RouteConverter<R> + 'static,
    ) -> &mut Self {
        let key = key.into();
        if self.converters.contains_key(&key) {
            tracing::warn!(converter = %key, "Ignoring duplicate converter registration");
            return self;
        }
        self.converters.insert(key, Arc::new(converter));
        self
    }

    pub fn get(&self, key: &str) -> Result<Arc<dyn RouteConverter<R>>> {
        self.converters
            .get(key)
            .cloned()
            .ok_or_else(|| RestoreError::UnregisteredConverter {
                key: key.to_string(),
            })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.converters.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}

impl<R> Default for ConverterRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for ConverterRegistry<R> {
    fn clone(&self) -> Self {
        Self {
            converters: self.converters.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    enum Page {
        Draft { body: String },
        Home,
    }

    #[derive(Serialize, Deserialize)]
    struct DraftPayload {
        body: String,
    }

    fn draft_converter() -> SerdeConverter<Page, DraftPayload> {
        SerdeConverter::new(
            |page| match page {
                Page::Draft { body } => Some(DraftPayload { body: body.clone() }),
                _ => None,
            },
            |payload| Page::Draft { body: payload.body },
        )
    }

    #[test]
    fn test_serde_converter() {
        let converter = draft_converter();
        let page = Page::Draft {
            body: "hello".to_string(),
        };

        let value = converter.encode(&page).unwrap();
        assert_eq!(value, json!({"body": "hello"}));
        assert_eq!(converter.decode(&value).unwrap(), page);
        assert!(converter.encode(&Page::Home).is_err());
    }

    #[test]
    fn test_unregistered_converter() {
        let mut registry = ConverterRegistry::new();
        registry.register("draft", draft_converter());

        assert!(registry.contains("draft"));
        assert_eq!(registry.len(), 1);

        let err = registry.get("missing").err().unwrap();
        let message = err.to_string();
        assert!(message.contains("'missing'"));
        assert!(message.contains("ConverterRegistry::register"));
    }
}
