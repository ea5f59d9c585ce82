//! Off-chain decoding of emitted logs through the event metadata.

use std::collections::{BTreeMap, HashMap};

use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::B256;

use crate::{registry::EventRegistry, signature::EventMetadata};

/// Key holding the event name in a decoded log.
pub const EVENT_TYPE_KEY: &str = "_event_type";

/// Parameter name to value, plus the event name under [`EVENT_TYPE_KEY`].
pub type DecodedEvent = BTreeMap<String, DynSolValue>;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("log has no topics, cannot identify the event")]
    MissingSignature,
    #[error("no event with signature hash {0}")]
    UnknownEvent(B256),
    #[error("topic 0 {found} does not match event signature {expected}")]
    SignatureMismatch { expected: String, found: B256 },
    #[error("event `{event}` has {expected} indexed parameters, log has {found} topics for them")]
    TopicCount {
        event: String,
        expected: usize,
        found: usize,
    },
    #[error("invalid type `{ty}` in event metadata: {reason}")]
    InvalidType { ty: String, reason: String },
    #[error("cannot decode `{param}`: {reason}")]
    Value { param: String, reason: String },
}

/// Decodes logs of non-anonymous events, looked up by topic 0.
#[derive(Debug, Clone, Default)]
pub struct EventDecoder {
    events: HashMap<B256, EventMetadata>,
}

impl EventDecoder {
    pub fn new(events: impl IntoIterator<Item = EventMetadata>) -> Self {
        let events = events
            .into_iter()
            .filter(|metadata| !metadata.anonymous)
            .map(|metadata| (metadata.signature().hash, metadata))
            .collect();
        Self { events }
    }

    pub fn from_registry(registry: &EventRegistry) -> Self {
        Self::new(registry.events().iter().map(|event| event.metadata.clone()))
    }

    pub fn decode(&self, topics: &[B256], data: &[u8]) -> Result<DecodedEvent, DecodeError> {
        let hash = topics.first().ok_or(DecodeError::MissingSignature)?;
        let metadata = self
            .events
            .get(hash)
            .ok_or(DecodeError::UnknownEvent(*hash))?;
        decode_with(metadata, topics, data)
    }
}

/// Decodes a log of the event described by `metadata`. Anonymous events have
/// no signature topic, so the caller has to know which event was logged.
pub fn decode_with(
    metadata: &EventMetadata,
    topics: &[B256],
    data: &[u8],
) -> Result<DecodedEvent, DecodeError> {
    let mut topics = topics.iter();
    if !metadata.anonymous {
        let signature = metadata.signature();
        match topics.next() {
            Some(found) if *found == signature.hash => {}
            Some(found) => {
                return Err(DecodeError::SignatureMismatch {
                    expected: signature.text,
                    found: *found,
                })
            }
            None => return Err(DecodeError::MissingSignature),
        }
    }

    let expected = metadata.indexed.iter().filter(|indexed| **indexed).count();
    if topics.len() != expected {
        return Err(DecodeError::TopicCount {
            event: metadata.name.clone(),
            expected,
            found: topics.len(),
        });
    }

    let mut decoded = DecodedEvent::new();
    let mut body = Vec::new();
    for ((name, ty), indexed) in metadata.names.iter().zip(&metadata.types).zip(&metadata.indexed) {
        let ty = DynSolType::parse(ty).map_err(|err| DecodeError::InvalidType {
            ty: ty.clone(),
            reason: err.to_string(),
        })?;

        if *indexed {
            let topic = topics.next().ok_or_else(|| DecodeError::TopicCount {
                event: metadata.name.clone(),
                expected,
                found: 0,
            })?;
            let value = ty.abi_decode(topic.as_slice()).map_err(|err| DecodeError::Value {
                param: name.clone(),
                reason: err.to_string(),
            })?;
            decoded.insert(name.clone(), value);
        } else {
            body.push((name, ty));
        }
    }

    if !body.is_empty() {
        let (names, types): (Vec<_>, Vec<_>) = body.into_iter().unzip();
        let values = DynSolType::Tuple(types)
            .abi_decode_sequence(data)
            .map_err(|err| DecodeError::Value {
                param: "data".to_string(),
                reason: err.to_string(),
            })?;

        let DynSolValue::Tuple(values) = values else {
            return Err(DecodeError::Value {
                param: "data".to_string(),
                reason: "body did not decode as a tuple".to_string(),
            });
        };
        for (name, value) in names.into_iter().zip(values) {
            decoded.insert(name.clone(), value);
        }
    }

    decoded.insert(
        EVENT_TYPE_KEY.to_string(),
        DynSolValue::String(metadata.name.clone()),
    );
    Ok(decoded)
}
