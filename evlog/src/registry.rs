//! Event declarations of a compilation unit.

use std::collections::HashMap;

use alloy_primitives::B256;
use tracing::debug;

use crate::{
    ast::EventDeclaration,
    error::DeclError,
    signature::{self, EventMetadata, EventSignature},
    types::WORD,
};

/// Indexed parameters an event may declare; topic 0 holds the signature hash.
pub const MAX_INDEXED: usize = 3;

/// A registered declaration together with what was derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredEvent {
    pub decl: EventDeclaration,
    pub signature: EventSignature,
    pub metadata: EventMetadata,
}

/// Owns every event declaration of one compilation unit.
///
/// Declarations are kept in source order; the maps only serve lookups so no
/// output ever depends on hash-map iteration order.
#[derive(Debug, Default)]
pub struct EventRegistry {
    events: Vec<RegisteredEvent>,
    by_name: HashMap<String, usize>,
    by_hash: HashMap<B256, usize>,
    sealed: bool,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a non-event top-level declaration. Events registered afterwards
    /// are rejected.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn register(&mut self, decl: EventDeclaration) -> Result<&RegisteredEvent, DeclError> {
        if self.sealed {
            return Err(DeclError::MisplacedDeclaration(decl.name));
        }
        if self.by_name.contains_key(&decl.name) {
            return Err(DeclError::DuplicateName(decl.name));
        }
        validate(&decl)?;

        let (signature, metadata) = signature::build(&decl);
        debug!(
            "Registered event {} with topic 0 {}",
            signature.text, signature.hash
        );

        let index = self.events.len();
        self.by_name.insert(decl.name.clone(), index);
        self.by_hash.insert(signature.hash, index);
        self.events.push(RegisteredEvent {
            decl,
            signature,
            metadata,
        });

        Ok(&self.events[index])
    }

    pub fn resolve(&self, name: &str) -> Option<&EventDeclaration> {
        self.get(name).map(|event| &event.decl)
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredEvent> {
        self.by_name.get(name).map(|&index| &self.events[index])
    }

    pub fn metadata(&self, hash: &B256) -> Option<&EventMetadata> {
        self.by_hash
            .get(hash)
            .map(|&index| &self.events[index].metadata)
    }

    /// Registered events in declaration order.
    pub fn events(&self) -> &[RegisteredEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

fn validate(decl: &EventDeclaration) -> Result<(), DeclError> {
    let indexed = decl.indexed_params().count();
    if indexed > MAX_INDEXED {
        return Err(DeclError::TooManyIndexedParameters {
            event: decl.name.clone(),
            count: indexed,
        });
    }

    for param in &decl.params {
        if param.ty.is_zero_sized() {
            return Err(DeclError::ZeroSized {
                event: decl.name.clone(),
                param: param.name.clone(),
                ty: param.ty.to_string(),
            });
        }

        if param.indexed {
            match param.ty.topic_width() {
                None => {
                    return Err(DeclError::IndexedArray {
                        event: decl.name.clone(),
                        param: param.name.clone(),
                    })
                }
                Some(width) if width > WORD => {
                    return Err(DeclError::TopicTooWide {
                        event: decl.name.clone(),
                        param: param.name.clone(),
                        width,
                    })
                }
                Some(_) => {}
            }
        }

        if let Some(len) = param.ty.max_bytes_len().filter(|len| *len > WORD) {
            return Err(DeclError::DataValueTooWide {
                event: decl.name.clone(),
                param: param.name.clone(),
                len,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ast::EventParameter, types::StaticType};

    fn my_log(params: Vec<EventParameter>) -> EventDeclaration {
        EventDeclaration::new("MyLog", params)
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = EventRegistry::new();
        let event = registry
            .register(my_log(vec![EventParameter::indexed(
                "arg1",
                StaticType::bytes(3),
            )]))
            .unwrap();
        let hash = event.signature.hash;

        assert_eq!(event.signature.text, "MyLog(bytes3)");
        assert!(registry.resolve("MyLog").is_some());
        assert!(registry.resolve("YourLog").is_none());
        assert_eq!(registry.metadata(&hash).unwrap().names, vec!["arg1"]);
    }

    #[test]
    fn test_duplicate_name() {
        let mut registry = EventRegistry::new();
        registry.register(my_log(vec![])).unwrap();

        assert_eq!(
            registry.register(my_log(vec![])).unwrap_err(),
            DeclError::DuplicateName("MyLog".into())
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_declaration_after_other_items() {
        let mut registry = EventRegistry::new();
        registry.register(my_log(vec![])).unwrap();
        registry.seal();

        assert_eq!(
            registry
                .register(EventDeclaration::new("YourLog", vec![]))
                .unwrap_err(),
            DeclError::MisplacedDeclaration("YourLog".into())
        );
    }

    #[test]
    fn test_too_many_indexed_regardless_of_data_params() {
        for data_params in 0..4 {
            let mut params = (0..4)
                .map(|i| EventParameter::indexed(format!("arg{i}"), StaticType::Int128))
                .collect::<Vec<_>>();
            params.extend(
                (0..data_params).map(|i| EventParameter::new(format!("data{i}"), StaticType::Int128)),
            );

            let mut registry = EventRegistry::new();
            assert_eq!(
                registry.register(my_log(params)).unwrap_err(),
                DeclError::TooManyIndexedParameters {
                    event: "MyLog".into(),
                    count: 4
                }
            );
        }

        // Anonymous events get no wider ceiling.
        let params = (0..4)
            .map(|i| EventParameter::indexed(format!("arg{i}"), StaticType::Int128))
            .collect();
        assert!(matches!(
            EventRegistry::new().register(my_log(params).anonymous()),
            Err(DeclError::TooManyIndexedParameters { count: 4, .. })
        ));
    }

    #[test]
    fn test_width_limits() {
        let mut registry = EventRegistry::new();
        assert_eq!(
            registry
                .register(my_log(vec![EventParameter::new("arg1", StaticType::bytes(100))]))
                .unwrap_err(),
            DeclError::DataValueTooWide {
                event: "MyLog".into(),
                param: "arg1".into(),
                len: 100
            }
        );
        assert_eq!(
            registry
                .register(my_log(vec![EventParameter::indexed("arg1", StaticType::bytes(33))]))
                .unwrap_err(),
            DeclError::TopicTooWide {
                event: "MyLog".into(),
                param: "arg1".into(),
                width: 33
            }
        );
        assert_eq!(
            registry
                .register(my_log(vec![EventParameter::new(
                    "arg1",
                    StaticType::array(StaticType::bytes(40), 2)
                )]))
                .unwrap_err(),
            DeclError::DataValueTooWide {
                event: "MyLog".into(),
                param: "arg1".into(),
                len: 40
            }
        );
        assert_eq!(
            registry
                .register(my_log(vec![EventParameter::indexed(
                    "arg1",
                    StaticType::array(StaticType::Int128, 1)
                )]))
                .unwrap_err(),
            DeclError::IndexedArray {
                event: "MyLog".into(),
                param: "arg1".into()
            }
        );

        for ty in [
            StaticType::bytes(0),
            StaticType::array(StaticType::Int128, 0),
            StaticType::array(StaticType::array(StaticType::bytes(0), 1), 2),
        ] {
            assert_eq!(
                registry
                    .register(my_log(vec![EventParameter::new("arg1", ty.clone())]))
                    .unwrap_err(),
                DeclError::ZeroSized {
                    event: "MyLog".into(),
                    param: "arg1".into(),
                    ty: ty.to_string()
                }
            );
        }
        assert!(matches!(
            registry.register(my_log(vec![EventParameter::indexed("arg1", StaticType::bytes(0))])),
            Err(DeclError::ZeroSized { .. })
        ));

        // Failed registrations leave nothing behind.
        assert!(registry.is_empty());
        registry
            .register(my_log(vec![
                EventParameter::indexed("arg1", StaticType::bytes(32)),
                EventParameter::new("arg2", StaticType::bytes(32)),
            ]))
            .unwrap();
    }
}
