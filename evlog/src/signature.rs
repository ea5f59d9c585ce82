//! Event signatures and the ABI metadata derived from a declaration.

use alloy_primitives::{keccak256, B256, U256};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::ast::EventDeclaration;

/// Canonical `Name(type1,type2,...)` string and its keccak256 hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSignature {
    pub text: String,
    pub hash: B256,
}

impl EventSignature {
    pub fn of(decl: &EventDeclaration) -> Self {
        let types = decl
            .params
            .iter()
            .map(|param| param.ty.canonical_name())
            .collect::<Vec<_>>()
            .join(",");
        let text = format!("{}({})", decl.name, types);
        let hash = keccak256(text.as_bytes());

        Self { text, hash }
    }

    /// The hash read as a big-endian unsigned integer, i.e. topic 0.
    pub fn id(&self) -> U256 {
        U256::from_be_bytes(self.hash.0)
    }
}

/// Decoding metadata of an event, keyed by its signature hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    pub name: String,
    pub types: Vec<String>,
    pub names: Vec<String>,
    pub indexed: Vec<bool>,
    pub anonymous: bool,
}

impl EventMetadata {
    /// Signature recomputed from the recorded name and canonical types.
    pub fn signature(&self) -> EventSignature {
        let text = format!("{}({})", self.name, self.types.join(","));
        let hash = keccak256(text.as_bytes());
        EventSignature { text, hash }
    }

    /// Entry of the Ethereum JSON ABI describing this event.
    pub fn to_json_abi(&self) -> serde_json::Value {
        let inputs = self
            .names
            .iter()
            .zip(&self.types)
            .zip(&self.indexed)
            .map(|((name, ty), indexed)| {
                json!({
                    "name": name,
                    "type": ty,
                    "indexed": indexed,
                })
            })
            .collect::<Vec<_>>();

        json!({
            "type": "event",
            "name": self.name,
            "inputs": inputs,
            "anonymous": self.anonymous,
        })
    }
}

/// Derives signature, hash and metadata of a declaration.
pub fn build(decl: &EventDeclaration) -> (EventSignature, EventMetadata) {
    let signature = EventSignature::of(decl);
    let metadata = EventMetadata {
        name: decl.name.clone(),
        types: decl
            .params
            .iter()
            .map(|param| param.ty.canonical_name())
            .collect(),
        names: decl.params.iter().map(|param| param.name.clone()).collect(),
        indexed: decl.params.iter().map(|param| param.indexed).collect(),
        anonymous: decl.anonymous,
    };

    (signature, metadata)
}
