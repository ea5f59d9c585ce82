use alloy_primitives::{B256, U256};
use eth_log_opcodes::Opcode;
pub use revm::{
    primitives::{keccak256, ruint::Uint, AccountInfo, Address, Bytecode, Bytes},
    InMemoryDB,
};
use std::sync::Once;

use crate::{
    asm::{assemble, Instruction},
    encode::int_word,
    types::{StaticType, Value, WORD},
};

static INIT: Once = Once::new();

pub fn initialize_logger() {
    INIT.call_once(|| {
        let log_level = std::env::var("RUST_LOG").unwrap_or("INFO".to_owned());
        let tracing_sub = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_env_filter(tracing_subscriber::EnvFilter::new(log_level))
            .with_target(false)
            .finish();
        tracing::subscriber::set_global_default(tracing_sub)
            .expect("Setting tracing subscriber failed");
    });
}

pub fn add_balance_to_db(db: &mut InMemoryDB, addr: Address, value: u64) {
    db.insert_account_info(addr, AccountInfo::from_balance(U256::from(value)));
}

pub fn add_contract_to_db(db: &mut InMemoryDB, addr: Address, bytecode: Bytes) {
    let account = AccountInfo::new(
        Uint::from(0),
        0,
        keccak256(&bytecode),
        Bytecode::new_raw(bytecode),
    );
    db.insert_account_info(addr, account);
}

/// Instructions writing `word` to working memory at `offset`.
pub fn store_word(offset: u64, word: B256) -> Vec<Instruction> {
    vec![
        Instruction::Push(U256::from_be_bytes(word.0)),
        Instruction::push(offset),
        Opcode::MStore.into(),
    ]
}

/// Instructions laying out a byte-string at `offset`: its length word followed
/// by its left-aligned contents.
pub fn store_bytes(offset: u64, bytes: &[u8]) -> Vec<Instruction> {
    let mut code = store_word(offset, U256::from(bytes.len()).to_be_bytes::<32>().into());
    for (i, chunk) in bytes.chunks(WORD).enumerate() {
        code.extend(store_word(
            offset + ((i + 1) * WORD) as u64,
            B256::right_padding_from(chunk),
        ));
    }
    code
}

/// Instructions laying out a literal of type `ty` at `offset` the way a
/// `Memory` operand of that type expects it.
pub fn store_value(offset: u64, ty: &StaticType, value: &Value) -> Vec<Instruction> {
    match (ty, value) {
        (StaticType::Array { elem, .. }, Value::Array(items)) => {
            let stride = (elem.memory_words() * WORD) as u64;
            items
                .iter()
                .enumerate()
                .flat_map(|(i, item)| store_value(offset + i as u64 * stride, elem, item))
                .collect()
        }
        (_, Value::Int(value)) => store_word(offset, int_word(*value)),
        (_, Value::Address(address)) => store_word(offset, address.into_word()),
        (_, Value::Bytes(bytes)) => store_bytes(offset, bytes),
        (_, Value::Array(_)) => panic!("array literal stored as {ty}"),
    }
}

/// Prepends `prelude` to `code` and assembles the result.
pub fn with_prelude(prelude: Vec<Instruction>, code: &[Instruction]) -> Bytes {
    let mut all = prelude;
    all.extend_from_slice(code);
    assemble(&all).expect("Unable to assemble test code")
}
