//! Execution of emitted bytecode in revm.

use core::fmt;

use revm::{
    primitives::{address, Address, Bytes, EVMError, ExecutionResult, Log, Output, TransactTo, U256},
    Database, Evm, InMemoryDB,
};
use tracing::debug;

use crate::test_utils::{add_balance_to_db, add_contract_to_db};

pub type Result<T> = core::result::Result<T, Error>;

/// Account the emitted code is installed at.
pub const CONTRACT_ADDR: Address = address!("0d4a11d5EEaaC28EC3F61d100daF4d40471f1852");
pub const CALLER_ADDR: Address = address!("0000000000000000000000000000000000000001");

/// Balance of [`CALLER_ADDR`], enough to pay for the gas limit of a call.
pub const CALLER_BALANCE: u64 = 1_000_000_000_000_000_000;

pub const BLOCK_NUMBER: u64 = 19_000_000;
pub const BLOCK_TIMESTAMP: u64 = 1_700_000_000;

#[derive(Debug)]
pub struct TxResult {
    pub output: Vec<u8>,
    pub logs: Vec<Log>,
    pub gas_used: u64,
    pub status: bool,
}

/// Error encountered while executing emitted code
#[derive(Debug, thiserror::Error)]
pub enum Error<DB: Database = InMemoryDB>
where
    DB::Error: std::error::Error + 'static,
{
    /// EVM error
    EvmError(#[from] EVMError<DB::Error>),
    /// Unexpected result of the transaction execution error
    UnexpectedExecResult(ExecutionResult),
}

/// Installs `bytecode` as the code of [`CONTRACT_ADDR`] in a fresh database and
/// calls it from [`CALLER_ADDR`].
pub fn run_code(bytecode: Bytes) -> Result<TxResult> {
    let mut db = InMemoryDB::default();
    add_contract_to_db(&mut db, CONTRACT_ADDR, bytecode);
    add_balance_to_db(&mut db, CALLER_ADDR, CALLER_BALANCE);
    run_tx(&mut db, &CONTRACT_ADDR, vec![], &CALLER_ADDR)
}

pub fn run_tx(
    db: &mut InMemoryDB,
    addr: &Address,
    calldata: Vec<u8>,
    caller: &Address,
) -> Result<TxResult> {
    let mut evm = Evm::builder()
        .with_db(db)
        .modify_tx_env(|tx| {
            tx.caller = *caller;
            tx.transact_to = TransactTo::Call(*addr);
            tx.data = calldata.into();
            tx.value = U256::from(0);
            tx.gas_price = U256::from(42);
            tx.gas_limit = 1_000_000;
        })
        .modify_block_env(|block| {
            block.number = U256::from(BLOCK_NUMBER);
            block.timestamp = U256::from(BLOCK_TIMESTAMP);
        })
        .build();

    let result = evm.transact_commit()?;

    match result {
        ExecutionResult::Success {
            output: Output::Call(value),
            logs,
            gas_used,
            ..
        } => {
            debug!("Tx emitted {} logs using {} gas", logs.len(), gas_used);
            Ok(TxResult {
                output: value.into(),
                logs,
                gas_used,
                status: true,
            })
        }
        result => Err(Error::UnexpectedExecResult(result)),
    }
}

impl fmt::Display for TxResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tx Result:\n> success: {}\n> gas used: {}\n> outcome: {}\n> logs: {:#?}\n",
            self.status,
            self.gas_used,
            Bytes::from(self.output.clone()),
            self.logs,
        )
    }
}

impl<DB: Database> fmt::Display for Error<DB>
where
    DB::Error: std::error::Error + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EvmError(e) => write!(f, "{}", e),
            Self::UnexpectedExecResult(ExecutionResult::Revert { gas_used, output }) => write!(
                f,
                "Unexpected result of the transaction execution:\n REVERT:\n > output [hex]: {}\n > gas used: {}",
                output, gas_used
            ),
            Self::UnexpectedExecResult(other) => write!(
                f,
                "Unexpected result of the transaction execution: {:?}",
                other
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::{assemble, Instruction};
    use eth_log_opcodes::Opcode;

    #[test]
    fn test_run_log0() {
        let code = assemble(&[
            Instruction::push(0u64),
            Instruction::push(0u64),
            Opcode::Log0.into(),
            Opcode::Stop.into(),
        ])
        .unwrap();

        let result = run_code(code).unwrap();
        assert!(result.status);
        assert_eq!(result.logs.len(), 1);
        assert_eq!(result.logs[0].address, CONTRACT_ADDR);
        assert!(result.logs[0].data.topics().is_empty());
        assert!(result.logs[0].data.data.is_empty());
    }

    #[test]
    fn test_caller_pays_for_gas() {
        let code = assemble(&[Opcode::Stop.into()]).unwrap();

        // Without a balance the transaction is rejected before it runs.
        let mut db = InMemoryDB::default();
        add_contract_to_db(&mut db, CONTRACT_ADDR, code.clone());
        let err = run_tx(&mut db, &CONTRACT_ADDR, vec![], &CALLER_ADDR).unwrap_err();
        assert!(matches!(err, Error::EvmError(_)), "{err}");

        let result = run_code(code).unwrap();
        assert!(result.status);
        assert!(result.gas_used > 0);
    }

    #[test]
    fn test_halt_is_an_error() {
        // LOG1 with a single stack item underflows.
        let code = assemble(&[Instruction::push(0u64), Opcode::Log1.into()]).unwrap();

        let err = run_code(code).unwrap_err();
        assert!(matches!(
            err,
            Error::UnexpectedExecResult(ExecutionResult::Halt { .. })
        ));
    }
}
