use alloy_primitives::{Address, Bytes, TxKind, U256};
use revm::{
   Database, DatabaseCommit, ExecuteCommitEvm, ExecuteEvm,
   context::{
      TxEnv,
      result::{EVMError, ExecutionResult, Output},
   },
};
use thiserror::Error;
use tracing::trace;

use super::{Evm2, revert_msg};

/// Gas limit for calls that do not specify one
pub const DEFAULT_GAS_LIMIT: u64 = 30_000_000;

#[derive(Debug, Error)]
pub enum SimulateError {
   #[error("Call Reverted: {reason}")]
   Reverted { reason: String, gas_used: u64 },

   #[error("Call Halted: {reason}")]
   Halted { reason: String, gas_used: u64 },

   /// Forked state could not be fetched
   #[error("Fork database error: {0}")]
   Database(String),

   /// The transaction was rejected before execution
   #[error("EVM error: {0}")]
   Evm(String),

   #[error("Failed to decode output: {0}")]
   Decode(String),

   #[error("Contract creation returned no address")]
   NoContractAddress,
}

fn evm_error<DBE, TXE>(e: EVMError<DBE, TXE>) -> SimulateError
where
   DBE: std::fmt::Display + std::fmt::Debug,
   TXE: std::fmt::Debug,
{
   match e {
      EVMError::Database(e) => SimulateError::Database(e.to_string()),
      other => SimulateError::Evm(format!("{:?}", other)),
   }
}

/// Execute a transaction from `caller`, gas price is zero
///
/// With `commit` the state changes are applied to the fork, otherwise they are discarded.
/// Reverts and halts are returned as errors.
pub fn call<DB>(
   evm: &mut Evm2<DB>,
   caller: Address,
   kind: TxKind,
   data: Bytes,
   gas_limit: u64,
   commit: bool,
) -> Result<ExecutionResult, SimulateError>
where
   DB: Database + DatabaseCommit,
   DB::Error: std::fmt::Display,
{
   let tx = TxEnv {
      caller,
      kind,
      data,
      value: U256::ZERO,
      gas_limit,
      gas_price: 0,
      chain_id: Some(evm.cfg.chain_id),
      ..Default::default()
   };

   let res = if commit {
      evm.transact_commit(tx).map_err(evm_error)?
   } else {
      evm.transact(tx).map_err(evm_error)?.result
   };

   match res {
      ExecutionResult::Success { gas_used, .. } => {
         trace!(target: "forkswap_eth::revm_utils::simulate", "Call from {} succeeded, gas used: {}", caller, gas_used);
         Ok(res)
      }
      ExecutionResult::Revert { gas_used, output } => Err(SimulateError::Reverted {
         reason: revert_msg(&output),
         gas_used,
      }),
      ExecutionResult::Halt { reason, gas_used } => Err(SimulateError::Halted {
         reason: format!("{:?}", reason),
         gas_used,
      }),
   }
}

/// Call `contract` and return its output
pub fn call_contract<DB>(
   evm: &mut Evm2<DB>,
   caller: Address,
   contract: Address,
   data: Bytes,
   gas_limit: u64,
   commit: bool,
) -> Result<Bytes, SimulateError>
where
   DB: Database + DatabaseCommit,
   DB::Error: std::fmt::Display,
{
   let res = call(
      evm,
      caller,
      TxKind::Call(contract),
      data,
      gas_limit,
      commit,
   )?;
   Ok(res.output().cloned().unwrap_or_default())
}

/// Deploy a contract from `caller`, `code` is the creation code with its constructor arguments
///
/// Returns the address of the new contract
pub fn deploy<DB>(evm: &mut Evm2<DB>, caller: Address, code: Bytes, gas_limit: u64) -> Result<Address, SimulateError>
where
   DB: Database + DatabaseCommit,
   DB::Error: std::fmt::Display,
{
   let res = call(evm, caller, TxKind::Create, code, gas_limit, true)?;

   match res {
      ExecutionResult::Success {
         output: Output::Create(_, Some(address)),
         ..
      } => Ok(address),
      _ => Err(SimulateError::NoContractAddress),
   }
}

/// Simulate the balance of function of the ERC20 contract
pub fn erc20_balance<DB>(evm: &mut Evm2<DB>, token: Address, owner: Address) -> Result<U256, SimulateError>
where
   DB: Database + DatabaseCommit,
   DB::Error: std::fmt::Display,
{
   let data = abi::erc20::encode_balance_of(owner);
   let output = call_contract(evm, owner, token, data, DEFAULT_GAS_LIMIT, false)?;
   abi::erc20::decode_balance_of(&output).map_err(|e| SimulateError::Decode(e.to_string()))
}

/// Simulate the allowance function of the ERC20 contract
pub fn erc20_allowance<DB>(
   evm: &mut Evm2<DB>,
   token: Address,
   owner: Address,
   spender: Address,
) -> Result<U256, SimulateError>
where
   DB: Database + DatabaseCommit,
   DB::Error: std::fmt::Display,
{
   let data = abi::erc20::encode_allowance(owner, spender);
   let output = call_contract(evm, owner, token, data, DEFAULT_GAS_LIMIT, false)?;
   abi::erc20::decode_allowance(&output).map_err(|e| SimulateError::Decode(e.to_string()))
}

/// Simulate the approve function in the ERC20 contract, changes are committed
///
/// Returns what `approve` returned, `true` for tokens that return nothing
pub fn approve_token<DB>(
   evm: &mut Evm2<DB>,
   token: Address,
   owner: Address,
   spender: Address,
   amount: U256,
) -> Result<bool, SimulateError>
where
   DB: Database + DatabaseCommit,
   DB::Error: std::fmt::Display,
{
   let data = abi::erc20::encode_approve(spender, amount);
   let output = call_contract(evm, owner, token, data, DEFAULT_GAS_LIMIT, true)?;
   abi::erc20::decode_approve(&output).map_err(|e| SimulateError::Decode(e.to_string()))
}
