use std::fmt;

use forkswap_eth::alloy_primitives::{Address, U256};
use forkswap_eth::revm_utils::{DatabaseError, simulate::SimulateError};
use thiserror::Error;

/// Which way a balance is expected to move
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
   Increase,
   Decrease,
}

impl fmt::Display for Direction {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      match self {
         Direction::Increase => write!(f, "increase"),
         Direction::Decrease => write!(f, "decrease"),
      }
   }
}

/// Everything that can stop a scenario, none of these are retried
#[derive(Debug, Error)]
pub enum HarnessError {
   /// The remote endpoint is unreachable, timed out or does not know the pinned block
   #[error("Environment unavailable: {0}")]
   EnvironmentUnavailable(String),

   #[error("Cannot impersonate {address}: {reason}")]
   ImpersonationDenied { address: Address, reason: String },

   #[error("Deployment failed: {0}")]
   DeploymentFailed(String),

   #[error("Action reverted: {reason}")]
   ActionReverted { reason: String },

   #[error("Expected the {token} balance of {owner} to {direction}, before: {before} after: {after}")]
   AssertionFailed {
      token: String,
      owner: Address,
      direction: Direction,
      before: U256,
      after: U256,
   },

   #[error("Configuration error: {0}")]
   ConfigurationError(String),

   #[error("{owner} holds {available} {token} but {required} is needed")]
   InsufficientFunds {
      token: String,
      owner: Address,
      required: U256,
      available: U256,
   },

   #[error("{owner} allowed {spender} to spend {granted} {token} but {required} is needed")]
   InsufficientAllowance {
      token: String,
      owner: Address,
      spender: Address,
      required: U256,
      granted: U256,
   },

   /// A fixture address has no code at the pinned block
   #[error("Fixture mismatch: {label} ({address}) has no code at block {block}")]
   FixtureMismatch { label: String, address: Address, block: u64 },

   #[error("Invalid swap parameters: {0}")]
   InvalidSwapParameters(String),
}

impl HarnessError {
   /// Short name of the variant, handy for logs and assertions
   pub fn kind(&self) -> &'static str {
      match self {
         HarnessError::EnvironmentUnavailable(_) => "EnvironmentUnavailable",
         HarnessError::ImpersonationDenied { .. } => "ImpersonationDenied",
         HarnessError::DeploymentFailed(_) => "DeploymentFailed",
         HarnessError::ActionReverted { .. } => "ActionReverted",
         HarnessError::AssertionFailed { .. } => "AssertionFailed",
         HarnessError::ConfigurationError(_) => "ConfigurationError",
         HarnessError::InsufficientFunds { .. } => "InsufficientFunds",
         HarnessError::InsufficientAllowance { .. } => "InsufficientAllowance",
         HarnessError::FixtureMismatch { .. } => "FixtureMismatch",
         HarnessError::InvalidSwapParameters(_) => "InvalidSwapParameters",
      }
   }

   pub(crate) fn reverted(reason: impl Into<String>) -> Self {
      HarnessError::ActionReverted {
         reason: reason.into(),
      }
   }
}

impl From<DatabaseError> for HarnessError {
   fn from(e: DatabaseError) -> Self {
      HarnessError::EnvironmentUnavailable(e.to_string())
   }
}

/// Errors of a call on the fork, anything the EVM rejected or undid counts as a revert
impl From<SimulateError> for HarnessError {
   fn from(e: SimulateError) -> Self {
      match e {
         SimulateError::Database(e) => HarnessError::EnvironmentUnavailable(e),
         SimulateError::Reverted { reason, .. } => HarnessError::ActionReverted { reason },
         SimulateError::Halted { reason, .. } => HarnessError::reverted(format!("halted: {}", reason)),
         other => HarnessError::reverted(other.to_string()),
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn maps_simulation_errors() {
      let err: HarnessError = SimulateError::Database("timed out".to_string()).into();
      assert_eq!(err.kind(), "EnvironmentUnavailable");

      let err: HarnessError = SimulateError::Reverted {
         reason: "STF".to_string(),
         gas_used: 21_000,
      }
      .into();
      match err {
         HarnessError::ActionReverted { reason } => assert_eq!(reason, "STF"),
         other => panic!("unexpected error: {other}"),
      }

      let err: HarnessError = SimulateError::Decode("short".to_string()).into();
      assert_eq!(err.kind(), "ActionReverted");
   }

   #[test]
   fn assertion_message_names_the_direction() {
      let err = HarnessError::AssertionFailed {
         token: "DAI".to_string(),
         owner: Address::ZERO,
         direction: Direction::Decrease,
         before: U256::from(1),
         after: U256::from(1),
      };
      assert!(err.to_string().contains("to decrease"));
   }
}
