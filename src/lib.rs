//! Fork a live EVM network at a pinned block, act as any account on it and check that a
//! Swapper contract moves balances the way it should.

pub mod config;
pub mod error;
pub mod fixtures;
pub mod harness;
pub mod scenario;
pub mod trace;
pub mod units;

mod tests;

pub use config::HarnessConfig;
pub use error::{Direction, HarnessError};
pub use harness::{
   BalanceSnapshot, ContractHandle, ForkContext, ForkSpec, ImpersonatedActor, SwapParameters, TokenHandle,
   assert_directional_change,
};
pub use scenario::{ScenarioFailure, ScenarioReport, ScenarioStage, SwapScenario};

pub use forkswap_eth;
