use forkswap_eth::{
   abi::{alloy_dyn_abi::DynSolValue, swapper::SwapperArtifact},
   alloy_primitives::{Address, U256},
   revm_utils::{HttpStateSource, StateSource},
   types::Network,
};
use thiserror::Error;
use tracing::{error, info};

use crate::{
   Direction, HarnessError,
   harness::{BalanceSnapshot, ForkContext, ForkSpec, SwapParameters, TokenHandle, assert_directional_change},
   units::format_tokens,
};

/// Progress of a scenario, `Verified` and `Failed` are terminal
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScenarioStage {
   Idle,
   Forked,
   ActorImpersonated,
   ContractDeployed,
   AllowanceGranted,
   ActionExecuted,
   Verified,
   Failed,
}

impl ScenarioStage {
   /// The stage that follows on success
   pub fn next(&self) -> Option<ScenarioStage> {
      match self {
         ScenarioStage::Idle => Some(ScenarioStage::Forked),
         ScenarioStage::Forked => Some(ScenarioStage::ActorImpersonated),
         ScenarioStage::ActorImpersonated => Some(ScenarioStage::ContractDeployed),
         ScenarioStage::ContractDeployed => Some(ScenarioStage::AllowanceGranted),
         ScenarioStage::AllowanceGranted => Some(ScenarioStage::ActionExecuted),
         ScenarioStage::ActionExecuted => Some(ScenarioStage::Verified),
         ScenarioStage::Verified | ScenarioStage::Failed => None,
      }
   }

   pub fn is_terminal(&self) -> bool {
      self.next().is_none()
   }
}

/// A scenario that stopped, `stage` is the last stage it completed
#[derive(Debug, Error)]
#[error("Scenario `{scenario}` failed after {stage:?}: {source}")]
pub struct ScenarioFailure {
   pub scenario: String,
   pub stage: ScenarioStage,
   #[source]
   pub source: HarnessError,
}

/// Balances observed by a successful run
#[derive(Clone, Debug)]
pub struct ScenarioReport {
   pub name: String,
   pub swapper: Address,
   pub token_in_before: BalanceSnapshot,
   pub token_in_after: BalanceSnapshot,
   pub token_out_before: BalanceSnapshot,
   pub token_out_after: BalanceSnapshot,
}

impl ScenarioReport {
   pub fn spent(&self) -> U256 {
      self.token_in_before.value.saturating_sub(self.token_in_after.value)
   }

   pub fn received(&self) -> U256 {
      self.token_out_after.value.saturating_sub(self.token_out_before.value)
   }
}

struct StageTracker<'a> {
   scenario: &'a str,
   stage: ScenarioStage,
}

impl<'a> StageTracker<'a> {
   fn new(scenario: &'a str) -> Self {
      Self {
         scenario,
         stage: ScenarioStage::Idle,
      }
   }

   fn advance(&mut self) {
      if let Some(next) = self.stage.next() {
         info!(target: "forkswap::scenario", "{}: {:?}", self.scenario, next);
         self.stage = next;
      }
   }

   fn fail(self, source: HarnessError) -> ScenarioFailure {
      error!(target: "forkswap::scenario",
         "{}: {:?} after {:?}, {}",
         self.scenario, ScenarioStage::Failed, self.stage, source
      );
      ScenarioFailure {
         scenario: self.scenario.to_string(),
         stage: self.stage,
         source,
      }
   }
}

/// One fork, one actor, one swap through a freshly deployed Swapper
#[derive(Clone, Debug)]
pub struct SwapScenario {
   pub name: String,
   pub network: Network,
   pub fork: ForkSpec,
   pub actor: Address,
   pub token_in: TokenHandle,
   pub token_out: TokenHandle,
   pub router: Address,
   pub params: SwapParameters,
}

impl SwapScenario {
   /// A direct `token_in -> token_out` swap
   #[allow(clippy::too_many_arguments)]
   pub fn new(
      name: impl Into<String>,
      network: Network,
      fork: ForkSpec,
      actor: Address,
      token_in: TokenHandle,
      token_out: TokenHandle,
      router: Address,
      fee: u32,
      amount: U256,
   ) -> Result<Self, HarnessError> {
      let params = SwapParameters::new(vec![token_in.address, token_out.address], fee, amount)?;
      Ok(Self {
         name: name.into(),
         network,
         fork,
         actor,
         token_in,
         token_out,
         router,
         params,
      })
   }

   fn check_path(&self) -> Result<(), HarnessError> {
      if self.params.token_in() != self.token_in.address {
         return Err(HarnessError::InvalidSwapParameters(format!(
            "path starts at {} but {} is spent",
            self.params.token_in(),
            self.token_in.symbol
         )));
      }

      if self.params.token_out() != self.token_out.address {
         return Err(HarnessError::InvalidSwapParameters(format!(
            "path ends at {} but {} is received",
            self.params.token_out(),
            self.token_out.symbol
         )));
      }

      Ok(())
   }

   /// Run against the remote endpoint of `self.fork`
   pub fn run(&self, ctx: &mut ForkContext, artifact: &SwapperArtifact) -> Result<ScenarioReport, ScenarioFailure> {
      let source = HttpStateSource::connect_http(self.fork.remote_endpoint.clone());
      self.run_with(ctx, artifact, source)
   }

   /// Run against any state source
   pub fn run_with<S>(
      &self,
      ctx: &mut ForkContext,
      artifact: &SwapperArtifact,
      source: S,
   ) -> Result<ScenarioReport, ScenarioFailure>
   where
      S: StateSource,
   {
      let mut tracker = StageTracker::new(&self.name);
      match self.drive(ctx, artifact, source, &mut tracker) {
         Ok(report) => Ok(report),
         Err(e) => Err(tracker.fail(e)),
      }
   }

   fn drive<S>(
      &self,
      ctx: &mut ForkContext,
      artifact: &SwapperArtifact,
      source: S,
      tracker: &mut StageTracker<'_>,
   ) -> Result<ScenarioReport, HarnessError>
   where
      S: StateSource,
   {
      self.check_path()?;
      let amount = self.params.amount();

      ctx.reset_fork_with(&self.fork, source)?;
      let chain_id = ctx.chain_id();
      if chain_id != Some(self.network.id()) {
         return Err(HarnessError::EnvironmentUnavailable(format!(
            "{} serves chain {:?}, expected {} ({})",
            self.fork.host(),
            chain_id,
            self.network.name(),
            self.network.id()
         )));
      }
      ctx.validate_fixture(&[
         (self.token_in.symbol.as_str(), self.token_in.address),
         (self.token_out.symbol.as_str(), self.token_out.address),
         ("SwapRouter", self.router),
      ])?;
      tracker.advance();

      let actor = ctx.impersonate(self.actor)?;
      tracker.advance();

      let swapper = ctx.deploy_under_test(artifact, &[DynSolValue::Address(self.router)])?;
      tracker.advance();

      ctx.ensure_solvent(&actor, &self.token_in, amount)?;
      let token_in_before = ctx.snapshot_balance(&self.token_in, actor.address())?;
      let token_out_before = ctx.snapshot_balance(&self.token_out, actor.address())?;
      self.log_balances("before", &token_in_before, &token_out_before);

      ctx.approve_allowance(&actor, &self.token_in, &swapper, amount)?;
      ctx.ensure_allowance(&actor, &self.token_in, &swapper, amount)?;
      tracker.advance();

      ctx.execute_swap(&actor, &swapper, &self.params)?;
      tracker.advance();

      let token_in_after = ctx.snapshot_balance(&self.token_in, actor.address())?;
      let token_out_after = ctx.snapshot_balance(&self.token_out, actor.address())?;
      self.log_balances("after", &token_in_after, &token_out_after);

      assert_directional_change(&token_in_before, &token_in_after, Direction::Decrease)?;
      assert_directional_change(&token_out_before, &token_out_after, Direction::Increase)?;
      tracker.advance();

      Ok(ScenarioReport {
         name: self.name.clone(),
         swapper: swapper.address,
         token_in_before,
         token_in_after,
         token_out_before,
         token_out_after,
      })
   }

   fn log_balances(&self, when: &str, token_in: &BalanceSnapshot, token_out: &BalanceSnapshot) {
      info!(target: "forkswap::scenario",
         "{}: {} balance {} swap: {}",
         self.name, token_in.token.symbol, when, format_tokens(token_in.value)
      );
      info!(target: "forkswap::scenario",
         "{}: {} balance {} swap: {}",
         self.name, token_out.token.symbol, when, format_tokens(token_out.value)
      );
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn stages_advance_in_order() {
      let mut stage = ScenarioStage::Idle;
      let mut seen = vec![stage];
      while let Some(next) = stage.next() {
         stage = next;
         seen.push(stage);
      }

      assert_eq!(
         seen,
         vec![
            ScenarioStage::Idle,
            ScenarioStage::Forked,
            ScenarioStage::ActorImpersonated,
            ScenarioStage::ContractDeployed,
            ScenarioStage::AllowanceGranted,
            ScenarioStage::ActionExecuted,
            ScenarioStage::Verified,
         ]
      );
      assert!(ScenarioStage::Failed.is_terminal());
      assert!(!ScenarioStage::Forked.is_terminal());
   }

   #[test]
   fn tracker_records_the_last_completed_stage() {
      let mut tracker = StageTracker::new("test");
      tracker.advance();
      tracker.advance();

      let failure = tracker.fail(HarnessError::reverted("STF"));
      assert_eq!(failure.stage, ScenarioStage::ActorImpersonated);
      assert_eq!(failure.source.kind(), "ActionReverted");
   }
}
