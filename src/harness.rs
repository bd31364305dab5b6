use forkswap_eth::{
   abi::{alloy_dyn_abi::DynSolValue, alloy_json_abi::JsonAbi, swapper::{SwapperArtifact, encode_swap}},
   alloy_primitives::{Address, U256},
   revm_utils::{
      Evm2, ForkBlock, ForkDB, ForkFactory, HttpStateSource, StateSource, new_evm,
      simulate::{self, SimulateError},
   },
};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::{Direction, HarnessConfig, HarnessError, units::format_tokens};

/// Where to fork from and at which height
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForkSpec {
   pub remote_endpoint: Url,
   pub pinned_block: u64,
}

impl ForkSpec {
   pub fn new(remote_endpoint: Url, pinned_block: u64) -> Self {
      Self {
         remote_endpoint,
         pinned_block,
      }
   }

   /// Host of the endpoint, the full url may carry a key
   pub fn host(&self) -> &str {
      self.remote_endpoint.host_str().unwrap_or("unknown host")
   }
}

/// Permission to send transactions as `address` on the fork that granted it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImpersonatedActor {
   address: Address,
   fork_id: u64,
}

impl ImpersonatedActor {
   pub fn address(&self) -> Address {
      self.address
   }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenHandle {
   pub address: Address,
   pub symbol: String,
}

impl TokenHandle {
   pub fn new(address: Address, symbol: impl Into<String>) -> Self {
      Self {
         address,
         symbol: symbol.into(),
      }
   }
}

/// A contract deployed into the fork
#[derive(Clone, Debug)]
pub struct ContractHandle {
   pub address: Address,
   pub abi: JsonAbi,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwapParameters {
   path: Vec<Address>,
   fee: u32,
   amount: U256,
}

impl SwapParameters {
   /// `path[0]` is spent and `path[last]` is received, a path needs at least two tokens
   pub fn new(path: Vec<Address>, fee: u32, amount: U256) -> Result<Self, HarnessError> {
      if path.len() < 2 {
         return Err(HarnessError::InvalidSwapParameters(format!(
            "path needs at least 2 tokens, got {}",
            path.len()
         )));
      }

      if amount.is_zero() {
         return Err(HarnessError::InvalidSwapParameters(
            "amount must be greater than zero".to_string(),
         ));
      }

      Ok(Self { path, fee, amount })
   }

   pub fn path(&self) -> &[Address] {
      &self.path
   }

   pub fn fee(&self) -> u32 {
      self.fee
   }

   pub fn amount(&self) -> U256 {
      self.amount
   }

   pub fn token_in(&self) -> Address {
      self.path[0]
   }

   pub fn token_out(&self) -> Address {
      self.path[self.path.len() - 1]
   }
}

/// Balance of `owner` at the moment it was read
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BalanceSnapshot {
   pub token: TokenHandle,
   pub owner: Address,
   pub value: U256,
   pub block: u64,
}

/// Fails unless `after` moved strictly in `direction` from `before`
pub fn assert_directional_change(
   before: &BalanceSnapshot,
   after: &BalanceSnapshot,
   direction: Direction,
) -> Result<(), HarnessError> {
   let moved = match direction {
      Direction::Increase => after.value > before.value,
      Direction::Decrease => after.value < before.value,
   };

   if moved {
      return Ok(());
   }

   Err(HarnessError::AssertionFailed {
      token: before.token.symbol.clone(),
      owner: before.owner,
      direction,
      before: before.value,
      after: after.value,
   })
}

struct ActiveFork {
   id: u64,
   factory: ForkFactory,
   evm: Evm2<ForkDB>,
}

/// Owns one fork at a time, every step of a scenario goes through it
///
/// EVM calls block the current thread while state is fetched, async callers need a
/// multi-thread tokio runtime.
pub struct ForkContext {
   config: HarnessConfig,
   fork: Option<ActiveFork>,
   forks_created: u64,
}

impl ForkContext {
   pub fn new(config: HarnessConfig) -> Self {
      Self {
         config,
         fork: None,
         forks_created: 0,
      }
   }

   pub fn config(&self) -> &HarnessConfig {
      &self.config
   }

   pub fn is_forked(&self) -> bool {
      self.fork.is_some()
   }

   pub fn fork_block(&self) -> Option<&ForkBlock> {
      self.fork.as_ref().map(|fork| fork.factory.fork_block())
   }

   pub fn chain_id(&self) -> Option<u64> {
      self.fork.as_ref().map(|fork| fork.factory.chain_id())
   }

   /// Fork `spec.remote_endpoint` over JSON-RPC
   pub fn reset_fork(&mut self, spec: &ForkSpec) -> Result<(), HarnessError> {
      let source = HttpStateSource::connect_http(spec.remote_endpoint.clone());
      self.reset_fork_with(spec, source)
   }

   /// Replace the current fork with a fresh one at `spec.pinned_block`
   ///
   /// Every change made on the previous fork is gone, and so are its impersonations.
   pub fn reset_fork_with<S>(&mut self, spec: &ForkSpec, source: S) -> Result<(), HarnessError>
   where
      S: StateSource,
   {
      // drop the old fork first so its backend thread shuts down
      if self.fork.take().is_some() {
         debug!(target: "forkswap::harness", "Discarded previous fork");
      }

      info!(target: "forkswap::harness", "Forking {} at block {}", spec.host(), spec.pinned_block);

      let factory = ForkFactory::new_sandbox_factory(source, spec.pinned_block, self.config.request_timeout)
         .map_err(|e| {
            warn!(target: "forkswap::harness", "Failed to fork {}: {}", spec.host(), e);
            HarnessError::from(e)
         })?;

      let fork_db = factory.new_sandbox_fork();
      let mut evm = new_evm(factory.chain_id(), factory.fork_block(), fork_db);
      evm.block.gas_limit = evm.block.gas_limit.max(self.config.gas_limit);

      self.forks_created += 1;
      self.fork = Some(ActiveFork {
         id: self.forks_created,
         factory,
         evm,
      });

      Ok(())
   }

   fn active(&mut self) -> Result<&mut ActiveFork, HarnessError> {
      self.fork.as_mut().ok_or_else(|| {
         HarnessError::EnvironmentUnavailable("No active fork, reset the fork first".to_string())
      })
   }

   fn acting(&mut self, actor: &ImpersonatedActor) -> Result<&mut ActiveFork, HarnessError> {
      let fork = self.fork.as_mut().ok_or_else(|| HarnessError::ImpersonationDenied {
         address: actor.address,
         reason: "no active fork".to_string(),
      })?;

      if fork.id != actor.fork_id {
         return Err(HarnessError::ImpersonationDenied {
            address: actor.address,
            reason: "impersonation belongs to a previous fork".to_string(),
         });
      }

      Ok(fork)
   }

   /// Act as `address` without its key, only possible on a fork
   pub fn impersonate(&mut self, address: Address) -> Result<ImpersonatedActor, HarnessError> {
      let Some(fork) = self.fork.as_ref() else {
         return Err(HarnessError::ImpersonationDenied {
            address,
            reason: "not running on a fork".to_string(),
         });
      };

      debug!(target: "forkswap::harness", "Impersonating {}", address);

      Ok(ImpersonatedActor {
         address,
         fork_id: fork.id,
      })
   }

   /// Deploy `artifact` from the configured deployer
   pub fn deploy_under_test(
      &mut self,
      artifact: &SwapperArtifact,
      constructor_args: &[DynSolValue],
   ) -> Result<ContractHandle, HarnessError> {
      let code = artifact
         .deploy_code(constructor_args)
         .map_err(|e| HarnessError::DeploymentFailed(format!("{}: {}", artifact.name, e)))?;

      let deployer = self.config.deployer;
      let gas_limit = self.config.gas_limit;
      let fork = self.active()?;

      let address = simulate::deploy(&mut fork.evm, deployer, code, gas_limit).map_err(|e| match e {
         SimulateError::Database(e) => HarnessError::EnvironmentUnavailable(e),
         other => HarnessError::DeploymentFailed(format!("{}: {}", artifact.name, other)),
      })?;

      info!(target: "forkswap::harness", "Deployed {} at {}", artifact.name, address);

      Ok(ContractHandle {
         address,
         abi: artifact.abi.clone(),
      })
   }

   /// Read the balance of `owner`, nothing is committed
   pub fn snapshot_balance(&mut self, token: &TokenHandle, owner: Address) -> Result<BalanceSnapshot, HarnessError> {
      let fork = self.active()?;
      let value = simulate::erc20_balance(&mut fork.evm, token.address, owner)?;
      let block = fork.factory.fork_block().number;

      trace!(target: "forkswap::harness", "{} balance of {}: {}", token.symbol, owner, value);

      Ok(BalanceSnapshot {
         token: token.clone(),
         owner,
         value,
         block,
      })
   }

   pub fn allowance(&mut self, token: &TokenHandle, owner: Address, spender: Address) -> Result<U256, HarnessError> {
      let fork = self.active()?;
      Ok(simulate::erc20_allowance(
         &mut fork.evm,
         token.address,
         owner,
         spender,
      )?)
   }

   /// `actor` approves `spender` for `amount` of `token`
   pub fn approve_allowance(
      &mut self,
      actor: &ImpersonatedActor,
      token: &TokenHandle,
      spender: &ContractHandle,
      amount: U256,
   ) -> Result<(), HarnessError> {
      let fork = self.acting(actor)?;
      let approved = simulate::approve_token(
         &mut fork.evm,
         token.address,
         actor.address,
         spender.address,
         amount,
      )?;

      if !approved {
         return Err(HarnessError::reverted(format!(
            "{} approve returned false",
            token.symbol
         )));
      }

      debug!(target: "forkswap::harness",
         "{} approved {} {} for {}",
         actor.address, format_tokens(amount), token.symbol, spender.address
      );
      Ok(())
   }

   /// Call `swap(path, fee, amount)` on `contract` as `actor`, no retries
   pub fn execute_swap(
      &mut self,
      actor: &ImpersonatedActor,
      contract: &ContractHandle,
      params: &SwapParameters,
   ) -> Result<(), HarnessError> {
      let data = encode_swap(&contract.abi, params.path(), params.fee(), params.amount())
         .map_err(|e| HarnessError::InvalidSwapParameters(e.to_string()))?;

      let gas_limit = self.config.gas_limit;
      let fork = self.acting(actor)?;

      simulate::call_contract(
         &mut fork.evm,
         actor.address,
         contract.address,
         data,
         gas_limit,
         true,
      )
      .map_err(|e| {
         warn!(target: "forkswap::harness", "Swap on {} failed: {}", contract.address, e);
         HarnessError::from(e)
      })?;

      info!(target: "forkswap::harness",
         "Swapped {} of {} through {} (fee {})",
         format_tokens(params.amount()), params.token_in(), contract.address, params.fee()
      );
      Ok(())
   }

   /// Fails with `InsufficientFunds` when `actor` holds less than `amount` of `token`
   pub fn ensure_solvent(
      &mut self,
      actor: &ImpersonatedActor,
      token: &TokenHandle,
      amount: U256,
   ) -> Result<U256, HarnessError> {
      let available = self.snapshot_balance(token, actor.address)?.value;

      if available < amount {
         return Err(HarnessError::InsufficientFunds {
            token: token.symbol.clone(),
            owner: actor.address,
            required: amount,
            available,
         });
      }

      Ok(available)
   }

   /// Fails with `InsufficientAllowance` when `spender` may spend less than `amount`
   pub fn ensure_allowance(
      &mut self,
      actor: &ImpersonatedActor,
      token: &TokenHandle,
      spender: &ContractHandle,
      amount: U256,
   ) -> Result<U256, HarnessError> {
      let granted = self.allowance(token, actor.address, spender.address)?;

      if granted < amount {
         return Err(HarnessError::InsufficientAllowance {
            token: token.symbol.clone(),
            owner: actor.address,
            spender: spender.address,
            required: amount,
            granted,
         });
      }

      Ok(granted)
   }

   /// Every address must have code on the remote chain at the pinned block
   pub fn validate_fixture(&mut self, contracts: &[(&str, Address)]) -> Result<(), HarnessError> {
      let fork = self.active()?;
      let block = fork.factory.fork_block().number;

      for (label, address) in contracts {
         let account = fork.factory.remote_account(*address)?;
         if !account.has_code() {
            return Err(HarnessError::FixtureMismatch {
               label: label.to_string(),
               address: *address,
               block,
            });
         }
      }

      Ok(())
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use forkswap_eth::alloy_primitives::address;

   const DAI: Address = address!("6B175474E89094C44Da98b954EedeAC495271d0F");
   const WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");

   fn snapshot(value: u64) -> BalanceSnapshot {
      BalanceSnapshot {
         token: TokenHandle::new(DAI, "DAI"),
         owner: Address::ZERO,
         value: U256::from(value),
         block: 1,
      }
   }

   #[test]
   fn directional_change_is_strict() {
      assert!(assert_directional_change(&snapshot(5), &snapshot(4), Direction::Decrease).is_ok());
      assert!(assert_directional_change(&snapshot(5), &snapshot(6), Direction::Increase).is_ok());

      for direction in [Direction::Increase, Direction::Decrease] {
         let err = assert_directional_change(&snapshot(5), &snapshot(5), direction).unwrap_err();
         match err {
            HarnessError::AssertionFailed {
               direction: d,
               before,
               after,
               ..
            } => {
               assert_eq!(d, direction);
               assert_eq!(before, after);
            }
            other => panic!("unexpected error: {other}"),
         }
      }

      let err = assert_directional_change(&snapshot(5), &snapshot(6), Direction::Decrease).unwrap_err();
      assert_eq!(err.kind(), "AssertionFailed");
   }

   #[test]
   fn swap_path_needs_two_tokens() {
      let err = SwapParameters::new(vec![DAI], 3000, U256::from(1)).unwrap_err();
      assert!(matches!(err, HarnessError::InvalidSwapParameters(_)));

      let err = SwapParameters::new(vec![DAI, WETH], 3000, U256::ZERO).unwrap_err();
      assert!(matches!(err, HarnessError::InvalidSwapParameters(_)));

      let params = SwapParameters::new(vec![DAI, WETH], 3000, U256::from(1)).unwrap();
      assert_eq!(params.token_in(), DAI);
      assert_eq!(params.token_out(), WETH);
   }

   #[test]
   fn impersonation_requires_a_fork() {
      let mut ctx = ForkContext::new(HarnessConfig::new("key"));
      let err = ctx.impersonate(DAI).unwrap_err();
      assert!(matches!(err, HarnessError::ImpersonationDenied { .. }));
      assert!(!ctx.is_forked());
   }

   #[test]
   fn endpoint_host_hides_the_path() {
      let url = Url::parse("https://mainnet.infura.io/v3/secret").unwrap();
      let spec = ForkSpec::new(url, 16572390);
      assert_eq!(spec.host(), "mainnet.infura.io");
   }
}
