//! The three swap scenarios, pinned blocks and addresses are used as is
//!
//! `ForkContext::validate_fixture` rejects any address that has no code at its pinned block.

use forkswap_eth::{
   alloy_primitives::{Address, address},
   types::Network,
};

use crate::{
   HarnessConfig, HarnessError,
   harness::{ForkSpec, TokenHandle},
   scenario::SwapScenario,
   units::parse_tokens,
};

/// Uniswap V3 SwapRouter, same address on every network
pub const SWAP_ROUTER: Address = address!("E592427A0AEce92De3Edee1F18E0157C05861564");

/// 0.3% pool
pub const FEE_TIER: u32 = 3000;

pub mod goerli {
   use super::*;

   pub const FORK_BLOCK: u64 = 8446620;
   pub const UNI: Address = address!("1f9840a85d5aF5bf1D1762F925BDADdC4201F984");
   pub const WETH: Address = address!("B4FBF271143F4FBf7B91A5ded31805e42b2208d6");
   pub const UNI_HOLDER: Address = address!("41653c7d61609D856f29355E404F310Ec4142Cfb");
   pub const AMOUNT: &str = "1000000";
}

pub mod mainnet {
   use super::*;

   pub const FORK_BLOCK: u64 = 16572390;
   pub const DAI: Address = address!("6B175474E89094C44Da98b954EedeAC495271d0F");
   pub const WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
   pub const DAI_HOLDER: Address = address!("d68B6e9fC4eab0f041C5D2bF1EE7c4fD87d4e99f");
   pub const AMOUNT: &str = "1000000";
}

pub mod polygon {
   use super::*;

   pub const FORK_BLOCK: u64 = 16572390;
   pub const DAI: Address = address!("8f3Cf7ad23Cd3CaDbD9735AFf958023239c6A063");
   pub const WMATIC: Address = address!("0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270");
   pub const DAI_HOLDER: Address = address!("604981db0c06ea1b37495265eda4619c8eb95a3d");
   pub const AMOUNT: &str = "10000";
}

fn fork_spec(config: &HarnessConfig, network: Network, block: u64) -> Result<ForkSpec, HarnessError> {
   Ok(ForkSpec::new(config.endpoint(network)?, block))
}

/// Goerli, UNI -> WETH
pub fn goerli_uni_to_weth(config: &HarnessConfig) -> Result<SwapScenario, HarnessError> {
   let network = Network::goerli();
   SwapScenario::new(
      "goerli: UNI -> WETH",
      network,
      fork_spec(config, network, goerli::FORK_BLOCK)?,
      goerli::UNI_HOLDER,
      TokenHandle::new(goerli::UNI, "UNI"),
      TokenHandle::new(goerli::WETH, "WETH"),
      SWAP_ROUTER,
      FEE_TIER,
      parse_tokens(goerli::AMOUNT)?,
   )
}

/// Ethereum, DAI -> WETH
pub fn mainnet_dai_to_weth(config: &HarnessConfig) -> Result<SwapScenario, HarnessError> {
   let network = Network::eth();
   SwapScenario::new(
      "mainnet: DAI -> WETH",
      network,
      fork_spec(config, network, mainnet::FORK_BLOCK)?,
      mainnet::DAI_HOLDER,
      TokenHandle::new(mainnet::DAI, "DAI"),
      TokenHandle::new(mainnet::WETH, "WETH"),
      SWAP_ROUTER,
      FEE_TIER,
      parse_tokens(mainnet::AMOUNT)?,
   )
}

/// Polygon, DAI -> WMATIC
pub fn polygon_dai_to_wmatic(config: &HarnessConfig) -> Result<SwapScenario, HarnessError> {
   let network = Network::polygon();
   SwapScenario::new(
      "polygon: DAI -> WMATIC",
      network,
      fork_spec(config, network, polygon::FORK_BLOCK)?,
      polygon::DAI_HOLDER,
      TokenHandle::new(polygon::DAI, "DAI"),
      TokenHandle::new(polygon::WMATIC, "WMATIC"),
      SWAP_ROUTER,
      FEE_TIER,
      parse_tokens(polygon::AMOUNT)?,
   )
}

pub fn all(config: &HarnessConfig) -> Result<Vec<SwapScenario>, HarnessError> {
   Ok(vec![
      goerli_uni_to_weth(config)?,
      mainnet_dai_to_weth(config)?,
      polygon_dai_to_wmatic(config)?,
   ])
}
