#[cfg(test)]
mod tests {
   use crate::{
      ForkContext, HarnessConfig, HarnessError, SwapScenario, fixtures, trace::setup_tracing, units::format_tokens,
   };

   use forkswap_eth::abi::{alloy_dyn_abi::DynSolValue, swapper::SwapperArtifact};

   fn setup() -> (HarnessConfig, SwapperArtifact) {
      setup_tracing();
      let config = HarnessConfig::from_env().unwrap();
      let artifact = SwapperArtifact::load(&config.swapper_artifact).unwrap();
      (config, artifact)
   }

   fn run_scenario(make: fn(&HarnessConfig) -> Result<SwapScenario, HarnessError>) {
      let (config, artifact) = setup();
      let scenario = make(&config).unwrap();
      let mut ctx = ForkContext::new(config);

      let report = match scenario.run(&mut ctx, &artifact) {
         Ok(report) => report,
         Err(failure) => panic!("{}", failure),
      };

      eprintln!(
         "{}: spent {} {}, received {} {}",
         report.name,
         format_tokens(report.spent()),
         report.token_in_before.token.symbol,
         format_tokens(report.received()),
         report.token_out_before.token.symbol
      );
   }

   #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
   #[ignore = "forks Goerli, needs INFURA_API_KEY and a compiled Swapper"]
   async fn goerli_swap_uni_to_weth() {
      run_scenario(fixtures::goerli_uni_to_weth);
   }

   #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
   #[ignore = "forks Ethereum, needs INFURA_API_KEY and a compiled Swapper"]
   async fn mainnet_swap_dai_to_weth() {
      run_scenario(fixtures::mainnet_dai_to_weth);
   }

   #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
   #[ignore = "forks Polygon, needs INFURA_API_KEY and a compiled Swapper"]
   async fn polygon_swap_dai_to_wmatic() {
      run_scenario(fixtures::polygon_dai_to_wmatic);
   }

   #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
   #[ignore = "forks Ethereum, needs INFURA_API_KEY and a compiled Swapper"]
   async fn swap_without_allowance_reverts() {
      let (config, artifact) = setup();
      let scenario = fixtures::mainnet_dai_to_weth(&config).unwrap();
      let mut ctx = ForkContext::new(config);

      ctx.reset_fork(&scenario.fork).unwrap();
      let actor = ctx.impersonate(scenario.actor).unwrap();
      let swapper = ctx
         .deploy_under_test(&artifact, &[DynSolValue::Address(scenario.router)])
         .unwrap();

      let before = ctx.snapshot_balance(&scenario.token_in, actor.address()).unwrap();
      let err = ctx.execute_swap(&actor, &swapper, &scenario.params).unwrap_err();
      assert!(matches!(err, HarnessError::ActionReverted { .. }), "{err}");

      let after = ctx.snapshot_balance(&scenario.token_in, actor.address()).unwrap();
      assert_eq!(before, after);
   }

   #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
   #[ignore = "forks Ethereum, needs INFURA_API_KEY and a compiled Swapper"]
   async fn mainnet_reset_restores_balances() {
      let (config, artifact) = setup();
      let scenario = fixtures::mainnet_dai_to_weth(&config).unwrap();
      let mut ctx = ForkContext::new(config);

      let report = scenario.run(&mut ctx, &artifact).unwrap();

      // the swap is gone after a reset
      ctx.reset_fork(&scenario.fork).unwrap();
      let fresh = ctx.snapshot_balance(&scenario.token_in, scenario.actor).unwrap();
      assert_eq!(fresh.value, report.token_in_before.value);
   }

   #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
   #[ignore = "forks all three networks, needs INFURA_API_KEY"]
   async fn fixture_addresses_have_code() {
      setup_tracing();
      let config = HarnessConfig::from_env().unwrap();

      let mut failures = Vec::new();
      for scenario in fixtures::all(&config).unwrap() {
         let mut ctx = ForkContext::new(config.clone());
         ctx.reset_fork(&scenario.fork).unwrap();
         let checked = ctx.validate_fixture(&[
            (scenario.token_in.symbol.as_str(), scenario.token_in.address),
            (scenario.token_out.symbol.as_str(), scenario.token_out.address),
            ("SwapRouter", scenario.router),
         ]);

         if let Err(e) = checked {
            failures.push(format!("{}: {}", scenario.name, e));
         }
      }

      assert!(failures.is_empty(), "fixtures without code:\n{}", failures.join("\n"));
   }
}
