use revm::{
   Context, Database, MainBuilder, MainContext,
   handler::{MainnetContext, MainnetEvm},
   primitives::{Bytes, U256, hardfork::SpecId},
};

pub use revm;
pub use revm::{DatabaseCommit, ExecuteCommitEvm, ExecuteEvm};

pub type Evm2<DB> = MainnetEvm<MainnetContext<DB>>;

pub mod fork_db;
pub mod simulate;

pub use fork_db::{
   ForkBlock, ForkDB, ForkFactory, HttpStateSource, MemoryStateSource, RemoteAccount, RpcStateSource, StateSource,
   error::DatabaseError,
};

/// Build an EVM on top of `db` with the block environment of the fork
///
/// The hardfork follows the chain and the pinned block, see [spec_id].
/// Balance, base fee, block gas limit, nonce and EIP-3607 checks are disabled so any
/// account can originate transactions without holding a key or paying for gas.
pub fn new_evm<DB>(chain_id: u64, block: &ForkBlock, db: DB) -> Evm2<DB>
where
   DB: Database,
{
   let mut evm = Context::mainnet().with_db(db).build_mainnet();

   evm.cfg.chain_id = chain_id;
   evm.cfg.spec = spec_id(chain_id, block);

   evm.block.number = U256::from(block.number);
   evm.block.beneficiary = block.beneficiary;
   evm.block.timestamp = U256::from(block.timestamp);
   evm.block.gas_limit = block.gas_limit;
   evm.block.basefee = block.base_fee.unwrap_or_default();
   evm.block.difficulty = block.difficulty;
   evm.block.prevrandao = Some(block.prevrandao);

   // Disable checks
   evm.cfg.disable_balance_check = true;
   evm.cfg.disable_base_fee = true;
   evm.cfg.disable_block_gas_limit = true;
   evm.cfg.disable_nonce_check = true;
   evm.cfg.disable_eip3607 = true;

   evm
}

/// Hardfork active at `block` on `chain_id`
///
/// Ethereum and Goerli switch on timestamps after the merge, Polygon on block numbers.
/// Unknown chains get the latest spec.
pub fn spec_id(chain_id: u64, block: &ForkBlock) -> SpecId {
   match chain_id {
      1 => match block.timestamp {
         t if t >= 1_710_338_135 => SpecId::CANCUN,
         t if t >= 1_681_338_455 => SpecId::SHANGHAI,
         _ if block.number >= 15_537_394 => SpecId::MERGE,
         _ => SpecId::LONDON,
      },
      5 => match block.timestamp {
         t if t >= 1_705_473_120 => SpecId::CANCUN,
         t if t >= 1_678_832_736 => SpecId::SHANGHAI,
         _ if block.number >= 7_382_819 => SpecId::MERGE,
         _ => SpecId::LONDON,
      },
      137 => match block.number {
         n if n >= 54_876_000 => SpecId::CANCUN,
         n if n >= 50_523_000 => SpecId::SHANGHAI,
         n if n >= 23_850_000 => SpecId::LONDON,
         _ => SpecId::BERLIN,
      },
      _ => SpecId::CANCUN,
   }
}

/// Human readable reason out of revert data
pub fn revert_msg(bytes: &Bytes) -> String {
   if bytes.is_empty() {
      return "EVM Returned 0x (Empty Bytes)".to_string();
   }

   match alloy_sol_types::decode_revert_reason(bytes) {
      Some(reason) => reason,
      None => format!("Unknown revert data: {}", bytes),
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use alloy_sol_types::{Revert, SolError};

   fn block(number: u64, timestamp: u64) -> ForkBlock {
      ForkBlock {
         number,
         timestamp,
         ..Default::default()
      }
   }

   #[test]
   fn picks_the_hardfork_of_the_pinned_block() {
      // Feb 2023, after the merge and before Shanghai
      assert_eq!(spec_id(1, &block(16_572_390, 1_675_382_400)), SpecId::MERGE);
      assert_eq!(spec_id(1, &block(19_500_000, 1_711_000_000)), SpecId::CANCUN);
      assert_eq!(spec_id(5, &block(8_446_620, 1_675_300_000)), SpecId::MERGE);
      assert_eq!(spec_id(5, &block(9_000_000, 1_680_000_000)), SpecId::SHANGHAI);
      assert_eq!(spec_id(137, &block(16_572_390, 1_625_000_000)), SpecId::BERLIN);
      assert_eq!(spec_id(137, &block(60_000_000, 1_720_000_000)), SpecId::CANCUN);
      assert_eq!(spec_id(31337, &block(1, 1)), SpecId::CANCUN);
   }

   #[test]
   fn sets_the_block_environment() {
      let db = revm::database::InMemoryDB::default();
      let evm = new_evm(1, &block(16_572_390, 1_675_382_400), db);
      assert_eq!(evm.block.number, U256::from(16_572_390u64));
      assert_eq!(evm.block.timestamp, U256::from(1_675_382_400u64));
      assert_eq!(evm.cfg.spec, SpecId::MERGE);
      assert_eq!(evm.cfg.chain_id, 1);
   }

   #[test]
   fn decodes_revert_reasons() {
      assert_eq!(revert_msg(&Bytes::new()), "EVM Returned 0x (Empty Bytes)");

      let data = Revert {
         reason: "STF".to_string(),
      }
      .abi_encode();
      assert!(revert_msg(&Bytes::from(data)).contains("STF"));
   }
}
