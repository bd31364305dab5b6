use std::collections::HashMap;
use std::future::IntoFuture;

use alloy_network::Ethereum;
use alloy_primitives::{Address, B256, Bytes, U256, keccak256};
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_types::{BlockId, BlockNumberOrTag};
use revm::primitives::KECCAK_EMPTY;
use revm::state::{AccountInfo, Bytecode};
use url::Url;

/// Header fields needed to configure the block environment of a fork
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ForkBlock {
   pub number: u64,
   pub hash: B256,
   pub timestamp: u64,
   pub beneficiary: Address,
   pub gas_limit: u64,
   pub base_fee: Option<u64>,
   pub prevrandao: B256,
   pub difficulty: U256,
}

/// Account state as seen by a [StateSource] at the pinned block
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RemoteAccount {
   pub balance: U256,
   pub nonce: u64,
   pub code: Bytes,
}

impl RemoteAccount {
   pub fn with_code(code: Bytes) -> Self {
      Self {
         code,
         ..Default::default()
      }
   }

   pub fn has_code(&self) -> bool {
      !self.code.is_empty()
   }

   pub fn into_account_info(self) -> AccountInfo {
      let (code_hash, code) = if self.code.is_empty() {
         (KECCAK_EMPTY, Bytecode::default())
      } else {
         (keccak256(&self.code), Bytecode::new_raw(self.code))
      };
      AccountInfo::new(self.balance, self.nonce, code_hash, code)
   }
}

/// Where a fork reads the state it does not have locally
///
/// Every read is made against the block the fork is pinned to.
#[allow(async_fn_in_trait)]
pub trait StateSource: Send + 'static {
   async fn chain_id(&self) -> Result<u64, anyhow::Error>;

   async fn block(&self, number: u64) -> Result<Option<ForkBlock>, anyhow::Error>;

   async fn account(&self, address: Address, block: u64) -> Result<RemoteAccount, anyhow::Error>;

   async fn storage(&self, address: Address, slot: U256, block: u64) -> Result<U256, anyhow::Error>;

   async fn block_hash(&self, number: u64) -> Result<B256, anyhow::Error>;
}

/// [StateSource] backed by a JSON-RPC provider
#[derive(Clone, Debug)]
pub struct RpcStateSource<P> {
   provider: P,
}

pub type HttpStateSource = RpcStateSource<RootProvider<Ethereum>>;

impl HttpStateSource {
   pub fn connect_http(url: Url) -> Self {
      RpcStateSource::new(RootProvider::new_http(url))
   }
}

impl<P> RpcStateSource<P> {
   pub fn new(provider: P) -> Self {
      Self { provider }
   }
}

impl<P> StateSource for RpcStateSource<P>
where
   P: Provider<Ethereum> + Send + Sync + 'static,
{
   async fn chain_id(&self) -> Result<u64, anyhow::Error> {
      Ok(self.provider.get_chain_id().await?)
   }

   async fn block(&self, number: u64) -> Result<Option<ForkBlock>, anyhow::Error> {
      let block = self
         .provider
         .get_block_by_number(BlockNumberOrTag::Number(number))
         .await?;

      Ok(block.map(|block| ForkBlock {
         number: block.header.number,
         hash: block.header.hash,
         timestamp: block.header.timestamp,
         beneficiary: block.header.beneficiary,
         gas_limit: block.header.gas_limit,
         base_fee: block.header.base_fee_per_gas,
         prevrandao: block.header.mix_hash,
         difficulty: block.header.difficulty,
      }))
   }

   async fn account(&self, address: Address, block: u64) -> Result<RemoteAccount, anyhow::Error> {
      let id = BlockId::number(block);
      let balance = self.provider.get_balance(address).block_id(id);
      let nonce = self.provider.get_transaction_count(address).block_id(id);
      let code = self.provider.get_code_at(address).block_id(id);

      let (balance, nonce, code) = tokio::try_join!(
         balance.into_future(),
         nonce.into_future(),
         code.into_future()
      )?;

      Ok(RemoteAccount {
         balance,
         nonce,
         code,
      })
   }

   async fn storage(&self, address: Address, slot: U256, block: u64) -> Result<U256, anyhow::Error> {
      let value = self
         .provider
         .get_storage_at(address, slot)
         .block_id(BlockId::number(block))
         .await?;
      Ok(value)
   }

   async fn block_hash(&self, number: u64) -> Result<B256, anyhow::Error> {
      let block = self
         .provider
         .get_block_by_number(BlockNumberOrTag::Number(number))
         .await?;
      Ok(block.map(|b| b.header.hash).unwrap_or_default())
   }
}

/// In-process [StateSource], a fixed snapshot of chain state
///
/// Accounts that were never inserted read as empty, like they would over RPC.
#[derive(Clone, Debug, Default)]
pub struct MemoryStateSource {
   chain_id: u64,
   blocks: HashMap<u64, ForkBlock>,
   accounts: HashMap<Address, RemoteAccount>,
   storage: HashMap<(Address, U256), U256>,
}

impl MemoryStateSource {
   pub fn new(chain_id: u64) -> Self {
      Self {
         chain_id,
         ..Default::default()
      }
   }

   pub fn with_block(mut self, block: ForkBlock) -> Self {
      self.blocks.insert(block.number, block);
      self
   }

   pub fn with_account(mut self, address: Address, account: RemoteAccount) -> Self {
      self.accounts.insert(address, account);
      self
   }

   pub fn with_storage(mut self, address: Address, slot: U256, value: U256) -> Self {
      self.storage.insert((address, slot), value);
      self
   }
}

impl StateSource for MemoryStateSource {
   async fn chain_id(&self) -> Result<u64, anyhow::Error> {
      Ok(self.chain_id)
   }

   async fn block(&self, number: u64) -> Result<Option<ForkBlock>, anyhow::Error> {
      Ok(self.blocks.get(&number).cloned())
   }

   async fn account(&self, address: Address, _block: u64) -> Result<RemoteAccount, anyhow::Error> {
      Ok(self.accounts.get(&address).cloned().unwrap_or_default())
   }

   async fn storage(&self, address: Address, slot: U256, _block: u64) -> Result<U256, anyhow::Error> {
      Ok(self
         .storage
         .get(&(address, slot))
         .copied()
         .unwrap_or_default())
   }

   async fn block_hash(&self, number: u64) -> Result<B256, anyhow::Error> {
      Ok(self
         .blocks
         .get(&number)
         .map(|b| b.hash)
         .unwrap_or_default())
   }
}
