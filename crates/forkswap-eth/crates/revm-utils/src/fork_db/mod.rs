use std::collections::HashMap as StdHashMap;
use std::time::Duration;

use futures::channel::mpsc::Sender;
use revm::primitives::{Address, B256, HashMap, U256};

use revm::database::{AccountState, InMemoryDB};
use revm::database_interface::{Database, DatabaseCommit};
use revm::state::{Account, AccountInfo, Bytecode};

use backend::{BackendFetchRequest, request};
use error::{DatabaseError, DatabaseResult};

pub mod backend;
pub mod error;
pub mod factory;
pub mod source;

pub use factory::ForkFactory;
pub use source::{ForkBlock, HttpStateSource, MemoryStateSource, RemoteAccount, RpcStateSource, StateSource};

/// Local copy of chain state that falls back on the backend for anything it has not seen yet
///
/// Every change committed by the EVM stays local, the remote source is never written to.
#[derive(Clone, Debug)]
pub struct ForkDB {
   // used to make calls for missing data
   backend: Sender<BackendFetchRequest>,
   timeout: Duration,
   block_hashes: StdHashMap<u64, B256>,
   pub db: InMemoryDB,
}

impl ForkDB {
   pub fn new(backend: Sender<BackendFetchRequest>, timeout: Duration, db: InMemoryDB) -> Self {
      Self {
         backend,
         timeout,
         block_hashes: StdHashMap::new(),
         db,
      }
   }

   fn do_get_basic(&self, address: Address) -> DatabaseResult<AccountInfo> {
      request(&self.backend, self.timeout, |tx| {
         BackendFetchRequest::Basic(address, tx)
      })
   }

   fn do_get_storage(&self, address: Address, index: U256) -> DatabaseResult<U256> {
      request(&self.backend, self.timeout, |tx| {
         BackendFetchRequest::Storage(address, index, tx)
      })
   }

   fn do_get_block_hash(&self, number: u64) -> DatabaseResult<B256> {
      request(&self.backend, self.timeout, |tx| {
         BackendFetchRequest::BlockHash(number, tx)
      })
   }
}

impl Database for ForkDB {
   type Error = DatabaseError;

   fn basic(&mut self, address: Address) -> Result<Option<AccountInfo>, Self::Error> {
      // found locally, return it
      if let Some(account) = self.db.cache.accounts.get(&address) {
         return Ok(Some(account.info.clone()));
      }

      let info = self.do_get_basic(address)?;
      self.db.insert_account_info(address, info.clone());
      Ok(Some(info))
   }

   fn storage(&mut self, address: Address, index: U256) -> Result<U256, Self::Error> {
      if let Some(account) = self.db.cache.accounts.get(&address) {
         if let Some(entry) = account.storage.get(&index) {
            return Ok(*entry);
         }

         // created or destroyed on the fork, the remote copy is stale
         if matches!(
            account.account_state,
            AccountState::StorageCleared | AccountState::NotExisting
         ) {
            return Ok(U256::ZERO);
         }
      } else {
         let info = self.do_get_basic(address)?;
         self.db.insert_account_info(address, info);
      }

      let value = self.do_get_storage(address, index)?;

      if let Some(account) = self.db.cache.accounts.get_mut(&address) {
         account.storage.insert(index, value);
      }

      Ok(value)
   }

   fn block_hash(&mut self, number: u64) -> Result<B256, Self::Error> {
      if let Some(hash) = self.block_hashes.get(&number) {
         return Ok(*hash);
      }

      let hash = self.do_get_block_hash(number)?;
      self.block_hashes.insert(number, hash);
      Ok(hash)
   }

   /// Get account code by its hash
   fn code_by_hash(&mut self, code_hash: B256) -> Result<Bytecode, Self::Error> {
      // code is inserted together with the account info, it should already be loaded
      self
         .db
         .code_by_hash(code_hash)
         .map_err(|_| DatabaseError::MissingCode(code_hash))
   }
}

impl DatabaseCommit for ForkDB {
   fn commit(&mut self, changes: HashMap<Address, Account>) {
      self.db.commit(changes)
   }
}
