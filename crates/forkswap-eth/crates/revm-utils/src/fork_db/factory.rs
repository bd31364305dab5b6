use std::time::Duration;

use futures::channel::mpsc::{Sender, channel};
use revm::database::InMemoryDB;
use revm::primitives::Address;
use tracing::debug;

use super::ForkDB;
use super::backend::{BackendFetchRequest, ForkBackend, request};
use super::error::{DatabaseError, DatabaseResult};
use super::source::{ForkBlock, RemoteAccount, StateSource};

/// Sets up the backend thread and hands out forks that talk to it
///
/// Each fork is its own database, fetched state is cached per fork.
#[derive(Clone, Debug)]
pub struct ForkFactory {
   chain_id: u64,
   fork_block: ForkBlock,
   backend: Sender<BackendFetchRequest>,
   timeout: Duration,
   initial_db: InMemoryDB,
}

impl ForkFactory {
   /// Create a new sandbox environment pinned at `fork_block`, backend running on its own thread
   ///
   /// Fails if the source cannot report its chain id or does not know the pinned block.
   pub fn new_sandbox_factory<S>(source: S, fork_block: u64, timeout: Duration) -> DatabaseResult<Self>
   where
      S: StateSource,
   {
      let (backend, backend_rx) = channel(1);
      let handler = ForkBackend::new(source, backend_rx, fork_block, timeout);

      // a light-weight thread with a thread-local async runtime just for
      // sending and receiving data from the remote source
      let rt = tokio::runtime::Builder::new_current_thread()
         .enable_all()
         .build()
         .map_err(|e| DatabaseError::BackendGone(format!("failed to build backend runtime: {}", e)))?;

      std::thread::Builder::new()
         .name("fork-backend-thread".to_string())
         .spawn(move || rt.block_on(handler.run()))
         .map_err(|e| DatabaseError::BackendGone(format!("failed to spawn backend thread: {}", e)))?;

      let chain_id = request(&backend, timeout, BackendFetchRequest::ChainId)?;
      let block = request(&backend, timeout, |tx| {
         BackendFetchRequest::Block(fork_block, tx)
      })?;

      debug!(target: "forkswap_eth::revm_utils::fork_db",
         "Forked chain {} at block {} ({})",
         chain_id, block.number, block.hash
      );

      Ok(Self {
         chain_id,
         fork_block: block,
         backend,
         timeout,
         initial_db: InMemoryDB::default(),
      })
   }

   pub fn chain_id(&self) -> u64 {
      self.chain_id
   }

   pub fn fork_block(&self) -> &ForkBlock {
      &self.fork_block
   }

   /// Creates new ForkDB that fallsback on this `ForkFactory` instance
   pub fn new_sandbox_fork(&self) -> ForkDB {
      ForkDB::new(self.backend.clone(), self.timeout, self.initial_db.clone())
   }

   /// Account state on the remote source at the pinned block, local changes are not visible here
   pub fn remote_account(&self, address: Address) -> DatabaseResult<RemoteAccount> {
      request(&self.backend, self.timeout, |tx| {
         BackendFetchRequest::Account(address, tx)
      })
   }
}
