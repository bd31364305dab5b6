use std::future::Future;
use std::sync::mpsc::{RecvTimeoutError, Sender as OneshotSender, channel as oneshot_channel};
use std::time::Duration;

use futures::StreamExt;
use futures::channel::mpsc::{Receiver, Sender};
use revm::primitives::{Address, B256, U256};
use revm::state::AccountInfo;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::trace;

use super::error::{DatabaseError, DatabaseResult};
use super::source::{ForkBlock, RemoteAccount, StateSource};

/// Extra time a caller waits on top of the fetch timeout before giving up on the backend
const BACKEND_GRACE: Duration = Duration::from_secs(5);

/// Requests a [super::ForkDB] or [super::ForkFactory] sends to the backend thread
#[derive(Debug)]
pub enum BackendFetchRequest {
   Basic(Address, OneshotSender<DatabaseResult<AccountInfo>>),
   Storage(Address, U256, OneshotSender<DatabaseResult<U256>>),
   BlockHash(u64, OneshotSender<DatabaseResult<B256>>),
   Account(Address, OneshotSender<DatabaseResult<RemoteAccount>>),
   Block(u64, OneshotSender<DatabaseResult<ForkBlock>>),
   ChainId(OneshotSender<DatabaseResult<u64>>),
}

/// Serves fetch requests from a [StateSource], one at a time
///
/// Runs until every sender (the factory and all forks created from it) is dropped.
pub struct ForkBackend<S> {
   source: S,
   requests: Receiver<BackendFetchRequest>,
   fork_block: u64,
   timeout: Duration,
}

impl<S: StateSource> ForkBackend<S> {
   pub fn new(source: S, requests: Receiver<BackendFetchRequest>, fork_block: u64, timeout: Duration) -> Self {
      Self {
         source,
         requests,
         fork_block,
         timeout,
      }
   }

   pub async fn run(mut self) {
      while let Some(request) = self.requests.next().await {
         self.handle(request).await;
      }
      trace!(target: "forkswap_eth::revm_utils::backend", "All forks dropped, backend exiting");
   }

   async fn handle(&self, request: BackendFetchRequest) {
      // the requester may have timed out already, a failed reply is fine
      match request {
         BackendFetchRequest::Basic(address, reply) => {
            let res = self
               .fetch(
                  format!("account {}", address),
                  self.source.account(address, self.fork_block),
               )
               .await
               .map(RemoteAccount::into_account_info);
            let _ = reply.send(res);
         }
         BackendFetchRequest::Account(address, reply) => {
            let res = self
               .fetch(
                  format!("account {}", address),
                  self.source.account(address, self.fork_block),
               )
               .await;
            let _ = reply.send(res);
         }
         BackendFetchRequest::Storage(address, slot, reply) => {
            let res = self
               .fetch(
                  format!("storage {} of {}", slot, address),
                  self.source.storage(address, slot, self.fork_block),
               )
               .await;
            let _ = reply.send(res);
         }
         BackendFetchRequest::BlockHash(number, reply) => {
            let res = self
               .fetch(format!("hash of block {}", number), self.source.block_hash(number))
               .await;
            let _ = reply.send(res);
         }
         BackendFetchRequest::Block(number, reply) => {
            let res = self
               .fetch(format!("block {}", number), self.source.block(number))
               .await
               .and_then(|block| block.ok_or(DatabaseError::MissingBlock(number)));
            let _ = reply.send(res);
         }
         BackendFetchRequest::ChainId(reply) => {
            let res = self
               .fetch("chain id".to_string(), self.source.chain_id())
               .await;
            let _ = reply.send(res);
         }
      }
   }

   async fn fetch<T>(
      &self,
      what: String,
      fut: impl Future<Output = Result<T, anyhow::Error>>,
   ) -> DatabaseResult<T> {
      trace!(target: "forkswap_eth::revm_utils::backend", "Fetching {}", what);
      match tokio::time::timeout(self.timeout, fut).await {
         Ok(Ok(value)) => Ok(value),
         Ok(Err(e)) => Err(DatabaseError::Fetch {
            what,
            reason: format!("{:#}", e),
         }),
         Err(_) => Err(DatabaseError::Timeout(self.timeout, what)),
      }
   }
}

/// Send a request to the backend and block until it answers
///
/// Inside a multi-threaded tokio runtime the worker is handed over with `block_in_place`,
/// anywhere else (current-thread runtime, no runtime) the calling thread just waits, the
/// backend runs on its own thread.
pub fn request<T>(
   backend: &Sender<BackendFetchRequest>,
   timeout: Duration,
   make: impl FnOnce(OneshotSender<DatabaseResult<T>>) -> BackendFetchRequest,
) -> DatabaseResult<T> {
   let wait = || -> DatabaseResult<T> {
      let (sender, rx) = oneshot_channel();
      backend.clone().try_send(make(sender))?;
      match rx.recv_timeout(timeout + BACKEND_GRACE) {
         Ok(res) => res,
         Err(RecvTimeoutError::Timeout) => Err(DatabaseError::Timeout(
            timeout + BACKEND_GRACE,
            "backend response".to_string(),
         )),
         Err(RecvTimeoutError::Disconnected) => Err(DatabaseError::BackendGone(
            "backend dropped the request".to_string(),
         )),
      }
   };

   match Handle::try_current() {
      Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => tokio::task::block_in_place(wait),
      _ => wait(),
   }
}
