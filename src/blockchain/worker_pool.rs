use std::sync::Arc;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use futures::future::join_all;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::blockchain::handler::EventHandler;
use crate::db::{StoreError, UtxoStore};
use crate::models::{AddressUtxo, AddressUtxoEvent, PipelineMessage};

/// Routes pipeline messages to the registered event handlers and to the UTXO
/// storage entry point. A message whose store call fails is re-driven with
/// exponential backoff before it is given up on.
pub struct Dispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
    utxo_store: Arc<dyn UtxoStore>,
    backoff: ExponentialBuilder,
}

impl Dispatcher {
    pub fn new(utxo_store: Arc<dyn UtxoStore>, retry_attempts: usize) -> Self {
        Self {
            handlers: Vec::new(),
            utxo_store,
            backoff: ExponentialBuilder::default()
                .with_min_delay(Duration::from_millis(100))
                .with_max_times(retry_attempts),
        }
    }

    pub fn register(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub async fn dispatch(&self, message: PipelineMessage) -> Result<(), StoreError> {
        match message {
            PipelineMessage::AddressUtxoEvent(event) => self.dispatch_event(&event).await,
            PipelineMessage::SaveUnspent { utxos } => self.save_unspent(utxos).await,
        }
    }

    async fn dispatch_event(&self, event: &AddressUtxoEvent) -> Result<(), StoreError> {
        for handler in &self.handlers {
            let written = (|| async move { handler.handle(event).await })
                .retry(self.backoff)
                .notify(|e: &StoreError, after: Duration| {
                    warn!("Handler {} failed, retrying in {:?}: {}", handler.name(), after, e);
                })
                .await?;

            if written > 0 {
                debug!(
                    "Handler {} wrote {} records for slot {}",
                    handler.name(),
                    written,
                    event.event_metadata.slot
                );
            }
        }

        Ok(())
    }

    async fn save_unspent(&self, utxos: Vec<AddressUtxo>) -> Result<(), StoreError> {
        let store = &self.utxo_store;

        (|| {
            let batch = utxos.clone();
            async move { store.save_unspent(batch).await }
        })
        .retry(self.backoff)
        .notify(|e: &StoreError, after: Duration| {
            warn!("Saving unspent outputs failed, retrying in {:?}: {}", after, e);
        })
        .await
    }
}

pub struct WorkerPool {
    workers: Vec<WorkerHandle>,
    sender: mpsc::Sender<PipelineMessage>,
}

struct WorkerHandle {
    id: usize,
    handle: tokio::task::JoinHandle<usize>,
}

impl WorkerPool {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        worker_count: usize,
        capacity: usize,
        shutdown: CancellationToken,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let mut workers = Vec::with_capacity(worker_count);

        for id in 0..worker_count {
            let worker = Worker {
                id,
                dispatcher: dispatcher.clone(),
                receiver: receiver.clone(),
                shutdown: shutdown.clone(),
            };

            let handle = tokio::spawn(async move { worker.run().await });

            workers.push(WorkerHandle { id, handle });
        }

        Self { workers, sender }
    }

    pub fn get_sender(&self) -> mpsc::Sender<PipelineMessage> {
        self.sender.clone()
    }

    /// Close the queue and wait for the workers to drain it. Returns how many
    /// queued messages were abandoned because shutdown was requested first.
    pub async fn join(self) -> usize {
        drop(self.sender);

        let results = join_all(self.workers.into_iter().map(|worker| async move {
            (worker.id, worker.handle.await)
        }))
        .await;

        let mut abandoned = 0;
        for (id, result) in results {
            match result {
                Ok(count) => abandoned += count,
                Err(e) => error!("Worker {} terminated abnormally: {}", id, e),
            }
        }
        abandoned
    }
}

struct Worker {
    id: usize,
    dispatcher: Arc<Dispatcher>,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<PipelineMessage>>>,
    shutdown: CancellationToken,
}

impl Worker {
    /// Process messages until the channel closes or shutdown is requested.
    /// Returns the number of queued messages discarded on shutdown.
    async fn run(&self) -> usize {
        info!("Worker {} started", self.id);

        let mut abandoned = 0;
        loop {
            let message = {
                let mut receiver = self.receiver.lock().await;
                // None when shutdown won, Some(None) when the channel closed
                let received = tokio::select! {
                    biased;
                    _ = self.shutdown.cancelled() => None,
                    message = receiver.recv() => Some(message),
                };

                match received {
                    Some(Some(message)) => message,
                    Some(None) => {
                        info!("Worker {} channel closed, shutting down", self.id);
                        break;
                    }
                    None => {
                        abandoned = Self::discard_queued(&mut receiver);
                        if abandoned > 0 {
                            warn!("Worker {} abandoned {} queued messages on shutdown", self.id, abandoned);
                        }
                        break;
                    }
                }
            };

            if let Err(e) = self.dispatcher.dispatch(message).await {
                error!("Worker {} failed to process message: {}", self.id, e);
            }
        }

        info!("Worker {} shutting down", self.id);
        abandoned
    }

    /// Close the channel and empty it. Only the first worker to get here
    /// finds anything; the others see a closed, empty receiver.
    fn discard_queued(receiver: &mut mpsc::Receiver<PipelineMessage>) -> usize {
        receiver.close();
        let mut discarded = 0;
        while receiver.try_recv().is_ok() {
            discarded += 1;
        }
        discarded
    }
}
