//! Agent assembly
//!
//! Wires configuration, store, transport, dispatcher and reconciler, and
//! registers the two periodic loops.

use crate::core::{AgentConfig, BackgroundTasks};
use crate::dispatch::{Dispatcher, Reconciler};
use crate::store::{JobStore, RestJobStore, StoreResult};
use comanda_printer::{PrinterTransport, Transport};
use std::sync::Arc;

pub struct Agent {
    config: Arc<AgentConfig>,
    dispatcher: Arc<Dispatcher>,
    reconciler: Arc<Reconciler>,
}

impl Agent {
    pub fn new(
        config: Arc<AgentConfig>,
        store: Arc<dyn JobStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(config.clone(), store.clone(), transport));
        let reconciler = Arc::new(Reconciler::new(
            store,
            config.stale_claim_after,
            config.reconcile_interval,
        ));
        Self {
            config,
            dispatcher,
            reconciler,
        }
    }

    /// Agent backed by the remote store and the host print subsystem
    pub fn from_config(config: Arc<AgentConfig>) -> StoreResult<Self> {
        let store = RestJobStore::new(&config.store_url, &config.store_api_key, config.store_timeout)?;
        let transport = PrinterTransport::new(
            comanda_printer::default_spooler(),
            &config.delivery_strategies,
            config.strategy_timeout,
        );
        tracing::info!(
            store = %store.base_url(),
            strategies = ?transport.strategy_names(),
            kitchen = %config.kitchen_printer,
            cashier = %config.cashier_printer,
            "Agent configured"
        );
        Ok(Self::new(config, Arc::new(store), Arc::new(transport)))
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    /// Register the poll loop and the reconciler
    pub fn start(&self, tasks: &mut BackgroundTasks) {
        let token = tasks.shutdown_token();
        tasks.spawn("poll_loop", self.dispatcher.clone().run(token.clone()));
        tasks.spawn("stale_claim_reconciler", self.reconciler.clone().run(token));
    }
}
