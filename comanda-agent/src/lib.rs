//! # comanda-agent
//!
//! Site print agent. Polls the job store for pending print jobs, renders
//! each order into a kitchen ticket or receipt, and delivers it to the
//! printer mapped to the job's target.
//!
//! ```text
//! comanda-agent/src/
//! ├── core/       # configuration, background tasks
//! ├── store/      # job store trait, REST and in-memory stores
//! ├── printing/   # customizations, money, document composers
//! ├── dispatch/   # poll cycle, job lifecycle, stale claim recovery
//! ├── utils/      # logging
//! └── agent.rs    # wiring
//! ```

pub mod agent;
pub mod core;
pub mod dispatch;
pub mod printing;
pub mod store;
pub mod utils;

pub use agent::Agent;
pub use core::{AgentConfig, BackgroundTasks, ConfigError};
pub use dispatch::{CycleReport, DispatchError, Dispatcher, JobOutcome, Reconciler};
pub use store::{JobStore, MemoryJobStore, RestJobStore, StoreError, StoreResult};
pub use utils::init_logger;

pub fn print_banner() {
    println!(
        r#"
  ___ ___  _ __ ___   __ _ _ __   __| | __ _
 / __/ _ \| '_ ` _ \ / _` | '_ \ / _` |/ _` |
| (_| (_) | | | | | | (_| | | | | (_| | (_| |
 \___\___/|_| |_| |_|\__,_|_| |_|\__,_|\__,_|
          print agent v{}
    "#,
        env!("CARGO_PKG_VERSION")
    );
}
