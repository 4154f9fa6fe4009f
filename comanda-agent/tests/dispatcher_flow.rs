//! Dispatcher behaviour against the in-memory store

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use comanda_agent::{AgentConfig, Dispatcher, JobOutcome, JobStore, MemoryJobStore};
use comanda_printer::{
    Delivery, DeliveryContext, DeliveryStrategy, PortInfo, PrintResult, PrinterTransport, Spooler,
    StrategyFailure, StrategyKind, Transport, TransportError,
};
use parking_lot::Mutex;
use serde_json::json;
use shared::models::{
    JobStatus, JobType, Order, OrderItem, OrderKind, PaymentMethod, PrintJob, PrinterTarget,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

// ========== Fixtures ==========

fn config(max_attempts: u32) -> Arc<AgentConfig> {
    let mut config = AgentConfig::new("http://store.local", "key", "COCINA", "CAJA");
    config.max_print_attempts = max_attempts;
    Arc::new(config)
}

fn item(id: &str, name: &str, quantity: u32, unit_price: f64) -> OrderItem {
    OrderItem {
        id: id.to_string(),
        name: name.to_string(),
        category: Some("Sandwiches".to_string()),
        quantity,
        unit_price,
        subtotal: unit_price * quantity as f64,
        customization: None,
        position: None,
    }
}

fn order(id: &str, items: Vec<OrderItem>) -> Order {
    Order {
        id: id.to_string(),
        number: 12,
        kind: OrderKind::DineIn,
        table: Some("7".to_string()),
        customer_name: None,
        total: items.iter().map(|i| i.subtotal).sum(),
        payment_method: Some(PaymentMethod::Cash),
        paid_at: Some(Utc::now()),
        note: None,
        created_at: Utc::now(),
        items,
    }
}

fn job(id: &str, order_id: &str, job_type: JobType, target: PrinterTarget, age_secs: i64) -> PrintJob {
    PrintJob::new(
        id,
        order_id,
        job_type,
        target,
        Utc::now() - TimeDelta::seconds(age_secs),
    )
}

fn store_with_order() -> Arc<MemoryJobStore> {
    let store = Arc::new(MemoryJobStore::new());
    store.insert_order(order(
        "o1",
        vec![item("i1", "Completo", 1, 1000.0), item("i2", "Papas", 1, 1200.0)],
    ));
    store
}

// ========== Scripted transport ==========

#[derive(Debug, Clone, Copy, PartialEq)]
enum Behavior {
    Print,
    Fail,
    Missing,
}

struct ScriptedTransport {
    behavior: Behavior,
    send_delay: Duration,
    sent: Mutex<Vec<(String, Vec<u8>)>>,
    in_flight: Mutex<HashMap<String, usize>>,
    max_per_printer: Mutex<usize>,
    max_total: Mutex<usize>,
}

impl ScriptedTransport {
    fn new(behavior: Behavior) -> Arc<Self> {
        Self::with_delay(behavior, Duration::ZERO)
    }

    fn with_delay(behavior: Behavior, send_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            send_delay,
            sent: Mutex::new(Vec::new()),
            in_flight: Mutex::new(HashMap::new()),
            max_per_printer: Mutex::new(0),
            max_total: Mutex::new(0),
        })
    }

    fn sends(&self) -> Vec<(String, Vec<u8>)> {
        self.sent.lock().clone()
    }

    fn enter(&self, printer: &str) {
        let mut in_flight = self.in_flight.lock();
        let count = in_flight.entry(printer.to_string()).or_default();
        *count += 1;
        let per_printer = *count;
        let total: usize = in_flight.values().sum();
        let mut max = self.max_per_printer.lock();
        *max = (*max).max(per_printer);
        let mut max_total = self.max_total.lock();
        *max_total = (*max_total).max(total);
    }

    fn leave(&self, printer: &str) {
        if let Some(count) = self.in_flight.lock().get_mut(printer) {
            *count -= 1;
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn exists(&self, _printer: &str) -> Result<bool, TransportError> {
        Ok(self.behavior != Behavior::Missing)
    }

    async fn send(&self, printer: &str, data: &[u8]) -> Result<Delivery, TransportError> {
        self.enter(printer);
        if !self.send_delay.is_zero() {
            tokio::time::sleep(self.send_delay).await;
        }
        self.sent.lock().push((printer.to_string(), data.to_vec()));
        self.leave(printer);

        match self.behavior {
            Behavior::Print => Ok(Delivery {
                strategy: "scripted".to_string(),
                port: PortInfo::classify("USB001"),
                bytes: data.len(),
                earlier_failures: Vec::new(),
            }),
            _ => Err(TransportError::AllStrategiesFailed {
                printer: printer.to_string(),
                failures: vec![
                    StrategyFailure {
                        strategy: "direct".to_string(),
                        reason: "port busy".to_string(),
                        skipped: false,
                    },
                    StrategyFailure {
                        strategy: "spooler".to_string(),
                        reason: "printer offline".to_string(),
                        skipped: false,
                    },
                ],
            }),
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

// ========== Lifecycle ==========

#[tokio::test]
async fn test_successful_job_is_printed() {
    let store = store_with_order();
    store.insert_job(job("j1", "o1", JobType::Kitchen, PrinterTarget::Kitchen, 5));
    let transport = ScriptedTransport::new(Behavior::Print);
    let dispatcher = Dispatcher::new(config(3), store.clone(), transport.clone());

    let report = dispatcher.poll_once().await.unwrap();

    assert_eq!(report.listed, 1);
    assert_eq!(report.printed, 1);
    let job = store.job("j1").unwrap();
    assert_eq!(job.status, JobStatus::Printed);
    assert_eq!(job.attempts, 1);
    assert!(job.printed_at.is_some());
    assert!(job.error_message.is_none());
    assert!(job.claimed_at.is_none());

    let sends = transport.sends();
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].0, "COCINA");
    assert!(sends[0].1.starts_with(&[0x1B, 0x40]));
}

#[tokio::test]
async fn test_retry_ceiling_is_exact() {
    let store = store_with_order();
    store.insert_job(job("j1", "o1", JobType::Receipt, PrinterTarget::Cashier, 5));
    let transport = ScriptedTransport::new(Behavior::Fail);
    let dispatcher = Dispatcher::new(config(3), store.clone(), transport.clone());

    for expected in 1..=2 {
        dispatcher.poll_once().await.unwrap();
        let job = store.job("j1").unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempts, expected);
        assert!(job.error_message.is_none());
    }

    let report = dispatcher.poll_once().await.unwrap();
    assert_eq!(report.failed, 1);

    let job = store.job("j1").unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.attempts, 3);
    let message = job.error_message.unwrap();
    assert!(message.contains("direct: port busy"));
    assert!(message.contains("spooler: printer offline"));

    // Terminal: further cycles leave it alone
    let report = dispatcher.poll_once().await.unwrap();
    assert_eq!(report.listed, 0);
    assert_eq!(store.job("j1").unwrap().attempts, 3);
    assert_eq!(transport.sends().len(), 3);
}

#[tokio::test]
async fn test_single_attempt_ceiling() {
    let store = store_with_order();
    store.insert_job(job("j1", "o1", JobType::Kitchen, PrinterTarget::Kitchen, 5));
    let dispatcher = Dispatcher::new(config(1), store.clone(), ScriptedTransport::new(Behavior::Fail));

    dispatcher.poll_once().await.unwrap();

    let job = store.job("j1").unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.attempts, 1);
}

#[tokio::test]
async fn test_missing_order_fails_without_retry() {
    let store = Arc::new(MemoryJobStore::new());
    store.insert_job(job("j1", "ghost", JobType::Kitchen, PrinterTarget::Kitchen, 5));
    let transport = ScriptedTransport::new(Behavior::Print);
    let dispatcher = Dispatcher::new(config(3), store.clone(), transport.clone());

    let report = dispatcher.poll_once().await.unwrap();

    assert_eq!(report.failed, 1);
    let job = store.job("j1").unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.attempts, 1);
    assert_eq!(job.error_message.as_deref(), Some("Order ghost not found"));
    assert!(transport.sends().is_empty());
}

#[tokio::test]
async fn test_order_without_items_fails_without_retry() {
    let store = Arc::new(MemoryJobStore::new());
    store.insert_order(order("empty", Vec::new()));
    store.insert_job(job("j1", "empty", JobType::Receipt, PrinterTarget::Cashier, 5));
    let dispatcher = Dispatcher::new(config(3), store.clone(), ScriptedTransport::new(Behavior::Print));

    dispatcher.poll_once().await.unwrap();

    let job = store.job("j1").unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.error_message.as_deref(), Some("Order empty has no items"));
}

#[tokio::test]
async fn test_unknown_printer_is_retried() {
    let store = store_with_order();
    store.insert_job(job("j1", "o1", JobType::Kitchen, PrinterTarget::Kitchen, 5));
    let transport = ScriptedTransport::new(Behavior::Missing);
    let dispatcher = Dispatcher::new(config(3), store.clone(), transport.clone());

    let outcome = dispatcher.process(store.job("j1").unwrap()).await;

    assert!(matches!(outcome, JobOutcome::Retrying { attempts: 1, .. }));
    assert_eq!(store.job("j1").unwrap().status, JobStatus::Pending);
    assert!(transport.sends().is_empty());
}

#[tokio::test]
async fn test_store_outage_is_retried() {
    let store = store_with_order();
    store.insert_job(job("j1", "o1", JobType::Kitchen, PrinterTarget::Kitchen, 5));
    store.set_order_fetch_error(Some("connection reset"));
    let dispatcher = Dispatcher::new(config(3), store.clone(), ScriptedTransport::new(Behavior::Print));

    dispatcher.poll_once().await.unwrap();

    let job = store.job("j1").unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.attempts, 1);
}

// ========== Claims ==========

#[tokio::test]
async fn test_concurrent_claims_exactly_one_wins() {
    let store = store_with_order();
    store.insert_job(job("j1", "o1", JobType::Kitchen, PrinterTarget::Kitchen, 5));

    let listed = store.job("j1").unwrap();

    let (a, b) = tokio::join!(store.claim(&listed), store.claim(&listed));

    let won = [a.unwrap(), b.unwrap()].into_iter().flatten().count();
    assert_eq!(won, 1);
    assert_eq!(store.job("j1").unwrap().attempts, 1);
}

#[tokio::test]
async fn test_two_dispatchers_print_once() {
    let store = store_with_order();
    store.insert_job(job("j1", "o1", JobType::Kitchen, PrinterTarget::Kitchen, 5));
    let transport = ScriptedTransport::new(Behavior::Print);
    let first = Dispatcher::new(config(3), store.clone(), transport.clone());
    let second = Dispatcher::new(config(3), store.clone(), transport.clone());

    let (a, b) = tokio::join!(first.poll_once(), second.poll_once());

    assert_eq!(a.unwrap().printed + b.unwrap().printed, 1);
    assert_eq!(transport.sends().len(), 1);
    assert_eq!(store.job("j1").unwrap().attempts, 1);
}

#[tokio::test]
async fn test_claimed_job_is_skipped() {
    let store = store_with_order();
    store.insert_job(job("j1", "o1", JobType::Kitchen, PrinterTarget::Kitchen, 5));
    let listed = store.job("j1").unwrap();
    assert!(store.claim(&listed).await.unwrap().is_some());
    let transport = ScriptedTransport::new(Behavior::Print);
    let dispatcher = Dispatcher::new(config(3), store.clone(), transport.clone());

    assert_eq!(dispatcher.process(listed).await, JobOutcome::Skipped);
    assert!(transport.sends().is_empty());
    assert_eq!(store.job("j1").unwrap().status, JobStatus::Printing);
}

#[tokio::test]
async fn test_stale_listing_cannot_lower_attempts() {
    let store = store_with_order();
    store.insert_job(job("j1", "o1", JobType::Kitchen, PrinterTarget::Kitchen, 5));
    let listed = store.job("j1").unwrap();

    // Another agent works the job twice after our listing
    for _ in 0..2 {
        let current = store.job("j1").unwrap();
        let claimed = store.claim(&current).await.unwrap().unwrap();
        store.release("j1", claimed.attempts).await.unwrap();
    }
    assert_eq!(store.job("j1").unwrap().attempts, 2);

    let transport = ScriptedTransport::new(Behavior::Fail);
    let dispatcher = Dispatcher::new(config(3), store.clone(), transport.clone());

    assert_eq!(dispatcher.process(listed).await, JobOutcome::Skipped);
    let job = store.job("j1").unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.attempts, 2);
    assert!(transport.sends().is_empty());

    // The next cycle sees the real count and spends the last attempt
    let report = dispatcher.poll_once().await.unwrap();
    assert_eq!(report.failed, 1);
    let job = store.job("j1").unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.attempts, 3);
    assert_eq!(transport.sends().len(), 1);
}

#[tokio::test]
async fn test_crashed_attempts_count_toward_ceiling() {
    let store = store_with_order();
    store.insert_job(job("j1", "o1", JobType::Kitchen, PrinterTarget::Kitchen, 5));

    // Claimed three times, each claim abandoned and later reset
    for _ in 0..3 {
        let current = store.job("j1").unwrap();
        store.claim(&current).await.unwrap().unwrap();
        store
            .reset_stale_claims(Utc::now() + TimeDelta::seconds(1))
            .await
            .unwrap();
    }
    let job = store.job("j1").unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.attempts, 3);

    let transport = ScriptedTransport::new(Behavior::Print);
    let dispatcher = Dispatcher::new(config(3), store.clone(), transport.clone());
    let report = dispatcher.poll_once().await.unwrap();

    assert_eq!(report.failed, 1);
    let job = store.job("j1").unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.attempts, 3);
    assert!(job.error_message.unwrap().contains("Gave up after 3 attempts"));
    assert!(transport.sends().is_empty());
}

#[tokio::test]
async fn test_reset_job_is_not_overwritten() {
    struct ResettingTransport(Arc<MemoryJobStore>);

    #[async_trait]
    impl Transport for ResettingTransport {
        async fn exists(&self, _printer: &str) -> Result<bool, TransportError> {
            Ok(true)
        }

        async fn send(&self, _printer: &str, data: &[u8]) -> Result<Delivery, TransportError> {
            // Claim declared stale while the bytes were in flight
            let _ = self.0.reset_stale_claims(Utc::now() + TimeDelta::hours(1)).await;
            Ok(Delivery {
                strategy: "direct".to_string(),
                port: PortInfo::classify("COM1"),
                bytes: data.len(),
                earlier_failures: Vec::new(),
            })
        }
    }

    let store = store_with_order();
    store.insert_job(job("j1", "o1", JobType::Kitchen, PrinterTarget::Kitchen, 5));
    let dispatcher = Dispatcher::new(config(3), store.clone(), Arc::new(ResettingTransport(store.clone())));

    dispatcher.poll_once().await.unwrap();

    let job = store.job("j1").unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert!(job.printed_at.is_none());
}

// ========== Ordering ==========

#[tokio::test(start_paused = true)]
async fn test_targets_run_concurrently_but_each_in_order() {
    let store = store_with_order();
    store.insert_job(job("k1", "o1", JobType::Kitchen, PrinterTarget::Kitchen, 50));
    store.insert_job(job("c1", "o1", JobType::Receipt, PrinterTarget::Cashier, 40));
    store.insert_job(job("k2", "o1", JobType::Kitchen, PrinterTarget::Kitchen, 30));
    store.insert_job(job("c2", "o1", JobType::Payment, PrinterTarget::Cashier, 20));
    store.insert_job(job("k3", "o1", JobType::Kitchen, PrinterTarget::Kitchen, 10));
    let transport = ScriptedTransport::with_delay(Behavior::Print, Duration::from_millis(200));
    let dispatcher = Dispatcher::new(config(3), store.clone(), transport.clone());

    let report = dispatcher.poll_once().await.unwrap();

    assert_eq!(report.printed, 5);
    assert_eq!(*transport.max_per_printer.lock(), 1);
    assert_eq!(*transport.max_total.lock(), 2);

    let printed_at = |id: &str| store.job(id).unwrap().printed_at.unwrap();
    assert!(printed_at("k1") <= printed_at("k2"));
    assert!(printed_at("k2") <= printed_at("k3"));
    assert!(printed_at("c1") <= printed_at("c2"));
}

#[tokio::test]
async fn test_batch_size_bounds_a_cycle() {
    let store = store_with_order();
    for i in 0..5 {
        store.insert_job(job(&format!("j{}", i), "o1", JobType::Kitchen, PrinterTarget::Kitchen, 100 - i));
    }
    let mut cfg = AgentConfig::new("http://store.local", "key", "COCINA", "CAJA");
    cfg.poll_batch_size = 2;
    let dispatcher = Dispatcher::new(Arc::new(cfg), store.clone(), ScriptedTransport::new(Behavior::Print));

    let report = dispatcher.poll_once().await.unwrap();

    assert_eq!(report.listed, 2);
    assert_eq!(store.job("j0").unwrap().status, JobStatus::Printed);
    assert_eq!(store.job("j1").unwrap().status, JobStatus::Printed);
    assert_eq!(store.job("j2").unwrap().status, JobStatus::Pending);
}

// ========== Documents ==========

#[tokio::test]
async fn test_receipt_totals_in_sent_bytes() {
    let store = store_with_order();
    store.insert_job(job("j1", "o1", JobType::Receipt, PrinterTarget::Cashier, 5));
    let transport = ScriptedTransport::new(Behavior::Print);
    let dispatcher = Dispatcher::new(config(3), store.clone(), transport.clone());

    dispatcher.poll_once().await.unwrap();

    let (printer, bytes) = transport.sends().remove(0);
    assert_eq!(printer, "CAJA");
    // 1000 + 1200 at 19%: net and tax summed unrounded
    assert!(contains(&bytes, b"$1.849"));
    assert!(contains(&bytes, b"$351"));
    assert!(contains(&bytes, b"$2.200"));
}

#[tokio::test]
async fn test_malformed_customization_does_not_fail_job() {
    let store = Arc::new(MemoryJobStore::new());
    let mut broken = item("i1", "Churrasco", 1, 5900.0);
    broken.customization = Some(json!("{\"extras\": [\"Palta\", "));
    store.insert_order(order("o2", vec![broken]));
    store.insert_job(job("j1", "o2", JobType::Kitchen, PrinterTarget::Kitchen, 5));
    let transport = ScriptedTransport::new(Behavior::Print);
    let dispatcher = Dispatcher::new(config(3), store.clone(), transport.clone());

    dispatcher.poll_once().await.unwrap();

    assert_eq!(store.job("j1").unwrap().status, JobStatus::Printed);
    let (_, bytes) = transport.sends().remove(0);
    assert!(contains(&bytes, b"  * {\"extras\""));
}

// ========== Real transport fallback ==========

struct UsbSpooler {
    submitted: Mutex<Vec<Vec<u8>>>,
}

#[async_trait]
impl Spooler for UsbSpooler {
    async fn exists(&self, _name: &str) -> PrintResult<bool> {
        Ok(true)
    }

    async fn port_of(&self, _name: &str) -> PrintResult<Option<String>> {
        Ok(Some("USB001".to_string()))
    }

    async fn submit_raw(&self, _name: &str, file: &Path) -> PrintResult<()> {
        self.submitted.lock().push(std::fs::read(file)?);
        Ok(())
    }
}

/// First strategy that never answers
struct Stalled;

#[async_trait]
impl DeliveryStrategy for Stalled {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn deliver(&self, _ctx: DeliveryContext<'_>) -> PrintResult<()> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_fallback_success_hides_earlier_failure() {
    let store = store_with_order();
    store.insert_job(job("j1", "o1", JobType::Kitchen, PrinterTarget::Kitchen, 5));
    let spooler = Arc::new(UsbSpooler {
        submitted: Mutex::new(Vec::new()),
    });
    let strategies: Vec<Box<dyn DeliveryStrategy>> =
        vec![Box::new(Stalled), StrategyKind::Spooler.build(spooler.clone())];
    let transport =
        PrinterTransport::with_strategies(spooler.clone(), strategies, Duration::from_millis(500));
    let dispatcher = Dispatcher::new(config(3), store.clone(), Arc::new(transport));

    let report = dispatcher.poll_once().await.unwrap();

    assert_eq!(report.printed, 1);
    let job = store.job("j1").unwrap();
    assert_eq!(job.status, JobStatus::Printed);
    assert_eq!(job.attempts, 1);
    assert!(job.error_message.is_none());
    assert_eq!(spooler.submitted.lock().len(), 1);
}
