use std::sync::{Arc, mpsc};

use futures::future::BoxFuture;
use log::{info, warn};
use sweep_core::bitcoin::Amount;
use sweep_core::{ChainIndexer, KeyScanner, ScanParams, SweepPlan, Utxo, build_sweep, parse_key};

use crate::pool::WorkerPool;
use crate::report::ReportSinks;

/// Pool width: one secret is processed end-to-end per worker task.
const DEFAULT_WORKERS: usize = 12;

/// Wallet-level knobs around the core scan context.
#[derive(Debug, Clone)]
pub struct SweepOptions {
    /// Extra secret needed to decode passphrase-protected mnemonics.
    pub passphrase: String,
    pub scan: ScanParams,
    /// Where discovered funds get swept; empty skips sweep construction.
    pub destinations: Vec<String>,
    pub workers: usize,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            passphrase: String::new(),
            scan: ScanParams::default(),
            destinations: Vec::new(),
            workers: DEFAULT_WORKERS,
        }
    }
}

/// What one secret produced; routed to a sink by balance.
struct SecretOutcome {
    utxos: Vec<Utxo>,
    balance: Amount,
    sweep: Option<sweep_core::Result<SweepPlan>>,
}

/// Batch orchestrator: scans every secret on a bounded worker pool.
///
/// Each task owns a private protocol connection (via the connector) and a
/// private current-thread async context; the only shared state is the two
/// result sinks. A failure in one secret never affects another, and
/// nothing is retried. There is no per-connection deadline yet, so a
/// stalled server stalls its worker.
pub struct SweepRunner<F> {
    connect: Arc<F>,
    options: SweepOptions,
}

impl<F> SweepRunner<F> {
    pub fn new(connect: F, options: SweepOptions) -> Self {
        Self {
            connect: Arc::new(connect),
            options,
        }
    }

    /// Process `secrets`, writing exactly one record per secret into
    /// exactly one sink, in completion order.
    pub fn run<C>(&self, secrets: Vec<String>, sinks: Arc<ReportSinks>)
    where
        C: ChainIndexer + 'static,
        F: Fn() -> BoxFuture<'static, anyhow::Result<C>> + Send + Sync + 'static,
    {
        let total = secrets.len();
        let pool = WorkerPool::new(self.options.workers.max(1));
        let (done_tx, done_rx) = mpsc::channel::<()>();

        for secret in secrets {
            let connect = Arc::clone(&self.connect);
            let options = self.options.clone();
            let sinks = Arc::clone(&sinks);
            let done = done_tx.clone();
            pool.spawn(move || {
                let outcome = process_secret(&secret, connect.as_ref(), &options);
                report_outcome(&secret, outcome, &sinks);
                let _ = done.send(());
            });
        }
        drop(done_tx);

        for finished in 1..=total {
            if done_rx.recv().is_err() {
                break;
            }
            info!("processed {finished} of {total} secrets");
        }
        pool.join();
    }
}

fn process_secret<C, F>(
    secret: &str,
    connect: &F,
    options: &SweepOptions,
) -> sweep_core::Result<SecretOutcome>
where
    C: ChainIndexer + 'static,
    F: Fn() -> BoxFuture<'static, anyhow::Result<C>>,
{
    let master = parse_key(secret, &options.passphrase)?;

    // private single-threaded async context; suspension points are
    // network awaits only
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| sweep_core::Error::Indexer(Box::new(error)))?;
    let utxos = runtime.block_on(async {
        let client = connect()
            .await
            .map_err(|error| sweep_core::Error::Indexer(error.into()))?;
        KeyScanner::new(&client, &master, options.scan).scan().await
    })?;

    let balance: Amount = utxos.iter().map(|utxo| utxo.amount).sum();
    let sweep = (balance > Amount::ZERO && !options.destinations.is_empty())
        .then(|| build_sweep(&master, &utxos, &options.destinations, balance));

    Ok(SecretOutcome {
        utxos,
        balance,
        sweep,
    })
}

fn report_outcome(secret: &str, outcome: sweep_core::Result<SecretOutcome>, sinks: &ReportSinks) {
    let (record, sink) = match outcome {
        Ok(outcome) => {
            let sink = if outcome.balance > Amount::ZERO {
                &sinks.positive
            } else {
                &sinks.zero
            };
            (success_record(secret, &outcome), sink)
        }
        Err(error) => (format!("Secret: {secret}\nError: {error}"), &sinks.zero),
    };
    if let Err(error) = sink.append(&record) {
        warn!("failed to write a result record: {error}");
    }
}

fn success_record(secret: &str, outcome: &SecretOutcome) -> String {
    let mut record = format!("Secret: {secret}\n");

    let mut addresses: Vec<&str> = outcome
        .utxos
        .iter()
        .map(|utxo| utxo.address.as_str())
        .collect();
    addresses.sort_unstable();
    addresses.dedup();
    if addresses.is_empty() {
        record.push_str("Address: (not found)\n");
    } else {
        for address in addresses {
            record.push_str(&format!("Address: {address}\n"));
        }
    }

    record.push_str(&format!("Balance: {} sats\n", outcome.balance.to_sat()));

    if outcome.utxos.is_empty() {
        record.push_str("UTXOs: (none)");
    } else {
        record.push_str("UTXOs:");
        for utxo in &outcome.utxos {
            record.push_str(&format!(
                "\n  {} {} sats {}",
                utxo.outpoint,
                utxo.amount.to_sat(),
                utxo.path
            ));
        }
    }

    match &outcome.sweep {
        Some(Ok(plan)) => record.push_str(&format!(
            "\nSweep: {} inputs -> {} outputs, signed",
            plan.inputs.len(),
            plan.outputs.len()
        )),
        Some(Err(error)) => record.push_str(&format!("\nSweep error: {error}")),
        None => {}
    }

    record
}

/// Connector opening one plain-TCP Electrum connection per secret.
#[cfg(feature = "backend-electrum")]
pub fn electrum_connector(
    host: impl Into<String>,
    port: u16,
) -> impl Fn() -> BoxFuture<'static, anyhow::Result<backend_electrum::ElectrumClient<tokio::net::TcpStream>>>
+ Send
+ Sync
+ 'static {
    let host = host.into();
    move || {
        let host = host.clone();
        let connect = async move { backend_electrum::ElectrumClient::connect(&host, port).await };
        Box::pin(connect) as BoxFuture<'static, _>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::str::FromStr;
    use sweep_core::bitcoin::bip32::DerivationPath;
    use sweep_core::bitcoin::hashes::Hash;
    use sweep_core::bitcoin::secp256k1::{Secp256k1, SecretKey};
    use sweep_core::bitcoin::{
        Address, CompressedPublicKey, Network, OutPoint, Script, ScriptBuf, Txid,
    };
    use sweep_core::{HistoryEntry, MasterKey, ScriptType, UnspentEntry};

    const FUNDED: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
    const EMPTY: &str =
        "zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo wrong";

    #[derive(Clone, Default)]
    struct MockIndexer {
        funded: Arc<HashMap<Vec<u8>, UnspentEntry>>,
    }

    #[async_trait::async_trait]
    impl ChainIndexer for MockIndexer {
        async fn script_history(
            &self,
            script: &Script,
        ) -> sweep_core::Result<Vec<HistoryEntry>> {
            Ok(self
                .funded
                .get(script.as_bytes())
                .map(|entry| {
                    vec![HistoryEntry {
                        txid: entry.outpoint.txid,
                        height: entry.height as i32,
                    }]
                })
                .unwrap_or_default())
        }

        async fn script_history_batch(
            &self,
            scripts: &[ScriptBuf],
        ) -> sweep_core::Result<Vec<Vec<HistoryEntry>>> {
            let mut replies = Vec::with_capacity(scripts.len());
            for script in scripts {
                replies.push(self.script_history(script).await?);
            }
            Ok(replies)
        }

        async fn script_unspent(
            &self,
            script: &Script,
        ) -> sweep_core::Result<Vec<UnspentEntry>> {
            Ok(self
                .funded
                .get(script.as_bytes())
                .cloned()
                .map(|entry| vec![entry])
                .unwrap_or_default())
        }

        async fn script_unspent_batch(
            &self,
            scripts: &[ScriptBuf],
        ) -> sweep_core::Result<Vec<Vec<UnspentEntry>>> {
            let mut replies = Vec::with_capacity(scripts.len());
            for script in scripts {
                replies.push(self.script_unspent(script).await?);
            }
            Ok(replies)
        }
    }

    fn funded_indexer() -> MockIndexer {
        let master = parse_key(FUNDED, "").unwrap();
        let secp = Secp256k1::new();
        let path = DerivationPath::from_str("m/84'/0'/0'/0/0").unwrap();
        let pubkey = master.public_key_at(&secp, &path).unwrap();
        let script = ScriptType::Segwit.build_output_script(&pubkey);

        let mut funded = HashMap::new();
        funded.insert(
            script.as_bytes().to_vec(),
            UnspentEntry {
                outpoint: OutPoint {
                    txid: Txid::from_byte_array([0x42; 32]),
                    vout: 0,
                },
                value: Amount::from_sat(100_000),
                height: 800_000,
            },
        );
        MockIndexer {
            funded: Arc::new(funded),
        }
    }

    fn destination() -> String {
        let secp = Secp256k1::new();
        let secret = SecretKey::from_slice(&[0x44; 32]).unwrap();
        let compressed = CompressedPublicKey(secret.public_key(&secp));
        Address::p2wpkh(&compressed, Network::Bitcoin).to_string()
    }

    fn options() -> SweepOptions {
        SweepOptions {
            passphrase: String::new(),
            scan: ScanParams {
                address_gap: 2,
                account_gap: 0,
                should_batch: true,
            },
            destinations: vec![destination()],
            workers: 4,
        }
    }

    #[test]
    fn every_secret_lands_in_exactly_one_sink() {
        let dir = tempfile::tempdir().unwrap();
        let sinks = Arc::new(ReportSinks::create(dir.path().join("results")).unwrap());

        let indexer = funded_indexer();
        let runner = SweepRunner::new(
            move || {
                let indexer = indexer.clone();
                Box::pin(async move { Ok(indexer) }) as BoxFuture<'static, anyhow::Result<MockIndexer>>
            },
            options(),
        );

        runner.run(
            vec![
                FUNDED.to_string(),
                EMPTY.to_string(),
                "garbage".to_string(),
            ],
            Arc::clone(&sinks),
        );

        let positive = std::fs::read_to_string(sinks.positive.path()).unwrap();
        let zero = std::fs::read_to_string(sinks.zero.path()).unwrap();

        assert!(positive.contains(&format!("Secret: {FUNDED}")));
        assert!(positive.contains("Balance: 100000 sats"));
        assert!(positive.contains("Sweep: 1 inputs -> 1 outputs, signed"));
        assert!(!positive.contains("garbage"));

        assert!(zero.contains(&format!("Secret: {EMPTY}")));
        assert!(zero.contains("Balance: 0 sats"));
        assert!(zero.contains("Secret: garbage\nError: "));
    }

    #[test]
    fn hardened_derivation_on_an_xpub_fails_cleanly() {
        let master = parse_key(FUNDED, "").unwrap();
        let MasterKey::Private(xprv) = master else {
            panic!("expected a private master");
        };
        let secp = Secp256k1::new();
        let xpub = sweep_core::bitcoin::bip32::Xpub::from_priv(&secp, &xprv).to_string();

        let dir = tempfile::tempdir().unwrap();
        let sinks = Arc::new(ReportSinks::create(dir.path().join("results")).unwrap());

        let indexer = MockIndexer::default();
        let runner = SweepRunner::new(
            move || {
                let indexer = indexer.clone();
                Box::pin(async move { Ok(indexer) }) as BoxFuture<'static, anyhow::Result<MockIndexer>>
            },
            options(),
        );
        runner.run(vec![xpub.clone()], Arc::clone(&sinks));

        // hardened derivation fails on an xpub, surfacing as an error record
        let zero = std::fs::read_to_string(sinks.zero.path()).unwrap();
        assert!(zero.contains(&format!("Secret: {xpub}\nError: ")));
    }

    #[test]
    fn connector_failures_become_error_records() {
        let dir = tempfile::tempdir().unwrap();
        let sinks = Arc::new(ReportSinks::create(dir.path().join("results")).unwrap());

        let runner = SweepRunner::new(
            || {
                Box::pin(async { anyhow::bail!("no server reachable") })
                    as BoxFuture<'static, anyhow::Result<MockIndexer>>
            },
            options(),
        );
        runner.run(vec![FUNDED.to_string()], Arc::clone(&sinks));

        let zero = std::fs::read_to_string(sinks.zero.path()).unwrap();
        assert!(zero.contains("Error: no server reachable"));
        assert_eq!(std::fs::read_to_string(sinks.positive.path()).unwrap(), "");
    }
}
