use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result, bail};
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use sweep_core::bitcoin::Script;
use sweep_core::bitcoin::hashes::{Hash, sha256};
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf,
};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::api_structs::{GetHistoryResult, ListUnspentResult};

const PROTOCOL_VERSION: &str = "1.4";
const CLIENT_NAME: &str = "sweep-wallet 0.1";

/// JSON-RPC connection to an Electrum server over any byte stream.
///
/// One connection serves one scan worker, so requests are serialized over
/// the socket. Batch replies are matched back to their requests by id, so
/// the caller always sees request order even when the server answers out
/// of order.
pub struct ElectrumClient<S> {
    connection: Mutex<Connection<S>>,
    next_id: AtomicU64,
}

struct Connection<S> {
    reader: BufReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
}

impl ElectrumClient<TcpStream> {
    /// Connect over plain TCP and perform the `server.version` handshake.
    ///
    /// TLS or proxy transports are established by the caller and handed to
    /// [`ElectrumClient::from_stream`] instead.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port))
            .await
            .with_context(|| format!("connecting to electrum server {host}:{port}"))?;
        Self::from_stream(stream).await
    }
}

impl<S: AsyncRead + AsyncWrite + Send + 'static> ElectrumClient<S> {
    /// Wrap an established transport and perform the protocol handshake.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let (reader, writer) = tokio::io::split(stream);
        let client = Self {
            connection: Mutex::new(Connection {
                reader: BufReader::new(reader),
                writer,
            }),
            next_id: AtomicU64::new(0),
        };
        let version: Value = client
            .call("server.version", json!([CLIENT_NAME, PROTOCOL_VERSION]))
            .await?;
        debug!("connected to electrum server: {version}");
        Ok(client)
    }

    /// Transaction history of one script.
    pub async fn get_history(&self, script: &Script) -> Result<Vec<GetHistoryResult>> {
        self.call(
            "blockchain.scripthash.get_history",
            json!([script_hash_hex(script)]),
        )
        .await
    }

    /// Transaction histories of several scripts in one batched request.
    pub async fn get_history_batch(
        &self,
        scripts: impl IntoIterator<Item = &Script>,
    ) -> Result<Vec<Vec<GetHistoryResult>>> {
        let params = scripts
            .into_iter()
            .map(|script| json!([script_hash_hex(script)]))
            .collect();
        self.call_batch("blockchain.scripthash.get_history", params)
            .await
    }

    /// Unspent outputs locked to one script.
    pub async fn listunspent(&self, script: &Script) -> Result<Vec<ListUnspentResult>> {
        self.call(
            "blockchain.scripthash.listunspent",
            json!([script_hash_hex(script)]),
        )
        .await
    }

    /// Unspent outputs of several scripts in one batched request.
    pub async fn listunspent_batch(
        &self,
        scripts: impl IntoIterator<Item = &Script>,
    ) -> Result<Vec<Vec<ListUnspentResult>>> {
        let params = scripts
            .into_iter()
            .map(|script| json!([script_hash_hex(script)]))
            .collect();
        self.call_batch("blockchain.scripthash.listunspent", params)
            .await
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});

        let mut connection = self.connection.lock().await;
        connection.send_line(&request).await?;
        let reply = connection.read_reply().await?;
        parse_reply(reply, id)
    }

    /// Send one JSON-RPC batch; results come back in the order of `params`
    /// regardless of the order the server answered in.
    async fn call_batch<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Vec<T>> {
        if params.is_empty() {
            return Ok(Vec::new());
        }
        let count = params.len();
        let first_id = self.next_id.fetch_add(count as u64, Ordering::Relaxed);
        let requests: Vec<Value> = params
            .into_iter()
            .enumerate()
            .map(|(offset, params)| {
                let id = first_id + offset as u64;
                json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
            })
            .collect();

        let mut connection = self.connection.lock().await;
        connection.send_line(&Value::Array(requests)).await?;
        let reply = connection.read_reply().await?;
        drop(connection);

        let Value::Array(replies) = reply else {
            bail!("expected a batched reply, got a single object");
        };
        if replies.len() != count {
            bail!("batched reply has {} entries, expected {count}", replies.len());
        }

        let mut by_id = HashMap::with_capacity(count);
        for reply in replies {
            let id = reply
                .get("id")
                .and_then(Value::as_u64)
                .context("batched reply entry without a numeric id")?;
            by_id.insert(id, reply);
        }
        (0..count as u64)
            .map(|offset| {
                let id = first_id + offset;
                let reply = by_id
                    .remove(&id)
                    .with_context(|| format!("no reply for batched request {id}"))?;
                parse_reply(reply, id)
            })
            .collect()
    }
}

impl<S: AsyncRead + AsyncWrite> Connection<S> {
    async fn send_line(&mut self, payload: &Value) -> Result<()> {
        let mut line = serde_json::to_vec(payload)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn read_reply(&mut self) -> Result<Value> {
        let mut line = String::new();
        loop {
            line.clear();
            let read = self.reader.read_line(&mut line).await?;
            if read == 0 {
                bail!("server closed the connection");
            }
            let value: Value = serde_json::from_str(line.trim_end())?;
            // subscription pushes carry a method and no id; skip them
            if value.get("method").is_some() && value.get("id").is_none() {
                continue;
            }
            return Ok(value);
        }
    }
}

fn parse_reply<T: DeserializeOwned>(reply: Value, id: u64) -> Result<T> {
    let Value::Object(mut reply) = reply else {
        bail!("malformed reply: {reply}");
    };
    match reply.get("id").and_then(Value::as_u64) {
        Some(got) if got == id => {}
        _ => bail!("reply id does not match request {id}"),
    }
    if let Some(error) = reply.get("error") {
        if !error.is_null() {
            bail!("server error: {error}");
        }
    }
    let result = reply.remove("result").context("reply without a result")?;
    Ok(serde_json::from_value(result)?)
}

/// Electrum keys scripts by the byte-reversed SHA256 of the raw script,
/// rendered as hex.
pub fn script_hash_hex(script: &Script) -> String {
    let mut hash = sha256::Hash::hash(script.as_bytes()).to_byte_array();
    hash.reverse();
    hex::encode(hash)
}
