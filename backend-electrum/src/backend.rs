use async_trait::async_trait;
use sweep_core::bitcoin::{Script, ScriptBuf};
use sweep_core::{ChainIndexer, Error, HistoryEntry, UnspentEntry};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::ElectrumClient;

fn indexer_err(error: anyhow::Error) -> Error {
    Error::Indexer(error.into())
}

#[async_trait]
impl<S: AsyncRead + AsyncWrite + Send + 'static> ChainIndexer for ElectrumClient<S> {
    async fn script_history(&self, script: &Script) -> sweep_core::Result<Vec<HistoryEntry>> {
        let entries = self.get_history(script).await.map_err(indexer_err)?;
        Ok(entries.into_iter().map(Into::into).collect())
    }

    async fn script_history_batch(
        &self,
        scripts: &[ScriptBuf],
    ) -> sweep_core::Result<Vec<Vec<HistoryEntry>>> {
        let replies = self
            .get_history_batch(scripts.iter().map(ScriptBuf::as_script))
            .await
            .map_err(indexer_err)?;
        Ok(replies
            .into_iter()
            .map(|entries| entries.into_iter().map(Into::into).collect())
            .collect())
    }

    async fn script_unspent(&self, script: &Script) -> sweep_core::Result<Vec<UnspentEntry>> {
        let entries = self.listunspent(script).await.map_err(indexer_err)?;
        Ok(entries.into_iter().map(Into::into).collect())
    }

    async fn script_unspent_batch(
        &self,
        scripts: &[ScriptBuf],
    ) -> sweep_core::Result<Vec<Vec<UnspentEntry>>> {
        let replies = self
            .listunspent_batch(scripts.iter().map(ScriptBuf::as_script))
            .await
            .map_err(indexer_err)?;
        Ok(replies
            .into_iter()
            .map(|entries| entries.into_iter().map(Into::into).collect())
            .collect())
    }
}
