//! Bridges the WAL to the audit receiver over HTTP: the writer the gateway
//! hands to `nv_wal::Wal::set_writer`.

use std::future::Future;
use std::pin::Pin;

use nv_contract::{AuditBatch, AuditEntry, CONTRACT_HEADER, AUDIT_ENTRIES_CONTRACT_ID};
use nv_wal::{AuditWriter, ItemOutcome, WalLine, WriteReport};

pub struct HttpAuditWriter {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAuditWriter {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into() }
    }
}

impl AuditWriter for HttpAuditWriter {
    fn write_batch<'a>(
        &'a self,
        batch: &'a [WalLine],
    ) -> Pin<Box<dyn Future<Output = Result<WriteReport, (String, String)>> + Send + 'a>> {
        Box::pin(async move {
            let entries: Result<Vec<AuditEntry>, _> =
                batch.iter().map(|line| serde_json::from_value(line.blob.clone())).collect();
            let entries = entries.map_err(|e| ("AUDIT_BLOB_INVALID".to_string(), e.to_string()))?;
            let body = AuditBatch { entries };

            let response = self
                .http
                .post(format!("{}/entries", self.base_url.trim_end_matches('/')))
                .header(CONTRACT_HEADER, AUDIT_ENTRIES_CONTRACT_ID)
                .json(&body)
                .send()
                .await
                .map_err(|e| ("connection_refused".to_string(), e.to_string()))?;

            if response.status().is_success() {
                let outcomes = batch.iter().map(|_| ItemOutcome::Accepted).collect();
                Ok(WriteReport { outcomes })
            } else {
                let status = response.status();
                let problem: serde_json::Value = response.json().await.unwrap_or_default();
                let code = problem.get("title").and_then(|v| v.as_str()).unwrap_or("WAL_PERSIST_FAILED").to_string();
                let detail = problem.get("detail").and_then(|v| v.as_str()).unwrap_or_default().to_string();
                Err((code, format!("receiver responded {status}: {detail}")))
            }
        })
    }
}
