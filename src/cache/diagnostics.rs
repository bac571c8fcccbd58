//! Backend Diagnostics
//!
//! Step-by-step self test of the persistence backend: connectivity, write,
//! read, delete and summary counts. Stops at the first failing hard step.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::cache::CacheStore;

/// TTL of the probe row written during diagnostics.
pub const PROBE_TTL_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pass,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticCheck {
    pub name: &'static str,
    pub status: CheckStatus,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticsReport {
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub checks: Vec<DiagnosticCheck>,
}

impl DiagnosticsReport {
    fn pass(&mut self, name: &'static str, message: impl Into<String>) {
        self.checks.push(DiagnosticCheck {
            name,
            status: CheckStatus::Pass,
            message: message.into(),
        });
    }

    fn fail(&mut self, name: &'static str, message: impl Into<String>) {
        self.success = false;
        self.checks.push(DiagnosticCheck {
            name,
            status: CheckStatus::Fail,
            message: message.into(),
        });
    }
}

/// Runs the self test against `store`'s backend.
pub async fn run_diagnostics(store: &CacheStore, namespace_prefix: &str) -> DiagnosticsReport {
    let now = Utc::now();
    let mut report = DiagnosticsReport {
        timestamp: now,
        success: true,
        checks: Vec::new(),
    };

    if let Err(e) = store.ping().await {
        report.fail("connectivity", e.to_string());
        warn!("Cache diagnostics: backend unreachable: {}", e);
        return report;
    }
    report.pass("connectivity", "backend reachable");

    let probe_key = format!("test:{}", now.timestamp_millis());
    let probe_value = json!({ "test": true, "timestamp": now });

    if let Err(e) = store.set(&probe_key, probe_value.clone(), Some(PROBE_TTL_SECS)).await {
        report.fail("write", e.to_string());
        return report;
    }
    report.pass("write", format!("wrote {}", probe_key));

    match store.get(&probe_key).await.into_value() {
        Some(value) if value == probe_value => report.pass("read", "probe value read back"),
        Some(_) => {
            report.fail("read", "probe value differs from what was written");
            store.delete(&probe_key).await;
            return report;
        }
        None => {
            report.fail("read", "probe key not found after write");
            return report;
        }
    }

    match store.backend().delete(&probe_key).await {
        Ok(true) => report.pass("delete", "probe key removed"),
        Ok(false) => {
            report.fail("delete", "probe key was already gone");
            return report;
        }
        Err(e) => {
            report.fail("delete", e.to_string());
            return report;
        }
    }

    // Counts are informational: a failure is reported but does not fail the run.
    match store.summary(namespace_prefix, Utc::now()).await {
        Ok(summary) => report.pass(
            "summary",
            format!(
                "total: {}, valid: {}, {}: {}",
                summary.total, summary.valid, namespace_prefix, summary.namespace
            ),
        ),
        Err(e) => report.checks.push(DiagnosticCheck {
            name: "summary",
            status: CheckStatus::Fail,
            message: e.to_string(),
        }),
    }

    info!("Cache diagnostics completed: success={}", report.success);
    report
}
