//! JSON-RPC server over Unix socket.
//!
//! Listens on a Unix domain socket, accepts connections, and dispatches
//! JSON-RPC method calls to the appropriate command handlers. Trigger and
//! override methods are elevated: they require the admin token in their
//! params.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tracing::{debug, error, info, warn};

use crate::commands;
use crate::DaemonState;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Method name.
    pub method: String,
    /// Parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC response.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    /// JSON-RPC version.
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Result or error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RpcError {
    /// Error code.
    pub code: i32,
    /// Error name.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcResponse {
    /// Create a success response.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

impl RpcError {
    /// Parse error (-32700).
    pub fn parse_error() -> Self {
        Self {
            code: -32700,
            message: "PARSE_ERROR".to_string(),
            data: None,
        }
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: "METHOD_NOT_FOUND".to_string(),
            data: Some(serde_json::json!({"method": method})),
        }
    }

    /// Invalid params (-32602).
    pub fn invalid_params(detail: &str) -> Self {
        Self {
            code: -32602,
            message: "INVALID_PARAMS".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    /// Internal error (-32603).
    pub fn internal_error(detail: &str) -> Self {
        Self {
            code: -32603,
            message: "INTERNAL_ERROR".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    /// Elevated method without a valid admin token (-32001).
    pub fn unauthorized() -> Self {
        Self {
            code: -32001,
            message: "UNAUTHORIZED".to_string(),
            data: None,
        }
    }

    /// Referenced entity does not exist (-32004).
    pub fn not_found(detail: &str) -> Self {
        Self {
            code: -32004,
            message: "NOT_FOUND".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }
}

/// The RPC server.
pub struct RpcServer {
    state: Arc<DaemonState>,
    socket_path: PathBuf,
}

impl RpcServer {
    /// Create a new RPC server.
    pub fn new(state: Arc<DaemonState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) -> anyhow::Result<()> {
        // Remove stale socket file
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        info!("RPC server listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(state, stream).await {
                            warn!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Handle a single client connection.
async fn handle_connection(
    state: Arc<DaemonState>,
    stream: tokio::net::UnixStream,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break; // EOF
        }

        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) => dispatch_request(state.clone(), request).await,
            Err(_) => RpcResponse::error(serde_json::Value::Null, RpcError::parse_error()),
        };

        let mut response_json = serde_json::to_string(&response)?;
        response_json.push('\n');
        writer.write_all(response_json.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}

/// Methods that require the admin token.
fn is_elevated(method: &str) -> bool {
    matches!(
        method,
        "trigger_distribution"
            | "trigger_priority_promotion"
            | "trigger_infra_payment"
            | "process_payout"
            | "run_payouts"
            | "confirm_manual_invoice"
            | "get_pending_invoices"
            | "reverse_transaction"
            | "set_creator_tier"
            | "set_priority_override"
            | "clear_priority_override"
            | "set_min_payout"
            | "export_audit_log"
    )
}

/// Dispatch a JSON-RPC request to the appropriate command handler.
async fn dispatch_request(state: Arc<DaemonState>, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    let method = request.method.as_str();

    debug!("Dispatching RPC method: {}", method);

    if is_elevated(method) {
        let token = request
            .params
            .get("admin_token")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        if token != state.admin_token {
            return RpcResponse::error(id, RpcError::unauthorized());
        }
    }

    let result = match method {
        // Ledger
        "get_account_summary" => commands::ledger::get_account_summary(&state, &request.params).await,
        "get_transactions" => commands::ledger::get_transactions(&state, &request.params).await,
        "ingest_stream_events" => {
            commands::ledger::ingest_stream_events(&state, &request.params).await
        }
        "webhook_tip" => commands::ledger::webhook_tip(&state, &request.params).await,
        "reverse_transaction" => {
            commands::ledger::reverse_transaction(&state, &request.params).await
        }
        "set_min_payout" => commands::ledger::set_min_payout(&state, &request.params).await,

        // Treasury
        "report_revenue" => commands::treasury::report_revenue(&state, &request.params).await,
        "get_fund_balances" => commands::treasury::get_fund_balances(&state, &request.params).await,
        "trigger_distribution" => {
            commands::treasury::trigger_distribution(&state, &request.params).await
        }

        // Payouts
        "get_payout_history" => commands::payout::get_payout_history(&state, &request.params).await,
        "process_payout" => commands::payout::process_payout(&state, &request.params).await,
        "run_payouts" => commands::payout::run_payouts(&state).await,
        "confirm_manual_invoice" => {
            commands::payout::confirm_manual_invoice(&state, &request.params).await
        }
        "get_pending_invoices" => commands::payout::get_pending_invoices(&state).await,
        "webhook_payout_status" => {
            commands::payout::webhook_payout_status(&state, &request.params).await
        }

        // Operations
        "trigger_priority_promotion" => commands::ops::trigger_priority_promotion(&state).await,
        "trigger_infra_payment" => commands::ops::trigger_infra_payment(&state).await,
        "get_job_status" => commands::ops::get_job_status(&state, &request.params).await,
        "export_audit_log" => commands::ops::export_audit_log(&state, &request.params).await,
        "report_creator_metrics" => {
            commands::ops::report_creator_metrics(&state, &request.params).await
        }
        "upsert_payout_profile" => {
            commands::ops::upsert_payout_profile(&state, &request.params).await
        }
        "set_creator_tier" => commands::ops::set_creator_tier(&state, &request.params).await,
        "set_priority_override" => {
            commands::ops::set_priority_override(&state, &request.params).await
        }
        "clear_priority_override" => {
            commands::ops::clear_priority_override(&state, &request.params).await
        }

        _ => Err(RpcError::method_not_found(method)),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::error(id, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_error_codes() {
        let err = RpcError::unauthorized();
        assert_eq!(err.code, -32001);
        assert_eq!(err.message, "UNAUTHORIZED");

        let err = RpcError::method_not_found("unknown");
        assert_eq!(err.code, -32601);

        let err = RpcError::not_found("payout 9");
        assert_eq!(err.code, -32004);
    }

    #[test]
    fn test_rpc_response_success() {
        let resp = RpcResponse::success(
            serde_json::json!(1),
            serde_json::json!({"balance": 1000}),
        );
        assert!(resp.result.is_some());
        assert!(resp.error.is_none());
    }

    #[test]
    fn test_rpc_response_error() {
        let resp = RpcResponse::error(
            serde_json::json!(1),
            RpcError::internal_error("test"),
        );
        assert!(resp.result.is_none());
        assert!(resp.error.is_some());
    }

    #[test]
    fn test_elevated_method_list() {
        assert!(is_elevated("trigger_distribution"));
        assert!(is_elevated("reverse_transaction"));
        assert!(!is_elevated("get_account_summary"));
        assert!(!is_elevated("webhook_tip"));
    }
}
