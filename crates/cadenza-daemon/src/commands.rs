//! RPC command handlers.
//!
//! Each submodule implements the commands for one category.

pub mod ledger;
pub mod ops;
pub mod payout;
pub mod treasury;

use cadenza_db::DbError;
use cadenza_payout::PayoutError;

use crate::rpc::RpcError;

/// Map a storage error onto the RPC error space.
pub(crate) fn db_err(err: DbError) -> RpcError {
    match err {
        DbError::NotFound(detail) => RpcError::not_found(&detail),
        DbError::Validation(detail) => RpcError::invalid_params(&detail),
        other => RpcError::internal_error(&other.to_string()),
    }
}

/// Map a payout error onto the RPC error space.
pub(crate) fn payout_err(err: PayoutError) -> RpcError {
    match err {
        PayoutError::Storage(inner) => db_err(inner),
        PayoutError::NotPendingInvoice(id) => {
            RpcError::invalid_params(&format!("payout {id} is not a pending manual invoice"))
        }
        other => RpcError::internal_error(&other.to_string()),
    }
}
