use std::future::Future;

use anyhow::Result;

/// Serialization failure (40001) or deadlock (40P01) anywhere in the chain.
pub fn is_transient(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| match cause.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db_err)) => {
            matches!(db_err.code().as_deref(), Some("40001") | Some("40P01"))
        }
        _ => false,
    })
}

/// Run `op` and, on a transient storage failure, run it exactly once more.
/// `op` must be a whole transaction so the failed attempt left nothing behind.
pub async fn with_retry<T, F, Fut>(name: &'static str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match op().await {
        Err(e) if is_transient(&e) => {
            tracing::warn!(op = name, error = %e, "transient storage failure; retrying once");
            op().await
        }
        other => other,
    }
}
