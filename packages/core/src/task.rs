//! Single-tick deferral.
//!
//! Every asynchronous entry point defers once before computing, so a
//! result is never delivered during the poll that started the operation.
//! Combined with futures being inert until polled, this preserves the
//! contract that completion never fires inside the call that registered it.

/// Yields to the scheduler exactly once.
pub async fn defer() {
    tokio::task::yield_now().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn defer_completes() {
        defer().await;
    }
}
