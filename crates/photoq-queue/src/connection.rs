//! Managed broker connection.

use std::future::Future;

use redis::aio::MultiplexedConnection;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::{QueueError, QueueResult};
use crate::retry::{run_with_retry, RetryPolicy};

/// Owns the client/connection pair to the broker.
///
/// The live connection handle is replaced atomically on reconnect. All
/// swaps serialize on the inner mutex, so a partial teardown can never
/// interleave with a partial rebuild; in-flight operations keep their
/// cloned handle and fail on their own, to be retried with a fresh one.
pub struct ManagedConnection {
    client: redis::Client,
    conn: Mutex<MultiplexedConnection>,
    policy: RetryPolicy,
}

impl ManagedConnection {
    /// Open the transport and the initial connection.
    ///
    /// Fails immediately if the URL is malformed or the broker is
    /// unreachable; establishment itself is never retried.
    pub async fn connect(url: &str, policy: RetryPolicy) -> QueueResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| QueueError::connection_failed(format!("invalid broker URL: {e}")))?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!("connected to broker");

        Ok(Self {
            client,
            conn: Mutex::new(conn),
            policy,
        })
    }

    /// Clone the current live handle for a single operation.
    pub async fn handle(&self) -> MultiplexedConnection {
        self.conn.lock().await.clone()
    }

    /// Drop the existing connection and establish a fresh one.
    ///
    /// Safe to call repeatedly. The old handle is discarded regardless of
    /// its state (dropping it is the close), and the swap happens under
    /// the lock.
    pub async fn reconnect(&self) -> QueueResult<()> {
        let mut slot = self.conn.lock().await;
        let fresh = self.client.get_multiplexed_async_connection().await?;
        *slot = fresh;
        info!("reconnected to broker");
        Ok(())
    }

    /// Run a broker operation through the bounded retry/reconnect primitive.
    pub async fn execute_with_retry<T, Op, Fut>(&self, operation: &str, op: Op) -> QueueResult<T>
    where
        Op: Fn(MultiplexedConnection) -> Fut,
        Fut: Future<Output = QueueResult<T>>,
    {
        run_with_retry(
            &self.policy,
            operation,
            || async { op(self.handle().await).await },
            || async { self.reconnect().await },
        )
        .await
    }
}
