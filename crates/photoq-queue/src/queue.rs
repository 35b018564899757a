//! Durable photo job queue client.

use std::future::Future;
use std::time::Duration;

use redis::streams::{StreamAutoClaimReply, StreamId, StreamReadReply};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::connection::ManagedConnection;
use crate::error::{QueueError, QueueResult};
use crate::retry::RetryPolicy;

/// Field name carrying the JSON payload in each stream entry.
const PAYLOAD_FIELD: &str = "payload";

/// How long one consume iteration blocks waiting for a delivery, so the
/// shutdown signal is observed between deliveries.
const CONSUME_BLOCK_MS: u64 = 1000;

/// How many stale deliveries to claim from dead consumers per sweep.
const CLAIM_BATCH: usize = 10;

/// What to do with a delivery the handler wants retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NackPolicy {
    /// Re-enqueue the payload for another delivery attempt (broker default).
    #[default]
    Requeue,
    /// Drop the message.
    Discard,
}

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Broker URL
    pub redis_url: String,
    /// Stream name for jobs
    pub stream_name: String,
    /// Consumer group name
    pub consumer_group: String,
    /// Disposition of retryable deliveries
    pub nack_policy: NackPolicy,
    /// How long a delivery may sit unsettled in another consumer's
    /// pending list before this consumer claims it
    pub claim_idle: Duration,
    /// Retry bound and backoff for broker operations
    pub retry: RetryPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            stream_name: "photoq:jobs".to_string(),
            consumer_group: "photoq:workers".to_string(),
            nack_policy: NackPolicy::default(),
            claim_idle: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            stream_name: std::env::var("QUEUE_STREAM")
                .unwrap_or_else(|_| "photoq:jobs".to_string()),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP")
                .unwrap_or_else(|_| "photoq:workers".to_string()),
            nack_policy: match std::env::var("QUEUE_NACK_POLICY").as_deref() {
                Ok("discard") => NackPolicy::Discard,
                _ => NackPolicy::Requeue,
            },
            claim_idle: Duration::from_millis(
                std::env::var("QUEUE_CLAIM_IDLE_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.claim_idle.as_millis() as u64),
            ),
            retry: RetryPolicy::from_env(),
        }
    }
}

/// Consumer verdict for one delivery tag. Each tag is settled exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The delivery was fully handled and may be removed.
    Completed,
    /// A transient failure; redelivery may succeed later.
    Retry,
    /// A terminal failure; redelivery can never help.
    Drop,
}

/// What actually happens to a settled delivery tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    /// Remove the delivery.
    Ack,
    /// Re-enqueue the payload, then release the tag.
    Requeue,
    /// Release the tag without re-enqueueing.
    Discard,
}

/// Map the handler verdict onto a disposition.
///
/// The nack policy only governs retryable rejects; a terminal reject is
/// always discarded, so one bad payload cannot cycle through redelivery
/// forever.
fn disposition(verdict: Verdict, policy: NackPolicy) -> Disposition {
    match (verdict, policy) {
        (Verdict::Completed, _) => Disposition::Ack,
        (Verdict::Retry, NackPolicy::Requeue) => Disposition::Requeue,
        (Verdict::Retry, NackPolicy::Discard) => Disposition::Discard,
        (Verdict::Drop, _) => Disposition::Discard,
    }
}

/// Decide what to do with one raw delivery before the handler runs.
///
/// `Err` carries the drop reason for deliveries that can never be
/// handled: a missing payload field or a body that is not a JSON UUID.
fn plan_delivery(raw: Option<&str>) -> Result<Uuid, String> {
    match raw {
        None => Err("delivery without payload field".to_string()),
        Some(raw) => parse_payload(raw).map_err(|e| format!("malformed payload: {e}")),
    }
}

/// Decode raw stream entries into `(message_id, payload)` pairs. Shared
/// by the fresh-read and stale-claim paths.
fn decode_entries(ids: Vec<StreamId>) -> Vec<(String, Option<String>)> {
    ids.into_iter()
        .map(|entry| {
            let payload = match entry.map.get(PAYLOAD_FIELD) {
                Some(redis::Value::BulkString(bytes)) => {
                    Some(String::from_utf8_lossy(bytes).into_owned())
                }
                _ => None,
            };
            (entry.id, payload)
        })
        .collect()
}

/// Queue client bound to one named durable stream.
pub struct PhotoQueue {
    conn: ManagedConnection,
    config: QueueConfig,
    consumer_name: String,
}

impl PhotoQueue {
    /// Connect to the broker and bind to the configured stream.
    pub async fn connect(config: QueueConfig) -> QueueResult<Self> {
        let conn = ManagedConnection::connect(&config.redis_url, config.retry.clone()).await?;
        let consumer_name = format!("consumer-{}", Uuid::new_v4());

        Ok(Self {
            conn,
            config,
            consumer_name,
        })
    }

    /// Connect using environment configuration.
    pub async fn from_env() -> QueueResult<Self> {
        Self::connect(QueueConfig::from_env()).await
    }

    /// Ensure the durable stream and consumer group exist.
    pub async fn declare(&self) -> QueueResult<()> {
        self.conn
            .execute_with_retry("declare", |mut conn| {
                let stream = &self.config.stream_name;
                let group = &self.config.consumer_group;
                async move {
                    let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
                        .arg("CREATE")
                        .arg(stream)
                        .arg(group)
                        .arg("0")
                        .arg("MKSTREAM")
                        .query_async(&mut conn)
                        .await;

                    match result {
                        Ok(()) => {
                            info!(%stream, %group, "declared queue");
                            Ok(())
                        }
                        Err(e) if e.to_string().contains("BUSYGROUP") => {
                            debug!(%stream, %group, "queue already declared");
                            Ok(())
                        }
                        Err(e) => Err(QueueError::Redis(e)),
                    }
                }
            })
            .await
    }

    /// Publish one photo identifier.
    ///
    /// The wire payload is the bare UUID rendered as canonical JSON text.
    /// No broker-side confirm is awaited; durability relies on the stream.
    pub async fn publish(&self, photo_id: &Uuid) -> QueueResult<()> {
        let payload = serde_json::to_string(&photo_id.to_string())?;

        self.conn
            .execute_with_retry("publish", |mut conn| {
                let stream = &self.config.stream_name;
                let payload = &payload;
                async move {
                    let _id: String = redis::cmd("XADD")
                        .arg(stream)
                        .arg("*")
                        .arg(PAYLOAD_FIELD)
                        .arg(payload)
                        .query_async(&mut conn)
                        .await?;
                    Ok(())
                }
            })
            .await?;

        debug!(%photo_id, "published job");
        Ok(())
    }

    /// Current queue depth.
    pub async fn len(&self) -> QueueResult<u64> {
        self.conn
            .execute_with_retry("len", |mut conn| {
                let stream = &self.config.stream_name;
                async move {
                    let len: u64 = redis::cmd("XLEN").arg(stream).query_async(&mut conn).await?;
                    Ok(len)
                }
            })
            .await
    }

    /// Run the blocking consume loop until `shutdown` fires.
    ///
    /// One delivery is handled end-to-end before the next is taken. The
    /// handler's verdict settles the delivery tag exactly once. Each
    /// iteration first sweeps the group's pending list for deliveries a
    /// crashed consumer read but never settled and claims them, so a tag
    /// parked in a dead consumer's pending list is redelivered rather
    /// than lost. A transport failure that exhausts the retry bound
    /// escapes this loop as an error; the caller is expected to terminate
    /// so a supervisor can restart it.
    pub async fn consume<H, Fut>(
        &self,
        mut shutdown: watch::Receiver<bool>,
        mut handler: H,
    ) -> QueueResult<()>
    where
        H: FnMut(Uuid) -> Fut,
        Fut: Future<Output = Verdict>,
    {
        info!(
            stream = %self.config.stream_name,
            group = %self.config.consumer_group,
            consumer = %self.consumer_name,
            "starting consume loop"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let entries = tokio::select! {
                changed = shutdown.changed() => {
                    // A dropped sender means no one can signal us anymore
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                fetched = self.fetch_deliveries() => fetched?,
            };

            for (message_id, raw) in entries {
                match plan_delivery(raw.as_deref()) {
                    Ok(photo_id) => {
                        let verdict = handler(photo_id).await;
                        self.settle(
                            &message_id,
                            raw.as_deref(),
                            disposition(verdict, self.config.nack_policy),
                        )
                        .await?;
                    }
                    Err(reason) => {
                        warn!(%message_id, "dropping delivery: {reason}");
                        self.settle(&message_id, None, Disposition::Discard).await?;
                    }
                }
            }
        }

        info!("consume loop stopped");
        Ok(())
    }

    /// Produce the next batch of deliveries: stale claims first, then a
    /// blocking read of never-delivered entries.
    async fn fetch_deliveries(&self) -> QueueResult<Vec<(String, Option<String>)>> {
        let claimed = self.claim_stale().await?;
        if !claimed.is_empty() {
            info!(count = claimed.len(), "claimed stale deliveries");
            return Ok(claimed);
        }
        self.read_next().await
    }

    /// Claim deliveries stuck in the pending list of another consumer.
    ///
    /// A consumer that dies between read and settle leaves its delivery
    /// tags parked under its own name; because consumer names are
    /// per-process, nothing reads them again with `>`. Claiming entries
    /// idle past the configured threshold moves them to this consumer.
    async fn claim_stale(&self) -> QueueResult<Vec<(String, Option<String>)>> {
        self.conn
            .execute_with_retry("claim", |mut conn| {
                let stream = &self.config.stream_name;
                let group = &self.config.consumer_group;
                let consumer = &self.consumer_name;
                let min_idle = self.config.claim_idle.as_millis() as u64;
                async move {
                    let reply: StreamAutoClaimReply = redis::cmd("XAUTOCLAIM")
                        .arg(stream)
                        .arg(group)
                        .arg(consumer)
                        .arg(min_idle)
                        .arg("0-0")
                        .arg("COUNT")
                        .arg(CLAIM_BATCH)
                        .query_async(&mut conn)
                        .await?;
                    Ok(decode_entries(reply.claimed))
                }
            })
            .await
    }

    /// Block for the next batch of never-delivered entries.
    ///
    /// Returns `(message_id, payload)` pairs; a `None` payload marks an
    /// entry missing the payload field. An empty vec means the block
    /// timed out with nothing delivered.
    async fn read_next(&self) -> QueueResult<Vec<(String, Option<String>)>> {
        self.conn
            .execute_with_retry("consume", |mut conn| {
                let stream = &self.config.stream_name;
                let group = &self.config.consumer_group;
                let consumer = &self.consumer_name;
                async move {
                    let reply: StreamReadReply = redis::cmd("XREADGROUP")
                        .arg("GROUP")
                        .arg(group)
                        .arg(consumer)
                        .arg("COUNT")
                        .arg(1usize)
                        .arg("BLOCK")
                        .arg(CONSUME_BLOCK_MS)
                        .arg("STREAMS")
                        .arg(stream)
                        .arg(">")
                        .query_async(&mut conn)
                        .await?;

                    let mut entries = Vec::new();
                    for key in reply.keys {
                        entries.extend(decode_entries(key.ids));
                    }
                    Ok(entries)
                }
            })
            .await
    }

    /// Settle one delivery tag: exactly one ack or nack per delivery.
    ///
    /// A requeued delivery is re-enqueued before the tag is released, so
    /// the payload is never lost.
    async fn settle(
        &self,
        message_id: &str,
        raw: Option<&str>,
        disposition: Disposition,
    ) -> QueueResult<()> {
        match disposition {
            Disposition::Requeue => {
                if let Some(raw) = raw {
                    self.conn
                        .execute_with_retry("requeue", |mut conn| {
                            let stream = &self.config.stream_name;
                            async move {
                                let _id: String = redis::cmd("XADD")
                                    .arg(stream)
                                    .arg("*")
                                    .arg(PAYLOAD_FIELD)
                                    .arg(raw)
                                    .query_async(&mut conn)
                                    .await?;
                                Ok(())
                            }
                        })
                        .await?;
                }
                debug!(%message_id, "rejected delivery, requeued");
            }
            Disposition::Discard => {
                debug!(%message_id, "rejected delivery, discarded");
            }
            Disposition::Ack => {
                debug!(%message_id, "acknowledged delivery");
            }
        }

        self.conn
            .execute_with_retry("ack", |mut conn| {
                let stream = &self.config.stream_name;
                let group = &self.config.consumer_group;
                async move {
                    redis::cmd("XACK")
                        .arg(stream)
                        .arg(group)
                        .arg(message_id)
                        .query_async::<()>(&mut conn)
                        .await?;
                    redis::cmd("XDEL")
                        .arg(stream)
                        .arg(message_id)
                        .query_async::<()>(&mut conn)
                        .await?;
                    Ok(())
                }
            })
            .await
    }
}

/// Parse a wire payload: UTF-8 JSON text holding a bare UUID string.
fn parse_payload(raw: &str) -> QueueResult<Uuid> {
    let text: String = serde_json::from_str(raw)?;
    Uuid::parse_str(&text)
        .map_err(|e| QueueError::MalformedPayload(format!("{text:?} is not a UUID: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_completed_verdict_always_acks() {
        assert_eq!(
            disposition(Verdict::Completed, NackPolicy::Requeue),
            Disposition::Ack
        );
        assert_eq!(
            disposition(Verdict::Completed, NackPolicy::Discard),
            Disposition::Ack
        );
    }

    #[test]
    fn test_retry_verdict_follows_nack_policy() {
        assert_eq!(
            disposition(Verdict::Retry, NackPolicy::Requeue),
            Disposition::Requeue
        );
        assert_eq!(
            disposition(Verdict::Retry, NackPolicy::Discard),
            Disposition::Discard
        );
    }

    #[test]
    fn test_terminal_verdict_never_requeues() {
        // A payload the handler can never process must not cycle back
        assert_eq!(
            disposition(Verdict::Drop, NackPolicy::Requeue),
            Disposition::Discard
        );
        assert_eq!(
            disposition(Verdict::Drop, NackPolicy::Discard),
            Disposition::Discard
        );
    }

    #[test]
    fn test_plan_delivery_handles_valid_payload() {
        let id = Uuid::parse_str("11111111-1111-4111-8111-111111111111").unwrap();
        let wire = serde_json::to_string(&id.to_string()).unwrap();
        assert_eq!(plan_delivery(Some(&wire)), Ok(id));
    }

    #[test]
    fn test_plan_delivery_drops_missing_payload_field() {
        let reason = plan_delivery(None).unwrap_err();
        assert!(reason.contains("without payload field"));
    }

    #[test]
    fn test_plan_delivery_drops_malformed_payload() {
        assert!(plan_delivery(Some("not json")).is_err());
        assert!(plan_delivery(Some("{\"uuid\": \"x\"}")).is_err());
        assert!(plan_delivery(Some("\"not-a-uuid\"")).is_err());
    }

    #[test]
    fn test_decode_entries_extracts_payload_field() {
        let mut map = HashMap::new();
        map.insert(
            PAYLOAD_FIELD.to_string(),
            redis::Value::BulkString(b"\"payload\"".to_vec()),
        );
        let with_payload = StreamId {
            id: "1-0".to_string(),
            map,
        };
        let without_payload = StreamId {
            id: "2-0".to_string(),
            map: HashMap::new(),
        };

        let entries = decode_entries(vec![with_payload, without_payload]);

        assert_eq!(
            entries,
            vec![
                ("1-0".to_string(), Some("\"payload\"".to_string())),
                ("2-0".to_string(), None),
            ]
        );
    }

    #[test]
    fn test_parse_payload_roundtrip() {
        let id = Uuid::parse_str("11111111-1111-4111-8111-111111111111").unwrap();
        let wire = serde_json::to_string(&id.to_string()).unwrap();
        assert_eq!(parse_payload(&wire).unwrap(), id);
    }

    #[test]
    fn test_parse_payload_rejects_non_string_json() {
        assert!(matches!(
            parse_payload("{\"uuid\": \"x\"}"),
            Err(QueueError::Json(_))
        ));
        assert!(matches!(parse_payload("not json"), Err(QueueError::Json(_))));
    }

    #[test]
    fn test_parse_payload_rejects_non_uuid_text() {
        assert!(matches!(
            parse_payload("\"not-a-uuid\""),
            Err(QueueError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_config_defaults() {
        let config = QueueConfig::default();
        assert_eq!(config.stream_name, "photoq:jobs");
        assert_eq!(config.consumer_group, "photoq:workers");
        assert_eq!(config.nack_policy, NackPolicy::Requeue);
        assert_eq!(config.claim_idle, Duration::from_secs(30));
        assert_eq!(config.retry.max_attempts, 3);
    }
}
