//! Read path: newest-first event listings

use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use std::sync::Arc;

use crate::ledger::{Ledger, LedgerError};
use crate::models::IntrusionEvent;

/// A listing aborted because the ledger failed part-way through.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("query failed: {source}")]
pub struct QueryFailed {
    #[from]
    pub source: LedgerError,
}

#[derive(Clone)]
pub struct QueryService {
    ledger: Arc<dyn Ledger>,
}

enum Cursor {
    Start,
    Below(u64),
}

impl QueryService {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    pub async fn count(&self) -> Result<u64, QueryFailed> {
        Ok(self.ledger.count().await?)
    }

    /// Lazily walk the ledger from the newest event down to index 0.
    ///
    /// Nothing is read until the stream is polled. The count is taken once, on
    /// the first poll; events appended afterwards are not part of this listing.
    /// The stream ends after the first error.
    pub fn list_events(&self) -> impl Stream<Item = Result<IntrusionEvent, QueryFailed>> + Send + 'static {
        let ledger = Arc::clone(&self.ledger);
        stream::try_unfold(Cursor::Start, move |cursor| step(Arc::clone(&ledger), cursor))
    }

    /// Collect a full listing, or the `limit` newest events.
    ///
    /// All or nothing: any ledger failure discards what was read so far.
    pub async fn collect_events(&self, limit: Option<usize>) -> Result<Vec<IntrusionEvent>, QueryFailed> {
        let events = self.list_events();
        match limit {
            Some(limit) => events.take(limit).try_collect().await,
            None => events.try_collect().await,
        }
    }
}

async fn step(
    ledger: Arc<dyn Ledger>,
    cursor: Cursor,
) -> Result<Option<(IntrusionEvent, Cursor)>, QueryFailed> {
    let upper = match cursor {
        Cursor::Start => ledger.count().await?,
        Cursor::Below(index) => index,
    };

    if upper == 0 {
        return Ok(None);
    }

    let index = upper - 1;
    let event = ledger.get(index).await?;
    Ok(Some((event, Cursor::Below(index))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Address, MemoryLedger, Signer};
    use crate::models::IntrusionFlag;

    async fn seeded(devices: &[&str]) -> Arc<MemoryLedger> {
        let ledger = Arc::new(MemoryLedger::new());
        let signer = Signer::new(Address::new([1; 20]));
        for device in devices {
            ledger.append(device, IntrusionFlag::Malicious, &signer).await.unwrap();
        }
        ledger
    }

    #[tokio::test]
    async fn test_empty_ledger_lists_nothing() {
        let service = QueryService::new(seeded(&[]).await);
        assert_eq!(service.collect_events(None).await.unwrap(), vec![]);
    }

    #[tokio::test]
    async fn test_listing_is_strictly_descending() {
        let ledger = seeded(&["a", "b", "c", "d"]).await;
        let service = QueryService::new(ledger.clone());

        let events = service.collect_events(None).await.unwrap();
        let indices: Vec<u64> = events.iter().map(|e| e.index).collect();

        assert_eq!(indices, vec![3, 2, 1, 0]);
        assert_eq!(events.len() as u64, ledger.count().await.unwrap());
        assert_eq!(events[0].device, "d");
        assert_eq!(events[3].device, "a");
    }

    #[tokio::test]
    async fn test_limit_returns_newest_only() {
        let service = QueryService::new(seeded(&["a", "b", "c"]).await);

        let events = service.collect_events(Some(2)).await.unwrap();
        let devices: Vec<&str> = events.iter().map(|e| e.device.as_str()).collect();
        assert_eq!(devices, vec!["c", "b"]);

        assert!(service.collect_events(Some(0)).await.unwrap().is_empty());
        assert_eq!(service.collect_events(Some(10)).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_failure_mid_listing_returns_no_partial_results() {
        let ledger = seeded(&["a", "b", "c"]).await;
        ledger.fail_reads_at(Some(1));
        let service = QueryService::new(ledger);

        let result = service.collect_events(None).await;
        assert!(matches!(
            result,
            Err(QueryFailed { source: LedgerError::Connectivity(_) })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_ledger_fails_listing() {
        let ledger = seeded(&["a"]).await;
        ledger.set_reachable(false);
        let service = QueryService::new(ledger);

        assert!(service.collect_events(None).await.is_err());
        assert!(service.count().await.is_err());
    }

    #[tokio::test]
    async fn test_stream_is_lazy() {
        let ledger = seeded(&["a", "b"]).await;
        ledger.set_reachable(false);
        let service = QueryService::new(ledger.clone());

        // Building the stream touches nothing
        let events = service.list_events();
        ledger.set_reachable(true);

        let collected: Vec<_> = events.try_collect().await.unwrap();
        assert_eq!(collected.len(), 2);
    }

    #[tokio::test]
    async fn test_repeated_reads_are_identical() {
        let ledger = seeded(&["a", "b"]).await;
        let first = ledger.get(1).await.unwrap();
        let second = ledger.get(1).await.unwrap();
        assert_eq!(first, second);

        let service = QueryService::new(ledger);
        assert_eq!(
            service.collect_events(None).await.unwrap(),
            service.collect_events(None).await.unwrap()
        );
    }
}
