//! Listing retrieval: one explicit page, or every page accumulated.

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::error::{ListingsError, RequestFailure, Result};
use crate::policy::ProviderOperation;
use crate::types::{ListingQuery, ListingRecord, ListingsPage, RecordId, SearchResponse};
use crate::ListingsClient;

/// Page size used when walking every page.
pub const ACCUMULATION_PAGE_SIZE: u32 = 50;

impl ListingsClient {
    /// Fetch listings matching `query`.
    ///
    /// With `query.page.limit` set, exactly one page is requested and the
    /// provider's records and `totalCount` come back unmodified. Without it,
    /// pages of [`ACCUMULATION_PAGE_SIZE`] are requested from offset 0 and
    /// merged by record id until a page adds nothing new or the reported
    /// total is reached; `total_count` is then the number of unique records.
    pub async fn fetch_listings(&self, query: &ListingQuery) -> Result<ListingsPage> {
        match query.page.limit {
            Some(limit) => self.fetch_single_page(query, limit).await,
            None => self.fetch_all_pages(query).await,
        }
    }

    async fn fetch_single_page(&self, query: &ListingQuery, limit: u32) -> Result<ListingsPage> {
        let offset = query.page.offset.unwrap_or(0);
        let page = self.fetch_page(&query.at(limit, offset)).await?;

        debug!(
            limit,
            offset,
            fetched = page.estates.len(),
            total = page.total_count,
            "Fetched single listings page"
        );

        Ok(ListingsPage {
            records: page.estates,
            total_count: page.total_count,
        })
    }

    async fn fetch_all_pages(&self, query: &ListingQuery) -> Result<ListingsPage> {
        let mut accumulated: IndexMap<RecordId, ListingRecord> = IndexMap::new();
        let mut offset: u32 = 0;

        loop {
            let page = self
                .fetch_page(&query.at(ACCUMULATION_PAGE_SIZE, offset))
                .await?;

            let fetched = page.estates.len();
            let before = accumulated.len();
            for record in page.estates {
                accumulated.entry(record.id.clone()).or_insert(record);
            }
            let added = accumulated.len() - before;

            debug!(
                offset,
                fetched,
                added,
                accumulated = accumulated.len(),
                total = page.total_count,
                "Fetched listings page"
            );

            if added == 0 || accumulated.len() as u64 >= page.total_count {
                break;
            }
            match offset.checked_add(ACCUMULATION_PAGE_SIZE) {
                Some(next) => offset = next,
                None => break,
            }
        }

        info!(count = accumulated.len(), "Accumulated listings");

        let records: Vec<ListingRecord> = accumulated.into_values().collect();
        Ok(ListingsPage {
            total_count: records.len() as u64,
            records,
        })
    }

    async fn fetch_page(&self, query: &ListingQuery) -> Result<SearchResponse> {
        let body = serde_json::to_value(query)
            .map_err(|e| ListingsError::FetchFailed(RequestFailure::Parse(e.to_string())))?;

        let response = self
            .send_authorized(ProviderOperation::FetchListings, &self.endpoints.listings, &body)
            .await?;

        response.into_json().map_err(ListingsError::FetchFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubProvider;
    use crate::{AccountCredentials, ListingsConfig};
    use serde_json::json;
    use std::sync::Arc;

    fn client(stub: &Arc<StubProvider>) -> ListingsClient {
        let config = ListingsConfig::new(AccountCredentials::new("agency", "pw"), 4021);
        ListingsClient::with_transport(config, stub.clone()).unwrap()
    }

    #[tokio::test]
    async fn test_filters_forwarded_on_every_page() {
        let stub = Arc::new(
            StubProvider::new()
                .listing_page_ids(1..=50, 60)
                .listing_page_ids(51..=60, 60),
        );
        let client = client(&stub);

        let query = ListingQuery::new()
            .filter(json!({"CityIds": [9]}))
            .sort(json!([{"Field": "createDateTime", "Ascending": false}]));
        let page = client.fetch_listings(&query).await.unwrap();
        assert_eq!(page.total_count, 60);

        let bodies = stub.listing_bodies();
        assert_eq!(bodies.len(), 2);
        for (i, body) in bodies.iter().enumerate() {
            assert_eq!(body["Filter"], json!({"CityIds": [9]}));
            assert_eq!(body["Sort"][0]["Field"], "createDateTime");
            assert_eq!(body["Page"]["Limit"], 50);
            assert_eq!(body["Page"]["Offset"], 50 * i as u64);
        }
    }

    #[tokio::test]
    async fn test_offset_defaults_to_zero_in_single_page_mode() {
        let stub = Arc::new(StubProvider::new().listing_page_ids(1..=3, 3));
        let client = client(&stub);

        client
            .fetch_listings(&ListingQuery::new().limit(3))
            .await
            .unwrap();

        assert_eq!(stub.listing_bodies()[0]["Page"], json!({"Limit": 3, "Offset": 0}));
    }

    #[tokio::test]
    async fn test_accumulation_preserves_first_seen_order() {
        let stub = Arc::new(
            StubProvider::new()
                .listing_page_ids([3, 1, 2], 4)
                .listing_page_ids([2, 4], 4),
        );
        let client = client(&stub);

        let page = client.fetch_listings(&ListingQuery::new()).await.unwrap();
        let ids: Vec<RecordId> = page.records.into_iter().map(|r| r.id).collect();
        assert_eq!(
            ids,
            vec![
                RecordId::Number(3),
                RecordId::Number(1),
                RecordId::Number(2),
                RecordId::Number(4)
            ]
        );
    }

    #[tokio::test]
    async fn test_page_of_only_duplicates_stops_accumulation() {
        let stub = Arc::new(
            StubProvider::new()
                .listing_page_ids(1..=50, 500)
                .listing_page_ids(1..=50, 500)
                .listing_page_ids(51..=100, 500),
        );
        let client = client(&stub);

        let page = client.fetch_listings(&ListingQuery::new()).await.unwrap();
        assert_eq!(page.records.len(), 50);
        assert_eq!(stub.listing_bodies().len(), 2);
    }
}
