use super::{LoaderConfig, transform::RestaurantRow};
use crate::config;
use reqwest::StatusCode;
use tracing::{debug, info};

static TABLE: &str = "restaurants";
static CONFLICT_KEY: &str = "slug";
static PREFER_UPSERT: &str = "resolution=merge-duplicates,return=minimal";

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("failed to build HTTP client")]
    Build(#[source] reqwest::Error),
    #[error("upsert request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("upsert rejected with HTTP {status}: {body}")]
    Rejected { status: StatusCode, body: String },
}

/// Somewhere restaurant rows can be written to, keyed by slug
#[async_trait::async_trait]
pub trait Upsert {
    async fn upsert(&self, rows: &[RestaurantRow]) -> Result<(), LoadError>;
}

/// Upserts through the PostgREST endpoint of a Supabase project
#[derive(Clone)]
pub struct RestStore {
    client: reqwest::Client,
    endpoint: String,
    key: String,
}

impl RestStore {
    pub fn new(cfg: &LoaderConfig) -> Result<Self, LoadError> {
        let client = reqwest::Client::builder()
            .timeout(config::REQUEST_TIMEOUT)
            .build()
            .map_err(LoadError::Build)?;
        Ok(Self {
            client,
            endpoint: format!("{}/rest/v1/{}", cfg.url.trim_end_matches('/'), TABLE),
            key: cfg.service_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl Upsert for RestStore {
    async fn upsert(&self, rows: &[RestaurantRow]) -> Result<(), LoadError> {
        debug!(rows = rows.len(), endpoint = %self.endpoint, "Posting batch");
        let res = self
            .client
            .post(&self.endpoint)
            .query(&[("on_conflict", CONFLICT_KEY)])
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .header("Prefer", PREFER_UPSERT)
            .json(rows)
            .send()
            .await
            .map_err(|source| LoadError::Request {
                url: self.endpoint.clone(),
                source,
            })?;

        let status = res.status();
        if status.is_success() {
            return Ok(());
        }
        let body = res.text().await.unwrap_or_default();
        Err(LoadError::Rejected { status, body })
    }
}

/// Upsert all rows in batches of `batch_size`, stopping at the first failed batch. Returns the
/// number of rows written.
pub async fn upsert_restaurants<S: Upsert + ?Sized>(
    store: &S,
    rows: &[RestaurantRow],
    batch_size: usize,
) -> Result<usize, LoadError> {
    let mut total = 0;
    for batch in rows.chunks(batch_size.max(1)) {
        store.upsert(batch).await?;
        total += batch.len();
        info!(total, of = rows.len(), "Upserted restaurants");
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::Restaurant, testutil::serve};
    use axum::{
        Json, Router,
        extract::{Query, State},
        http::{HeaderMap, StatusCode as AxumStatus},
        routing::post,
    };
    use serde_json::Value;
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    };

    #[derive(Default)]
    struct MemStore {
        batches: Mutex<Vec<Vec<String>>>,
        fail_on: Option<usize>,
    }

    #[async_trait::async_trait]
    impl Upsert for MemStore {
        async fn upsert(&self, rows: &[RestaurantRow]) -> Result<(), LoadError> {
            let mut batches = self.batches.lock().unwrap();
            if self.fail_on == Some(batches.len()) {
                return Err(LoadError::Rejected {
                    status: StatusCode::CONFLICT,
                    body: "nope".into(),
                });
            }
            batches.push(rows.iter().map(|r| r.slug.clone()).collect());
            Ok(())
        }
    }

    fn rows(n: usize) -> Vec<RestaurantRow> {
        (0..n)
            .map(|i| Restaurant::new(&format!("r-{i}"), "R").into())
            .collect()
    }

    fn loader_config(url: &str) -> LoaderConfig {
        LoaderConfig {
            url: url.into(),
            service_key: "secret-key".into(),
        }
    }

    #[tokio::test]
    async fn batches() {
        let store = MemStore::default();
        assert_eq!(120, upsert_restaurants(&store, &rows(120), 50).await.unwrap());
        let sizes: Vec<usize> = store.batches.lock().unwrap().iter().map(Vec::len).collect();
        assert_eq!(vec![50, 50, 20], sizes);
    }

    #[tokio::test]
    async fn upsert_through_trait_object() {
        let store = MemStore::default();
        let dyn_store: &dyn Upsert = &store;
        assert_eq!(3, upsert_restaurants(dyn_store, &rows(3), 2).await.unwrap());
        assert_eq!(2, store.batches.lock().unwrap().len());
    }

    #[tokio::test]
    async fn no_rows_no_batches() {
        let store = MemStore::default();
        assert_eq!(0, upsert_restaurants(&store, &[], 50).await.unwrap());
        assert!(store.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stops_at_failed_batch() {
        let store = MemStore {
            fail_on: Some(1),
            ..Default::default()
        };
        let err = upsert_restaurants(&store, &rows(5), 2).await.unwrap_err();
        assert!(matches!(err, LoadError::Rejected { status, .. } if status == StatusCode::CONFLICT));
        assert_eq!(1, store.batches.lock().unwrap().len());
    }

    type Seen = Arc<Mutex<Vec<(HeaderMap, HashMap<String, String>, Value)>>>;

    async fn record(
        State(seen): State<Seen>,
        headers: HeaderMap,
        Query(q): Query<HashMap<String, String>>,
        Json(body): Json<Value>,
    ) -> AxumStatus {
        seen.lock().unwrap().push((headers, q, body));
        AxumStatus::CREATED
    }

    #[tokio::test]
    async fn rest_store_request() {
        let seen = Seen::default();
        let router = Router::new()
            .route("/rest/v1/restaurants", post(record))
            .with_state(seen.clone());
        let base = serve(router).await;

        let store = RestStore::new(&loader_config(&format!("{base}/"))).unwrap();
        assert_eq!(format!("{base}/rest/v1/restaurants"), store.endpoint());
        upsert_restaurants(&store, &rows(3), 2).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(2, seen.len());
        let (headers, query, body) = &seen[0];
        assert_eq!(Some("slug"), query.get("on_conflict").map(String::as_str));
        assert_eq!("secret-key", headers["apikey"]);
        assert_eq!("Bearer secret-key", headers["authorization"]);
        assert_eq!(
            "resolution=merge-duplicates,return=minimal",
            headers["prefer"]
        );
        assert_eq!(2, body.as_array().unwrap().len());
        assert_eq!("r-0", body[0]["slug"]);
        assert!(body[0]["menu"].is_null());
        assert_eq!(1, seen[1].2.as_array().unwrap().len());
    }

    #[tokio::test]
    async fn rest_store_rejected() {
        let router = Router::new().route(
            "/rest/v1/restaurants",
            post(|| async { (AxumStatus::BAD_REQUEST, "column \"foo\" does not exist") }),
        );
        let base = serve(router).await;

        let store = RestStore::new(&loader_config(&base)).unwrap();
        let err = store.upsert(&rows(1)).await.unwrap_err();
        match err {
            LoadError::Rejected { status, body } => {
                assert_eq!(StatusCode::BAD_REQUEST, status);
                assert!(body.contains("does not exist"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
