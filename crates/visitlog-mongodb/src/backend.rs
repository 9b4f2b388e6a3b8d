use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::SubsecRound;
use futures::TryStreamExt;
use mongodb::{
    bson::doc,
    options::{ClientOptions, IndexOptions, ReturnDocument},
    Client, Collection, IndexModel,
};
use tracing::{info, warn};

use visitlog_core::store::VisitStore;
use visitlog_core::visit::{NewVisit, RecentVisit, VisitLogEntry, VisitorCounter};

use crate::documents::{
    counter_filter, increment_update, newest_first, recent_visit_projection, to_bson_datetime,
    CounterDocument, RecentVisitDocument, VisitLogDocument,
};

/// Database used when the connection string does not name one.
pub const DEFAULT_DATABASE: &str = "test";
pub const COUNTERS_COLLECTION: &str = "visitors";
pub const VISIT_LOGS_COLLECTION: &str = "visitlogs";

const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);

pub struct MongoBackend {
    client: Client,
    counters: Collection<CounterDocument>,
    logs: Collection<VisitLogDocument>,
}

impl MongoBackend {
    /// Parse `uri`, verify the deployment answers a ping, and declare indexes.
    ///
    /// The driver connects lazily, so without the ping an unreachable server
    /// would only surface on the first query.
    pub async fn connect(uri: &str) -> Result<Self> {
        let mut client_options = ClientOptions::parse(uri).await?;
        client_options.app_name.get_or_insert_with(|| "visitlog".to_string());
        client_options
            .server_selection_timeout
            .get_or_insert(SERVER_SELECTION_TIMEOUT);

        let client = Client::with_options(client_options)?;
        let database = client
            .default_database()
            .unwrap_or_else(|| client.database(DEFAULT_DATABASE));

        let backend = Self {
            counters: database.collection(COUNTERS_COLLECTION),
            logs: database.collection(VISIT_LOGS_COLLECTION),
            client,
        };
        backend.ping().await?;
        backend.ensure_indexes().await?;

        info!(database = %database.name(), "MongoDB connected");
        Ok(backend)
    }

    async fn ensure_indexes(&self) -> Result<()> {
        let unique_name = IndexModel::builder()
            .keys(doc! { "name": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        // Fails on collections that already hold duplicate counter names.
        if let Err(e) = self.counters.create_index(unique_name).await {
            warn!(error = %e, "could not create unique index on visitors.name");
        }

        self.logs
            .create_index(IndexModel::builder().keys(doc! { "timestamp": -1 }).build())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl VisitStore for MongoBackend {
    async fn ping(&self) -> Result<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }

    async fn find_counter(&self, name: &str) -> Result<Option<VisitorCounter>> {
        let found = self.counters.find_one(counter_filter(name)).await?;
        Ok(found.map(|c| VisitorCounter {
            name: c.name,
            count: c.count,
        }))
    }

    async fn increment_counter(&self, name: &str) -> Result<VisitorCounter> {
        let updated = self
            .counters
            .find_one_and_update(counter_filter(name), increment_update())
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| anyhow!("upsert of counter {name} returned no document"))?;
        Ok(VisitorCounter {
            name: updated.name,
            count: updated.count,
        })
    }

    async fn insert_visit(&self, mut visit: NewVisit) -> Result<VisitLogEntry> {
        // BSON dates carry milliseconds.
        visit.timestamp = visit.timestamp.trunc_subsecs(3);

        let document = VisitLogDocument {
            id: None,
            timestamp: to_bson_datetime(visit.timestamp),
            ip: visit.ip.clone(),
            user_agent: visit.user_agent.clone(),
            device: visit.device,
            city: visit.geo.city.clone(),
            region: visit.geo.region.clone(),
            country: visit.geo.country.clone(),
            timezone: visit.geo.timezone.clone(),
        };
        let inserted = self.logs.insert_one(&document).await?;
        let id = match inserted.inserted_id.as_object_id() {
            Some(oid) => oid.to_hex(),
            None => inserted.inserted_id.to_string(),
        };

        Ok(VisitLogEntry::from_new(id, visit))
    }

    async fn recent_visits(&self, limit: usize) -> Result<Vec<RecentVisit>> {
        // A limit of 0 means "no limit" to the server.
        if limit == 0 {
            return Ok(Vec::new());
        }

        let cursor = self
            .logs
            .clone_with_type::<RecentVisitDocument>()
            .find(doc! {})
            .sort(newest_first())
            .limit(limit as i64)
            .projection(recent_visit_projection())
            .await?;

        let documents: Vec<RecentVisitDocument> = cursor.try_collect().await?;
        documents.into_iter().map(RecentVisit::try_from).collect()
    }
}
