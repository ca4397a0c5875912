use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::{
    config::QdrantConfig,
    qdrant::{
        point_id::PointIdOptions, points_selector::PointsSelectorOneOf,
        with_payload_selector::SelectorOptions, Condition, CountPoints, CreateCollection,
        DeletePoints, Distance, Filter, PointId, PointStruct, PointsSelector, SearchPoints,
        UpsertPoints, Value, VectorParams, VectorsConfig, WithPayloadSelector,
    },
    Qdrant,
};
use uuid::Uuid;

use crate::document::Chunk;
use crate::index::{IndexEntry, IndexError, ScoredChunk, VectorStore};

/// Qdrant-backed store for durable, multi-session indexes. Point ids are
/// UUIDv5 of the chunk id, so upserting the same chunk replaces it instead
/// of duplicating it.
pub struct QdrantStore {
    client: Arc<Qdrant>,
    collection: String,
}

impl QdrantStore {
    pub async fn connect(
        url: &str,
        collection: &str,
        vector_size: u64,
    ) -> Result<Self, IndexError> {
        let client = create_client(url).await?;
        let store = Self {
            client: Arc::new(client),
            collection: collection.to_string(),
        };
        store.ensure_collection(vector_size).await?;
        Ok(store)
    }

    async fn ensure_collection(&self, vector_size: u64) -> Result<(), IndexError> {
        let vectors_config = VectorsConfig {
            config: Some(qdrant_client::qdrant::vectors_config::Config::Params(
                VectorParams {
                    size: vector_size,
                    distance: Distance::Cosine.into(),
                    ..Default::default()
                },
            )),
        };

        let create = CreateCollection {
            collection_name: self.collection.clone(),
            vectors_config: Some(vectors_config),
            ..Default::default()
        };

        match self.client.create_collection(create).await {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains("AlreadyExists") => {
                log::info!("collection {} already exists", self.collection);
                Ok(())
            }
            Err(e) => Err(IndexError::Store(e.to_string())),
        }
    }

    fn point_id(chunk_id: &str) -> PointId {
        let uuid = Uuid::new_v5(&Uuid::NAMESPACE_URL, chunk_id.as_bytes());
        PointId {
            point_id_options: Some(PointIdOptions::Uuid(uuid.to_string())),
        }
    }

    fn payload_for(entry: &IndexEntry) -> HashMap<String, Value> {
        let chunk = &entry.chunk;
        let mut payload: HashMap<String, serde_json::Value> = HashMap::new();
        payload.insert("chunk_id".to_string(), chunk.id.clone().into());
        payload.insert("document_id".to_string(), chunk.document_id.clone().into());
        payload.insert("page".to_string(), chunk.page.into());
        payload.insert("start".to_string(), chunk.start.into());
        payload.insert("end".to_string(), chunk.end.into());
        payload.insert("text".to_string(), chunk.text.clone().into());

        payload
            .into_iter()
            .map(|(k, v)| (k, Value::from(v)))
            .collect()
    }

    fn chunk_from_payload(payload: &HashMap<String, Value>) -> Option<Chunk> {
        let as_json: HashMap<String, serde_json::Value> = payload
            .iter()
            .map(|(k, v)| {
                (
                    k.clone(),
                    serde_json::Value::try_from(v.clone()).unwrap_or(serde_json::Value::Null),
                )
            })
            .collect();

        Some(Chunk {
            id: as_json.get("chunk_id")?.as_str()?.to_string(),
            document_id: as_json.get("document_id")?.as_str()?.to_string(),
            page: as_json.get("page")?.as_u64()? as u32,
            start: as_json.get("start")?.as_u64()? as usize,
            end: as_json.get("end")?.as_u64()? as usize,
            text: as_json.get("text")?.as_str()?.to_string(),
        })
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn upsert(&mut self, entries: Vec<IndexEntry>) -> Result<(), IndexError> {
        if entries.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = entries
            .iter()
            .map(|entry| PointStruct {
                id: Some(Self::point_id(&entry.chunk.id)),
                vectors: Some(entry.vector.clone().into()),
                payload: Self::payload_for(entry),
            })
            .collect();

        let upsert = UpsertPoints {
            collection_name: self.collection.clone(),
            points,
            ..Default::default()
        };

        self.client
            .upsert_points(upsert)
            .await
            .map_err(|e| IndexError::Store(e.to_string()))?;
        Ok(())
    }

    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>, IndexError> {
        let request = SearchPoints {
            collection_name: self.collection.clone(),
            vector: vector.to_vec(),
            limit: k as u64,
            with_payload: Some(WithPayloadSelector {
                selector_options: Some(SelectorOptions::Enable(true)),
            }),
            ..Default::default()
        };

        let results = self
            .client
            .search_points(request)
            .await
            .map_err(|e| IndexError::Store(e.to_string()))?;

        Ok(results
            .result
            .into_iter()
            .filter_map(|point| {
                let chunk = Self::chunk_from_payload(&point.payload)?;
                Some(ScoredChunk {
                    chunk,
                    similarity: point.score,
                })
            })
            .collect())
    }

    async fn len(&self) -> Result<usize, IndexError> {
        let count = self
            .client
            .count(CountPoints {
                collection_name: self.collection.clone(),
                exact: Some(true),
                ..Default::default()
            })
            .await
            .map_err(|e| IndexError::Unavailable(e.to_string()))?;

        Ok(count.result.map(|r| r.count as usize).unwrap_or(0))
    }

    async fn remove_document(&mut self, document_id: &str) -> Result<(), IndexError> {
        let filter = Filter::must([Condition::matches(
            "document_id",
            document_id.to_string(),
        )]);

        let delete = DeletePoints {
            collection_name: self.collection.clone(),
            points: Some(PointsSelector {
                points_selector_one_of: Some(PointsSelectorOneOf::Filter(filter)),
            }),
            ..Default::default()
        };

        self.client
            .delete_points(delete)
            .await
            .map_err(|e| IndexError::Store(e.to_string()))?;
        Ok(())
    }
}

async fn create_client(url: &str) -> Result<Qdrant, IndexError> {
    // Qdrant speaks gRPC on 6334; accept the REST port and rewrite it.
    let clean_url = if url.contains("://") {
        url.split("://").nth(1).unwrap_or(url).to_string()
    } else {
        url.to_string()
    };
    let grpc_url = if clean_url.ends_with(":6333") {
        clean_url.replace(":6333", ":6334")
    } else {
        clean_url
    };

    let url_with_scheme = format!("http://{}", grpc_url);
    log::info!("connecting to qdrant at {}", url_with_scheme);

    let mut config = QdrantConfig::from_url(&url_with_scheme);
    config.check_compatibility = false;
    config.timeout = Duration::from_secs(30);
    config.connect_timeout = Duration::from_secs(10);

    let client = Qdrant::new(config).map_err(|e| IndexError::Unavailable(e.to_string()))?;

    client
        .list_collections()
        .await
        .map_err(|e| IndexError::Unavailable(format!("qdrant connection test failed: {}", e)))?;

    Ok(client)
}
