//! REST handlers (§6.1). Grounded on `lumadb-api::rest::mod` (route
//! registration via `web::scope`, one handler function per endpoint) and
//! `lumadb-compat::qdrant::server` (nested `{name}` path segments for
//! sub-resources). DTOs live in [`crate::dto`]; domain errors cross the
//! boundary as [`crate::error::ApiError`].

use actix_web::{web, HttpResponse};

use vdb_common::error::Error;
use vdb_core::model::Metadata;

use crate::dto::{
    ChunkResponse, CreateChunkRequest, CreateDocumentRequest, CreateLibraryRequest,
    DocumentResponse, IndexBuildRequest, IndexStatusResponse, LibraryResponse, QueryRequest,
    QueryResult, UpdateChunkRequest, UpdateDocumentRequest, UpdateLibraryRequest,
};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/metrics", web::get().to(metrics))
        .route("/", web::get().to(root))
        .service(
            web::scope("/api/v1")
                .route("/libraries", web::post().to(create_library))
                .route("/libraries", web::get().to(list_libraries))
                .route("/libraries/{library_id}", web::get().to(get_library))
                .route("/libraries/{library_id}", web::patch().to(update_library))
                .route("/libraries/{library_id}", web::delete().to(delete_library))
                .route("/libraries/{library_id}/index:build", web::post().to(build_index))
                .route("/libraries/{library_id}/index:status", web::get().to(index_status))
                .route("/libraries/{library_id}/query", web::post().to(query_library))
                .route(
                    "/libraries/{library_id}/documents",
                    web::post().to(create_document),
                )
                .route(
                    "/libraries/{library_id}/documents",
                    web::get().to(list_documents),
                )
                .route("/documents/{document_id}", web::get().to(get_document))
                .route("/documents/{document_id}", web::patch().to(update_document))
                .route("/documents/{document_id}", web::delete().to(delete_document))
                .route(
                    "/documents/{document_id}/chunks",
                    web::post().to(create_chunk),
                )
                .route(
                    "/documents/{document_id}/chunks",
                    web::get().to(list_chunks_by_document),
                )
                .route("/chunks/{chunk_id}", web::get().to(get_chunk))
                .route("/chunks/{chunk_id}", web::patch().to(update_chunk))
                .route("/chunks/{chunk_id}", web::delete().to(delete_chunk))
                .route(
                    "/replication/snapshot",
                    web::get().to(replication_snapshot),
                ),
        );
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"status": "ok"}))
}

async fn metrics(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(state.metrics_handle.render())
}

async fn root() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "name": "vector-db",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Returns `PermissionDenied` if this node is a follower, for any handler
/// that mutates state (§6.4: "Follower rejects write requests with 403").
fn require_leader(state: &AppState) -> ApiResult<()> {
    if !state.is_leader() {
        return Err(ApiError(Error::PermissionDenied(
            "writes are rejected on a follower node".to_string(),
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------
// Libraries
// ---------------------------------------------------------------------

async fn create_library(
    state: web::Data<AppState>,
    body: web::Json<CreateLibraryRequest>,
) -> ApiResult<HttpResponse> {
    require_leader(&state)?;
    let req = body.into_inner();
    let lib = state
        .library_service
        .create(&req.name, req.embedding_dimension, req.description, req.default_index_type)
        .map_err(ApiError)?;
    Ok(HttpResponse::Created().json(LibraryResponse::from(lib)))
}

async fn list_libraries(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let libs: Vec<LibraryResponse> = state.library_service.list().into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(libs))
}

async fn get_library(state: web::Data<AppState>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let lib = state.library_service.get(&path.into_inner()).map_err(ApiError)?;
    Ok(HttpResponse::Ok().json(LibraryResponse::from(lib)))
}

async fn update_library(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateLibraryRequest>,
) -> ApiResult<HttpResponse> {
    require_leader(&state)?;
    let req = body.into_inner();
    let lib = state
        .library_service
        .update(&path.into_inner(), req.name, req.description, req.default_index_type)
        .map_err(ApiError)?;
    Ok(HttpResponse::Ok().json(LibraryResponse::from(lib)))
}

async fn delete_library(state: web::Data<AppState>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    require_leader(&state)?;
    state.library_service.delete(&path.into_inner()).map_err(ApiError)?;
    Ok(HttpResponse::NoContent().finish())
}

// ---------------------------------------------------------------------
// Index build / status
// ---------------------------------------------------------------------

async fn build_index(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<IndexBuildRequest>,
) -> ApiResult<HttpResponse> {
    require_leader(&state)?;
    let library_id = path.into_inner();
    state.library_service.get(&library_id).map_err(ApiError)?;
    let req = body.into_inner();
    let lock = state.locks.get(&library_id);
    let chunks = lock.with_read(|| state.chunk_repo.list_by_library(&library_id));
    state.index_service.build_index_async(&library_id, req.index_type, chunks);
    Ok(HttpResponse::Accepted().json(serde_json::json!({
        "status": "building",
        "index_type": req.index_type,
    })))
}

async fn index_status(state: web::Data<AppState>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let library_id = path.into_inner();
    state.library_service.get(&library_id).map_err(ApiError)?;
    let resp = IndexStatusResponse {
        index_type: state.index_service.get_index_type(&library_id),
        size: state.index_service.index_size(&library_id),
        data_version: state.versions.get(&library_id).data_version,
        index_version: state.versions.get(&library_id).index_version,
        stale: state.versions.is_stale(&library_id),
    };
    Ok(HttpResponse::Ok().json(resp))
}

// ---------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------

async fn query_library(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<QueryRequest>,
) -> ApiResult<HttpResponse> {
    let library_id = path.into_inner();
    let lib = state.library_service.get(&library_id).map_err(ApiError)?;
    let req = body.into_inner();

    let query_embedding = match req.query_embedding {
        Some(v) => v,
        None => {
            if !req.use_embedding_service {
                return Err(ApiError(Error::validation(
                    "query requires query_embedding or query_text with use_embedding_service",
                )));
            }
            let text = req.query_text.ok_or_else(|| {
                ApiError(Error::validation("query_text is required when query_embedding is absent"))
            })?;
            state.embedder.embed(&text, lib.embedding_dimension)
        }
    };

    let results = state
        .query_service
        .knn(&library_id, &query_embedding, req.k, req.filter.as_ref())
        .map_err(ApiError)?;

    let chunks = state.chunk_repo.list_by_library(&library_id);
    let by_id: std::collections::HashMap<&str, &vdb_core::model::Chunk> =
        chunks.iter().map(|c| (c.id.as_str(), c)).collect();

    let out: Vec<QueryResult> = results
        .into_iter()
        .filter_map(|(id, score)| {
            by_id.get(id.as_str()).map(|c| QueryResult {
                chunk_id: c.id.clone(),
                document_id: c.document_id.clone(),
                score,
                text: c.text.clone(),
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(out))
}

// ---------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------

async fn create_document(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<CreateDocumentRequest>,
) -> ApiResult<HttpResponse> {
    require_leader(&state)?;
    let req = body.into_inner();
    let doc = state
        .document_service
        .create(&path.into_inner(), &req.title, req.description)
        .map_err(ApiError)?;
    Ok(HttpResponse::Created().json(DocumentResponse::from(doc)))
}

async fn list_documents(state: web::Data<AppState>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let docs: Vec<DocumentResponse> = state
        .document_service
        .list_by_library(&path.into_inner())
        .map_err(ApiError)?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(HttpResponse::Ok().json(docs))
}

async fn get_document(state: web::Data<AppState>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let doc = state.document_service.get(&path.into_inner()).map_err(ApiError)?;
    Ok(HttpResponse::Ok().json(DocumentResponse::from(doc)))
}

async fn update_document(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateDocumentRequest>,
) -> ApiResult<HttpResponse> {
    require_leader(&state)?;
    let req = body.into_inner();
    let doc = state
        .document_service
        .update(&path.into_inner(), req.title, req.description)
        .map_err(ApiError)?;
    Ok(HttpResponse::Ok().json(DocumentResponse::from(doc)))
}

async fn delete_document(state: web::Data<AppState>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    require_leader(&state)?;
    state.document_service.delete(&path.into_inner()).map_err(ApiError)?;
    Ok(HttpResponse::NoContent().finish())
}

// ---------------------------------------------------------------------
// Chunks
// ---------------------------------------------------------------------

async fn create_chunk(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<CreateChunkRequest>,
) -> ApiResult<HttpResponse> {
    require_leader(&state)?;
    let document_id = path.into_inner();
    let req = body.into_inner();

    let doc = state.document_service.get(&document_id).map_err(ApiError)?;
    let lib = state.library_service.get(&doc.library_id).map_err(ApiError)?;

    let embedding = match req.embedding {
        Some(v) => v,
        None => {
            if !req.use_embedding_service {
                return Err(ApiError(Error::validation(
                    "chunk requires an embedding or use_embedding_service",
                )));
            }
            state.embedder.embed(&req.text, lib.embedding_dimension)
        }
    };

    let metadata = Metadata {
        tags: req.tags,
        author: req.author,
        ..Default::default()
    };

    let chunk = state
        .chunk_service
        .create(&lib.id, &document_id, &req.text, embedding, metadata)
        .map_err(ApiError)?;
    Ok(HttpResponse::Created().json(ChunkResponse::from(chunk)))
}

async fn list_chunks_by_document(state: web::Data<AppState>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let chunks: Vec<ChunkResponse> = state
        .chunk_service
        .list_by_document(&path.into_inner())
        .map_err(ApiError)?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(HttpResponse::Ok().json(chunks))
}

async fn get_chunk(state: web::Data<AppState>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let chunk = state.chunk_service.get(&path.into_inner()).map_err(ApiError)?;
    Ok(HttpResponse::Ok().json(ChunkResponse::from(chunk)))
}

async fn update_chunk(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateChunkRequest>,
) -> ApiResult<HttpResponse> {
    require_leader(&state)?;
    let req = body.into_inner();
    let chunk = state
        .chunk_service
        .update(&path.into_inner(), req.text, req.embedding)
        .map_err(ApiError)?;
    Ok(HttpResponse::Ok().json(ChunkResponse::from(chunk)))
}

async fn delete_chunk(state: web::Data<AppState>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    require_leader(&state)?;
    state.chunk_service.delete(&path.into_inner()).map_err(ApiError)?;
    Ok(HttpResponse::NoContent().finish())
}

// ---------------------------------------------------------------------
// Replication
// ---------------------------------------------------------------------

async fn replication_snapshot(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    if !state.is_leader() {
        return Err(ApiError(Error::PermissionDenied(
            "only the leader serves replication snapshots".to_string(),
        )));
    }
    let libraries = state.library_repo.list();
    let mut documents = Vec::new();
    let mut chunks = Vec::new();
    for lib in &libraries {
        documents.extend(state.document_repo.list_by_library(&lib.id));
        chunks.extend(state.chunk_repo.list_by_library(&lib.id));
    }
    Ok(HttpResponse::Ok().json(crate::persistence::Snapshot {
        libraries,
        documents,
        chunks,
    }))
}
