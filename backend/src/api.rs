use crate::errors::ApiError;
use crate::models::*;
use crate::registry;
use crate::state::AppState;
use crate::db;
use axum::{
    extract::{rejection::JsonRejection, Path, Request, State},
    http::HeaderMap,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use chrono::Utc;
use melody_zk::api::{prove_request, verify_request, ProofRequest, ProofResponse, VerifyRequest};
use melody_zk::constants::NUM_PUBLIC_INPUTS;
use melody_zk::error::InputError;
use melody_zk::{Commitment, Melody, MelodyVerifyingKey, Salt, ZkError};
use rand::rngs::OsRng;
use tower_http::cors::{Any, CorsLayer};

pub fn router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/api/v1/proofs", post(create_proof))
        .route("/api/v1/melodies", post(register_melody))
        .route("/api/v1/melodies/:commitment/transfer", post(transfer_melody))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/v1/zk/vk", get(get_vk))
        .route("/api/v1/commitments", post(create_commitment))
        .route("/api/v1/verify", post(verify_proof))
        .route("/api/v1/melodies/:commitment", get(get_melody))
        .route("/api/v1/owners/:owner/melodies", get(list_owner_melodies))
        .merge(protected_routes)
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(provided_key) = headers.get("X-API-KEY") {
        if provided_key.as_bytes() == state.api_key.as_bytes() {
            return Ok(next.run(request).await);
        }
    }

    tracing::warn!("unauthorized access attempt");
    Err(ApiError::Unauthorized)
}

fn parse_commitment(raw: &str) -> Result<Commitment, ApiError> {
    Commitment::parse(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}

fn parse_owner(raw: &str) -> Result<Owner, ApiError> {
    Owner::parse(raw).map_err(ApiError::BadRequest)
}

/// The commitment a proof speaks about: the single public input.
fn commitment_from_inputs(public_inputs: &[melody_zk::Scalar]) -> Result<Commitment, ApiError> {
    match public_inputs {
        [h] => Ok(Commitment::from_scalar(*h)),
        other => Err(ZkError::from(InputError::PublicInputCount {
            expected: NUM_PUBLIC_INPUTS,
            got: other.len(),
        })
        .into()),
    }
}

async fn get_vk(State(state): State<AppState>) -> Result<Json<ZkVkResponse>, ApiError> {
    let vk_bytes = state.keys.verifying_key().to_artifact()?;

    Ok(Json(ZkVkResponse {
        curve: "bn254".to_string(),
        proof_system: "groth16".to_string(),
        circuit_digest: state.keys.digest().to_string(),
        vk_b64: base64::engine::general_purpose::STANDARD.encode(vk_bytes),
    }))
}

async fn create_commitment(payload: Result<Json<CommitmentRequest>, JsonRejection>) -> Result<Json<CommitmentResponse>, ApiError> {
    let Json(req) = payload?;
    let notes = req
        .notes
        .iter()
        .map(NoteInput::to_midi)
        .collect::<Result<Vec<_>, _>>()
        .map_err(ZkError::from)?;
    let melody = Melody::from_slice(&notes).map_err(ZkError::from)?;

    let salt = match req.salt.as_deref() {
        Some(raw) => Salt::parse(raw).map_err(ZkError::from)?,
        None => Salt::generate(&mut OsRng),
    };

    let commitment = melody_zk::compute_commitment(&melody, &salt);

    Ok(Json(CommitmentResponse {
        commitment: commitment.to_string(),
        salt: salt.expose_decimal(),
    }))
}

async fn create_proof(State(state): State<AppState>, payload: Result<Json<ProofRequest>, JsonRejection>) -> Result<Json<ProofResponse>, ApiError> {
    let Json(req) = payload?;
    let keys = state.keys.clone();

    // Proving is CPU-bound; keep it off the async workers.
    let resp = tokio::task::spawn_blocking(move || prove_request(&keys, &req, &mut OsRng))
        .await
        .map_err(|_| ApiError::Internal)??;

    Ok(Json(resp))
}

async fn verify_proof(State(state): State<AppState>, payload: Result<Json<VerifyHttpRequest>, JsonRejection>) -> Result<Json<VerifyResponse>, ApiError> {
    let Json(req) = payload?;
    let supplied_vk = match req.vk_b64.as_deref() {
        Some(b64) => {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(b64)
                .map_err(|_| ApiError::BadRequest("invalid vk_b64".to_string()))?;
            Some(MelodyVerifyingKey::from_artifact(&bytes, state.keys.digest()).map_err(ZkError::from)?)
        }
        None => None,
    };
    let vk = supplied_vk.as_ref().unwrap_or_else(|| state.keys.verifying_key());

    let ok = verify_request(
        vk,
        &VerifyRequest {
            public_inputs: req.public_inputs,
            proof: req.proof,
        },
    )?;

    Ok(Json(VerifyResponse { ok }))
}

async fn register_melody(State(state): State<AppState>, payload: Result<Json<RegisterRequest>, JsonRejection>) -> Result<Json<MelodyRecord>, ApiError> {
    let Json(req) = payload?;
    let commitment = commitment_from_inputs(&req.public_inputs)?;

    let proof_valid = verify_request(
        state.keys.verifying_key(),
        &VerifyRequest {
            public_inputs: req.public_inputs,
            proof: req.proof,
        },
    )?;

    let record = registry::register(&state.db, &commitment, proof_valid, &req.owner, Utc::now()).await?;
    Ok(Json(record))
}

async fn get_melody(State(state): State<AppState>, Path(raw): Path<String>) -> Result<Json<MelodyDetailResponse>, ApiError> {
    let commitment = parse_commitment(&raw)?;

    let Some(record) = registry::lookup(&state.db, &commitment).await? else {
        return Err(ApiError::NotFound("melody not registered".to_string()));
    };
    let transfers = db::count_transfers(&state.db, &record.commitment).await?;

    Ok(Json(MelodyDetailResponse { record, transfers }))
}

async fn list_owner_melodies(State(state): State<AppState>, Path(raw): Path<String>) -> Result<Json<OwnerMelodiesResponse>, ApiError> {
    let owner = parse_owner(&raw)?;
    let commitments = registry::list_by_owner(&state.db, &owner).await?;

    Ok(Json(OwnerMelodiesResponse {
        owner,
        count: commitments.len() as u64,
        commitments,
    }))
}

async fn transfer_melody(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<Json<TransferRecord>, ApiError> {
    let Json(req) = payload?;
    let commitment = parse_commitment(&raw)?;
    let record = registry::transfer(&state.db, &commitment, &req.from, &req.to, Utc::now()).await?;
    Ok(Json(record))
}
