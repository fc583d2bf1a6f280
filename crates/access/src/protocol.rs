// Path: crates/access/src/protocol.rs

//! The issuance protocol round-trip.
//!
//! A single round-trip completes in order setup → request → issue →
//! process. The functions here drive the registered handlers on either
//! side; the HTTPS transport between them lives in the account crate. The
//! session id exists for the issuer's benefit only: it keys the signer
//! state retained between the two phases, and the client never persists
//! it.

use crate::zones::Registry;
use veil_api::handler::{BlindBatchOps, HashBatchOps, TokenHandler};
use veil_crypto::rng::random_bytes32;
use veil_types::error::AccessError;
use veil_types::protocol::{
    HashTokenRequest, IssuedTokens, SetupRequest, SetupResponse, TokenRequest,
};

/// Client: collects the blind zones whose handlers want a fresh batch.
///
/// Returns the request and whether any handler opted in; when none did,
/// the setup phase of the round-trip is skipped entirely.
pub fn create_setup_request(registry: &Registry) -> (SetupRequest, bool) {
    let mut request = SetupRequest::default();
    for handler in registry.blind_zones() {
        if handler.should_request() {
            request.blind_zones.insert(handler.zone().to_string());
        }
    }
    let setup_required = !request.blind_zones.is_empty();
    (request, setup_required)
}

/// Issuer: answers a setup request with a fresh session id and per-zone
/// signer batches.
pub fn handle_setup_request(
    registry: &Registry,
    request: &SetupRequest,
) -> Result<SetupResponse, AccessError> {
    let session_id = bs58::encode(random_bytes32()?).into_string();
    let mut response = SetupResponse {
        session_id: session_id.clone(),
        ..Default::default()
    };
    for zone in &request.blind_zones {
        let handler = registry
            .blind_zone(zone)
            .ok_or_else(|| AccessError::ZoneUnknown(zone.clone()))?;
        let setup = handler.create_setup(&session_id)?;
        response.blind_setups.insert(zone.clone(), setup);
    }
    Ok(response)
}

/// Client: builds the token request from an optional setup response plus
/// the hash zones that want a refill.
///
/// Returns the request and whether it carries anything worth sending.
pub fn create_token_request(
    registry: &Registry,
    setup: Option<&SetupResponse>,
) -> Result<(TokenRequest, bool), AccessError> {
    let mut request = TokenRequest::default();

    if let Some(setup) = setup {
        request.session_id = setup.session_id.clone();
        for (zone, batch) in &setup.blind_setups {
            let handler = registry
                .blind_zone(zone)
                .ok_or_else(|| AccessError::ZoneUnknown(zone.clone()))?;
            let blind_request = handler.create_token_request(batch)?;
            request.blind_requests.insert(zone.clone(), blind_request);
        }
    }

    for handler in registry.hash_zones() {
        if handler.should_request() {
            request
                .hash_requests
                .insert(handler.zone().to_string(), HashTokenRequest {});
        }
    }

    let request_required = !request.blind_requests.is_empty() || !request.hash_requests.is_empty();
    Ok((request, request_required))
}

/// Issuer: advances every requested zone and collects the issued batches.
pub fn issue_tokens(
    registry: &Registry,
    request: &TokenRequest,
) -> Result<IssuedTokens, AccessError> {
    let mut issued = IssuedTokens::default();

    for (zone, batch) in &request.blind_requests {
        let handler = registry
            .blind_zone(zone)
            .ok_or_else(|| AccessError::ZoneUnknown(zone.clone()))?;
        let batch_issued = handler.issue_tokens(&request.session_id, batch)?;
        issued.blind_issued.insert(zone.clone(), batch_issued);
    }

    for zone in request.hash_requests.keys() {
        let handler = registry
            .hash_zone(zone)
            .ok_or_else(|| AccessError::ZoneUnknown(zone.clone()))?;
        let preimages = handler
            .issue_tokens()?
            .into_iter()
            .map(serde_bytes::ByteBuf::from)
            .collect();
        issued.hash_issued.insert(zone.clone(), preimages);
    }

    Ok(issued)
}

/// Client: dispatches every issued batch to its zone handler, propagating
/// the first error.
pub fn process_issued_tokens(
    registry: &Registry,
    issued: &IssuedTokens,
) -> Result<(), AccessError> {
    for (zone, batch) in &issued.blind_issued {
        let handler = registry
            .blind_zone(zone)
            .ok_or_else(|| AccessError::ZoneUnknown(zone.clone()))?;
        handler.process_issued_tokens(batch)?;
    }

    for (zone, preimages) in &issued.hash_issued {
        let handler = registry
            .hash_zone(zone)
            .ok_or_else(|| AccessError::ZoneUnknown(zone.clone()))?;
        let preimages: Vec<Vec<u8>> = preimages.iter().map(|p| p.to_vec()).collect();
        handler.process_issued_tokens(&preimages)?;
    }

    Ok(())
}
