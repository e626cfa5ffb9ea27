use crate::config::RequestContext;
use crate::{checks, query, rate_limit};
use std::sync::Arc;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use volley::http::Client;
use volley::prelude::*;

/// Tag attached to every request, reported as `http_req_duration{name:BusinessAbilitiesQuery}`.
pub const REQUEST_NAME: &str = "BusinessAbilitiesQuery";

/// Fraction of iterations in which at least one check failed.
pub const ERRORS: &str = "errors";

#[scenario]
pub async fn business_abilities(ctx: Arc<RequestContext>, client: Client) {
    let body = match query::request_body() {
        Ok(body) => body,
        Err(err) => {
            error!("Failed to serialize the GraphQL request: {err}");
            metric::rate(ERRORS, true);
            return;
        }
    };

    let response = client
        .post(&ctx.endpoint())
        .header("Content-Type", "application/json")
        .header("Authorization", &format!("Bearer {}", ctx.auth_token))
        .header("X-Staff-Id", &ctx.staff_id)
        .name(REQUEST_NAME)
        .body(body)
        .send()
        .await;

    if let Some(err) = &response.error {
        debug!("Request failed: {err}");
    }

    let success = checks::evaluate(&response).record();
    metric::rate(ERRORS, !success);

    rate_limit::inspect(&response);

    if let Some(pause) = ctx.pause {
        tokio::time::sleep(pause).await;
    }
}
