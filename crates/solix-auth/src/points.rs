//! Point reads
//!
//! Both reads are authenticated GETs whose payloads are relayed without
//! interpretation. Missing fields render as `N/A` rather than failing.

use relay::{RequestExecutor, RequestSpec};
use serde_json::Value;

use crate::constants::Endpoints;

/// Placeholder for a value the service did not return.
pub const NOT_AVAILABLE: &str = "N/A";

pub fn connection_quality_request(endpoints: &Endpoints, access_token: &str) -> RequestSpec {
    RequestSpec::get(endpoints.connection_quality()).bearer(access_token)
}

pub fn total_point_request(endpoints: &Endpoints, access_token: &str) -> RequestSpec {
    RequestSpec::get(endpoints.total_point()).bearer(access_token)
}

/// Connection quality from a response body (`data`).
pub fn connection_quality(body: &Value) -> String {
    render(body.get("data"))
}

/// Total points from a response body (`data.total`).
pub fn total_points(body: &Value) -> String {
    render(body.get("data").and_then(|data| data.get("total")))
}

fn render(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => NOT_AVAILABLE.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Read the lightweight status for one account.
pub async fn fetch_connection_quality(
    executor: &RequestExecutor,
    endpoints: &Endpoints,
    access_token: &str,
    label: &str,
) -> relay::Result<String> {
    let body: Value = executor
        .execute(&connection_quality_request(endpoints, access_token), label)
        .await?;
    Ok(connection_quality(&body))
}

/// Read the aggregate metric for one account.
pub async fn fetch_total_points(
    executor: &RequestExecutor,
    endpoints: &Endpoints,
    access_token: &str,
    label: &str,
) -> relay::Result<String> {
    let body: Value = executor
        .execute(&total_point_request(endpoints, access_token), label)
        .await?;
    Ok(total_points(&body))
}
