//! Password login
//!
//! `POST /api/auth/login-password` with the account's email and password.
//! A response only counts as a login when `result == "success"` and both
//! tokens are present; anything else is a malformed response.

use relay::{RequestExecutor, RequestSpec};
use serde::Deserialize;

use crate::constants::Endpoints;
use crate::credentials::AccountCredential;
use crate::session::TokenPair;

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    data: Option<LoginData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginData {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Build the login request for `credential`.
pub fn login_request(endpoints: &Endpoints, credential: &AccountCredential) -> RequestSpec {
    RequestSpec::post_json(
        endpoints.login(),
        serde_json::json!({
            "email": credential.identity,
            "password": credential.secret.expose(),
            "referralByCode": "",
            "captchaToken": "",
        }),
    )
}

/// Log in one account and return its token pair.
///
/// Errors are the executor's; a 401 surfaces as `relay::Error::Unauthorized`.
pub async fn login(
    executor: &RequestExecutor,
    endpoints: &Endpoints,
    credential: &AccountCredential,
) -> relay::Result<TokenPair> {
    let spec = login_request(endpoints, credential);
    let response: LoginResponse = executor.execute(&spec, &credential.label()).await?;
    token_pair(response)
}

fn token_pair(response: LoginResponse) -> relay::Result<TokenPair> {
    if response.result.as_deref() != Some("success") {
        return Err(relay::Error::MalformedResponse(format!(
            "login result was {:?}, expected \"success\"",
            response.result
        )));
    }
    let data = response
        .data
        .ok_or_else(|| relay::Error::MalformedResponse("login response has no data".into()))?;
    match (data.access_token, data.refresh_token) {
        (Some(access_token), Some(refresh_token))
            if !access_token.is_empty() && !refresh_token.is_empty() =>
        {
            Ok(TokenPair {
                access_token,
                refresh_token,
            })
        }
        _ => Err(relay::Error::MalformedResponse(
            "login response is missing a token".into(),
        )),
    }
}
