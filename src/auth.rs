//! Auth Filter
//!
//! A single process-wide expected token, compared against each
//! request's `token` header. Stateless: no sessions, no lockouts.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;

#[derive(Clone)]
pub struct ExpectedToken(pub String);

pub async fn require_token(
    State(expected): State<ExpectedToken>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let supplied = req
        .headers()
        .get("token")
        .and_then(|v| v.to_str().ok());

    match supplied {
        Some(token) if token == expected.0 => Ok(next.run(req).await),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_token_wraps_a_string() {
        let expected = ExpectedToken("abc".to_string());
        assert_eq!(expected.0, "abc");
    }
}
