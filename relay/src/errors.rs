use appwrite::AppwriteError;
use http::StatusCode;
use hyper::Response;
use shared::http::{ResponseBody, json_response};

use crate::protocol::ErrorResponse;

/// Errors that can occur while serving relay requests.
///
/// `UpstreamPartialFailure` and `NotificationUnavailable` never reach the
/// caller of the fetch endpoint; they are logged and only show up as reduced
/// counts in an otherwise successful response.
#[derive(thiserror::Error, Debug)]
pub enum RelayError {
    #[error("{0}")]
    BadRequest(String),

    #[error(
        "Invalid API key or insufficient permissions. Make sure your API key has 'sites.read' scope."
    )]
    Unauthorized,

    #[error("Project not found or no sites available.")]
    NotFound,

    #[error("Failed to fetch deployments for site {site_id}: {reason}")]
    UpstreamPartialFailure { site_id: String, reason: String },

    #[error("Messaging tool is not connected")]
    NotificationUnavailable,

    #[error("No route matched for request")]
    NoRouteMatched,

    #[error("{0}")]
    InternalError(String),

    #[error("Failed to load email templates: {0}")]
    Templates(#[from] handlebars::TemplateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    /// Maps a failure of the initial site listing to the caller-facing error.
    pub fn from_site_listing(err: AppwriteError) -> Self {
        match err.status() {
            Some(StatusCode::UNAUTHORIZED) => RelayError::Unauthorized,
            Some(StatusCode::NOT_FOUND) => RelayError::NotFound,
            _ => RelayError::InternalError(format!("Failed to fetch site deployments: {err}")),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::Unauthorized => StatusCode::UNAUTHORIZED,
            RelayError::NotFound | RelayError::NoRouteMatched => StatusCode::NOT_FOUND,
            RelayError::UpstreamPartialFailure { .. }
            | RelayError::NotificationUnavailable
            | RelayError::InternalError(_)
            | RelayError::Templates(_)
            | RelayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_response(self) -> Response<ResponseBody> {
        json_response(self.status_code(), &ErrorResponse::new(self.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(status: StatusCode) -> AppwriteError {
        AppwriteError::Status {
            status,
            message: "upstream says no".into(),
        }
    }

    #[test]
    fn test_from_site_listing() {
        assert!(matches!(
            RelayError::from_site_listing(status_error(StatusCode::UNAUTHORIZED)),
            RelayError::Unauthorized
        ));
        assert!(matches!(
            RelayError::from_site_listing(status_error(StatusCode::NOT_FOUND)),
            RelayError::NotFound
        ));

        let err = RelayError::from_site_listing(status_error(StatusCode::BAD_GATEWAY));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(
            err.to_string()
                .starts_with("Failed to fetch site deployments:")
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            RelayError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(RelayError::NoRouteMatched.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            RelayError::NotificationUnavailable.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unauthorized_message_mentions_scope() {
        assert!(RelayError::Unauthorized.to_string().contains("'sites.read' scope"));
    }
}
