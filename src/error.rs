use std::error::Error as StdError;
use std::fmt::{Debug, Display};
use std::io::Error as IoError;

use actix_web::error::PathError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use chrono::{DateTime, Utc};
use derivative::Derivative;
use mongodb::bson::ser::Error as BsonError;
use mongodb::error::Error as DatabaseError;
use reqwest::Error as DispatchError;
use serde::{Serialize, Serializer};
use serde_json::Error as JsonError;

use crate::campaign::{CampaignId, CampaignStatus};
use crate::decode::{DecodeError, MalformedRequest};
use crate::query::EntityKind;

#[derive(Debug, Serialize, Derivative)]
#[derivative(PartialEq)]
#[serde(untagged)]
pub enum Error {
    // 400, 413, 415, 422 as carried by the request
    #[serde(serialize_with = "display")]
    MalformedRequest(MalformedRequest),

    // 400
    #[serde(serialize_with = "display")]
    InvalidPath(#[derivative(PartialEq = "ignore")] PathError),
    UnknownQueryField {
        entity: EntityKind,
        field: String,
    },
    InvalidQueryValue {
        field: String,
        reason: String,
    },

    // 404
    PathNotFound,
    CampaignNotFound {
        campaign_id: CampaignId,
    },
    NoCampaignMatchesQuery,

    // 409
    ConcurrentModificationDetected,
    InvalidStatusTransition {
        campaign_id: CampaignId,
        from: CampaignStatus,
        to: CampaignStatus,
    },
    AmbiguousCampaignQuery,

    // 422
    MissingRequiredField {
        field: &'static str,
    },
    InvalidCampaignWindow {
        not_before: DateTime<Utc>,
        not_after: DateTime<Utc>,
    },

    // 500
    ExistentialState(String),
    #[serde(serialize_with = "display")]
    UnclassifiedDecode(#[derivative(PartialEq = "ignore")] Box<dyn StdError + Send + Sync>),
    #[serde(serialize_with = "display")]
    FailedDatabaseCall(#[derivative(PartialEq = "ignore")] DatabaseError),
    #[serde(serialize_with = "display")]
    FailedToSerializeToBson(#[derivative(PartialEq = "ignore")] BsonError),
    #[serde(serialize_with = "display")]
    FailedToSerializeToJson(#[derivative(PartialEq = "ignore")] JsonError),
    #[serde(serialize_with = "display")]
    FailedDispatch(#[derivative(PartialEq = "ignore")] DispatchError),
    DispatchRejected {
        campaign_id: CampaignId,
        status: u16,
    },
    #[serde(serialize_with = "display")]
    IoError(#[derivative(PartialEq = "ignore")] IoError),
}

impl Error {
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::MalformedRequest(_) => "E4001000",
            Error::InvalidPath(_) => "E4001001",
            Error::UnknownQueryField { .. } => "E4001002",
            Error::InvalidQueryValue { .. } => "E4001003",
            Error::PathNotFound => "E4041000",
            Error::CampaignNotFound { .. } => "E4041001",
            Error::NoCampaignMatchesQuery => "E4041002",
            Error::ConcurrentModificationDetected => "E4091000",
            Error::InvalidStatusTransition { .. } => "E4091001",
            Error::AmbiguousCampaignQuery => "E4091002",
            Error::MissingRequiredField { .. } => "E4221000",
            Error::InvalidCampaignWindow { .. } => "E4221001",
            Error::ExistentialState(_) => "E5001000",
            Error::UnclassifiedDecode(_) => "E5001001",
            Error::FailedDatabaseCall(_) => "E5001002",
            Error::FailedToSerializeToBson(_) => "E5001003",
            Error::FailedToSerializeToJson(_) => "E5001004",
            Error::FailedDispatch(_) => "E5001005",
            Error::DispatchRejected { .. } => "E5001006",
            Error::IoError(_) => "E5001007",
        }
    }

    pub fn error_message(&self) -> &'static str {
        match self {
            Error::MalformedRequest(_) => "The request body could not be decoded",
            Error::InvalidPath(_) => "The given path could not be parsed",
            Error::UnknownQueryField { .. } => "The query references a field that does not exist",
            Error::InvalidQueryValue { .. } => "The query contains an invalid filter value",
            Error::PathNotFound => "The requested path was not found",
            Error::CampaignNotFound { .. } => "The requested campaign was not found",
            Error::NoCampaignMatchesQuery => "No campaign matches the given query",
            Error::ConcurrentModificationDetected => {
                "The server detected a concurrent modification"
            }
            Error::InvalidStatusTransition { .. } => {
                "The requested status is not reachable from the campaign's current status"
            }
            Error::AmbiguousCampaignQuery => "More than one campaign matches the given query",
            Error::MissingRequiredField { .. } => "A required field is missing or empty",
            Error::InvalidCampaignWindow { .. } => "The campaign window ends before it begins",
            Error::ExistentialState(_) => "The server detected an invalid state",
            Error::UnclassifiedDecode(_) => "An unexpected error occurred while reading the request",
            Error::FailedDatabaseCall(_) => {
                "An error occurred when communicating with the database"
            }
            Error::FailedToSerializeToBson(_) => {
                "An error occurred when serializing an object to bson"
            }
            Error::FailedToSerializeToJson(_) => {
                "An error occurred when serializing an object to json"
            }
            Error::FailedDispatch(_) => "An error occurred when contacting the dispatch service",
            Error::DispatchRejected { .. } => "The dispatch service rejected the campaign",
            Error::IoError(_) => "An error occurred during an I/O operation",
        }
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::MalformedRequest(request) => request.status_code(),
            Error::InvalidPath(_) => StatusCode::BAD_REQUEST,
            Error::UnknownQueryField { .. } => StatusCode::BAD_REQUEST,
            Error::InvalidQueryValue { .. } => StatusCode::BAD_REQUEST,
            Error::PathNotFound => StatusCode::NOT_FOUND,
            Error::CampaignNotFound { .. } => StatusCode::NOT_FOUND,
            Error::NoCampaignMatchesQuery => StatusCode::NOT_FOUND,
            Error::ConcurrentModificationDetected => StatusCode::CONFLICT,
            Error::InvalidStatusTransition { .. } => StatusCode::CONFLICT,
            Error::AmbiguousCampaignQuery => StatusCode::CONFLICT,
            Error::MissingRequiredField { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::InvalidCampaignWindow { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::ExistentialState(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::UnclassifiedDecode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::FailedDatabaseCall(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::FailedToSerializeToBson(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::FailedToSerializeToJson(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::FailedDispatch(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::DispatchRejected { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        #[derive(Serialize)]
        struct Dummy<'a> {
            error_code: &'static str,
            error_message: &'static str,
            #[serde(skip_serializing_if = "Option::is_none")]
            error_meta: Option<&'a Error>,
        }

        let status = self.status_code();

        // internal details stay in the log
        let error_meta = if status.is_server_error() {
            tracing::error!(error_code = self.error_code(), "request failed: {}", self);
            None
        } else {
            Some(self)
        };

        HttpResponse::build(status).json(&Dummy {
            error_code: self.error_code(),
            error_message: self.error_message(),
            error_meta,
        })
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        Debug::fmt(self, f)
    }
}

impl From<DecodeError> for Error {
    fn from(error: DecodeError) -> Error {
        match error {
            DecodeError::Malformed(request) => Error::MalformedRequest(request),
            DecodeError::Unclassified(err) => Error::UnclassifiedDecode(err),
        }
    }
}

impl From<MalformedRequest> for Error {
    fn from(error: MalformedRequest) -> Error {
        Error::MalformedRequest(error)
    }
}

impl From<DatabaseError> for Error {
    fn from(error: DatabaseError) -> Error {
        Error::FailedDatabaseCall(error)
    }
}

impl From<BsonError> for Error {
    fn from(error: BsonError) -> Error {
        Error::FailedToSerializeToBson(error)
    }
}

impl From<JsonError> for Error {
    fn from(error: JsonError) -> Error {
        Error::FailedToSerializeToJson(error)
    }
}

impl From<DispatchError> for Error {
    fn from(error: DispatchError) -> Error {
        Error::FailedDispatch(error)
    }
}

impl From<IoError> for Error {
    fn from(error: IoError) -> Error {
        Error::IoError(error)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::MalformedRequest(err) => Some(err),
            Error::InvalidPath(err) => Some(err),
            Error::UnclassifiedDecode(err) => Some(err.as_ref()),
            Error::FailedDatabaseCall(err) => Some(err),
            Error::FailedToSerializeToBson(err) => Some(err),
            Error::FailedToSerializeToJson(err) => Some(err),
            Error::FailedDispatch(err) => Some(err),
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

fn display<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Display,
    S: Serializer,
{
    serializer.collect_str(value)
}

#[cfg(test)]
mod tests {
    use actix_web::body::to_bytes;

    use super::*;

    #[actix_web::test]
    async fn malformed_request_keeps_its_status_and_message() {
        let error: Error = MalformedRequest::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Request body contains unknown field \"Bogus\"",
        )
        .into();

        let response = error.error_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = to_bytes(response.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error_code"], "E4001000");
        assert_eq!(
            body["error_meta"],
            "Request body contains unknown field \"Bogus\""
        );
    }

    #[actix_web::test]
    async fn server_errors_do_not_leak_details() {
        let error = Error::ExistentialState("campaign counter vanished".into());

        let response = error.error_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error_code"], "E5001000");
        assert!(body.get("error_meta").is_none());
        assert!(!body.to_string().contains("counter"));
    }

    #[test]
    fn invalid_transition_is_a_conflict() {
        let error = Error::InvalidStatusTransition {
            campaign_id: CampaignId::new(1),
            from: CampaignStatus::Pending,
            to: CampaignStatus::Completed,
        };
        assert_eq!(error.status_code(), StatusCode::CONFLICT);
        let meta = serde_json::to_value(&error).unwrap();
        assert_eq!(meta["from"], "Pending");
        assert_eq!(meta["to"], "Completed");
        assert_eq!(meta["campaign_id"], 1);
    }
}
