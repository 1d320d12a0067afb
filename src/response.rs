use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::error;
use mongodb::bson::{self, Document};
use serde::Serialize;
use thiserror::Error;

/// Every response body is `{message, data}`. Error paths carry `""` as data.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub message: String,
    pub data: T,
}

pub fn ok<T: Serialize>(message: &str, data: T) -> HttpResponse {
    HttpResponse::Ok().json(Envelope {
        message: message.to_string(),
        data,
    })
}

pub fn created<T: Serialize>(message: &str, data: T) -> HttpResponse {
    HttpResponse::Created().json(Envelope {
        message: message.to_string(),
        data,
    })
}

/// Mongo hands `_id` back as a native ObjectId; the API speaks plain hex
/// strings, so response documents get theirs rewritten.
pub fn with_string_id(mut document: Document) -> Document {
    if let Ok(oid) = document.get_object_id("_id") {
        document.insert("_id", oid.to_hex());
    }
    document
}

/// Serializes a stored entity for the wire, `_id` included as hex.
pub fn entity_document<T: Serialize>(entity: &T) -> Result<Document, ApiError> {
    Ok(with_string_id(bson::to_document(entity)?))
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    MalformedParameter(&'static str),
    #[error("{0}")]
    ValidationFailed(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("server error")]
    Store(#[from] mongodb::error::Error),
    #[error("server error")]
    Encode(#[from] bson::ser::Error),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MalformedParameter(_) | ApiError::ValidationFailed(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store(_) | ApiError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::Store(err) => error!("store error: {}", err),
            ApiError::Encode(err) => error!("encode error: {}", err),
            _ => {}
        }
        HttpResponse::build(self.status_code()).json(Envelope {
            message: self.to_string(),
            data: "",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, oid::ObjectId};

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(
            ApiError::MalformedParameter("invalid request parameter").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::ValidationFailed("invalid new task").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound("task not found").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Store(mongodb::error::Error::custom("connection reset")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn store_errors_hide_internal_detail() {
        let err = ApiError::Store(mongodb::error::Error::custom("E11000 duplicate key"));
        assert_eq!(err.to_string(), "server error");
    }

    #[test]
    fn envelope_serializes_message_and_data() {
        let value = serde_json::to_value(Envelope {
            message: "OK".to_string(),
            data: 7,
        })
        .unwrap();
        assert_eq!(value["message"], "OK");
        assert_eq!(value["data"], 7);
    }

    #[test]
    fn object_ids_become_hex_strings() {
        let oid = ObjectId::new();
        let document = with_string_id(doc! { "_id": oid, "name": "file taxes" });
        assert_eq!(document.get_str("_id").unwrap(), oid.to_hex());
    }

    #[test]
    fn documents_without_object_id_pass_through() {
        let document = with_string_id(doc! { "name": "file taxes" });
        assert!(document.get("_id").is_none());
    }
}
