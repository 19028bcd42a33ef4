//! The uniform response wrapper returned by every endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Status token carried in the envelope next to the numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Ok,
    Error,
    BadRequest,
    Unauthorized,
    NotFound,
    MethodNotAllowed,
    InternalServerError,
}

/// Numeric code carried in the envelope. Mirrors the HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum Code {
    Ok,
    Created,
    BadRequest,
    Unauthorized,
    NotFound,
    MethodNotAllowed,
    InternalServerError,
}

impl Code {
    /// Returns the numeric HTTP status.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Created => 201,
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::NotFound => 404,
            Self::MethodNotAllowed => 405,
            Self::InternalServerError => 500,
        }
    }

    /// Returns the status token that conventionally accompanies this code.
    #[must_use]
    pub const fn status(self) -> Status {
        match self {
            Self::Ok | Self::Created => Status::Ok,
            Self::BadRequest => Status::BadRequest,
            Self::Unauthorized => Status::Unauthorized,
            Self::NotFound => Status::NotFound,
            Self::MethodNotAllowed => Status::MethodNotAllowed,
            Self::InternalServerError => Status::InternalServerError,
        }
    }
}

impl From<Code> for u16 {
    fn from(code: Code) -> Self {
        code.as_u16()
    }
}

impl TryFrom<u16> for Code {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            200 => Ok(Self::Ok),
            201 => Ok(Self::Created),
            400 => Ok(Self::BadRequest),
            401 => Ok(Self::Unauthorized),
            404 => Ok(Self::NotFound),
            405 => Ok(Self::MethodNotAllowed),
            500 => Ok(Self::InternalServerError),
            other => Err(format!("unsupported response code {other}")),
        }
    }
}

/// `{ code, status, data }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub code: Code,
    pub status: Status,
    pub data: JsonValue,
}

impl Envelope {
    /// Creates an envelope with the status token implied by `code`.
    #[must_use]
    pub fn new(code: Code, data: impl Into<JsonValue>) -> Self {
        Self {
            code,
            status: code.status(),
            data: data.into(),
        }
    }

    /// `200 OK` carrying `data`.
    #[must_use]
    pub fn ok(data: impl Into<JsonValue>) -> Self {
        Self::new(Code::Ok, data)
    }

    /// `400 BAD_REQUEST` carrying a reason.
    #[must_use]
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::new(Code::BadRequest, reason.into())
    }

    /// `401 UNAUTHORIZED` carrying a reason.
    #[must_use]
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::new(Code::Unauthorized, reason.into())
    }

    /// `404 NOT_FOUND` carrying a reason.
    #[must_use]
    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::new(Code::NotFound, reason.into())
    }

    /// `405 METHOD_NOT_ALLOWED` carrying a reason.
    #[must_use]
    pub fn method_not_allowed(reason: impl Into<String>) -> Self {
        Self::new(Code::MethodNotAllowed, reason.into())
    }

    /// `500 INTERNAL_SERVER_ERROR` carrying the error detail.
    #[must_use]
    pub fn internal_error(detail: impl Into<String>) -> Self {
        Self::new(Code::InternalServerError, detail.into())
    }

    /// Returns true for the `2xx` codes.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.code, Code::Ok | Code::Created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ok_envelope_wire_format() {
        let envelope = Envelope::ok("hello");
        let json = serde_json::to_value(&envelope).expect("serialize");
        assert_eq!(json, json!({"code": 200, "status": "OK", "data": "hello"}));
    }

    #[test]
    fn error_envelope_uses_screaming_status() {
        let envelope = Envelope::internal_error("remote exploded");
        let json = serde_json::to_value(&envelope).expect("serialize");
        assert_eq!(json["code"], 500);
        assert_eq!(json["status"], "INTERNAL_SERVER_ERROR");
        assert!(!envelope.is_success());
    }

    #[test]
    fn method_not_allowed_wire_format() {
        let json = serde_json::to_value(Envelope::method_not_allowed("use POST")).expect("serialize");
        assert_eq!(
            json,
            json!({"code": 405, "status": "METHOD_NOT_ALLOWED", "data": "use POST"})
        );
    }

    #[test]
    fn null_data_is_allowed() {
        let envelope = Envelope::ok(JsonValue::Null);
        let json = serde_json::to_string(&envelope).expect("serialize");
        assert_eq!(json, r#"{"code":200,"status":"OK","data":null}"#);
    }

    #[test]
    fn unknown_code_is_rejected() {
        let result: Result<Envelope, _> =
            serde_json::from_str(r#"{"code":418,"status":"ERROR","data":null}"#);
        assert!(result.is_err());
    }

    #[test]
    fn parses_own_output() {
        let parsed: Envelope =
            serde_json::from_str(r#"{"code":404,"status":"NOT_FOUND","data":"no thread"}"#)
                .expect("deserialize");
        assert_eq!(parsed, Envelope::not_found("no thread"));
    }
}
