//! Uniform result envelope shared by every operation and the dispatcher.
//!
//! On the wire an envelope is a JSON object with a numeric `statusCode`
//! plus exactly one of `data` (success) or `error` (failure). A success
//! without a payload omits `data` entirely. The codes are domain codes
//! embedded in the body; they are not HTTP status codes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Domain status code of a successful outcome.
pub const SUCCESS_CODE: i64 = 0;

/// Failure taxonomy carried by a non-success [`Envelope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Any failure that is not a lookup miss: the operation returned an
    /// error or panicked, a collaborator failed, or the input was malformed.
    Unknown,
    /// The namespace segment of the path matched no registered namespace.
    ControllerNotFound,
    /// The namespace exists but has no operation with the requested name.
    ServiceNotFound,
}

impl ErrorKind {
    /// Numeric domain code written into `statusCode`.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Unknown => 1,
            Self::ControllerNotFound => 2,
            Self::ServiceNotFound => 3,
        }
    }

    /// Maps a domain code back to its kind. `SUCCESS_CODE` and unassigned
    /// codes yield `None`.
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Unknown),
            2 => Some(Self::ControllerNotFound),
            3 => Some(Self::ServiceNotFound),
            _ => None,
        }
    }

    /// Message used when a failure of this kind carries no explicit text.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::Unknown => "Something went wrong",
            Self::ControllerNotFound => "Controller not found",
            Self::ServiceNotFound => "Service not found",
        }
    }
}

/// Outcome of an operation: either a success with an optional payload or a
/// typed failure with a human-readable message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireEnvelope", into = "WireEnvelope")]
pub enum Envelope {
    /// The operation completed. `None` means "no payload".
    Success { data: Option<Value> },
    /// The operation failed.
    Failure { kind: ErrorKind, message: String },
}

impl Envelope {
    /// Success carrying `data`. A JSON `null` payload is treated as no payload.
    #[must_use]
    pub fn success(data: Value) -> Self {
        let data = if data.is_null() { None } else { Some(data) };
        Self::Success { data }
    }

    /// Success without a payload.
    #[must_use]
    pub const fn empty() -> Self {
        Self::Success { data: None }
    }

    /// Success carrying the JSON form of `value`.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if `value` cannot be represented as JSON.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::success)
    }

    /// Failure of the given kind.
    #[must_use]
    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
        }
    }

    /// `Unknown` failure carrying `message`.
    #[must_use]
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::failure(ErrorKind::Unknown, message)
    }

    #[must_use]
    pub fn controller_not_found() -> Self {
        let kind = ErrorKind::ControllerNotFound;
        Self::failure(kind, kind.default_message())
    }

    #[must_use]
    pub fn service_not_found() -> Self {
        let kind = ErrorKind::ServiceNotFound;
        Self::failure(kind, kind.default_message())
    }

    /// The `statusCode` this envelope serializes with.
    #[must_use]
    pub const fn status_code(&self) -> i64 {
        match self {
            Self::Success { .. } => SUCCESS_CODE,
            Self::Failure { kind, .. } => kind.code(),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Failure kind, or `None` for a success.
    #[must_use]
    pub const fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }

    #[must_use]
    pub const fn data(&self) -> Option<&Value> {
        match self {
            Self::Success { data } => data.as_ref(),
            Self::Failure { .. } => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { message, .. } => Some(message),
        }
    }
}

/// Errors raised while decoding an envelope from its wire form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    #[error("unassigned status code: {0}")]
    UnknownStatusCode(i64),
    #[error("success envelope must not carry an error")]
    ErrorOnSuccess,
    #[error("failure envelope must not carry data")]
    DataOnFailure,
    #[error("failure envelope is missing its error message")]
    MissingError,
}

/// Flat JSON shape of an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEnvelope {
    status_code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<Envelope> for WireEnvelope {
    fn from(envelope: Envelope) -> Self {
        let status_code = envelope.status_code();
        match envelope {
            Envelope::Success { data } => Self {
                status_code,
                data,
                error: None,
            },
            Envelope::Failure { message, .. } => Self {
                status_code,
                data: None,
                error: Some(message),
            },
        }
    }
}

impl TryFrom<WireEnvelope> for Envelope {
    type Error = EnvelopeError;

    fn try_from(wire: WireEnvelope) -> Result<Self, Self::Error> {
        if wire.status_code == SUCCESS_CODE {
            if wire.error.is_some() {
                return Err(EnvelopeError::ErrorOnSuccess);
            }
            return Ok(Self::Success { data: wire.data });
        }

        let kind = ErrorKind::from_code(wire.status_code)
            .ok_or(EnvelopeError::UnknownStatusCode(wire.status_code))?;
        if wire.data.is_some() {
            return Err(EnvelopeError::DataOnFailure);
        }
        let message = wire.error.ok_or(EnvelopeError::MissingError)?;
        Ok(Self::Failure { kind, message })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    #[test]
    fn success_serializes_with_data() {
        let env = Envelope::success(json!([]));
        assert_eq!(
            serde_json::to_value(&env).unwrap(),
            json!({ "statusCode": 0, "data": [] })
        );
    }

    #[test]
    fn empty_success_omits_data_key() {
        let value = serde_json::to_value(Envelope::empty()).unwrap();
        assert_eq!(value, json!({ "statusCode": 0 }));
        assert_eq!(Envelope::success(Value::Null), Envelope::empty());
    }

    #[test]
    fn lookup_failures_use_canonical_messages() {
        assert_eq!(
            serde_json::to_value(Envelope::service_not_found()).unwrap(),
            json!({ "statusCode": 3, "error": "Service not found" })
        );
        assert_eq!(
            serde_json::to_value(Envelope::controller_not_found()).unwrap(),
            json!({ "statusCode": 2, "error": "Controller not found" })
        );
    }

    #[test]
    fn decode_rejects_mixed_shapes() {
        let both = json!({ "statusCode": 1, "data": 1, "error": "x" });
        assert!(serde_json::from_value::<Envelope>(both).is_err());

        let error_on_success = json!({ "statusCode": 0, "error": "x" });
        assert!(serde_json::from_value::<Envelope>(error_on_success).is_err());

        let missing_error = json!({ "statusCode": 2 });
        assert!(serde_json::from_value::<Envelope>(missing_error).is_err());

        let unassigned = json!({ "statusCode": 99, "error": "x" });
        assert!(serde_json::from_value::<Envelope>(unassigned).is_err());
    }

    #[test]
    fn decode_failure() {
        let env: Envelope =
            serde_json::from_value(json!({ "statusCode": 1, "error": "boom" })).unwrap();
        assert_eq!(env.error_kind(), Some(ErrorKind::Unknown));
        assert_eq!(env.error(), Some("boom"));
        assert!(env.data().is_none());
    }

    #[test]
    fn codes_are_distinct_from_success() {
        for kind in [
            ErrorKind::Unknown,
            ErrorKind::ControllerNotFound,
            ErrorKind::ServiceNotFound,
        ] {
            assert_ne!(kind.code(), SUCCESS_CODE);
            assert_eq!(ErrorKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(ErrorKind::from_code(SUCCESS_CODE), None);
    }

    proptest! {
        #[test]
        fn serialized_envelope_has_exactly_one_payload_key(
            message in ".*",
            code in 1i64..=3,
        ) {
            let kind = ErrorKind::from_code(code).unwrap();
            let value = serde_json::to_value(Envelope::failure(kind, message)).unwrap();
            let obj = value.as_object().unwrap();
            prop_assert!(obj.contains_key("statusCode"));
            prop_assert!(obj.contains_key("error"));
            prop_assert!(!obj.contains_key("data"));
        }
    }
}
