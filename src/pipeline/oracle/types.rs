use serde::{Deserialize, Serialize};

use super::OracleError;

/// Sampling and length controls for one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_output_tokens: u32,
    /// 0.0-1.0.
    pub temperature: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    /// 0.0-1.0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_output_tokens: 128,
            temperature: 0.7,
            top_k: None,
            top_p: None,
        }
    }
}

/// What the caller expects the oracle to answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ResponseShape {
    /// One `Q:`/`A:` pair describing one note unit.
    SingleUnit,
    /// `count` lines labelled `N1:` .. `N{count}:`.
    BatchLabel { count: usize },
}

/// One prompt plus its generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub params: GenerationParams,
    pub shape: ResponseShape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleStatus {
    Success,
    Failure,
}

/// Coarse failure class reported by an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleErrorKind {
    /// Service unreachable or transport error.
    Unavailable,
    /// Call abandoned after its deadline.
    Timeout,
    /// Service answered with a non-success status.
    Service,
    /// Service answered but the envelope could not be decoded.
    Malformed,
}

/// Raw oracle output. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleResponse {
    pub status: OracleStatus,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<OracleErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl OracleResponse {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            status: OracleStatus::Success,
            text: text.into(),
            error_kind: None,
            error_message: None,
        }
    }

    pub fn failure(kind: OracleErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: OracleStatus::Failure,
            text: String::new(),
            error_kind: Some(kind),
            error_message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OracleStatus::Success
    }
}

impl From<Result<String, OracleError>> for OracleResponse {
    fn from(result: Result<String, OracleError>) -> Self {
        match result {
            Ok(text) => Self::success(text),
            Err(e) => Self::failure(e.kind(), e.to_string()),
        }
    }
}

/// A generative text service, invoked once per request.
///
/// Implementations must not panic or block past their own deadline, and
/// report every failure through the returned [`OracleResponse`]. No retries.
pub trait Oracle: Send + Sync {
    fn invoke(&self, request: &OracleRequest) -> OracleResponse;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oracle_is_object_safe() {
        fn _assert_oracle(_: &dyn Oracle) {}
    }

    #[test]
    fn error_result_becomes_failure_response() {
        let response: OracleResponse = Err(OracleError::Timeout(30)).into();
        assert!(!response.is_success());
        assert_eq!(response.error_kind, Some(OracleErrorKind::Timeout));
        assert_eq!(
            response.error_message.as_deref(),
            Some("Oracle request timed out after 30s")
        );
        assert!(response.text.is_empty());
    }

    #[test]
    fn ok_result_becomes_success_response() {
        let response: OracleResponse = Ok("Q: a?\nA: b".to_string()).into();
        assert!(response.is_success());
        assert_eq!(response.text, "Q: a?\nA: b");
        assert!(response.error_message.is_none());
    }

    #[test]
    fn service_error_maps_to_service_kind() {
        let err = OracleError::Service {
            status: 500,
            body: "model crashed".into(),
        };
        assert_eq!(err.kind(), OracleErrorKind::Service);
        assert_eq!(
            OracleError::Connection("http://localhost:11434".into()).kind(),
            OracleErrorKind::Unavailable
        );
    }

    #[test]
    fn response_shape_serde_is_tagged() {
        let json = serde_json::to_string(&ResponseShape::BatchLabel { count: 3 }).unwrap();
        assert_eq!(json, r#"{"mode":"batch_label","count":3}"#);
        let parsed: ResponseShape = serde_json::from_str(r#"{"mode":"single_unit"}"#).unwrap();
        assert_eq!(parsed, ResponseShape::SingleUnit);
    }
}
