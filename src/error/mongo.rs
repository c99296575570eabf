use std::fmt;

use bson::{Document, doc};
use serde::{Deserialize, Serialize};

use super::kinds::CursorError;

/// Structured failure result delivered in place of a value.
///
/// Mirrors the `{ok: false, err: true, errmsg}` document callers of the
/// wire protocol expect when a cursor operation cannot proceed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub ok: bool,
    pub err: bool,
    pub errmsg: String,
}

impl Failure {
    /// Build a failure result carrying `errmsg`.
    pub fn new(errmsg: impl Into<String>) -> Self {
        Self {
            ok: false,
            err: true,
            errmsg: errmsg.into(),
        }
    }

    /// Render as a BSON document.
    pub fn to_document(&self) -> Document {
        doc! {
            "ok": self.ok,
            "err": self.err,
            "errmsg": self.errmsg.as_str(),
        }
    }

    /// Convert to compact JSON string (single line).
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<&CursorError> for Failure {
    fn from(err: &CursorError) -> Self {
        match err {
            // The JSON rendering of driver errors is meant for terminals; keep
            // errmsg a single line.
            CursorError::MongoDb(e) => {
                let info = extract_error_info(e);
                Failure::new(info.message.unwrap_or_else(|| e.to_string()))
            }
            other => Failure::new(other.to_string()),
        }
    }
}

impl From<CursorError> for Failure {
    fn from(err: CursorError) -> Self {
        Failure::from(&err)
    }
}

/// Structured error information extracted from MongoDB errors.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub(crate) error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) message: Option<String>,
}

/// Format MongoDB error messages as pretty JSON wrapped in an `error` field.
pub fn format_mongodb_error(
    f: &mut fmt::Formatter<'_>,
    error: &mongodb::error::Error,
) -> fmt::Result {
    let info = extract_error_info(error);
    let wrapper = serde_json::json!({ "error": info });
    let json_output = serde_json::to_string_pretty(&wrapper).map_err(|_| fmt::Error)?;
    write!(f, "\n{json_output}")
}

/// Extract structured information from a MongoDB error using the driver API.
pub fn extract_error_info(error: &mongodb::error::Error) -> ErrorInfo {
    use mongodb::error::ErrorKind;

    let mut info = ErrorInfo::default();

    match error.kind.as_ref() {
        ErrorKind::Command(command_error) => {
            info.error_type = Some("mongo.command_error".to_string());
            info.code = Some(command_error.code);
            info.message = Some(command_error.message.clone());
            info.name = get_error_name(command_error.code);
        }
        ErrorKind::Authentication { message, .. } => {
            info.error_type = Some("mongo.authentication_error".to_string());
            info.message = Some(message.clone());
        }
        ErrorKind::InvalidArgument { message, .. } => {
            info.error_type = Some("mongo.invalid_argument".to_string());
            info.message = Some(message.clone());
        }
        ErrorKind::ServerSelection { message, .. } => {
            info.error_type = Some("mongo.server_selection_error".to_string());
            info.message = Some(message.clone());
        }
        _ => {
            info.message = Some(error.to_string());
        }
    }

    info
}

/// Human-readable names for the codes a read cursor commonly hits.
fn get_error_name(code: i32) -> Option<String> {
    let name = match code {
        2 => "BadValue",
        13 => "Unauthorized",
        26 => "NamespaceNotFound",
        43 => "CursorNotFound",
        50 => "MaxTimeMSExpired",
        96 => "OperationFailed",
        237 => "CursorKilled",
        _ => return None,
    };

    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StateError;

    #[test]
    fn test_failure_shape() {
        let failure = Failure::from(CursorError::State(StateError::CursorClosed));
        assert_eq!(
            failure.to_document(),
            doc! { "ok": false, "err": true, "errmsg": "Cursor is closed" }
        );
    }

    #[test]
    fn test_failure_json() {
        let json = Failure::new("boom").to_json().unwrap();
        assert_eq!(json, r#"{"ok":false,"err":true,"errmsg":"boom"}"#);
    }

    #[test]
    fn test_error_names() {
        assert_eq!(get_error_name(43).as_deref(), Some("CursorNotFound"));
        assert_eq!(get_error_name(12345), None);
    }
}
