//! Wire format of the remote command service.
//!
//! One connection carries exactly one JSON request, terminated by the client
//! closing its write side, and one JSON response.

use serde::{Deserialize, Serialize};

use crate::error::{DistcopyError, Result};

pub const PONG: &str = "Pong";
pub const SERVER_KILLED: &str = "Server killed";
pub const SUCCESS: &str = "Success";
pub const INVALID_TOKEN: &str = "Invalid token";
pub const UNKNOWN_COMMAND: &str = "Unknown command";
pub const COPY_FAILED: &str = "Error during copy";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst: Option<String>,
}

impl Request {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    pub fn ping() -> Self {
        Self::new("ping")
    }

    pub fn kill() -> Self {
        Self::new("kill")
    }

    pub fn free_disk_space(folder: impl Into<String>) -> Self {
        Self {
            folder: Some(folder.into()),
            ..Self::new("free_disk_space")
        }
    }

    pub fn copy_rsync(src: impl Into<String>, dst: impl Into<String>) -> Self {
        Self {
            src: Some(src.into()),
            dst: Some(dst.into()),
            ..Self::new("copy_rsync")
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// Either a `message` or an `error`, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Error {
        error: String,
    },
    Message {
        message: String,
        /// Free bytes, set by `free_disk_space` only.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        free: Option<u64>,
    },
}

impl Response {
    pub fn message(message: impl Into<String>) -> Self {
        Response::Message {
            message: message.into(),
            free: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Response::Error {
            error: error.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }

    /// Splits a success payload into its message and free space, and turns
    /// an error payload into the matching error. `other` builds the error
    /// for failures of `command` itself.
    pub fn into_result(
        self,
        command: &str,
        other: fn(String) -> DistcopyError,
    ) -> Result<(String, Option<u64>)> {
        match self {
            Response::Message { message, free } => Ok((message, free)),
            Response::Error { error } if error == INVALID_TOKEN => {
                Err(DistcopyError::Authentication)
            }
            Response::Error { error } if error == UNKNOWN_COMMAND => {
                Err(DistcopyError::UnknownCommand(command.to_string()))
            }
            Response::Error { error } => Err(other(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_request_omits_absent_fields() {
        let value = serde_json::to_value(Request::ping()).unwrap();
        assert_eq!(value, json!({ "command": "ping" }));
        let value = serde_json::to_value(Request::copy_rsync("/a", "/b").with_token("t")).unwrap();
        assert_eq!(
            value,
            json!({ "command": "copy_rsync", "token": "t", "src": "/a", "dst": "/b" })
        );
    }

    #[test]
    fn test_response_shapes() {
        assert_eq!(
            serde_json::to_value(Response::message(PONG)).unwrap(),
            json!({ "message": "Pong" })
        );
        assert_eq!(
            serde_json::to_value(Response::error(INVALID_TOKEN)).unwrap(),
            json!({ "error": "Invalid token" })
        );
        let free = Response::Message {
            message: SUCCESS.to_string(),
            free: Some(42),
        };
        assert_eq!(
            serde_json::to_value(free).unwrap(),
            json!({ "message": "Success", "free": 42 })
        );
    }

    #[test]
    fn test_response_decodes_either_variant() {
        let error: Response = serde_json::from_str(r#"{"error": "Unknown command"}"#).unwrap();
        assert!(error.is_error());
        let message: Response = serde_json::from_str(r#"{"message": "Pong"}"#).unwrap();
        assert_eq!(message, Response::message(PONG));
    }

    #[test]
    fn test_into_result_maps_errors() {
        assert!(matches!(
            Response::error(INVALID_TOKEN).into_result("ping", DistcopyError::Query),
            Err(DistcopyError::Authentication)
        ));
        assert!(matches!(
            Response::error(UNKNOWN_COMMAND).into_result("reboot", DistcopyError::Query),
            Err(DistcopyError::UnknownCommand(command)) if command == "reboot"
        ));
        assert!(matches!(
            Response::error(COPY_FAILED).into_result("copy_rsync", DistcopyError::Transfer),
            Err(DistcopyError::Transfer(_))
        ));
        let (message, free) = Response::message(PONG)
            .into_result("ping", DistcopyError::Query)
            .unwrap();
        assert_eq!(message, PONG);
        assert_eq!(free, None);
    }
}
