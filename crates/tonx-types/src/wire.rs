//! Relay wire shapes, shared by the transports and the in-memory relay mock.
//!
//! Every method is a JSON request/response pair keyed by a string method
//! name; records are tagged unions on `state`. A shape mismatch at this layer
//! is a protocol error, not a retryable condition.

use serde::{Deserialize, Serialize};

use crate::session::WalletConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionNewRequest {
    pub key: String,
    pub testnet: bool,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionGetRequest {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionWaitRequest {
    pub id: String,
    pub last_updated: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandNewRequest {
    /// Base64 serialized signed job envelope.
    pub job: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandGetRequest {
    /// Url-safe base64 app public key.
    pub appk: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// Raw session record as the relay reports it, before client normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionRecord {
    NotFound,
    Initing {
        testnet: bool,
        name: String,
        url: String,
        created: u64,
        updated: u64,
    },
    Ready {
        testnet: bool,
        name: String,
        url: String,
        created: u64,
        updated: u64,
        revoked: bool,
        wallet: WalletConfig,
    },
}

/// Raw job record as the relay reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CommandRecord {
    Empty,
    Submitted { job: String },
    Completed { job: String, result: String },
    Rejected { job: String },
    Expired,
}

#[cfg(test)]
mod tests {
    use super::{CommandRecord, SessionRecord};

    #[test]
    fn session_record_tagging() {
        let json = r#"{"state":"not_found"}"#;
        let record: SessionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record, SessionRecord::NotFound);

        let json = r#"{"state":"initing","testnet":true,"name":"App","url":"https://a","created":1,"updated":2}"#;
        let record: SessionRecord = serde_json::from_str(json).unwrap();
        assert!(matches!(record, SessionRecord::Initing { testnet: true, .. }));
    }

    #[test]
    fn command_record_tagging() {
        let json = r#"{"state":"completed","job":"am9i","result":"cmVz"}"#;
        let record: CommandRecord = serde_json::from_str(json).unwrap();
        assert!(matches!(record, CommandRecord::Completed { .. }));

        let record: CommandRecord = serde_json::from_str(r#"{"state":"empty"}"#).unwrap();
        assert_eq!(record, CommandRecord::Empty);
    }

    #[test]
    fn malformed_record_is_an_error() {
        assert!(serde_json::from_str::<SessionRecord>(r#"{"state":"weird"}"#).is_err());
    }
}
