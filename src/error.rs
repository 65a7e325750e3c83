use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("malformed topic {topic:?}: {reason}")]
    MalformedTopic { topic: String, reason: String },

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("store unavailable")]
    StoreUnavailable(#[source] sqlx::Error),

    #[error("constraint violation")]
    ConstraintViolation(#[source] sqlx::Error),

    #[error("missing or invalid configuration: {0}")]
    ConfigurationMissing(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl BridgeError {
    /// Data-quality failures are dead-lettered by the controller; everything
    /// else escalates to process termination.
    pub fn is_data_quality(&self) -> bool {
        matches!(
            self,
            BridgeError::MalformedTopic { .. }
                | BridgeError::MalformedPayload(_)
                | BridgeError::ConstraintViolation(_)
        )
    }

    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, BridgeError::StoreUnavailable(_))
    }
}

impl From<sqlx::Error> for BridgeError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if let Some(code) = db.code() {
                // SQLSTATE class 22 (data exception, e.g. an uncastable
                // timestamp) and 23 (integrity constraint) mean the message
                // was at fault, not the store.
                if code.starts_with("22") || code.starts_with("23") {
                    return BridgeError::ConstraintViolation(err);
                }
            }
        }
        BridgeError::StoreUnavailable(err)
    }
}

impl From<rumqttc::ClientError> for BridgeError {
    fn from(err: rumqttc::ClientError) -> Self {
        BridgeError::Transport(err.to_string())
    }
}

impl From<rumqttc::ConnectionError> for BridgeError {
    fn from(err: rumqttc::ConnectionError) -> Self {
        BridgeError::Transport(err.to_string())
    }
}
