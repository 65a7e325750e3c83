use crate::error::BridgeError;

/// Identifier fields carried by the topic path itself:
/// `LinkForge/{client_id}/{location}/{area}/{subarea}/dev/{device_id}/{event_kind}`.
///
/// Ephemeral: populates the event row for the current message and is then
/// discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicIdentifier {
    pub client_id: i64,
    pub location: String,
    pub area: String,
    pub subarea: String,
    pub device_id: String,
}

/// Splits a topic string into a [`TopicIdentifier`]. Trailing segments past
/// the eighth are ignored.
pub fn parse_topic(topic: &str) -> Result<TopicIdentifier, BridgeError> {
    let parts: Vec<&str> = topic.split('/').collect();
    if parts.len() < 8 {
        return Err(malformed(
            topic,
            format!("expected at least 8 segments, got {}", parts.len()),
        ));
    }

    let client_id = parts[1].parse::<i64>().map_err(|_| {
        malformed(topic, format!("client id {:?} is not an integer", parts[1]))
    })?;

    Ok(TopicIdentifier {
        client_id,
        location: parts[2].to_string(),
        area: parts[3].to_string(),
        subarea: parts[4].to_string(),
        device_id: parts[6].to_string(),
    })
}

fn malformed(topic: &str, reason: String) -> BridgeError {
    BridgeError::MalformedTopic {
        topic: topic.to_string(),
        reason,
    }
}
