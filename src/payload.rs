use crate::error::BridgeError;
use serde::Deserialize;

/// Decoded device event. `timestamp` stays the raw ISO-8601 string from the
/// wire; the store casts it, so a bad timestamp surfaces as a constraint
/// violation at insert time rather than a decode failure here.
#[derive(Debug, Clone)]
pub struct SensorEvent {
    pub version: String,
    pub timestamp: String,
    pub device_category: String,
    pub device_name: String,
    pub datapoints: Vec<Datapoint>,
}

#[derive(Debug, Clone)]
pub struct Datapoint {
    pub name: String,
    pub value: f64,
    pub units: String,
    pub port: i32,
    pub kind: DatapointKind,
}

/// Known channel kinds plus a pass-through for tags newer firmware may emit.
/// Unknown tags are stored verbatim, never rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatapointKind {
    Digital,
    Analog,
    System,
    Other(String),
}

impl DatapointKind {
    fn from_wire(raw: &str) -> Self {
        match raw {
            "Digital" => DatapointKind::Digital,
            "Analog" => DatapointKind::Analog,
            "System" => DatapointKind::System,
            other => DatapointKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DatapointKind::Digital => "Digital",
            DatapointKind::Analog => "Analog",
            DatapointKind::System => "System",
            DatapointKind::Other(other) => other,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireEvent<'a> {
    #[serde(borrow)]
    version: &'a str,
    #[serde(borrow)]
    timestamp: &'a str,
    #[serde(borrow)]
    device: WireDevice<'a>,
    #[serde(borrow)]
    datapoints: Vec<WireDatapoint<'a>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireDevice<'a> {
    #[serde(borrow)]
    category: &'a str,
    #[serde(borrow)]
    name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireDatapoint<'a> {
    #[serde(borrow)]
    name: &'a str,
    value: f64,
    #[serde(borrow, default)]
    units: Option<&'a str>,
    port: i32,
    #[serde(borrow)]
    r#type: &'a str,
}

/// Decodes a raw message body into a [`SensorEvent`]. The buffer is mutated
/// in place by the parser.
pub fn decode_payload(payload: &mut [u8]) -> Result<SensorEvent, BridgeError> {
    let wire: WireEvent =
        simd_json::from_slice(payload).map_err(|err| BridgeError::MalformedPayload(err.to_string()))?;

    Ok(SensorEvent {
        version: wire.version.to_string(),
        timestamp: wire.timestamp.to_string(),
        device_category: wire.device.category.to_string(),
        device_name: wire.device.name.to_string(),
        datapoints: wire
            .datapoints
            .into_iter()
            .map(|dp| Datapoint {
                name: dp.name.to_string(),
                value: dp.value,
                units: dp.units.unwrap_or("").to_string(),
                port: dp.port,
                kind: DatapointKind::from_wire(dp.r#type),
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::{decode_payload, DatapointKind};
    use crate::error::BridgeError;

    fn decode(raw: &str) -> Result<super::SensorEvent, BridgeError> {
        let mut bytes = raw.as_bytes().to_vec();
        decode_payload(&mut bytes)
    }

    #[test]
    fn decodes_full_event() {
        let raw = serde_json::json!({
            "Version": "1.0",
            "Timestamp": "2025-01-01T00:00:00Z",
            "Device": { "Category": "Sensor", "Name": "Tank1" },
            "Datapoints": [
                { "Name": "Level", "Value": 55.2, "Units": "%", "Port": 1, "Type": "Analog" }
            ]
        })
        .to_string();
        let event = decode(&raw).expect("valid payload");

        assert_eq!(event.version, "1.0");
        assert_eq!(event.timestamp, "2025-01-01T00:00:00Z");
        assert_eq!(event.device_category, "Sensor");
        assert_eq!(event.device_name, "Tank1");
        assert_eq!(event.datapoints.len(), 1);

        let dp = &event.datapoints[0];
        assert_eq!(dp.name, "Level");
        assert_eq!(dp.value, 55.2);
        assert_eq!(dp.units, "%");
        assert_eq!(dp.port, 1);
        assert_eq!(dp.kind, DatapointKind::Analog);
    }

    #[test]
    fn accepts_empty_datapoints() {
        let event = decode(
            r#"{"Version":"1.0","Timestamp":"2025-01-01T00:00:00Z",
                "Device":{"Category":"Sensor","Name":"Tank1"},"Datapoints":[]}"#,
        )
        .expect("empty datapoints are valid");
        assert!(event.datapoints.is_empty());
    }

    #[test]
    fn preserves_unknown_type_tags() {
        let event = decode(
            r#"{"Version":"1.0","Timestamp":"2025-01-01T00:00:00Z",
                "Device":{"Category":"Sensor","Name":"Tank1"},
                "Datapoints":[{"Name":"Mode","Value":1,"Units":"","Port":0,"Type":"Hybrid"}]}"#,
        )
        .expect("unknown type tags are permitted");
        let kind = &event.datapoints[0].kind;
        assert_eq!(*kind, DatapointKind::Other("Hybrid".to_string()));
        assert_eq!(kind.as_str(), "Hybrid");
    }

    #[test]
    fn defaults_missing_units_to_empty() {
        let event = decode(
            r#"{"Version":"1.0","Timestamp":"2025-01-01T00:00:00Z",
                "Device":{"Category":"Sensor","Name":"Tank1"},
                "Datapoints":[{"Name":"Door","Value":0,"Port":2,"Type":"Digital"}]}"#,
        )
        .expect("units may be absent");
        assert_eq!(event.datapoints[0].units, "");
    }

    #[test]
    fn rejects_invalid_json() {
        let err = decode("{not json").unwrap_err();
        assert!(matches!(err, BridgeError::MalformedPayload(_)));
    }

    #[test]
    fn rejects_missing_required_fields() {
        // No Timestamp.
        let err = decode(
            r#"{"Version":"1.0","Device":{"Category":"Sensor","Name":"Tank1"},"Datapoints":[]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, BridgeError::MalformedPayload(_)));

        // No Device descriptor.
        let err = decode(r#"{"Version":"1.0","Timestamp":"2025-01-01T00:00:00Z","Datapoints":[]}"#)
            .unwrap_err();
        assert!(matches!(err, BridgeError::MalformedPayload(_)));
    }

    #[test]
    fn rejects_non_numeric_datapoint_value() {
        let err = decode(
            r#"{"Version":"1.0","Timestamp":"2025-01-01T00:00:00Z",
                "Device":{"Category":"Sensor","Name":"Tank1"},
                "Datapoints":[{"Name":"Level","Value":"high","Units":"%","Port":1,"Type":"Analog"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, BridgeError::MalformedPayload(_)));
    }
}
