use serde::{Deserialize, Deserializer, Serialize};

/// A recorded bird sighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bird {
    /// Store-assigned identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Species or common name reported by the detector.
    pub name: String,
    /// Omitted when the sighting was reported without a position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
    pub updated_at: u64,
}

/// Body of a `birds/put` request. Coordinates are optional and may arrive
/// as numbers or numeric strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewBird {
    pub name: String,
    #[serde(default, deserialize_with = "optional_coordinate")]
    pub long: Option<f64>,
    #[serde(default, deserialize_with = "optional_coordinate")]
    pub lat: Option<f64>,
}

/// A sensor node and its last reported position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Node identifier chosen by the device.
    #[serde(rename = "_id")]
    pub id: String,
    pub long: f64,
    pub lat: f64,
    /// Dense index assigned on first sight: the number of nodes known
    /// before this one was inserted. Never changes afterwards.
    pub local_id: u64,
    pub created_at: u64,
    pub updated_at: u64,
}

/// Body of a `node/put` request. Coordinates may arrive as numbers or
/// numeric strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodePosition {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(deserialize_with = "coordinate")]
    pub long: f64,
    #[serde(deserialize_with = "coordinate")]
    pub lat: f64,
}

/// A coordinate as sent by a client: JSON number or form-encoded string.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawCoordinate {
    Number(f64),
    Text(String),
}

impl RawCoordinate {
    fn parse<E: serde::de::Error>(self) -> Result<f64, E> {
        match self {
            Self::Number(n) => Ok(n),
            Self::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("invalid coordinate: {text:?}"))),
        }
    }
}

fn coordinate<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    RawCoordinate::deserialize(deserializer)?.parse()
}

fn optional_coordinate<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<f64>, D::Error> {
    match Option::<RawCoordinate>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawCoordinate::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(raw) => raw.parse().map(Some),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn node_uses_document_field_names() {
        let node = Node {
            id: "esp-1".to_string(),
            long: 4.35,
            lat: 50.85,
            local_id: 0,
            created_at: 10,
            updated_at: 20,
        };
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["_id"], "esp-1");
        assert_eq!(value["localId"], 0);
        assert_eq!(value["createdAt"], 10);
        assert_eq!(value["updatedAt"], 20);
    }

    #[test]
    fn node_position_reads_underscore_id() {
        let pos: NodePosition =
            serde_json::from_value(json!({ "_id": "esp-2", "long": 1.0, "lat": 2.0 })).unwrap();
        assert_eq!(pos.id, "esp-2");
    }

    #[test]
    fn new_bird_coordinates_are_optional() {
        let bird: NewBird = serde_json::from_value(json!({ "name": "robin" })).unwrap();
        assert_eq!(bird.long, None);
        assert_eq!(bird.lat, None);
    }

    #[test]
    fn coordinates_accept_numeric_strings() {
        let bird: NewBird =
            serde_json::from_value(json!({ "name": "jay", "long": "4.35", "lat": " 50.85 " }))
                .unwrap();
        assert_eq!(bird.long, Some(4.35));
        assert_eq!(bird.lat, Some(50.85));

        let pos: NodePosition =
            serde_json::from_value(json!({ "_id": "esp-3", "long": "1.5", "lat": 2 })).unwrap();
        assert!((pos.long - 1.5).abs() < f64::EPSILON);
        assert!((pos.lat - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn non_numeric_coordinate_is_rejected() {
        let err = serde_json::from_value::<NewBird>(json!({ "name": "jay", "long": "east" }))
            .unwrap_err();
        assert!(err.to_string().contains("invalid coordinate"));
        assert!(serde_json::from_value::<NodePosition>(json!({ "_id": "n", "lat": 1 })).is_err());
    }

    #[test]
    fn bird_without_position_omits_coordinates() {
        let bird = Bird {
            id: "b1".to_string(),
            name: "robin".to_string(),
            long: None,
            lat: None,
            created_at: 1,
            updated_at: 1,
        };
        let value = serde_json::to_value(&bird).unwrap();
        assert!(value.get("long").is_none());
        assert!(value.get("lat").is_none());
    }
}
