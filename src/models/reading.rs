use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A validated telemetry reading, as published by a fuel sensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub sensor_id: String,
    pub vehicle_id: String,
    pub user_id: String,
    pub fuel_level: f64,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReading {
    sensor_id: Option<Field>,
    vehicle_id: Option<Field>,
    user_id: Option<Field>,
    fuel_level: Option<Field>,
    latitude: Option<Field>,
    longitude: Option<Field>,
}

// Sensors are inconsistent about quoting numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Field {
    Number(f64),
    Text(String),
    Other(Value),
}

impl Reading {
    pub fn from_slice(payload: &[u8]) -> Result<Self, ValidationError> {
        let raw: RawReading = serde_json::from_slice(payload)
            .map_err(|e| ValidationError::Malformed(e.to_string()))?;
        raw.validate()
    }
}

impl RawReading {
    fn validate(self) -> Result<Reading, ValidationError> {
        Ok(Reading {
            sensor_id: text(self.sensor_id, "sensorId")?,
            vehicle_id: text(self.vehicle_id, "vehicleId")?,
            user_id: text(self.user_id, "userId")?,
            fuel_level: number(self.fuel_level, "fuelLevel")?,
            latitude: number(self.latitude, "latitude")?,
            longitude: number(self.longitude, "longitude")?,
        })
    }
}

fn text(field: Option<Field>, name: &'static str) -> Result<String, ValidationError> {
    match field {
        Some(Field::Text(s)) if !s.trim().is_empty() => Ok(s),
        Some(Field::Text(_)) | None => Err(ValidationError::MissingField(name)),
        Some(_) => Err(ValidationError::NotText(name)),
    }
}

fn number(field: Option<Field>, name: &'static str) -> Result<f64, ValidationError> {
    match field {
        Some(Field::Number(f)) => Ok(f),
        Some(Field::Text(s)) => {
            if s.trim().is_empty() {
                return Err(ValidationError::MissingField(name));
            }
            s.trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .ok_or(ValidationError::NotNumeric(name))
        }
        Some(Field::Other(_)) => Err(ValidationError::NotNumeric(name)),
        None => Err(ValidationError::MissingField(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sensor_payload() {
        let payload = br#"{
            "sensorId": "sensor-3",
            "vehicleId": "vehicle-1",
            "userId": "user-2",
            "fuelLevel": 42.17,
            "latitude": 28.6139,
            "longitude": 77.2090
        }"#;

        let reading = Reading::from_slice(payload).unwrap();
        assert_eq!(reading.sensor_id, "sensor-3");
        assert_eq!(reading.vehicle_id, "vehicle-1");
        assert_eq!(reading.user_id, "user-2");
        assert_eq!(reading.fuel_level, 42.17);
        assert_eq!(reading.latitude, 28.6139);
        assert_eq!(reading.longitude, 77.2090);
    }

    #[test]
    fn keeps_identifiers_as_submitted() {
        let payload = br#"{"sensorId":" S1 ","vehicleId":"V1 ","userId":"U1",
            "fuelLevel":5,"latitude":0,"longitude":0}"#;

        let reading = Reading::from_slice(payload).unwrap();
        assert_eq!(reading.sensor_id, " S1 ");
        assert_eq!(reading.vehicle_id, "V1 ");

        let blank = br#"{"sensorId":"S1","vehicleId":"   ","userId":"U1",
            "fuelLevel":5,"latitude":0,"longitude":0}"#;
        assert_eq!(
            Reading::from_slice(blank),
            Err(ValidationError::MissingField("vehicleId"))
        );
    }

    #[test]
    fn normalizes_quoted_numbers() {
        let payload = br#"{"sensorId":"S1","vehicleId":"V1","userId":"U1",
            "fuelLevel":"+12.50","latitude":"-0.5","longitude":"0"}"#;

        let reading = Reading::from_slice(payload).unwrap();
        assert_eq!(reading.fuel_level, 12.5);
        assert_eq!(reading.latitude, -0.5);
        assert_eq!(reading.longitude, 0.0);
    }

    #[test]
    fn rejects_missing_fields() {
        let payload = br#"{"sensorId":"S1","userId":"U1","fuelLevel":5,"latitude":0,"longitude":0}"#;
        assert_eq!(
            Reading::from_slice(payload),
            Err(ValidationError::MissingField("vehicleId"))
        );

        let payload = br#"{"sensorId":"S1","vehicleId":"V1","userId":"U1","fuelLevel":null,"latitude":0,"longitude":0}"#;
        assert_eq!(
            Reading::from_slice(payload),
            Err(ValidationError::MissingField("fuelLevel"))
        );
    }

    #[test]
    fn rejects_non_numeric_values() {
        let payload = br#"{"sensorId":"S1","vehicleId":"V1","userId":"U1","fuelLevel":"lots","latitude":0,"longitude":0}"#;
        assert_eq!(
            Reading::from_slice(payload),
            Err(ValidationError::NotNumeric("fuelLevel"))
        );

        let payload = br#"{"sensorId":"S1","vehicleId":"V1","userId":"U1","fuelLevel":5,"latitude":true,"longitude":0}"#;
        assert_eq!(
            Reading::from_slice(payload),
            Err(ValidationError::NotNumeric("latitude"))
        );

        let payload = br#"{"sensorId":"S1","vehicleId":"V1","userId":"U1","fuelLevel":"NaN","latitude":0,"longitude":0}"#;
        assert_eq!(
            Reading::from_slice(payload),
            Err(ValidationError::NotNumeric("fuelLevel"))
        );
    }

    #[test]
    fn rejects_numeric_identifiers() {
        let payload = br#"{"sensorId":7,"vehicleId":"V1","userId":"U1","fuelLevel":5,"latitude":0,"longitude":0}"#;
        assert_eq!(Reading::from_slice(payload), Err(ValidationError::NotText("sensorId")));
    }

    #[test]
    fn rejects_non_json() {
        assert!(matches!(
            Reading::from_slice(b"fuel=5"),
            Err(ValidationError::Malformed(_))
        ));
        assert!(matches!(
            Reading::from_slice(br#""fuel""#),
            Err(ValidationError::Malformed(_))
        ));
    }
}
