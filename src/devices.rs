//! YoLink wire types (pure data).
//!
//! Every YoLink API call is a `POST` to a single endpoint with a JSON body
//! naming the method (`Home.getDeviceList`, `<DeviceType>.getState`, ...).
//! Responses come back in a uniform [`Envelope`] whose `code` is `"000000"`
//! on success.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Envelope `code` the YoLink API returns on success.
pub const SUCCESS_CODE: &str = "000000";

/// Method name for the account-wide device listing.
pub const METHOD_DEVICE_LIST: &str = "Home.getDeviceList";

/// Body sent to the token endpoint.
#[derive(Debug, Serialize)]
pub struct TokenRequest<'a> {
    pub grant_type: &'static str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
}

impl<'a> TokenRequest<'a> {
    pub fn client_credentials(client_id: &'a str, client_secret: &'a str) -> Self {
        Self {
            grant_type: "client_credentials",
            client_id,
            client_secret,
        }
    }
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Token lifetime in seconds. Missing means the token is single-use.
    #[serde(default)]
    pub expires_in: u64,
    // Numeric on some deployments, string on others.
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of a YoLink API call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRequest<'a> {
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_device: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<&'a str>,
    /// Unix time in seconds.
    pub timestamp: u64,
}

impl<'a> ApiRequest<'a> {
    /// `Home.getDeviceList`.
    pub fn device_list(timestamp: u64) -> Self {
        Self {
            method: METHOD_DEVICE_LIST.to_string(),
            target_device: None,
            token: None,
            timestamp,
        }
    }

    /// `<DeviceType>.getState` for a single device, authorized by its own token.
    pub fn device_state(device: &'a Device, timestamp: u64) -> Self {
        Self {
            method: format!("{}.getState", device.device_type),
            target_device: Some(device.device_id.as_str()),
            token: Some(device.token.as_str()),
            timestamp,
        }
    }
}

/// Uniform response wrapper returned by every YoLink API method.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub msgid: Option<i64>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    /// Human-readable failure text: `message`, falling back to `desc`.
    pub fn error_message(&self) -> String {
        self.message
            .as_deref()
            .filter(|m| !m.is_empty())
            .or(self.desc.as_deref())
            .unwrap_or_default()
            .to_string()
    }
}

/// `data` payload of `Home.getDeviceList`.
#[derive(Debug, Default, Deserialize)]
pub struct DeviceList {
    #[serde(default)]
    pub devices: Vec<Device>,
}

/// Opaque per-device state returned by `<DeviceType>.getState`.
pub type DeviceState = Map<String, Value>;

/// A device registered to the YoLink account.
///
/// The cloud sends `null` for fields it has no value for; those decode as
/// empty strings so one sparse device never hides the rest of the list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    #[serde(rename = "deviceId", default, deserialize_with = "null_as_empty")]
    pub device_id: String,
    #[serde(rename = "deviceUDID", default, deserialize_with = "null_as_empty")]
    pub device_udid: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    /// Per-device access token used for state queries.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub token: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_empty")]
    pub device_type: String,
    /// Hub id for sub-devices; shape varies by model.
    #[serde(rename = "parentDeviceId", default)]
    pub parent_device_id: Option<Value>,
    #[serde(rename = "modelName", default, deserialize_with = "null_as_empty")]
    pub model_name: String,
    #[serde(rename = "serviceZone", default, deserialize_with = "null_as_empty")]
    pub service_zone: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Device {
    /// Whether this device can be queried: it carries a non-empty token.
    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn device_list_envelope_decodes() {
        let body = json!({
            "code": "000000",
            "time": 1_700_000_000_000i64,
            "msgid": 1_700_000_000_000i64,
            "method": "Home.getDeviceList",
            "desc": "Success",
            "data": {
                "devices": [{
                    "deviceId": "d1",
                    "deviceUDID": "u1",
                    "name": "Front Door",
                    "token": "tok",
                    "type": "DoorSensor",
                    "parentDeviceId": null,
                    "modelName": "YS7704-UC",
                    "serviceZone": "us_west_1"
                }]
            }
        });
        let env: Envelope<DeviceList> = serde_json::from_value(body).unwrap();
        assert!(env.is_success());
        let devices = env.data.unwrap().devices;
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].device_type, "DoorSensor");
        assert_eq!(devices[0].parent_device_id, None);
        assert!(devices[0].has_token());
    }

    #[test]
    fn null_device_fields_decode_as_empty() {
        let body = json!({
            "code": "000000",
            "data": { "devices": [
                {
                    "deviceId": "d1",
                    "deviceUDID": null,
                    "name": null,
                    "token": "tok",
                    "type": "THSensor",
                    "parentDeviceId": 12345,
                    "modelName": null,
                    "serviceZone": null
                },
                { "deviceId": "d2", "name": "Garage", "type": null, "parentDeviceId": { "hub": "h1" } }
            ]}
        });
        let env: Envelope<DeviceList> = serde_json::from_value(body).unwrap();
        let devices = env.data.unwrap().devices;
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].name, "");
        assert_eq!(devices[0].model_name, "");
        assert_eq!(devices[0].service_zone, "");
        assert_eq!(devices[0].parent_device_id, Some(json!(12345)));
        assert_eq!(devices[1].name, "Garage");
        assert_eq!(devices[1].device_type, "");
        assert!(!devices[1].has_token());
    }

    #[test]
    fn token_response_without_lifetime_is_single_use() {
        let token: TokenResponse =
            serde_json::from_str(r#"{"access_token":"a","token_type":"bearer"}"#).unwrap();
        assert_eq!(token.access_token, "a");
        assert_eq!(token.expires_in, 0);
    }

    #[test]
    fn error_message_falls_back_to_desc() {
        let env: Envelope<DeviceState> =
            serde_json::from_value(json!({ "code": "010301", "desc": "Access denied" })).unwrap();
        assert!(!env.is_success());
        assert_eq!(env.error_message(), "Access denied");

        let env: Envelope<DeviceState> = serde_json::from_value(
            json!({ "code": "010301", "message": "Token expired", "desc": "Access denied" }),
        )
        .unwrap();
        assert_eq!(env.error_message(), "Token expired");
    }

    #[test]
    fn state_request_uses_device_type_and_token() {
        let device = Device {
            device_id: "d1".into(),
            device_udid: String::new(),
            name: "Lock".into(),
            token: "dtok".into(),
            device_type: "Lock".into(),
            parent_device_id: None,
            model_name: String::new(),
            service_zone: String::new(),
        };
        let body = serde_json::to_value(ApiRequest::device_state(&device, 42)).unwrap();
        assert_eq!(
            body,
            json!({ "method": "Lock.getState", "targetDevice": "d1", "token": "dtok", "timestamp": 42 })
        );
        let body = serde_json::to_value(ApiRequest::device_list(7)).unwrap();
        assert_eq!(body, json!({ "method": "Home.getDeviceList", "timestamp": 7 }));
    }
}
