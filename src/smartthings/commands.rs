//! Translation of dashboard commands into SmartThings capability commands.

use crate::error::HubError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Command as sent by the dashboard: `{"type": "...", "value": ...}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandRequest {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    Switch(bool),
    SetTemperature(f64),
    SetMode(String),
    SetFanSpeed(String),
}

impl TryFrom<CommandRequest> for DeviceCommand {
    type Error = HubError;

    fn try_from(req: CommandRequest) -> Result<Self, Self::Error> {
        let bad_value = || HubError::BadRequest(format!("invalid value for '{}'", req.kind));
        match req.kind.as_str() {
            "switch" => req.value.as_bool().map(Self::Switch).ok_or_else(bad_value),
            "setTemperature" => req
                .value
                .as_f64()
                .map(Self::SetTemperature)
                .ok_or_else(bad_value),
            "setMode" => req
                .value
                .as_str()
                .map(|m| Self::SetMode(m.to_string()))
                .ok_or_else(bad_value),
            "setFanSpeed" => req
                .value
                .as_str()
                .map(|s| Self::SetFanSpeed(s.to_string()))
                .ok_or_else(bad_value),
            other => Err(HubError::UnsupportedCommand(other.to_string())),
        }
    }
}

impl DeviceCommand {
    /// Body for `POST /v1/devices/{id}/commands`, always on the `main` component.
    pub fn to_request_body(&self) -> Value {
        let (capability, command, arguments) = match self {
            Self::Switch(on) => ("switch", if *on { "on" } else { "off" }, None),
            Self::SetTemperature(t) => (
                "thermostatCoolingSetpoint",
                "setCoolingSetpoint",
                Some(json!([t])),
            ),
            Self::SetMode(mode) => (
                "airConditionerMode",
                "setAirConditionerMode",
                Some(json!([map_mode(mode)])),
            ),
            Self::SetFanSpeed(speed) => (
                "airConditionerFanMode",
                "setFanMode",
                Some(json!([map_fan_speed(speed)])),
            ),
        };
        let mut cmd = json!({
            "component": "main",
            "capability": capability,
            "command": command,
        });
        if let Some(arguments) = arguments {
            cmd["arguments"] = arguments;
        }
        json!({ "commands": [cmd] })
    }

    /// The device row change once the command succeeded: `(is_on, settings patch)`.
    pub fn state_change(&self) -> (Option<bool>, Option<Value>) {
        match self {
            Self::Switch(on) => (Some(*on), None),
            Self::SetTemperature(t) => (None, Some(json!({ "temperature": t }))),
            Self::SetMode(mode) => (None, Some(json!({ "mode": mode }))),
            Self::SetFanSpeed(speed) => (None, Some(json!({ "fanSpeed": speed }))),
        }
    }
}

fn map_mode(mode: &str) -> &str {
    match mode {
        "fan" => "fanOnly",
        other => other,
    }
}

/// Known speeds become SmartThings' numeric fan modes; anything else is sent as-is.
fn map_fan_speed(speed: &str) -> Value {
    match speed {
        "auto" => json!(0),
        "low" => json!(1),
        "medium" => json!(2),
        "high" => json!(3),
        other => json!(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(kind: &str, value: Value) -> Result<DeviceCommand, HubError> {
        DeviceCommand::try_from(CommandRequest {
            kind: kind.to_string(),
            value,
        })
    }

    #[test]
    fn switch_maps_to_on_off() {
        let body = parse("switch", json!(false)).unwrap().to_request_body();
        assert_eq!(
            body,
            json!({"commands": [{"component": "main", "capability": "switch", "command": "off"}]})
        );
    }

    #[test]
    fn ac_commands_carry_arguments() {
        let temp = parse("setTemperature", json!(21)).unwrap().to_request_body();
        assert_eq!(temp["commands"][0]["command"], "setCoolingSetpoint");
        assert_eq!(temp["commands"][0]["arguments"], json!([21.0]));

        let mode = parse("setMode", json!("fan")).unwrap().to_request_body();
        assert_eq!(mode["commands"][0]["arguments"], json!(["fanOnly"]));

        let fan = parse("setFanSpeed", json!("medium")).unwrap().to_request_body();
        assert_eq!(fan["commands"][0]["capability"], "airConditionerFanMode");
        assert_eq!(fan["commands"][0]["arguments"], json!([2]));
    }

    #[test]
    fn unknown_and_malformed_commands_are_rejected() {
        assert!(matches!(
            parse("dim", json!(50)),
            Err(HubError::UnsupportedCommand(_))
        ));
        assert!(matches!(
            parse("switch", json!("on")),
            Err(HubError::BadRequest(_))
        ));
    }

    #[test]
    fn state_change_targets_matching_setting() {
        assert_eq!(
            parse("switch", json!(true)).unwrap().state_change(),
            (Some(true), None)
        );
        assert_eq!(
            parse("setMode", json!("cool")).unwrap().state_change(),
            (None, Some(json!({"mode": "cool"})))
        );
    }
}
