//! SmartApp lifecycle callbacks.

use serde_json::{Value, json};
use tracing::{info, warn};
use url::Url;

const SMARTTHINGS_DOMAIN: &str = "smartthings.com";

/// What a lifecycle request asks of the hub besides the JSON reply.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleAction {
    Reply(Value),
    /// Fetch the confirmation URL, if trusted, then reply.
    Confirm { url: Option<String>, reply: Value },
}

/// Decide the reply for a lifecycle payload. Unknown lifecycles get a bare 200.
pub fn handle_lifecycle(body: &Value) -> LifecycleAction {
    let lifecycle = body.get("lifecycle").and_then(Value::as_str).unwrap_or("");
    info!(lifecycle, "smartthings lifecycle received");

    let reply = match lifecycle {
        "PING" => {
            let challenge = body.pointer("/pingData/challenge").cloned().unwrap_or(Value::Null);
            json!({ "statusCode": 200, "pingData": { "challenge": challenge } })
        }
        "CONFIRMATION" => {
            let url = body
                .pointer("/confirmationData/confirmationUrl")
                .and_then(Value::as_str)
                .filter(|url| {
                    let trusted = is_trusted_confirmation_url(url);
                    if !trusted {
                        warn!(url = %url, "ignoring confirmationUrl outside smartthings.com");
                    }
                    trusted
                })
                .map(str::to_string);
            return LifecycleAction::Confirm {
                url,
                reply: json!({ "statusCode": 200 }),
            };
        }
        "CONFIGURATION" => configuration(body),
        "INSTALL" => {
            let app = body.pointer("/installData/installedApp");
            let installed_app_id = app
                .and_then(|a| a.get("installedAppId"))
                .and_then(Value::as_str);
            let location_id = app.and_then(|a| a.get("locationId")).and_then(Value::as_str);
            info!(installed_app_id, location_id, "smartapp installed");
            json!({ "statusCode": 200, "installData": {} })
        }
        "UPDATE" => json!({ "statusCode": 200, "updateData": {} }),
        "UNINSTALL" => json!({ "statusCode": 200, "uninstallData": {} }),
        "EVENT" => {
            let events = body
                .pointer("/eventData/events")
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            info!(events, "smartapp events received");
            json!({ "statusCode": 200, "eventData": {} })
        }
        other => {
            warn!(lifecycle = other, "unknown smartthings lifecycle");
            json!({ "statusCode": 200 })
        }
    };
    LifecycleAction::Reply(reply)
}

/// Only https URLs on smartthings.com or one of its subdomains.
pub fn is_trusted_confirmation_url(url: &str) -> bool {
    let Ok(url) = Url::parse(url) else {
        return false;
    };
    if url.scheme() != "https" || !url.username().is_empty() || url.password().is_some() {
        return false;
    }
    url.host_str().is_some_and(|host| {
        let host = host.to_ascii_lowercase();
        host == SMARTTHINGS_DOMAIN
            || host
                .strip_suffix(SMARTTHINGS_DOMAIN)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

fn configuration(body: &Value) -> Value {
    match body.pointer("/configurationData/phase").and_then(Value::as_str) {
        Some("INITIALIZE") => json!({
            "statusCode": 200,
            "configurationData": {
                "initialize": {
                    "name": "Casa Conectada",
                    "description": "Smart Home Control - Casa Conectada",
                    "id": "casa-conectada-app",
                    "permissions": ["r:devices:*", "x:devices:*", "r:locations:*"],
                    "firstPageId": "1",
                }
            }
        }),
        Some("PAGE") => json!({
            "statusCode": 200,
            "configurationData": {
                "page": {
                    "pageId": "1",
                    "name": "Configuração",
                    "nextPageId": null,
                    "previousPageId": null,
                    "complete": true,
                    "sections": [],
                }
            }
        }),
        _ => json!({ "statusCode": 200 }),
    }
}
