use async_trait::async_trait;
use monitor_core::{MonitorError, NotificationTransport, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::SmsConfig;

const TWILIO_API_URL: &str = "https://api.twilio.com";

/// Sends SMS through the Twilio Messages REST API.
pub struct TwilioSmsNotifier {
    client: Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
}

impl TwilioSmsNotifier {
    pub fn new(config: &SmsConfig) -> Self {
        Self::with_base_url(config, TWILIO_API_URL.to_string())
    }

    pub fn with_base_url(config: &SmsConfig, base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        )
    }
}

#[async_trait]
impl NotificationTransport for TwilioSmsNotifier {
    async fn send_message(&self, body: &str, from: &str, to: &str) -> Result<String> {
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&message_form(body, from, to))
            .send()
            .await
            .map_err(|e| MonitorError::Notification(format!("Twilio request failed: {}", e)))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(MonitorError::Notification(describe_failure(status, &text)));
        }

        let created: MessageResource = serde_json::from_str(&text).map_err(|e| {
            MonitorError::Notification(format!("Unexpected Twilio response: {}", e))
        })?;

        tracing::debug!(
            "Twilio accepted message {} (status {})",
            created.sid,
            created.status.as_deref().unwrap_or("unknown")
        );

        Ok(created.sid)
    }

    fn name(&self) -> &str {
        "twilio-sms"
    }
}

fn message_form<'a>(body: &'a str, from: &'a str, to: &'a str) -> [(&'static str, &'a str); 3] {
    [("To", to), ("From", from), ("Body", body)]
}

fn describe_failure(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<TwilioError>(body) {
        Ok(err) => match err.code {
            Some(code) => format!("HTTP {}: Twilio error {}: {}", status, code, err.message),
            None => format!("HTTP {}: {}", status, err.message),
        },
        Err(_) => format!("HTTP {}: {}", status, body),
    }
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TwilioError {
    #[serde(default)]
    code: Option<i64>,
    message: String,
}
