mod sms;
mod templates;

pub use sms::TwilioSmsNotifier;
pub use templates::AlertTemplate;

/// Twilio account and phone numbers used for SMS alerts.
///
/// Values are read once at startup and not validated here; a missing or wrong
/// credential shows up as a failed send.
#[derive(Clone, Default)]
pub struct SmsConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub to_number: String,
}

impl SmsConfig {
    /// Load from environment variables.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).unwrap_or_default().trim().to_string();

        Self {
            account_sid: var("TWILIO_ACCOUNT_SID"),
            auth_token: var("TWILIO_AUTH_TOKEN"),
            from_number: var("TWILIO_PHONE_NUMBER"),
            to_number: var("PHONE_NUMBER"),
        }
    }

    /// Names of the variables that came up empty, for a startup warning.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("TWILIO_ACCOUNT_SID", &self.account_sid),
            ("TWILIO_AUTH_TOKEN", &self.auth_token),
            ("TWILIO_PHONE_NUMBER", &self.from_number),
            ("PHONE_NUMBER", &self.to_number),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

// Keep the auth token out of logs.
impl std::fmt::Debug for SmsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"***")
            .field("from_number", &self.from_number)
            .field("to_number", &self.to_number)
            .finish()
    }
}
