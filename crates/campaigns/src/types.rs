use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ── Message template ────────────────────────────────────────────────────────

/// One part of a campaign's message template.
///
/// A closed set of variants, validated at campaign-creation time — the send
/// path never sees a malformed part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePart {
    Text {
        content: String,
    },
    Image {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Audio {
        url: String,
    },
}

impl MessagePart {
    fn validate(&self) -> Result<()> {
        match self {
            Self::Text { content } => {
                if content.trim().is_empty() {
                    return Err(Error::invalid("'content' is required for text parts"));
                }
            },
            Self::Image { url, .. } | Self::Audio { url } => {
                url::Url::parse(url)
                    .map_err(|_| Error::invalid(format!("invalid media URL: {url}")))?;
            },
        }
        Ok(())
    }
}

/// Replace every `{{name}}` placeholder (any casing) with the given name.
pub fn substitute_name(text: &str, name: &str) -> String {
    const PLACEHOLDER: &str = "{{name}}";
    let lower = text.to_ascii_lowercase();
    let mut out = String::with_capacity(text.len());
    let mut idx = 0;
    while let Some(pos) = lower[idx..].find(PLACEHOLDER) {
        let at = idx + pos;
        out.push_str(&text[idx..at]);
        out.push_str(name);
        idx = at + PLACEHOLDER.len();
    }
    out.push_str(&text[idx..]);
    out
}

// ── Enumerations ────────────────────────────────────────────────────────────

/// Typing-speed profile: milliseconds of simulated typing per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelaySpeed {
    Fast,
    Medium,
    Slow,
    Safe,
}

impl DelaySpeed {
    #[must_use]
    pub fn ms_per_char(self) -> u64 {
        match self {
            Self::Fast => 7,
            Self::Medium => 15,
            Self::Slow => 25,
            Self::Safe => 40,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Medium => "medium",
            Self::Slow => "slow",
            Self::Safe => "safe",
        }
    }

    /// Parse a stored value; unknown values fall back to the medium profile.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "fast" => Self::Fast,
            "slow" => Self::Slow,
            "safe" => Self::Safe,
            _ => Self::Medium,
        }
    }
}

/// Which downstream sender implementation handles dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendingMode {
    Internal,
    N8n,
}

impl SendingMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::N8n => "n8n",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "n8n" => Self::N8n,
            _ => Self::Internal,
        }
    }
}

/// Campaign lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Running,
    Paused,
    Stopped,
    Completed,
    Failed,
}

impl CampaignStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(Self::Draft),
            "running" => Ok(Self::Running),
            "paused" => Ok(Self::Paused),
            "stopped" => Ok(Self::Stopped),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(Error::invalid(format!("unknown campaign status: {other}"))),
        }
    }

    /// Whether a start control action is permitted from this status.
    /// `completed` and `failed` are terminal.
    #[must_use]
    pub fn can_start(self) -> bool {
        matches!(self, Self::Draft | Self::Paused | Self::Stopped)
    }

    /// Whether the campaign is actively held by the engine (deletion guard).
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }
}

/// Recipient dispatch status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientStatus {
    Pending,
    Sent,
    Failed,
}

impl RecipientStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            other => Err(Error::invalid(format!("unknown recipient status: {other}"))),
        }
    }
}

/// Control actions accepted by the campaign service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    Start,
    Pause,
    Stop,
}

// ── Records ─────────────────────────────────────────────────────────────────

/// A stored campaign. The recipient list is immutable after creation; only
/// campaign and recipient statuses mutate afterward.
#[derive(Debug, Clone, Serialize)]
pub struct Campaign {
    pub id: String,
    pub owner_id: String,
    pub channel_id: String,
    pub name: String,
    pub parts: Vec<MessagePart>,
    pub use_placeholders: bool,
    pub delay_speed: DelaySpeed,
    pub delay_from_secs: u32,
    pub delay_to_secs: u32,
    pub sending_mode: SendingMode,
    pub status: CampaignStatus,
    pub created_at_ms: i64,
}

/// One target address within a campaign's audience.
#[derive(Debug, Clone, Serialize)]
pub struct Recipient {
    pub id: i64,
    pub campaign_id: String,
    pub address: String,
    pub status: RecipientStatus,
    pub log_message: Option<String>,
    pub sent_at_ms: Option<i64>,
}

/// Listing row: campaign plus recipient progress counts.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignSummary {
    pub id: String,
    pub name: String,
    pub channel_id: String,
    pub status: CampaignStatus,
    pub created_at_ms: i64,
    pub total_recipients: i64,
    pub sent_recipients: i64,
}

/// Per-status recipient counts for one campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: i64,
    pub sent: i64,
    pub failed: i64,
}

impl StatusCounts {
    #[must_use]
    pub fn total(self) -> i64 {
        self.pending + self.sent + self.failed
    }
}

// ── Creation ────────────────────────────────────────────────────────────────

/// Validated input for creating a campaign in `draft` state.
#[derive(Debug, Clone, Deserialize)]
pub struct CampaignDraft {
    pub name: String,
    pub channel_id: String,
    pub parts: Vec<MessagePart>,
    pub addresses: Vec<String>,
    pub use_placeholders: bool,
    pub delay_speed: DelaySpeed,
    pub delay_from_secs: u32,
    pub delay_to_secs: u32,
    pub sending_mode: SendingMode,
}

impl CampaignDraft {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid("campaign name is required"));
        }
        if self.parts.is_empty() {
            return Err(Error::invalid("at least one message part is required"));
        }
        for part in &self.parts {
            part.validate()?;
        }
        if self.addresses.is_empty() {
            return Err(Error::invalid("at least one recipient address is required"));
        }
        if self.addresses.iter().any(|a| a.trim().is_empty()) {
            return Err(Error::invalid("recipient addresses must be non-empty"));
        }
        if self.delay_to_secs < self.delay_from_secs {
            return Err(Error::invalid(
                "'to' delay must be greater than or equal to 'from' delay",
            ));
        }
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn draft() -> CampaignDraft {
        CampaignDraft {
            name: "Spring promo".into(),
            channel_id: "ch1".into(),
            parts: vec![MessagePart::Text {
                content: "Hello {{name}}".into(),
            }],
            addresses: vec!["5511999990000".into()],
            use_placeholders: true,
            delay_speed: DelaySpeed::Medium,
            delay_from_secs: 5,
            delay_to_secs: 10,
            sending_mode: SendingMode::Internal,
        }
    }

    #[test]
    fn message_part_round_trips_tagged_json() {
        let part = MessagePart::Image {
            url: "https://cdn.example.com/promo.png".into(),
            caption: Some("New offer".into()),
        };
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["type"], "image");
        let back: MessagePart = serde_json::from_value(json).unwrap();
        assert_eq!(back, part);
    }

    #[test]
    fn valid_draft_passes() {
        assert!(draft().validate().is_ok());
    }

    #[test]
    fn empty_text_part_is_rejected() {
        let mut d = draft();
        d.parts = vec![MessagePart::Text { content: "  ".into() }];
        assert!(d.validate().is_err());
    }

    #[test]
    fn malformed_media_url_is_rejected() {
        let mut d = draft();
        d.parts = vec![MessagePart::Audio {
            url: "not-a-url".into(),
        }];
        assert!(d.validate().is_err());
    }

    #[test]
    fn inverted_delay_range_is_rejected() {
        let mut d = draft();
        d.delay_from_secs = 10;
        d.delay_to_secs = 5;
        assert!(d.validate().is_err());
    }

    #[test]
    fn empty_recipient_list_is_rejected() {
        let mut d = draft();
        d.addresses.clear();
        assert!(d.validate().is_err());
    }

    #[rstest]
    #[case(DelaySpeed::Fast, 7)]
    #[case(DelaySpeed::Medium, 15)]
    #[case(DelaySpeed::Slow, 25)]
    #[case(DelaySpeed::Safe, 40)]
    fn speed_table(#[case] speed: DelaySpeed, #[case] expected: u64) {
        assert_eq!(speed.ms_per_char(), expected);
    }

    #[test]
    fn unknown_speed_falls_back_to_medium() {
        assert_eq!(DelaySpeed::parse("warp"), DelaySpeed::Medium);
    }

    #[test]
    fn placeholder_substitution_is_case_insensitive() {
        assert_eq!(
            substitute_name("Hi {{name}}, {{NAME}}!", "Alice"),
            "Hi Alice, Alice!"
        );
        assert_eq!(substitute_name("no placeholder", "Alice"), "no placeholder");
    }

    #[test]
    fn start_allowed_from_draft_paused_stopped_only() {
        assert!(CampaignStatus::Draft.can_start());
        assert!(CampaignStatus::Paused.can_start());
        assert!(CampaignStatus::Stopped.can_start());
        assert!(!CampaignStatus::Running.can_start());
        assert!(!CampaignStatus::Completed.can_start());
        assert!(!CampaignStatus::Failed.can_start());
    }
}
