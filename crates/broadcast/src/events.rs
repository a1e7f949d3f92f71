use serde::Serialize;

/// Per-recipient delta carried by a [`Event::CampaignProgress`] update.
#[derive(Debug, Clone, Serialize)]
pub struct RecipientProgress {
    pub id: i64,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_message: Option<String>,
}

/// Events delivered to connected observers of an owner's room.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    /// A channel's connectivity status changed (reconciliation or webhook).
    ChannelStatusUpdate {
        channel_name: String,
        status: String,
    },
    /// A campaign moved to a new lifecycle status.
    CampaignStatusUpdate {
        campaign_id: String,
        status: String,
    },
    /// One or more recipients of a running campaign changed status.
    CampaignProgress {
        campaign_id: String,
        updated_recipients: Vec<RecipientProgress>,
    },
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization_tags() {
        let event = Event::CampaignStatusUpdate {
            campaign_id: "c1".into(),
            status: "running".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "campaign_status_update");
        assert_eq!(json["campaign_id"], "c1");
        assert_eq!(json["status"], "running");
    }

    #[test]
    fn progress_omits_empty_log() {
        let event = Event::CampaignProgress {
            campaign_id: "c1".into(),
            updated_recipients: vec![RecipientProgress {
                id: 7,
                status: "sent".into(),
                log_message: None,
            }],
        };
        let json = serde_json::to_value(&event).unwrap();
        let recipient = &json["updated_recipients"][0];
        assert_eq!(recipient["id"], 7);
        assert!(recipient.get("log_message").is_none());
    }
}
