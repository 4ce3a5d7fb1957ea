use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cadence::FollowUpCadence;
use super::domain::{Holder, MessageId, PacketId, PacketStatus, ThreadId};
use super::requests::RequestPacket;
use crate::workflows::listing::ListingId;

/// Whether follow-ups wait for operator review or go out directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    #[default]
    Draft,
    AutoSend,
}

/// Follow-up produced by a scheduler tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowUpDraft {
    pub listing_id: ListingId,
    pub packet_id: PacketId,
    pub thread_id: ThreadId,
    pub message_id: MessageId,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub dispatched: bool,
    pub next_follow_up: Option<DateTime<Utc>>,
}

/// Cadence resolution and reminder wording.
#[derive(Debug, Clone)]
pub struct FollowUpScheduler {
    default_cadence: FollowUpCadence,
    mode: DispatchMode,
}

impl FollowUpScheduler {
    pub fn new(default_cadence: FollowUpCadence, mode: DispatchMode) -> Self {
        Self {
            default_cadence,
            mode,
        }
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    pub fn default_cadence(&self) -> FollowUpCadence {
        self.default_cadence
    }

    pub fn cadence_for(&self, holder: &Holder) -> FollowUpCadence {
        holder.cadence.unwrap_or(self.default_cadence)
    }

    /// Whether `packet` should receive a follow-up at `now`.
    pub fn is_due(&self, packet: &RequestPacket, status: PacketStatus, now: DateTime<Utc>) -> bool {
        matches!(status, PacketStatus::Sent | PacketStatus::Waiting)
            && !packet.follow_ups_paused
            && packet.next_follow_up.is_some_and(|next| next <= now)
    }

    pub fn compose(
        &self,
        holder: &Holder,
        original_subject: Option<&str>,
        outstanding: &[&str],
        reminder_number: u32,
    ) -> (String, String) {
        let subject = match original_subject {
            Some(subject) => format!("Erinnerung: {subject}"),
            None => "Erinnerung: angeforderte Unterlagen".to_string(),
        };

        let mut body = format!("Guten Tag {},\n\n", holder.name);
        if reminder_number > 1 {
            body.push_str(&format!(
                "wir kommen erneut ({reminder_number}. Erinnerung) auf unsere Anfrage zurück. "
            ));
        } else {
            body.push_str("wir kommen auf unsere Anfrage zurück. ");
        }
        body.push_str("Folgende Unterlagen fehlen uns noch:\n");
        for item in outstanding {
            body.push_str(&format!("- {item}\n"));
        }
        body.push_str("\nVielen Dank und freundliche Grüße");

        (subject, body)
    }
}
