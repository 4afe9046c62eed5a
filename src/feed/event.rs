use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::lifecycle::{Transmutation, TransmutationStatus};

/// What happened to a transmutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Started,
    Updated,
    Completed,
    Cancelled,
}

impl EventKind {
    pub fn wire_name(self) -> &'static str {
        match self {
            EventKind::Started => "transmutation:started",
            EventKind::Updated => "transmutation:updated",
            EventKind::Completed => "transmutation:completed",
            EventKind::Cancelled => "transmutation:cancelled",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        [
            EventKind::Started,
            EventKind::Updated,
            EventKind::Completed,
            EventKind::Cancelled,
        ]
        .into_iter()
        .find(|k| k.wire_name() == name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// A change notification, as carried on the feed:
/// `{"type": "transmutation:<kind>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ChangeEvent {
    #[serde(rename = "transmutation:started")]
    Started(Transmutation),
    #[serde(rename = "transmutation:updated")]
    Updated(Transmutation),
    #[serde(rename = "transmutation:completed")]
    Completed(Transmutation),
    #[serde(rename = "transmutation:cancelled")]
    Cancelled(Transmutation),
}

impl ChangeEvent {
    /// The event announcing that `record` reached its current status.
    pub fn for_transition(record: Transmutation) -> Self {
        match record.status {
            TransmutationStatus::Completed => ChangeEvent::Completed(record),
            TransmutationStatus::Cancelled => ChangeEvent::Cancelled(record),
            TransmutationStatus::PendingApproval | TransmutationStatus::InProgress => {
                ChangeEvent::Updated(record)
            }
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            ChangeEvent::Started(_) => EventKind::Started,
            ChangeEvent::Updated(_) => EventKind::Updated,
            ChangeEvent::Completed(_) => EventKind::Completed,
            ChangeEvent::Cancelled(_) => EventKind::Cancelled,
        }
    }

    pub fn data(&self) -> &Transmutation {
        match self {
            ChangeEvent::Started(t)
            | ChangeEvent::Updated(t)
            | ChangeEvent::Completed(t)
            | ChangeEvent::Cancelled(t) => t,
        }
    }

    pub fn into_data(self) -> Transmutation {
        match self {
            ChangeEvent::Started(t)
            | ChangeEvent::Updated(t)
            | ChangeEvent::Completed(t)
            | ChangeEvent::Cancelled(t) => t,
        }
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// A decoded feed frame. Frames with an unrecognised `type` are kept apart
/// from change events so subscribers can ignore them.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    Change(ChangeEvent),
    Unknown { kind: Option<String> },
}

impl FeedMessage {
    /// Decodes one text frame.
    ///
    /// Fails when the frame is not JSON, or when it claims a known event type
    /// but its payload does not match the transmutation schema.
    pub fn decode(frame: &str) -> serde_json::Result<Self> {
        let value: Value = serde_json::from_str(frame)?;
        let kind = value.get("type").and_then(Value::as_str).map(str::to_owned);

        match kind.as_deref().and_then(EventKind::from_wire) {
            Some(_) => Ok(FeedMessage::Change(serde_json::from_value(value)?)),
            None => Ok(FeedMessage::Unknown { kind }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::ids::{AlchemistId, TransmutationId};
    use crate::pricing::{PricingModel, SimulationRequest};

    fn record(status: TransmutationStatus) -> Transmutation {
        let estimate = PricingModel::new(30)
            .simulate(&SimulationRequest::default(), &InMemoryCatalog::default());
        let mut t = Transmutation::new(TransmutationId(5), AlchemistId(7), "Gold".into(), &estimate);
        t.status = status;
        t
    }

    #[test]
    fn transition_events_follow_status() {
        use TransmutationStatus::*;
        assert_eq!(ChangeEvent::for_transition(record(InProgress)).kind(), EventKind::Updated);
        assert_eq!(ChangeEvent::for_transition(record(Completed)).kind(), EventKind::Completed);
        assert_eq!(ChangeEvent::for_transition(record(Cancelled)).kind(), EventKind::Cancelled);
    }

    #[test]
    fn encodes_type_and_data_envelope() {
        let ev = ChangeEvent::Started(record(TransmutationStatus::PendingApproval));
        let value: Value = serde_json::from_str(&ev.encode().unwrap()).unwrap();
        assert_eq!(value["type"], "transmutation:started");
        assert_eq!(value["data"]["id"], 5);
        assert_eq!(value["data"]["status"], "PENDING_APPROVAL");
    }

    #[test]
    fn decodes_known_events() {
        let ev = ChangeEvent::Cancelled(record(TransmutationStatus::Cancelled));
        let decoded = FeedMessage::decode(&ev.encode().unwrap()).unwrap();
        assert_eq!(decoded, FeedMessage::Change(ev));
    }

    #[test]
    fn unknown_types_are_not_errors() {
        let decoded = FeedMessage::decode(r#"{"type": "mission:created", "data": {}}"#).unwrap();
        assert_eq!(
            decoded,
            FeedMessage::Unknown {
                kind: Some("mission:created".into())
            }
        );
        let untyped = FeedMessage::decode(r#"{"hello": 1}"#).unwrap();
        assert_eq!(untyped, FeedMessage::Unknown { kind: None });
    }

    #[test]
    fn malformed_frames_fail_to_decode() {
        assert!(FeedMessage::decode("not json").is_err());
        assert!(
            FeedMessage::decode(r#"{"type": "transmutation:updated", "data": {"id": "x"}}"#)
                .is_err()
        );
    }

    #[test]
    fn wire_names_round_trip() {
        for kind in [
            EventKind::Started,
            EventKind::Updated,
            EventKind::Completed,
            EventKind::Cancelled,
        ] {
            assert_eq!(EventKind::from_wire(kind.wire_name()), Some(kind));
        }
        assert_eq!(EventKind::from_wire("transmutation:failed"), None);
    }
}
