//! Decoding of SignalR hub envelopes into outcome events.

use crate::error::{Error, Result};
use crate::state::OutcomeEvent;
use serde::Deserialize;

/// Hub method that carries round results.
pub const RESULT_METHOD: &str = "notifyChangePhrase";

/// Hub method used for application-level keepalive.
pub const KEEPALIVE_METHOD: &str = "PingPong";

/// `Dice1` value marking a round that has not been rolled yet.
pub const PENDING_DIE: i64 = -1;

/// What a single hub invocation turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedEvent {
    /// A resolved round.
    Outcome(OutcomeEvent),
    /// A round announced before its dice are known.
    Pending { session_id: u64 },
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "M", default)]
    messages: Vec<HubInvocation>,
}

#[derive(Debug, Deserialize)]
struct HubInvocation {
    #[serde(rename = "H", default)]
    hub: String,
    #[serde(rename = "M", default)]
    method: String,
    #[serde(rename = "A", default)]
    args: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct PhraseChange {
    #[serde(rename = "Result")]
    result: DiceResult,
    #[serde(rename = "SessionID")]
    session_id: u64,
}

#[derive(Debug, Deserialize)]
struct DiceResult {
    #[serde(rename = "Dice1")]
    dice1: i64,
    #[serde(rename = "Dice2")]
    dice2: i64,
    #[serde(rename = "Dice3")]
    dice3: i64,
}

/// Decode one raw transport frame.
///
/// Frames without hub invocations (keepalive acks, init frames) and
/// invocations for other hubs or methods decode to nothing. Malformed JSON,
/// a result invocation without a usable payload, or dice outside 1..=6 is an
/// error for the whole frame.
pub fn decode_message(raw: &str, hub_name: &str) -> Result<Vec<FeedEvent>> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    if !value.is_object() {
        return Ok(Vec::new());
    }

    let envelope: Envelope = serde_json::from_value(value)?;
    envelope
        .messages
        .into_iter()
        .filter(|m| m.hub.eq_ignore_ascii_case(hub_name) && m.method == RESULT_METHOD)
        .map(decode_invocation)
        .collect()
}

fn decode_invocation(invocation: HubInvocation) -> Result<FeedEvent> {
    let payload = invocation
        .args
        .into_iter()
        .next()
        .ok_or_else(|| Error::decode(format!("{RESULT_METHOD} without arguments")))?;
    let change: PhraseChange = serde_json::from_value(payload)?;
    let dice = change.result;

    if dice.dice1 == PENDING_DIE {
        return Ok(FeedEvent::Pending {
            session_id: change.session_id,
        });
    }

    OutcomeEvent::new(change.session_id, [dice.dice1, dice.dice2, dice.dice3])
        .map(FeedEvent::Outcome)
}

/// Keepalive invocation sent to the hub.
pub fn keepalive_frame(hub_name: &str) -> String {
    serde_json::json!({ "H": hub_name, "M": KEEPALIVE_METHOD, "I": 1 }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Label;
    use pretty_assertions::assert_eq;

    const HUB: &str = "luckydice1Hub";

    fn frame(hub: &str, method: &str, session: u64, dice: [i64; 3]) -> String {
        serde_json::json!({
            "C": "d-1,2|B,0|C,1",
            "M": [{
                "H": hub,
                "M": method,
                "A": [{
                    "Result": { "Dice1": dice[0], "Dice2": dice[1], "Dice3": dice[2] },
                    "SessionID": session,
                }]
            }]
        })
        .to_string()
    }

    #[test]
    fn test_decodes_resolved_round() {
        let events = decode_message(&frame(HUB, RESULT_METHOD, 2_041_337, [5, 4, 3]), HUB).unwrap();
        assert_eq!(events.len(), 1);

        let FeedEvent::Outcome(outcome) = events[0] else {
            panic!("expected an outcome, got {:?}", events[0]);
        };
        assert_eq!(outcome.session_id(), 2_041_337);
        assert_eq!(outcome.total(), 12);
        assert_eq!(outcome.label(), Label::High);
    }

    #[test]
    fn test_hub_name_is_case_insensitive() {
        let events = decode_message(&frame("LUCKYDICE1HUB", RESULT_METHOD, 9, [1, 1, 1]), HUB).unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_pending_round_is_flagged() {
        let events = decode_message(&frame(HUB, RESULT_METHOD, 10, [-1, -1, -1]), HUB).unwrap();
        assert_eq!(events, vec![FeedEvent::Pending { session_id: 10 }]);
    }

    #[test]
    fn test_other_traffic_decodes_to_nothing() {
        assert!(decode_message("{}", HUB).unwrap().is_empty());
        assert!(decode_message(r#"{"C":"x","S":1,"M":[]}"#, HUB).unwrap().is_empty());
        assert!(decode_message(r#"{"I":"1"}"#, HUB).unwrap().is_empty());
        assert!(decode_message("42", HUB).unwrap().is_empty());
        assert!(
            decode_message(&frame("otherHub", RESULT_METHOD, 1, [1, 2, 3]), HUB)
                .unwrap()
                .is_empty()
        );
        assert!(
            decode_message(&frame(HUB, "notifyBet", 1, [1, 2, 3]), HUB)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_malformed_frames_are_errors() {
        assert!(matches!(
            decode_message("{not json", HUB),
            Err(Error::Serialization(_))
        ));

        let no_args = format!(r#"{{"M":[{{"H":"{HUB}","M":"{RESULT_METHOD}","A":[]}}]}}"#);
        assert!(matches!(decode_message(&no_args, HUB), Err(Error::Decode(_))));

        let out_of_range = frame(HUB, RESULT_METHOD, 3, [2, 9, 1]);
        assert!(matches!(
            decode_message(&out_of_range, HUB),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn test_keepalive_frame_shape() {
        let value: serde_json::Value = serde_json::from_str(&keepalive_frame(HUB)).unwrap();
        assert_eq!(value["H"], HUB);
        assert_eq!(value["M"], KEEPALIVE_METHOD);
        assert_eq!(value["I"], 1);
    }
}
