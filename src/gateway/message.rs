use crate::Chips;
use crate::Error;
use crate::Identity;
use serde::Deserialize;
use serde::Serialize;

/// Messages sent from server to client over WebSocket.
/// Timer events carry the round number so clients can drop stale
/// events after a settlement rolls the round over.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Clock and pot snapshot: every tick, every accepted bid, and the
    /// fresh round after settlement or cancel.
    Timer {
        round: u64,
        seconds: u64,
        pot: Chips,
        #[serde(skip_serializing_if = "Option::is_none")]
        leader: Option<Identity>,
    },
    /// An account's balance changed. The reason distinguishes a win, a
    /// refund, or a top-up from ordinary spending.
    Coins {
        identity: Identity,
        balance: Chips,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// Full roster of identities currently online.
    Presence { online: Vec<Identity> },
    /// Someone came online.
    Joined { identity: Identity },
    /// Someone went offline.
    Left { identity: Identity },
    /// Chat relay.
    Chat {
        from: Identity,
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
    },
    /// Unicast rejection of this client's last request.
    Error { code: String, detail: String },
}

impl ServerMessage {
    pub fn timer(round: u64, seconds: u64, pot: Chips, leader: Option<Identity>) -> Self {
        Self::Timer {
            round,
            seconds,
            pot,
            leader,
        }
    }
    pub fn coins(identity: Identity, balance: Chips, reason: Option<&str>) -> Self {
        Self::Coins {
            identity,
            balance,
            reason: reason.map(str::to_string),
        }
    }
    pub fn presence(online: Vec<Identity>) -> Self {
        Self::Presence { online }
    }
    pub fn joined(identity: Identity) -> Self {
        Self::Joined { identity }
    }
    pub fn left(identity: Identity) -> Self {
        Self::Left { identity }
    }
    pub fn chat(from: Identity, text: String, kind: Option<String>) -> Self {
        Self::Chat { from, text, kind }
    }
    pub fn rejection(error: &Error) -> Self {
        Self::Error {
            code: error.code().to_string(),
            detail: error.to_string(),
        }
    }
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("serialize server message")
    }
}

/// Messages a client may send over WebSocket. Identity is never taken
/// from the payload; it comes from the authenticated session that
/// opened the connection.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Announce presence to the roster.
    Join,
    /// Retire from the roster while staying connected.
    Leave,
    /// Commit one stake to the current round. `compete` on the wire,
    /// after the button the clients present. An explicit amount is
    /// validated against the configured stake, never honored as-is.
    #[serde(rename = "compete")]
    Bid {
        #[serde(default)]
        amount: Option<Chips>,
    },
    /// Say something to everyone.
    Chat {
        text: String,
        #[serde(default)]
        kind: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_serializes_tagged() {
        let msg = ServerMessage::timer(3, 240, 500, Some(String::from("alice")));
        let json = msg.to_json();
        assert!(json.contains(r#""type":"timer""#));
        assert!(json.contains(r#""round":3"#));
        assert!(json.contains(r#""leader":"alice""#));
    }

    #[test]
    fn absent_leader_is_omitted() {
        let json = ServerMessage::timer(1, 240, 0, None).to_json();
        assert!(!json.contains("leader"));
    }

    #[test]
    fn client_compete_parses() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"compete"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Bid { amount: None }));
    }

    #[test]
    fn client_compete_carries_an_amount() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"compete","amount":100}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Bid { amount: Some(100) }));
    }

    #[test]
    fn client_chat_parses_without_kind() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"chat","text":"gl"}"#).unwrap();
        match msg {
            ClientMessage::Chat { text, kind } => {
                assert_eq!(text, "gl");
                assert!(kind.is_none());
            }
            other => panic!("expected chat, got {:?}", other),
        }
    }

    #[test]
    fn unknown_client_type_rejected() {
        let parsed = serde_json::from_str::<ClientMessage>(r#"{"type":"steal"}"#);
        assert!(parsed.is_err());
    }
}
