//! JSON command protocol.
//!
//! Requests are objects tagged by `action`, the same shape the browser
//! extension posts to its background page:
//!
//! ```json
//! {"action": "getDailyData"}
//! {"action": "resetData"}
//! {"action": "trackTokens", "data": {"tokens": 12, "provider": "Claude", "messageType": "user"}}
//! {"action": "getHistory"}
//! ```
//!
//! `getDailyData` answers with the ledger itself, `getHistory` with a list
//! of archived days, and everything else with an [`Ack`].

use footprint_core::{ArchivedLedger, DailyLedger, TrackTokensPayload};
use serde::{Deserialize, Serialize};

/// A command sent to the ledger service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    /// Read the current day's totals.
    GetDailyData,
    /// Archive today and start from zero.
    ResetData,
    /// Record one observed turn.
    TrackTokens {
        /// The observed turn.
        data: TrackTokensPayload,
    },
    /// List archived days, most recent first.
    GetHistory,
}

impl Request {
    /// Returns the wire name of this request.
    pub fn action(&self) -> &'static str {
        match self {
            Self::GetDailyData => "getDailyData",
            Self::ResetData => "resetData",
            Self::TrackTokens { .. } => "trackTokens",
            Self::GetHistory => "getHistory",
        }
    }
}

/// Acknowledgement for commands without a data result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// Whether the command fully succeeded.
    pub success: bool,
    /// Failure description when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when a tracked turn was dropped as already counted.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
}

impl Ack {
    /// A plain success.
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            duplicate: false,
        }
    }

    /// A success that was a no-op because the turn was already counted.
    pub fn duplicate() -> Self {
        Self {
            duplicate: true,
            ..Self::ok()
        }
    }

    /// A failure with a message.
    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            duplicate: false,
        }
    }
}

/// A reply from the ledger service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    /// Current day's totals.
    DailyData(DailyLedger),
    /// Archived days, most recent first.
    History(Vec<ArchivedLedger>),
    /// Acknowledgement.
    Ack(Ack),
}

impl Response {
    /// Returns false only for a failed acknowledgement.
    pub fn is_success(&self) -> bool {
        match self {
            Self::Ack(ack) => ack.success,
            Self::DailyData(_) | Self::History(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use footprint_core::Role;

    #[test]
    fn test_parse_extension_messages() {
        let req: Request = serde_json::from_str(r#"{"action":"getDailyData"}"#).unwrap();
        assert_eq!(req, Request::GetDailyData);

        let req: Request = serde_json::from_str(r#"{"action":"resetData"}"#).unwrap();
        assert_eq!(req.action(), "resetData");

        let req: Request = serde_json::from_str(
            r#"{"action":"trackTokens","data":{"tokens":12,"provider":"ChatGPT","messageType":"user","timestamp":1700000000000,"messagePreview":"hi there"}}"#,
        )
        .unwrap();
        let Request::TrackTokens { data } = req else {
            panic!("expected trackTokens");
        };
        assert_eq!(data.tokens, 12);
        assert_eq!(data.message_type, Role::User);
        assert_eq!(data.timestamp, Some(1_700_000_000_000));
    }

    #[test]
    fn test_unknown_action_rejected() {
        assert!(serde_json::from_str::<Request>(r#"{"action":"launchRockets"}"#).is_err());
    }

    #[test]
    fn test_ack_shapes() {
        assert_eq!(
            serde_json::to_string(&Response::Ack(Ack::ok())).unwrap(),
            r#"{"success":true}"#
        );
        assert_eq!(
            serde_json::to_string(&Ack::duplicate()).unwrap(),
            r#"{"success":true,"duplicate":true}"#
        );
        let failed = serde_json::to_value(Ack::failed("disk full")).unwrap();
        assert_eq!(failed["success"], false);
        assert_eq!(failed["error"], "disk full");
    }

    #[test]
    fn test_daily_data_is_bare_ledger() {
        let ledger = DailyLedger::new(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        let json = serde_json::to_value(Response::DailyData(ledger)).unwrap();
        assert_eq!(json["date"], "2026-10-18");
        assert_eq!(json["totalTokens"], 0);
        assert!(Response::History(vec![]).is_success());
        assert!(!Response::Ack(Ack::failed("x")).is_success());
    }
}
