use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Draft,
    Pending,
    Reviewed,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Reviewed => "reviewed",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "pending" => Some(Self::Pending),
            "reviewed" => Some(Self::Reviewed),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::RequestStatus;

    #[test]
    fn status_round_trips_from_wire_encoding() {
        let cases = [
            RequestStatus::Draft,
            RequestStatus::Pending,
            RequestStatus::Reviewed,
            RequestStatus::Approved,
            RequestStatus::Rejected,
        ];

        for status in cases {
            assert_eq!(RequestStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn parse_is_case_insensitive_and_rejects_unknown_values() {
        assert_eq!(RequestStatus::parse(" Reviewed "), Some(RequestStatus::Reviewed));
        assert_eq!(RequestStatus::parse("archived"), None);
    }

    #[test]
    fn only_approved_and_rejected_are_terminal() {
        assert!(RequestStatus::Approved.is_terminal());
        assert!(RequestStatus::Rejected.is_terminal());
        assert!(!RequestStatus::Pending.is_terminal());
    }
}
