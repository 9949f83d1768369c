use serde::Deserialize;

use crate::bookings::types::BookingStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalMode {
    #[default]
    Auto,
    Manual,
}

/// Status a freshly submitted booking starts in.
pub fn initial_status(mode: ApprovalMode) -> BookingStatus {
    match mode {
        ApprovalMode::Auto => BookingStatus::Active,
        ApprovalMode::Manual => BookingStatus::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_decides_initial_status() {
        assert_eq!(initial_status(ApprovalMode::Auto), BookingStatus::Active);
        assert_eq!(initial_status(ApprovalMode::Manual), BookingStatus::Pending);
    }

    #[test]
    fn mode_parses_from_yaml() {
        let mode: ApprovalMode = serde_yaml::from_str("manual").unwrap();
        assert_eq!(mode, ApprovalMode::Manual);
    }
}
