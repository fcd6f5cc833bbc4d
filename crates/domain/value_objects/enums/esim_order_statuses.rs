use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Statuses this service writes itself. The `status` column stays free text because
/// provider-reported values (`IN_USE`, `USED_UP`, `CANCEL`, ...) are stored verbatim.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EsimOrderStatus {
    #[default]
    Pending,
    GotResource,
    LowData,
    ExpiringSoon,
}

impl Display for EsimOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            EsimOrderStatus::Pending => "PENDING",
            EsimOrderStatus::GotResource => "GOT_RESOURCE",
            EsimOrderStatus::LowData => "LOW_DATA",
            EsimOrderStatus::ExpiringSoon => "EXPIRING_SOON",
        };
        write!(f, "{}", status)
    }
}
