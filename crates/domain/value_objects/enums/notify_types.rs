use std::fmt::Display;

/// Notification kinds pushed by eSIM Access. Anything else is carried as `Unknown`
/// so the receiver can acknowledge it without acting on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyType {
    OrderStatus,
    EsimStatus,
    DataUsage,
    ValidityUsage,
    Unknown(String),
}

impl NotifyType {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "ORDER_STATUS" => NotifyType::OrderStatus,
            "ESIM_STATUS" => NotifyType::EsimStatus,
            "DATA_USAGE" => NotifyType::DataUsage,
            "VALIDITY_USAGE" => NotifyType::ValidityUsage,
            other => NotifyType::Unknown(other.to_string()),
        }
    }
}

impl Display for NotifyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let notify_type = match self {
            NotifyType::OrderStatus => "ORDER_STATUS",
            NotifyType::EsimStatus => "ESIM_STATUS",
            NotifyType::DataUsage => "DATA_USAGE",
            NotifyType::ValidityUsage => "VALIDITY_USAGE",
            NotifyType::Unknown(raw) => raw.as_str(),
        };
        write!(f, "{}", notify_type)
    }
}
