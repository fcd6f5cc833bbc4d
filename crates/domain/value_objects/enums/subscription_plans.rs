use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SubscriptionPlan {
    Privilege,
    Elite,
    Black,
    Other(String),
}

impl Display for SubscriptionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let plan = match self {
            SubscriptionPlan::Privilege => "privilege",
            SubscriptionPlan::Elite => "elite",
            SubscriptionPlan::Black => "black",
            SubscriptionPlan::Other(raw) => raw.as_str(),
        };
        write!(f, "{}", plan)
    }
}

impl SubscriptionPlan {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "privilege" => SubscriptionPlan::Privilege,
            "elite" => SubscriptionPlan::Elite,
            "black" => SubscriptionPlan::Black,
            _ => SubscriptionPlan::Other(value.trim().to_string()),
        }
    }
}
