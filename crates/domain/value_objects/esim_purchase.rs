use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{entities::esim_orders::EsimOrderEntity, value_objects::discounts::DiscountDto};

pub const MIN_PURCHASE_QUANTITY: i64 = 1;
pub const MAX_PURCHASE_QUANTITY: i64 = 10;

/// Raw purchase body. Fields stay loosely typed so type mismatches surface as
/// field-level validation errors instead of a generic body rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseEsimModel {
    pub package_code: Option<Value>,
    pub quantity: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPurchase {
    pub package_code: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

impl PurchaseEsimModel {
    pub fn validate(&self) -> Result<ValidatedPurchase, Vec<FieldError>> {
        let mut errors = Vec::new();

        let package_code = match &self.package_code {
            Some(Value::String(raw)) if !raw.trim().is_empty() => Some(raw.trim().to_string()),
            Some(Value::String(_)) | None | Some(Value::Null) => {
                errors.push(FieldError::new("packageCode", "packageCode is required"));
                None
            }
            Some(_) => {
                errors.push(FieldError::new("packageCode", "packageCode must be a string"));
                None
            }
        };

        let quantity = match &self.quantity {
            None | Some(Value::Null) => Some(MIN_PURCHASE_QUANTITY),
            Some(Value::Number(number)) => match number.as_i64().or_else(|| {
                number
                    .as_f64()
                    .filter(|value| value.fract() == 0.0 && value.abs() <= i64::MAX as f64)
                    .map(|value| value as i64)
            }) {
                Some(value) if (MIN_PURCHASE_QUANTITY..=MAX_PURCHASE_QUANTITY).contains(&value) => {
                    Some(value)
                }
                Some(_) => {
                    errors.push(FieldError::new(
                        "quantity",
                        "quantity must be between 1 and 10",
                    ));
                    None
                }
                None => {
                    errors.push(FieldError::new("quantity", "quantity must be an integer"));
                    None
                }
            },
            Some(_) => {
                errors.push(FieldError::new("quantity", "quantity must be an integer"));
                None
            }
        };

        match (package_code, quantity) {
            (Some(package_code), Some(quantity)) if errors.is_empty() => Ok(ValidatedPurchase {
                package_code,
                quantity: quantity as i32,
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EsimProfileDto {
    pub iccid: Option<String>,
    pub ac: Option<String>,
    pub qr_code_url: Option<String>,
    pub smdp_status: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PackageDto {
    pub package_code: String,
    pub package_name: Option<String>,
    pub total_volume: Option<i64>,
    pub expired_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EsimPurchaseObj {
    pub order_no: String,
    pub esim_list: Vec<EsimProfileDto>,
    pub package_list: Vec<PackageDto>,
    pub discount: Option<DiscountDto>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EsimPurchaseResponse {
    pub success: bool,
    pub obj: EsimPurchaseObj,
}

impl From<EsimPurchaseObj> for EsimPurchaseResponse {
    fn from(obj: EsimPurchaseObj) -> Self {
        Self { success: true, obj }
    }
}

impl From<&EsimOrderEntity> for EsimPurchaseObj {
    /// Rebuilds the purchase payload from what is stored locally.
    fn from(order: &EsimOrderEntity) -> Self {
        let esim_list = if order.iccid.is_some() || order.lpa_code.is_some() {
            vec![EsimProfileDto {
                iccid: order.iccid.clone(),
                ac: order.lpa_code.clone(),
                qr_code_url: order.qr_code_url.clone(),
                smdp_status: order.smdp_status.clone(),
            }]
        } else {
            Vec::new()
        };

        Self {
            order_no: order.order_no.clone(),
            esim_list,
            package_list: vec![PackageDto {
                package_code: order.package_code.clone(),
                package_name: None,
                total_volume: order.total_volume,
                expired_time: order.expired_time.map(|value| value.to_rfc3339()),
            }],
            discount: None,
        }
    }
}
