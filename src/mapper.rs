//! Maps a raw Veryfi document onto the service's bill schema.
//!
//! The raw JSON is first read into a lenient typed view where every field is
//! optional and `null` means absent. Values of the wrong type are rejected
//! there, so mapping itself cannot fail halfway through.

use serde::{Deserialize, Deserializer};

use crate::config::{MappingPolicy, PageTypePolicy};
use crate::error::ExtractError;
use crate::schema::{BillItem, ExtractionResult, Page, PageType};

const PHARMACY_MARKERS: [&str; 3] = ["pharma", "pharmacy", "chemist"];

/// The subset of a Veryfi document this service reads.
#[derive(Debug, Default, Deserialize)]
struct VeryfiDocument {
    #[serde(default)]
    line_items: Option<Vec<VeryfiLineItem>>,
    #[serde(default, deserialize_with = "lenient_f64")]
    total: Option<f64>,
    #[serde(default)]
    vendor: Option<VeryfiVendor>,
}

#[derive(Debug, Deserialize)]
struct VeryfiLineItem {
    #[serde(default)]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    total: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    quantity: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct VeryfiVendor {
    #[serde(default)]
    name: Option<String>,
}

/// Numeric field that may arrive as a number or a numeric string.
///
/// `null` and `""` read as absent. Anything else that is not a number fails.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer) {
        Ok(None) => Ok(None),
        Ok(Some(Raw::Number(n))) => Ok(Some(n)),
        Ok(Some(Raw::Text(s))) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("{:?} is not a number", s)))
        }
        Err(_) => Err(serde::de::Error::custom("expected a number or numeric string")),
    }
}

/// Map a raw provider document into one page of bill items.
pub fn map_document(
    raw: &serde_json::Value,
    policy: &MappingPolicy,
) -> Result<ExtractionResult, ExtractError> {
    let doc = VeryfiDocument::deserialize(raw).map_err(|e| ExtractError::Mapping(e.to_string()))?;

    let items: Vec<BillItem> = doc
        .line_items
        .unwrap_or_default()
        .into_iter()
        .map(|li| BillItem {
            name: li.description.unwrap_or_default(),
            amount: li.total.unwrap_or(0.0),
            rate: li.price.unwrap_or(0.0),
            quantity: li.quantity.unwrap_or(0.0),
        })
        .collect();

    let vendor_name = doc
        .vendor
        .and_then(|v| v.name)
        .unwrap_or_default();

    let page = Page {
        page_number: "1".to_string(),
        page_type: page_type_for(&vendor_name, policy.page_type),
        items,
    };

    let reconciled_amount = policy
        .include_reconciled_amount
        .then(|| doc.total.unwrap_or(0.0));

    Ok(ExtractionResult::new(vec![page], reconciled_amount))
}

fn page_type_for(vendor_name: &str, policy: PageTypePolicy) -> PageType {
    match policy {
        PageTypePolicy::FinalBill => PageType::FinalBill,
        PageTypePolicy::Infer => classify_vendor(vendor_name),
    }
}

/// Pharmacy if the vendor name looks like one, regular bill otherwise.
pub fn classify_vendor(vendor_name: &str) -> PageType {
    let lowered = vendor_name.to_lowercase();
    if PHARMACY_MARKERS.iter().any(|m| lowered.contains(m)) {
        PageType::Pharmacy
    } else {
        PageType::BillDetail
    }
}
