//! Request/response types exposed by the service.
//!
//! Field names on the wire follow the `item_*` / `page_no` / `bill_items`
//! convention downstream consumers already read.

use serde::{Deserialize, Serialize};

/// Inbound body for `POST /extract-bill-data`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractRequest {
    /// Publicly reachable URL of the bill document.
    pub document: String,
}

/// One billed entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillItem {
    #[serde(rename = "item_name")]
    pub name: String,
    #[serde(rename = "item_amount")]
    pub amount: f64,
    #[serde(rename = "item_rate")]
    pub rate: f64,
    #[serde(rename = "item_quantity")]
    pub quantity: f64,
}

/// Category of a page of line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageType {
    #[serde(rename = "Bill Detail")]
    BillDetail,
    #[serde(rename = "Final Bill")]
    FinalBill,
    #[serde(rename = "Pharmacy")]
    Pharmacy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(rename = "page_no")]
    pub page_number: String,
    pub page_type: PageType,
    #[serde(rename = "bill_items")]
    pub items: Vec<BillItem>,
}

/// Mapped bill data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(rename = "pagewise_line_items")]
    pub pages: Vec<Page>,
    pub total_item_count: usize,
    /// Document total as reported by the provider, when carried.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconciled_amount: Option<f64>,
}

impl ExtractionResult {
    pub fn new(pages: Vec<Page>, reconciled_amount: Option<f64>) -> Self {
        let total_item_count = pages.iter().map(|p| p.items.len()).sum();
        Self {
            pages,
            total_item_count,
            reconciled_amount,
        }
    }
}

/// Token accounting. Zero while the provider does no metered inference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub total_tokens: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Success envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractResponse {
    pub is_success: bool,
    pub token_usage: TokenUsage,
    pub data: ExtractionResult,
}

impl ExtractResponse {
    pub fn success(data: ExtractionResult) -> Self {
        Self {
            is_success: true,
            token_usage: TokenUsage::default(),
            data,
        }
    }
}

/// Failure envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureResponse {
    pub is_success: bool,
    pub message: String,
}

impl FailureResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            is_success: false,
            message: message.into(),
        }
    }
}
