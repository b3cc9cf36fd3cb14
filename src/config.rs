//! Service configuration.
//!
//! Values are read once at startup from the process environment (after
//! `.env` is loaded) and handed around as plain values afterwards.

use std::time::Duration;
use tracing::{info, warn};

use crate::error::ExtractError;

pub const DEFAULT_BASE_URL: &str = "https://api.veryfi.com/api/v8";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Veryfi account settings. Credentials stay optional here; their absence is
/// reported per request, not at startup.
#[derive(Debug, Clone)]
pub struct VeryfiConfig {
    pub client_id: Option<String>,
    pub username: Option<String>,
    pub api_key: Option<String>,
    /// Not used by the document-from-URL flow.
    pub client_secret: Option<String>,
    /// Not used by the document-from-URL flow.
    pub sandbox: bool,
    pub base_url: String,
    pub timeout: Duration,
}

/// The three credential values every provider call needs.
#[derive(Debug, Clone, Copy)]
pub struct Credentials<'a> {
    pub client_id: &'a str,
    pub username: &'a str,
    pub api_key: &'a str,
}

impl VeryfiConfig {
    /// Config with the given credentials and default endpoint settings.
    pub fn new(
        client_id: impl Into<String>,
        username: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client_id: Some(client_id.into()),
            username: Some(username.into()),
            api_key: Some(api_key.into()),
            client_secret: None,
            sandbox: false,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Borrow the required credentials, failing if any is missing or empty.
    pub fn credentials(&self) -> Result<Credentials<'_>, ExtractError> {
        fn present(value: &Option<String>) -> Option<&str> {
            value.as_deref().filter(|v| !v.is_empty())
        }

        match (
            present(&self.client_id),
            present(&self.username),
            present(&self.api_key),
        ) {
            (Some(client_id), Some(username), Some(api_key)) => Ok(Credentials {
                client_id,
                username,
                api_key,
            }),
            _ => Err(ExtractError::Configuration(
                "Veryfi credentials not configured".to_string(),
            )),
        }
    }

    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        let timeout_secs = parse_or_default(lookup, "VERYFI_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS, |v| {
            v.parse::<u64>().ok().filter(|secs| *secs > 0)
        });

        Self {
            client_id: lookup("VERYFI_CLIENT_ID"),
            username: lookup("VERYFI_USERNAME"),
            api_key: lookup("VERYFI_API_KEY"),
            client_secret: lookup("VERYFI_CLIENT_SECRET"),
            sandbox: lookup("VERYFI_SANDBOX")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            base_url: lookup("VERYFI_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

/// How the page category is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PageTypePolicy {
    /// Classify from the vendor name (pharmacy vs. regular bill).
    #[default]
    Infer,
    /// Always report "Final Bill".
    FinalBill,
}

impl PageTypePolicy {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "infer" => Some(Self::Infer),
            "final_bill" | "final-bill" => Some(Self::FinalBill),
            _ => None,
        }
    }
}

/// Knobs for the provider-to-output mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingPolicy {
    pub page_type: PageTypePolicy,
    pub include_reconciled_amount: bool,
}

impl Default for MappingPolicy {
    fn default() -> Self {
        Self {
            page_type: PageTypePolicy::Infer,
            include_reconciled_amount: true,
        }
    }
}

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub veryfi: VeryfiConfig,
    pub mapping: MappingPolicy,
    pub bind_addr: String,
}

impl AppConfig {
    /// Read configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let veryfi = VeryfiConfig::from_lookup(&lookup);

        let mapping = MappingPolicy {
            page_type: parse_or_default(
                &lookup,
                "PAGE_TYPE_POLICY",
                PageTypePolicy::default(),
                PageTypePolicy::parse,
            ),
            include_reconciled_amount: parse_or_default(
                &lookup,
                "INCLUDE_RECONCILED_AMOUNT",
                true,
                parse_bool,
            ),
        };

        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let config = Self {
            veryfi,
            mapping,
            bind_addr,
        };
        config.log_summary();
        config
    }

    fn log_summary(&self) {
        info!(
            "Veryfi config: base_url={}, timeout={}s, sandbox={}, client_secret set={}",
            self.veryfi.base_url,
            self.veryfi.timeout.as_secs(),
            self.veryfi.sandbox,
            self.veryfi.client_secret.is_some()
        );
        if self.veryfi.credentials().is_err() {
            warn!("Veryfi credentials incomplete; extraction requests will fail until configured");
        }
        info!(
            "Mapping policy: page_type={:?}, include_reconciled_amount={}",
            self.mapping.page_type, self.mapping.include_reconciled_amount
        );
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn parse_or_default<T: std::fmt::Debug>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    parse: impl Fn(&str) -> Option<T>,
) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => parse(&raw).unwrap_or_else(|| {
            warn!("Ignoring invalid {}={:?}, using {:?}", key, raw, default);
            default
        }),
    }
}
