//! Property lookups against an external registry, mapped onto the labels of
//! the property sheet so the edit form can fill itself in.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::{collections::BTreeMap, sync::Arc, time::Duration};
use thiserror::Error;

pub const DEFAULT_BOROUGH: &str = "montreal";

/// What the registry knows about a lot. Every attribute is optional; the
/// registry is free to send numbers or strings.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct PropertyAttributes {
    #[serde(default, deserialize_with = "loose_text")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub municipality: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub owner_name: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub year_of_construction: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub total_building_sf: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub land_sf: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub property_type: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub matricule: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub land_value: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub building_value: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub total_value: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub tax_assessment: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub account_number: Option<String>,
}

fn loose_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("no property found for lot {0}")]
    NotFound(String),
    #[error("property lookup timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("property lookup unavailable: {0}")]
    Unavailable(String),
    #[error("invalid response from property registry: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
#[error("property lookup failed: {0}")]
pub struct ScrapeError(#[from] pub LookupError);

#[async_trait]
pub trait PropertyLookup: Send + Sync {
    async fn lookup(
        &self,
        lot_number: &str,
        borough: &str,
    ) -> Result<PropertyAttributes, LookupError>;
}

/// Queries a JSON registry endpoint with `?lot_number=..&borough=..`.
pub struct HttpLookup {
    client: reqwest::Client,
    url: String,
}

impl HttpLookup {
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl PropertyLookup for HttpLookup {
    async fn lookup(
        &self,
        lot_number: &str,
        borough: &str,
    ) -> Result<PropertyAttributes, LookupError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("lot_number", lot_number), ("borough", borough)])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound(lot_number.to_string()));
        }
        if !status.is_success() {
            return Err(LookupError::Unavailable(format!(
                "registry responded with {status}"
            )));
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| LookupError::InvalidResponse(e.to_string()))
    }
}

/// Canned attributes derived from the lot number; for demos and local
/// development without a registry.
pub struct MockLookup;

#[async_trait]
impl PropertyLookup for MockLookup {
    async fn lookup(
        &self,
        lot_number: &str,
        borough: &str,
    ) -> Result<PropertyAttributes, LookupError> {
        let chars: Vec<char> = lot_number.chars().collect();
        let suffix: String = chars[chars.len().saturating_sub(3)..].iter().collect();
        Ok(PropertyAttributes {
            address: Some(format!("123 Main Street, {borough}, QC")),
            municipality: Some(borough.to_string()),
            owner_name: Some(format!("Property Owner {suffix}")),
            year_of_construction: Some("1995".into()),
            total_building_sf: Some("2,500".into()),
            land_sf: Some("5,000".into()),
            property_type: Some("Residential".into()),
            tax_assessment: Some("$450,000".into()),
            ..Default::default()
        })
    }
}

pub struct DisabledLookup;

#[async_trait]
impl PropertyLookup for DisabledLookup {
    async fn lookup(
        &self,
        _lot_number: &str,
        _borough: &str,
    ) -> Result<PropertyAttributes, LookupError> {
        Err(LookupError::Unavailable(
            "no property registry is configured".into(),
        ))
    }
}

/// What to hand back when the lookup fails.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum FallbackPolicy {
    /// Placeholder values flagged as such.
    Placeholder,
    Fail,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScrapeOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Sheet label -> value
    pub property: BTreeMap<String, String>,
    pub lot_number: String,
    pub borough: String,
}

pub struct ScrapeAdapter {
    lookup: Arc<dyn PropertyLookup>,
    timeout: Duration,
    fallback: FallbackPolicy,
}

impl ScrapeAdapter {
    pub fn new(
        lookup: Arc<dyn PropertyLookup>,
        timeout: Duration,
        fallback: FallbackPolicy,
    ) -> Self {
        Self {
            lookup,
            timeout,
            fallback,
        }
    }

    pub async fn scrape_property(
        &self,
        lot_number: &str,
        borough: &str,
    ) -> Result<ScrapeOutcome, ScrapeError> {
        let result = tokio::time::timeout(
            self.timeout,
            self.lookup.lookup(lot_number, borough),
        )
        .await
        .unwrap_or(Err(LookupError::Timeout(self.timeout)));

        match result {
            Ok(attrs) => {
                tracing::info!(lot_number, borough, "property lookup succeeded");
                Ok(ScrapeOutcome {
                    success: true,
                    fallback: false,
                    error: None,
                    property: to_form_fields(&attrs, lot_number, borough),
                    lot_number: lot_number.to_string(),
                    borough: borough.to_string(),
                })
            }
            Err(e) => match self.fallback {
                FallbackPolicy::Placeholder => {
                    tracing::warn!(
                        lot_number,
                        borough,
                        error = %e,
                        "property lookup failed, returning placeholder"
                    );
                    Ok(ScrapeOutcome {
                        success: false,
                        fallback: true,
                        error: Some(e.to_string()),
                        property: placeholder(lot_number, borough),
                        lot_number: lot_number.to_string(),
                        borough: borough.to_string(),
                    })
                }
                FallbackPolicy::Fail => {
                    tracing::warn!(lot_number, borough, error = %e, "property lookup failed");
                    Err(ScrapeError(e))
                }
            },
        }
    }
}

fn maps_link(address: &str) -> String {
    let query = address.split_whitespace().collect::<Vec<&str>>().join("+");
    format!("https://maps.google.com/maps?q={query}")
}

/// Map registry attributes onto sheet labels, dropping anything empty.
pub fn to_form_fields(
    attrs: &PropertyAttributes,
    lot_number: &str,
    borough: &str,
) -> BTreeMap<String, String> {
    let borough = attrs.municipality.as_deref().unwrap_or(borough);
    let link = attrs.address.as_deref().map(maps_link);

    #[rustfmt::skip]
    let pairs: [(&str, Option<&str>); 16] = [
        ("Address", attrs.address.as_deref()),
        ("Google Maps Link", link.as_deref()),
        ("Lot Number", Some(lot_number)),
        ("Borough", Some(borough)),
        ("Year of construction", attrs.year_of_construction.as_deref()),
        ("Total Building SF", attrs.total_building_sf.as_deref()),
        ("Google Maps Building SF", attrs.total_building_sf.as_deref()),
        ("Land SF", attrs.land_sf.as_deref()),
        ("Names of Owners", attrs.owner_name.as_deref()),
        ("Type of Property", attrs.property_type.as_deref()),
        ("Matricule", attrs.matricule.as_deref()),
        ("Land Value", attrs.land_value.as_deref()),
        ("Building Value", attrs.building_value.as_deref()),
        ("Total Value", attrs.total_value.as_deref()),
        ("Tax Assessment", attrs.tax_assessment.as_deref()),
        ("Account Number", attrs.account_number.as_deref()),
    ];

    pairs
        .into_iter()
        .filter_map(|(label, value)| {
            let value = value?.trim();
            (!value.is_empty()).then(|| (label.to_string(), value.to_string()))
        })
        .collect()
}

/// Stand-in values for a lot the registry couldn't tell us about.
pub fn placeholder(lot_number: &str, borough: &str) -> BTreeMap<String, String> {
    #[rustfmt::skip]
    let pairs = [
        ("Address", format!("Property {lot_number}")),
        ("Borough", borough.to_string()),
        ("Lot Number", lot_number.to_string()),
        ("Matricule", format!("{lot_number}-0000-0000")),
        ("Names of Owners", "Data not available".to_string()),
        ("Year of construction", "Unknown".to_string()),
        ("Total Building SF", "0".to_string()),
        ("Land SF", "0".to_string()),
        ("Land Value", "0".to_string()),
        ("Building Value", "0".to_string()),
        ("Total Value", "0".to_string()),
    ];
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
