use super::{scrape::ScrapeAdapter, store::PropertyStore};
use serde::Serialize;
use std::{fmt, str::FromStr, sync::Arc};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PropertyStore>,
    pub scraper: Arc<ScrapeAdapter>,
}

/// The fixed set of sections on a property sheet, in display order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKey {
    PropertyInfo,
    OwnerInfo,
    TitleInfo,
    ImportantInfo,
    BuildingBreakdown,
    OurOffer,
    Income,
    Questions,
}

impl SectionKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKey::PropertyInfo => "property_info",
            SectionKey::OwnerInfo => "owner_info",
            SectionKey::TitleInfo => "title_info",
            SectionKey::ImportantInfo => "important_info",
            SectionKey::BuildingBreakdown => "building_breakdown",
            SectionKey::OurOffer => "our_offer",
            SectionKey::Income => "income",
            SectionKey::Questions => "questions",
        }
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "property_info" => SectionKey::PropertyInfo,
            "owner_info" => SectionKey::OwnerInfo,
            "title_info" => SectionKey::TitleInfo,
            "important_info" => SectionKey::ImportantInfo,
            "building_breakdown" => SectionKey::BuildingBreakdown,
            "our_offer" => SectionKey::OurOffer,
            "income" => SectionKey::Income,
            "questions" => SectionKey::Questions,
            _ => return Err(()),
        })
    }
}

/// Which of a section's value cells a field or edit refers to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValueColumn {
    Primary,
    /// Only the "Our Offer vs Vendor's Asking" section has one.
    Vendor,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Field {
    pub row: u32,
    pub label: String,
    pub value: String,
    /// Present iff the section has a vendor column.
    pub vendor_value: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Section {
    pub key: SectionKey,
    pub title: &'static str,
    pub fields: Vec<Field>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PropertyRecord {
    pub id: String,
    pub sections: Vec<Section>,
}

impl PropertyRecord {
    pub fn section(&self, key: SectionKey) -> Option<&Section> {
        self.sections.iter().find(|s| s.key == key)
    }

    /// Value of the first field with this label in the given section.
    pub fn value(&self, key: SectionKey, label: &str) -> Option<&str> {
        self.section(key)?
            .fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| f.value.as_str())
    }
}

/// One submitted form value, resolved to its fixed cell target.
#[derive(Clone, Debug, PartialEq)]
pub struct CellEdit {
    pub section: SectionKey,
    pub row: u32,
    pub column: ValueColumn,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SaveReceipt {
    /// File name (or other backend-specific handle) of the backup taken
    /// before the write.
    pub backup: String,
}

/// `warehouse_on_main` -> `Warehouse On Main`
pub fn display_name(id: &str) -> String {
    id.split(['_', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
