//! Encyclopedia entry for a cultivated plant.
//!
//! # Responsibility
//! - Define the record shape stored in canonical documents.
//! - Define the enumerated attribute vocabularies and their stored spelling.
//! - Validate decoded entries before they are trusted.
//!
//! # Invariants
//! - `scientific_names` always carries at least one non-blank value.
//! - Locale keys are `pt`, `es` and `en`; every locale is optional.
//! - Enumerated values are stored with their SCREAMING_SNAKE_CASE spelling.

use crate::crdt::MirroredRecord;
use crate::model::record::{Record, RecordValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

const HANDLE_MIN_CHARS: usize = 3;

static HANDLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid handle regex"));

/// Enumerations persisted as fixed strings in documents and projection rows.
pub trait StoredEnum: Copy + 'static {
    fn as_str(self) -> &'static str;
    fn parse(value: &str) -> Option<Self>;
}

macro_rules! stored_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
        }

        impl StoredEnum for $name {
            fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }

            fn parse(value: &str) -> Option<Self> {
                match value {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

stored_enum! {
    /// Agroforestry canopy layer occupied by the plant.
    AgroforestryStratum {
        Emergent => "EMERGENT",
        High => "HIGH",
        Medium => "MEDIUM",
        Low => "LOW",
        Ground => "GROUND",
    }
}

stored_enum! {
    VegetableLifecycle {
        Semiannual => "SEMIANNUAL",
        Annual => "ANNUAL",
        Biennial => "BIENNIAL",
        Perennial => "PERENNIAL",
    }
}

stored_enum! {
    VegetableUsage {
        HumanFeed => "HUMAN_FEED",
        AnimalFeed => "ANIMAL_FEED",
        Construction => "CONSTRUCTION",
        Cosmetic => "COSMETIC",
        OrganicMatter => "ORGANIC_MATTER",
        Medicinal => "MEDICINAL",
        Ornamental => "ORNAMENTAL",
        Ritualistic => "RITUALISTIC",
        EcosystemService => "ECOSYSTEM_SERVICE",
    }
}

stored_enum! {
    EdibleVegetablePart {
        Fruit => "FRUIT",
        Flower => "FLOWER",
        Leaf => "LEAF",
        Stem => "STEM",
        Seed => "SEED",
        Bark => "BARK",
        Bulb => "BULB",
        Sprout => "SPROUT",
        Root => "ROOT",
        Tuber => "TUBER",
        Rhizome => "RHIZOME",
    }
}

stored_enum! {
    PlantingMethod {
        Seed => "SEED",
        Seedling => "SEEDLING",
        StemCutting => "STEM_CUTTING",
        Rhizome => "RHIZOME",
        Tuber => "TUBER",
        Graft => "GRAFT",
        Bulb => "BULB",
        Division => "DIVISION",
    }
}

stored_enum! {
    /// Grammatical gender of the common name in one locale.
    VegetableGender {
        Neutral => "NEUTRAL",
        Male => "MALE",
        Female => "FEMALE",
    }
}

stored_enum! {
    ChineseMedicineElement {
        Fire => "FIRE",
        Earth => "EARTH",
        Metal => "METAL",
        Water => "WATER",
        Wood => "WOOD",
    }
}

impl Default for VegetableGender {
    fn default() -> Self {
        Self::Neutral
    }
}

/// Supported content locales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Locale {
    Pt,
    Es,
    En,
}

impl Locale {
    /// Order used when the preferred locale has no translation.
    pub const FALLBACK_ORDER: [Locale; 3] = [Locale::En, Locale::Pt, Locale::Es];

    /// Key used both as document map key and projection column value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pt => "pt",
            Self::Es => "es",
            Self::En => "en",
        }
    }

    /// Parses a locale code, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pt" => Some(Self::Pt),
            "es" => Some(Self::Es),
            "en" => Some(Self::En),
            _ => None,
        }
    }
}

impl Display for Locale {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a name list (`scientific_names`, `common_names`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameEntry {
    pub value: String,
}

impl NameEntry {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// Locale-independent attributes of an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VegetableMetadata {
    /// URL-safe stable slug, e.g. `zea-mays`.
    pub handle: String,
    pub scientific_names: Vec<NameEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strata: Option<Vec<AgroforestryStratum>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycles: Option<Vec<VegetableLifecycle>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uses: Option<Vec<VegetableUsage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edible_parts: Option<Vec<EdibleVegetablePart>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planting_methods: Option<Vec<PlantingMethod>>,
    /// Days from planting to harvest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub development_cycle_min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub development_cycle_max: Option<i64>,
    /// Centimeters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_max: Option<i64>,
    /// Degrees Celsius.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chinese_medicine_element: Option<ChineseMedicineElement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_photo_id: Option<String>,
}

impl VegetableMetadata {
    /// Creates metadata with the two required fields and nothing else.
    pub fn new(handle: impl Into<String>, scientific_name: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            scientific_names: vec![NameEntry::new(scientific_name)],
            strata: None,
            lifecycles: None,
            uses: None,
            edible_parts: None,
            planting_methods: None,
            development_cycle_min: None,
            development_cycle_max: None,
            height_min: None,
            height_max: None,
            temperature_min: None,
            temperature_max: None,
            chinese_medicine_element: None,
            main_photo_id: None,
        }
    }
}

/// Attributes written per content locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VegetableLocalizedData {
    #[serde(default)]
    pub gender: VegetableGender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// Free-form description body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub common_names: Vec<NameEntry>,
}

/// Per-locale data keyed by locale code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VegetableLocales {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pt: Option<VegetableLocalizedData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub es: Option<VegetableLocalizedData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub en: Option<VegetableLocalizedData>,
}

impl VegetableLocales {
    pub fn get(&self, locale: Locale) -> Option<&VegetableLocalizedData> {
        match locale {
            Locale::Pt => self.pt.as_ref(),
            Locale::Es => self.es.as_ref(),
            Locale::En => self.en.as_ref(),
        }
    }

    pub fn get_mut(&mut self, locale: Locale) -> &mut Option<VegetableLocalizedData> {
        match locale {
            Locale::Pt => &mut self.pt,
            Locale::Es => &mut self.es,
            Locale::En => &mut self.en,
        }
    }

    /// Iterates present locales in `pt, es, en` order.
    pub fn iter(&self) -> impl Iterator<Item = (Locale, &VegetableLocalizedData)> {
        [Locale::Pt, Locale::Es, Locale::En]
            .into_iter()
            .filter_map(|locale| self.get(locale).map(|data| (locale, data)))
    }
}

/// Full entry stored in one canonical CRDT document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VegetableData {
    pub metadata: VegetableMetadata,
    #[serde(default)]
    pub locales: VegetableLocales,
}

impl Record for VegetableData {
    fn validate(&self) -> Result<(), RecordValidationError> {
        let metadata = &self.metadata;
        let handle = metadata.handle.as_str();
        if handle.chars().count() < HANDLE_MIN_CHARS || !HANDLE_RE.is_match(handle) {
            return Err(RecordValidationError::InvalidHandle(handle.to_string()));
        }

        validate_names("metadata.scientific_names", &metadata.scientific_names)?;
        if metadata.scientific_names.is_empty() {
            return Err(RecordValidationError::EmptyList(
                "metadata.scientific_names".to_string(),
            ));
        }

        ensure_ordered(
            "development_cycle",
            metadata.development_cycle_min,
            metadata.development_cycle_max,
        )?;
        ensure_ordered("height", metadata.height_min, metadata.height_max)?;
        ensure_finite("metadata.temperature_min", metadata.temperature_min)?;
        ensure_finite("metadata.temperature_max", metadata.temperature_max)?;
        ensure_ordered(
            "temperature",
            metadata.temperature_min,
            metadata.temperature_max,
        )?;

        for (locale, data) in self.locales.iter() {
            validate_names(&format!("locales.{locale}.common_names"), &data.common_names)?;
        }

        Ok(())
    }
}

impl MirroredRecord for VegetableData {
    const TEXT_FIELDS: &'static [&'static str] = &["value", "origin", "content"];
    const ENTRY_LISTS: &'static [&'static str] = &["scientific_names", "common_names"];
}

fn validate_names(path: &str, names: &[NameEntry]) -> Result<(), RecordValidationError> {
    for (index, name) in names.iter().enumerate() {
        if name.value.trim().is_empty() {
            return Err(RecordValidationError::BlankValue(format!("{path}[{index}]")));
        }
    }
    Ok(())
}

fn ensure_finite(field: &'static str, value: Option<f64>) -> Result<(), RecordValidationError> {
    match value {
        Some(value) if !value.is_finite() => Err(RecordValidationError::NonFiniteNumber(field)),
        _ => Ok(()),
    }
}

fn ensure_ordered<T: PartialOrd>(
    field: &'static str,
    min: Option<T>,
    max: Option<T>,
) -> Result<(), RecordValidationError> {
    match (min, max) {
        (Some(min), Some(max)) if min > max => Err(RecordValidationError::InvertedRange(field)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> VegetableData {
        VegetableData {
            metadata: VegetableMetadata::new("zea-mays", "Zea mays"),
            locales: VegetableLocales::default(),
        }
    }

    #[test]
    fn minimal_record_is_valid() {
        assert_eq!(minimal().validate(), Ok(()));
    }

    #[test]
    fn handle_rejects_uppercase_and_short_values() {
        let mut record = minimal();
        record.metadata.handle = "Zea-Mays".to_string();
        assert!(matches!(
            record.validate(),
            Err(RecordValidationError::InvalidHandle(_))
        ));

        record.metadata.handle = "zm".to_string();
        assert!(matches!(
            record.validate(),
            Err(RecordValidationError::InvalidHandle(_))
        ));
    }

    #[test]
    fn empty_scientific_names_are_rejected() {
        let mut record = minimal();
        record.metadata.scientific_names.clear();
        assert_eq!(
            record.validate(),
            Err(RecordValidationError::EmptyList(
                "metadata.scientific_names".to_string()
            ))
        );
    }

    #[test]
    fn non_finite_temperatures_are_rejected() {
        let mut record = minimal();
        record.metadata.temperature_min = Some(f64::NAN);
        assert_eq!(
            record.validate(),
            Err(RecordValidationError::NonFiniteNumber(
                "metadata.temperature_min"
            ))
        );

        record.metadata.temperature_min = Some(12.0);
        record.metadata.temperature_max = Some(f64::INFINITY);
        assert_eq!(
            record.validate(),
            Err(RecordValidationError::NonFiniteNumber(
                "metadata.temperature_max"
            ))
        );
    }

    #[test]
    fn blank_common_name_reports_locale_path() {
        let mut record = minimal();
        record.locales.es = Some(VegetableLocalizedData {
            gender: VegetableGender::Male,
            origin: None,
            content: None,
            common_names: vec![NameEntry::new("Maíz"), NameEntry::new("  ")],
        });
        assert_eq!(
            record.validate(),
            Err(RecordValidationError::BlankValue(
                "locales.es.common_names[1]".to_string()
            ))
        );
    }

    #[test]
    fn inverted_height_range_is_rejected() {
        let mut record = minimal();
        record.metadata.height_min = Some(500);
        record.metadata.height_max = Some(400);
        assert_eq!(
            record.validate(),
            Err(RecordValidationError::InvertedRange("height"))
        );
    }

    #[test]
    fn stored_enums_round_trip_through_text() {
        for usage in VegetableUsage::ALL {
            assert_eq!(VegetableUsage::parse(usage.as_str()), Some(*usage));
        }
        assert_eq!(
            serde_json::to_value(PlantingMethod::StemCutting).unwrap(),
            serde_json::json!("STEM_CUTTING")
        );
    }

    #[test]
    fn locale_parse_is_case_insensitive() {
        assert_eq!(Locale::parse(" PT "), Some(Locale::Pt));
        assert_eq!(Locale::parse("fr"), None);
    }

    #[test]
    fn missing_optional_fields_decode_as_none() {
        let decoded: VegetableData = serde_json::from_value(serde_json::json!({
            "metadata": {
                "handle": "zea-mays",
                "scientific_names": [{ "value": "Zea mays" }]
            }
        }))
        .unwrap();
        assert_eq!(decoded, minimal());
    }
}
