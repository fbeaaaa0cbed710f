//! Flat relational projection of canonical entries.
//!
//! # Responsibility
//! - Define the rows written by the materializer.
//! - Declare multi-valued attribute junction tables in one table of descriptors.
//! - Define the read model returned by projection queries.
//!
//! # Invariants
//! - Projection rows are fully derived from one decoded `VegetableData`.
//! - Junction values are deduplicated and sorted before persistence.

use crate::model::revision::{CausalPosition, DocumentId};
use crate::model::vegetable::{
    AgroforestryStratum, ChineseMedicineElement, EdibleVegetablePart, Locale, NameEntry,
    PlantingMethod, StoredEnum, VegetableData, VegetableGender, VegetableLifecycle,
    VegetableMetadata, VegetableUsage,
};
use std::collections::BTreeSet;

/// Describes one multi-valued attribute and the junction table holding it.
#[derive(Debug, Clone, Copy)]
pub struct JunctionTable {
    /// Field name inside `VegetableMetadata`.
    pub field: &'static str,
    pub table: &'static str,
    /// Value column; the owner column is always `vegetable_id`.
    pub column: &'static str,
    values: fn(&VegetableMetadata) -> Vec<&'static str>,
}

impl JunctionTable {
    /// Stored values for this field, deduplicated and sorted.
    pub fn values_of(&self, metadata: &VegetableMetadata) -> Vec<&'static str> {
        let unique: BTreeSet<&'static str> = (self.values)(metadata).into_iter().collect();
        unique.into_iter().collect()
    }
}

/// Every junction table kept in sync by the materializer.
pub const JUNCTION_TABLES: &[JunctionTable] = &[
    JunctionTable {
        field: "strata",
        table: "vegetable_strata",
        column: "stratum",
        values: strata_values,
    },
    JunctionTable {
        field: "planting_methods",
        table: "vegetable_planting_methods",
        column: "method",
        values: planting_method_values,
    },
    JunctionTable {
        field: "edible_parts",
        table: "vegetable_edible_parts",
        column: "part",
        values: edible_part_values,
    },
    JunctionTable {
        field: "lifecycles",
        table: "vegetable_lifecycles",
        column: "lifecycle",
        values: lifecycle_values,
    },
    JunctionTable {
        field: "uses",
        table: "vegetable_uses",
        column: "usage",
        values: usage_values,
    },
];

/// Looks up a junction descriptor by metadata field name.
pub fn junction_table(field: &str) -> Option<&'static JunctionTable> {
    JUNCTION_TABLES.iter().find(|table| table.field == field)
}

fn stored<T: StoredEnum>(values: &Option<Vec<T>>) -> Vec<&'static str> {
    values
        .iter()
        .flatten()
        .map(|value| value.as_str())
        .collect()
}

fn strata_values(metadata: &VegetableMetadata) -> Vec<&'static str> {
    stored(&metadata.strata)
}

fn planting_method_values(metadata: &VegetableMetadata) -> Vec<&'static str> {
    stored(&metadata.planting_methods)
}

fn edible_part_values(metadata: &VegetableMetadata) -> Vec<&'static str> {
    stored(&metadata.edible_parts)
}

fn lifecycle_values(metadata: &VegetableMetadata) -> Vec<&'static str> {
    stored(&metadata.lifecycles)
}

fn usage_values(metadata: &VegetableMetadata) -> Vec<&'static str> {
    stored(&metadata.uses)
}

/// Main `vegetables` row.
#[derive(Debug, Clone, PartialEq)]
pub struct VegetableRow {
    pub id: DocumentId,
    pub handle: String,
    pub scientific_names: Vec<String>,
    pub development_cycle_min: Option<i64>,
    pub development_cycle_max: Option<i64>,
    pub height_min: Option<i64>,
    pub height_max: Option<i64>,
    pub temperature_min: Option<f64>,
    pub temperature_max: Option<f64>,
    pub chinese_medicine_element: Option<ChineseMedicineElement>,
    pub main_photo_id: Option<String>,
}

/// One `vegetable_translations` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRow {
    pub locale: Locale,
    pub gender: VegetableGender,
    pub origin: Option<String>,
    pub content: Option<String>,
    pub common_names: Vec<String>,
    /// Lowercased common names joined by spaces.
    pub searchable_names: String,
}

/// Values for one junction table.
#[derive(Debug, Clone)]
pub struct JunctionRows {
    pub table: &'static JunctionTable,
    pub values: Vec<&'static str>,
}

/// Complete set of rows derived from one canonical document.
#[derive(Debug, Clone)]
pub struct VegetableProjection {
    pub main: VegetableRow,
    pub translations: Vec<TranslationRow>,
    pub junctions: Vec<JunctionRows>,
}

impl VegetableProjection {
    /// Derives every projection row from a decoded record.
    pub fn derive(id: DocumentId, data: &VegetableData) -> Self {
        let metadata = &data.metadata;
        let main = VegetableRow {
            id,
            handle: metadata.handle.clone(),
            scientific_names: name_values(&metadata.scientific_names),
            development_cycle_min: metadata.development_cycle_min,
            development_cycle_max: metadata.development_cycle_max,
            height_min: metadata.height_min,
            height_max: metadata.height_max,
            temperature_min: metadata.temperature_min,
            temperature_max: metadata.temperature_max,
            chinese_medicine_element: metadata.chinese_medicine_element,
            main_photo_id: metadata.main_photo_id.clone(),
        };

        let translations = data
            .locales
            .iter()
            .map(|(locale, localized)| {
                let common_names = name_values(&localized.common_names);
                TranslationRow {
                    locale,
                    gender: localized.gender,
                    origin: localized.origin.clone(),
                    content: localized.content.clone(),
                    searchable_names: searchable_names(&common_names),
                    common_names,
                }
            })
            .collect();

        let junctions = JUNCTION_TABLES
            .iter()
            .map(|table| JunctionRows {
                table,
                values: table.values_of(metadata),
            })
            .collect();

        Self {
            main,
            translations,
            junctions,
        }
    }
}

fn name_values(names: &[NameEntry]) -> Vec<String> {
    names.iter().map(|name| name.value.trim().to_string()).collect()
}

fn searchable_names(common_names: &[String]) -> String {
    common_names
        .iter()
        .map(|name| name.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Translation chosen for a projection read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedTranslation {
    pub locale: Locale,
    pub gender: VegetableGender,
    pub origin: Option<String>,
    pub content: Option<String>,
    pub common_names: Vec<String>,
}

/// Read model assembled from the projection tables.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedVegetable {
    pub id: DocumentId,
    pub handle: String,
    pub scientific_names: Vec<String>,
    pub development_cycle_min: Option<i64>,
    pub development_cycle_max: Option<i64>,
    pub height_min: Option<i64>,
    pub height_max: Option<i64>,
    pub temperature_min: Option<f64>,
    pub temperature_max: Option<f64>,
    pub chinese_medicine_element: Option<ChineseMedicineElement>,
    pub main_photo_id: Option<String>,
    pub strata: Vec<AgroforestryStratum>,
    pub planting_methods: Vec<PlantingMethod>,
    pub edible_parts: Vec<EdibleVegetablePart>,
    pub lifecycles: Vec<VegetableLifecycle>,
    pub uses: Vec<VegetableUsage>,
    /// `None` when the entry has no translation at all.
    pub translation: Option<ProjectedTranslation>,
    /// Canonical frontier the projection was rebuilt from.
    pub frontier: CausalPosition,
    /// Epoch milliseconds of the last rebuild.
    pub materialized_at: i64,
}

/// Picks the locale to read: preferred if available, else `en -> pt -> es`.
pub fn choose_locale(preferred: Locale, available: &[Locale]) -> Option<Locale> {
    if available.contains(&preferred) {
        return Some(preferred);
    }
    Locale::FALLBACK_ORDER
        .into_iter()
        .find(|locale| available.contains(locale))
}
