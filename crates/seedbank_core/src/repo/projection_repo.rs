//! Vegetable projection repository.
//!
//! # Responsibility
//! - Rewrite all projection rows of one document.
//! - Read the projection back with locale fallback.
//!
//! # Invariants
//! - The main row is upserted; translation and junction rows are deleted and
//!   re-inserted so removed values never linger.
//! - Junction tables are only addressed through `JUNCTION_TABLES`.
//! - Reads run inside one transaction and never mix two materializations.

use crate::model::projection::{
    choose_locale, junction_table, ProjectedTranslation, ProjectedVegetable, TranslationRow,
    VegetableProjection, VegetableRow, JUNCTION_TABLES,
};
use crate::model::revision::{CausalPosition, DocumentId};
use crate::model::vegetable::{ChineseMedicineElement, Locale, StoredEnum, VegetableGender};
use crate::repo::{ensure_table_columns, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Repository interface for projection rows.
pub trait ProjectionRepository {
    /// Replaces every projection row derived from one document.
    fn replace_projection(
        &self,
        projection: &VegetableProjection,
        frontier: &CausalPosition,
        materialized_at: i64,
    ) -> RepoResult<()>;

    /// Reads one projection, choosing `preferred` or the first fallback locale.
    fn fetch_projection(
        &self,
        id: DocumentId,
        preferred: Locale,
    ) -> RepoResult<Option<ProjectedVegetable>>;
}

/// SQLite-backed projection repository.
pub struct SqliteProjectionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectionRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_columns(
            conn,
            "vegetables",
            &[
                "id",
                "handle",
                "scientific_names",
                "height_max",
                "frontier",
                "materialized_at",
            ],
        )?;
        ensure_table_columns(
            conn,
            "vegetable_translations",
            &["vegetable_id", "locale", "common_names", "searchable_names"],
        )?;
        for table in JUNCTION_TABLES {
            ensure_table_columns(conn, table.table, &["vegetable_id", table.column])?;
        }
        Ok(Self { conn })
    }

    fn upsert_main(
        &self,
        row: &VegetableRow,
        frontier: &CausalPosition,
        materialized_at: i64,
    ) -> RepoResult<()> {
        let scientific_names = to_json_text(&row.scientific_names)?;
        self.conn.execute(
            "INSERT INTO vegetables (
                id,
                handle,
                scientific_names,
                development_cycle_min,
                development_cycle_max,
                height_min,
                height_max,
                temperature_min,
                temperature_max,
                chinese_medicine_element,
                main_photo_id,
                frontier,
                materialized_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ON CONFLICT(id) DO UPDATE SET
                handle = excluded.handle,
                scientific_names = excluded.scientific_names,
                development_cycle_min = excluded.development_cycle_min,
                development_cycle_max = excluded.development_cycle_max,
                height_min = excluded.height_min,
                height_max = excluded.height_max,
                temperature_min = excluded.temperature_min,
                temperature_max = excluded.temperature_max,
                chinese_medicine_element = excluded.chinese_medicine_element,
                main_photo_id = excluded.main_photo_id,
                frontier = excluded.frontier,
                materialized_at = excluded.materialized_at;",
            params![
                row.id.to_string(),
                row.handle,
                scientific_names,
                row.development_cycle_min,
                row.development_cycle_max,
                row.height_min,
                row.height_max,
                row.temperature_min,
                row.temperature_max,
                row.chinese_medicine_element.map(StoredEnum::as_str),
                row.main_photo_id,
                frontier.to_json_string(),
                materialized_at,
            ],
        )?;
        Ok(())
    }

    fn replace_translations(&self, id: &str, translations: &[TranslationRow]) -> RepoResult<()> {
        self.conn.execute(
            "DELETE FROM vegetable_translations WHERE vegetable_id = ?1;",
            [id],
        )?;
        for translation in translations {
            self.conn.execute(
                "INSERT INTO vegetable_translations (
                    vegetable_id,
                    locale,
                    gender,
                    origin,
                    content,
                    common_names,
                    searchable_names
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    id,
                    translation.locale.as_str(),
                    translation.gender.as_str(),
                    translation.origin,
                    translation.content,
                    to_json_text(&translation.common_names)?,
                    translation.searchable_names,
                ],
            )?;
        }
        Ok(())
    }

    fn load_translation(
        &self,
        id: &str,
        preferred: Locale,
    ) -> RepoResult<Option<ProjectedTranslation>> {
        let mut stmt = self
            .conn
            .prepare("SELECT locale FROM vegetable_translations WHERE vegetable_id = ?1;")?;
        let mut rows = stmt.query([id])?;
        let mut available = Vec::new();
        while let Some(row) = rows.next()? {
            let text: String = row.get(0)?;
            let locale = Locale::parse(&text).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "invalid locale `{text}` in vegetable_translations.locale"
                ))
            })?;
            available.push(locale);
        }

        let Some(locale) = choose_locale(preferred, &available) else {
            return Ok(None);
        };

        self.conn
            .query_row(
                "SELECT gender, origin, content, common_names
                 FROM vegetable_translations
                 WHERE vegetable_id = ?1 AND locale = ?2;",
                params![id, locale.as_str()],
                |row| Ok(parse_translation_row(locale, row)),
            )
            .optional()?
            .transpose()
    }

    fn load_junction<T: StoredEnum>(&self, id: &str, field: &str) -> RepoResult<Vec<T>> {
        let table = junction_table(field).ok_or_else(|| {
            RepoError::InvalidData(format!("no junction table declared for `{field}`"))
        })?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {column} FROM {table} WHERE vegetable_id = ?1 ORDER BY {column} ASC;",
            column = table.column,
            table = table.table,
        ))?;
        let mut rows = stmt.query([id])?;
        let mut values = Vec::new();
        while let Some(row) = rows.next()? {
            let text: String = row.get(0)?;
            let value = T::parse(&text).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "invalid value `{text}` in {}.{}",
                    table.table, table.column
                ))
            })?;
            values.push(value);
        }
        Ok(values)
    }
}

impl ProjectionRepository for SqliteProjectionRepository<'_> {
    fn replace_projection(
        &self,
        projection: &VegetableProjection,
        frontier: &CausalPosition,
        materialized_at: i64,
    ) -> RepoResult<()> {
        let id = projection.main.id.to_string();
        self.upsert_main(&projection.main, frontier, materialized_at)?;
        self.replace_translations(&id, &projection.translations)?;

        for junction in &projection.junctions {
            self.conn.execute(
                &format!(
                    "DELETE FROM {} WHERE vegetable_id = ?1;",
                    junction.table.table
                ),
                [id.as_str()],
            )?;
            let insert_sql = format!(
                "INSERT OR IGNORE INTO {} (vegetable_id, {}) VALUES (?1, ?2);",
                junction.table.table, junction.table.column
            );
            for value in &junction.values {
                self.conn.execute(&insert_sql, params![id, value])?;
            }
        }
        Ok(())
    }

    fn fetch_projection(
        &self,
        id: DocumentId,
        preferred: Locale,
    ) -> RepoResult<Option<ProjectedVegetable>> {
        // All reads below share one snapshot.
        let tx = self.conn.unchecked_transaction()?;
        let vegetable = self.read_projection(id, preferred)?;
        tx.commit()?;
        Ok(vegetable)
    }
}

impl SqliteProjectionRepository<'_> {
    fn read_projection(
        &self,
        id: DocumentId,
        preferred: Locale,
    ) -> RepoResult<Option<ProjectedVegetable>> {
        let id_text = id.to_string();
        let main = self
            .conn
            .query_row(
                "SELECT
                    handle,
                    scientific_names,
                    development_cycle_min,
                    development_cycle_max,
                    height_min,
                    height_max,
                    temperature_min,
                    temperature_max,
                    chinese_medicine_element,
                    main_photo_id,
                    frontier,
                    materialized_at
                 FROM vegetables
                 WHERE id = ?1;",
                [id_text.as_str()],
                |row| Ok(parse_main_row(id, row)),
            )
            .optional()?
            .transpose()?;

        let Some(mut vegetable) = main else {
            return Ok(None);
        };
        vegetable.strata = self.load_junction(&id_text, "strata")?;
        vegetable.planting_methods = self.load_junction(&id_text, "planting_methods")?;
        vegetable.edible_parts = self.load_junction(&id_text, "edible_parts")?;
        vegetable.lifecycles = self.load_junction(&id_text, "lifecycles")?;
        vegetable.uses = self.load_junction(&id_text, "uses")?;
        vegetable.translation = self.load_translation(&id_text, preferred)?;
        Ok(Some(vegetable))
    }
}

fn to_json_text(values: &[String]) -> RepoResult<String> {
    serde_json::to_string(values).map_err(|err| RepoError::InvalidData(err.to_string()))
}

fn from_json_text(value: &str, column: &str) -> RepoResult<Vec<String>> {
    serde_json::from_str(value)
        .map_err(|err| RepoError::InvalidData(format!("invalid {column}: {err}")))
}

fn parse_main_row(id: DocumentId, row: &Row<'_>) -> RepoResult<ProjectedVegetable> {
    let scientific_names: String = row.get("scientific_names")?;
    let frontier: String = row.get("frontier")?;
    let element = match row.get::<_, Option<String>>("chinese_medicine_element")? {
        Some(text) => Some(ChineseMedicineElement::parse(&text).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid value `{text}` in vegetables.chinese_medicine_element"
            ))
        })?),
        None => None,
    };

    Ok(ProjectedVegetable {
        id,
        handle: row.get("handle")?,
        scientific_names: from_json_text(&scientific_names, "vegetables.scientific_names")?,
        development_cycle_min: row.get("development_cycle_min")?,
        development_cycle_max: row.get("development_cycle_max")?,
        height_min: row.get("height_min")?,
        height_max: row.get("height_max")?,
        temperature_min: row.get("temperature_min")?,
        temperature_max: row.get("temperature_max")?,
        chinese_medicine_element: element,
        main_photo_id: row.get("main_photo_id")?,
        strata: Vec::new(),
        planting_methods: Vec::new(),
        edible_parts: Vec::new(),
        lifecycles: Vec::new(),
        uses: Vec::new(),
        translation: None,
        frontier: CausalPosition::from_json_str(&frontier)
            .map_err(|err| RepoError::InvalidData(format!("invalid vegetables.frontier: {err}")))?,
        materialized_at: row.get("materialized_at")?,
    })
}

fn parse_translation_row(locale: Locale, row: &Row<'_>) -> RepoResult<ProjectedTranslation> {
    let gender_text: String = row.get("gender")?;
    let gender = VegetableGender::parse(&gender_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid value `{gender_text}` in vegetable_translations.gender"
        ))
    })?;
    let common_names: String = row.get("common_names")?;

    Ok(ProjectedTranslation {
        locale,
        gender,
        origin: row.get("origin")?,
        content: row.get("content")?,
        common_names: from_json_text(&common_names, "vegetable_translations.common_names")?,
    })
}
