use seedbank_core::crdt::{update_record, write_record};
use seedbank_core::model::vegetable::{NameEntry, VegetableLocalizedData, VegetableMetadata};
use seedbank_core::revision::{validate_update, ValidationError};
use seedbank_core::{
    produce_clean_update, CrdtDocument, LoroDocument, OriginPolicy, VegetableData,
};
use uuid::Uuid;

fn sample_record() -> VegetableData {
    let mut metadata = VegetableMetadata::new("manihot-esculenta", "Manihot esculenta");
    metadata.height_max = Some(300);
    let mut data = VegetableData {
        metadata,
        locales: Default::default(),
    };
    data.locales.pt = Some(VegetableLocalizedData {
        gender: Default::default(),
        origin: None,
        content: None,
        common_names: vec![NameEntry::new("Mandioca"), NameEntry::new("Aipim")],
    });
    data
}

fn canonical() -> LoroDocument {
    let doc = LoroDocument::new();
    write_record(&doc, &sample_record()).unwrap();
    doc.commit("{\"type\":\"system-cleanup\",\"reason\":\"seed\"}", 1_700_000_000);
    doc
}

#[test]
fn garbage_bytes_are_invalid_format() {
    let source = canonical();
    let err = validate_update::<_, VegetableData>(&[1, 2, 3, 4, 5], &source, OriginPolicy::Strict)
        .unwrap_err();
    assert!(matches!(err, ValidationError::InvalidFormat(_)), "{err:?}");
}

#[test]
fn valid_edit_decodes_into_record() {
    let source = canonical();
    let edit = produce_clean_update(
        &source,
        |doc| {
            update_record::<VegetableData, _>(doc, |data| data.metadata.height_max = Some(350))
        },
        Uuid::now_v7(),
    )
    .unwrap();

    let validated =
        validate_update::<_, VegetableData>(&edit.update, &source, OriginPolicy::Strict).unwrap();
    assert!(!validated.detached);
    assert_eq!(validated.decoded.metadata.height_max, Some(350));
    assert_eq!(
        validated.merged_document.to_json().unwrap(),
        edit.final_document.to_json().unwrap()
    );
}

#[test]
fn removing_every_scientific_name_fails_schema_validation() {
    let source = canonical();
    let edit = produce_clean_update(
        &source,
        |doc| {
            update_record::<VegetableData, _>(doc, |data| data.metadata.scientific_names.clear())
        },
        Uuid::now_v7(),
    )
    .unwrap();

    let err = validate_update::<_, VegetableData>(&edit.update, &source, OriginPolicy::Permissive)
        .unwrap_err();
    assert!(
        matches!(err, ValidationError::SchemaValidationFailed(_)),
        "{err:?}"
    );
}

#[test]
fn blank_common_name_fails_schema_validation() {
    let source = canonical();
    let edit = produce_clean_update(
        &source,
        |doc| {
            update_record::<VegetableData, _>(doc, |data| {
                if let Some(pt) = data.locales.pt.as_mut() {
                    pt.common_names[1] = NameEntry::new("   ");
                }
            })
        },
        Uuid::now_v7(),
    )
    .unwrap();

    let err = validate_update::<_, VegetableData>(&edit.update, &source, OriginPolicy::Strict)
        .unwrap_err();
    assert!(
        matches!(err, ValidationError::SchemaValidationFailed(_)),
        "{err:?}"
    );
}

fn foreign_update() -> Vec<u8> {
    let unrelated = LoroDocument::new();
    write_record(&unrelated, &sample_record()).unwrap();
    unrelated.commit("{\"type\":\"system-cleanup\",\"reason\":\"seed\"}", 1_700_000_000);
    produce_clean_update(
        &unrelated,
        |doc| {
            update_record::<VegetableData, _>(doc, |data| data.metadata.height_max = Some(999))
        },
        Uuid::now_v7(),
    )
    .unwrap()
    .update
}

#[test]
fn cross_lineage_update_is_detached_under_permissive_policy() {
    let source = canonical();
    let before = source.to_json().unwrap();

    let validated =
        validate_update::<_, VegetableData>(&foreign_update(), &source, OriginPolicy::Permissive)
            .unwrap();
    assert!(validated.detached);
    assert_eq!(validated.decoded.metadata.height_max, Some(300));
    assert_eq!(validated.merged_document.to_json().unwrap(), before);
    assert_eq!(source.to_json().unwrap(), before);
}

#[test]
fn cross_lineage_update_is_rejected_under_strict_policy() {
    let source = canonical();
    let err =
        validate_update::<_, VegetableData>(&foreign_update(), &source, OriginPolicy::Strict)
            .unwrap_err();
    assert_eq!(err, ValidationError::OriginMismatch);
}

#[test]
fn empty_update_is_valid() {
    let source = canonical();
    let edit = produce_clean_update(&source, |_| Ok::<_, seedbank_core::CrdtError>(()), Uuid::now_v7())
        .unwrap();

    let validated =
        validate_update::<_, VegetableData>(&edit.update, &source, OriginPolicy::Strict).unwrap();
    assert!(!validated.detached);
    assert_eq!(validated.decoded, sample_record());
}
