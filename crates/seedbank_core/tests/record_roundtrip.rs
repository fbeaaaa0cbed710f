use proptest::collection::vec;
use proptest::option;
use proptest::prelude::*;
use proptest::sample::select;
use seedbank_core::crdt::{read_record, write_record};
use seedbank_core::model::record::Record;
use seedbank_core::model::vegetable::{
    AgroforestryStratum, ChineseMedicineElement, EdibleVegetablePart, NameEntry, PlantingMethod,
    VegetableGender, VegetableLifecycle, VegetableLocalizedData, VegetableMetadata,
    VegetableUsage,
};
use seedbank_core::{CrdtDocument, LoroDocument, VegetableData};

fn name_strategy() -> impl Strategy<Value = NameEntry> {
    "[A-Za-z][A-Za-z ]{0,14}".prop_map(NameEntry::new)
}

fn gender_strategy() -> impl Strategy<Value = VegetableGender> {
    prop_oneof![
        Just(VegetableGender::Neutral),
        Just(VegetableGender::Male),
        Just(VegetableGender::Female),
    ]
}

fn localized_strategy() -> impl Strategy<Value = VegetableLocalizedData> {
    (
        gender_strategy(),
        option::of("[a-z ]{0,20}"),
        option::of("[A-Za-z .,]{0,40}"),
        vec(name_strategy(), 0..4),
    )
        .prop_map(|(gender, origin, content, common_names)| VegetableLocalizedData {
            gender,
            origin,
            content,
            common_names,
        })
}

fn variants<T>(all: &'static [T]) -> impl Strategy<Value = Option<Vec<T>>>
where
    T: Clone + std::fmt::Debug + 'static,
{
    option::of(vec(select(all), 0..4))
}

fn bounds<T>(range: std::ops::Range<T>) -> impl Strategy<Value = (Option<T>, Option<T>)>
where
    T: PartialOrd + Copy + std::fmt::Debug + 'static,
    std::ops::Range<T>: Strategy<Value = T> + Clone,
{
    (option::of(range.clone()), option::of(range)).prop_map(|(a, b)| match (a, b) {
        (Some(a), Some(b)) if a > b => (Some(b), Some(a)),
        other => other,
    })
}

fn metadata_strategy() -> impl Strategy<Value = VegetableMetadata> {
    (
        (
            "[a-z]{3,8}(-[a-z0-9]{1,5}){0,2}",
            vec(name_strategy(), 1..4),
            variants(AgroforestryStratum::ALL),
            variants(VegetableLifecycle::ALL),
            variants(VegetableUsage::ALL),
            variants(EdibleVegetablePart::ALL),
            variants(PlantingMethod::ALL),
        ),
        (
            bounds(0i64..720),
            bounds(0i64..5_000),
            bounds(-40.0f64..60.0),
            option::of(select(ChineseMedicineElement::ALL)),
            option::of("[a-z0-9]{8}\\.jpg"),
        ),
    )
        .prop_map(
            |(
                (handle, scientific_names, strata, lifecycles, uses, edible_parts, planting_methods),
                (cycle, height, temperature, chinese_medicine_element, main_photo_id),
            )| VegetableMetadata {
                handle,
                scientific_names,
                strata,
                lifecycles,
                uses,
                edible_parts,
                planting_methods,
                development_cycle_min: cycle.0,
                development_cycle_max: cycle.1,
                height_min: height.0,
                height_max: height.1,
                temperature_min: temperature.0,
                temperature_max: temperature.1,
                chinese_medicine_element,
                main_photo_id,
            },
        )
}

fn record_strategy() -> impl Strategy<Value = VegetableData> {
    (
        metadata_strategy(),
        option::of(localized_strategy()),
        option::of(localized_strategy()),
        option::of(localized_strategy()),
    )
        .prop_map(|(metadata, pt, es, en)| {
            let mut data = VegetableData {
                metadata,
                locales: Default::default(),
            };
            data.locales.pt = pt;
            data.locales.es = es;
            data.locales.en = en;
            data
        })
}

proptest! {
    #[test]
    fn written_record_reads_back_unchanged(record in record_strategy()) {
        prop_assert_eq!(record.validate(), Ok(()));
        let doc = LoroDocument::new();
        write_record(&doc, &record).unwrap();
        doc.commit_pending();

        let snapshot = doc.fork().export_snapshot().unwrap();
        let imported = LoroDocument::from_snapshot(&snapshot).unwrap();
        let decoded: VegetableData = read_record(&imported).unwrap();
        prop_assert_eq!(decoded, record);
    }

    #[test]
    fn rewriting_converges_on_latest_record(
        first in record_strategy(),
        second in record_strategy(),
    ) {
        let doc = LoroDocument::new();
        write_record(&doc, &first).unwrap();
        doc.commit_pending();
        write_record(&doc, &second).unwrap();
        doc.commit_pending();

        let decoded: VegetableData = read_record(&doc).unwrap();
        prop_assert_eq!(&decoded, &second);

        let replica = LoroDocument::from_snapshot(&doc.export_snapshot().unwrap()).unwrap();
        let replayed: VegetableData = read_record(&replica).unwrap();
        prop_assert_eq!(replayed, second);
    }
}
