use seedbank_core::crdt::{read_record, update_record};
use seedbank_core::db::open_db;
use seedbank_core::model::vegetable::{
    EdibleVegetablePart, NameEntry, VegetableLocalizedData, VegetableMetadata,
};
use seedbank_core::{
    produce_clean_update, DocumentId, Evaluation, Locale, RevisionService, VegetableData,
};
use std::path::PathBuf;
use std::sync::{Arc, Barrier};
use std::thread;
use uuid::Uuid;

fn seed_record() -> VegetableData {
    let mut data = VegetableData {
        metadata: VegetableMetadata::new("ipomoea-batatas", "Ipomoea batatas"),
        locales: Default::default(),
    };
    data.locales.pt = Some(VegetableLocalizedData {
        gender: Default::default(),
        origin: None,
        content: None,
        common_names: vec![NameEntry::new("Batata-doce")],
    });
    data
}

fn approve_on_own_connection(path: PathBuf, revision_id: Uuid, barrier: Arc<Barrier>) -> bool {
    let mut conn = open_db(&path).unwrap();
    let mut service = RevisionService::new(&mut conn);
    barrier.wait();
    service
        .evaluate_revision(revision_id, Evaluation::Approved, Uuid::now_v7(), None)
        .is_ok()
}

#[test]
fn parallel_approvals_on_one_document_both_apply() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seedbank.db");

    let (document_id, first, second) = {
        let mut conn = open_db(&path).unwrap();
        let mut service = RevisionService::new(&mut conn);
        let author = Uuid::now_v7();
        let document_id = service.create_document(author, &seed_record()).unwrap();
        let canonical = service.load_canonical(document_id).unwrap();

        let height = produce_clean_update(
            &canonical,
            |doc| update_record::<VegetableData, _>(doc, |data| data.metadata.height_max = Some(80)),
            author,
        )
        .unwrap();
        let cycle = produce_clean_update(
            &canonical,
            |doc| {
                update_record::<VegetableData, _>(doc, |data| {
                    data.metadata.development_cycle_max = Some(150)
                })
            },
            author,
        )
        .unwrap();

        let first = service
            .create_revision(document_id, author, &height.update)
            .unwrap();
        let second = service
            .create_revision(document_id, author, &cycle.update)
            .unwrap();
        (document_id, first, second)
    };

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = [first, second]
        .into_iter()
        .map(|revision_id| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || approve_on_own_connection(path, revision_id, barrier))
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }

    let mut conn = open_db(&path).unwrap();
    let service = RevisionService::new(&mut conn);
    for revision_id in [first, second] {
        assert_eq!(
            service.get_revision(revision_id).unwrap().evaluation,
            Evaluation::Approved
        );
    }

    let canonical = service.load_canonical(document_id).unwrap();
    let data: VegetableData = read_record(&canonical).unwrap();
    assert_eq!(data.metadata.height_max, Some(80));
    assert_eq!(data.metadata.development_cycle_max, Some(150));

    let projection = service.fetch_document(document_id, Locale::Pt).unwrap();
    assert_eq!(projection.height_max, Some(80));
    assert_eq!(projection.development_cycle_max, Some(150));
}

fn parts_for(step: i64) -> Vec<EdibleVegetablePart> {
    let mut parts = EdibleVegetablePart::ALL[..(step as usize % 4) + 1].to_vec();
    parts.sort();
    parts
}

fn approve_step(service: &mut RevisionService<'_>, document_id: DocumentId, step: i64) {
    let author = Uuid::now_v7();
    let canonical = service.load_canonical(document_id).unwrap();
    let edit = produce_clean_update(
        &canonical,
        |doc| {
            update_record::<VegetableData, _>(doc, |data| {
                data.metadata.height_max = Some(step);
                data.metadata.edible_parts = Some(parts_for(step));
            })
        },
        author,
    )
    .unwrap();
    let revision_id = service
        .create_revision(document_id, author, &edit.update)
        .unwrap();
    service
        .evaluate_revision(revision_id, Evaluation::Approved, author, None)
        .unwrap();
}

#[test]
fn projection_reads_never_mix_two_approvals() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seedbank.db");

    let document_id = {
        let mut conn = open_db(&path).unwrap();
        let mut record = seed_record();
        record.metadata.height_max = Some(0);
        record.metadata.edible_parts = Some(parts_for(0));
        RevisionService::new(&mut conn)
            .create_document(Uuid::now_v7(), &record)
            .unwrap()
    };

    let writer_path = path.clone();
    let writer = thread::spawn(move || {
        let mut conn = open_db(&writer_path).unwrap();
        let mut service = RevisionService::new(&mut conn);
        for step in 1..=40 {
            approve_step(&mut service, document_id, step);
        }
    });

    let mut conn = open_db(&path).unwrap();
    let service = RevisionService::new(&mut conn);
    let mut reads = 0;
    while !writer.is_finished() || reads == 0 {
        let projection = service.fetch_document(document_id, Locale::Pt).unwrap();
        let step = projection.height_max.unwrap();
        let mut parts = projection.edible_parts;
        parts.sort();
        assert_eq!(parts, parts_for(step), "height_max={step}");
        reads += 1;
    }
    writer.join().unwrap();

    let projection = service.fetch_document(document_id, Locale::Pt).unwrap();
    assert_eq!(projection.height_max, Some(40));
    assert_eq!(projection.edible_parts.len(), parts_for(40).len());
}
