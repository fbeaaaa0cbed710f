//! Command-line walkthrough of the revision workflow.
//!
//! # Responsibility
//! - Load configuration, start logging and open the database.
//! - Create an entry, propose an edit, approve it and print the projection
//!   before and after.

use clap::Parser;
use log::info;
use seedbank_core::crdt::update_record;
use seedbank_core::db::open_db_with;
use seedbank_core::model::vegetable::{
    NameEntry, VegetableGender, VegetableLocalizedData, VegetableMetadata,
};
use seedbank_core::{
    init_logging_from, logging_status, produce_clean_update, CoreConfig, Evaluation, Locale,
    ProjectedVegetable, RevisionService, VegetableData,
};
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "seedbank", version, about = "Revision workflow walkthrough")]
struct Args {
    /// TOML configuration file; `SEEDBANK_*` variables override it.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Preferred locale for projection reads.
    #[arg(long, default_value = "pt")]
    locale: String,
    /// Handle of the created entry; a fresh `zea-mays-*` handle when omitted.
    #[arg(long)]
    handle: Option<String>,
    /// Height the proposed revision sets, in centimeters.
    #[arg(long, default_value_t = 450)]
    height_max: i64,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("seedbank: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), String> {
    let config = CoreConfig::load(args.config.as_deref()).map_err(|err| err.to_string())?;
    init_logging_from(&config).map_err(|err| err.to_string())?;
    if let Some(status) = logging_status() {
        println!("logging {} to {}", status.level, status.log_dir.display());
    }
    let locale = Locale::parse(&args.locale)
        .ok_or_else(|| format!("unsupported locale `{}`; expected pt|es|en", args.locale))?;

    let mut conn = open_db_with(&config).map_err(|err| err.to_string())?;
    let mut service = RevisionService::with_policy(&mut conn, config.origin_policy);

    let author = Uuid::now_v7();
    let evaluator = Uuid::now_v7();
    let handle = args.handle.clone().unwrap_or_else(sample_handle);
    let document_id = service
        .create_document(author, &sample_entry(&handle))
        .map_err(|err| err.to_string())?;
    println!("created document {document_id}");

    let canonical = service
        .load_canonical(document_id)
        .map_err(|err| err.to_string())?;
    let height_max = args.height_max;
    let edit = produce_clean_update(
        &canonical,
        |doc| {
            update_record::<VegetableData, _>(doc, |data| {
                data.metadata.height_max = Some(height_max);
            })
        },
        author,
    )
    .map_err(|err| err.to_string())?;
    let revision_id = service
        .create_revision(document_id, author, &edit.update)
        .map_err(|err| err.to_string())?;
    println!(
        "proposed revision {revision_id} ({} update bytes)",
        edit.update.len()
    );

    let before = service
        .fetch_document(document_id, locale)
        .map_err(|err| err.to_string())?;
    print_projection("before approval", &before);

    service
        .evaluate_revision(
            revision_id,
            Evaluation::Approved,
            evaluator,
            Some("walkthrough"),
        )
        .map_err(|err| err.to_string())?;

    let after = service
        .fetch_document(document_id, locale)
        .map_err(|err| err.to_string())?;
    print_projection("after approval", &after);

    let revisions = service
        .list_revisions(document_id)
        .map_err(|err| err.to_string())?;
    for revision in &revisions {
        println!("revision {} {}", revision.id, revision.evaluation.as_str());
    }
    info!(
        "event=cli_walkthrough module=cli status=ok document_id={} revisions={}",
        document_id,
        revisions.len()
    );
    Ok(())
}

// Handles are unique per database, so each run gets its own.
fn sample_handle() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("zea-mays-{}", &suffix[..8])
}

fn sample_entry(handle: &str) -> VegetableData {
    let mut metadata = VegetableMetadata::new(handle, "Zea mays");
    metadata.height_min = Some(150);
    metadata.height_max = Some(400);
    let mut data = VegetableData {
        metadata,
        locales: Default::default(),
    };
    data.locales.pt = Some(VegetableLocalizedData {
        gender: VegetableGender::Male,
        origin: Some("América Central".to_string()),
        content: None,
        common_names: vec![NameEntry::new("Milho")],
    });
    data.locales.en = Some(VegetableLocalizedData {
        gender: VegetableGender::Neutral,
        origin: Some("Central America".to_string()),
        content: None,
        common_names: vec![NameEntry::new("Corn"), NameEntry::new("Maize")],
    });
    data
}

fn print_projection(label: &str, vegetable: &ProjectedVegetable) {
    let name = vegetable
        .translation
        .as_ref()
        .and_then(|translation| translation.common_names.first())
        .map_or(vegetable.handle.as_str(), String::as_str);
    let height = vegetable
        .height_max
        .map_or_else(|| "-".to_string(), |value| value.to_string());
    println!(
        "{label}: {name} height_max={height} frontier={}",
        vegetable.frontier.to_json_string()
    );
}

#[cfg(test)]
mod tests {
    use super::{sample_entry, sample_handle};
    use seedbank_core::model::record::Record;

    #[test]
    fn sample_handles_differ_between_runs() {
        let first = sample_handle();
        let second = sample_handle();
        assert_ne!(first, second);
        assert!(first.starts_with("zea-mays-"));
    }

    #[test]
    fn sample_entry_is_a_valid_record() {
        let entry = sample_entry(&sample_handle());
        assert_eq!(entry.validate(), Ok(()));
    }
}
