mod common;

use clinisim_core::models::case::CaseSource;
use clinisim_sessions::import::{ImportSummary, case_from_json, import_dir};
use clinisim_storage::Store;
use clinisim_storage::memory::MemoryStore;
use serde_json::json;
use uuid::Uuid;

use common::case_json;

#[test]
fn case_file_keeps_its_number_and_is_fixed() {
    let case = case_from_json(&case_json().to_string()).unwrap();
    assert_eq!(case.case_number.as_deref(), Some("CS-0042"));
    assert_eq!(case.display_number(), "CS-0042");
    assert_eq!(case.source, CaseSource::Fixed);
    assert!(case.active);
}

#[test]
fn case_file_is_normalized_like_synthesis_output() {
    let mut value = case_json();
    value["past_history"] = json!("none");
    value["investigations"][0]["type"] = json!("心电图");
    let case = case_from_json(&value.to_string()).unwrap();
    assert!(case.content.past_history.diseases.is_empty());
    assert_eq!(case.offered_types().len(), 3);
}

#[tokio::test]
async fn import_skips_bad_files_and_is_repeatable() {
    let dir = std::env::temp_dir().join(format!("clinisim-import-{}", Uuid::new_v4()));
    tokio::fs::create_dir_all(&dir).await.unwrap();
    tokio::fs::write(dir.join("chest-pain.json"), case_json().to_string()).await.unwrap();
    tokio::fs::write(dir.join("broken.json"), "{ not json").await.unwrap();
    tokio::fs::write(dir.join("notes.txt"), "ignored").await.unwrap();

    let store = MemoryStore::new();
    let first = import_dir(&store, &dir).await.unwrap();
    assert_eq!(
        first,
        ImportSummary {
            imported: 1,
            unchanged: 0,
            rejected: 1
        }
    );

    let second = import_dir(&store, &dir).await.unwrap();
    assert_eq!(second.imported, 0);
    assert_eq!(second.unchanged, 1);
    assert_eq!(store.list_cases().await.unwrap().len(), 1);

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}
