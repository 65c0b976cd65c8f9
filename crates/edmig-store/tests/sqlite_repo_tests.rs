//! SQLite Repository Tests
//!
//! The core ports over a real SQLite database, including full migration
//! runs and the all-or-nothing apply guarantee.

mod common;

use common::*;
use edmig_core::model::{DocumentHandle, DocumentKind, NameMapping, User};
use edmig_core::orchestrator::AssumeYes;
use edmig_core::ports::{DocumentStore, ElementStore, UserDirectory};
use edmig_core::render::{TemplatePipeline, TemplateSource};
use edmig_core::{
    Collaborators, MigrationError, MigrationOrchestrator, MigrationOutcome, MigrationReport,
    MigrationRequest, MigrationSettings, MissingOldPolicy, RenameExecutor, StrategyDescriptor,
};
use edmig_store::SqliteRepo;

fn migrate(repo: &SqliteRepo, request: &MigrationRequest) -> MigrationReport {
    let pipeline = TemplatePipeline::new(repo);
    let collaborators = Collaborators {
        documents: repo,
        elements: repo,
        users: repo,
        pipeline: &pipeline,
    };
    let settings =
        MigrationSettings::new(StrategyDescriptor::new("legacy"), Some("example.com".to_string()));
    let outcome = MigrationOrchestrator::new(collaborators, settings).run(request, &mut AssumeYes);
    outcome
}

#[test]
fn test_list_all_ids_filters_kinds() {
    let repo = repo();
    seed_page(&repo, 2, "", &[]);
    seed_page(&repo, 1, "", &[]);
    repo.put_document(
        &DocumentHandle::new(doc(3), DocumentKind::Other("folder".to_string()), "/folder"),
        "",
    )
    .unwrap();

    let ids = repo.list_all_ids(&DocumentKind::MIGRATABLE).unwrap();

    assert_eq!(ids, vec![doc(1), doc(2)]);
}

#[test]
fn test_find_user() {
    let repo = repo();
    repo.put_user(&User::new("editor", false)).unwrap();

    assert_eq!(
        repo.find_user("admin").unwrap(),
        Some(User::new("admin", true))
    );
    assert_eq!(
        repo.find_user("editor").unwrap(),
        Some(User::new("editor", false))
    );
    assert_eq!(repo.find_user("nobody").unwrap(), None);
}

#[test]
fn test_load_template_reports_published_flag() {
    let repo = repo();
    repo.put_document(
        &DocumentHandle::new(doc(4), DocumentKind::Page, "/draft").unpublished(),
        "{{ input \"a\" }}",
    )
    .unwrap();

    let template = repo.load_template(doc(4)).unwrap().unwrap();

    assert!(!template.published);
    assert_eq!(template.body, "{{ input \"a\" }}");
    assert!(repo.load_template(doc(5)).unwrap().is_none());
}

#[test]
fn test_exists_is_scoped_to_document() {
    let repo = repo();
    seed_page(&repo, 1, "", &["a"]);
    seed_page(&repo, 2, "", &["b"]);

    assert!(repo.exists(doc(1), &name("a")).unwrap());
    assert!(!repo.exists(doc(1), &name("b")).unwrap());
    assert!(repo.exists(doc(2), &name("b")).unwrap());
}

#[test]
fn test_apply_failure_commits_nothing() {
    // GIVEN three renames where the last old record does not exist
    let repo = repo();
    seed_page(&repo, 1, "", &["a", "c"]);
    seed_page(&repo, 2, "", &["a"]);
    let mut mapping = NameMapping::new();
    mapping.record(doc(1), name("a"), name("x")).unwrap();
    mapping.record(doc(1), name("c"), name("y")).unwrap();
    mapping.record(doc(2), name("gone"), name("z")).unwrap();

    // WHEN applying
    let err = RenameExecutor::new(&repo).apply(&mapping, false).unwrap_err();

    // THEN the error names the zero-row update and every rename is undone
    assert!(matches!(err, MigrationError::RowCountMismatch { rows: 0, .. }));
    assert_eq!(repo.editable_names(doc(1)).unwrap(), vec!["a", "c"]);
    assert_eq!(repo.editable_names(doc(2)).unwrap(), vec!["a"]);
}

#[test]
fn test_unique_violation_inside_transaction_rolls_back() {
    // GIVEN a mapping that skipped preflight and collides in the database
    let repo = repo();
    seed_page(&repo, 1, "", &["a", "b", "x"]);
    let mut mapping = NameMapping::new();
    mapping.record(doc(1), name("b"), name("y")).unwrap();
    mapping.record(doc(1), name("a"), name("x")).unwrap();

    // WHEN applying
    let err = RenameExecutor::new(&repo).apply(&mapping, false).unwrap_err();

    // THEN the store error surfaces and the first rename is rolled back
    assert!(matches!(err, MigrationError::Store(_)));
    assert_eq!(repo.editable_names(doc(1)).unwrap(), vec!["a", "b", "x"]);
}

#[test]
fn test_full_migration_to_nested_names() {
    // GIVEN a page with a repeated block stored under legacy names
    let repo = repo();
    seed_page(
        &repo,
        10,
        "{{ input \"title\" }}{{ block \"main\" count=2 }}{{ wysiwyg \"content\" }}{{ /block }}",
        &["title", "contentmain1", "contentmain2"],
    );

    // WHEN migrating to nested names
    let report = migrate(&repo, &MigrationRequest::new(StrategyDescriptor::new("nested"), "admin"));

    // THEN the block editables are renamed and their data kept
    assert_eq!(
        report.outcome,
        MigrationOutcome::Completed {
            dry_run: false,
            renamed: 2
        }
    );
    assert_eq!(
        repo.editable_names(doc(10)).unwrap(),
        vec!["main:1.content", "main:2.content", "title"]
    );
    assert_eq!(
        repo.editable_data(doc(10), "main:2.content").unwrap(),
        Some(serde_json::json!({ "text": "contentmain2 of 10" }))
    );
}

#[test]
fn test_sparse_page_migrates_stored_editables_only() {
    // GIVEN a block declaring two editables, only one of which was ever filled in
    let repo = repo();
    seed_page(
        &repo,
        1,
        "{{ block \"main\" }}{{ input \"a\" }}{{ input \"b\" }}{{ /block }}",
        &["amain1"],
    );

    // WHEN migrating with the default missing-record policy
    let report = migrate(&repo, &MigrationRequest::new(StrategyDescriptor::new("nested"), "admin"));

    // THEN the stored editable is renamed and the absent one is reported as skipped
    assert_eq!(
        report.outcome,
        MigrationOutcome::Completed {
            dry_run: false,
            renamed: 1
        }
    );
    assert_eq!(report.missing.len(), 1);
    assert_eq!(report.missing[0].old_name.as_str(), "bmain1");
    assert_eq!(repo.editable_names(doc(1)).unwrap(), vec!["main:1.a"]);
}

#[test]
fn test_sparse_page_fails_under_strict_policy() {
    let repo = repo();
    seed_page(
        &repo,
        1,
        "{{ block \"main\" }}{{ input \"a\" }}{{ input \"b\" }}{{ /block }}",
        &["amain1"],
    );
    let mut request = MigrationRequest::new(StrategyDescriptor::new("nested"), "admin");
    request.missing_old_policy = MissingOldPolicy::Fail;

    let report = migrate(&repo, &request);

    assert_eq!(report.exit_code(), 4);
    assert_eq!(repo.editable_names(doc(1)).unwrap(), vec!["amain1"]);
}

#[test]
fn test_second_migration_fails_preflight() {
    // GIVEN a store already migrated to nested names
    let repo = repo();
    seed_page(
        &repo,
        10,
        "{{ block \"main\" }}{{ input \"content\" }}{{ /block }}",
        &["contentmain1"],
    );
    let request = MigrationRequest::new(StrategyDescriptor::new("nested"), "admin");
    assert_eq!(migrate(&repo, &request).exit_code(), 0);

    // WHEN the same migration runs again
    let report = migrate(&repo, &request);

    // THEN validation fails and the names are unchanged
    assert_eq!(report.exit_code(), 4);
    assert_eq!(repo.editable_names(doc(10)).unwrap(), vec!["main:1.content"]);
}

#[test]
fn test_dry_run_leaves_database_unchanged() {
    let repo = repo();
    seed_page(
        &repo,
        10,
        "{{ block \"main\" }}{{ input \"content\" }}{{ /block }}",
        &["contentmain1"],
    );
    let mut request = MigrationRequest::new(StrategyDescriptor::new("nested"), "admin");
    request.dry_run = true;

    let report = migrate(&repo, &request);

    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.applied.unwrap().renames.len(), 1);
    assert_eq!(repo.editable_names(doc(10)).unwrap(), vec!["contentmain1"]);
}

#[test]
fn test_file_store_persists_across_reopen() {
    // GIVEN a store file in a fresh directory
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("store.db");
    {
        let repo = SqliteRepo::open(&path).unwrap();
        repo.put_user(&User::new("admin", true)).unwrap();
        seed_page(
            &repo,
            1,
            "{{ block \"main\" }}{{ input \"content\" }}{{ /block }}",
            &["contentmain1"],
        );
        let report = migrate(&repo, &MigrationRequest::new(StrategyDescriptor::new("nested"), "admin"));
        assert_eq!(report.exit_code(), 0);
    }

    // WHEN it is opened again
    let repo = SqliteRepo::open(&path).unwrap();

    // THEN the committed names are there
    assert_eq!(repo.editable_names(doc(1)).unwrap(), vec!["main:1.content"]);
}
