//! Applying, reverting, and planning the declared migrations.

use care_core::config::MigrationConfig;
use care_core::errors::MigrationError;
use care_core::traits::{Cancellable, CancellationToken};
use care_storage::connection::pragmas::{apply_pragmas, foreign_keys_enabled};
use care_storage::introspect;
use care_storage::migrations::emr_0020_alter_deviceservicehistory_serviced_on_consent::NAME as CONSENT_MIGRATION;
use care_storage::migrations::{recorder, registry};
use care_storage::queries::{devices, encounters};
use care_storage::schema::{ModelRef, OnDelete};
use care_storage::{Migration, MigrationExecutor, MigrationGraph, MigrationKey, MigrationTarget};
use chrono::Utc;
use rusqlite::Connection;

fn setup() -> (Connection, MigrationGraph) {
    let conn = Connection::open_in_memory().unwrap();
    apply_pragmas(&conn, 5000).unwrap();
    let graph = registry(&MigrationConfig::default()).unwrap();
    (conn, graph)
}

fn consent_key() -> MigrationKey {
    MigrationKey::new("emr", CONSENT_MIGRATION)
}

fn baseline_key() -> MigrationKey {
    MigrationKey::new("emr", "0019_device_metadata")
}

fn serviced_on_not_null(conn: &Connection) -> bool {
    introspect::columns(conn, "emr_deviceservicehistory")
        .unwrap()
        .into_iter()
        .find(|c| c.name == "serviced_on")
        .unwrap()
        .not_null
}

#[test]
fn migrate_all_applies_in_dependency_order() {
    let (conn, graph) = setup();
    let executor = MigrationExecutor::new(&conn, &graph);

    let steps = executor.migrate(&MigrationTarget::All).unwrap();
    let keys: Vec<String> = steps.iter().map(|s| s.key.to_string()).collect();
    assert_eq!(
        keys,
        vec![
            "auth.0001_initial".to_string(),
            "emr.0019_device_metadata".to_string(),
            format!("emr.{CONSENT_MIGRATION}"),
        ]
    );
    assert!(steps.iter().all(|s| !s.backwards));

    let applied = recorder::applied_migrations(&conn).unwrap();
    assert_eq!(applied.len(), 3);
    assert_eq!(applied[2].key, consent_key());

    // A second run has nothing to do.
    assert!(executor.migrate(&MigrationTarget::All).unwrap().is_empty());
    assert!(foreign_keys_enabled(&conn).unwrap());
}

#[test]
fn missing_module_prerequisite_is_a_dependency_error() {
    let (conn, graph) = setup();
    let executor = MigrationExecutor::new(&conn, &graph);

    let err = executor.apply(&consent_key()).unwrap_err();
    match err {
        MigrationError::DependencyNotSatisfied { migration, .. } => {
            assert_eq!(migration, consent_key().to_string())
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!introspect::table_exists(&conn, "emr_consent").unwrap());
    assert!(recorder::applied_migrations(&conn).unwrap().is_empty());
}

#[test]
fn missing_user_model_prerequisite_is_a_dependency_error() {
    let (conn, graph) = setup();
    let executor = MigrationExecutor::new(&conn, &graph);
    executor
        .migrate(&MigrationTarget::To(baseline_key()))
        .unwrap();

    // Persisted state loses the user-model migration.
    recorder::record_unapplied(&conn, &MigrationKey::new("auth", "0001_initial")).unwrap();

    let err = executor.apply(&consent_key()).unwrap_err();
    match err {
        MigrationError::DependencyNotSatisfied { dependency, .. } => {
            assert_eq!(dependency, "auth.0001_initial")
        }
        other => panic!("unexpected error: {other}"),
    }
    // Nothing ran: the column is still required and the table is absent.
    assert!(serviced_on_not_null(&conn));
    assert!(!introspect::table_exists(&conn, "emr_consent").unwrap());
}

#[test]
fn applying_twice_fails_with_table_already_exists() {
    let (conn, graph) = setup();
    let executor = MigrationExecutor::new(&conn, &graph);
    executor.migrate(&MigrationTarget::All).unwrap();

    let err = executor.apply(&consent_key()).unwrap_err();
    assert!(
        matches!(err, MigrationError::TableAlreadyExists { ref table } if table == "emr_consent"),
        "got {err}"
    );
    assert_eq!(recorder::applied_migrations(&conn).unwrap().len(), 3);
    assert!(!serviced_on_not_null(&conn));
}

#[test]
fn missing_referenced_table_fails_before_any_ddl() {
    let (conn, graph) = setup();
    let executor = MigrationExecutor::new(&conn, &graph);
    executor
        .migrate(&MigrationTarget::To(baseline_key()))
        .unwrap();

    // Live schema drifts from the recorded state.
    conn.execute_batch("DROP TABLE emr_encounter").unwrap();

    let err = executor.apply(&consent_key()).unwrap_err();
    match err {
        MigrationError::DdlFailed { message, .. } => assert!(message.contains("emr_encounter")),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!introspect::table_exists(&conn, "emr_consent").unwrap());
    assert!(serviced_on_not_null(&conn));
    assert!(!executor.applied().unwrap().contains(&consent_key()));
}

#[test]
fn tables_created_earlier_in_the_same_migration_count_as_present() {
    let (conn, graph) = setup();
    let executor = MigrationExecutor::new(&conn, &graph);

    // emr.0019 creates emr_device, then a table referencing it.
    executor
        .migrate(&MigrationTarget::To(baseline_key()))
        .unwrap();
    assert!(introspect::table_exists(&conn, "emr_deviceservicehistory").unwrap());
}

#[test]
fn consent_table_has_the_declared_columns() {
    let (conn, graph) = setup();
    MigrationExecutor::new(&conn, &graph)
        .migrate(&MigrationTarget::All)
        .unwrap();

    let columns: Vec<(String, String, bool)> = introspect::columns(&conn, "emr_consent")
        .unwrap()
        .into_iter()
        .map(|c| (c.name, c.decl_type, c.not_null))
        .collect();
    let expected = [
        ("id", "integer", true),
        ("external_id", "char(32)", true),
        ("created_date", "datetime", false),
        ("modified_date", "datetime", false),
        ("deleted", "bool", true),
        ("history", "text", true),
        ("meta", "text", true),
        ("status", "varchar(50)", true),
        ("category", "varchar(50)", true),
        ("date", "datetime", true),
        ("period", "text", true),
        ("decision", "varchar(10)", true),
        ("verification_details", "text", true),
        ("created_by_id", "bigint", false),
        ("encounter_id", "bigint", true),
        ("updated_by_id", "bigint", false),
    ];
    assert_eq!(columns.len(), expected.len());

    let declared = graph
        .state_after(&consent_key())
        .unwrap()
        .model(&ModelRef::new("emr", "Consent"))
        .unwrap()
        .columns();
    let live: Vec<&String> = columns.iter().map(|(name, _, _)| name).collect();
    assert_eq!(live, declared.iter().collect::<Vec<_>>());
    for ((name, ty, not_null), (e_name, e_ty, e_not_null)) in columns.iter().zip(expected) {
        assert_eq!(name, e_name);
        // SQLite may echo declared types in a different case.
        assert!(ty.eq_ignore_ascii_case(e_ty), "type of {name}: {ty}");
        assert_eq!(*not_null, e_not_null, "nullability of {name}");
    }
}

#[test]
fn consent_table_has_three_foreign_keys() {
    let (conn, graph) = setup();
    MigrationExecutor::new(&conn, &graph)
        .migrate(&MigrationTarget::All)
        .unwrap();

    let fks = introspect::foreign_keys(&conn, "emr_consent").unwrap();
    assert_eq!(fks.len(), 3);
    let by_column = |col: &str| fks.iter().find(|f| f.column == col).unwrap().clone();

    let encounter = by_column("encounter_id");
    assert_eq!(encounter.target_table, "emr_encounter");
    assert_eq!(encounter.target_column, "id");
    assert_eq!(encounter.on_delete, OnDelete::Cascade.pragma_name());

    for col in ["created_by_id", "updated_by_id"] {
        let fk = by_column(col);
        assert_eq!(fk.target_table, "auth_user");
        assert_eq!(fk.on_delete, OnDelete::SetNull.pragma_name());
    }
}

#[test]
fn consent_indexes_cover_indexed_fields() {
    let (conn, graph) = setup();
    MigrationExecutor::new(&conn, &graph)
        .migrate(&MigrationTarget::All)
        .unwrap();

    let indexes = introspect::indexes(&conn, "emr_consent").unwrap();
    let indexed: Vec<&str> = indexes
        .iter()
        .flat_map(|i| i.columns.iter().map(String::as_str))
        .collect();
    for col in [
        "external_id",
        "created_date",
        "modified_date",
        "deleted",
        "created_by_id",
        "encounter_id",
        "updated_by_id",
    ] {
        assert!(indexed.contains(&col), "missing index on {col}");
    }
    assert!(indexes
        .iter()
        .any(|i| i.unique && i.columns == vec!["external_id".to_string()]));
}

#[test]
fn alter_field_preserves_existing_rows() {
    let (conn, graph) = setup();
    let executor = MigrationExecutor::new(&conn, &graph);
    executor
        .migrate(&MigrationTarget::To(baseline_key()))
        .unwrap();

    let device = devices::insert_device(&conn, "Ventilator").unwrap();
    let serviced = Utc::now();
    let id = devices::insert_service_history(&conn, device, Some(serviced), "filters").unwrap();
    let before = devices::get_service_history(&conn, id).unwrap().unwrap();

    // Before the delta, serviced_on is mandatory.
    assert!(devices::insert_service_history(&conn, device, None, "x").is_err());

    executor.apply(&consent_key()).unwrap();

    let after = devices::get_service_history(&conn, id).unwrap().unwrap();
    assert_eq!(after.external_id, before.external_id);
    assert_eq!(after.serviced_on, before.serviced_on);
    assert_eq!(after.note, "filters");

    let unscheduled = devices::insert_service_history(&conn, device, None, "pending").unwrap();
    let row = devices::get_service_history(&conn, unscheduled).unwrap().unwrap();
    assert!(row.serviced_on.is_none());

    // The rebuilt table keeps its device foreign key and index.
    let fks = introspect::foreign_keys(&conn, "emr_deviceservicehistory").unwrap();
    assert!(fks.iter().any(|f| f.column == "device_id" && f.on_delete == "CASCADE"));
    let indexes = introspect::indexes(&conn, "emr_deviceservicehistory").unwrap();
    assert!(indexes.iter().any(|i| i.columns == vec!["device_id".to_string()]));
}

#[test]
fn reverting_restores_serviced_on_and_drops_consent_only() {
    let (conn, graph) = setup();
    let executor = MigrationExecutor::new(&conn, &graph);
    executor.migrate(&MigrationTarget::All).unwrap();
    let encounter = encounters::insert_encounter(&conn, "in_progress", "imp", None).unwrap();

    let steps = executor
        .migrate(&MigrationTarget::To(baseline_key()))
        .unwrap();
    assert_eq!(steps.len(), 1);
    assert!(steps[0].backwards);
    assert_eq!(steps[0].key, consent_key());

    assert!(!introspect::table_exists(&conn, "emr_consent").unwrap());
    assert!(serviced_on_not_null(&conn));
    let tables = introspect::table_names(&conn).unwrap();
    for table in ["auth_user", "emr_encounter", "emr_device", "emr_deviceservicehistory"] {
        assert!(tables.contains(&table.to_string()), "{table} missing");
    }
    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM emr_encounter WHERE id = ?1", [encounter], |r| r.get(0))
        .unwrap();
    assert_eq!(remaining, 1);
    assert!(!executor.applied().unwrap().contains(&consent_key()));
}

#[test]
fn revert_with_null_serviced_on_rolls_back() {
    let (conn, graph) = setup();
    let executor = MigrationExecutor::new(&conn, &graph);
    executor.migrate(&MigrationTarget::All).unwrap();

    let device = devices::insert_device(&conn, "Monitor").unwrap();
    devices::insert_service_history(&conn, device, None, "unscheduled").unwrap();

    let err = executor.unapply(&consent_key()).unwrap_err();
    match err {
        MigrationError::DdlFailed { message, .. } => assert!(message.contains("NOT NULL")),
        other => panic!("unexpected error: {other}"),
    }
    // Whole unit rolled back: consent table still present, still recorded.
    assert!(introspect::table_exists(&conn, "emr_consent").unwrap());
    assert!(executor.applied().unwrap().contains(&consent_key()));
    assert!(foreign_keys_enabled(&conn).unwrap());
}

#[test]
fn cannot_revert_while_dependents_are_applied() {
    let (conn, graph) = setup();
    let executor = MigrationExecutor::new(&conn, &graph);
    executor.migrate(&MigrationTarget::All).unwrap();

    let err = executor.unapply(&baseline_key()).unwrap_err();
    assert!(matches!(err, MigrationError::DependentsStillApplied { .. }));

    let err = executor.unapply(&MigrationKey::new("auth", "0001_initial")).unwrap_err();
    assert!(matches!(err, MigrationError::DependentsStillApplied { .. }));
}

#[test]
fn unapplying_an_unapplied_migration_fails() {
    let (conn, graph) = setup();
    let executor = MigrationExecutor::new(&conn, &graph);
    let err = executor.unapply(&consent_key()).unwrap_err();
    assert!(matches!(err, MigrationError::NotApplied { .. }));
}

#[test]
fn zero_reverts_an_app_and_leaves_others() {
    let (conn, graph) = setup();
    let executor = MigrationExecutor::new(&conn, &graph);
    executor.migrate(&MigrationTarget::All).unwrap();

    let steps = executor
        .migrate(&MigrationTarget::Zero("emr".to_string()))
        .unwrap();
    let keys: Vec<MigrationKey> = steps.into_iter().map(|s| s.key).collect();
    assert_eq!(keys, vec![consent_key(), baseline_key()]);

    let tables = introspect::table_names(&conn).unwrap();
    assert!(tables.iter().all(|t| !t.starts_with("emr_")));
    assert!(tables.contains(&"auth_user".to_string()));
}

#[test]
fn cancellation_rolls_back_the_unit() {
    let (conn, graph) = setup();
    let token = CancellationToken::new();
    let executor = MigrationExecutor::new(&conn, &graph).with_cancellation(token.clone());
    executor
        .migrate(&MigrationTarget::To(baseline_key()))
        .unwrap();

    token.cancel();
    let err = executor.apply(&consent_key()).unwrap_err();
    assert!(matches!(err, MigrationError::Cancelled));
    assert!(!introspect::table_exists(&conn, "emr_consent").unwrap());
    assert!(serviced_on_not_null(&conn));
    assert!(!executor.applied().unwrap().contains(&consent_key()));
}

#[test]
fn cancellation_is_rechecked_before_recording() {
    let conn = Connection::open_in_memory().unwrap();
    apply_pragmas(&conn, 5000).unwrap();
    // No operations, so the only chance to notice is just before recording.
    let graph = MigrationGraph::new(vec![Migration::new("emr", "0001_empty")]).unwrap();
    let token = CancellationToken::new();
    token.cancel();

    let executor = MigrationExecutor::new(&conn, &graph).with_cancellation(token);
    let err = executor
        .apply(&MigrationKey::new("emr", "0001_empty"))
        .unwrap_err();
    assert!(matches!(err, MigrationError::Cancelled));
    assert!(executor.applied().unwrap().is_empty());
}

#[test]
fn plan_does_not_execute() {
    let (conn, graph) = setup();
    let executor = MigrationExecutor::new(&conn, &graph);

    let plan = executor.plan(&MigrationTarget::App("emr".to_string())).unwrap();
    assert_eq!(plan.len(), 3);
    assert_eq!(plan[0].to_string(), "Apply auth.0001_initial");
    assert!(introspect::table_names(&conn).unwrap().is_empty());

    let shown = executor.show().unwrap();
    assert_eq!(shown.len(), 3);
    assert!(shown.iter().all(|(_, applied)| !applied));
}

#[test]
fn sql_for_renders_both_directions() {
    let (conn, graph) = setup();
    let executor = MigrationExecutor::new(&conn, &graph);

    let forwards = executor.sql_for(&consent_key(), false).unwrap();
    assert!(forwards[0].starts_with("CREATE TABLE \"new__emr_deviceservicehistory\""));
    assert!(forwards.iter().any(|s| s.contains("\"serviced_on\" datetime NULL")));
    assert!(forwards
        .iter()
        .any(|s| s.starts_with("CREATE TABLE \"emr_consent\"")));

    let backwards = executor.sql_for(&consent_key(), true).unwrap();
    assert_eq!(backwards[0], "DROP TABLE \"emr_consent\"");
    assert!(backwards.iter().any(|s| s.contains("\"serviced_on\" datetime NOT NULL")));

    // Rendering touches nothing.
    assert!(introspect::table_names(&conn).unwrap().is_empty());
}

#[test]
fn unknown_user_model_app_fails_graph_validation() {
    let config = MigrationConfig {
        auth_user_model: Some("accounts.User".to_string()),
    };
    let err = registry(&config).unwrap_err();
    assert!(
        matches!(err, MigrationError::UnknownMigration { ref migration } if migration == "accounts.__first__")
    );
}

#[test]
fn file_backed_database_through_manager() {
    let dir = tempfile::TempDir::new().unwrap();
    let db = care_storage::DatabaseManager::open(&dir.path().join("care.db")).unwrap();
    let graph = registry(&MigrationConfig::default()).unwrap();

    db.with_writer(|conn| {
        MigrationExecutor::new(conn, &graph).migrate(&MigrationTarget::All)?;
        Ok::<_, MigrationError>(())
    })
    .unwrap();

    let reopened = care_storage::DatabaseManager::open(&dir.path().join("care.db")).unwrap();
    let applied = reopened
        .with_writer(|conn| MigrationExecutor::new(conn, &graph).applied())
        .unwrap();
    assert_eq!(applied.len(), 3);
    assert!(reopened.path().is_some());
}
