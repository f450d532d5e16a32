//! Tests for the care error handling system.

use std::collections::HashSet;

use care_core::errors::error_code;
use care_core::errors::*;

#[test]
fn every_error_has_a_code() {
    let errors: Vec<Box<dyn Fn() -> &'static str>> = vec![
        Box::new(|| ConfigError::FileNotFound { path: "/tmp".into() }.error_code()),
        Box::new(|| StorageError::DbBusy.error_code()),
        Box::new(|| MigrationError::Cancelled.error_code()),
    ];
    for code in errors {
        assert!(!code().is_empty());
    }
}

#[test]
fn migration_codes_distinguish_the_failure_taxonomy() {
    let dependency = MigrationError::DependencyNotSatisfied {
        migration: "emr.0020".into(),
        dependency: "emr.0019".into(),
    };
    let ddl = MigrationError::DdlFailed {
        migration: "emr.0020".into(),
        message: "no such table".into(),
    };
    let exists = MigrationError::TableAlreadyExists {
        table: "emr_consent".into(),
    };

    let codes: HashSet<_> = [dependency.error_code(), ddl.error_code(), exists.error_code()]
        .into_iter()
        .collect();
    assert_eq!(codes.len(), 3);
    assert_eq!(exists.error_code(), error_code::TABLE_ALREADY_EXISTS);
}

#[test]
fn operator_string_keeps_message_verbatim() {
    let err = MigrationError::DdlFailed {
        migration: "emr.0020".into(),
        message: "NOT NULL constraint failed: new__emr_deviceservicehistory.serviced_on".into(),
    };
    assert_eq!(
        err.operator_string(),
        "[DDL_FAILED] DDL failed in emr.0020: NOT NULL constraint failed: new__emr_deviceservicehistory.serviced_on"
    );
}

#[test]
fn storage_errors_convert_and_keep_their_code() {
    let err: MigrationError = StorageError::DbBusy.into();
    assert_eq!(err.error_code(), error_code::DB_BUSY);
    assert!(err.to_string().contains("Database busy"));
}
