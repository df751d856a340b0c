use std::collections::HashMap;

use super::{FakeDatabase, FakeObjectStore, bank_table, executor, params, walk};
use crate::job::{JobError, layout::InvalidName};

#[tokio::test]
async fn failed_units_do_not_stop_siblings() {
    let shared = tempfile::tempdir().unwrap();
    let objstore = FakeObjectStore {
        keys: vec!["a/1.csv".into(), "b/2.csv".into(), "c/3.csv".into()],
        fail_keys: vec!["b/2.csv".into()],
        ..Default::default()
    };
    let database = FakeDatabase {
        tables: HashMap::from([("present".to_owned(), bank_table())]),
        ..Default::default()
    };
    let executor = executor(objstore, database, shared.path());
    let report = executor.run(&params("missing,present")).await.unwrap();

    assert!(!report.is_success());
    assert_eq!(report.failure_count(), 2);

    let downloads = report.downloads.as_ref().unwrap();
    assert_eq!(downloads.len(), 3);
    assert!(downloads[0].result.is_ok());
    assert!(matches!(downloads[1].result, Err(JobError::ObjectStorage(_))));
    assert!(downloads[2].result.is_ok());

    assert_eq!(report.exports[0].item, "missing");
    assert!(matches!(report.exports[0].result, Err(JobError::Database(_))));
    assert_eq!(report.exports[1].item, "present");
    assert!(report.exports[1].result.is_ok());

    let root = shared.path().join("exported_by_airflow");
    assert!(root.join("from_minio/a/1.csv").exists());
    assert!(!root.join("from_minio/b/2.csv").exists());
    assert!(root.join("from_minio/c/3.csv").exists());
    assert!(!root.join("from_mysql/missing.csv").exists());
    assert!(root.join("from_mysql/present.csv").exists());
}

#[tokio::test]
async fn listing_failure_leaves_exports_running() {
    let shared = tempfile::tempdir().unwrap();
    let objstore = FakeObjectStore {
        fail_listing: true,
        ..Default::default()
    };
    let database = FakeDatabase {
        tables: HashMap::from([("t".to_owned(), bank_table())]),
        ..Default::default()
    };
    let executor = executor(objstore, database, shared.path());
    let report = executor.run(&params("t")).await.unwrap();

    assert!(matches!(report.downloads, Err(JobError::ObjectStorage(_))));
    assert_eq!(report.failure_count(), 1);
    assert!(
        shared
            .path()
            .join("exported_by_airflow/from_mysql/t.csv")
            .exists()
    );
}

#[tokio::test]
async fn invalid_names_fail_their_unit() {
    let shared = tempfile::tempdir().unwrap();
    let objstore = FakeObjectStore {
        keys: vec!["dir/".into(), "../escape.csv".into(), "ok.csv".into()],
        ..Default::default()
    };
    let executor = executor(objstore, FakeDatabase::default(), shared.path());
    // Neither "" nor "a/b" can name a CSV file in the export tree.
    let report = executor.run(&params(",a/b")).await.unwrap();

    let downloads = report.downloads.as_ref().unwrap();
    assert!(matches!(
        &downloads[0].result,
        Err(JobError::InvalidName(InvalidName::Key(key))) if key == "dir/"
    ));
    assert!(matches!(
        downloads[1].result,
        Err(JobError::InvalidName(InvalidName::Key(_)))
    ));
    assert!(downloads[2].result.is_ok());

    assert!(matches!(
        report.exports[0].result,
        Err(JobError::InvalidName(InvalidName::Table(_)))
    ));
    assert!(matches!(
        report.exports[1].result,
        Err(JobError::InvalidName(InvalidName::Table(_)))
    ));
    // Invalid tables never reach the database.
    assert!(executor.database.statements.lock().unwrap().is_empty());
    assert!(!shared.path().join("escape.csv").exists());
}

#[tokio::test]
async fn untrimmed_table_names_reach_the_database_verbatim() {
    let shared = tempfile::tempdir().unwrap();
    let database = FakeDatabase {
        tables: HashMap::from([("a".to_owned(), bank_table()), ("b".to_owned(), bank_table())]),
        ..Default::default()
    };
    let executor = executor(FakeObjectStore::default(), database, shared.path());
    let report = executor.run(&params("a, b")).await.unwrap();

    assert!(report.exports[0].result.is_ok());
    assert_eq!(report.exports[1].item, " b");
    assert!(report.exports[1].result.is_err());
    let mut statements = executor.database.statements.lock().unwrap().clone();
    statements.sort();
    assert_eq!(statements, vec!["SELECT * FROM  b", "SELECT * FROM a"]);
}

#[tokio::test]
async fn cleanup_failure_aborts_the_run() {
    let shared = tempfile::tempdir().unwrap();
    std::fs::write(shared.path().join("exported_by_airflow"), "not a dir").unwrap();
    let objstore = FakeObjectStore {
        keys: vec!["a/1.csv".into()],
        ..Default::default()
    };
    let executor = executor(objstore, FakeDatabase::default(), shared.path());
    assert!(matches!(
        executor.run(&params("t")).await,
        Err(JobError::Io { .. })
    ));
    assert!(executor.objstore.listed.lock().unwrap().is_empty());
    assert!(executor.database.statements.lock().unwrap().is_empty());
}

#[tokio::test]
async fn escaping_result_dir_is_rejected_before_cleanup() {
    let shared = tempfile::tempdir().unwrap();
    let outside = tempfile::tempdir().unwrap();
    let previous = outside.path().join("out");
    std::fs::create_dir(&previous).unwrap();
    std::fs::write(previous.join("keep.txt"), "keep\n").unwrap();

    let database = FakeDatabase {
        tables: HashMap::from([("t".to_owned(), bank_table())]),
        ..Default::default()
    };
    let executor = executor(FakeObjectStore::default(), database, shared.path());
    for (param, value) in [
        ("result_path_in_shared_volume", previous.to_string_lossy().into_owned()),
        ("result_path_in_shared_volume", "../out".to_owned()),
        ("result_path_prefix_s3", previous.to_string_lossy().into_owned()),
        ("result_path_prefix_mysql", "x/../../out".to_owned()),
    ] {
        let mut params = params("t");
        params.set(param, value.as_str()).unwrap();
        assert!(
            matches!(
                executor.run(&params).await,
                Err(JobError::InvalidName(InvalidName::Dir { param: p, .. })) if p == param
            ),
            "{param}={value}"
        );
    }

    assert!(previous.join("keep.txt").exists());
    assert!(executor.objstore.listed.lock().unwrap().is_empty());
    assert!(executor.database.statements.lock().unwrap().is_empty());
    assert_eq!(walk(shared.path()), vec![shared.path().to_owned()]);
}

#[tokio::test]
async fn interrupted_download_leaves_no_file_behind() {
    let shared = tempfile::tempdir().unwrap();
    let objstore = FakeObjectStore {
        keys: vec!["a/1.csv".into(), "a/2.csv".into()],
        truncate_keys: vec!["a/1.csv".into()],
        ..Default::default()
    };
    let executor = executor(objstore, FakeDatabase::default(), shared.path());
    let report = executor.run(&params("")).await.unwrap();

    let downloads = report.downloads.as_ref().unwrap();
    assert!(matches!(downloads[0].result, Err(JobError::ObjectStorage(_))));
    assert!(downloads[1].result.is_ok());

    let dir = shared.path().join("exported_by_airflow/from_minio/a");
    let mut files = std::fs::read_dir(&dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect::<Vec<_>>();
    files.sort();
    assert_eq!(files, vec!["2.csv"]);
}
