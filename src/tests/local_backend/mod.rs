use super::{executor, params};
use crate::{config, deploy};

#[tokio::test]
async fn directory_store_and_sqlite() {
    let shared = tempfile::tempdir().unwrap();
    let objects = tempfile::tempdir().unwrap();
    for (key, body) in [
        ("bank2024-01-01/a/1.csv", "id\n1\n"),
        ("bank2024-01-01/b/2.csv", "id\n2\n"),
        ("bank2023-12-31/old.csv", "id\n0\n"),
    ] {
        let path = objects.path().join("bank").join(key);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    let objstore = deploy::ObjectStore::from_config(&config::ObjectStore::Local {
        root: objects.path().to_owned(),
    })
    .await;
    let url = format!("sqlite://{}?mode=rwc", objects.path().join("bank.db").display());
    let setup = deploy::local::db::LocalDatabase::open(&url).await.unwrap();
    sqlx::raw_sql(
        r#"
        CREATE TABLE accounts(id INTEGER PRIMARY KEY, owner TEXT, balance REAL);
        INSERT INTO accounts VALUES (1, 'Ann, Jr.', 12.5), (2, NULL, 0.0);
        CREATE TABLE trades(id INTEGER PRIMARY KEY, ticker TEXT);
    "#,
    )
    .execute(setup.pool())
    .await
    .unwrap();
    let database = deploy::Database::connect(&url).await.unwrap();
    assert!(matches!(database, deploy::Database::Sqlite(_)));

    let executor = executor(objstore, database, shared.path());
    let report = executor.run(&params("accounts,trades")).await.unwrap();
    assert!(report.is_success(), "{report:?}");

    let root = shared.path().join("exported_by_airflow");
    assert_eq!(
        std::fs::read_to_string(root.join("from_minio/bank2024-01-01/a/1.csv")).unwrap(),
        "id\n1\n"
    );
    assert_eq!(
        std::fs::read_to_string(root.join("from_minio/bank2024-01-01/b/2.csv")).unwrap(),
        "id\n2\n"
    );
    assert!(!root.join("from_minio/bank2023-12-31").exists());
    assert_eq!(
        std::fs::read_to_string(root.join("from_mysql/accounts.csv")).unwrap(),
        "id,owner,balance\n1,\"Ann, Jr.\",12.5\n2,,0\n"
    );
    assert_eq!(
        std::fs::read_to_string(root.join("from_mysql/trades.csv")).unwrap(),
        "id,ticker\n"
    );
}
