use kiosk_core::models::NewSource;
use kiosk_core::sandbox::ScriptSandbox;
use kiosk_core::traits::Extractor;
use kiosk_db::Database;
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

/// In-memory database with migrations (including seeds) applied.
///
/// A single connection is required: every `sqlite::memory:` connection is
/// its own database.
async fn setup_test_db() -> Database {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    let db = Database::from_pool(pool);
    db.migrate().await.expect("migrations");
    db
}

fn sample_source(name: &str) -> NewSource {
    NewSource {
        name: name.into(),
        url: format!("https://example.com/{name}"),
        processing: "parse_feed(data)".into(),
        is_active: true,
    }
}

#[tokio::test]
async fn migrations_seed_two_example_sources() {
    let db = setup_test_db().await;
    let summaries = db.source_repo().list_summaries().await.unwrap();

    let names: Vec<_> = summaries.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Nplus1", "ProgrammerHumor"]);
    assert!(summaries.iter().all(|s| s.is_active));
}

#[tokio::test]
async fn seeded_scripts_run_in_the_sandbox() {
    let db = setup_test_db().await;
    let repo = db.source_repo();
    let sandbox = ScriptSandbox::new();

    let ids = repo.list_active_ids().await.unwrap();
    let rss_source = repo.read(ids[0]).await.unwrap().unwrap();
    assert_eq!(rss_source.name, "Nplus1");

    let rss = r#"<rss version="2.0"><channel>
        <item><title><![CDATA[Seeded]]></title>
        <link>https://nplus1.ru/news/1</link>
        <description>d</description></item>
    </channel></rss>"#;
    let items = sandbox.extract(&rss_source.processing, rss).unwrap();
    assert_eq!(items[0].name, "Seeded");

    let html_source = repo.read(ids[1]).await.unwrap().unwrap();
    let html = r#"<html><body>
        <article class="post">
            <h2><a href="https://programmerhumor.io/p/1">A joke</a></h2>
            <picture><img src="https://programmerhumor.io/i/1.png"></picture>
        </article>
    </body></html>"#;
    let items = sandbox.extract(&html_source.processing, html).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "A joke");
    assert_eq!(items[0].link, "https://programmerhumor.io/p/1");
    assert_eq!(items[0].image.as_deref(), Some("https://programmerhumor.io/i/1.png"));
}

#[tokio::test]
async fn create_and_read_roundtrip() {
    let db = setup_test_db().await;
    let repo = db.source_repo();

    let id = repo.create(&sample_source("Tech")).await.unwrap();
    let source = repo.read(id).await.unwrap().expect("created source");

    assert_eq!(source.id, id);
    assert_eq!(source.name, "Tech");
    assert_eq!(source.url, "https://example.com/Tech");
    assert!(source.is_active);
    assert_eq!(source.created_at, source.updated_at);
}

#[tokio::test]
async fn read_missing_returns_none() {
    let db = setup_test_db().await;
    assert!(db.source_repo().read(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn update_replaces_all_fields() {
    let db = setup_test_db().await;
    let repo = db.source_repo();
    let id = repo.create(&sample_source("Old")).await.unwrap();

    repo.update(
        id,
        &NewSource {
            name: "New".into(),
            url: "https://example.com/new".into(),
            processing: "[]".into(),
            is_active: false,
        },
    )
    .await
    .unwrap();

    let source = repo.read(id).await.unwrap().unwrap();
    assert_eq!(source.name, "New");
    assert_eq!(source.processing, "[]");
    assert!(!source.is_active);
    assert!(source.updated_at >= source.created_at);
}

#[tokio::test]
async fn update_missing_is_not_found() {
    let db = setup_test_db().await;
    let err = db
        .source_repo()
        .update(Uuid::new_v4(), &sample_source("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, kiosk_core::AppError::NotFound(_)));
}

#[tokio::test]
async fn delete_removes_the_row() {
    let db = setup_test_db().await;
    let repo = db.source_repo();
    let id = repo.create(&sample_source("Gone")).await.unwrap();

    repo.delete(id).await.unwrap();
    assert!(repo.read(id).await.unwrap().is_none());

    let err = repo.delete(id).await.unwrap_err();
    assert!(matches!(err, kiosk_core::AppError::NotFound(_)));
}

#[tokio::test]
async fn list_active_ids_keeps_insertion_order_and_skips_inactive() {
    let db = setup_test_db().await;
    let repo = db.source_repo();

    let a = repo.create(&sample_source("A")).await.unwrap();
    let b = repo
        .create(&NewSource {
            is_active: false,
            ..sample_source("B")
        })
        .await
        .unwrap();
    let c = repo.create(&sample_source("C")).await.unwrap();

    let ids = repo.list_active_ids().await.unwrap();
    // Two seeded sources come first.
    assert_eq!(ids.len(), 4);
    assert_eq!(&ids[2..], &[a, c]);
    assert!(!ids.contains(&b));
}

#[tokio::test]
async fn settings_roundtrip_and_defaults() {
    let db = setup_test_db().await;
    let settings = db.settings_repo();

    assert!(settings.get("refresh_minutes").await.unwrap().is_none());

    settings
        .set("refresh_minutes", serde_json::json!(2.5))
        .await
        .unwrap();
    assert_eq!(
        settings.get("refresh_minutes").await.unwrap(),
        Some(serde_json::json!(2.5))
    );

    // Defaults never clobber an existing value.
    settings
        .init_defaults(&[
            ("refresh_minutes", serde_json::json!(5.0)),
            ("theme", serde_json::json!("dark")),
        ])
        .await
        .unwrap();
    assert_eq!(
        settings.get("refresh_minutes").await.unwrap(),
        Some(serde_json::json!(2.5))
    );
    assert_eq!(
        settings.get("theme").await.unwrap(),
        Some(serde_json::json!("dark"))
    );

    // Overwrite via upsert.
    settings
        .set("refresh_minutes", serde_json::json!(1))
        .await
        .unwrap();
    assert_eq!(
        settings.get("refresh_minutes").await.unwrap(),
        Some(serde_json::json!(1))
    );
}
