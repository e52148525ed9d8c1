//! Integration tests for the tour backend.

use std::sync::Arc;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::RwLock;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::media::{ImageCache, MediaStore};
use crate::store::{init_database, LocalBucket, LocalStore, RemoteStore, TourStore};
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let config = Config {
            db_path: Some(temp_dir.path().join("test.sqlite")),
            data_dir: temp_dir.path().join("local"),
            media_dir: temp_dir.path().join("media"),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
        };

        let pool = init_database(config.db_path.as_ref().unwrap())
            .await
            .expect("Failed to init DB");
        let remote = Arc::new(RemoteStore::new(pool));
        let local = Arc::new(LocalStore::new(LocalBucket::new(&config.data_dir)));
        let store = Arc::new(TourStore::new(Some(remote), local));

        let catalog = Arc::new(Catalog::new(store.clone()));
        catalog.refresh().await;

        let mut images = ImageCache::new(LocalBucket::new(&config.data_dir));
        images.load();

        let state = AppState {
            store,
            catalog,
            media: Arc::new(MediaStore::new(&config.media_dir)),
            images: Arc::new(RwLock::new(images)),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn create_tour(&self, form: &Value) -> Value {
        let resp = self
            .client
            .post(self.url("/api/tours"))
            .json(form)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], true);
        body["data"].clone()
    }
}

fn tour_form(slug: &str, region: &str) -> Value {
    json!({
        "title": format!("Tour {}", slug),
        "slug": slug,
        "region": region,
        "duration": "2 ngày 1 đêm",
        "transport": "Ô tô + Tàu cao tốc",
        "price": "1,500,000đ/khách",
        "image": "https://example.com/cover.jpg",
        "gallery": "https://example.com/1.jpg\nhttps://example.com/2.jpg",
        "itineraryText": "08:00: Khởi hành\n→ Đón khách tại điểm hẹn\n12:00: Ăn trưa",
        "includedServices": "Xe đưa đón\nHướng dẫn viên",
        "excludedServices": "Chi phí cá nhân",
        "policies": "Trẻ em 0-4 tuổi: Miễn phí"
    })
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_create_and_get_tour() {
    let fixture = TestFixture::new().await;

    let created = fixture
        .create_tour(&tour_form("dao-ly-son-2n1d", "MienTrungTayNguyen"))
        .await;
    let id = created["id"].as_str().unwrap();
    assert!(!id.is_empty());
    assert_eq!(created["region"], "MienTrungTayNguyen");
    assert_eq!(created["includedServices"], json!(["Xe đưa đón", "Hướng dẫn viên"]));
    // Codec ran at save time: the structured mirror is populated.
    assert_eq!(created["itinerary"][0]["time"], "08:00");
    assert_eq!(created["itinerary"][1]["description"], "Đón khách tại điểm hẹn");

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/tours/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let fetched = &body["data"];

    // Equal except updatedAt, which the store may re-stamp.
    assert_eq!(fetched["id"], created["id"]);
    assert_eq!(fetched["slug"], created["slug"]);
    assert_eq!(fetched["title"], created["title"]);
    assert_eq!(fetched["itineraryText"], created["itineraryText"]);
    // Creation time survives the store round-trip (to second precision;
    // sub-second formatting may differ between backends).
    assert_eq!(
        &fetched["createdAt"].as_str().unwrap()[..19],
        &created["createdAt"].as_str().unwrap()[..19]
    );
}

#[tokio::test]
async fn test_create_rejects_missing_fields() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/tours"))
        .json(&json!({ "title": "Chỉ có tên" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    let fields = body["error"]["details"]["fields"].as_array().unwrap();
    assert!(fields.contains(&json!("slug")));
    assert!(fields.contains(&json!("itineraryText")));

    // Nothing was saved.
    let resp = fixture
        .client
        .get(fixture.url("/api/tours"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_create_rejects_unknown_region() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/tours"))
        .json(&tour_form("tour-x", "MienTay"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_update_preserves_id_and_creation_time() {
    let fixture = TestFixture::new().await;

    let created = fixture.create_tour(&tour_form("tour-a", "BinhDinh")).await;
    let id = created["id"].as_str().unwrap();

    let mut form = tour_form("tour-a", "BinhDinh");
    form["title"] = json!("Tên mới");
    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/tours/{}", id)))
        .json(&form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["id"], created["id"]);
    assert_eq!(body["data"]["title"], "Tên mới");
    assert_eq!(
        &body["data"]["createdAt"].as_str().unwrap()[..19],
        &created["createdAt"].as_str().unwrap()[..19]
    );

    // Updating an id that never existed is 404 at the admin surface.
    let resp = fixture
        .client
        .put(fixture.url("/api/tours/khong-ton-tai"))
        .json(&form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let fixture = TestFixture::new().await;

    let created = fixture.create_tour(&tour_form("tour-b", "MienNam")).await;
    let id = created["id"].as_str().unwrap();

    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/tours/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/tours/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // Deleting again does not error.
    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/tours/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_region_menu_lists_all_partitions() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/regions"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let regions = body["data"].as_array().unwrap();
    assert_eq!(regions.len(), 4);
    assert_eq!(regions[0], json!({"key": "BinhDinh", "label": "Bình Định"}));
}

#[tokio::test]
async fn test_region_listing_filters_the_catalog() {
    let fixture = TestFixture::new().await;

    fixture.create_tour(&tour_form("bac-1", "MienBac")).await;
    fixture.create_tour(&tour_form("nam-1", "MienNam")).await;
    fixture.create_tour(&tour_form("bac-2", "MienBac")).await;

    let resp = fixture
        .client
        .get(fixture.url("/api/regions/MienBac/tours"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let slugs: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["slug"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(slugs, vec!["bac-1", "bac-2"]);

    let resp = fixture
        .client
        .get(fixture.url("/api/regions/MienTay/tours"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_slug_lookup_and_rendered_itinerary() {
    let fixture = TestFixture::new().await;

    let mut form = tour_form("a-b", "BinhDinh");
    form["itineraryText"] = json!("08:00: Start\n→ detail one\n![x](http://img/1.png)");
    fixture.create_tour(&form).await;

    let resp = fixture
        .client
        .get(fixture.url("/api/slug/a-b"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["tour"]["slug"], "a-b");
    assert_eq!(body["data"]["priceLabel"], "1,500,000đ/khách");
    assert_eq!(body["data"]["regionLabel"], "Bình Định");
    assert_eq!(body["data"]["gallery"].as_array().unwrap().len(), 2);

    let resp = fixture
        .client
        .get(fixture.url("/api/slug/a-b/rendered"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let blocks = body["data"].as_array().unwrap();
    assert_eq!(blocks.len(), 3);
    assert_eq!(blocks[0], json!({"kind": "text", "text": "08:00: Start"}));
    assert_eq!(blocks[1], json!({"kind": "text", "text": "→ detail one"}));
    assert_eq!(
        blocks[2],
        json!({"kind": "image", "alt": "x", "url": "http://img/1.png"})
    );

    let resp = fixture
        .client
        .get(fixture.url("/api/slug/khong-ton-tai"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_export_import_round_trip() {
    let fixture = TestFixture::new().await;

    fixture.create_tour(&tour_form("tour-a", "BinhDinh")).await;
    fixture.create_tour(&tour_form("tour-b", "MienBac")).await;

    let exported = fixture
        .client
        .get(fixture.url("/api/tours/export"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(serde_json::from_str::<Value>(&exported).unwrap().is_array());

    // Clear everything, then restore from the export.
    let resp = fixture
        .client
        .delete(fixture.url("/api/tours"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .get(fixture.url("/api/tours"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let resp = fixture
        .client
        .post(fixture.url("/api/tours/import"))
        .body(exported)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"], 2);

    let resp = fixture
        .client
        .get(fixture.url("/api/tours"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_import_rejects_invalid_payloads() {
    let fixture = TestFixture::new().await;

    fixture.create_tour(&tour_form("tour-a", "BinhDinh")).await;

    let resp = fixture
        .client
        .post(fixture.url("/api/tours/import"))
        .body("{\"not\": \"an array\"}")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    // The store was not touched.
    let resp = fixture
        .client
        .get(fixture.url("/api/tours"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_media_upload_and_serve() {
    let fixture = TestFixture::new().await;

    let bytes = vec![42u8; 1000];
    let resp = fixture
        .client
        .post(fixture.url("/api/media/beach.jpg"))
        .body(bytes.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"], "/media/beach.jpg");

    let resp = fixture
        .client
        .get(fixture.url("/media/beach.jpg"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "image/jpeg"
    );
    assert_eq!(resp.bytes().await.unwrap().to_vec(), bytes);

    let resp = fixture
        .client
        .get(fixture.url("/media/missing.jpg"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_editor_image_cache_flow() {
    let fixture = TestFixture::new().await;

    // Park a data URL and get the markdown reference back.
    let resp = fixture
        .client
        .post(fixture.url("/api/images"))
        .json(&json!({
            "fileName": "beach.png",
            "dataUrl": "data:image/png;base64,AAAA"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let id = body["data"]["id"].as_str().unwrap().to_string();
    let markdown = body["data"]["markdown"].as_str().unwrap().to_string();
    assert_eq!(markdown, format!("![beach.png](@{})", id));

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/images/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"], "data:image/png;base64,AAAA");

    // The reference expands when the itinerary is rendered.
    let mut form = tour_form("tour-anh", "MienNam");
    form["itineraryText"] = json!(format!("08:00: Khởi hành\n{}", markdown));
    fixture.create_tour(&form).await;

    let resp = fixture
        .client
        .get(fixture.url("/api/slug/tour-anh/rendered"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let blocks = body["data"].as_array().unwrap();
    assert_eq!(blocks[1]["kind"], "image");
    assert_eq!(blocks[1]["url"], "data:image/png;base64,AAAA");

    // Cleanup with an empty used set drops the entry.
    let resp = fixture
        .client
        .post(fixture.url("/api/images/cleanup"))
        .json(&json!({ "usedIds": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/images/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_edit_form_round_trip() {
    let fixture = TestFixture::new().await;

    let created = fixture.create_tour(&tour_form("tour-form", "MienBac")).await;
    let id = created["id"].as_str().unwrap();

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/tours/{}/form", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let form = &body["data"];
    assert_eq!(form["slug"], "tour-form");
    assert_eq!(form["region"], "MienBac");
    assert_eq!(form["includedServices"], "Xe đưa đón\nHướng dẫn viên");
    assert_eq!(
        form["itineraryText"],
        "08:00: Khởi hành\n→ Đón khách tại điểm hẹn\n12:00: Ăn trưa"
    );
}
