//! HTTP tests: start the storefront on a free port against a temp database
//! and drive it with `reqwest`.

use cartridge_shop::config::{parse_config, Config};
use cartridge_shop::server::run_server;
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;

const PRICE_LIST: &str = "\
CARTRIDGE LIST FOR ZWIITA BROTHERS
Model            Price
HP 44A Black Original LaserJet Toner (CF244A) - R250
Canon 445XL Black Ink
HP 147X High Yield Black Toner (W1470X) R 1,250.00
";

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

fn test_config(root: &Path, port: u16, source: &str) -> Config {
    let static_dir = root.join("public");
    std::fs::create_dir_all(&static_dir).unwrap();
    std::fs::write(static_dir.join("index.html"), "<h1>Cartridges</h1>").unwrap();

    parse_config(&format!(
        r#"
[db]
path = "{root}/shop.sqlite"

[catalog]
source = "{root}/{source}"

[server]
bind = "127.0.0.1:{port}"
static_dir = "{root}/public"

[notify]
provider = "log"
admin_email = "orders@shop.example"
from = "shop@shop.example"
"#,
        root = root.display(),
        source = source,
        port = port
    ))
    .unwrap()
}

/// Starts a server with the price list imported; returns its base URL.
async fn start_shop(tmp: &TempDir) -> String {
    std::fs::write(tmp.path().join("list.txt"), PRICE_LIST).unwrap();
    let port = find_free_port();
    let cfg = test_config(tmp.path(), port, "list.txt");

    tokio::spawn(async move {
        run_server(&cfg).await.unwrap();
    });
    wait_for_server(port).await;

    let base = format!("http://127.0.0.1:{}", port);
    let resp = reqwest::Client::new()
        .post(format!("{}/api/import", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    base
}

async fn products(base: &str, query: &str) -> Vec<Value> {
    reqwest::get(format!("{}/api/products{}", base, query))
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_health_and_static_files() {
    let tmp = TempDir::new().unwrap();
    let base = start_shop(&tmp).await;

    let health: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    let page = reqwest::get(format!("{}/index.html", base))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("Cartridges"));
}

#[tokio::test]
async fn test_import_report_and_listing() {
    let tmp = TempDir::new().unwrap();
    let base = start_shop(&tmp).await;

    let report: Value = reqwest::Client::new()
        .post(format!("{}/api/import", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["imported"], 3);
    assert_eq!(report["skipped"], 2);
    assert_eq!(report["dry_run"], false);

    let listed = products(&base, "").await;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["name"], "HP 44A Black Original LaserJet Toner () -");
    assert_eq!(listed[0]["price"], 250.0);
    assert_eq!(listed[0]["code"], "CF244A");
    assert_eq!(listed[0]["image"], "default.jpg");

    let all = products(&base, "?all=true").await;
    assert_eq!(all.len(), 3);
    assert_eq!(all[1]["name"], "Canon 445XL Black Ink");
    assert!(all[1]["price"].is_null());
    assert_eq!(all[1]["isQueryOnly"], true);

    let hits = products(&base, "?q=w1470x").await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["price"], 1250.0);
}

#[tokio::test]
async fn test_get_product_and_missing_product() {
    let tmp = TempDir::new().unwrap();
    let base = start_shop(&tmp).await;
    let id = products(&base, "").await[0]["id"].as_i64().unwrap();

    let one: Value = reqwest::get(format!("{}/api/products/{}", base, id))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(one["code"], "CF244A");

    let resp = reqwest::get(format!("{}/api/products/999999", base))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_place_order() {
    let tmp = TempDir::new().unwrap();
    let base = start_shop(&tmp).await;
    let id = products(&base, "").await[0]["id"].as_i64().unwrap();

    let resp = reqwest::Client::new()
        .post(format!("{}/api/orders", base))
        .json(&json!({
            "productId": id,
            "name": "Thandi Nkosi",
            "email": "thandi@example.com",
            "phone": "082 555 0101",
            "quantity": 3
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let receipt: Value = resp.json().await.unwrap();
    assert_eq!(receipt["order"]["total"], 750.0);
    assert_eq!(receipt["order"]["status"], "received");
    assert_eq!(receipt["admin_notified"], true);
    assert_eq!(receipt["customer_notified"], true);
}

#[tokio::test]
async fn test_order_rejections() {
    let tmp = TempDir::new().unwrap();
    let base = start_shop(&tmp).await;
    let all = products(&base, "?all=true").await;
    let priced = all[0]["id"].as_i64().unwrap();
    let unpriced = all[1]["id"].as_i64().unwrap();
    let client = reqwest::Client::new();

    let order = |product_id: i64, quantity: i64, email: &str| {
        json!({
            "productId": product_id,
            "customerName": "Thandi",
            "email": email,
            "quantity": quantity
        })
    };

    let cases = [
        (order(unpriced, 1, "t@example.com"), 409, "query_only"),
        (order(424242, 1, "t@example.com"), 404, "not_found"),
        (order(priced, 0, "t@example.com"), 400, "bad_request"),
        (order(priced, 1, "not-an-email"), 400, "bad_request"),
    ];
    for (body, status, code) in cases {
        let resp = client
            .post(format!("{}/api/orders", base))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), status, "body: {}", body);
        let err: Value = resp.json().await.unwrap();
        assert_eq!(err["error"]["code"], code);
    }

    let resp = client
        .post(format!("{}/api/orders", base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_submit_price_query() {
    let tmp = TempDir::new().unwrap();
    let base = start_shop(&tmp).await;
    let unpriced = products(&base, "?all=true").await[1]["id"].as_i64().unwrap();

    let resp = reqwest::Client::new()
        .post(format!("{}/api/queries", base))
        .json(&json!({
            "productId": unpriced,
            "customerName": "Sipho",
            "email": "sipho@example.com",
            "message": "Price for 2 units please"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let receipt: Value = resp.json().await.unwrap();
    assert_eq!(receipt["query"]["product_name"], "Canon 445XL Black Ink");
}

#[tokio::test]
async fn test_import_with_missing_source() {
    let tmp = TempDir::new().unwrap();
    let port = find_free_port();
    let cfg = test_config(tmp.path(), port, "does-not-exist.docx");
    tokio::spawn(async move {
        run_server(&cfg).await.unwrap();
    });
    wait_for_server(port).await;

    let resp = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{}/api/import", port))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "source_unavailable");
}
