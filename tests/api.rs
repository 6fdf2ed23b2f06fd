mod common;

use std::time::Duration;

use chrono::{Days, Local};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use common::TestServer;

struct Api {
    server: TestServer,
    client: Client,
}

impl Api {
    async fn start() -> Self {
        Self {
            server: TestServer::start().await,
            client: Client::new(),
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> (StatusCode, Value) {
        let response = request
            .bearer_auth(&self.server.admin_token)
            .send()
            .await
            .expect("send request");
        let status = response.status();
        let body = response.json().await.unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        self.send(self.client.get(self.server.url(&format!("/api/v1{path}"))))
            .await
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            self.client
                .post(self.server.url(&format!("/api/v1{path}")))
                .json(&body),
        )
        .await
    }

    async fn put(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            self.client
                .put(self.server.url(&format!("/api/v1{path}")))
                .json(&body),
        )
        .await
    }

    async fn delete(&self, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = self.client.delete(self.server.url(&format!("/api/v1{path}")));
        if let Some(body) = body {
            request = request.json(&body);
        }
        self.send(request).await
    }

    /// Registers an entity dated 2023-06-01 and returns its id.
    async fn create_entity(&self, kind: &str, name: &str) -> String {
        let (status, body) = self
            .post(
                "/entities",
                json!({"kind": kind, "name": name, "date": "2023-06-01"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().expect("entity id").to_string()
    }

    async fn anonymous(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.server.url(path))
            .send()
            .await
            .expect("send request")
    }
}

fn in_days(days: u64) -> String {
    let today = Local::now().date_naive();
    today
        .checked_add_days(Days::new(days))
        .expect("date in range")
        .to_string()
}

fn yesterday() -> String {
    let today = Local::now().date_naive();
    today
        .checked_sub_days(Days::new(1))
        .expect("date in range")
        .to_string()
}

#[tokio::test]
async fn test_health() {
    let api = Api::start().await;
    let response = api.anonymous("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_management_requires_admin_token() {
    let api = Api::start().await;
    let url = api.server.url("/api/v1/public-files");

    let missing = api.client.get(&url).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let forged = api
        .client
        .get(&url)
        .bearer_auth("labfiles_12345678_123456789012345678901234")
        .send()
        .await
        .unwrap();
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);
    let body: Value = forged.json().await.unwrap();
    assert_eq!(body["error"], "Invalid token");

    let (status, body) = api.get("/public-files").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_entity_name_conflict() {
    let api = Api::start().await;
    api.create_entity("sample", "Sample42").await;

    let (status, _) = api
        .post(
            "/entities",
            json!({"kind": "sample", "name": "Sample42", "date": "2024-01-01"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = api
        .post(
            "/entities",
            json!({"kind": "sample", "name": "../escape", "date": "2024-01-01"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_files_and_folders() {
    let api = Api::start().await;
    let id = api.create_entity("sample", "Sample42").await;
    let home = api.server.write("home/samples/2023/Sample42/R1.fastq", "r1");
    let archived = api.server.write("archive/samples/2023/Sample42/R2.fastq", "r2");
    api.server.write("home/samples/2023/Sample42/.deleted", "");

    let (status, body) = api.get(&format!("/samples/{id}/files")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let files = body["data"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["path"], home.to_string_lossy().as_ref());
    assert_eq!(files[0]["filename"], "R1.fastq");
    assert_eq!(files[0]["public"], false);
    assert_eq!(files[1]["path"], archived.to_string_lossy().as_ref());

    let (status, body) = api.get(&format!("/samples/{id}/folders?unix=true")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!([
            "smb://lanaseq01/home/samples/2023/Sample42",
            "smb://lanaseq01/archive/samples/2023/Sample42"
        ])
    );

    let (status, _) = api.get("/samples/unknown/files").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = api.get(&format!("/widgets/{id}/files")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_public_file_lifecycle() {
    let api = Api::start().await;
    let id = api.create_entity("dataset", "DsA").await;
    let file = api.server.write("home/datasets/2023/DsA/cov.bw", "coverage");

    let (status, body) = api
        .post(
            &format!("/datasets/{id}/public-files"),
            json!({"path": file, "expiry_date": in_days(10)}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["path"], "cov.bw");
    assert_eq!(
        body["data"]["url"],
        "https://lanaseq.example.org/dataset-file/DsA/cov.bw"
    );

    let response = api.anonymous("/dataset-file/DsA/cov.bw").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "coverage");

    let (_, body) = api.get(&format!("/datasets/{id}/files")).await;
    assert_eq!(body["data"][0]["public"], true);
    let (_, body) = api.get("/public-files").await;
    assert_eq!(body["data"][0]["entity_name"], "DsA");

    let (status, body) = api
        .delete(
            &format!("/datasets/{id}/public-files"),
            Some(json!({"path": file})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["revoked"], true);

    let response = api.anonymous("/dataset-file/DsA/cov.bw").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_public_file_denials_look_alike() {
    let api = Api::start().await;
    let id = api.create_entity("dataset", "DsA").await;
    let expired = api.server.write("home/datasets/2023/DsA/old.bw", "old");
    api.server.write("home/datasets/2023/DsA/private.bw", "private");
    let (status, _) = api
        .post(
            &format!("/datasets/{id}/public-files"),
            json!({"path": expired, "expiry_date": yesterday()}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    for path in [
        "/dataset-file/DsA/old.bw",
        "/dataset-file/DsA/private.bw",
        "/dataset-file/Unknown/old.bw",
        "/sample-file/DsA/old.bw",
    ] {
        let response = api.anonymous(path).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{path}");
        assert!(response.text().await.unwrap().is_empty(), "{path}");
    }

    let (_, body) = api.get("/public-files").await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_rename_moves_folders() {
    let api = Api::start().await;
    let id = api.create_entity("sample", "Sample42").await;
    api.server.write("home/samples/2023/Sample42/Sample42_R1.fastq", "r1");
    api.server.write("archive/samples/2023/Sample42/notes.txt", "n");

    let (status, body) = api
        .put(&format!("/samples/{id}"), json!({"name": "Sample43"}))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["entity"]["name"], "Sample43");
    let drives = body["data"]["drives"].as_array().unwrap();
    assert_eq!(drives[0]["drive"], "home");
    assert_eq!(drives[0]["outcome"], "moved");
    assert_eq!(drives[1]["outcome"], "moved");

    let root = api.server.root();
    assert!(root.join("home/samples/2023/Sample43/Sample43_R1.fastq").is_file());
    assert!(root.join("archive/samples/2023/Sample43/notes.txt").is_file());
    assert!(!root.join("home/samples/2023/Sample42").exists());

    let (status, body) = api
        .put(&format!("/samples/{id}"), json!({"name": "Sample43"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        body["data"]["drives"]
            .as_array()
            .unwrap()
            .iter()
            .all(|d| d["outcome"] == "skipped")
    );
}

#[tokio::test]
async fn test_delete_file_is_logged() {
    let api = Api::start().await;
    let id = api.create_entity("sample", "Sample42").await;
    api.server.write("home/samples/2023/Sample42/old.txt", "old");
    api.server.write("home/samples/2023/Sample42/keep.txt", "keep");

    let (status, body) = api
        .delete(&format!("/samples/{id}/files/old.txt"), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["filename"], "old.txt");

    let (_, body) = api.get(&format!("/samples/{id}/files")).await;
    let files = body["data"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["filename"], "keep.txt");

    let (_, body) = api.get(&format!("/samples/{id}/deleted-files")).await;
    assert_eq!(body["data"][0]["filename"], "old.txt");

    let (status, _) = api
        .delete(&format!("/samples/{id}/files/old.txt"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ingest_staged_uploads() {
    let api = Api::start().await;
    let id = api.create_entity("sample", "Sample42").await;
    api.server.write("upload/Sample42_R1.fastq", "r1");
    api.server.write("upload/samples/Sample42/Sample42_R2.fastq", "r2");
    api.server.write("upload/Other_R1.fastq", "other");

    let (status, body) = api.get(&format!("/samples/{id}/upload-files")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = api.post(&format!("/samples/{id}/ingest"), json!({})).await;
    assert_eq!(status, StatusCode::ACCEPTED, "{body}");
    assert_eq!(body["data"]["staged"], 2);

    let home = api.server.root().join("home/samples/2023/Sample42");
    let mut done = false;
    for _ in 0..50 {
        if home.join("Sample42_R1.fastq").is_file() && home.join("Sample42_R2.fastq").is_file() {
            done = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(done, "staged files were not ingested");
    assert!(!api.server.root().join("upload/Sample42_R1.fastq").exists());
    assert!(api.server.root().join("upload/Other_R1.fastq").exists());
}

#[tokio::test]
async fn test_prepare_analysis() {
    let api = Api::start().await;
    let id = api.create_entity("sample", "Sample42").await;
    api.server.write("home/samples/2023/Sample42/R1.fastq", "r1");

    let (status, body) = api
        .post("/analysis", json!({"kind": "sample", "ids": [id]}))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let folder = api.server.root().join("analysis/Sample42");
    assert_eq!(body["data"]["folder"], folder.to_string_lossy().as_ref());
    assert!(folder.join("R1.fastq").is_file());
    assert_eq!(
        std::fs::read_to_string(folder.join("samples.txt")).unwrap(),
        "#sample\nSample42\n"
    );
}

#[tokio::test]
async fn test_delete_entity_removes_folders() {
    let api = Api::start().await;
    let id = api.create_entity("sample", "Sample42").await;
    api.server.write("home/samples/2023/Sample42/R1.fastq", "r1");
    api.server.write("archive/samples/2023/Sample42/R2.fastq", "r2");

    let (status, _) = api.delete(&format!("/samples/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let root = api.server.root();
    assert!(!root.join("home/samples/2023/Sample42").exists());
    assert!(!root.join("archive/samples/2023/Sample42").exists());
    let (status, _) = api.get(&format!("/samples/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
