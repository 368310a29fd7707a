use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use base64::Engine;
use csvlite_server::{app, AppState};
use rusqlite::Connection;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "csvlite-test-boundary";
const DATA_URI_PREFIX: &str = "data:application/octet-stream;base64,";

fn setup_app(output_dir: &TempDir, max_upload_bytes: usize) -> axum::Router {
    app(AppState {
        output_dir: output_dir.path().to_str().unwrap().to_string(),
        max_upload_bytes,
    })
}

fn multipart_request(filename: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: text/csv\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .uri("/api/convert")
        .method("POST")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn decode_data_uri(json: &Value) -> Vec<u8> {
    let uri = json["data_uri"].as_str().unwrap();
    let encoded = uri
        .strip_prefix(DATA_URI_PREFIX)
        .expect("data uri should carry the octet-stream prefix");
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .unwrap()
}

fn open_decoded(dir: &TempDir, bytes: &[u8]) -> Connection {
    let path = dir.path().join("decoded.sqlite");
    std::fs::write(&path, bytes).unwrap();
    Connection::open(path).unwrap()
}

#[tokio::test]
async fn convert_returns_sqlite_data_uri() {
    let output_dir = TempDir::new().unwrap();
    let app = setup_app(&output_dir, 1024 * 1024);

    let response = app
        .oneshot(multipart_request(
            "people.csv",
            b"name,age\nAlice,30\nBob,25\n",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    assert_eq!(json["filename"], "people.sqlite");
    assert_eq!(json["table"], "input_table");
    assert_eq!(json["rows"], 2);
    assert_eq!(json["columns"][0]["name"], "name");
    assert_eq!(json["columns"][0]["type"], "TEXT");
    assert_eq!(json["columns"][1]["name"], "age");
    assert_eq!(json["columns"][1]["type"], "INTEGER");

    // The link payload is the database file itself.
    let decoded = decode_data_uri(&json);
    assert!(decoded.starts_with(b"SQLite format 3\0"));
    assert_eq!(json["size_bytes"], decoded.len() as u64);

    let scratch = TempDir::new().unwrap();
    let conn = open_decoded(&scratch, &decoded);
    let age: i64 = conn
        .query_row(
            "SELECT age FROM input_table WHERE name = 'Alice'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(age, 30);

    // The generated file is also kept in the output directory.
    assert!(output_dir.path().join("people.sqlite").exists());
}

#[tokio::test]
async fn reconverting_the_same_upload_replaces_rows() {
    let output_dir = TempDir::new().unwrap();

    for _ in 0..2 {
        let app = setup_app(&output_dir, 1024 * 1024);
        let response = app
            .oneshot(multipart_request("stock.csv", b"sku,count\nA,5\nB,8\n"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let conn = Connection::open(output_dir.path().join("stock.sqlite")).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM input_table", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 2, "replace, not append");
}

#[tokio::test]
async fn boolean_column_is_rejected_without_output() {
    let output_dir = TempDir::new().unwrap();
    let app = setup_app(&output_dir, 1024 * 1024);

    let response = app
        .oneshot(multipart_request(
            "flags.csv",
            b"name,active\nAlice,true\nBob,false\n",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = response_json(response).await;
    let message = json["error"].as_str().unwrap();
    assert!(message.contains("unsupported column type"));
    assert!(message.contains("active"));

    assert!(
        !output_dir.path().join("flags.sqlite").exists(),
        "a failed conversion must not leave an output file"
    );
}

#[tokio::test]
async fn header_only_csv_yields_a_zero_row_table() {
    let output_dir = TempDir::new().unwrap();
    let app = setup_app(&output_dir, 1024 * 1024);

    let response = app
        .oneshot(multipart_request("empty.csv", b"name,age\n"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    assert_eq!(json["rows"], 0);

    let scratch = TempDir::new().unwrap();
    let conn = open_decoded(&scratch, &decode_data_uri(&json));
    let columns: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM pragma_table_info('input_table')",
            [],
            |row| row.get(0),
        )
        .unwrap();
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM input_table", [], |row| row.get(0))
        .unwrap();
    assert_eq!(columns, 2);
    assert_eq!(rows, 0);
}

#[tokio::test]
async fn missing_file_field_is_rejected() {
    let output_dir = TempDir::new().unwrap();
    let app = setup_app(&output_dir, 1024 * 1024);

    let body = format!("--{BOUNDARY}--\r\n");
    let request = Request::builder()
        .uri("/api/convert")
        .method("POST")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = response_json(response).await;
    assert_eq!(json["error"], "no file provided");
}

#[tokio::test]
async fn non_csv_filename_is_rejected() {
    let output_dir = TempDir::new().unwrap();
    let app = setup_app(&output_dir, 1024 * 1024);

    let response = app
        .oneshot(multipart_request("data.txt", b"name,age\nAlice,30\n"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = response_json(response).await;
    assert!(json["error"].as_str().unwrap().contains(".csv"));
}

#[tokio::test]
async fn empty_upload_is_rejected() {
    let output_dir = TempDir::new().unwrap();
    let app = setup_app(&output_dir, 1024 * 1024);

    let response = app
        .oneshot(multipart_request("empty.csv", b""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = response_json(response).await;
    assert_eq!(json["error"], "uploaded file is empty");
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let output_dir = TempDir::new().unwrap();
    let app = setup_app(&output_dir, 16);

    let response = app
        .oneshot(multipart_request(
            "big.csv",
            b"name,age\nAlice,30\nBob,25\n",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = response_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("file too large"));
}

#[tokio::test]
async fn malformed_csv_is_rejected() {
    let output_dir = TempDir::new().unwrap();
    let app = setup_app(&output_dir, 1024 * 1024);

    let response = app
        .oneshot(multipart_request(
            "ragged.csv",
            b"name,age\nAlice,30,extra\n",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = response_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("csv"));
}
