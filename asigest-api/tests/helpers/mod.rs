//! Shared helpers for asigest-api integration tests
//!
//! Each test gets a fresh in-memory operational store and a small ERP
//! fixture, both on single-connection pools.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tower::util::ServiceExt; // for `oneshot` method

use asigest_api::{build_router, AppState};

async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Should create in-memory database")
}

/// Operational store with the full schema
pub async fn setup_db() -> SqlitePool {
    let pool = memory_pool().await;
    asigest_common::db::create_schema(&pool)
        .await
        .expect("Should create schema");
    pool
}

/// ERP database with two open orders, one closed, customers and articles
pub async fn setup_erp() -> SqlitePool {
    let pool = memory_pool().await;
    for statement in [
        r#"CREATE TABLE ANAGRAFICACF (
            CODCONTO TEXT PRIMARY KEY, DSCCONTO1 TEXT NOT NULL, DSCCONTO2 TEXT,
            PARTITAIVA TEXT, CODFISCALE TEXT, INDIRIZZO TEXT, LOCALITA TEXT,
            PROVINCIA TEXT, CAP TEXT)"#,
        r#"CREATE TABLE AnagraficaCommesse (
            Progressivo INTEGER PRIMARY KEY, AnnoCom INTEGER NOT NULL, NumCom INTEGER NOT NULL,
            Riferimento TEXT, CliCommitt TEXT, Oggetto TEXT, DataEmissione TEXT,
            DataConsegnaContr TEXT, StatoCommessa INTEGER NOT NULL)"#,
        r#"CREATE TABLE ANAGRAFICAARTICOLI (
            CODICE TEXT PRIMARY KEY, DESCRIZIONE TEXT, ARTTIPOLOGIA TEXT)"#,
        "INSERT INTO ANAGRAFICACF (CODCONTO, DSCCONTO1, PARTITAIVA) VALUES ('C001', 'Elettronica Veneta', '01234567890')",
        "INSERT INTO ANAGRAFICACF (CODCONTO, DSCCONTO1) VALUES ('C002', 'Automazioni Srl')",
        "INSERT INTO AnagraficaCommesse VALUES (1001, 2025, 10, 'PO-77', 'C001', 'Schede I/O', '2025-01-10', '2025-03-01', 0)",
        "INSERT INTO AnagraficaCommesse VALUES (1002, 2025, 11, NULL, 'C002', 'Alimentatori', '2025-02-01', NULL, 0)",
        "INSERT INTO AnagraficaCommesse VALUES (900, 2024, 90, NULL, 'C001', 'Prototipi', NULL, NULL, 1)",
        "INSERT INTO ANAGRAFICAARTICOLI VALUES ('PCB-100', 'Scheda controllo', 'PF')",
        "INSERT INTO ANAGRAFICAARTICOLI VALUES ('PCB-200', 'Scheda potenza', 'PF')",
        "INSERT INTO ANAGRAFICAARTICOLI VALUES ('RES-10K', 'Resistenza 10k', 'MP')",
    ] {
        sqlx::query(statement)
            .execute(&pool)
            .await
            .expect("Should build ERP fixture");
    }
    pool
}

/// Router over fresh databases
pub async fn setup_app() -> Router {
    let state = AppState::new(setup_db().await, setup_erp().await);
    build_router(state, &["http://localhost:5173".to_string()])
}

/// Send one request; returns the status and the JSON body (Null when empty)
pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");

    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Should parse JSON")
    };
    (status, json)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, None).await
}

pub async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", uri, Some(body)).await
}

pub async fn put(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "PUT", uri, Some(body)).await
}

pub async fn delete(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, "DELETE", uri, None).await
}

/// Create a phase type, a configuration for `erp_order_id` and an APERTA
/// phase; returns the phase id
pub async fn create_phase(app: &Router, erp_order_id: i64, quantity: i64) -> i64 {
    let (status, phase_type) = post(
        app,
        "/api/fasi-tipo",
        serde_json::json!({
            "code": format!("SMD-{}", erp_order_id),
            "description": "Montaggio SMD",
            "category": "SMD"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, config) = post(
        app,
        "/api/config",
        serde_json::json!({ "erp_order_id": erp_order_id, "article_code": "PCB-100" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, phase) = post(
        app,
        "/api/fasi",
        serde_json::json!({
            "config_id": config["config_id"],
            "phase_type_id": phase_type["phase_type_id"],
            "order_number": format!("ORD-{}", erp_order_id),
            "quantity": quantity
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    phase["phase_id"].as_i64().unwrap()
}
