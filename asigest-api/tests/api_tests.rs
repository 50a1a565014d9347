//! Integration tests for asigest-api endpoints
//!
//! Tests cover:
//! - Service status endpoints
//! - Master data CRUD (phase types, operators, machines) with uniqueness
//! - Work-order configurations and phases
//! - Technical documents and the event log
//! - ERP view
//! - Pagination and error mapping

mod helpers;

use axum::http::StatusCode;
use helpers::{delete, get, post, put, setup_app};
use serde_json::json;

// =============================================================================
// Service status
// =============================================================================

#[tokio::test]
async fn test_root_and_health() {
    let app = setup_app().await;

    let (status, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["app"], "ASI-GEST");
    assert_eq!(body["status"], "running");

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_buildinfo() {
    let app = setup_app().await;
    let (status, body) = get(&app, "/api/buildinfo").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["git_hash"].is_string());
    assert!(body["build_timestamp"].is_string());
    assert!(body["build_profile"].is_string());
}

// =============================================================================
// Phase types
// =============================================================================

#[tokio::test]
async fn test_phase_type_crud() {
    let app = setup_app().await;

    let (status, created) = post(
        &app,
        "/api/fasi-tipo",
        json!({"code": "PTH", "description": "Montaggio THT", "category": "PTH", "display_order": 2}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["active"], true);
    let id = created["phase_type_id"].as_i64().unwrap();

    let (status, body) = get(&app, &format!("/api/fasi-tipo/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], "PTH");

    let (status, body) = put(&app, &format!("/api/fasi-tipo/{}", id), json!({"description": "THT"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], "THT");
    assert!(body["updated_at"].is_string());

    // Soft delete returns the record
    let (status, body) = delete(&app, &format!("/api/fasi-tipo/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"], false);

    let (status, body) = get(&app, "/api/fasi-tipo?active=false").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn test_phase_type_duplicate_code_is_400() {
    let app = setup_app().await;
    let body = json!({"code": "SMD", "description": "SMD", "category": "SMD"});

    let (status, _) = post(&app, "/api/fasi-tipo", body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, error) = post(&app, "/api/fasi-tipo", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["error"]["message"].as_str().unwrap().contains("SMD"));
}

#[tokio::test]
async fn test_phase_type_list_order() {
    let app = setup_app().await;
    for (code, order) in [("C", 1), ("B", 2), ("A", 2)] {
        post(
            &app,
            "/api/fasi-tipo",
            json!({"code": code, "description": code, "category": "ALTRO", "display_order": order}),
        )
        .await;
    }

    let (_, body) = get(&app, "/api/fasi-tipo").await;
    let codes: Vec<_> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["code"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(codes, vec!["C", "A", "B"]);
}

#[tokio::test]
async fn test_missing_entities_are_404() {
    let app = setup_app().await;
    for uri in [
        "/api/fasi-tipo/99",
        "/api/utenti/99",
        "/api/macchine/99",
        "/api/config/99",
        "/api/fasi/99",
        "/api/lotti/99",
        "/api/log-eventi/99",
        "/api/documenti/99",
    ] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }
}

// =============================================================================
// Operators and machines
// =============================================================================

#[tokio::test]
async fn test_operator_username_rules() {
    let app = setup_app().await;

    let (status, _) = post(&app, "/api/utenti", json!({"username": "mr", "full_name": "Mario Rossi"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, created) = post(
        &app,
        "/api/utenti",
        json!({"username": "mrossi", "full_name": "Mario Rossi", "department": "SMD"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = post(&app, "/api/utenti", json!({"username": "mrossi", "full_name": "Altro"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = delete(&app, &format!("/api/utenti/{}", created["operator_id"])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"], false);
}

#[tokio::test]
async fn test_machine_filters() {
    let app = setup_app().await;
    post(&app, "/api/macchine", json!({"code": "PP-01", "department": "SMD"})).await;
    post(&app, "/api/macchine", json!({"code": "ONDA-1", "department": "PTH"})).await;

    let (status, body) = get(&app, "/api/macchine?department=PTH").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["code"], "ONDA-1");

    let (status, _) = post(&app, "/api/macchine", json!({"code": "PP-01", "department": "SMD"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Work-order configurations
// =============================================================================

#[tokio::test]
async fn test_config_defaults_and_duplicate() {
    let app = setup_app().await;

    let (status, config) = post(&app, "/api/config", json!({"erp_order_id": 1001})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(config["flag_smd"], true);
    assert_eq!(config["flag_pth"], false);
    assert_eq!(config["flag_inspection"], true);
    assert_eq!(config["flag_subcontractor"], false);
    assert_eq!(config["documentation_locked"], false);

    let (status, _) = post(&app, "/api/config", json!({"erp_order_id": 1001})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_config_missing_erp_order_is_400() {
    let app = setup_app().await;
    let (status, body) = post(&app, "/api/config", json!({"description": "senza commessa"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_config_update_and_soft_delete() {
    let app = setup_app().await;
    let (_, config) = post(&app, "/api/config", json!({"erp_order_id": 1001})).await;
    let uri = format!("/api/config/{}", config["config_id"]);

    let (status, body) = put(&app, &uri, json!({"documentation_locked": true, "modified_by": "ufficio"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["documentation_locked"], true);
    assert_eq!(body["modified_by"], "ufficio");

    let (status, body) = delete(&app, &uri).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (_, body) = get(&app, &uri).await;
    assert_eq!(body["active"], false);
}

#[tokio::test]
async fn test_config_detail_lists_phase_types() {
    let app = setup_app().await;
    helpers::create_phase(&app, 1001, 10).await;

    let (_, configs) = get(&app, "/api/config").await;
    let config_id = configs["items"][0]["config_id"].as_i64().unwrap();

    let (status, detail) = get(&app, &format!("/api/config/{}", config_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["erp_order_id"], 1001);
    assert_eq!(detail["phase_type_ids"].as_array().unwrap().len(), 1);
}

// =============================================================================
// Phases
// =============================================================================

#[tokio::test]
async fn test_phase_create_validation() {
    let app = setup_app().await;
    let (_, phase_type) = post(
        &app,
        "/api/fasi-tipo",
        json!({"code": "SMD", "description": "SMD", "category": "SMD"}),
    )
    .await;
    let (_, config) = post(&app, "/api/config", json!({"erp_order_id": 1001})).await;

    let (status, _) = post(
        &app,
        "/api/fasi",
        json!({"config_id": 404, "phase_type_id": phase_type["phase_type_id"], "order_number": "A", "quantity": 5}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post(
        &app,
        "/api/fasi",
        json!({"config_id": config["config_id"], "phase_type_id": 404, "order_number": "A", "quantity": 5}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = post(
        &app,
        "/api/fasi",
        json!({"config_id": config["config_id"], "phase_type_id": phase_type["phase_type_id"], "order_number": "A", "quantity": 0}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, phase) = post(
        &app,
        "/api/fasi",
        json!({"config_id": config["config_id"], "phase_type_id": phase_type["phase_type_id"], "order_number": "A", "quantity": 5}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(phase["state"], "APERTA");
    assert_eq!(phase["completed"], false);
    assert_eq!(phase["planned_qty"], 5);
    assert_eq!(phase["erp_order_id"], 1001);
}

#[tokio::test]
async fn test_phase_detail() {
    let app = setup_app().await;
    let phase_id = helpers::create_phase(&app, 1001, 10).await;

    let (status, detail) = get(&app, &format!("/api/fasi/{}", phase_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["phase_type_code"], "SMD-1001");
    assert_eq!(detail["phase_type_category"], "SMD");
    assert_eq!(detail["config_article_code"], "PCB-100");
    assert_eq!(detail["batch_count"], 0);
    assert_eq!(detail["total_output"], 0);
}

#[tokio::test]
async fn test_phase_list_filters() {
    let app = setup_app().await;
    let first = helpers::create_phase(&app, 1001, 10).await;
    helpers::create_phase(&app, 1002, 10).await;
    put(&app, &format!("/api/fasi/{}", first), json!({"completed": true})).await;

    let (_, body) = get(&app, "/api/fasi?completed=true").await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["phase_id"], first);

    let (_, body) = get(&app, "/api/fasi?erp_order_id=1002").await;
    assert_eq!(body["total"], 1);

    let (_, body) = get(&app, "/api/fasi?state=CHIUSA").await;
    assert_eq!(body["total"], 1);

    let (status, _) = get(&app, "/api/fasi?config_id=404").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app, "/api/fasi?state=FINITA").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_phase_conflicting_update_is_400() {
    let app = setup_app().await;
    let phase_id = helpers::create_phase(&app, 1001, 10).await;

    let (status, body) = put(
        &app,
        &format!("/api/fasi/{}", phase_id),
        json!({"completed": true, "state": "BLOCCATA"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_phase_block_and_resume() {
    let app = setup_app().await;
    let phase_id = helpers::create_phase(&app, 1001, 10).await;
    let uri = format!("/api/fasi/{}", phase_id);

    let (status, body) = put(&app, &uri, json!({"state": "BLOCCATA"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "BLOCCATA");

    // Blocked phases cannot be closed directly
    let (status, body) = put(&app, &uri, json!({"completed": true})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_STATE");

    let (status, body) = put(&app, &uri, json!({"state": "IN_CORSO"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "IN_CORSO");
}

// =============================================================================
// Technical documents
// =============================================================================

#[tokio::test]
async fn test_document_supersede_flow() {
    let app = setup_app().await;
    let doc = |rev: &str| {
        json!({"article_erp_id": 500, "doc_type": "DISEGNO", "revision": rev, "expires_on": "2027-06-30"})
    };

    let (status, rev_a) = post(&app, "/api/documenti", doc("A")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(rev_a["state"], "ATTIVO");
    assert_eq!(rev_a["expires_on"], "2027-06-30");

    let (status, _) = post(&app, "/api/documenti", doc("B")).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = get(&app, &format!("/api/documenti/{}", rev_a["document_id"])).await;
    assert_eq!(body["state"], "SUPERATO");

    let (status, _) = post(&app, "/api/documenti", doc("B")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = get(&app, "/api/documenti?article_erp_id=500&state=ATTIVO").await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["revision"], "B");
}

#[tokio::test]
async fn test_document_delete_marks_superseded() {
    let app = setup_app().await;
    let (_, doc) = post(
        &app,
        "/api/documenti",
        json!({"article_erp_id": 1, "doc_type": "CHECKLIST", "revision": "1"}),
    )
    .await;

    let (status, body) = delete(&app, &format!("/api/documenti/{}", doc["document_id"])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "SUPERATO");
}

// =============================================================================
// Event log
// =============================================================================

#[tokio::test]
async fn test_event_log_records_changes() {
    let app = setup_app().await;
    let phase_id = helpers::create_phase(&app, 1001, 10).await;

    let (status, body) = get(&app, "/api/log-eventi?kind=FASE_CREATA").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["entity"], "Fase");
    assert_eq!(body["items"][0]["entity_id"], phase_id);
    assert_eq!(body["items"][0]["actor"], "system");
    assert_eq!(body["items"][0]["severity"], "INFO");

    let event_id = body["items"][0]["event_id"].as_i64().unwrap();
    let (status, event) = get(&app, &format!("/api/log-eventi/{}", event_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(event["kind"], "FASE_CREATA");

    let (_, body) = get(&app, "/api/log-eventi?entity=ConfigCommessa").await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["kind"], "CONFIG_CREATA");
}

// =============================================================================
// Pagination
// =============================================================================

#[tokio::test]
async fn test_pagination_metadata() {
    let app = setup_app().await;
    for i in 0..5 {
        post(&app, "/api/macchine", json!({"code": format!("M{}", i), "department": "SMD"})).await;
    }

    let (status, body) = get(&app, "/api/macchine?page=2&page_size=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 5);
    assert_eq!(body["page"], 2);
    assert_eq!(body["page_size"], 2);
    assert_eq!(body["total_pages"], 3);
    assert_eq!(body["items"][0]["code"], "M2");

    let (_, body) = get(&app, "/api/macchine?page=9&page_size=2").await;
    assert_eq!(body["items"].as_array().unwrap().len(), 0);
    assert_eq!(body["total"], 5);
}

#[tokio::test]
async fn test_pagination_bounds_are_400() {
    let app = setup_app().await;
    for uri in [
        "/api/macchine?page=0",
        "/api/utenti?page_size=0",
        "/api/lotti?page_size=101",
        "/api/fasi?page=abc",
    ] {
        let (status, _) = get(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
    }
}

#[tokio::test]
async fn test_huge_page_is_400() {
    let app = setup_app().await;
    let (status, body) = get(&app, "/api/fasi-tipo?page=9223372036854775807").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_default_page_size() {
    let app = setup_app().await;
    let (_, body) = get(&app, "/api/fasi").await;
    assert_eq!(body["page"], 1);
    assert_eq!(body["page_size"], 50);
    assert_eq!(body["total_pages"], 0);
}

// =============================================================================
// ERP view
// =============================================================================

#[tokio::test]
async fn test_erp_open_orders() {
    let app = setup_app().await;
    let (status, body) = get(&app, "/api/gestionale/commesse").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["items"][0]["number"], 11);
    assert_eq!(body["items"][1]["customer_name"], "Elettronica Veneta");
}

#[tokio::test]
async fn test_erp_closed_orders_and_limit() {
    let app = setup_app().await;

    let (_, body) = get(&app, "/api/gestionale/commesse?aperte=false").await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["order_id"], 900);

    let (_, body) = get(&app, "/api/gestionale/commesse?limit=1").await;
    assert_eq!(body["total"], 1);

    let (status, _) = get(&app, "/api/gestionale/commesse?limit=501").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_erp_single_order() {
    let app = setup_app().await;

    let (status, body) = get(&app, "/api/gestionale/commesse/1001").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["customer_reference"], "PO-77");

    let (status, _) = get(&app, "/api/gestionale/commesse/1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_erp_article_and_customer_search() {
    let app = setup_app().await;

    let (_, body) = get(&app, "/api/gestionale/articoli?search=PCB").await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["items"][0]["code"], "PCB-100");

    let (_, body) = get(&app, "/api/gestionale/clienti?search=Veneta").await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["vat_number"], "01234567890");

    let long = "x".repeat(51);
    let (status, _) = get(&app, &format!("/api/gestionale/articoli?search={}", long)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
