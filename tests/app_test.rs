#![cfg(feature = "web")]

mod common;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use financecontrol::app::{AppState, router};
use financecontrol::auth::AuthService;
use financecontrol::seed::{ADMIN_EMAIL, ADMIN_PASSWORD};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    app: Router,
    state: Arc<AppState>,
    snapshot: PathBuf,
    _dir: TempDir,
}

fn test_app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let mut auth = AuthService::new(dir.path());
    auth.seed_admin().unwrap();
    let snapshot = dir.path().join("store.bin.gz");
    let state = Arc::new(AppState::new(
        common::seeded_store(),
        auth,
        common::generator(),
        snapshot.clone(),
    ));
    TestApp {
        app: router(state.clone()),
        state,
        snapshot,
        _dir: dir,
    }
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Vec<(String, String)>, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response
        .headers()
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
        .collect();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, bytes.to_vec())
}

fn json_of(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Logs in and returns the `session=<token>` cookie pair
async fn login(app: &Router, email: &str, password: &str) -> String {
    let (status, headers, _) = send(
        app,
        "POST",
        "/api/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let set_cookie = header_value(&headers, "set-cookie").expect("session cookie");
    set_cookie.split(';').next().unwrap().to_string()
}

/// Creates an employee with password "segredo1" and returns the user JSON
async fn create_user(app: &Router, admin: &str, nome: &str, email: &str) -> Value {
    let form = serde_json::to_value(common::usuario_form(nome, email, 4, 2)).unwrap();
    let (status, _, body) = send(app, "POST", "/api/usuarios", Some(admin), Some(form)).await;
    assert_eq!(status, StatusCode::CREATED);
    json_of(&body)
}

#[tokio::test]
async fn requests_without_session_are_unauthorized() {
    let t = test_app();
    let (status, _, body) = send(&t.app, "GET", "/api/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json_of(&body)["error"], "Sessão inválida ou expirada");

    let (status, _, _) =
        send(&t.app, "GET", "/api/facturas", Some("session=bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_and_logout() {
    let t = test_app();
    let (status, _, body) = send(
        &t.app,
        "POST",
        "/api/login",
        None,
        Some(json!({ "email": ADMIN_EMAIL, "password": "errada" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json_of(&body)["error"], "Email ou senha inválidos");

    let cookie = login(&t.app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    assert!(cookie.starts_with("session="));

    let (status, _, body) = send(&t.app, "GET", "/api/me", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body)["email"], ADMIN_EMAIL);

    let (status, _, body) = send(&t.app, "GET", "/api/nav", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body).as_array().unwrap().len(), 6);

    let (status, _, _) = send(&t.app, "POST", "/api/logout", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = send(&t.app, "GET", "/api/me", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    println!("✓ Session lifecycle works");
}

#[tokio::test]
async fn invoice_list_keeps_table_state_per_session() {
    let t = test_app();
    let cookie = login(&t.app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let (status, _, body) = send(
        &t.app,
        "GET",
        "/api/facturas?sort=valor&per_page=10",
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let page = json_of(&body);
    assert_eq!(page["total_items"], 40);
    assert_eq!(page["total_pages"], 4);
    assert_eq!(page["paginated_data"].as_array().unwrap().len(), 10);
    assert_eq!(page["sort_config"]["direction"], "ascending");
    let valores: Vec<f64> = page["paginated_data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["valor"].as_f64().unwrap())
        .collect();
    assert!(valores.windows(2).all(|w| w[0] <= w[1]));
    assert!(page["valor_total"].as_f64().unwrap() > 0.0);

    // same key again flips the direction; per_page and search persist
    let (_, _, body) =
        send(&t.app, "GET", "/api/facturas?sort=valor&page=2", Some(&cookie), None).await;
    let page = json_of(&body);
    assert_eq!(page["sort_config"]["direction"], "descending");
    assert_eq!(page["current_page"], 2);
    assert_eq!(page["items_per_page"], 10);

    let (_, _, body) = send(
        &t.app,
        "GET",
        "/api/facturas?search=zzzz-sem-resultados",
        Some(&cookie),
        None,
    )
    .await;
    let page = json_of(&body);
    assert_eq!(page["total_items"], 0);
    assert_eq!(page["valor_total"], 0.0);
}

#[tokio::test]
async fn invoice_crud_and_errors() {
    let t = test_app();
    let cookie = login(&t.app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let form = serde_json::to_value(common::factura_form("FAT-API0001")).unwrap();

    let (status, _, body) =
        send(&t.app, "POST", "/api/facturas", Some(&cookie), Some(form.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let created = json_of(&body);
    assert_eq!(created["numero_factura"], "FAT-API0001");
    let id = created["id"].as_u64().unwrap();

    let (status, _, body) = send(&t.app, "POST", "/api/facturas", Some(&cookie), Some(form)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_of(&body)["error"], "Este número de fatura já existe.");

    let mut invalid = common::factura_form("FAT-API0002");
    invalid.fornecedor.clear();
    let (status, _, body) = send(
        &t.app,
        "POST",
        "/api/facturas",
        Some(&cookie),
        Some(serde_json::to_value(invalid).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_of(&body)["errors"][0]["field"], "fornecedor");

    let (status, _, body) = send(
        &t.app,
        "POST",
        &format!("/api/facturas/{}/status", id),
        Some(&cookie),
        Some(json!({ "status_id": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json_of(&body)["data_aprovacao"].is_string());

    let (_, _, body) = send(&t.app, "GET", "/api/notifications", Some(&cookie), None).await;
    let notifications = json_of(&body);
    assert_eq!(notifications.as_array().unwrap().len(), 2);
    assert_eq!(notifications[1]["title"], "Nova Fatura Submetida");

    let uri = format!("/api/facturas/{}", id);
    let (status, _, _) = send(&t.app, "DELETE", &uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _, _) = send(&t.app, "GET", &uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn employees_only_reach_their_own_screens() {
    let t = test_app();
    let admin = login(&t.app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    create_user(&t.app, &admin, "Rosa Neto", "rosa@empresa.com").await;

    let rosa = login(&t.app, "rosa@empresa.com", "segredo1").await;
    let (_, _, body) = send(&t.app, "GET", "/api/nav", Some(&rosa), None).await;
    let labels: Vec<String> = json_of(&body)
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["label"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(labels, vec!["Dashboard", "Faturas"]);

    let (_, _, body) = send(&t.app, "GET", "/api/facturas", Some(&rosa), None).await;
    assert_eq!(json_of(&body)["total_items"], 0);

    let form = serde_json::to_value(common::factura_form("FAT-ROSA01")).unwrap();
    let (status, _, _) = send(&t.app, "POST", "/api/facturas", Some(&rosa), Some(form)).await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, _, body) = send(&t.app, "GET", "/api/facturas", Some(&rosa), None).await;
    assert_eq!(json_of(&body)["total_items"], 1);

    let categoria = json!({ "nome": "Viagens", "codigo": "VIAG", "ativo": true });
    let (status, _, _) =
        send(&t.app, "POST", "/api/categorias", Some(&rosa), Some(categoria)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _, _) = send(&t.app, "GET", "/api/reports/years", Some(&rosa), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _, _) =
        send(&t.app, "GET", "/api/export/facturas.csv", Some(&rosa), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _, _) = send(&t.app, "POST", "/api/save", Some(&rosa), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn csv_export_follows_the_session_list() {
    let t = test_app();
    let cookie = login(&t.app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let (_, _, body) = send(
        &t.app,
        "GET",
        "/api/facturas?search=tecnologia&per_page=5",
        Some(&cookie),
        None,
    )
    .await;
    let total = json_of(&body)["total_items"].as_u64().unwrap() as usize;
    assert!(total > 0);

    let (status, headers, body) =
        send(&t.app, "GET", "/api/export/facturas.csv", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(header_value(&headers, "content-type").unwrap().starts_with("text/csv"));
    assert!(header_value(&headers, "content-disposition").unwrap().contains("faturas.csv"));

    let csv = String::from_utf8(body).unwrap();
    assert!(csv.starts_with("Nº Factura,Fornecedor"));
    // the whole filtered list, not only the visible page
    assert_eq!(csv.lines().count(), total + 1);
}

#[tokio::test]
async fn reports_and_snapshot() {
    let t = test_app();
    let cookie = login(&t.app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let (status, _, body) = send(&t.app, "GET", "/api/dashboard", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    let kpi = json_of(&body);
    assert_eq!(kpi["total_facturas"], 40);
    assert_eq!(kpi["evolucao_mensal"].as_array().unwrap().len(), 6);

    let (_, _, body) =
        send(&t.app, "GET", "/api/reports/monthly?year=2025", Some(&cookie), None).await;
    let monthly = json_of(&body);
    assert_eq!(monthly["year"], 2025);
    assert_eq!(monthly["months"].as_array().unwrap().len(), 12);

    let (_, _, body) = send(&t.app, "GET", "/api/reports/status", Some(&cookie), None).await;
    let total: u64 = json_of(&body)
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["value"].as_u64().unwrap())
        .sum();
    assert_eq!(total, 40);

    let (status, _, _) = send(&t.app, "POST", "/api/save", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(t.snapshot.exists());
}

fn conversation_ids(list: &Value) -> Vec<u64> {
    list["conversations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_u64().unwrap())
        .collect()
}

#[tokio::test]
async fn conversations_are_private_to_each_user() {
    let t = test_app();
    let admin = login(&t.app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let rosa_id = create_user(&t.app, &admin, "Rosa Neto", "rosa@empresa.com").await["id"]
        .as_u64()
        .unwrap();
    let rosa = login(&t.app, "rosa@empresa.com", "segredo1").await;

    let (status, _, body) = send(&t.app, "GET", "/api/conversations", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let admin_list = json_of(&body);
    let first = conversation_ids(&admin_list)[0];
    let admin_messages = admin_list["conversations"][0]["messages"].as_array().unwrap().len();

    let (_, _, body) = send(&t.app, "GET", "/api/conversations", Some(&rosa), None).await;
    let rosa_list = json_of(&body);
    for c in rosa_list["conversations"].as_array().unwrap() {
        let participants: Vec<u64> = c["participant_ids"]
            .as_array()
            .unwrap()
            .iter()
            .map(|id| id.as_u64().unwrap())
            .collect();
        assert!(participants.contains(&rosa_id));
    }

    // same id, but it resolves inside Rosa's own inbox
    let message = json!({ "content": "Bom dia" });
    let (status, _, _) = send(
        &t.app,
        "POST",
        &format!("/api/conversations/{}/messages", first),
        Some(&rosa),
        Some(message),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, _, body) = send(&t.app, "GET", "/api/conversations", Some(&admin), None).await;
    let after = json_of(&body);
    assert_eq!(conversation_ids(&after), conversation_ids(&admin_list));
    assert_eq!(after["conversations"][0]["messages"].as_array().unwrap().len(), admin_messages);

    let (status, _, _) =
        send(&t.app, "POST", "/api/conversations/999/read", Some(&rosa), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    println!("✓ Inboxes are kept apart");
}

#[tokio::test]
async fn deleting_users_needs_edit_permission() {
    let t = test_app();
    let admin = login(&t.app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let rosa_user = create_user(&t.app, &admin, "Rosa Neto", "rosa@empresa.com").await;
    let marta_id = create_user(&t.app, &admin, "Marta Lopes", "marta@empresa.com").await["id"]
        .as_u64()
        .unwrap();
    let rosa = login(&t.app, "rosa@empresa.com", "segredo1").await;
    let uri = format!("/api/usuarios/{}", marta_id);

    let (status, _, _) = send(&t.app, "DELETE", &uri, Some(&rosa), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let mut permissoes = rosa_user["nivel_acesso"]["permissoes"].clone();
    permissoes["usuarios"]["criar"] = json!(false);
    permissoes["usuarios"]["editar"] = json!(true);
    permissoes["usuarios"]["visualizar"] = json!("todos");
    let (status, _, _) = send(
        &t.app,
        "PUT",
        &format!("/api/usuarios/{}/permissoes", rosa_user["id"]),
        Some(&admin),
        Some(permissoes),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(&t.app, "DELETE", &uri, Some(&rosa), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _, _) = send(&t.app, "DELETE", &uri, Some(&rosa), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_state_goes_away_with_the_session() {
    let t = test_app();
    let admin = login(&t.app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    create_user(&t.app, &admin, "Rosa Neto", "rosa@empresa.com").await;
    let rosa = login(&t.app, "rosa@empresa.com", "segredo1").await;
    let (_, _, body) = send(&t.app, "GET", "/api/me", Some(&rosa), None).await;
    let rosa_id = json_of(&body)["id"].as_u64().unwrap();

    send(&t.app, "GET", "/api/facturas", Some(&admin), None).await;
    send(&t.app, "GET", "/api/facturas", Some(&rosa), None).await;
    send(&t.app, "GET", "/api/categorias", Some(&admin), None).await;
    assert_eq!(t.state.open_tables(), 3);

    let (status, _, _) =
        send(&t.app, "DELETE", &format!("/api/usuarios/{}", rosa_id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(t.state.open_tables(), 2);

    send(&t.app, "POST", "/api/logout", Some(&admin), None).await;
    assert_eq!(t.state.open_tables(), 0);
}
