mod common;

use api_lib::adapters::InMemoryStore;
use api_lib::web::router;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use common::{report, test_state, FakeMedia};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "huella-test-boundary";

struct TestApp {
    app: Router,
    store: Arc<InMemoryStore>,
    media: Arc<FakeMedia>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_media(FakeMedia::default())
    }

    fn with_media(media: FakeMedia) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let media = Arc::new(media);
        let app = router(test_state(store.clone(), media.clone()));
        Self { app, store, media }
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Option<String>, Value) {
        let response = self.app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, cookie, body)
    }

    async fn json(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Value,
    ) -> (StatusCode, Option<String>, Value) {
        let mut req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        self.send(req.body(Body::from(body.to_string())).unwrap()).await
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> (StatusCode, Value) {
        let mut req = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        let (status, _, body) = self.send(req.body(Body::empty()).unwrap()).await;
        (status, body)
    }

    async fn form(
        &self,
        method: Method,
        uri: &str,
        cookie: &str,
        fields: &[(&str, &str)],
        files: &[(&str, &str, &str)],
    ) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, cookie)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(fields, files)))
            .unwrap();
        let (status, _, body) = self.send(req).await;
        (status, body)
    }

    /// Signs up a user and returns their session cookie.
    async fn sign_up(&self, email: &str, first_name: &str) -> String {
        let (status, cookie, _) = self
            .json(
                Method::POST,
                "/auth/signup",
                None,
                json!({"email": email, "password": "secreto1", "firstName": first_name, "lastName": "Pérez"}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        cookie.expect("signup sets a session cookie")
    }
}

/// `files` are `(part name, file name, content type)` with a tiny fixed body.
fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str, &str)]) -> Vec<u8> {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            BOUNDARY, name, value
        ));
    }
    for (name, file_name, content_type) in files {
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\nIMAGEDATA\r\n",
            BOUNDARY, name, file_name, content_type
        ));
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));
    body.into_bytes()
}

fn lost_firulais() -> Vec<(&'static str, &'static str)> {
    vec![
        ("status", "perdida"),
        ("title", "Firulais"),
        ("city", "Bogotá"),
        ("contact", "555-1234"),
    ]
}

//=========================================================================================
// Accounts
//=========================================================================================

#[tokio::test]
async fn signup_creates_a_session() {
    let app = TestApp::new();
    let cookie = app.sign_up("ana@example.com", "Ana").await;

    let (status, body) = app.get("/auth/session", Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "ana@example.com");
    assert_eq!(body["displayName"], "Ana Pérez");
    assert_eq!(body["photoURL"], Value::Null);

    let (status, _) = app.get("/auth/session", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signup_rules() {
    let app = TestApp::new();
    app.sign_up("ana@example.com", "Ana").await;

    let (status, _, body) = app
        .json(
            Method::POST,
            "/auth/signup",
            None,
            json!({"email": "ANA@example.com", "password": "secreto1", "firstName": "Otra"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Este correo ya está registrado. Intenta iniciar sesión");

    let (status, _, body) = app
        .json(
            Method::POST,
            "/auth/signup",
            None,
            json!({"email": "leo@example.com", "password": "corta", "firstName": "Leo"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "La contraseña debe tener al menos 6 caracteres");

    let (status, _, body) = app
        .json(
            Method::POST,
            "/auth/signup",
            None,
            json!({"email": "leo@example.com", "password": "secreto1", "firstName": "  "}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Ingrese su nombre");
}

#[tokio::test]
async fn login_outcomes() {
    let app = TestApp::new();
    app.sign_up("ana@example.com", "Ana").await;

    let (status, _, body) = app
        .json(
            Method::POST,
            "/auth/login",
            None,
            json!({"email": "nadie@example.com", "password": "secreto1"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "account_not_found");
    assert_eq!(body["redirectTo"], "/signup?email=nadie%40example.com");

    let (status, _, body) = app
        .json(
            Method::POST,
            "/auth/login",
            None,
            json!({"email": "ana@example.com", "password": "otra-clave"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Contraseña incorrecta");

    let (status, cookie, body) = app
        .json(
            Method::POST,
            "/auth/login",
            None,
            json!({"email": "ana@example.com", "password": "secreto1", "redirectTo": "/reportes/nuevo"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["redirectTo"], "/reportes/nuevo");
    assert_eq!(body["user"]["firstName"], "Ana");
    let cookie = cookie.unwrap();

    let (status, cleared, _) = app.json(Method::POST, "/auth/logout", Some(&cookie), Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared.as_deref(), Some("session="));
    let (status, _) = app.get("/auth/session", Some(&cookie)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_edit_and_photo() {
    let app = TestApp::new();
    let cookie = app.sign_up("ana@example.com", "Ana").await;

    let (status, _, body) = app
        .json(Method::PUT, "/profile", Some(&cookie), json!({"firstName": "", "lastName": "Gómez"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "El nombre es requerido");

    let (status, _, body) = app
        .json(Method::PUT, "/profile", Some(&cookie), json!({"firstName": "Ana María", "lastName": "Gómez"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["displayName"], "Ana María Gómez");

    let (status, body) = app
        .form(Method::POST, "/profile/photo", &cookie, &[], &[("photo", "cv.pdf", "application/pdf")])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "El archivo debe ser una imagen");

    let (status, body) = app
        .form(Method::POST, "/profile/photo", &cookie, &[], &[("photo", "yo.jpg", "image/jpeg")])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["photoURL"], "https://img.test/1/yo.jpg");
}

//=========================================================================================
// Reports
//=========================================================================================

#[tokio::test]
async fn creates_a_lost_report_without_photos() {
    let app = TestApp::new();
    let cookie = app.sign_up("ana@example.com", "Ana").await;

    let (status, body) = app
        .form(Method::POST, "/reports", &cookie, &lost_firulais(), &[])
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["estado"], "perdida");
    assert_eq!(body["title"], "Firulais");
    assert_eq!(body["photoURLs"], json!([]));
    assert_eq!(body["authorName"], "Ana Pérez");
}

#[tokio::test]
async fn found_report_without_title_gets_one() {
    let app = TestApp::new();
    let cookie = app.sign_up("ana@example.com", "Ana").await;

    let (status, body) = app
        .form(
            Method::POST,
            "/reports",
            &cookie,
            &[
                ("estado", "encontrada"),
                ("city", "Medellín"),
                ("contact", "a@b.com"),
                ("foundDate", "2024-01-01"),
            ],
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["title"], "Mascota encontrada en Medellín");
    assert_eq!(body["foundDate"], "2024-01-01");
}

#[tokio::test]
async fn invalid_reports_never_reach_the_image_host() {
    let app = TestApp::new();
    let cookie = app.sign_up("ana@example.com", "Ana").await;

    let (status, body) = app
        .form(
            Method::POST,
            "/reports",
            &cookie,
            &[("status", "perdida"), ("city", "Bogotá"), ("contact", "555")],
            &[("photos", "a.jpg", "image/jpeg")],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "El nombre es requerido para mascotas perdidas");

    let five: Vec<_> = ["1.jpg", "2.jpg", "3.jpg", "4.jpg", "5.jpg"]
        .iter()
        .map(|name| ("photos", *name, "image/jpeg"))
        .collect();
    let (status, body) = app
        .form(Method::POST, "/reports", &cookie, &lost_firulais(), &five)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Máximo 4 imágenes por reporte");

    assert!(app.media.uploaded.lock().unwrap().is_empty());
}

#[tokio::test]
async fn photos_keep_their_order_through_create_and_edit() {
    let app = TestApp::new();
    let cookie = app.sign_up("ana@example.com", "Ana").await;

    let (status, created) = app
        .form(
            Method::POST,
            "/reports",
            &cookie,
            &lost_firulais(),
            &[("photos", "frente.jpg", "image/jpeg"), ("photos", "lado.png", "image/png")],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        created["photoURLs"],
        json!(["https://img.test/1/frente.jpg", "https://img.test/2/lado.png"])
    );

    // Keep the second, drop the first, add three more: 4 in total.
    let id = created["id"].as_str().unwrap();
    let mut fields = lost_firulais();
    fields.push(("keptPhotos", "https://img.test/2/lado.png"));
    let (status, edited) = app
        .form(
            Method::PUT,
            &format!("/reports/{}", id),
            &cookie,
            &fields,
            &[
                ("photos", "a.jpg", "image/jpeg"),
                ("photos", "b.jpg", "image/jpeg"),
                ("photos", "c.jpg", "image/jpeg"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        edited["photoURLs"],
        json!([
            "https://img.test/2/lado.png",
            "https://img.test/3/a.jpg",
            "https://img.test/4/b.jpg",
            "https://img.test/5/c.jpg"
        ])
    );
    assert!(edited["updatedAt"].is_string());

    // Kept + new over the limit is rejected before uploading.
    let mut fields = lost_firulais();
    fields.push(("keptPhotos", "https://img.test/2/lado.png"));
    fields.push(("keptPhotos", "https://img.test/3/a.jpg"));
    fields.push(("keptPhotos", "https://img.test/4/b.jpg"));
    fields.push(("keptPhotos", "https://img.test/5/c.jpg"));
    let (status, body) = app
        .form(
            Method::PUT,
            &format!("/reports/{}", id),
            &cookie,
            &fields,
            &[("photos", "d.jpg", "image/jpeg")],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Máximo 4 imágenes por reporte");
    assert_eq!(app.media.uploaded.lock().unwrap().len(), 5);
}

#[tokio::test]
async fn only_the_author_can_edit_or_delete() {
    let app = TestApp::new();
    let ana = app.sign_up("ana@example.com", "Ana").await;
    let leo = app.sign_up("leo@example.com", "Leo").await;

    let (_, created) = app.form(Method::POST, "/reports", &ana, &lost_firulais(), &[]).await;
    let uri = format!("/reports/{}", created["id"].as_str().unwrap());

    let mut fields = lost_firulais();
    fields[1] = ("title", "Robado");
    let (status, body) = app
        .form(Method::PUT, &uri, &leo, &fields, &[("photos", "x.jpg", "image/jpeg")])
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "No tienes permiso para editar este reporte");
    assert!(app.media.uploaded.lock().unwrap().is_empty());

    let (status, _, _) = app.json(Method::DELETE, &format!("{}?confirm=true", uri), Some(&leo), Value::Null).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = app.get(&uri, None).await;
    assert_eq!(body["title"], "Firulais");
}

#[tokio::test]
async fn delete_needs_confirmation() {
    let app = TestApp::new();
    let cookie = app.sign_up("ana@example.com", "Ana").await;
    let (_, created) = app.form(Method::POST, "/reports", &cookie, &lost_firulais(), &[]).await;
    let uri = format!("/reports/{}", created["id"].as_str().unwrap());

    let (status, _, body) = app.json(Method::DELETE, &uri, Some(&cookie), Value::Null).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Confirma la eliminación del reporte");

    let (status, _, _) = app
        .json(Method::DELETE, &format!("{}?confirm=true", uri), Some(&cookie), Value::Null)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Reporte no encontrado");
}

#[tokio::test]
async fn image_host_failure_is_a_bad_gateway() {
    let app = TestApp::with_media(FakeMedia {
        fail: true,
        ..FakeMedia::default()
    });
    let cookie = app.sign_up("ana@example.com", "Ana").await;
    let (status, body) = app
        .form(
            Method::POST,
            "/reports",
            &cookie,
            &lost_firulais(),
            &[("photos", "a.jpg", "image/jpeg")],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["message"], "Error al subir la foto");

    let (_, page) = app.get("/reports", None).await;
    assert_eq!(page["reports"], json!([]));
}

//=========================================================================================
// Feeds
//=========================================================================================

#[tokio::test]
async fn feed_pages_follow_the_cursor() {
    let app = TestApp::new();
    for (i, city) in ["Cali", "Cali", "Pasto", "Cali", "Cali", "Cali"].iter().enumerate() {
        app.store.insert_report(report(&format!("Perro {}", i), city, i as i64)).await;
    }

    let (status, first) = app.get("/reports?city=Cali&estado=", None).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<_> = first["reports"].as_array().unwrap().iter().map(|r| r["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["Perro 5", "Perro 4", "Perro 3"]);
    assert_eq!(first["hasMore"], true);

    let cursor = first["nextCursor"].as_str().unwrap();
    let (_, second) = app
        .get(&format!("/reports?city=Cali&after={}", cursor), None)
        .await;
    let titles: Vec<_> = second["reports"].as_array().unwrap().iter().map(|r| r["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["Perro 1", "Perro 0"]);
    assert_eq!(second["hasMore"], false);
    assert_eq!(second["nextCursor"], Value::Null);

    let (status, _) = app.get("/reports?status=adoptada", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn my_reports_are_scoped_to_the_caller() {
    let app = TestApp::new();
    let ana = app.sign_up("ana@example.com", "Ana").await;
    let leo = app.sign_up("leo@example.com", "Leo").await;
    app.form(Method::POST, "/reports", &ana, &lost_firulais(), &[]).await;
    let mut fields = lost_firulais();
    fields[1] = ("title", "Manchas");
    app.form(Method::POST, "/reports", &leo, &fields, &[]).await;

    let (status, mine) = app.get("/me/reports", Some(&leo)).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<_> = mine["reports"].as_array().unwrap().iter().map(|r| r["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["Manchas"]);

    let (status, _) = app.get("/me/reports", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
