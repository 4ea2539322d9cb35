//! In-process admin backend for integration tests (axum on 127.0.0.1:0).

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};

pub const PASSWORD: &str = "correct-horse";
pub const REFRESH_TOKEN: &str = "r1";

type Reply = std::result::Result<Json<Value>, (StatusCode, Json<Value>)>;

/// Shared backend state; tests keep a clone to steer and inspect it.
#[derive(Clone)]
pub struct Backend {
    accepted_access: Arc<Mutex<String>>,
    issued: Arc<AtomicUsize>,
    refresh_ok: Arc<AtomicBool>,
    reject_all: Arc<AtomicBool>,
    refresh_delay: Arc<Mutex<Duration>>,
    job_list_delays: Arc<Mutex<VecDeque<Duration>>>,
    role: Arc<Mutex<String>>,
    members: Arc<Mutex<Vec<Value>>>,
    jobs: Arc<Mutex<Vec<Value>>>,
    next_id: Arc<AtomicUsize>,
    pub requests: Arc<AtomicUsize>,
    pub refresh_calls: Arc<AtomicUsize>,
    pub member_list_calls: Arc<AtomicUsize>,
    pub job_list_calls: Arc<AtomicUsize>,
    pub unauthorized: Arc<AtomicUsize>,
}

impl Backend {
    fn new(role: &str) -> Self {
        Self {
            accepted_access: Arc::new(Mutex::new("a1".to_string())),
            issued: Arc::new(AtomicUsize::new(1)),
            refresh_ok: Arc::new(AtomicBool::new(true)),
            reject_all: Arc::new(AtomicBool::new(false)),
            refresh_delay: Arc::new(Mutex::new(Duration::ZERO)),
            job_list_delays: Arc::new(Mutex::new(VecDeque::new())),
            role: Arc::new(Mutex::new(role.to_string())),
            members: Arc::new(Mutex::new(vec![
                json!({"id": 1, "username": "root", "email": "root@boson.io", "role": "admin"}),
                json!({"id": 2, "username": "alice", "email": "alice@boson.io", "role": "editor"}),
                json!({"id": 3, "username": "bob", "email": "bob@boson.io", "role": "viewer"}),
            ])),
            jobs: Arc::new(Mutex::new(vec![job_json(10, "Product Designer", "private")])),
            next_id: Arc::new(AtomicUsize::new(100)),
            requests: Arc::new(AtomicUsize::new(0)),
            refresh_calls: Arc::new(AtomicUsize::new(0)),
            member_list_calls: Arc::new(AtomicUsize::new(0)),
            job_list_calls: Arc::new(AtomicUsize::new(0)),
            unauthorized: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Invalidate the current access token; the next refresh issues a new one.
    pub fn expire_access(&self) {
        *self.accepted_access.lock().expect("lock") = "revoked".to_string();
    }

    pub fn fail_refresh(&self) {
        self.refresh_ok.store(false, Ordering::SeqCst);
    }

    /// Answer every authenticated call with 401, even after a refresh.
    pub fn reject_all(&self) {
        self.reject_all.store(true, Ordering::SeqCst);
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.refresh_delay.lock().expect("lock") = delay;
    }

    /// Delays applied to successive `GET /jobs/` calls.
    pub fn queue_job_list_delays(&self, delays: &[Duration]) {
        self.job_list_delays
            .lock()
            .expect("lock")
            .extend(delays.iter().copied());
    }

    pub fn members(&self) -> Vec<Value> {
        self.members.lock().expect("lock").clone()
    }

    pub fn jobs(&self) -> Vec<Value> {
        self.jobs.lock().expect("lock").clone()
    }

    pub fn push_job(&self, job: Value) {
        self.jobs.lock().expect("lock").push(job);
    }

    pub fn drop_member(&self, id: u64) {
        self.members
            .lock()
            .expect("lock")
            .retain(|member| member["id"] != id);
    }

    fn check(&self, headers: &HeaderMap) -> std::result::Result<(), (StatusCode, Json<Value>)> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let expected = format!("Bearer {}", self.accepted_access.lock().expect("lock"));
        let presented = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok());
        if self.reject_all.load(Ordering::SeqCst) || presented != Some(expected.as_str()) {
            self.unauthorized.fetch_add(1, Ordering::SeqCst);
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({"detail": "token expired"})),
            ));
        }
        Ok(())
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) as u64
    }
}

pub fn job_json(id: u64, title: &str, status: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "category": "Design",
        "experience_required": 3,
        "last_date": "2026-12-01",
        "status": status,
        "location": "Remote",
        "timing": "Full time",
        "about": "Own the design system.",
        "responsibilities": ["Ship components"]
    })
}

fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({"detail": "not found"})))
}

async fn login(State(backend): State<Backend>, Json(body): Json<Value>) -> Reply {
    backend.requests.fetch_add(1, Ordering::SeqCst);
    if body["password"] != PASSWORD {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "invalid credentials"})),
        ));
    }
    let access = backend.accepted_access.lock().expect("lock").clone();
    Ok(Json(json!({
        "data": {"access_token": access, "refresh_token": REFRESH_TOKEN}
    })))
}

async fn refresh(State(backend): State<Backend>, Json(body): Json<Value>) -> Reply {
    backend.requests.fetch_add(1, Ordering::SeqCst);
    backend.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let delay = *backend.refresh_delay.lock().expect("lock");
    tokio::time::sleep(delay).await;
    if !backend.refresh_ok.load(Ordering::SeqCst) || body["refresh_token"] != REFRESH_TOKEN {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "refresh token invalid"})),
        ));
    }
    let n = backend.issued.fetch_add(1, Ordering::SeqCst) + 1;
    let access = format!("a{n}");
    *backend.accepted_access.lock().expect("lock") = access.clone();
    Ok(Json(json!({"access_token": access, "refresh_token": REFRESH_TOKEN})))
}

async fn current_user(State(backend): State<Backend>, headers: HeaderMap) -> Reply {
    backend.check(&headers)?;
    let role = backend.role.lock().expect("lock").clone();
    Ok(Json(json!({"data": {"username": "root", "role": role}})))
}

async fn list_members(State(backend): State<Backend>, headers: HeaderMap) -> Reply {
    backend.check(&headers)?;
    backend.member_list_calls.fetch_add(1, Ordering::SeqCst);
    Ok(Json(json!({"data": backend.members()})))
}

async fn create_member(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    backend.check(&headers)?;
    let member = json!({
        "id": backend.next_id(),
        "username": body["username"],
        "email": body["email"],
        "role": body["role"],
    });
    backend.members.lock().expect("lock").push(member.clone());
    Ok(Json(member))
}

async fn change_role(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path((id, role)): Path<(u64, String)>,
) -> Reply {
    backend.check(&headers)?;
    let mut members = backend.members.lock().expect("lock");
    let member = members
        .iter_mut()
        .find(|member| member["id"] == id)
        .ok_or_else(not_found)?;
    member["role"] = Value::String(role);
    Ok(Json(json!({"message": "role updated"})))
}

async fn remove_member(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Reply {
    backend.check(&headers)?;
    let mut members = backend.members.lock().expect("lock");
    let before = members.len();
    members.retain(|member| member["id"] != id);
    if members.len() == before {
        return Err(not_found());
    }
    Ok(Json(json!({"message": "member removed"})))
}

async fn list_jobs(State(backend): State<Backend>, headers: HeaderMap) -> Reply {
    backend.check(&headers)?;
    backend.job_list_calls.fetch_add(1, Ordering::SeqCst);
    // Snapshot before the delay so a slow call answers with older data.
    let snapshot = backend.jobs();
    let delay = backend.job_list_delays.lock().expect("lock").pop_front();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    Ok(Json(json!({"data": snapshot})))
}

async fn get_job(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Reply {
    backend.check(&headers)?;
    backend
        .jobs()
        .into_iter()
        .find(|job| job["id"] == id)
        .map(Json)
        .ok_or_else(not_found)
}

async fn create_job(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Reply {
    backend.check(&headers)?;
    body["id"] = json!(backend.next_id());
    backend.push_job(body.clone());
    Ok(Json(body))
}

async fn edit_job(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(mut body): Json<Value>,
) -> Reply {
    backend.check(&headers)?;
    body["id"] = json!(id);
    let mut jobs = backend.jobs.lock().expect("lock");
    let job = jobs
        .iter_mut()
        .find(|job| job["id"] == id)
        .ok_or_else(not_found)?;
    *job = body.clone();
    Ok(Json(body))
}

async fn change_status(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path((id, status)): Path<(u64, String)>,
) -> Reply {
    backend.check(&headers)?;
    let mut jobs = backend.jobs.lock().expect("lock");
    let job = jobs
        .iter_mut()
        .find(|job| job["id"] == id)
        .ok_or_else(not_found)?;
    job["status"] = Value::String(status);
    Ok(Json(json!({"message": "status updated"})))
}

async fn delete_job(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Reply {
    backend.check(&headers)?;
    let mut jobs = backend.jobs.lock().expect("lock");
    let before = jobs.len();
    jobs.retain(|job| job["id"] != id);
    if jobs.len() == before {
        return Err(not_found());
    }
    Ok(Json(json!({"message": "job deleted"})))
}

/// Start the backend with the current user holding `role`.
///
/// Returns `None` when the sandbox forbids binding a local socket.
pub async fn spawn_backend(role: &str) -> Result<Option<(String, Backend)>> {
    let backend = Backend::new(role);
    let api = Router::new()
        .route("/users/login/", post(login))
        .route("/users/refresh/", post(refresh))
        .route("/users/user/", get(current_user))
        .route("/members/", get(list_members))
        .route("/members/create/", post(create_member))
        .route("/members/{id}/change-role/{role}/", put(change_role))
        .route("/members/{id}/delete/", delete(remove_member))
        .route("/jobs/", get(list_jobs).post(create_job))
        .route("/jobs/{id}/", get(get_job))
        .route("/jobs/{id}/edit/", put(edit_job))
        .route("/jobs/{id}/status/{status}/", put(change_status))
        .route("/jobs/{id}/delete/", delete(delete_job))
        .with_state(backend.clone());
    let app = Router::new().nest("/api/v1", api);

    let listener = match tokio::net::TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
            eprintln!("skipping admin client tests: local socket bind is not permitted");
            return Ok(None);
        }
        Err(err) => return Err(err.into()),
    };
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(Some((format!("http://{addr}/api/v1"), backend)))
}
