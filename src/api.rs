use actix_web::cookie::Cookie;
use actix_web::error::JsonPayloadError;
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Local;
use serde::Deserialize;
use serde_json::json;

use crate::analytics::{self, HistoryEntry};
use crate::auth;
use crate::database::{Database, PredictionRecord, TeacherAccount, TeacherProfile};
use crate::error::AppError;
use crate::model::ModelCache;
use crate::predictor::{self, StudentFeatures};
use crate::session::{SessionStore, SESSION_COOKIE};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct PredictRequest {
    pub student_name: String,
    pub roll_number: String,
    #[serde(flatten)]
    pub features: StudentFeatures,
}

/// Registers every route. Expects `Database`, `SessionStore` and
/// `ModelCache` as app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .route("/health", web::get().to(health_check))
        .route("/register", web::post().to(register))
        .route("/login", web::post().to(login))
        .route("/logout", web::post().to(logout))
        .route("/profile", web::get().to(profile))
        .route("/dashboard", web::get().to(dashboard))
        .route("/predict", web::post().to(predict))
        .route("/history", web::get().to(history))
        .route("/model/info", web::get().to(model_info));
}

/// Malformed or incomplete JSON bodies get the same `{"error": ...}` shape
/// as every other rejection.
fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(err.to_string()).into()
}

fn current_teacher(req: &HttpRequest, sessions: &SessionStore) -> Result<TeacherAccount, AppError> {
    req.cookie(SESSION_COOKIE)
        .and_then(|cookie| sessions.current(cookie.value()))
        .ok_or(AppError::Unauthorized)
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().body("Teacher Result Predictor is running!")
}

async fn register(
    db: web::Data<Database>,
    web::Json(account): web::Json<TeacherAccount>,
) -> Result<HttpResponse, AppError> {
    let account = auth::register(&mut db.teachers(), account)?;
    tracing::info!(username = %account.username, "registered teacher");
    Ok(HttpResponse::Created().json(TeacherProfile::from(&account)))
}

async fn login(
    db: web::Data<Database>,
    sessions: web::Data<SessionStore>,
    web::Json(request): web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let account = auth::login(&db.teachers(), &request.username, &request.password).map_err(|err| {
        tracing::warn!(username = %request.username, "failed login");
        err
    })?;

    let profile = TeacherProfile::from(&account);
    let token = sessions.start(account);
    tracing::info!(username = %profile.username, "logged in");

    let cookie = Cookie::build(SESSION_COOKIE, token).path("/").http_only(true).finish();
    Ok(HttpResponse::Ok().cookie(cookie).json(profile))
}

async fn logout(req: HttpRequest, sessions: web::Data<SessionStore>) -> HttpResponse {
    if let Some(account) = req.cookie(SESSION_COOKIE).and_then(|cookie| sessions.end(cookie.value())) {
        tracing::info!(username = %account.username, "logged out");
    }

    let mut removal = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    removal.make_removal();
    HttpResponse::Ok().cookie(removal).json(json!({ "logged_out": true }))
}

async fn profile(req: HttpRequest, sessions: web::Data<SessionStore>) -> Result<HttpResponse, AppError> {
    let teacher = current_teacher(&req, &sessions)?;
    Ok(HttpResponse::Ok().json(TeacherProfile::from(&teacher)))
}

async fn dashboard(
    req: HttpRequest,
    db: web::Data<Database>,
    sessions: web::Data<SessionStore>,
) -> Result<HttpResponse, AppError> {
    let teacher = current_teacher(&req, &sessions)?;
    let records = db.predictions_for(&teacher.username);
    Ok(HttpResponse::Ok().json(analytics::dashboard(&records)))
}

async fn predict(
    req: HttpRequest,
    db: web::Data<Database>,
    sessions: web::Data<SessionStore>,
    cache: web::Data<ModelCache>,
    web::Json(request): web::Json<PredictRequest>,
) -> Result<HttpResponse, AppError> {
    let teacher = current_teacher(&req, &sessions)?;
    request.features.validate()?;

    let models = cache.get()?;
    let prediction = predictor::predict(&models, &request.features);

    let record = PredictionRecord::new(
        &teacher.username,
        request.student_name,
        request.roll_number,
        &prediction,
        Local::now().naive_local(),
    );
    let entry = HistoryEntry::from(&record);
    db.save_prediction(record)?;
    tracing::info!(
        teacher = %teacher.username,
        roll_number = %entry.roll_number,
        marks = entry.predicted_marks,
        result = %entry.result,
        "recorded prediction"
    );

    Ok(HttpResponse::Ok().json(entry))
}

async fn history(
    req: HttpRequest,
    db: web::Data<Database>,
    sessions: web::Data<SessionStore>,
) -> Result<HttpResponse, AppError> {
    let teacher = current_teacher(&req, &sessions)?;
    let records = db.predictions_for(&teacher.username);
    Ok(HttpResponse::Ok().json(analytics::history(&records)))
}

async fn model_info(cache: web::Data<ModelCache>) -> Result<HttpResponse, AppError> {
    let models = cache.get()?;
    Ok(HttpResponse::Ok().json(models.summary()))
}
