use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, FromRef, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use civic_shared::{AuthorView, Forest, ReactionSummary, Thread};
use civic_store::{
    Category, CategoryCount, CategoryDailyCount, CategoryReport, DailyCount, NewComment,
    NewIssue, StatusCounts,
};

use crate::auth::{AuthUser, SessionToken};
use crate::config::ServerConfig;
use crate::db::Db;
use crate::error::ServerError;
use crate::facade::{
    author_view, comment_view, issue_views, load_issue_view, resolution_view, CommentView, IssueView,
    ResolutionView,
};
use crate::requests::{
    ApiJson, ClusterRequest, CreateCommentRequest, CreateIssueRequest, DeleteCommentRequest,
    FeedRequest, IssueAction, IssueRef, ProfileRequest, ReactionRequest, RespondRequest,
    UpdateIssueRequest,
};
use crate::workflow::{has_user_issues_in_cluster, Workflow};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub workflow: Workflow,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Db, config: ServerConfig) -> Self {
        Self {
            db,
            workflow: Workflow::from_config(&config),
            config: Arc::new(config),
        }
    }
}

impl FromRef<AppState> for Db {
    fn from_ref(state: &AppState) -> Db {
        state.db.clone()
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        // Sessions and users
        .route("/auth/logout", post(logout))
        .route("/users/profile", post(user_profile))
        .route("/categories", post(list_categories))
        // Issues
        .route(
            "/issues",
            post(list_issues).put(update_issue).delete(delete_issue),
        )
        .route("/issues/single", post(get_issue))
        .route("/issues/create", post(create_issue))
        .route("/issues/resolve", post(resolve_issue))
        .route("/issues/user", post(user_issues))
        .route("/issues/user/resolved", post(user_resolved_issues))
        // Resolution workflow
        .route("/issues/self-resolution", post(create_self_resolution))
        .route("/issues/external-resolution", post(create_external_resolution))
        .route("/issues/respond-resolution", post(respond_to_resolution))
        .route("/issues/resolutions", post(issue_resolutions))
        .route("/issues/user-issues-in-cluster", post(user_issues_in_cluster))
        // Reactions
        .route("/reactions", post(set_reaction))
        // Comments
        .route("/comments", post(list_comments).delete(delete_comment))
        .route("/comments/thread", post(comment_thread))
        .route("/comments/count", post(count_comments))
        .route("/comments/create", post(create_comment))
        // Reports
        .route("/reports/resolution-status", post(resolution_status_report))
        .route("/reports/category", post(category_report))
        .route("/reports/daily", post(daily_report))
        .route("/reports/category-totals", post(category_totals_report))
        .route("/reports/category-daily", post(category_daily_report))
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct Envelope<T> {
    code: u16,
    success: bool,
    data: T,
}

/// A successful response wrapped as `{code, success, data}`.
pub struct ApiResponse<T> {
    status: StatusCode,
    data: T,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            data,
        }
    }

    fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = Envelope {
            code: self.status.as_u16(),
            success: true,
            data: self.data,
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<ApiResponse<T>, ServerError>;

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ---------------------------------------------------------------------------
// Sessions and users
// ---------------------------------------------------------------------------

async fn logout(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    SessionToken(token): SessionToken,
) -> Result<StatusCode, ServerError> {
    state
        .db
        .run(move |db| Ok(db.delete_session(&token)?))
        .await?;
    info!(user = %user_id.short(), "signed out");
    Ok(StatusCode::NO_CONTENT)
}

/// Public profile block of a user.
async fn user_profile(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiJson(req): ApiJson<ProfileRequest>,
) -> ApiResult<AuthorView> {
    let profile = state
        .db
        .run(move |db| {
            let user = db
                .get_user(req.profile_user_id)
                .map_err(|e| ServerError::from_store("User", e))?;
            Ok(author_view(&user, false))
        })
        .await?;
    Ok(ApiResponse::ok(profile))
}

async fn list_categories(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
) -> ApiResult<Vec<Category>> {
    let categories = state.db.run(|db| Ok(db.list_categories()?)).await?;
    Ok(ApiResponse::ok(categories))
}

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

async fn list_issues(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    ApiJson(req): ApiJson<FeedRequest>,
) -> ApiResult<Vec<IssueView>> {
    let filter = req.into_filter(state.config.max_page_size);
    let views = state
        .db
        .run(move |db| {
            let records = db.list_issue_records(&filter)?;
            issue_views(db, records, viewer)
        })
        .await?;
    Ok(ApiResponse::ok(views))
}

async fn get_issue(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    ApiJson(req): ApiJson<IssueRef>,
) -> ApiResult<IssueView> {
    let view = state
        .db
        .run(move |db| load_issue_view(db, req.issue_id, viewer))
        .await?;
    Ok(ApiResponse::ok(view))
}

async fn create_issue(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<CreateIssueRequest>,
) -> ApiResult<IssueView> {
    let user_id = auth.acting_as(req.user_id)?;
    let (category_id, content) = req.validate()?;
    let content = content.to_string();

    let new = NewIssue {
        user_id,
        category_id,
        content,
        sentiment: req.sentiment,
        is_anonymous: req.is_anonymous,
        location: req.location_data.and_then(|l| l.into_new_location()),
    };

    let view = state
        .db
        .run(move |db| {
            let issue = db.create_issue(&new)?;
            load_issue_view(db, issue.issue_id, user_id)
        })
        .await?;

    info!(issue = %view.issue_id, anonymous = view.is_anonymous, "issue created");
    Ok(ApiResponse::created(view))
}

async fn update_issue(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<UpdateIssueRequest>,
) -> ApiResult<IssueView> {
    let user_id = auth.acting_as(req.user_id)?;
    let changes = req.validate()?;
    let issue_id = req.issue_id;

    let view = state
        .db
        .run(move |db| {
            db.update_issue(issue_id, user_id, &changes)
                .map_err(|e| ServerError::from_store("Issue", e))?;
            load_issue_view(db, issue_id, user_id)
        })
        .await?;
    Ok(ApiResponse::ok(view))
}

async fn delete_issue(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<IssueAction>,
) -> Result<StatusCode, ServerError> {
    let user_id = auth.acting_as(req.user_id)?;
    let issue_id = req.issue_id;
    state
        .db
        .run(move |db| {
            db.delete_issue(issue_id, user_id)
                .map_err(|e| ServerError::from_store("Issue", e))
        })
        .await?;

    info!(issue = %issue_id, "issue deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Author shortcut: self-resolve and return the updated issue.
async fn resolve_issue(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<IssueAction>,
) -> ApiResult<IssueView> {
    let user_id = auth.acting_as(req.user_id)?;
    let workflow = state.workflow;

    let view = state
        .db
        .run(move |db| {
            workflow.self_resolve(db, req.issue_id, user_id)?;
            load_issue_view(db, req.issue_id, user_id)
        })
        .await?;
    Ok(ApiResponse::ok(view))
}

async fn user_issues(
    state: State<AppState>,
    auth: AuthUser,
    req: ApiJson<ProfileRequest>,
) -> ApiResult<Vec<IssueView>> {
    profile_issues(state, auth, req, false).await
}

async fn user_resolved_issues(
    state: State<AppState>,
    auth: AuthUser,
    req: ApiJson<ProfileRequest>,
) -> ApiResult<Vec<IssueView>> {
    profile_issues(state, auth, req, true).await
}

/// A profile's issues.  Anonymous ones are only listed on the viewer's
/// own profile, since the listing itself would name their author.
async fn profile_issues(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    ApiJson(req): ApiJson<ProfileRequest>,
    resolved_only: bool,
) -> ApiResult<Vec<IssueView>> {
    let profile = req.profile_user_id;
    let views = state
        .db
        .run(move |db| {
            let records = db
                .list_user_issue_records(profile, resolved_only)?
                .into_iter()
                .filter(|r| !r.issue.is_anonymous || profile == viewer)
                .collect();
            issue_views(db, records, viewer)
        })
        .await?;
    Ok(ApiResponse::ok(views))
}

// ---------------------------------------------------------------------------
// Resolution workflow
// ---------------------------------------------------------------------------

async fn create_self_resolution(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<IssueAction>,
) -> ApiResult<ResolutionView> {
    let user_id = auth.acting_as(req.user_id)?;
    let workflow = state.workflow;

    let view = state
        .db
        .run(move |db| {
            let resolution = workflow.self_resolve(db, req.issue_id, user_id)?;
            let issue = db.get_issue(req.issue_id)?;
            Ok(resolution_view(resolution, &issue, user_id))
        })
        .await?;
    Ok(ApiResponse::created(view))
}

async fn create_external_resolution(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<IssueAction>,
) -> ApiResult<ResolutionView> {
    let user_id = auth.acting_as(req.user_id)?;
    let workflow = state.workflow;

    let view = state
        .db
        .run(move |db| {
            let resolution = workflow.propose_external(db, req.issue_id, user_id)?;
            let issue = db.get_issue(req.issue_id)?;
            Ok(resolution_view(resolution, &issue, user_id))
        })
        .await?;
    Ok(ApiResponse::created(view))
}

async fn respond_to_resolution(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<RespondRequest>,
) -> ApiResult<ResolutionView> {
    let user_id = auth.acting_as(req.user_id)?;
    let workflow = state.workflow;

    let view = state
        .db
        .run(move |db| {
            let resolution = workflow.respond(db, req.resolution_id, user_id, req.accept)?;
            let issue = db.get_issue(resolution.issue_id)?;
            Ok(resolution_view(resolution, &issue, user_id))
        })
        .await?;
    Ok(ApiResponse::ok(view))
}

async fn issue_resolutions(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    ApiJson(req): ApiJson<IssueRef>,
) -> ApiResult<Vec<ResolutionView>> {
    let views = state
        .db
        .run(move |db| {
            let issue = db
                .get_issue(req.issue_id)
                .map_err(|e| ServerError::from_store("Issue", e))?;
            Ok(db
                .resolutions_for_issue(req.issue_id)?
                .into_iter()
                .map(|r| resolution_view(r, &issue, viewer))
                .collect())
        })
        .await?;
    Ok(ApiResponse::ok(views))
}

async fn user_issues_in_cluster(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<ClusterRequest>,
) -> ApiResult<bool> {
    let user_id = auth.acting_as(req.user_id)?;
    let found = state
        .db
        .run(move |db| Ok(has_user_issues_in_cluster(db, user_id, req.category_id)))
        .await?;
    Ok(ApiResponse::ok(found))
}

// ---------------------------------------------------------------------------
// Reactions
// ---------------------------------------------------------------------------

async fn set_reaction(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<ReactionRequest>,
) -> ApiResult<ReactionSummary> {
    let user_id = auth.acting_as(req.user_id)?;
    let summary = state
        .db
        .run(move |db| {
            db.set_reaction(req.issue_id, user_id, req.kind)
                .map_err(|e| ServerError::from_store("Issue", e))
        })
        .await?;
    Ok(ApiResponse::ok(summary))
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

fn issue_comment_views(
    db: &civic_store::Database,
    req: &IssueRef,
    viewer: civic_shared::UserId,
) -> Result<Vec<CommentView>, ServerError> {
    db.get_issue(req.issue_id)
        .map_err(|e| ServerError::from_store("Issue", e))?;
    Ok(db
        .list_comment_records(req.issue_id)?
        .into_iter()
        .map(|r| comment_view(r, viewer))
        .collect())
}

async fn list_comments(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    ApiJson(req): ApiJson<IssueRef>,
) -> ApiResult<Vec<CommentView>> {
    let views = state
        .db
        .run(move |db| issue_comment_views(db, &req, viewer))
        .await?;
    Ok(ApiResponse::ok(views))
}

async fn comment_thread(
    State(state): State<AppState>,
    AuthUser(viewer): AuthUser,
    ApiJson(req): ApiJson<IssueRef>,
) -> ApiResult<Forest<CommentView>> {
    let views = state
        .db
        .run(move |db| issue_comment_views(db, &req, viewer))
        .await?;
    Ok(ApiResponse::ok(Thread::build(views).into_forest()))
}

async fn count_comments(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiJson(req): ApiJson<IssueRef>,
) -> ApiResult<i64> {
    let count = state
        .db
        .run(move |db| {
            db.get_issue(req.issue_id)
                .map_err(|e| ServerError::from_store("Issue", e))?;
            Ok(db.count_comments(req.issue_id)?)
        })
        .await?;
    Ok(ApiResponse::ok(count))
}

async fn create_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<CreateCommentRequest>,
) -> ApiResult<CommentView> {
    let user_id = auth.acting_as(req.user_id)?;
    req.validate()?;

    let new = NewComment {
        issue_id: req.issue_id,
        user_id,
        parent_id: req.parent_id,
        content: req.content,
        is_anonymous: req.is_anonymous,
    };

    let view = state
        .db
        .run(move |db| {
            let comment = db
                .create_comment(&new)
                .map_err(|e| ServerError::from_store("Issue", e))?;
            let record = db.get_comment_record(comment.comment_id)?;
            Ok(comment_view(record, user_id))
        })
        .await?;
    Ok(ApiResponse::created(view))
}

async fn delete_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<DeleteCommentRequest>,
) -> Result<StatusCode, ServerError> {
    let user_id = auth.acting_as(req.user_id)?;
    state
        .db
        .run(move |db| {
            db.delete_comment(req.comment_id, user_id)
                .map_err(|e| ServerError::from_store("Comment", e))
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

async fn resolution_status_report(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
) -> ApiResult<StatusCounts> {
    let counts = state
        .db
        .run(|db| Ok(db.resolution_status_counts()?))
        .await?;
    Ok(ApiResponse::ok(counts))
}

async fn category_report(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
) -> ApiResult<Vec<CategoryReport>> {
    let reports = state
        .db
        .run(|db| Ok(db.category_status_counts()?))
        .await?;
    Ok(ApiResponse::ok(reports))
}

async fn daily_report(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
) -> ApiResult<Vec<DailyCount>> {
    let days = state.db.run(|db| Ok(db.daily_issue_counts()?)).await?;
    Ok(ApiResponse::ok(days))
}

async fn category_totals_report(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
) -> ApiResult<Vec<CategoryCount>> {
    let totals = state.db.run(|db| Ok(db.category_issue_counts()?)).await?;
    Ok(ApiResponse::ok(totals))
}

async fn category_daily_report(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
) -> ApiResult<Vec<CategoryDailyCount>> {
    let cells = state.db.run(|db| Ok(db.category_daily_counts()?)).await?;
    Ok(ApiResponse::ok(cells))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
