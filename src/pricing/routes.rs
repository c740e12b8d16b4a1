//! HTTP handlers for quotes and the catalog

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use uuid::Uuid;

use crate::cache::CacheStats;
use crate::error::Result;
use crate::AppState;

use super::requests::{
    CreatePlanRequest, CreateQuoteRequest, CreateServiceRequest, LineItemRequest,
    UpdateLineItemRequest, UpdatePlanRequest, UpdateQuoteRequest, UpdateServiceRequest,
};
use super::responses::{
    CreatedResponse, PlanResponse, QuoteOptionsResponse, QuoteResponse, QuoteSummaryResponse,
    ServiceResponse,
};

type Body<T> = std::result::Result<Json<T>, JsonRejection>;
type Params<T> = std::result::Result<Path<T>, PathRejection>;

/// Routes mounted under `/api`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/quotes", get(list_quotes).post(create_quote))
        .route("/quotes/options", get(quote_options))
        .route("/quotes/:id", get(get_quote).patch(update_quote))
        .route("/quotes/:id/services", post(add_line_item))
        .route(
            "/quotes/:id/services/:item_id",
            patch(update_line_item).delete(remove_line_item),
        )
        .route("/pricing-plans", get(list_plans).post(create_plan))
        .route("/pricing-plans/:id", patch(update_plan).delete(deactivate_plan))
        .route("/services", get(list_services).post(create_service))
        .route("/services/:id", patch(update_service).delete(deactivate_service))
        .route("/cache/stats", get(cache_stats))
}

// ==================== quotes ====================

async fn create_quote(
    State(state): State<AppState>,
    body: Body<CreateQuoteRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    let Json(req) = body?;
    let aggregate = state.quotes.create_quote(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse { id: aggregate.id() }),
    ))
}

async fn list_quotes(State(state): State<AppState>) -> Result<Json<Vec<QuoteSummaryResponse>>> {
    let quotes = state.quotes.list_quotes().await?;
    Ok(Json(quotes.iter().map(QuoteSummaryResponse::from).collect()))
}

async fn get_quote(
    State(state): State<AppState>,
    path: Params<Uuid>,
) -> Result<Json<QuoteResponse>> {
    let Path(id) = path?;
    let aggregate = state.quotes.get_quote(id).await?;
    Ok(Json(QuoteResponse::from(&aggregate)))
}

async fn update_quote(
    State(state): State<AppState>,
    path: Params<Uuid>,
    body: Body<UpdateQuoteRequest>,
) -> Result<Json<QuoteResponse>> {
    let Path(id) = path?;
    let Json(req) = body?;
    let aggregate = state.quotes.update_quote_fields(id, req).await?;
    Ok(Json(QuoteResponse::from(&aggregate)))
}

async fn add_line_item(
    State(state): State<AppState>,
    path: Params<Uuid>,
    body: Body<LineItemRequest>,
) -> Result<(StatusCode, Json<QuoteResponse>)> {
    let Path(id) = path?;
    let Json(req) = body?;
    let (aggregate, _) = state.quotes.add_line_item(id, req).await?;
    Ok((StatusCode::CREATED, Json(QuoteResponse::from(&aggregate))))
}

async fn update_line_item(
    State(state): State<AppState>,
    path: Params<(Uuid, Uuid)>,
    body: Body<UpdateLineItemRequest>,
) -> Result<Json<QuoteResponse>> {
    let Path((id, item_id)) = path?;
    let Json(req) = body?;
    let (aggregate, _) = state.quotes.update_line_item(id, item_id, req).await?;
    Ok(Json(QuoteResponse::from(&aggregate)))
}

async fn remove_line_item(
    State(state): State<AppState>,
    path: Params<(Uuid, Uuid)>,
) -> Result<Json<QuoteResponse>> {
    let Path((id, item_id)) = path?;
    let aggregate = state.quotes.remove_line_item(id, item_id).await?;
    Ok(Json(QuoteResponse::from(&aggregate)))
}

async fn quote_options(State(state): State<AppState>) -> Result<Json<QuoteOptionsResponse>> {
    let options = state.quotes.quote_options().await?;
    Ok(Json(QuoteOptionsResponse {
        pricing_plans: options.plans.iter().map(PlanResponse::from).collect(),
        services: options.services.iter().map(ServiceResponse::from).collect(),
    }))
}

// ==================== catalog ====================

async fn list_plans(State(state): State<AppState>) -> Result<Json<Vec<PlanResponse>>> {
    let plans = state.quotes.list_active_plans().await?;
    Ok(Json(plans.iter().map(PlanResponse::from).collect()))
}

async fn create_plan(
    State(state): State<AppState>,
    body: Body<CreatePlanRequest>,
) -> Result<(StatusCode, Json<PlanResponse>)> {
    let Json(req) = body?;
    let plan = state.admin.create_plan(req, &state.default_currency).await?;
    Ok((StatusCode::CREATED, Json(PlanResponse::from(&plan))))
}

async fn update_plan(
    State(state): State<AppState>,
    path: Params<Uuid>,
    body: Body<UpdatePlanRequest>,
) -> Result<Json<PlanResponse>> {
    let Path(id) = path?;
    let Json(req) = body?;
    let plan = state.admin.update_plan(id, req).await?;
    Ok(Json(PlanResponse::from(&plan)))
}

async fn deactivate_plan(State(state): State<AppState>, path: Params<Uuid>) -> Result<StatusCode> {
    let Path(id) = path?;
    state.admin.deactivate_plan(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_services(State(state): State<AppState>) -> Result<Json<Vec<ServiceResponse>>> {
    let services = state.quotes.list_active_services().await?;
    Ok(Json(services.iter().map(ServiceResponse::from).collect()))
}

async fn create_service(
    State(state): State<AppState>,
    body: Body<CreateServiceRequest>,
) -> Result<(StatusCode, Json<ServiceResponse>)> {
    let Json(req) = body?;
    let service = state
        .admin
        .create_service(req, &state.default_currency)
        .await?;
    Ok((StatusCode::CREATED, Json(ServiceResponse::from(&service))))
}

async fn update_service(
    State(state): State<AppState>,
    path: Params<Uuid>,
    body: Body<UpdateServiceRequest>,
) -> Result<Json<ServiceResponse>> {
    let Path(id) = path?;
    let Json(req) = body?;
    let service = state.admin.update_service(id, req).await?;
    Ok(Json(ServiceResponse::from(&service)))
}

async fn deactivate_service(
    State(state): State<AppState>,
    path: Params<Uuid>,
) -> Result<StatusCode> {
    let Path(id) = path?;
    state.admin.deactivate_service(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.quotes.catalog().cache().stats())
}
