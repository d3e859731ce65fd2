use actix_web::{
    dev::Payload, get, http::header, post, put, web, FromRequest, HttpRequest, HttpResponse,
};
use futures::future::{ready, Ready};
use serde::{Deserialize, Serialize};

use crate::assistant::{Assistant, ReceiptScan, ReceiptScanRequest, SplitSuggestionRequest};
use crate::auth::{bearer_token, AuthUser, TelegramAuthData};
use crate::balance::{compute_balance_from_group, describe_balance};
use crate::error::ApiError;
use crate::exchange::{get_exchanges_from_group, get_pairwise_debts};
use crate::export::expenses_to_csv;
use crate::form::{validate_member, Credentials, ExpenseForm, GroupForm};
use crate::ledger::{LedgerError, LedgerStore};
use crate::schemas::{Expense, Group, GroupId, MemberDraft, Preferences};
use crate::state::AppState;
use crate::summary::dashboard;

/// The user behind the request's bearer token.
pub struct CurrentUser(pub AuthUser);

impl FromRequest for CurrentUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let user = req
            .app_data::<web::Data<AppState>>()
            .zip(bearer_token(req))
            .and_then(|(state, token)| state.identity.current_user(token));
        ready(user.map(CurrentUser).ok_or(ApiError::Unauthorized))
    }
}

#[post("/auth/sign-up")]
async fn sign_up(state: web::Data<AppState>, json: web::Json<Credentials>) -> Result<HttpResponse, ApiError> {
    let credentials = json.into_inner().validate()?;
    let session = state.identity.sign_up(&credentials.email, &credentials.password)?;
    Ok(HttpResponse::Ok().json(session))
}

#[post("/auth/sign-in")]
async fn sign_in(state: web::Data<AppState>, json: web::Json<Credentials>) -> Result<HttpResponse, ApiError> {
    let credentials = json.into_inner().validate()?;
    let session = state.identity.sign_in(&credentials.email, &credentials.password)?;
    Ok(HttpResponse::Ok().json(session))
}

#[post("/auth/federated")]
async fn sign_in_federated(
    state: web::Data<AppState>,
    json: web::Json<TelegramAuthData>,
) -> Result<HttpResponse, ApiError> {
    let session = state.identity.sign_in_with_federated_provider(&json)?;
    Ok(HttpResponse::Ok().json(session))
}

#[post("/auth/sign-out")]
async fn sign_out(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    if let Some(token) = bearer_token(&req) {
        state.identity.sign_out(token);
    }
    HttpResponse::NoContent().finish()
}

#[derive(Serialize)]
struct Profile {
    user: AuthUser,
    preferences: Preferences,
}

#[get("/me")]
async fn get_profile(state: web::Data<AppState>, CurrentUser(user): CurrentUser) -> Result<HttpResponse, ApiError> {
    state.open_ledger(&user).await?;
    let preferences = state.read(&user, LedgerStore::preferences);
    Ok(HttpResponse::Ok().json(Profile { user, preferences }))
}

#[put("/me/preferences")]
async fn set_preferences(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    json: web::Json<Preferences>,
) -> Result<HttpResponse, ApiError> {
    state.open_ledger(&user).await?;
    let preferences = json.into_inner();
    state.write(&user, |ledger| ledger.set_preferences(preferences));

    if let Some(archive) = state.archive() {
        if let Err(err) = archive.save_preferences(&user.id, preferences).await {
            tracing::warn!(user = %user.id, %err, "couldn't archive the preferences");
        }
    }
    Ok(HttpResponse::Ok().json(preferences))
}

#[get("/expenses")]
async fn list_expenses(state: web::Data<AppState>, CurrentUser(user): CurrentUser) -> Result<HttpResponse, ApiError> {
    state.open_ledger(&user).await?;
    Ok(HttpResponse::Ok().json(state.read(&user, |ledger| ledger.expenses().to_vec())))
}

#[post("/expenses")]
async fn add_expense(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    json: web::Json<ExpenseForm>,
) -> Result<HttpResponse, ApiError> {
    state.open_ledger(&user).await?;
    let today = chrono::Local::now().date_naive();
    let expense = state.write(&user, |ledger| -> Result<Expense, ApiError> {
        let draft = json.into_inner().validate(ledger.groups(), today)?;
        Ok(ledger.add_expense(draft))
    })?;
    tracing::info!(user = %user.id, expense = %expense.id, amount = expense.amount, "expense added");

    if let Some(archive) = state.archive() {
        if let Err(err) = archive.save_expense(&user.id, &expense).await {
            tracing::warn!(expense = %expense.id, %err, "couldn't archive the expense");
        }
    }
    Ok(HttpResponse::Created().json(expense))
}

#[get("/expenses/export")]
async fn export_expenses(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<HttpResponse, ApiError> {
    state.open_ledger(&user).await?;
    let csv = state.read(&user, expenses_to_csv)?;
    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((header::CONTENT_DISPOSITION, "attachment; filename=\"expenses.csv\""))
        .body(csv))
}

#[get("/groups")]
async fn list_groups(state: web::Data<AppState>, CurrentUser(user): CurrentUser) -> Result<HttpResponse, ApiError> {
    state.open_ledger(&user).await?;
    Ok(HttpResponse::Ok().json(state.read(&user, |ledger| ledger.groups().to_vec())))
}

#[post("/groups")]
async fn add_group(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    json: web::Json<GroupForm>,
) -> Result<HttpResponse, ApiError> {
    let draft = json.into_inner().validate()?;
    state.open_ledger(&user).await?;
    let group = state.write(&user, |ledger| ledger.add_group(draft));
    tracing::info!(user = %user.id, group = %group.id, "group created");

    if let Some(archive) = state.archive() {
        if let Err(err) = archive.save_group(&user.id, &group).await {
            tracing::warn!(group = %group.id, %err, "couldn't archive the group");
        }
    }
    Ok(HttpResponse::Created().json(group))
}

#[derive(Serialize)]
struct GroupDetail {
    #[serde(flatten)]
    group: Group,
    expenses: Vec<Expense>,
}

/// The group and its expenses, or `GroupNotFound`.
fn group_with_expenses(ledger: &LedgerStore, id: GroupId) -> Result<(Group, Vec<Expense>), LedgerError> {
    let group = ledger.group(id).ok_or(LedgerError::GroupNotFound(id))?;
    Ok((group.clone(), ledger.expenses_for_group(id)))
}

#[get("/groups/{id}")]
async fn get_group(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    id: web::Path<GroupId>,
) -> Result<HttpResponse, ApiError> {
    state.open_ledger(&user).await?;
    let (group, expenses) = state.read(&user, |ledger| group_with_expenses(ledger, *id))?;
    Ok(HttpResponse::Ok().json(GroupDetail { group, expenses }))
}

#[post("/groups/{id}/members")]
async fn add_member(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    id: web::Path<GroupId>,
    json: web::Json<MemberDraft>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let draft = validate_member(json.into_inner())?;
    state.open_ledger(&user).await?;
    let member = state.write(&user, |ledger| ledger.add_member(id, draft))?;
    tracing::info!(group = %id, member = %member.id, "member added");

    if let Some(archive) = state.archive() {
        if let Err(err) = archive.save_member(&user.id, id, &member).await {
            tracing::warn!(group = %id, %err, "couldn't archive the member");
        }
    }
    Ok(HttpResponse::Created().json(member))
}

#[get("/groups/{id}/balance")]
async fn get_balance(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    id: web::Path<GroupId>,
) -> Result<HttpResponse, ApiError> {
    state.open_ledger(&user).await?;
    let balances = state.read(&user, |ledger| {
        let (group, expenses) = group_with_expenses(ledger, *id)?;
        let balance = compute_balance_from_group(&group, &expenses, ledger.owner().id);
        Ok::<_, LedgerError>(describe_balance(&group, &balance))
    })?;
    Ok(HttpResponse::Ok().json(balances))
}

#[get("/groups/{id}/debts")]
async fn get_debts(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    id: web::Path<GroupId>,
) -> Result<HttpResponse, ApiError> {
    state.open_ledger(&user).await?;
    let debts = state.read(&user, |ledger| {
        let (group, expenses) = group_with_expenses(ledger, *id)?;
        Ok::<_, LedgerError>(get_pairwise_debts(&group, &expenses, ledger.owner().id))
    })?;
    Ok(HttpResponse::Ok().json(debts))
}

#[get("/groups/{id}/settlement")]
async fn get_settlement(
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
    id: web::Path<GroupId>,
) -> Result<HttpResponse, ApiError> {
    state.open_ledger(&user).await?;
    let exchanges = state.read(&user, |ledger| {
        let (group, expenses) = group_with_expenses(ledger, *id)?;
        Ok::<_, LedgerError>(get_exchanges_from_group(&group, &expenses, ledger.owner().id))
    })?;
    Ok(HttpResponse::Ok().json(exchanges))
}

#[get("/dashboard")]
async fn get_dashboard(state: web::Data<AppState>, CurrentUser(user): CurrentUser) -> Result<HttpResponse, ApiError> {
    state.open_ledger(&user).await?;
    Ok(HttpResponse::Ok().json(state.read(&user, dashboard)))
}

#[post("/assistant/split-suggestion")]
async fn suggest_split(
    assistant: web::Data<dyn Assistant>,
    _user: CurrentUser,
    json: web::Json<SplitSuggestionRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = json.into_inner();
    request.validate()?;
    let suggestion = assistant
        .suggest_split(&request)
        .await
        .map_err(ApiError::suggestion_failed)?;
    Ok(HttpResponse::Ok().json(suggestion))
}

#[derive(Deserialize)]
struct ReceiptScanBody {
    #[serde(flatten)]
    request: ReceiptScanRequest,
    #[serde(default)]
    form: ExpenseForm,
}

#[derive(Serialize)]
struct ScannedForm {
    scan: ReceiptScan,
    form: ExpenseForm,
}

/// Scans a receipt and returns the scan along with the submitted form
/// pre-filled from it.
#[post("/assistant/receipt-scan")]
async fn scan_receipt(
    assistant: web::Data<dyn Assistant>,
    _user: CurrentUser,
    json: web::Json<ReceiptScanBody>,
) -> Result<HttpResponse, ApiError> {
    let ReceiptScanBody { request, mut form } = json.into_inner();
    request.validate()?;
    let scan = assistant
        .scan_receipt(&request)
        .await
        .map_err(ApiError::scan_failed)?;
    form.apply_receipt_scan(&scan);
    Ok(HttpResponse::Ok().json(ScannedForm { scan, form }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(sign_up)
        .service(sign_in)
        .service(sign_in_federated)
        .service(sign_out)
        .service(get_profile)
        .service(set_preferences)
        .service(export_expenses)
        .service(list_expenses)
        .service(add_expense)
        .service(list_groups)
        .service(add_group)
        .service(get_group)
        .service(add_member)
        .service(get_balance)
        .service(get_debts)
        .service(get_settlement)
        .service(get_dashboard)
        .service(suggest_split)
        .service(scan_receipt);
}
