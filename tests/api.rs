use std::sync::Arc;

use actix_web::{http::StatusCode, test, web, App};
use async_trait::async_trait;
use serde_json::{json, Value};

use equalize::assistant::{
    Assistant, AssistantError, ReceiptScan, ReceiptScanRequest, SplitSuggestion, SplitSuggestionRequest,
};
use equalize::auth::LocalIdentityProvider;
use equalize::routes;
use equalize::state::AppState;

struct FakeAssistant;

#[async_trait(?Send)]
impl Assistant for FakeAssistant {
    async fn suggest_split(&self, request: &SplitSuggestionRequest) -> Result<SplitSuggestion, AssistantError> {
        if request.description.contains("overload") {
            return Err(AssistantError::Flow("model overloaded".to_string()));
        }
        Ok(SplitSuggestion {
            method: "Equally".to_string(),
            reasoning: "Everyone shared the meal.".to_string(),
        })
    }

    async fn scan_receipt(&self, _request: &ReceiptScanRequest) -> Result<ReceiptScan, AssistantError> {
        Ok(ReceiptScan {
            description: "Corner Store".to_string(),
            amount: 120.0,
            category: "Unknown".to_string(),
        })
    }
}

fn app_state(seed_sample_data: bool) -> web::Data<AppState> {
    let identity = Arc::new(LocalIdentityProvider::new("test-secret", None));
    web::Data::new(AppState::new(identity, None, seed_sample_data))
}

macro_rules! app {
    ($seed:expr) => {{
        let assistant: Arc<dyn Assistant> = Arc::new(FakeAssistant);
        test::init_service(
            App::new()
                .app_data(app_state($seed))
                .app_data(web::Data::from(assistant))
                .configure(routes::configure),
        )
        .await
    }};
}

macro_rules! sign_up {
    ($app:expr, $email:expr) => {{
        let req = test::TestRequest::post()
            .uri("/auth/sign-up")
            .set_json(json!({ "email": $email, "password": "hunter22" }))
            .to_request();
        let session: Value = test::call_and_read_body_json(&$app, req).await;
        format!("Bearer {}", session["token"].as_str().unwrap())
    }};
}

macro_rules! get {
    ($app:expr, $token:expr, $uri:expr) => {{
        let req = test::TestRequest::get()
            .uri($uri)
            .insert_header(("Authorization", $token.as_str()))
            .to_request();
        test::call_service(&$app, req).await
    }};
}

macro_rules! post {
    ($app:expr, $token:expr, $uri:expr, $body:expr) => {{
        let req = test::TestRequest::post()
            .uri($uri)
            .insert_header(("Authorization", $token.as_str()))
            .set_json($body)
            .to_request();
        test::call_service(&$app, req).await
    }};
}

#[actix_web::test]
async fn protected_routes_need_a_session() {
    let app = app!(false);
    let req = test::TestRequest::get().uri("/expenses").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["title"], "Not Signed In");

    let bogus = "Bearer not-a-token".to_string();
    assert_eq!(get!(app, bogus, "/dashboard").status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn duplicate_sign_up_is_a_conflict() {
    let app = app!(false);
    let _ = sign_up!(app, "shishir@email.com");
    let req = test::TestRequest::post()
        .uri("/auth/sign-up")
        .set_json(json!({ "email": "shishir@email.com", "password": "hunter22" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["title"], "Authentication Failed");
    assert_eq!(
        body["description"],
        "This email address is already registered. Please sign in or use a different email."
    );

    let req = test::TestRequest::post()
        .uri("/auth/sign-in")
        .set_json(json!({ "email": "shishir@email.com", "password": "" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn sign_out_ends_the_session() {
    let app = app!(false);
    let token = sign_up!(app, "shishir@email.com");
    assert_eq!(get!(app, token, "/me").status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/auth/sign-out")
        .insert_header(("Authorization", token.as_str()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);
    assert_eq!(get!(app, token, "/me").status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn group_expense_flows_into_balance_and_settlement() {
    let app = app!(false);
    let token = sign_up!(app, "shishir@email.com");

    let resp = post!(app, token, "/groups", json!({ "name": "Flatmates" }));
    assert_eq!(resp.status(), StatusCode::CREATED);
    let group: Value = test::read_body_json(resp).await;
    let group_id = group["id"].as_str().unwrap().to_string();
    assert_eq!(group["members"].as_array().unwrap().len(), 1);

    let resp = post!(app, token, &format!("/groups/{group_id}/members"), json!({ "name": "Vikram P" }));
    assert_eq!(resp.status(), StatusCode::CREATED);
    let vikram: Value = test::read_body_json(resp).await;
    assert_eq!(vikram["initials"], "VP");

    let resp = post!(
        app,
        token,
        "/expenses",
        json!({ "description": "Groceries", "amount": 100.0, "category": "Food", "group": group_id })
    );
    assert_eq!(resp.status(), StatusCode::CREATED);

    let detail: Value = test::read_body_json(get!(app, token, &format!("/groups/{group_id}"))).await;
    assert_eq!(detail["totalExpenses"], 100.0);
    assert_eq!(detail["expenses"].as_array().unwrap().len(), 1);

    let balance: Value = test::read_body_json(get!(app, token, &format!("/groups/{group_id}/balance"))).await;
    assert_eq!(balance[0]["name"], "shishir");
    assert_eq!(balance[0]["balance"], 50.0);
    assert_eq!(balance[1]["name"], "Vikram P");
    assert_eq!(balance[1]["balance"], -50.0);

    let settlement: Value =
        test::read_body_json(get!(app, token, &format!("/groups/{group_id}/settlement"))).await;
    assert_eq!(
        settlement,
        json!([{
            "payer": vikram["id"],
            "payerName": "Vikram P",
            "receiver": balance[0]["member"],
            "receiverName": "shishir",
            "amount": 50.0
        }])
    );

    let debts: Value = test::read_body_json(get!(app, token, &format!("/groups/{group_id}/debts"))).await;
    assert_eq!(debts, settlement);

    let dashboard: Value = test::read_body_json(get!(app, token, "/dashboard")).await;
    assert_eq!(dashboard["totalSpent"], 100.0);
    assert_eq!(dashboard["youAreOwed"], 50.0);
    assert_eq!(dashboard["owedGroupCount"], 1);
    assert_eq!(dashboard["activeGroups"], 1);
}

#[actix_web::test]
async fn sample_ledger_updates_the_group_total() {
    let app = app!(true);
    let token = sign_up!(app, "shishir@email.com");

    let groups: Value = test::read_body_json(get!(app, token, "/groups")).await;
    let flatmates = groups
        .as_array()
        .unwrap()
        .iter()
        .find(|group| group["name"] == "Flatmates")
        .unwrap()
        .clone();
    assert_eq!(flatmates["totalExpenses"], 9200.0);

    let resp = post!(
        app,
        token,
        "/expenses",
        json!({ "description": "Milk", "amount": 100, "category": "Food", "group": flatmates["id"] })
    );
    assert_eq!(resp.status(), StatusCode::CREATED);

    let groups: Value = test::read_body_json(get!(app, token, "/groups")).await;
    let flatmates = groups
        .as_array()
        .unwrap()
        .iter()
        .find(|group| group["name"] == "Flatmates")
        .unwrap();
    assert_eq!(flatmates["totalExpenses"], 9300.0);

    let expenses: Value = test::read_body_json(get!(app, token, "/expenses")).await;
    assert_eq!(expenses.as_array().unwrap().len(), 12);
    assert_eq!(expenses[0]["description"], "Milk");
}

#[actix_web::test]
async fn invalid_expenses_are_rejected_without_changes() {
    let app = app!(false);
    let token = sign_up!(app, "shishir@email.com");

    let resp = post!(app, token, "/expenses", json!({ "description": "Lunch", "category": "Food" }));
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["title"], "Invalid Input");

    let resp = post!(
        app,
        token,
        "/expenses",
        json!({
            "description": "Lunch",
            "amount": 10,
            "category": "Food",
            "group": "5f0c4c1e-0000-4000-8000-000000000000"
        })
    );
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let expenses: Value = test::read_body_json(get!(app, token, "/expenses")).await;
    assert_eq!(expenses, json!([]));

    let resp = post!(app, token, "/groups", json!({ "name": "   " }));
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["title"], "Group name is required");
}

#[actix_web::test]
async fn export_quotes_awkward_fields() {
    let app = app!(false);
    let token = sign_up!(app, "shishir@email.com");
    let resp = post!(
        app,
        token,
        "/expenses",
        json!({ "description": "Pizza, drinks", "amount": 12.5, "category": "Food", "date": "2024-07-22" })
    );
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = get!(app, token, "/expenses/export");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap().to_str().unwrap(),
        "text/csv; charset=utf-8"
    );
    let body = test::read_body(resp).await;
    let csv = std::str::from_utf8(&body).unwrap();
    let mut lines = csv.split("\r\n");
    assert_eq!(
        lines.next(),
        Some("ID,Description,Amount,Category,Date,Group,Payment Method,Notes")
    );
    let row = lines.next().unwrap();
    assert!(row.contains(",\"Pizza, drinks\",12.50,Food,22-07-2024,,Card,"));
}

#[actix_web::test]
async fn preferences_change_the_export_date_format() {
    let app = app!(false);
    let token = sign_up!(app, "shishir@email.com");
    let req = test::TestRequest::put()
        .uri("/me/preferences")
        .insert_header(("Authorization", token.as_str()))
        .set_json(json!({ "currency": "USD", "dateFormat": "yyyy-mm-dd" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let profile: Value = test::read_body_json(get!(app, token, "/me")).await;
    assert_eq!(profile["preferences"], json!({ "currency": "USD", "dateFormat": "yyyy-mm-dd" }));
    assert_eq!(profile["user"]["email"], "shishir@email.com");

    let _ = post!(
        app,
        token,
        "/expenses",
        json!({ "description": "Taxi", "amount": 8, "category": "Transport", "date": "2024-07-22" })
    );
    let csv = test::read_body(get!(app, token, "/expenses/export")).await;
    assert!(std::str::from_utf8(&csv).unwrap().contains(",2024-07-22,"));
}

#[actix_web::test]
async fn receipt_scan_keeps_a_known_category_over_unknown() {
    let app = app!(false);
    let token = sign_up!(app, "shishir@email.com");
    let resp = post!(
        app,
        token,
        "/assistant/receipt-scan",
        json!({
            "receiptDataUri": "data:image/png;base64,aGVsbG8=",
            "form": { "category": "Travel" }
        })
    );
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["scan"]["category"], "Unknown");
    assert_eq!(body["form"]["category"], "Travel");
    assert_eq!(body["form"]["description"], "Corner Store");
    assert_eq!(body["form"]["amount"], 120.0);

    let resp = post!(app, token, "/assistant/receipt-scan", json!({ "receiptDataUri": "receipt.png" }));
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn split_suggestion_failures_surface_as_bad_gateway() {
    let app = app!(false);
    let token = sign_up!(app, "shishir@email.com");

    let resp = post!(
        app,
        token,
        "/assistant/split-suggestion",
        json!({ "description": "Dinner at BBQ Nation", "numPeople": 4 })
    );
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["method"], "Equally");

    let resp = post!(
        app,
        token,
        "/assistant/split-suggestion",
        json!({ "description": "overloaded dinner", "numPeople": 4 })
    );
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["title"], "AI Suggestion Failed");
    assert_eq!(body["description"], "Failed to get suggestion: model overloaded");

    let resp = post!(
        app,
        token,
        "/assistant/split-suggestion",
        json!({ "description": "Dinner", "numPeople": 1 })
    );
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn members_joining_later_owe_nothing_for_earlier_bills() {
    let app = app!(false);
    let token = sign_up!(app, "shishir@email.com");

    let group: Value = test::read_body_json(post!(app, token, "/groups", json!({ "name": "Flatmates" }))).await;
    let group_id = group["id"].as_str().unwrap().to_string();
    let members = format!("/groups/{group_id}/members");
    let _ = post!(app, token, &members, json!({ "name": "Vikram P" }));
    let resp = post!(
        app,
        token,
        "/expenses",
        json!({ "description": "Electricity Bill", "amount": 1800, "category": "Housing", "group": group_id })
    );
    assert_eq!(resp.status(), StatusCode::CREATED);
    let expense: Value = test::read_body_json(resp).await;
    assert_eq!(expense["split"]["method"]["participants"].as_array().unwrap().len(), 2);

    let _ = post!(app, token, &members, json!({ "name": "Late Joiner" }));
    let balance: Value = test::read_body_json(get!(app, token, &format!("/groups/{group_id}/balance"))).await;
    assert_eq!(balance[0]["balance"], 900.0);
    assert_eq!(balance[1]["balance"], -900.0);
    assert_eq!(balance[2]["name"], "Late Joiner");
    assert_eq!(balance[2]["balance"], 0.0);
}
