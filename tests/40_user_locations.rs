mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::TestApp;
use uuid::Uuid;

fn locations_uri(id: Uuid) -> String {
    format!("/api/users/id/{}/locations", id)
}

#[tokio::test]
async fn anonymous_callers_are_unauthenticated() -> Result<()> {
    let app = TestApp::new()?;
    let id = app.create_user("ada").await?;

    let res = app.get(&locations_uri(id), None).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let body = res.json()?;
    assert_eq!(body["status"], 401);
    assert_eq!(body["message"], "Authentication required to view locations");
    Ok(())
}

#[tokio::test]
async fn invalid_tokens_are_unauthenticated() -> Result<()> {
    let app = TestApp::new()?;
    let id = app.create_user("ada").await?;

    let res = app.get(&locations_uri(id), Some("not.a.jwt")).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn authentication_is_checked_before_the_id() -> Result<()> {
    let app = TestApp::new()?;

    let res = app.get("/api/users/id/not-a-uuid/locations", None).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn owner_sees_their_locations() -> Result<()> {
    let app = TestApp::new()?;
    let id = app.create_user("ada").await?;
    app.store.add_location(id, "Home", 51.5072, -0.1276).await?;
    app.store.add_location(id, "Work", 51.5155, -0.0922).await?;
    let token = app.token_for(id)?;

    let res = app.get(&locations_uri(id), Some(&token)).await?;
    assert_eq!(res.status, StatusCode::OK);

    let body = res.json()?;
    let names: Vec<_> = body
        .as_array()
        .map(|locations| locations.iter().filter_map(|l| l["name"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(names, vec!["Home", "Work"]);
    Ok(())
}

#[tokio::test]
async fn user_without_locations_gets_an_empty_array() -> Result<()> {
    let app = TestApp::new()?;
    let id = app.create_user("ada").await?;
    let token = app.token_for(id)?;

    let res = app.get(&locations_uri(id), Some(&token)).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()?, serde_json::json!([]));
    Ok(())
}

#[tokio::test]
async fn other_users_are_forbidden() -> Result<()> {
    let app = TestApp::new()?;
    let owner = app.create_user("ada").await?;
    let other = app.create_user("grace").await?;
    app.store.add_location(owner, "Home", 51.5072, -0.1276).await?;
    let token = app.token_for(other)?;

    let res = app.get(&locations_uri(owner), Some(&token)).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let body = res.json()?;
    assert_eq!(body["status"], 403);
    assert_eq!(body["message"], "You may not view another user's locations");
    Ok(())
}

#[tokio::test]
async fn root_access_may_read_any_user() -> Result<()> {
    let app = TestApp::new()?;
    let owner = app.create_user("ada").await?;
    app.store.add_location(owner, "Home", 51.5072, -0.1276).await?;
    let token = app.root_token()?;

    let res = app.get(&locations_uri(owner), Some(&token)).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()?.as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn missing_user_is_not_found_before_access_is_checked() -> Result<()> {
    let app = TestApp::new()?;
    let caller = app.create_user("ada").await?;
    let token = app.token_for(caller)?;

    let res = app.get(&locations_uri(Uuid::new_v4()), Some(&token)).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn malformed_id_with_a_session_is_a_bad_request() -> Result<()> {
    let app = TestApp::new()?;
    let caller = app.create_user("ada").await?;
    let token = app.token_for(caller)?;

    let res = app.get("/api/users/id/not-a-uuid/locations", Some(&token)).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    Ok(())
}
