mod common;

use anyhow::Result;
use axum::http::StatusCode;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let app = common::TestApp::new()?;

    let res = app.get("/health", None).await?;
    assert_eq!(res.status, StatusCode::OK);

    let body = res.json()?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn unknown_route_under_prefix_is_not_found() -> Result<()> {
    let app = common::TestApp::new()?;

    let res = app.get("/api/users/nothing/here", None).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.json()?["status"], 404);
    Ok(())
}

#[tokio::test]
async fn wrong_method_is_method_not_allowed() -> Result<()> {
    let app = common::TestApp::new()?;

    let res = app.get("/api/users", None).await?;
    assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.json()?["status"], 405);
    Ok(())
}
