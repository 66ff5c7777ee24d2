mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;

async fn create(server: &common::TestServer, token: &str, address1: &str) -> Result<i64> {
    let body: Value = server.create_address(token, common::address(address1)).await?.json().await?;
    body["id"].as_i64().ok_or_else(|| anyhow::anyhow!("missing id in {}", body))
}

#[tokio::test]
async fn batch_delete_removes_all_listed() -> Result<()> {
    let server = common::spawn_server().await?;
    let token = server.user_with_token("alice").await?;
    let a = create(&server, &token, "1 High St").await?;
    let b = create(&server, &token, "2 High St").await?;
    let c = create(&server, &token, "3 High St").await?;

    let res = server.delete(&token, &format!("/api/v1/addressbook/batch?ids={},{},{}", a, b, a)).await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(server.owned_ids(&token).await?, vec![c]);
    Ok(())
}

#[tokio::test]
async fn batch_with_foreign_id_deletes_nothing() -> Result<()> {
    let server = common::spawn_server().await?;
    let alice = server.user_with_token("alice").await?;
    let bob = server.user_with_token("bob").await?;
    let mine = create(&server, &alice, "1 High St").await?;
    let theirs = create(&server, &bob, "2 High St").await?;

    let res = server.delete(&alice, &format!("/api/v1/addressbook/batch?ids={},{}", mine, theirs)).await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(server.owned_ids(&alice).await?, vec![mine]);
    assert_eq!(server.owned_ids(&bob).await?, vec![theirs]);
    Ok(())
}

#[tokio::test]
async fn batch_requires_a_valid_id_list() -> Result<()> {
    let server = common::spawn_server().await?;
    let token = server.user_with_token("alice").await?;

    assert_eq!(server.delete(&token, "/api/v1/addressbook/batch").await?.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        server.delete(&token, "/api/v1/addressbook/batch?ids=1,x").await?.status(),
        StatusCode::BAD_REQUEST
    );
    Ok(())
}
