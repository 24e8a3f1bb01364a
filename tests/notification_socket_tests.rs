mod common;

use std::time::Duration;

use gompet::cli::connectivity::HttpSession;
use gompet::notifications::{ConnectionStatus, LifecycleEvent, MessageKind, NotificationClient, TungsteniteConnector};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;

type Client = NotificationClient<TungsteniteConnector>;

/// Pump events until `done` holds, failing after a few seconds.
async fn pump_until(client: &mut Client, done: impl Fn(&Client) -> bool) -> anyhow::Result<()> {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done(client) {
            client.pump().await;
        }
    })
    .await
    .map_err(|_| anyhow::anyhow!("timed out waiting for client state"))
}

#[tokio::test]
async fn published_payload_reaches_the_client_as_a_linked_message() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let (_server, base) = common::start_server(&tmp).await?;
    let session = HttpSession::connect(&base, common::USER, common::PASSWORD).await?;
    assert_eq!(session.grant().user_id, 1);

    let mut client = NotificationClient::new(TungsteniteConnector);
    client.connect(&session.notification_socket_base()?, &session.grant().token);
    assert_eq!(client.status(), ConnectionStatus::Connecting);
    pump_until(&mut client, |c| c.status() == ConnectionStatus::Connected).await?;
    assert_eq!(client.latest().map(|m| m.text.as_str()), Some("✅ Połączono z WebSocket."));

    let delivered = session
        .publish(1, &serde_json::json!({
            "target_type": "animal", "target_id": 42,
            "actor": {"first_name": "Ola"}, "verb": "polubił(a)"
        }))
        .await?;
    assert!(delivered);
    pump_until(&mut client, |c| c.latest().is_some_and(|m| m.kind == MessageKind::Notification)).await?;
    let msg = client.latest().cloned().ok_or_else(|| anyhow::anyhow!("no message"))?;
    assert_eq!(msg.link_url.as_deref(), Some("/animals/42"));
    assert!(msg.text.contains("Ola") && msg.text.contains("polubił(a)"));

    client.disconnect();
    pump_until(&mut client, |c| c.status() == ConnectionStatus::Disconnected).await?;
    assert_eq!(client.latest().map(|m| m.kind), Some(MessageKind::Lifecycle(LifecycleEvent::Closed)));
    assert_eq!(client.message_count(), 3);
    Ok(())
}

#[tokio::test]
async fn reconnecting_keeps_a_single_live_socket() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let (_server, base) = common::start_server(&tmp).await?;
    let session = HttpSession::connect(&base, common::USER, common::PASSWORD).await?;
    let url = session.notification_socket_base()?;

    let mut client = NotificationClient::new(TungsteniteConnector);
    client.connect(&url, &session.grant().token);
    client.connect(&url, &session.grant().token);
    assert_eq!(client.connection_id(), Some(2));
    pump_until(&mut client, |c| c.status() == ConnectionStatus::Connected).await?;

    // give the superseded socket time to be torn down server side
    tokio::time::sleep(Duration::from_millis(200)).await;
    client.drain_pending();
    let connected = client
        .messages()
        .filter(|m| m.kind == MessageKind::Lifecycle(LifecycleEvent::Connected))
        .count();
    assert_eq!(connected, 1);
    assert_eq!(client.status(), ConnectionStatus::Connected);

    assert!(session.publish(1, &serde_json::json!("ping")).await?);
    pump_until(&mut client, |c| c.latest().is_some_and(|m| m.kind == MessageKind::Raw)).await?;
    assert_eq!(client.messages().filter(|m| m.kind == MessageKind::Raw).count(), 1);
    Ok(())
}

#[tokio::test]
async fn invalid_token_ends_in_error_then_disconnected() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let (_server, base) = common::start_server(&tmp).await?;
    let url = gompet::cli::connectivity::notification_socket_base(&base, 1)?;

    let mut client = NotificationClient::new(TungsteniteConnector);
    client.connect(&url, "forged");
    pump_until(&mut client, |c| c.status() == ConnectionStatus::Error).await?;
    assert_eq!(client.latest().map(|m| m.text.as_str()), Some("❌ Wystąpił błąd WebSocket."));
    pump_until(&mut client, |c| c.status() == ConnectionStatus::Disconnected).await?;
    assert!(!client.has_connection());
    Ok(())
}

#[tokio::test]
async fn socket_endpoint_checks_token_source_and_user() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let (_server, base) = common::start_server(&tmp).await?;
    let session = HttpSession::connect(&base, common::USER, common::PASSWORD).await?;
    let token = session.grant().token.clone();
    let ws_base = base.replacen("http://", "ws://", 1);

    // bearer header instead of the query parameter
    let mut req = format!("{ws_base}/ws/notifications/1/").into_client_request()?;
    req.headers_mut().insert("authorization", HeaderValue::from_str(&format!("Bearer {token}"))?);
    let (mut socket, _) = tokio_tungstenite::connect_async(req).await?;
    socket.close(None).await?;

    // someone else's channel
    let err = tokio_tungstenite::connect_async(format!("{ws_base}/ws/notifications/2/?token={token}"))
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("expected refusal"))?;
    match err {
        tokio_tungstenite::tungstenite::Error::Http(resp) => assert_eq!(resp.status().as_u16(), 403),
        other => anyhow::bail!("unexpected error: {other}"),
    }

    let err = tokio_tungstenite::connect_async(format!("{ws_base}/ws/notifications/1/"))
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("expected refusal"))?;
    match err {
        tokio_tungstenite::tungstenite::Error::Http(resp) => assert_eq!(resp.status().as_u16(), 401),
        other => anyhow::bail!("unexpected error: {other}"),
    }
    Ok(())
}

#[tokio::test]
async fn publishing_without_listeners_or_for_others_is_refused() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let (_server, base) = common::start_server(&tmp).await?;
    let session = HttpSession::connect(&base, common::USER, common::PASSWORD).await?;

    assert!(!session.publish(1, &serde_json::json!({"verb": "x"})).await?);
    assert!(session.publish(2, &serde_json::json!({"verb": "x"})).await.is_err());
    session.logout().await?;
    assert!(session.publish(1, &serde_json::json!({"verb": "x"})).await.is_err());
    Ok(())
}
