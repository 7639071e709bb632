//! Integration tests for the WebSocket transport.
//!
//! These tests spin up a real WebSocket server and client to verify
//! that frames flow in both directions and that a closing peer is
//! reported as a clean end of stream.

#[cfg(feature = "websocket")]
mod websocket {
    use futures_util::{SinkExt, StreamExt};
    use playdeck_transport::{
        Connection, Handshake, Transport, WebSocketConnection, WebSocketTransport,
    };
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Helper: connects a tokio-tungstenite client to the given address.
    async fn connect_client(addr: &str) -> ClientWs {
        let url = format!("ws://{addr}");
        let (ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .expect("client should connect");
        ws
    }

    /// Binds on an OS-assigned port and returns the transport with the
    /// address clients should dial.
    async fn bind_ephemeral() -> (WebSocketTransport, String) {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport
            .local_addr()
            .expect("should have local addr")
            .to_string();
        (transport, addr)
    }

    /// Accepts one peer and runs its upgrade.
    async fn accept_ws(transport: &mut WebSocketTransport) -> WebSocketConnection {
        transport
            .accept()
            .await
            .expect("should accept")
            .complete()
            .await
            .expect("handshake should succeed")
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let (mut transport, addr) = bind_ephemeral().await;

        let server_handle = tokio::spawn(async move {
            accept_ws(&mut transport).await
        });

        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.expect("task should complete");

        assert!(server_conn.id().into_inner() > 0);
        assert!(server_conn.peer_addr().ip().is_loopback());

        // --- Server sends, client receives a text frame ---
        server_conn
            .send(br#"{"type":"command"}"#)
            .await
            .expect("send should succeed");

        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_text(), "outbound frames should be text");
        assert_eq!(msg.into_data().as_ref(), br#"{"type":"command"}"#);

        // --- Client sends, server receives ---
        client_ws
            .send(Message::Text(r#"{"type":"init_player"}"#.to_string().into()))
            .await
            .unwrap();

        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, br#"{"type":"init_player"}"#);

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (mut transport, addr) = bind_ephemeral().await;

        let server_handle = tokio::spawn(async move {
            accept_ws(&mut transport).await
        });

        let mut client_ws = connect_client(&addr).await;
        let server_conn = server_handle.await.unwrap();

        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_websocket_send_while_reader_is_waiting() {
        // A reader parked in recv() must not block the writer.
        let (mut transport, addr) = bind_ephemeral().await;

        let server_handle = tokio::spawn(async move {
            accept_ws(&mut transport).await
        });

        let mut client_ws = connect_client(&addr).await;
        let server_conn =
            std::sync::Arc::new(server_handle.await.unwrap());

        let reader = {
            let conn = std::sync::Arc::clone(&server_conn);
            tokio::spawn(async move { conn.recv().await })
        };
        tokio::task::yield_now().await;

        tokio::time::timeout(
            std::time::Duration::from_secs(2),
            server_conn.send(b"ping"),
        )
        .await
        .expect("send should not wait for the reader")
        .expect("send should succeed");

        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"ping");

        client_ws.send(Message::Close(None)).await.unwrap();
        let read = reader.await.unwrap().expect("recv should not error");
        assert!(read.is_none());
    }

    #[tokio::test]
    async fn test_websocket_accept_returns_before_upgrade() {
        // A peer that never sends the upgrade request only holds its own
        // handshake; the listener keeps taking new peers.
        let (mut transport, addr) = bind_ephemeral().await;
        let _idle = tokio::net::TcpStream::connect(&addr)
            .await
            .expect("raw TCP should connect");

        let idle_handshake = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            transport.accept(),
        )
        .await
        .expect("accept should not wait for the upgrade")
        .expect("should accept");
        assert!(idle_handshake.peer_addr().ip().is_loopback());

        let server_handle = tokio::spawn(async move {
            accept_ws(&mut transport).await
        });
        let mut client_ws = connect_client(&addr).await;
        let server_conn = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            server_handle,
        )
        .await
        .expect("second peer should be accepted")
        .unwrap();

        server_conn.send(b"hello").await.expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"hello");
        drop(idle_handshake);
    }
}
