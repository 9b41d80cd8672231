use actix_web::{http::StatusCode, test, web, App};
use serde_json::{json, Value};

use notify_service::{
    handlers, ConnectionRegistry, DispatchOutcome, Dispatcher, ServerEvent,
};

/// Scenario: u1 connects, registers, gets targeted delivery; disconnects and
/// targeted dispatch fails; reconnects under a new connection id and delivery
/// follows the new connection only.
#[tokio::test]
async fn reconnect_moves_targeted_delivery_to_new_connection() {
    let registry = ConnectionRegistry::new();
    let dispatcher = Dispatcher::new(registry.clone());

    let (conn_a, mut rx_a) = registry.attach().await;
    registry.register("u1", conn_a).await;

    let outcome = dispatcher.dispatch(Some("u1"), "welcome").await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Delivered);
    let ServerEvent::AdminNotification(notification) = rx_a.try_recv().unwrap();
    assert_eq!(notification.message, "welcome");

    // Disconnect: the binding disappears with the connection.
    registry.detach(conn_a).await;
    let outcome = dispatcher.dispatch(Some("u1"), "lost").await.unwrap();
    assert_eq!(outcome, DispatchOutcome::NotConnected);

    // Reconnect with a fresh connection id and re-register.
    let (conn_b, mut rx_b) = registry.attach().await;
    registry.register("u1", conn_b).await;

    let outcome = dispatcher.dispatch(Some("u1"), "back again").await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Delivered);
    let ServerEvent::AdminNotification(notification) = rx_b.try_recv().unwrap();
    assert_eq!(notification.message, "back again");
    assert!(rx_a.try_recv().is_err());
}

/// Scenario: three open connections, two registered to distinct users, one
/// anonymous. Broadcast reaches all three and reports count 3.
#[tokio::test]
async fn broadcast_reaches_every_open_connection() {
    let registry = ConnectionRegistry::new();
    let dispatcher = Dispatcher::new(registry.clone());

    let (conn_1, mut rx_1) = registry.attach().await;
    let (conn_2, mut rx_2) = registry.attach().await;
    let (_anon, mut rx_3) = registry.attach().await;
    registry.register("u1", conn_1).await;
    registry.register("u2", conn_2).await;

    let outcome = dispatcher.dispatch(None, "maintenance").await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Broadcast { connections: 3 });

    for rx in [&mut rx_1, &mut rx_2, &mut rx_3] {
        let ServerEvent::AdminNotification(notification) = rx.try_recv().unwrap();
        assert_eq!(notification.message, "maintenance");
        assert!(rx.try_recv().is_err());
    }
}

/// A second connection registering the same user steals targeted delivery;
/// the first connection stays open and still receives broadcasts.
#[tokio::test]
async fn second_registration_steals_targeted_but_not_broadcast() {
    let registry = ConnectionRegistry::new();
    let dispatcher = Dispatcher::new(registry.clone());

    let (first_tab, mut rx_first) = registry.attach().await;
    let (second_tab, mut rx_second) = registry.attach().await;
    registry.register("u1", first_tab).await;
    registry.register("u1", second_tab).await;

    dispatcher.dispatch(Some("u1"), "targeted").await.unwrap();
    assert!(rx_first.try_recv().is_err());
    let ServerEvent::AdminNotification(notification) = rx_second.try_recv().unwrap();
    assert_eq!(notification.message, "targeted");

    let outcome = dispatcher.dispatch(None, "broadcast").await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Broadcast { connections: 2 });
    assert!(rx_first.try_recv().is_ok());
    assert!(rx_second.try_recv().is_ok());
}

#[actix_web::test]
async fn dispatch_endpoint_reports_target_not_connected() {
    let registry = ConnectionRegistry::new();
    let dispatcher = Dispatcher::new(registry.clone());

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(registry))
            .app_data(web::Data::new(dispatcher))
            .configure(handlers::register_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/notifications/dispatch")
        .set_json(json!({"userId": "ghost", "message": "hello"}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
}

#[actix_web::test]
async fn dispatch_endpoint_delivers_to_bound_connection() {
    let registry = ConnectionRegistry::new();
    let dispatcher = Dispatcher::new(registry.clone());
    let (conn_id, mut rx) = registry.attach().await;
    registry.register("u1", conn_id).await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(registry))
            .app_data(web::Data::new(dispatcher))
            .configure(handlers::register_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/notifications/dispatch")
        .set_json(json!({"userId": "u1", "message": "invoice ready"}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["delivered"], true);

    let ServerEvent::AdminNotification(notification) = rx.try_recv().unwrap();
    assert_eq!(notification.message, "invoice ready");
}

#[actix_web::test]
async fn dispatch_endpoint_reports_broadcast_count() {
    let registry = ConnectionRegistry::new();
    let dispatcher = Dispatcher::new(registry.clone());
    let (_c1, _rx1) = registry.attach().await;
    let (_c2, _rx2) = registry.attach().await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(registry))
            .app_data(web::Data::new(dispatcher))
            .configure(handlers::register_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/notifications/dispatch")
        .set_json(json!({"message": "planned downtime"}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["broadcastCount"], 2);
}

#[actix_web::test]
async fn dispatch_endpoint_rejects_empty_message() {
    let registry = ConnectionRegistry::new();
    let dispatcher = Dispatcher::new(registry.clone());

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(registry))
            .app_data(web::Data::new(dispatcher))
            .configure(handlers::register_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/notifications/dispatch")
        .set_json(json!({"message": "   "}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn status_endpoint_tracks_registration() {
    let registry = ConnectionRegistry::new();
    let dispatcher = Dispatcher::new(registry.clone());
    let (conn_id, _rx) = registry.attach().await;
    registry.register("u1", conn_id).await;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(registry))
            .app_data(web::Data::new(dispatcher))
            .configure(handlers::register_routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/v1/notifications/status/u1")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["connected"], true);

    let req = test::TestRequest::get()
        .uri("/api/v1/notifications/status/u2")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["connected"], false);

    let req = test::TestRequest::get()
        .uri("/api/v1/notifications/stats")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["openConnections"], 1);
    assert_eq!(body["registeredUsers"], 1);
}
