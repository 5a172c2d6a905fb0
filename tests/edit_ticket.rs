pub mod common;

use axum::http::StatusCode;
use serde_json::json;
use ticket_tracker::api;

#[tokio::test]
async fn closes_ticket() {
    let client = common::Client::new();
    let ticket = client.add_simple_ticket("Ticket 1", "Description 1").await;

    let res = client
        .edit_ticket(ticket.id, json!({ "status": "Closed" }))
        .await
        .unwrap();
    assert_eq!(res.message, "Ticket updated successfully");
    assert_eq!(res.ticket.status, api::ticket::Status::Closed);

    let found = client.get_ticket(ticket.id).await.unwrap();
    assert_eq!(found.status, api::ticket::Status::Closed);
    assert!(found.updated_at > ticket.updated_at);
    assert_eq!(found.created_at, ticket.created_at);
    assert_eq!(found.title, ticket.title);
    assert_eq!(found.description, ticket.description);
    assert_eq!(found.priority, ticket.priority);
}

#[tokio::test]
async fn walks_whole_lifecycle_and_reopens() {
    let client = common::Client::new();
    let ticket = client.add_simple_ticket("Ticket 1", "Description 1").await;

    let mut updated_at = ticket.updated_at;
    for status in ["In Progress", "Closed", "Open"] {
        let res = client
            .edit_ticket(ticket.id, json!({ "status": status }))
            .await
            .unwrap();
        assert_eq!(res.ticket.status.to_string(), status);
        assert!(res.ticket.updated_at > updated_at);
        updated_at = res.ticket.updated_at;
    }
}

#[tokio::test]
async fn jumps_straight_from_open_to_closed() {
    let client = common::Client::new();
    let ticket = client.add_simple_ticket("Ticket 1", "Description 1").await;

    let res = client
        .edit_ticket(ticket.id, json!({ "status": "Closed" }))
        .await
        .unwrap();
    assert_eq!(res.ticket.status, api::ticket::Status::Closed);
}

#[tokio::test]
async fn edits_several_fields_at_once() {
    let client = common::Client::new();
    let ticket = client.add_simple_ticket("Ticket 1", "Description 1").await;

    let res = client
        .edit_ticket(
            ticket.id,
            json!({
                "title": "Title 2",
                "description": "Description 2",
                "priority": "Medium",
            }),
        )
        .await
        .unwrap();

    assert_eq!(res.ticket.title, "Title 2");
    assert_eq!(res.ticket.description, "Description 2");
    assert_eq!(res.ticket.priority, api::ticket::Priority::Medium);
    assert_eq!(res.ticket.status, api::ticket::Status::Open);
}

#[tokio::test]
async fn rejects_whole_update_on_unknown_priority() {
    let client = common::Client::new();
    let ticket = client.add_simple_ticket("Ticket 1", "Description 1").await;

    let err = client
        .edit_ticket(
            ticket.id,
            json!({
                "title": "Title 2",
                "status": "Closed",
                "priority": "Urgent",
            }),
        )
        .await
        .unwrap_err();
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        err.messages,
        [r#""priority" must be one of [Low, Medium, High]"#],
    );

    let found = client.get_ticket(ticket.id).await.unwrap();
    assert_eq!(found, ticket);
}

#[tokio::test]
async fn rejects_explicit_empty_title() {
    let client = common::Client::new();
    let ticket = client.add_simple_ticket("Ticket 1", "Description 1").await;

    let err = client
        .edit_ticket(ticket.id, json!({ "title": "" }))
        .await
        .unwrap_err();
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
    assert_eq!(err.messages, [r#""title" is not allowed to be empty"#]);

    let found = client.get_ticket(ticket.id).await.unwrap();
    assert_eq!(found, ticket);
}

#[tokio::test]
async fn fails_when_ticket_is_unknown() {
    let client = common::Client::new();
    let ticket = client.add_simple_ticket("Ticket 1", "Description 1").await;

    let err = client
        .edit_ticket(api::ticket::Id::from(42), json!({ "status": "Closed" }))
        .await
        .unwrap_err();
    assert_eq!(err.status, StatusCode::NOT_FOUND);
    assert_eq!(err.messages, ["Ticket not found"]);

    let list = client.get_tickets(None).await.unwrap();
    assert_eq!(list.tickets, [ticket]);
}

#[tokio::test]
async fn reports_unknown_ticket_before_invalid_body() {
    let client = common::Client::new();

    let err = client
        .edit_ticket(api::ticket::Id::from(42), json!({ "priority": "Urgent" }))
        .await
        .unwrap_err();
    assert_eq!(err.status, StatusCode::NOT_FOUND);
    assert_eq!(err.messages, ["Ticket not found"]);

    let err = client
        .edit_ticket("not-a-uuid", json!({ "title": 42 }))
        .await
        .unwrap_err();
    assert_eq!(err.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rejects_mistyped_fields() {
    let client = common::Client::new();
    let ticket = client.add_simple_ticket("Ticket 1", "Description 1").await;

    let err = client
        .edit_ticket(ticket.id, json!({ "title": 42, "status": "Closed" }))
        .await
        .unwrap_err();
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
    assert_eq!(err.messages, [r#""title" must be a string"#]);

    let found = client.get_ticket(ticket.id).await.unwrap();
    assert_eq!(found, ticket);
}

#[tokio::test]
async fn repeated_update_is_idempotent() {
    let client = common::Client::new();
    let ticket = client.add_simple_ticket("Ticket 1", "Description 1").await;
    let changes = json!({ "status": "In Progress", "priority": "High" });

    let first = client
        .edit_ticket(ticket.id, changes.clone())
        .await
        .unwrap()
        .ticket;
    let second = client.edit_ticket(ticket.id, changes).await.unwrap().ticket;

    assert_eq!(
        api::Ticket {
            updated_at: first.updated_at,
            ..second
        },
        first,
    );
}
