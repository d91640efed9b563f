mod test_support;

use serde_json::json;
use test_support::{connect_memory, error_code, request_err, request_ok, requests_sent, spawn_sidecar};

fn items(v: &serde_json::Value) -> &Vec<serde_json::Value> {
    v.get("items").and_then(|v| v.as_array()).expect("items")
}

#[test]
fn paginated_lists_are_followed_cached_and_invalidated() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "session.connect",
        json!({ "backend": "memory", "role": "admin", "envelope": "paginated", "pageSize": 2 }),
    );
    for i in 1..=5 {
        let created = request_ok(
            &mut stdin,
            &mut reader,
            &format!("n{}", i),
            "resources.create",
            json!({ "resource": "notices", "data": { "title": format!("Notice {}", i) } }),
        );
        assert_eq!(created.pointer("/item/id").and_then(|v| v.as_i64()), Some(i));
    }

    let sent = requests_sent(&mut stdin, &mut reader, "2");
    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "resources.list",
        json!({ "resource": "notices" }),
    );
    assert_eq!(listed.get("count").and_then(|v| v.as_u64()), Some(5));
    assert_eq!(
        items(&listed)
            .iter()
            .map(|v| v.get("id").and_then(|v| v.as_i64()).unwrap_or_default())
            .collect::<Vec<_>>(),
        vec![1, 2, 3, 4, 5]
    );
    assert_eq!(requests_sent(&mut stdin, &mut reader, "4"), sent + 3);

    let cached = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "resources.list",
        json!({ "resource": "notices" }),
    );
    assert_eq!(cached.get("cacheSeq"), listed.get("cacheSeq"));
    assert_eq!(requests_sent(&mut stdin, &mut reader, "6"), sent + 3);

    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "resources.update",
        json!({ "resource": "notices", "id": 2, "data": { "title": "Sports day moved" } }),
    );
    assert_eq!(
        updated.pointer("/item/title").and_then(|v| v.as_str()),
        Some("Sports day moved")
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "resources.delete",
        json!({ "resource": "notices", "id": 1 }),
    );

    let fresh = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "resources.list",
        json!({ "resource": "notices" }),
    );
    assert_eq!(fresh.get("count").and_then(|v| v.as_u64()), Some(4));
    assert_eq!(
        items(&fresh)[0].get("title").and_then(|v| v.as_str()),
        Some("Sports day moved")
    );

    let missing = request_err(
        &mut stdin,
        &mut reader,
        "10",
        "resources.delete",
        json!({ "resource": "notices", "id": 99 }),
    );
    assert_eq!(error_code(&missing), "http_error");
    assert_eq!(missing.get("message").and_then(|v| v.as_str()), Some("Not found."));
    assert_eq!(missing.pointer("/details/status").and_then(|v| v.as_u64()), Some(404));
}

#[test]
fn resource_names_and_payloads_are_checked() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = connect_memory(&mut stdin, &mut reader, "1", "admin", "principal");

    let unknown = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "resources.list",
        json!({ "resource": "spaceships" }),
    );
    assert_eq!(error_code(&unknown), "bad_params");
    assert!(unknown
        .pointer("/details/known")
        .and_then(|v| v.as_array())
        .map(|a| a.iter().any(|n| n.as_str() == Some("library_books")))
        .unwrap_or(false));

    let no_data = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "resources.create",
        json!({ "resource": "students", "data": [1, 2] }),
    );
    assert_eq!(error_code(&no_data), "bad_params");

    // Dashed and dotted spellings name the same collection.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "resources.create",
        json!({ "resource": "library-books", "data": { "title": "Dune" } }),
    );
    let books = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "resources.list",
        json!({ "resource": "library.books" }),
    );
    assert_eq!(books.get("resource").and_then(|v| v.as_str()), Some("library_books"));
    assert_eq!(books.get("count").and_then(|v| v.as_u64()), Some(1));
}

#[test]
fn roles_limit_what_can_be_read_and_written() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = connect_memory(&mut stdin, &mut reader, "1", "teacher", "t.mehta");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "resources.create",
        json!({ "resource": "attendance", "data": { "student": 1, "status": "present" } }),
    );
    let users = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "resources.create",
        json!({ "resource": "users", "data": { "username": "x" } }),
    );
    assert_eq!(error_code(&users), "forbidden");

    let _ = connect_memory(&mut stdin, &mut reader, "4", "student", "asha");
    let notices = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "resources.list",
        json!({ "resource": "notices" }),
    );
    assert_eq!(notices.get("count").and_then(|v| v.as_u64()), Some(0));
    let students = request_err(
        &mut stdin,
        &mut reader,
        "6",
        "resources.list",
        json!({ "resource": "students" }),
    );
    assert_eq!(error_code(&students), "forbidden");
    let write = request_err(
        &mut stdin,
        &mut reader,
        "7",
        "resources.create",
        json!({ "resource": "notices", "data": { "title": "x" } }),
    );
    assert_eq!(error_code(&write), "forbidden");
}
