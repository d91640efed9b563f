mod test_support;

use serde_json::json;
use std::io::BufReader;
use std::process::{ChildStdin, ChildStdout};
use test_support::{connect_memory, error_code, request_err, request_ok, spawn_sidecar};

fn count(v: &serde_json::Value) -> u64 {
    v.get("count").and_then(|v| v.as_u64()).expect("count")
}

/// Admin fills the backend, then the same backend is handed to a student.
fn seed_as_admin(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>) {
    let _ = connect_memory(stdin, reader, "admin", "admin", "principal");
    let entries = [
        json!({ "student": "asha", "subject": "Maths", "exam": 1, "class": "10A", "marksObtained": 45, "totalMarks": 50 }),
        json!({ "student": "ravi", "subject": "Maths", "exam": 1, "class": "10A", "marksObtained": 30, "totalMarks": 50 }),
        json!({ "student": "asha", "subject": "Maths", "exam": 2, "class": "10A", "marksObtained": 20, "totalMarks": 50 }),
        json!({ "student": "ravi", "subject": "Maths", "exam": 2, "class": "10A", "marksObtained": 25, "totalMarks": 50 }),
    ];
    for (i, e) in entries.iter().enumerate() {
        let _ = request_ok(stdin, reader, &format!("seed-{}", i), "results.create", e.clone());
    }
    // Exam 1 approved, exam 2 rejected for ravi and still pending for asha.
    let _ = request_ok(
        stdin,
        reader,
        "approve",
        "results.approve",
        json!({ "exam": 1, "class": "10A", "action": "approve" }),
    );
    let _ = request_ok(
        stdin,
        reader,
        "reject",
        "results.setStatus",
        json!({ "id": 4, "status": "rejected" }),
    );
    for (resource, data) in [
        ("notices", json!({ "title": "Exam week" })),
        ("students", json!({ "name": "Asha Rao" })),
        ("hostels", json!({ "name": "North Block" })),
    ] {
        let _ = request_ok(
            stdin,
            reader,
            &format!("res-{}", resource),
            "resources.create",
            json!({ "resource": resource, "data": data }),
        );
    }
    let _ = request_ok(
        stdin,
        reader,
        "as-student",
        "session.connect",
        json!({ "backend": "memory", "role": "student", "user": "asha", "keepData": true }),
    );
}

#[test]
fn student_reads_only_their_own_approved_results() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    seed_as_admin(&mut stdin, &mut reader);

    let listed = request_ok(&mut stdin, &mut reader, "1", "results.list", json!({}));
    assert_eq!(count(&listed), 1);
    let row = &listed["results"][0];
    assert_eq!(row.get("student").and_then(|v| v.as_str()), Some("asha"));
    assert_eq!(row.get("status").and_then(|v| v.as_str()), Some("approved"));

    for status in ["pending_approval", "rejected"] {
        let filtered = request_ok(
            &mut stdin,
            &mut reader,
            &format!("2-{}", status),
            "results.list",
            json!({ "status": status, "refresh": true }),
        );
        assert_eq!(count(&filtered), 0, "{} leaked: {}", status, filtered);
    }

    let own = request_ok(&mut stdin, &mut reader, "3", "results.forStudent", json!({}));
    assert_eq!(count(&own), 1);
    let other = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "results.forStudent",
        json!({ "student": "ravi" }),
    );
    assert_eq!(error_code(&other), "forbidden");

    let review = request_err(&mut stdin, &mut reader, "5", "results.reviewGroups", json!({}));
    assert_eq!(error_code(&review), "forbidden");
}

#[test]
fn student_resource_reads_follow_the_role_rules() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    seed_as_admin(&mut stdin, &mut reader);

    let notices = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "resources.list",
        json!({ "resource": "notices" }),
    );
    assert_eq!(count(&notices), 1);

    for resource in ["students", "hostels", "library_fines"] {
        let e = request_err(
            &mut stdin,
            &mut reader,
            &format!("2-{}", resource),
            "resources.list",
            json!({ "resource": resource }),
        );
        assert_eq!(error_code(&e), "forbidden", "{}", resource);
    }
}

#[test]
fn reconnecting_without_keep_data_starts_empty() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    seed_as_admin(&mut stdin, &mut reader);

    let _ = connect_memory(&mut stdin, &mut reader, "1", "admin", "principal");
    let listed = request_ok(&mut stdin, &mut reader, "2", "results.list", json!({}));
    assert_eq!(count(&listed), 0);
}

#[test]
fn hostel_writes_need_an_admin() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = connect_memory(&mut stdin, &mut reader, "1", "teacher", "t.mehta");
    let e = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "resources.create",
        json!({ "resource": "hostel_rooms", "data": { "number": "101" } }),
    );
    assert_eq!(error_code(&e), "forbidden");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "resources.create",
        json!({ "resource": "library_fines", "data": { "amount": 20 } }),
    );
}
