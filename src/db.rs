use crate::drafts::QueuedResult;
use crate::model::EntityRef;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE: &str = "schoold.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let conn = Connection::open(workspace.join(DB_FILE))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS queued_results(
            id TEXT PRIMARY KEY,
            student_json TEXT NOT NULL,
            subject_json TEXT,
            exam_json TEXT NOT NULL,
            class_json TEXT NOT NULL,
            marks_obtained REAL NOT NULL,
            total_marks REAL,
            remarks TEXT,
            created_at TEXT NOT NULL,
            last_error TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_queued_results_created ON queued_results(created_at)",
        [],
    )?;

    Ok(conn)
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(conn: &Connection, key: &str, value: &serde_json::Value) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

// Keys are stored as JSON so integer ids and names survive the round trip.
fn ref_to_sql(r: &EntityRef) -> anyhow::Result<String> {
    Ok(serde_json::to_string(r)?)
}

fn ref_from_sql(s: &str) -> Option<EntityRef> {
    serde_json::from_str(s).ok()
}

pub fn drafts_insert(conn: &Connection, d: &QueuedResult) -> anyhow::Result<()> {
    let subject = match &d.subject {
        Some(s) => Some(ref_to_sql(s)?),
        None => None,
    };
    conn.execute(
        "INSERT INTO queued_results(
            id, student_json, subject_json, exam_json, class_json,
            marks_obtained, total_marks, remarks, created_at, last_error
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &d.id,
            ref_to_sql(&d.student)?,
            subject,
            ref_to_sql(&d.exam)?,
            ref_to_sql(&d.class_name)?,
            d.marks_obtained,
            d.total_marks,
            &d.remarks,
            &d.created_at,
            &d.last_error,
        ),
    )?;
    Ok(())
}

/// Drafts in the order they were queued. Rows whose keys no longer decode
/// are skipped.
pub fn drafts_list(conn: &Connection) -> anyhow::Result<Vec<QueuedResult>> {
    let mut stmt = conn.prepare(
        "SELECT id, student_json, subject_json, exam_json, class_json,
                marks_obtained, total_marks, remarks, created_at, last_error
         FROM queued_results
         ORDER BY created_at, rowid",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, Option<String>>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, String>(4)?,
                r.get::<_, f64>(5)?,
                r.get::<_, Option<f64>>(6)?,
                r.get::<_, Option<String>>(7)?,
                r.get::<_, String>(8)?,
                r.get::<_, Option<String>>(9)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut out = Vec::with_capacity(rows.len());
    for (id, student, subject, exam, class, marks, total, remarks, created_at, last_error) in rows {
        let (Some(student), Some(exam), Some(class_name)) =
            (ref_from_sql(&student), ref_from_sql(&exam), ref_from_sql(&class))
        else {
            tracing::warn!(draft = %id, "skipping draft with unreadable keys");
            continue;
        };
        out.push(QueuedResult {
            id,
            student,
            subject: subject.as_deref().and_then(ref_from_sql),
            exam,
            class_name,
            marks_obtained: marks,
            total_marks: total,
            remarks,
            created_at,
            last_error,
        });
    }
    Ok(out)
}

pub fn drafts_delete(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let n = conn.execute("DELETE FROM queued_results WHERE id = ?", [id])?;
    Ok(n > 0)
}

pub fn drafts_set_error(conn: &Connection, id: &str, error: Option<&str>) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE queued_results SET last_error = ? WHERE id = ?",
        (error, id),
    )?;
    Ok(())
}

pub fn drafts_count(conn: &Connection) -> anyhow::Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM queued_results", [], |r| r.get(0))?)
}
