//! Storage layer tests for the `EventHub` server.

use super::db::EventDatabase;
use super::models::{QrArtifact, QrOwner};
use super::queries::{NewEvent, NewUser};
use super::queries_hackathon::AttendanceMark;
use eventhub_core::db::unix_timestamp_millis;

async fn test_db() -> EventDatabase {
    EventDatabase::open_in_memory().await.unwrap()
}

async fn seed_user(db: &EventDatabase, id: &str, role: &str) {
    db.create_user(&NewUser {
        id,
        external_id: &format!("ext-{id}"),
        name: id,
        email: &format!("{id}@uni.example.edu"),
        role,
    })
    .await
    .unwrap();
}

async fn seed_event(db: &EventDatabase) {
    seed_user(db, "admin", "admin").await;
    db.create_event(&NewEvent {
        id: "e1",
        title: "Rust Workshop",
        description: "Ownership and borrowing",
        venue: Some("Hall A"),
        starts_at: 1_800_000_000_000,
        created_by: "admin",
    })
    .await
    .unwrap();
}

/// Hackathon h1 with team t1, member m1 (user s1) and schedule sch1.
async fn seed_hackathon(db: &EventDatabase) {
    seed_user(db, "admin", "admin").await;
    seed_user(db, "s1", "student").await;
    db.create_hackathon("h1", "Spring Hack", 1_800_000_000_000, "admin")
        .await
        .unwrap();
    db.create_team("t1", "h1", "Crabs").await.unwrap();
    db.add_team_member("m1", "t1", "s1").await.unwrap();
    db.create_schedule("sch1", "h1", "Day 1 morning", 1_800_000_000_000)
        .await
        .unwrap();
}

fn artifact(tag: &str) -> QrArtifact {
    QrArtifact {
        qr_code: format!("png-{tag}"),
        qr_code_data: format!("data-{tag}"),
    }
}

// === User tests ===

#[tokio::test]
async fn create_and_get_user() {
    let db = test_db().await;
    seed_user(&db, "u1", "student").await;

    let user = db.get_user("u1").await.unwrap();
    assert_eq!(user.external_id, "ext-u1");
    assert_eq!(user.role, "student");
    assert!(user.qr_artifact().is_none());

    let by_ext = db.get_user_by_external_id("ext-u1").await.unwrap();
    assert_eq!(by_ext.id, "u1");

    assert!(db.get_user("nobody").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn duplicate_external_id_is_conflict() {
    let db = test_db().await;
    seed_user(&db, "u1", "student").await;

    let err = db
        .create_user(&NewUser {
            id: "u2",
            external_id: "ext-u1",
            name: "dup",
            email: "dup@uni.example.edu",
            role: "student",
        })
        .await
        .unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn unknown_role_is_rejected() {
    let db = test_db().await;
    let result = db
        .create_user(&NewUser {
            id: "u1",
            external_id: "ext-u1",
            name: "x",
            email: "x@uni.example.edu",
            role: "superuser",
        })
        .await;
    assert!(result.is_err());
}

// === Registration tests ===

#[tokio::test]
async fn register_and_mark_attended_once() {
    let db = test_db().await;
    seed_event(&db).await;
    seed_user(&db, "u1", "student").await;

    let reg = db.register_for_event("r1", "u1", "e1").await.unwrap();
    assert!(!reg.attended);
    assert!(reg.checked_in_at.is_none());

    let first = db
        .mark_registration_attended("u1", "e1", 1_000, "admin")
        .await
        .unwrap();
    assert!(first);

    let second = db
        .mark_registration_attended("u1", "e1", 2_000, "admin")
        .await
        .unwrap();
    assert!(!second);

    let reg = db.get_registration("u1", "e1").await.unwrap().unwrap();
    assert!(reg.attended);
    assert_eq!(reg.checked_in_at, Some(1_000));
    assert_eq!(reg.checked_in_by.as_deref(), Some("admin"));
}

#[tokio::test]
async fn earlier_check_in_time_wins_when_committed_second() {
    let db = test_db().await;
    seed_event(&db).await;
    seed_user(&db, "u1", "student").await;
    db.register_for_event("r1", "u1", "e1").await.unwrap();

    let later = db
        .mark_registration_attended("u1", "e1", 2_000, "desk-b")
        .await
        .unwrap();
    let earlier = db
        .mark_registration_attended("u1", "e1", 1_000, "desk-a")
        .await
        .unwrap();
    assert!(later);
    assert!(!earlier);

    let reg = db.get_registration("u1", "e1").await.unwrap().unwrap();
    assert!(reg.attended);
    assert_eq!(reg.checked_in_at, Some(1_000));
    assert_eq!(reg.checked_in_by.as_deref(), Some("desk-a"));
}

#[tokio::test]
async fn duplicate_registration_is_conflict() {
    let db = test_db().await;
    seed_event(&db).await;
    seed_user(&db, "u1", "student").await;

    db.register_for_event("r1", "u1", "e1").await.unwrap();
    let err = db.register_for_event("r2", "u1", "e1").await.unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn mark_without_registration_changes_nothing() {
    let db = test_db().await;
    seed_event(&db).await;
    seed_user(&db, "u1", "student").await;

    let flipped = db
        .mark_registration_attended("u1", "e1", 1_000, "admin")
        .await
        .unwrap();
    assert!(!flipped);
    assert!(db.get_registration("u1", "e1").await.unwrap().is_none());
}

// === QR artifact tests ===

#[tokio::test]
async fn set_qr_if_absent_only_writes_once() {
    let db = test_db().await;
    seed_user(&db, "u1", "student").await;

    assert!(
        db.set_qr_if_absent(QrOwner::User, "u1", &artifact("a"))
            .await
            .unwrap()
    );
    assert!(
        !db.set_qr_if_absent(QrOwner::User, "u1", &artifact("b"))
            .await
            .unwrap()
    );

    let user = db.get_user("u1").await.unwrap();
    assert_eq!(user.qr_artifact(), Some(artifact("a")));
}

#[tokio::test]
async fn replace_qr_overwrites_and_reports_missing_rows() {
    let db = test_db().await;
    seed_event(&db).await;

    db.set_qr_if_absent(QrOwner::Event, "e1", &artifact("a"))
        .await
        .unwrap();
    db.replace_qr(QrOwner::Event, "e1", &artifact("b"))
        .await
        .unwrap();
    assert_eq!(
        db.get_event("e1").await.unwrap().qr_artifact(),
        Some(artifact("b"))
    );

    let err = db
        .replace_qr(QrOwner::Event, "missing", &artifact("c"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn empty_qr_code_counts_as_absent() {
    let db = test_db().await;
    seed_user(&db, "u1", "student").await;

    db.replace_qr(
        QrOwner::User,
        "u1",
        &QrArtifact {
            qr_code: String::new(),
            qr_code_data: String::new(),
        },
    )
    .await
    .unwrap();
    assert!(db.get_user("u1").await.unwrap().qr_artifact().is_none());

    assert!(
        db.set_qr_if_absent(QrOwner::User, "u1", &artifact("a"))
            .await
            .unwrap()
    );
}

// === Hackathon tests ===

#[tokio::test]
async fn team_member_lookup_by_user() {
    let db = test_db().await;
    seed_hackathon(&db).await;

    let member = db.get_team_member_by_user("t1", "s1").await.unwrap();
    assert_eq!(member.id, "m1");
    assert!(
        db.get_team_member_by_user("t1", "admin")
            .await
            .unwrap_err()
            .is_not_found()
    );

    let team = db.get_team("t1").await.unwrap();
    assert_eq!(team.hackathon_id, "h1");
}

#[tokio::test]
async fn check_in_team_member_first_wins() {
    let db = test_db().await;
    seed_hackathon(&db).await;

    assert!(
        db.check_in_team_member("sch1", "m1", 1_000, "admin")
            .await
            .unwrap()
    );
    assert!(
        !db.check_in_team_member("sch1", "m1", 2_000, "admin")
            .await
            .unwrap()
    );

    let records = db.list_attendance("sch1").await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].is_present);
    assert_eq!(records[0].checked_in_at, Some(1_000));
}

#[tokio::test]
async fn team_member_check_in_keeps_earliest_time() {
    let db = test_db().await;
    seed_hackathon(&db).await;

    assert!(
        db.check_in_team_member("sch1", "m1", 2_000, "desk-b")
            .await
            .unwrap()
    );
    assert!(
        !db.check_in_team_member("sch1", "m1", 1_000, "desk-a")
            .await
            .unwrap()
    );

    let record = db.get_attendance("sch1", "m1").await.unwrap().unwrap();
    assert!(record.is_present);
    assert_eq!(record.checked_in_at, Some(1_000));
    assert_eq!(record.checked_in_by.as_deref(), Some("desk-a"));
}

#[tokio::test]
async fn check_in_flips_absent_record() {
    let db = test_db().await;
    seed_hackathon(&db).await;

    let mark = AttendanceMark {
        team_member_id: "m1".into(),
        is_present: false,
    };
    let record = db
        .upsert_attendance("sch1", &mark, 500, "admin")
        .await
        .unwrap();
    assert!(!record.is_present);
    assert!(record.checked_in_at.is_none());

    assert!(
        db.check_in_team_member("sch1", "m1", 1_000, "admin")
            .await
            .unwrap()
    );
    let record = db.get_attendance("sch1", "m1").await.unwrap().unwrap();
    assert!(record.is_present);
    assert_eq!(record.checked_in_at, Some(1_000));
}

#[tokio::test]
async fn manual_mark_overwrites_in_place() {
    let db = test_db().await;
    seed_hackathon(&db).await;

    let present = AttendanceMark {
        team_member_id: "m1".into(),
        is_present: true,
    };
    let first = db
        .upsert_attendance("sch1", &present, 1_000, "admin")
        .await
        .unwrap();

    let absent = AttendanceMark {
        team_member_id: "m1".into(),
        is_present: false,
    };
    let second = db
        .upsert_attendance("sch1", &absent, 2_000, "admin")
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert!(!second.is_present);
    assert_eq!(db.list_attendance("sch1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn bulk_mark_is_atomic() {
    let db = test_db().await;
    seed_hackathon(&db).await;
    seed_user(&db, "s2", "student").await;
    db.add_team_member("m2", "t1", "s2").await.unwrap();

    let now = unix_timestamp_millis();
    let written = db
        .upsert_attendance_bulk(
            "sch1",
            &[
                AttendanceMark {
                    team_member_id: "m1".into(),
                    is_present: true,
                },
                AttendanceMark {
                    team_member_id: "m2".into(),
                    is_present: false,
                },
            ],
            now,
            "admin",
        )
        .await
        .unwrap();
    assert_eq!(written, 2);
    assert_eq!(db.list_attendance("sch1").await.unwrap().len(), 2);

    // A dangling member id fails the foreign key and rolls back the batch.
    let result = db
        .upsert_attendance_bulk(
            "sch1",
            &[
                AttendanceMark {
                    team_member_id: "m1".into(),
                    is_present: false,
                },
                AttendanceMark {
                    team_member_id: "ghost".into(),
                    is_present: true,
                },
            ],
            now + 1,
            "admin",
        )
        .await;
    assert!(result.is_err());
    let m1 = db.get_attendance("sch1", "m1").await.unwrap().unwrap();
    assert!(m1.is_present);
}
