use serde_json::json;
use time::{OffsetDateTime, macros::datetime};
use uuid::Uuid;

use callmatch_domain::{PotentialMatch, RecordingDescriptor};
use callmatch_storage::{calls, db::Db, models::RecordingAttachment, unmatched};

async fn insert_call(db: &Db, lead_id: &str, started_at: OffsetDateTime) -> Uuid {
	sqlx::query_scalar(
		"INSERT INTO calls (lead_id, agent_name, started_at, duration_seconds) VALUES ($1,'Ann',$2,185) RETURNING call_id",
	)
	.bind(lead_id)
	.bind(started_at)
	.fetch_one(&db.pool)
	.await
	.expect("Failed to insert call.")
}

fn recording(recording_id: &str) -> RecordingDescriptor {
	RecordingDescriptor {
		recording_id: recording_id.to_string(),
		url: format!("https://cdn.example/{recording_id}.mp3"),
		started_at: datetime!(2025-01-15 10:30:00 UTC),
		ended_at: None,
		duration_seconds: 185,
		lead_id: Some("L1".to_string()),
		call_id: None,
		agent_name: Some("Ann".to_string()),
	}
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set CALLMATCH_PG_DSN to run."]
async fn attach_writes_a_recording_at_most_once() {
	let Some(base_dsn) = callmatch_testkit::env_dsn() else {
		eprintln!("Skipping; set CALLMATCH_PG_DSN to run this test.");

		return;
	};

	callmatch_testkit::with_test_db(&base_dsn, |test_db| {
		let dsn = test_db.dsn().to_string();

		async move {
			let cfg = callmatch_config::Postgres { dsn, pool_max_conns: 2 };
			let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

			db.ensure_schema().await.expect("Failed to ensure schema.");

			let older = insert_call(&db, "L1", datetime!(2025-01-15 09:00:00 UTC)).await;
			let newer = insert_call(&db, "L1", datetime!(2025-01-15 10:30:00 UTC)).await;
			let listed = calls::list_calls_for_lead(&db.pool, "L1").await.expect("Failed to list.");

			assert_eq!(listed.iter().map(|call| call.call_id).collect::<Vec<_>>(), vec![newer, older]);

			let now = OffsetDateTime::now_utc();
			let attachment = |url: &str| RecordingAttachment {
				call_id: newer,
				recording_url: url.to_string(),
				confidence: "exact".to_string(),
				score: 1.0,
				fingerprint: Some("l1_ann_2025-01-15t10:30:00_185".to_string()),
				match_metadata: json!({ "recording_id": "r-1", "tier": "exact" }),
				matched_at: now,
			};

			assert!(calls::attach_recording(&db.pool, &attachment("https://a")).await.expect("Attach."));
			assert!(!calls::attach_recording(&db.pool, &attachment("https://b")).await.expect("Attach."));

			let listed = calls::list_calls_for_lead(&db.pool, "L1").await.expect("Failed to list.");

			assert_eq!(listed[0].recording_url.as_deref(), Some("https://a"));
			assert_eq!(listed[0].recording_match_confidence.as_deref(), Some("exact"));
			assert_eq!(listed[0].metadata["recording_match"]["recording_id"], "r-1");

			Ok(())
		}
	})
	.await
	.expect("Test database run failed.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set CALLMATCH_PG_DSN to run."]
async fn unmatched_upsert_is_idempotent_and_keeps_review_state() {
	let Some(base_dsn) = callmatch_testkit::env_dsn() else {
		eprintln!("Skipping; set CALLMATCH_PG_DSN to run this test.");

		return;
	};

	callmatch_testkit::with_test_db(&base_dsn, |test_db| {
		let dsn = test_db.dsn().to_string();

		async move {
			let cfg = callmatch_config::Postgres { dsn, pool_max_conns: 2 };
			let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

			db.ensure_schema().await.expect("Failed to ensure schema.");

			let now = OffsetDateTime::now_utc();
			let potential = vec![PotentialMatch {
				call_id: Uuid::new_v4(),
				score: 0.42,
				start_diff_seconds: 120.0,
				duration_diff_seconds: 4,
			}];
			let first = unmatched::upsert_unmatched(&db.pool, None, &recording("r-9"), &[], now)
				.await
				.expect("Failed to upsert.");

			sqlx::query("UPDATE unmatched_recordings SET reviewed = true WHERE recording_id = 'r-9'")
				.execute(&db.pool)
				.await
				.expect("Failed to mark reviewed.");

			let second =
				unmatched::upsert_unmatched(&db.pool, None, &recording("r-9"), &potential, now)
					.await
					.expect("Failed to upsert.");

			assert_eq!(first, second);
			assert_eq!(unmatched::count_unreviewed(&db.pool).await.expect("Failed to count."), 0);

			unmatched::upsert_unmatched(&db.pool, Some("L7"), &recording("r-10"), &potential, now)
				.await
				.expect("Failed to upsert.");

			let rows = unmatched::list_unreviewed(&db.pool, 10).await.expect("Failed to list.");

			assert_eq!(rows.len(), 1);
			assert_eq!(rows[0].recording_id, "r-10");
			assert_eq!(rows[0].lead_id.as_deref(), Some("L1"));
			assert_eq!(rows[0].potential_matches.as_array().map(Vec::len), Some(1));
			assert_eq!(
				rows[0].end_time,
				Some(datetime!(2025-01-15 10:30:00 UTC) + time::Duration::seconds(185))
			);

			Ok(())
		}
	})
	.await
	.expect("Test database run failed.");
}
