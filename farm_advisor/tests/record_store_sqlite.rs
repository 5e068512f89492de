use chrono::{Duration, NaiveDate};
use diesel::prelude::*;
use farm_advisor::{
    db::connection::connect_sqlite,
    records::{
        AnalysisQuery, AnalysisStore, ChangeSource, ProfileStore, RecordTable, SoilQuery, SoilStore, SortOrder,
        StoreError,
    },
    schema::soil_data,
    soil::SoilMeasurements,
    tz::DayRange,
};

mod common;

#[test]
fn connections_apply_pragmas() {
    let (db, mut conn) = common::setup_db();
    common::assert_sqlite_pragmas(&mut conn);

    let mut second = connect_sqlite(&db.path).expect("connect second");
    common::assert_sqlite_pragmas(&mut second);
}

#[tokio::test]
async fn soil_rows_round_trip_with_recommendations() {
    let (_db, store) = common::setup_store();
    let alice = common::session("alice");
    let recs = vec!["Add lime to raise pH levels.".to_string()];

    let saved = store
        .insert_soil(&alice, &common::soil_sample("North field", "Clay"), &recs, common::ts(2025, 3, 1, 9))
        .await
        .unwrap();
    assert!(saved.id > 0);
    assert_eq!(saved.user_id, "alice");
    assert_eq!(saved.recommendations, recs);
    assert_eq!(saved.measurements, SoilMeasurements::midpoint());

    let listed = store.query_soil(&alice, &SoilQuery::default()).await.unwrap();
    assert_eq!(listed, vec![saved]);
}

#[tokio::test]
async fn queries_only_see_the_callers_rows() {
    let (_db, store) = common::setup_store();
    let alice = common::session("alice");
    let bob = common::session("bob");

    store
        .insert_soil(&alice, &common::soil_sample("A", "Loamy"), &[], common::ts(2025, 3, 1, 9))
        .await
        .unwrap();
    store
        .insert_soil(&bob, &common::soil_sample("B", "Sandy"), &[], common::ts(2025, 3, 1, 10))
        .await
        .unwrap();
    store
        .insert_analysis(&bob, &common::analysis("bob/1.jpg", common::ts(2025, 3, 1, 11)))
        .await
        .unwrap();

    let alice_soil = store.query_soil(&alice, &SoilQuery::default()).await.unwrap();
    assert_eq!(alice_soil.len(), 1);
    assert_eq!(alice_soil[0].location, "A");
    assert!(store.query_analyses(&alice, &AnalysisQuery::default()).await.unwrap().is_empty());
    assert_eq!(store.query_analyses(&bob, &AnalysisQuery::default()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn ordering_filters_and_limit() {
    let (_db, store) = common::setup_store();
    let alice = common::session("alice");
    for (day, location, soil_type) in [(1, "A", "Clay"), (3, "B", "Clay"), (2, "A", "Sandy")] {
        store
            .insert_soil(&alice, &common::soil_sample(location, soil_type), &[], common::ts(2025, 3, day, 8))
            .await
            .unwrap();
    }

    let newest_first = store.query_soil(&alice, &SoilQuery::default()).await.unwrap();
    let days: Vec<_> = newest_first.iter().map(|s| s.recorded_at.format("%d").to_string()).collect();
    assert_eq!(days, ["03", "02", "01"]);

    let oldest_first = store
        .query_soil(
            &alice,
            &SoilQuery {
                order: SortOrder::Asc,
                limit: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(oldest_first.len(), 2);
    assert_eq!(oldest_first[0].recorded_at, common::ts(2025, 3, 1, 8));

    let clay_at_a = store
        .query_soil(
            &alice,
            &SoilQuery {
                location: Some("A".into()),
                soil_type: Some("Clay".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(clay_at_a.len(), 1);
}

#[tokio::test]
async fn date_range_is_inclusive_of_whole_days() {
    let (_db, store) = common::setup_store();
    let alice = common::session("alice");
    let start = common::ts(2025, 3, 2, 0);
    for at in [
        start - Duration::milliseconds(1),
        start,
        common::ts(2025, 3, 3, 23) + Duration::minutes(59) + Duration::seconds(59),
        common::ts(2025, 3, 4, 0),
    ] {
        store
            .insert_analysis(&alice, &common::analysis(&format!("alice/{}.jpg", at.timestamp_millis()), at))
            .await
            .unwrap();
    }

    let range = DayRange::local(
        NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(),
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
        chrono_tz::UTC,
    )
    .unwrap();
    let hits = store
        .query_analyses(
            &alice,
            &AnalysisQuery {
                range: Some(range),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|r| range.contains(r.created_at)));
}

#[tokio::test]
async fn invalid_values_are_rejected_before_insert() {
    let (db, store) = common::setup_store();
    let alice = common::session("alice");

    let mut sample = common::soil_sample("A", "Loamy");
    sample.measurements.ph = f64::NAN;
    let err = store
        .insert_soil(&alice, &sample, &[], common::ts(2025, 3, 1, 9))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Invalid(_)), "{err}");

    let mut record = common::analysis("alice/x.jpg", common::ts(2025, 3, 1, 9));
    record.confidence = 1.5;
    assert!(matches!(
        store.insert_analysis(&alice, &record).await,
        Err(StoreError::Invalid(_))
    ));

    let mut conn = connect_sqlite(&db.path).unwrap();
    let count: i64 = soil_data::table.count().get_result(&mut conn).unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn duplicate_file_path_is_a_database_error() {
    let (_db, store) = common::setup_store();
    let alice = common::session("alice");
    let record = common::analysis("alice/dup.jpg", common::ts(2025, 3, 1, 9));

    store.insert_analysis(&alice, &record).await.unwrap();
    let err = store.insert_analysis(&alice, &record).await.unwrap_err();
    assert!(matches!(err, StoreError::Database(_)), "{err}");
}

#[tokio::test]
async fn ensure_profile_is_idempotent() {
    let (_db, store) = common::setup_store();
    let mut user = common::user("alice");
    user.name = Some("Alice".into());

    let first = store.ensure_profile(&user, None).await.unwrap();
    assert_eq!(first.name, "Alice");
    assert_eq!(first.email, "alice@farm.test");

    let again = store.ensure_profile(&user, Some("Someone Else")).await.unwrap();
    assert_eq!(again, first);

    assert_eq!(store.get_profile("alice").await.unwrap(), Some(first));
    assert_eq!(store.get_profile("nobody").await.unwrap(), None);
}

#[tokio::test]
async fn inserts_publish_changes() {
    let (_db, store) = common::setup_store();
    let mut rx = store.subscribe();
    let alice = common::session("alice");

    let saved = store
        .insert_analysis(&alice, &common::analysis("alice/1.jpg", common::ts(2025, 3, 1, 9)))
        .await
        .unwrap();

    let change = rx.recv().await.unwrap();
    assert_eq!(change.table, RecordTable::Crops);
    assert_eq!(change.user_id, "alice");
    assert_eq!(change.id, saved.id);
}
