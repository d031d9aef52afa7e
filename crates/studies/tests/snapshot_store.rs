mod common;

use chrono::{TimeZone, Utc};
use cohort_studies::{
    Aggregate, DocumentCodec, JsonCodec, Participant, ParticipantRepository, Recruitment,
    RecruitmentSnapshot, StagedParticipantGroup, StudyError, StudyInvitation, StudyRepository,
    StudySnapshot,
};
use cohort_studies::{SnapshotStore, Study};
use proptest::prelude::*;
use serde_json::{json, Value};
use uuid::Uuid;

use common::test_database;

#[tokio::test]
async fn study_round_trips_through_the_store() {
    let db = test_database().await;
    let studies = StudyRepository::new(db.pool.clone());

    let mut study = Study::new(Uuid::new_v4(), "Sleep quality");
    study.set_description(Some("Nightly questionnaires".to_string()));
    study.set_protocol(json!({ "name": "sleep", "tasks": [1, 2] })).unwrap();
    let stored = studies.add(study).await.unwrap();

    let loaded = studies.get_by_id(stored.id()).await.unwrap().unwrap();
    assert_eq!(loaded.snapshot(), stored.snapshot());
    assert_eq!(
        loaded.invitation().application_data,
        Some(stored.id().to_string())
    );
    assert!(studies.get_by_id(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn live_study_keeps_its_protocol_through_the_store() {
    let db = test_database().await;
    let studies = StudyRepository::new(db.pool.clone());

    let mut study = Study::new(Uuid::new_v4(), "Mobility");
    assert!(matches!(
        study.set_protocol(json!(null)),
        Err(StudyError::Validation { .. })
    ));
    assert!(study.go_live().is_err());

    study
        .set_protocol(json!({ "name": null, "tasks": [null, { "id": 1 }] }))
        .unwrap();
    study.go_live().unwrap();
    let stored = studies.add(study).await.unwrap();

    let loaded = studies.get_by_id(stored.id()).await.unwrap().unwrap();
    assert_eq!(loaded, stored);
    assert!(loaded.is_live());
    assert_eq!(
        loaded.protocol(),
        Some(&json!({ "name": null, "tasks": [null, { "id": 1 }] }))
    );
}

#[tokio::test]
async fn adding_a_study_twice_is_rejected() {
    let db = test_database().await;
    let studies = StudyRepository::new(db.pool.clone());
    let study = studies.add(Study::new(Uuid::new_v4(), "Steps")).await.unwrap();

    let error = studies.add(study.clone()).await.unwrap_err();
    assert!(matches!(error, StudyError::AlreadyExists { kind: "study", .. }));
    assert!(error.is_caller_error());
}

#[tokio::test]
async fn updating_a_missing_study_is_not_found() {
    let db = test_database().await;
    let studies = StudyRepository::new(db.pool.clone());

    let error = studies
        .update(&Study::new(Uuid::new_v4(), "Never stored"))
        .await
        .unwrap_err();
    assert!(matches!(error, StudyError::NotFound { kind: "study", .. }));
}

#[tokio::test]
async fn update_replaces_the_snapshot() {
    let db = test_database().await;
    let studies = StudyRepository::new(db.pool.clone());
    let mut study = studies.add(Study::new(Uuid::new_v4(), "Mood")).await.unwrap();

    study.set_invitation(StudyInvitation::new("Join the mood study"));
    study.set_protocol(json!({ "name": "mood" })).unwrap();
    study.go_live().unwrap();
    studies.update(&study).await.unwrap();

    let loaded = studies.get_by_id(study.id()).await.unwrap().unwrap();
    assert!(loaded.is_live());
    assert_eq!(loaded.invitation().name, "Join the mood study");
}

#[tokio::test]
async fn studies_are_listed_by_owner_and_by_ids() {
    let db = test_database().await;
    let studies = StudyRepository::new(db.pool.clone());
    let owner = Uuid::new_v4();

    let first = studies.add(Study::new(owner, "A")).await.unwrap();
    let other = studies.add(Study::new(Uuid::new_v4(), "B")).await.unwrap();
    let second = studies.add(Study::new(owner, "C")).await.unwrap();

    let owned: Vec<_> = studies
        .get_for_owner(owner)
        .await
        .unwrap()
        .iter()
        .map(Study::id)
        .collect();
    assert_eq!(owned, vec![first.id(), second.id()]);

    let found = studies
        .find_all_by_study_ids(&[other.id(), second.id(), Uuid::new_v4()])
        .await
        .unwrap();
    assert_eq!(found.len(), 2);
}

#[tokio::test]
async fn corrupt_snapshot_is_surfaced() {
    let db = test_database().await;
    let studies = StudyRepository::new(db.pool.clone());
    let study = studies.add(Study::new(Uuid::new_v4(), "Drift")).await.unwrap();

    sqlx::query("UPDATE studies SET snapshot = json_remove(snapshot, '$.name')")
        .execute(&db.pool)
        .await
        .unwrap();

    let error = studies.get_by_id(study.id()).await.unwrap_err();
    match &error {
        StudyError::CorruptSnapshot { kind, id, .. } => {
            assert_eq!(*kind, "study");
            assert_eq!(id, &study.id().to_string());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!error.is_caller_error());
}

#[tokio::test]
async fn one_recruitment_per_study() {
    let db = test_database().await;
    let participants = ParticipantRepository::new(db.pool.clone());
    let study_id = Uuid::new_v4();

    participants
        .add_recruitment(&Recruitment::new(study_id))
        .await
        .unwrap();
    let error = participants
        .add_recruitment(&Recruitment::new(study_id))
        .await
        .unwrap_err();
    assert!(matches!(error, StudyError::AlreadyExists { kind: "recruitment", .. }));

    let stored = participants.get_recruitment(study_id).await.unwrap().unwrap();
    assert_eq!(stored.study_id(), study_id);
}

#[tokio::test]
async fn concurrent_recruitment_adds_store_exactly_one() {
    let db = test_database().await;
    let participants = ParticipantRepository::new(db.pool.clone());
    let study_id = Uuid::new_v4();

    let first = Recruitment::new(study_id);
    let second = Recruitment::new(study_id);
    let (a, b) = tokio::join!(
        participants.add_recruitment(&first),
        participants.add_recruitment(&second)
    );

    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    for result in [a, b] {
        if let Err(error) = result {
            assert!(matches!(error, StudyError::AlreadyExists { .. }), "{error:?}");
        }
    }

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recruitments")
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn recruitment_lifecycle_and_deployment_ids() {
    let db = test_database().await;
    let studies = StudyRepository::new(db.pool.clone());
    let participants = ParticipantRepository::new(db.pool.clone());
    let study = studies.add(Study::new(Uuid::new_v4(), "Gait")).await.unwrap();

    assert!(studies.get_deployment_ids(study.id()).await.unwrap().is_empty());

    let mut recruitment = Recruitment::new(study.id());
    participants.add_recruitment(&recruitment).await.unwrap();

    let participant = recruitment.add_participant(Some("p@example.com".to_string()));
    let deployment = Uuid::new_v4();
    recruitment
        .add_participant_group(deployment, [participant])
        .unwrap();
    participants.update_recruitment(&recruitment).await.unwrap();

    let loaded = participants.get_recruitment(study.id()).await.unwrap().unwrap();
    assert_eq!(loaded, recruitment);
    assert_eq!(
        studies.get_deployment_ids(study.id()).await.unwrap(),
        vec![deployment.to_string()]
    );

    assert!(participants.remove_recruitment(study.id()).await.unwrap());
    assert!(!participants.remove_recruitment(study.id()).await.unwrap());
    assert!(participants.get_recruitment(study.id()).await.unwrap().is_none());
}

#[tokio::test]
async fn store_remove_reports_whether_a_row_existed() {
    let db = test_database().await;
    let studies = StudyRepository::new(db.pool.clone());
    let study = studies.add(Study::new(Uuid::new_v4(), "Short lived")).await.unwrap();

    let key = study.id().to_string();
    assert!(studies.store().remove(&key).await.unwrap());
    assert!(!studies.store().remove(&key).await.unwrap());
}

fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "\\PC{0,20}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            proptest::collection::btree_map("[a-zA-Z_]{1,8}", inner, 0..4)
                .prop_map(|fields| Value::Object(fields.into_iter().collect())),
        ]
    })
}

fn timestamp() -> impl Strategy<Value = chrono::DateTime<Utc>> {
    (0i64..4_102_444_800).prop_map(|seconds| {
        Utc.timestamp_opt(seconds, 0).single().unwrap_or_else(Utc::now)
    })
}

fn study_snapshot() -> impl Strategy<Value = StudySnapshot> {
    (
        any::<u128>(),
        any::<u128>(),
        "\\PC{0,40}",
        proptest::option::of("\\PC{0,80}"),
        proptest::option::of("[a-z0-9-]{1,36}"),
        proptest::option::of(json_value()),
        any::<bool>(),
        timestamp(),
    )
        .prop_map(
            |(id, owner, name, description, application_data, protocol, is_live, created_on)| {
                // A study never holds a null protocol, and only goes live with one.
                let protocol_snapshot = protocol.filter(|value| !value.is_null());
                StudySnapshot {
                    id: Uuid::from_u128(id),
                    owner_id: Uuid::from_u128(owner),
                    invitation: StudyInvitation {
                        name: name.clone(),
                        description: description.clone(),
                        application_data,
                    },
                    name,
                    description,
                    is_live: is_live && protocol_snapshot.is_some(),
                    protocol_snapshot,
                    created_on,
                }
            },
        )
}

fn recruitment_snapshot() -> impl Strategy<Value = RecruitmentSnapshot> {
    let participants = proptest::collection::vec(
        (
            any::<u128>(),
            proptest::option::of("[a-z]{1,12}@[a-z]{1,8}\\.org"),
        ),
        0..6,
    );
    let groups = proptest::collection::btree_map(
        any::<u128>(),
        (
            proptest::collection::btree_set(any::<u128>(), 1..4),
            any::<bool>(),
        ),
        0..4,
    );
    (any::<u128>(), any::<u128>(), timestamp(), participants, groups).prop_map(
        |(id, study_id, created_on, participants, groups)| RecruitmentSnapshot {
            id: Uuid::from_u128(id),
            study_id: Uuid::from_u128(study_id),
            created_on,
            participants: participants
                .into_iter()
                .map(|(id, email)| Participant {
                    id: Uuid::from_u128(id),
                    email,
                })
                .collect(),
            participant_groups: groups
                .into_iter()
                .map(|(deployment, (members, is_deployed))| {
                    let id = Uuid::from_u128(deployment);
                    let group = StagedParticipantGroup {
                        id,
                        participant_ids: members.into_iter().map(Uuid::from_u128).collect(),
                        is_deployed,
                    };
                    (id, group)
                })
                .collect(),
        },
    )
}

proptest! {
    #[test]
    fn study_snapshots_survive_the_json_codec(snapshot in study_snapshot()) {
        let codec = JsonCodec;
        let document = codec.serialize(&snapshot).unwrap();
        let decoded: StudySnapshot = codec.deserialize(document).unwrap();
        prop_assert_eq!(decoded, snapshot);
    }

    #[test]
    fn recruitment_snapshots_survive_the_json_codec(snapshot in recruitment_snapshot()) {
        let codec = JsonCodec;
        let document = codec.serialize(&snapshot).unwrap();
        let decoded: RecruitmentSnapshot = codec.deserialize(document).unwrap();
        prop_assert_eq!(decoded, snapshot);
    }

    #[test]
    fn any_accepted_protocol_survives_the_json_codec(protocol in json_value()) {
        let mut study = Study::new(Uuid::new_v4(), "Generated");
        let outcome = study.set_protocol(protocol.clone());
        prop_assert_eq!(outcome.is_err(), protocol.is_null());

        let codec = JsonCodec;
        let document = codec.serialize(&study.snapshot()).unwrap();
        let decoded = Study::from_snapshot(codec.deserialize(document).unwrap());
        prop_assert_eq!(decoded.protocol(), study.protocol());
        prop_assert_eq!(decoded, study);
    }
}
