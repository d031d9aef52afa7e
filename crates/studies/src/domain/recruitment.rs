//! Recruitment aggregate: participants of a study and the groups deployed for them

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{StudyError, StudyResult};
use crate::store::Aggregate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Participants deployed together; the group id is the deployment id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedParticipantGroup {
    pub id: Uuid,
    pub participant_ids: BTreeSet<Uuid>,
    #[serde(default)]
    pub is_deployed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecruitmentSnapshot {
    pub id: Uuid,
    pub study_id: Uuid,
    pub created_on: DateTime<Utc>,
    #[serde(default)]
    pub participants: Vec<Participant>,
    /// Keyed by deployment id.
    #[serde(default)]
    pub participant_groups: BTreeMap<Uuid, StagedParticipantGroup>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recruitment {
    snapshot: RecruitmentSnapshot,
}

impl Recruitment {
    pub fn new(study_id: Uuid) -> Self {
        Self {
            snapshot: RecruitmentSnapshot {
                id: Uuid::new_v4(),
                study_id,
                created_on: Utc::now(),
                participants: Vec::new(),
                participant_groups: BTreeMap::new(),
            },
        }
    }

    pub fn id(&self) -> Uuid {
        self.snapshot.id
    }

    pub fn study_id(&self) -> Uuid {
        self.snapshot.study_id
    }

    pub fn participants(&self) -> &[Participant] {
        &self.snapshot.participants
    }

    /// Add a participant, or return the existing one registered with `email`.
    pub fn add_participant(&mut self, email: Option<String>) -> Uuid {
        if let Some(existing) = email.as_ref().and_then(|email| {
            self.snapshot
                .participants
                .iter()
                .find(|participant| participant.email.as_ref() == Some(email))
        }) {
            return existing.id;
        }

        let id = Uuid::new_v4();
        self.snapshot.participants.push(Participant { id, email });
        id
    }

    /// Stage a group of already recruited participants under a new deployment.
    pub fn add_participant_group(
        &mut self,
        deployment_id: Uuid,
        participant_ids: impl IntoIterator<Item = Uuid>,
    ) -> StudyResult<()> {
        let participant_ids: BTreeSet<Uuid> = participant_ids.into_iter().collect();
        if participant_ids.is_empty() {
            return Err(StudyError::validation("a participant group needs at least one participant"));
        }
        if let Some(unknown) = participant_ids
            .iter()
            .find(|id| !self.snapshot.participants.iter().any(|p| p.id == **id))
        {
            return Err(StudyError::validation(format!(
                "participant {unknown} is not recruited for study {}",
                self.snapshot.study_id
            )));
        }
        if self.snapshot.participant_groups.contains_key(&deployment_id) {
            return Err(StudyError::already_exists(
                "participant group",
                deployment_id.to_string(),
            ));
        }

        self.snapshot.participant_groups.insert(
            deployment_id,
            StagedParticipantGroup {
                id: deployment_id,
                participant_ids,
                is_deployed: true,
            },
        );
        Ok(())
    }

    /// Deployment ids of every participant group, in stable order.
    pub fn deployment_ids(&self) -> Vec<String> {
        self.snapshot
            .participant_groups
            .keys()
            .map(Uuid::to_string)
            .collect()
    }
}

impl Aggregate for Recruitment {
    const KIND: &'static str = "recruitment";
    type Snapshot = RecruitmentSnapshot;

    /// Recruitments are addressed by the study they belong to.
    fn key(&self) -> String {
        self.snapshot.study_id.to_string()
    }

    fn snapshot(&self) -> RecruitmentSnapshot {
        self.snapshot.clone()
    }

    fn from_snapshot(snapshot: RecruitmentSnapshot) -> Self {
        Self { snapshot }
    }
}
