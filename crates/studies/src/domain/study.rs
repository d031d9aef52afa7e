//! Study aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{StudyError, StudyResult};
use crate::store::Aggregate;

/// Invitation shown to participants when they are recruited for a study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyInvitation {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Opaque data handed to client applications; set to the study id on creation.
    #[serde(default)]
    pub application_data: Option<String>,
}

impl StudyInvitation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            application_data: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySnapshot {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub invitation: StudyInvitation,
    #[serde(default)]
    pub protocol_snapshot: Option<serde_json::Value>,
    pub is_live: bool,
    pub created_on: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Study {
    snapshot: StudySnapshot,
}

impl Study {
    pub fn new(owner_id: Uuid, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            snapshot: StudySnapshot {
                id: Uuid::new_v4(),
                owner_id,
                invitation: StudyInvitation::new(name.clone()),
                name,
                description: None,
                protocol_snapshot: None,
                is_live: false,
                created_on: Utc::now(),
            },
        }
    }

    pub fn id(&self) -> Uuid {
        self.snapshot.id
    }

    pub fn owner_id(&self) -> Uuid {
        self.snapshot.owner_id
    }

    pub fn name(&self) -> &str {
        &self.snapshot.name
    }

    pub fn invitation(&self) -> &StudyInvitation {
        &self.snapshot.invitation
    }

    pub fn is_live(&self) -> bool {
        self.snapshot.is_live
    }

    pub fn protocol(&self) -> Option<&serde_json::Value> {
        self.snapshot.protocol_snapshot.as_ref()
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.snapshot.description = description;
    }

    pub fn set_invitation(&mut self, invitation: StudyInvitation) {
        self.snapshot.invitation = invitation;
    }

    /// Replace the study protocol. A live study keeps the protocol it went live with.
    pub fn set_protocol(&mut self, protocol: serde_json::Value) -> StudyResult<()> {
        if protocol.is_null() {
            return Err(StudyError::validation(format!(
                "study {} protocol must not be null",
                self.snapshot.id
            )));
        }
        if self.snapshot.is_live {
            return Err(StudyError::validation(format!(
                "study {} is live, its protocol can no longer change",
                self.snapshot.id
            )));
        }
        self.snapshot.protocol_snapshot = Some(protocol);
        Ok(())
    }

    /// Lock in the protocol and open the study for deployments.
    pub fn go_live(&mut self) -> StudyResult<()> {
        if self.snapshot.protocol_snapshot.is_none() {
            return Err(StudyError::validation(format!(
                "study {} has no protocol",
                self.snapshot.id
            )));
        }
        self.snapshot.is_live = true;
        Ok(())
    }

    /// Point the invitation's application data at this study.
    pub(crate) fn bind_invitation(&mut self) {
        self.snapshot.invitation.application_data = Some(self.snapshot.id.to_string());
    }
}

impl Aggregate for Study {
    const KIND: &'static str = "study";
    type Snapshot = StudySnapshot;

    fn key(&self) -> String {
        self.snapshot.id.to_string()
    }

    fn snapshot(&self) -> StudySnapshot {
        self.snapshot.clone()
    }

    fn from_snapshot(snapshot: StudySnapshot) -> Self {
        Self { snapshot }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_uses_camel_case_document_keys() {
        let study = Study::new(Uuid::new_v4(), "Sleep");
        let document = serde_json::to_value(study.snapshot()).unwrap();

        assert_eq!(document["id"], json!(study.id().to_string()));
        assert_eq!(document["ownerId"], json!(study.owner_id().to_string()));
        assert_eq!(document["isLive"], json!(false));
        assert!(document.get("protocolSnapshot").is_some());
        assert!(document["invitation"].get("applicationData").is_some());
    }

    #[test]
    fn going_live_requires_a_protocol_and_freezes_it() {
        let mut study = Study::new(Uuid::new_v4(), "Sleep");
        assert!(matches!(study.go_live(), Err(StudyError::Validation { .. })));

        study.set_protocol(json!({ "name": "sleep-protocol" })).unwrap();
        study.go_live().unwrap();
        assert!(study.is_live());
        assert!(study.set_protocol(json!({})).is_err());
        assert_eq!(study.protocol(), Some(&json!({ "name": "sleep-protocol" })));
    }

    #[test]
    fn null_protocol_is_rejected() {
        let mut study = Study::new(Uuid::new_v4(), "Sleep");
        assert!(matches!(
            study.set_protocol(json!(null)),
            Err(StudyError::Validation { .. })
        ));
        assert_eq!(study.protocol(), None);
        assert!(study.go_live().is_err());
    }

    #[test]
    fn binding_the_invitation_uses_the_study_id() {
        let mut study = Study::new(Uuid::new_v4(), "Sleep");
        study.bind_invitation();
        assert_eq!(
            study.invitation().application_data,
            Some(study.id().to_string())
        );
    }
}
