//! Workflow-document instances and the status state machine.
//!
//! A document is one patient's instance of a definition. Its lifecycle is
//! `READY → IN_PROGRESS → COMPLETE → CLOSED`; `CLOSED` is only reached when
//! a new instance replaces it. Tasks move `CREATED → REQUESTED/IN_PROGRESS →
//! COMPLETE`. Events replay latest-first and a slot records the event id it
//! reflects, so a stale event re-delivered later can never overwrite a
//! newer attachment.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use hie_types::consts::NHS_OID_DEFAULT;
use hie_types::{Event, Patient, TaskStatus, WorkflowStatus};

use crate::conditions::{self, Predicate};
use crate::definition::WorkflowDefinition;

/// Assigning authority appended to a generated workflow instance id.
const INSTANCE_ID_SUFFIX: &str = "^1.3.6.1.4.1.21367.2017.2.1.100";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentId {
    #[serde(default)]
    pub root: String,
    #[serde(default)]
    pub extension: String,
    #[serde(default)]
    pub assigning_authority: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentAuthor {
    #[serde(default)]
    pub person: String,
    #[serde(default)]
    pub institution: String,
}

/// Append-only document status history entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEvent {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub task_event_identifier: String,
    #[serde(default)]
    pub event_time: String,
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub previous_status: String,
    #[serde(default)]
    pub actual_status: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEvent {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub event_time: String,
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub status: String,
}

/// Attachment state of one input/output slot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentInfo {
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub access_type: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub home_community_id: String,
    #[serde(default)]
    pub attached_time: String,
    #[serde(default)]
    pub attached_by: String,
    /// Highest event id reflected in this slot; lower ids are stale.
    #[serde(default)]
    pub last_event_id: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSlot {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub attachment: AttachmentInfo,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDetails {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub task_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub actual_owner: String,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub created_time: String,
    #[serde(default)]
    pub last_modified_time: String,
    #[serde(default)]
    pub status: TaskStatus,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub details: TaskDetails,
    #[serde(default)]
    pub input: Vec<TaskSlot>,
    #[serde(default)]
    pub output: Vec<TaskSlot>,
    #[serde(default)]
    pub event_history: Vec<TaskEvent>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDocument {
    #[serde(default)]
    pub id: DocumentId,
    #[serde(default)]
    pub effective_time: String,
    #[serde(default)]
    pub confidentiality_code: String,
    #[serde(default)]
    pub patient: DocumentId,
    #[serde(default)]
    pub author: DocumentAuthor,
    #[serde(default)]
    pub workflow_instance_id: String,
    #[serde(default)]
    pub sequence_number: i64,
    #[serde(default)]
    pub status: WorkflowStatus,
    /// Definition reference plus the patient's national id, the document key.
    #[serde(default)]
    pub definition_reference: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub status_history: Vec<DocumentEvent>,
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

impl WorkflowDocument {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Instantiate a definition for a patient. One task is seeded per task
    /// definition, no slot has events yet, and the document opens `READY`
    /// with a `Create_Workflow` history entry.
    pub fn create(
        definition: &WorkflowDefinition,
        patient: &Patient,
        author_person: &str,
        author_institution: &str,
    ) -> Self {
        let created = now();
        let instance_id = uuid::Uuid::new_v4().to_string();
        let national_oid = if patient.national_oid.is_empty() {
            NHS_OID_DEFAULT
        } else {
            &patient.national_oid
        };
        let mut doc = WorkflowDocument {
            id: DocumentId {
                root: instance_id.clone(),
                extension: definition.reference.to_uppercase(),
                assigning_authority: author_institution.to_string(),
            },
            effective_time: created.clone(),
            confidentiality_code: definition.confidentialitycode.clone(),
            patient: DocumentId {
                root: national_oid.to_string(),
                extension: patient.national_id.clone(),
                assigning_authority: author_institution.to_string(),
            },
            author: DocumentAuthor {
                person: author_person.to_string(),
                institution: author_institution.to_string(),
            },
            workflow_instance_id: format!("{instance_id}{INSTANCE_ID_SUFFIX}"),
            sequence_number: 1,
            status: WorkflowStatus::Ready,
            definition_reference: format!(
                "{}{}",
                definition.reference.to_uppercase(),
                patient.national_id
            ),
            ..WorkflowDocument::default()
        };
        for t in &definition.tasks {
            let mut task = Task {
                details: TaskDetails {
                    id: t.id.clone(),
                    task_type: t.tasktype.clone(),
                    name: t.name.clone(),
                    description: t.description.clone(),
                    actual_owner: t.owner.clone(),
                    created_by: author_person.to_string(),
                    created_time: created.clone(),
                    last_modified_time: created.clone(),
                    status: TaskStatus::Created,
                },
                ..Task::default()
            };
            for slot in &t.input {
                task.input.push(TaskSlot {
                    name: slot.name.clone(),
                    attachment: AttachmentInfo {
                        name: slot.name.clone(),
                        access_type: slot.access_type.clone(),
                        content_type: slot.contenttype.clone(),
                        ..AttachmentInfo::default()
                    },
                });
            }
            for slot in &t.output {
                task.output.push(TaskSlot {
                    name: slot.name.clone(),
                    attachment: AttachmentInfo {
                        name: slot.name.clone(),
                        access_type: slot.access_type.clone(),
                        content_type: slot.contenttype.clone(),
                        ..AttachmentInfo::default()
                    },
                });
            }
            task.event_history.push(TaskEvent {
                id: t.id.clone(),
                event_time: created.clone(),
                identifier: format!("{}00", t.id),
                event_type: "Create_Task".to_string(),
                status: TaskStatus::Complete.as_str().to_string(),
            });
            doc.tasks.push(task);
        }
        doc.status_history.push(DocumentEvent {
            author: format!("{author_person} - {author_institution}"),
            task_event_identifier: "100".to_string(),
            event_time: created,
            event_type: "Create_Workflow".to_string(),
            previous_status: String::new(),
            actual_status: WorkflowStatus::Ready.as_str().to_string(),
        });
        doc
    }

    /// The workflow instance uid, as persisted alongside the document row.
    pub fn instance_uid(&self) -> &str {
        self.workflow_instance_id
            .split('^')
            .next()
            .unwrap_or_default()
    }

    /// Replay events into the task slots and re-evaluate completion.
    /// Returns whether the document changed. Terminal documents are never
    /// touched. `home_community_id` is the regional authority OID stamped on
    /// registry-backed attachments.
    pub fn apply_events(
        &mut self,
        definition: &WorkflowDefinition,
        events: &[Event],
        home_community_id: &str,
    ) -> bool {
        if self.status.is_terminal() {
            tracing::debug!(
                reference = %self.definition_reference,
                status = self.status.as_str(),
                "workflow is terminal, events ignored"
            );
            return false;
        }
        let mut ordered: Vec<&Event> = events.iter().collect();
        ordered.sort_by(|a, b| b.id.cmp(&a.id));
        let mut changed = false;
        for event in ordered {
            for task in &mut self.tasks {
                changed |= apply_to_task(task, event, true, home_community_id);
                changed |= apply_to_task(task, event, false, home_community_id);
            }
            if changed && self.status == WorkflowStatus::Ready {
                self.status = WorkflowStatus::InProgress;
            }
        }
        // Two passes so task(id) chains settle within one replay.
        for _ in 0..2 {
            for idx in 0..self.tasks.len() {
                if self.tasks[idx].details.status != TaskStatus::Complete
                    && self.task_completion_met(definition, idx)
                {
                    self.tasks[idx].details.status = TaskStatus::Complete;
                    self.tasks[idx].details.last_modified_time = now();
                    changed = true;
                }
            }
        }
        if self.document_completion_met(definition) {
            let previous = self
                .status_history
                .last()
                .map(|e| e.actual_status.clone())
                .unwrap_or_default();
            self.status = WorkflowStatus::Complete;
            self.status_history.push(DocumentEvent {
                author: events.first().map(|e| e.user.clone()).unwrap_or_default(),
                task_event_identifier: uuid::Uuid::new_v4().to_string(),
                event_time: now(),
                event_type: WorkflowStatus::Closed.as_str().to_string(),
                previous_status: previous,
                actual_status: WorkflowStatus::Complete.as_str().to_string(),
            });
            for task in &mut self.tasks {
                task.details.status = TaskStatus::Complete;
            }
            changed = true;
            tracing::info!(reference = %self.definition_reference, "workflow complete");
        }
        changed
    }

    fn task_completion_met(&self, definition: &WorkflowDefinition, idx: usize) -> bool {
        let Some(task_def) = definition.tasks.get(idx) else {
            return false;
        };
        let task = &self.tasks[idx];
        for behavior in &task_def.completion_behavior {
            let Some(predicates) = conditions::parse(&behavior.completion.condition) else {
                continue;
            };
            if predicates.is_empty() {
                continue;
            }
            if predicates.iter().all(|p| self.predicate_met(task, p)) {
                return true;
            }
        }
        false
    }

    /// Document-level conditions range over `task(id)` predicates only.
    fn document_completion_met(&self, definition: &WorkflowDefinition) -> bool {
        for behavior in &definition.completion_behavior {
            let Some(predicates) = conditions::parse(&behavior.completion.condition) else {
                continue;
            };
            if predicates.is_empty() {
                continue;
            }
            let met = predicates.iter().all(|p| match p {
                Predicate::Task(id) => self.task_is_complete(id),
                _ => false,
            });
            if met {
                return true;
            }
        }
        false
    }

    fn predicate_met(&self, task: &Task, predicate: &Predicate) -> bool {
        match predicate {
            Predicate::Input(name) => task
                .input
                .iter()
                .any(|s| s.attachment.name == *name && !s.attachment.attached_time.is_empty()),
            Predicate::Output(name) => task
                .output
                .iter()
                .any(|s| s.attachment.name == *name && !s.attachment.attached_time.is_empty()),
            Predicate::Task(id) => self.task_is_complete(id),
        }
    }

    fn task_is_complete(&self, id: &str) -> bool {
        self.tasks
            .iter()
            .any(|t| t.details.id == id && t.details.status == TaskStatus::Complete)
    }
}

/// Stamp `event` into the matching slots of one task. `inputs` selects the
/// input or the output slot list. Returns whether anything changed.
fn apply_to_task(task: &mut Task, event: &Event, inputs: bool, home_community_id: &str) -> bool {
    let count = if inputs { task.input.len() } else { task.output.len() };
    let mut changed = false;
    for idx in 0..count {
        let attached_time = {
            let slot = if inputs {
                &mut task.input[idx]
            } else {
                &mut task.output[idx]
            };
            if slot.attachment.name != event.expression {
                continue;
            }
            // A slot never steps backwards: events replay newest-first and
            // anything at or below the recorded id is stale.
            if slot.attachment.last_event_id >= event.id {
                continue;
            }
            slot.attachment.attached_time = now();
            slot.attachment.attached_by =
                format!("{} {} {}", event.user, event.org, event.role);
            slot.attachment.last_event_id = event.id;
            if slot.attachment.access_type.ends_with("XDSregistered") {
                slot.attachment.identifier = format!(
                    "{}:{}",
                    event.repository_unique_id, event.xds_doc_entry_uid
                );
                slot.attachment.home_community_id = home_community_id.to_string();
            } else {
                slot.attachment.identifier = event.id.to_string();
            }
            slot.attachment.attached_time.clone()
        };
        task.details.last_modified_time = attached_time.clone();
        task.details.actual_owner = format!("{} {} {}", event.user, event.org, event.role);
        if task.details.status != TaskStatus::Complete {
            task.details.status = if inputs {
                TaskStatus::Requested
            } else {
                TaskStatus::InProgress
            };
        }
        task.event_history.push(TaskEvent {
            id: (task.event_history.len() + 1).to_string(),
            event_time: attached_time,
            identifier: event.id.to_string(),
            event_type: event.expression.clone(),
            status: TaskStatus::Complete.as_str().to_string(),
        });
        changed = true;
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::WorkflowDefinition;

    const REG_OID: &str = "2.16.840.1.113883.2.1.3.9";

    fn definition() -> WorkflowDefinition {
        WorkflowDefinition::from_json(
            r#"{
            "ref": "LUNGPATHWAY",
            "confidentialitycode": "N",
            "completionBehavior": [{"completion": {"condition": "task(1)"}}],
            "tasks": [{
                "id": "1",
                "tasktype": "Request",
                "name": "Referral",
                "owner": "MDT Coordinator",
                "completionBehavior": [{"completion": {"condition": "input(DOC^^TYPEA)"}}],
                "input": [{"name": "DOC^^TYPEA", "contenttype": "application/pdf", "accesstype": "urn:ihe:iti:xdw:2011:eventType:XDSregistered"}]
            }]
        }"#,
        )
        .expect("definition decodes")
    }

    fn patient() -> Patient {
        Patient {
            national_id: "9999999468".to_string(),
            national_oid: NHS_OID_DEFAULT.to_string(),
            given_name: "Ada".to_string(),
            family_name: "Lovelace".to_string(),
            ..Patient::default()
        }
    }

    fn event(id: i64, expression: &str) -> Event {
        Event {
            id,
            expression: expression.to_string(),
            user: "Ada Lovelace".to_string(),
            org: "Leeds Teaching Hospitals".to_string(),
            role: "Consultant".to_string(),
            repository_unique_id: "1.3.6.1.4.1.21367.13.80.110".to_string(),
            xds_doc_entry_uid: "1.42.20260829.1".to_string(),
            nhs_id: "9999999468".to_string(),
            pathway: "LUNGPATHWAY".to_string(),
            ..Event::default()
        }
    }

    #[test]
    fn create_seeds_tasks_and_opens_ready() {
        let doc = WorkflowDocument::create(&definition(), &patient(), "triage", "ICB");
        assert_eq!(doc.status, WorkflowStatus::Ready);
        assert_eq!(doc.definition_reference, "LUNGPATHWAY9999999468");
        assert_eq!(doc.tasks.len(), 1);
        assert_eq!(doc.tasks[0].details.status, TaskStatus::Created);
        assert_eq!(doc.tasks[0].input[0].attachment.name, "DOC^^TYPEA");
        assert!(doc.tasks[0].input[0].attachment.attached_time.is_empty());
        assert_eq!(doc.status_history.len(), 1);
        assert_eq!(doc.status_history[0].event_type, "Create_Workflow");
    }

    #[test]
    fn matching_event_progresses_and_completes_workflow() {
        let def = definition();
        let mut doc = WorkflowDocument::create(&def, &patient(), "triage", "ICB");
        let changed = doc.apply_events(&def, &[event(7, "DOC^^TYPEA")], REG_OID);
        assert!(changed);
        // Task completion fires off the filled input, then the document
        // condition task(1) closes the workflow out.
        assert_eq!(doc.tasks[0].details.status, TaskStatus::Complete);
        assert_eq!(doc.status, WorkflowStatus::Complete);
        let closing = doc.status_history.last().expect("history entry");
        assert_eq!(closing.event_type, "CLOSED");
        assert_eq!(closing.actual_status, "COMPLETE");
        // Registered-storage slots carry repository:documentUid plus the
        // regional authority OID as the home community.
        assert_eq!(
            doc.tasks[0].input[0].attachment.identifier,
            "1.3.6.1.4.1.21367.13.80.110:1.42.20260829.1"
        );
        assert_eq!(doc.tasks[0].input[0].attachment.home_community_id, REG_OID);
    }

    #[test]
    fn replaying_the_same_event_is_a_no_op() {
        let def = definition();
        let mut doc = WorkflowDocument::create(&def, &patient(), "triage", "ICB");
        let ev = event(7, "DOC^^TYPEA");
        doc.apply_events(&def, &[ev.clone()], REG_OID);
        let snapshot = doc.to_json().expect("document encodes");
        let changed = doc.apply_events(&def, &[ev], REG_OID);
        assert!(!changed);
        assert_eq!(doc.to_json().expect("document encodes"), snapshot);
    }

    #[test]
    fn stale_event_never_overwrites_a_newer_attachment() {
        let def = WorkflowDefinition::from_json(
            r#"{
            "ref": "LUNGPATHWAY",
            "tasks": [{
                "id": "1",
                "input": [{"name": "DOC^^TYPEA", "accesstype": "attached"}]
            }]
        }"#,
        )
        .expect("definition decodes");
        let mut doc = WorkflowDocument::create(&def, &patient(), "triage", "ICB");
        doc.apply_events(&def, &[event(9, "DOC^^TYPEA")], REG_OID);
        assert_eq!(doc.tasks[0].input[0].attachment.identifier, "9");
        let changed = doc.apply_events(&def, &[event(3, "DOC^^TYPEA")], REG_OID);
        assert!(!changed);
        assert_eq!(doc.tasks[0].input[0].attachment.identifier, "9");
        assert_eq!(doc.tasks[0].input[0].attachment.last_event_id, 9);
    }

    #[test]
    fn completion_algebra_requires_every_conjunct() {
        let def = WorkflowDefinition::from_json(
            r#"{
            "ref": "P",
            "completionBehavior": [{"completion": {"condition": "task(1) and task(2)"}}],
            "tasks": [
                {"id": "1", "completionBehavior": [{"completion": {"condition": "input(A)"}}], "input": [{"name": "A"}]},
                {"id": "2", "completionBehavior": [{"completion": {"condition": "input(B)"}}], "input": [{"name": "B"}]}
            ]
        }"#,
        )
        .expect("definition decodes");
        let mut doc = WorkflowDocument::create(&def, &patient(), "triage", "ICB");
        doc.apply_events(&def, &[event(1, "A")], REG_OID);
        assert_eq!(doc.tasks[0].details.status, TaskStatus::Complete);
        assert_eq!(doc.status, WorkflowStatus::InProgress);
        doc.apply_events(&def, &[event(1, "A"), event(2, "B")], REG_OID);
        assert_eq!(doc.status, WorkflowStatus::Complete);
    }

    #[test]
    fn condition_on_unknown_task_never_fires() {
        let def = WorkflowDefinition::from_json(
            r#"{
            "ref": "P",
            "completionBehavior": [{"completion": {"condition": "task(99)"}}],
            "tasks": [{"id": "1", "completionBehavior": [{"completion": {"condition": "input(A)"}}], "input": [{"name": "A"}]}]
        }"#,
        )
        .expect("definition decodes");
        let mut doc = WorkflowDocument::create(&def, &patient(), "triage", "ICB");
        doc.apply_events(&def, &[event(1, "A")], REG_OID);
        assert_eq!(doc.tasks[0].details.status, TaskStatus::Complete);
        assert_eq!(doc.status, WorkflowStatus::InProgress);
    }

    #[test]
    fn terminal_documents_are_immutable() {
        let def = definition();
        let mut doc = WorkflowDocument::create(&def, &patient(), "triage", "ICB");
        doc.status = WorkflowStatus::Closed;
        let snapshot = doc.clone();
        let changed = doc.apply_events(&def, &[event(7, "DOC^^TYPEA")], REG_OID);
        assert!(!changed);
        assert_eq!(doc, snapshot);
    }

    #[test]
    fn output_match_moves_task_in_progress() {
        let def = WorkflowDefinition::from_json(
            r#"{
            "ref": "P",
            "tasks": [{"id": "1", "output": [{"name": "NOTE", "accesstype": "attached"}]}]
        }"#,
        )
        .expect("definition decodes");
        let mut doc = WorkflowDocument::create(&def, &patient(), "triage", "ICB");
        doc.apply_events(&def, &[event(4, "NOTE")], REG_OID);
        assert_eq!(doc.tasks[0].details.status, TaskStatus::InProgress);
        assert_eq!(doc.tasks[0].output[0].attachment.identifier, "4");
        // Direct attachments never claim a home community.
        assert!(doc.tasks[0].output[0].attachment.home_community_id.is_empty());
        assert_eq!(doc.status, WorkflowStatus::InProgress);
    }
}
