//! Declarative workflow definitions, loaded from JSON definition files and
//! immutable at runtime. Field names follow the definition file format.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    #[serde(default, rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub confidentialitycode: String,
    #[serde(default, rename = "completionBehavior")]
    pub completion_behavior: Vec<CompletionBehavior>,
    #[serde(default)]
    pub tasks: Vec<TaskDefinition>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionBehavior {
    #[serde(default)]
    pub completion: Completion,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    #[serde(default)]
    pub condition: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefinition {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub tasktype: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default, rename = "completionBehavior")]
    pub completion_behavior: Vec<CompletionBehavior>,
    #[serde(default)]
    pub input: Vec<SlotDefinition>,
    #[serde(default)]
    pub output: Vec<SlotDefinition>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub contenttype: String,
    #[serde(default, rename = "accesstype")]
    pub access_type: String,
}

impl WorkflowDefinition {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Slot names that need a broker subscription, mapped to this
    /// definition's reference. A slot name carrying an HL7 `^^` separator is
    /// a document type code the broker can filter on; plain names are
    /// internal slots fed by event ids.
    pub fn broker_expressions(&self) -> BTreeMap<String, String> {
        let mut expressions = BTreeMap::new();
        for task in &self.tasks {
            for slot in task.input.iter().chain(task.output.iter()) {
                if slot.name.contains("^^") {
                    expressions.insert(slot.name.clone(), self.reference.clone());
                }
            }
        }
        expressions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) const DEF: &str = r#"{
        "ref": "LUNGPATHWAY",
        "name": "Lung cancer referral pathway",
        "confidentialitycode": "N",
        "completionBehavior": [{"completion": {"condition": "task(1)"}}],
        "tasks": [{
            "id": "1",
            "tasktype": "Request",
            "name": "Referral",
            "description": "Receive and triage the referral",
            "owner": "MDT Coordinator",
            "completionBehavior": [{"completion": {"condition": "input(REF^^LUNG) and output(TRIAGE_NOTE)"}}],
            "input": [{"name": "REF^^LUNG", "contenttype": "application/pdf", "accesstype": "urn:ihe:iti:xdw:2011:eventType:XDSregistered"}],
            "output": [{"name": "TRIAGE_NOTE", "contenttype": "text/plain", "accesstype": "attached"}]
        }]
    }"#;

    #[test]
    fn decodes_definition_file_fields() {
        let def = WorkflowDefinition::from_json(DEF).expect("definition decodes");
        assert_eq!(def.reference, "LUNGPATHWAY");
        assert_eq!(def.tasks.len(), 1);
        assert_eq!(def.tasks[0].input[0].name, "REF^^LUNG");
        assert_eq!(
            def.tasks[0].completion_behavior[0].completion.condition,
            "input(REF^^LUNG) and output(TRIAGE_NOTE)"
        );
    }

    #[test]
    fn broker_expressions_come_from_coded_slot_names() {
        let def = WorkflowDefinition::from_json(DEF).expect("definition decodes");
        let exps = def.broker_expressions();
        assert_eq!(exps.len(), 1);
        assert_eq!(exps.get("REF^^LUNG").map(String::as_str), Some("LUNGPATHWAY"));
    }
}
