//! # HIE Store
//!
//! Client for the external persistence API. The store is resource-oriented:
//! every exchange names an action (`select`|`insert`|`update`|`delete`) and a
//! resource (`workflows`|`xdws`|`subscriptions`|`events`), and carries a JSON
//! envelope both ways. `select` requests travel as GET, everything else as
//! POST. The store is the sole point of serialization between concurrent
//! handler invocations; workflow updates carry an optimistic version check.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use hie_types::{DefinitionRow, Event, Subscription, Workflow};
use hie_wire::{WireClient, DEFAULT_TIMEOUT};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Wire(#[from] hie_wire::WireError),
    #[error("failed to encode store request: {0}")]
    Encode(serde_json::Error),
    #[error("failed to decode store response for {resource}: {source}")]
    Decode {
        resource: &'static str,
        source: serde_json::Error,
    },
    #[error("version conflict updating workflow {key}: store holds version {stored}, update carried {attempted}")]
    Conflict {
        key: String,
        stored: i64,
        attempted: i64,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Actions understood by the persistence API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Select,
    Insert,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Select => "select",
            Action::Insert => "insert",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }

    fn method(&self) -> reqwest::Method {
        match self {
            Action::Select => reqwest::Method::GET,
            _ => reqwest::Method::POST,
        }
    }
}

/// Resources exposed by the persistence API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    Workflows,
    Xdws,
    Subscriptions,
    Events,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Workflows => "workflows",
            Resource::Xdws => "xdws",
            Resource::Subscriptions => "subscriptions",
            Resource::Events => "events",
        }
    }
}

/// The JSON body exchanged with the persistence API. On request, `rows`
/// carries filter fields (select/delete) or full rows (insert/update); on
/// response it carries the matched rows.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub action: Action,
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub last_insert_id: i64,
    #[serde(default = "Vec::new")]
    pub rows: Vec<T>,
}

impl<T> Envelope<T> {
    pub fn new(action: Action, rows: Vec<T>) -> Self {
        Self {
            action,
            count: 0,
            last_insert_id: 0,
            rows,
        }
    }
}

/// Client for the persistence API.
#[derive(Clone, Debug)]
pub struct StoreClient {
    wire: WireClient,
    base_url: String,
    timeout: Duration,
}

impl StoreClient {
    pub fn new(wire: WireClient, base_url: impl Into<String>) -> Self {
        Self {
            wire,
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    async fn exchange<T>(
        &self,
        resource: Resource,
        envelope: &Envelope<T>,
    ) -> StoreResult<Envelope<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), resource.as_str());
        let body = serde_json::to_string(envelope).map_err(StoreError::Encode)?;
        tracing::debug!(
            action = envelope.action.as_str(),
            resource = resource.as_str(),
            "persistence API request"
        );
        let resp = self
            .wire
            .api_exchange(&url, envelope.action.method(), body, self.timeout)
            .await?;
        serde_json::from_str(&resp.body).map_err(|source| StoreError::Decode {
            resource: resource.as_str(),
            source,
        })
    }

    // ---- subscriptions ----

    /// All subscriptions whose broker reference matches.
    pub async fn subscriptions_by_broker_ref(
        &self,
        broker_ref: &str,
    ) -> StoreResult<Vec<Subscription>> {
        let filter = Subscription {
            broker_ref: broker_ref.to_string(),
            ..Subscription::default()
        };
        let env = Envelope::new(Action::Select, vec![filter]);
        Ok(self.exchange(Resource::Subscriptions, &env).await?.rows)
    }

    pub async fn insert_subscription(&self, sub: &Subscription) -> StoreResult<i64> {
        let env = Envelope::new(Action::Insert, vec![sub.clone()]);
        let resp = self.exchange(Resource::Subscriptions, &env).await?;
        Ok(resp.last_insert_id)
    }

    /// Remove every subscription registered for a workflow definition, ahead
    /// of re-registration.
    pub async fn delete_subscriptions_for_pathway(&self, pathway: &str) -> StoreResult<()> {
        let filter = Subscription {
            pathway: pathway.to_string(),
            ..Subscription::default()
        };
        let env = Envelope::new(Action::Delete, vec![filter]);
        self.exchange(Resource::Subscriptions, &env).await?;
        Ok(())
    }

    // ---- events ----

    pub async fn insert_event(&self, event: &Event) -> StoreResult<i64> {
        let env = Envelope::new(Action::Insert, vec![event.clone()]);
        let resp = self.exchange(Resource::Events, &env).await?;
        Ok(resp.last_insert_id)
    }

    /// Events recorded against one workflow instance (pathway + national id).
    pub async fn events_for_workflow(
        &self,
        pathway: &str,
        nhs_id: &str,
    ) -> StoreResult<Vec<Event>> {
        let filter = Event {
            pathway: pathway.to_string(),
            nhs_id: nhs_id.to_string(),
            ..Event::default()
        };
        let env = Envelope::new(Action::Select, vec![filter]);
        let mut rows = self.exchange(Resource::Events, &env).await?.rows;
        // Replay order is newest first.
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(rows)
    }

    // ---- workflow definitions ----

    pub async fn definition_by_name(&self, name: &str) -> StoreResult<Option<DefinitionRow>> {
        let filter = DefinitionRow {
            name: name.to_string(),
            ..DefinitionRow::default()
        };
        let env = Envelope::new(Action::Select, vec![filter]);
        let rows = self.exchange(Resource::Xdws, &env).await?.rows;
        Ok(rows.into_iter().find(|r| r.name == name))
    }

    pub async fn upsert_definition(&self, row: &DefinitionRow) -> StoreResult<()> {
        let del = Envelope::new(
            Action::Delete,
            vec![DefinitionRow {
                name: row.name.clone(),
                ..DefinitionRow::default()
            }],
        );
        self.exchange(Resource::Xdws, &del).await?;
        let ins = Envelope::new(Action::Insert, vec![row.clone()]);
        self.exchange(Resource::Xdws, &ins).await?;
        Ok(())
    }

    // ---- workflow documents ----

    /// The single in-flight document for a workflow key, if any.
    pub async fn workflow_by_key(&self, xdw_key: &str) -> StoreResult<Option<Workflow>> {
        let filter = Workflow {
            xdw_key: xdw_key.to_string(),
            ..Workflow::default()
        };
        let env = Envelope::new(Action::Select, vec![filter]);
        let rows = self.exchange(Resource::Workflows, &env).await?.rows;
        Ok(rows.into_iter().max_by_key(|w| w.version))
    }

    pub async fn insert_workflow(&self, wf: &Workflow) -> StoreResult<i64> {
        let env = Envelope::new(Action::Insert, vec![wf.clone()]);
        let resp = self.exchange(Resource::Workflows, &env).await?;
        Ok(resp.last_insert_id)
    }

    /// Persist an updated document. The update is rejected with
    /// [`StoreError::Conflict`] when the stored version no longer matches the
    /// version the update was computed from; the caller must re-read and
    /// re-apply.
    pub async fn update_workflow(&self, wf: &Workflow) -> StoreResult<()> {
        if let Some(current) = self.workflow_by_key(&wf.xdw_key).await? {
            if current.version != wf.version {
                return Err(StoreError::Conflict {
                    key: wf.xdw_key.clone(),
                    stored: current.version,
                    attempted: wf.version,
                });
            }
        }
        let mut next = wf.clone();
        next.version += 1;
        let env = Envelope::new(Action::Update, vec![next]);
        self.exchange(Resource::Workflows, &env).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_wire_names_are_lowercase() {
        for (action, name) in [
            (Action::Select, "\"select\""),
            (Action::Insert, "\"insert\""),
            (Action::Update, "\"update\""),
            (Action::Delete, "\"delete\""),
        ] {
            let json = serde_json::to_string(&action).expect("action encodes");
            assert_eq!(json, name);
        }
    }

    #[test]
    fn select_travels_as_get() {
        assert_eq!(Action::Select.method(), reqwest::Method::GET);
        for action in [Action::Insert, Action::Update, Action::Delete] {
            assert_eq!(action.method(), reqwest::Method::POST);
        }
    }

    #[test]
    fn envelope_decodes_with_missing_counters() {
        let env: Envelope<Subscription> =
            serde_json::from_str(r#"{"action":"select","rows":[]}"#).expect("envelope decodes");
        assert_eq!(env.count, 0);
        assert_eq!(env.last_insert_id, 0);
        assert!(env.rows.is_empty());
    }
}
