//! # HIE Engine
//!
//! Orchestration across the protocol clients. The engine owns the three
//! entry points the outer service exposes:
//!
//! - [`Engine::handle_notification`]: parse an inbound broker notification,
//!   correlate it against stored subscriptions, resolve the subject's
//!   national id and drive the matching workflow forward.
//! - [`Engine::find_patient`]: the standalone identity-query path.
//! - [`Engine::register_definitions`]: load workflow definition files,
//!   create broker subscriptions for their coded slots and persist both.
//!
//! The engine holds no long-lived lock; concurrent invocations serialize at
//! the store boundary, and workflow updates carry an optimistic version
//! check that is retried once on conflict.

mod config;

pub use config::EngineConfig;

use hie_dsub::{DsubClient, DsubError};
use hie_pdq::{PatientCache, PatientQuery, PdqClient, PdqError, QueryOutcome};
use hie_store::{StoreClient, StoreError};
use hie_types::consts::DSUB_TOPIC_TYPE_CODE;
use hie_types::{Event, Patient, Subscription, Workflow};
use hie_wire::WireClient;
use hie_xdw::{WorkflowDefinition, WorkflowDocument};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Wire(#[from] hie_wire::WireError),
    #[error(transparent)]
    Notification(#[from] DsubError),
    #[error(transparent)]
    Identity(#[from] PdqError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("unreadable workflow state: {0}")]
    Workflow(#[from] serde_json::Error),
    #[error("definition file error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// The integration engine. Cheap to clone; shared by all handlers.
#[derive(Clone, Debug)]
pub struct Engine {
    config: EngineConfig,
    pdq: PdqClient,
    dsub: DsubClient,
    store: StoreClient,
}

impl Engine {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        let wire = WireClient::new()?;
        let pdq = match config.cache_ttl() {
            Some(ttl) => PdqClient::with_cache(wire.clone(), PatientCache::new(ttl)),
            None => PdqClient::new(wire.clone()),
        };
        let dsub = DsubClient::new(wire.clone(), config.broker_url(), config.consumer_url());
        let store = StoreClient::new(wire, config.store_url());
        Ok(Self {
            config,
            pdq,
            dsub,
            store,
        })
    }

    /// The fixed broker acknowledgement envelope.
    pub const fn ack() -> &'static str {
        hie_dsub::ack()
    }

    /// Process one inbound broker notification.
    ///
    /// Fails only when the message itself is unreadable; every downstream
    /// stop (no broker reference, no subject, no matching subscription,
    /// unresolvable patient) is logged and swallowed so the caller can still
    /// acknowledge the broker.
    pub async fn handle_notification(&self, raw: &str) -> EngineResult<()> {
        let message = hie_dsub::parse_notify(raw)?;
        if message.broker_ref.is_empty() {
            tracing::info!("notification carries no subscription reference, nothing to correlate");
            return Ok(());
        }
        if message.xds_pid.is_empty() {
            tracing::info!(broker_ref = %message.broker_ref, "notification carries no subject patient id");
            return Ok(());
        }
        // The broker must still receive the ack when the store is down, or
        // it will re-deliver the notification. Only a malformed message may
        // surface as an error.
        let subscriptions = match self
            .store
            .subscriptions_by_broker_ref(&message.broker_ref)
            .await
        {
            Ok(subscriptions) => subscriptions,
            Err(err) => {
                tracing::warn!(
                    broker_ref = %message.broker_ref,
                    error = %err,
                    "subscription lookup failed, acknowledging without correlation"
                );
                return Ok(());
            }
        };
        if subscriptions.is_empty() {
            tracing::info!(
                broker_ref = %message.broker_ref,
                "no stored subscription matches, cancelling at the broker"
            );
            self.dsub.cancel(&message.broker_ref).await;
            return Ok(());
        }
        let Some(patient) = self.resolve_subject(&message.xds_pid).await else {
            return Ok(());
        };
        let shell = message.into_event();
        for subscription in subscriptions.iter().filter(|s| s.id > 0) {
            let mut event = shell.clone();
            event.pathway = subscription.pathway.clone();
            event.topic = subscription.topic.clone();
            event.nhs_id = patient.national_id.clone();
            match self.store.insert_event(&event).await {
                Ok(id) => {
                    event.id = id;
                    tracing::info!(
                        event = id,
                        pathway = %event.pathway,
                        expression = %event.expression,
                        "event recorded"
                    );
                    if let Err(err) = self.update_workflow(&event, &patient).await {
                        tracing::warn!(
                            pathway = %event.pathway,
                            error = %err,
                            "workflow update failed"
                        );
                    }
                }
                Err(err) => {
                    tracing::warn!(pathway = %event.pathway, error = %err, "event insert failed");
                }
            }
        }
        Ok(())
    }

    /// Resolve a notification subject's canonical record via the regional-id
    /// query path. All failures are logged and reported as `None`; a broken
    /// identity service must not fail the notification handler.
    async fn resolve_subject(&self, xds_pid: &str) -> Option<Patient> {
        let query = PatientQuery {
            server: Some(self.config.pdq_server()),
            server_url: self.config.pdq_url().to_string(),
            reg_id: xds_pid.to_string(),
            reg_oid: self.config.reg_oid().to_string(),
            nhs_oid: self.config.nhs_oid().to_string(),
            ..PatientQuery::default()
        };
        let outcome = match self.pdq.query(&query).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(%xds_pid, error = %err, "identity resolution failed");
                return None;
            }
        };
        if outcome.count == 0 || outcome.patients.is_empty() {
            tracing::warn!(%xds_pid, "no patient returned for subject");
            return None;
        }
        let patient = outcome.patients.into_iter().next()?;
        if !patient.has_valid_national_id() {
            tracing::warn!(%xds_pid, "resolved patient has no valid national id");
            return None;
        }
        Some(patient)
    }

    /// Standalone identity query over whichever identifiers the caller has.
    /// `server` overrides the configured variant for this call; `fresh`
    /// bypasses the result cache.
    pub async fn find_patient(
        &self,
        mrn_id: &str,
        mrn_oid: &str,
        nhs_id: &str,
        reg_id: &str,
        server: Option<hie_pdq::ServerVariant>,
        fresh: bool,
    ) -> EngineResult<QueryOutcome> {
        let query = PatientQuery {
            server: Some(server.unwrap_or_else(|| self.config.pdq_server())),
            server_url: self.config.pdq_url().to_string(),
            mrn_id: mrn_id.to_string(),
            mrn_oid: mrn_oid.to_string(),
            nhs_id: nhs_id.to_string(),
            nhs_oid: self.config.nhs_oid().to_string(),
            reg_id: reg_id.to_string(),
            reg_oid: self.config.reg_oid().to_string(),
            fresh,
            ..PatientQuery::default()
        };
        Ok(self.pdq.query(&query).await?)
    }

    /// Load or create the workflow document for an event's key, replay the
    /// event log into it and persist the outcome.
    async fn update_workflow(&self, event: &Event, patient: &Patient) -> EngineResult<()> {
        let Some(def_row) = self.store.definition_by_name(&event.pathway).await? else {
            tracing::warn!(pathway = %event.pathway, "no workflow definition registered");
            return Ok(());
        };
        let definition = WorkflowDefinition::from_json(&def_row.xdw)?;
        let key = format!("{}{}", event.pathway, event.nhs_id);
        let row = match self.store.workflow_by_key(&key).await? {
            Some(row) => row,
            None => {
                self.create_workflow(&definition, &def_row.xdw, patient, event, &key)
                    .await?
            }
        };
        self.advance_workflow(&definition, row).await
    }

    async fn create_workflow(
        &self,
        definition: &WorkflowDefinition,
        definition_json: &str,
        patient: &Patient,
        event: &Event,
        key: &str,
    ) -> EngineResult<Workflow> {
        let document = WorkflowDocument::create(definition, patient, &event.user, &event.org);
        // A fresh instance supersedes anything still open under the key.
        self.close_open_instances(key).await?;
        let mut row = Workflow {
            created: Some(chrono::Utc::now()),
            xdw_key: key.to_string(),
            xdw_uid: document.instance_uid().to_string(),
            xdw_doc: document.to_json()?,
            xdw_def: definition_json.to_string(),
            version: 0,
            ..Workflow::default()
        };
        row.id = self.store.insert_workflow(&row).await?;
        tracing::info!(%key, uid = %row.xdw_uid, "workflow document created");
        Ok(row)
    }

    async fn close_open_instances(&self, key: &str) -> EngineResult<()> {
        if let Some(existing) = self.store.workflow_by_key(key).await? {
            let mut document = WorkflowDocument::from_json(&existing.xdw_doc)?;
            if !document.status.is_terminal() {
                document.status = hie_types::WorkflowStatus::Closed;
                let mut closed = existing;
                closed.xdw_doc = document.to_json()?;
                self.store.update_workflow(&closed).await?;
                tracing::info!(%key, "closed superseded workflow instance");
            }
        }
        Ok(())
    }

    async fn advance_workflow(
        &self,
        definition: &WorkflowDefinition,
        row: Workflow,
    ) -> EngineResult<()> {
        let Some((pathway, nhs_id)) = Workflow::split_key(&row.xdw_key) else {
            tracing::warn!(key = %row.xdw_key, "workflow key cannot be split");
            return Ok(());
        };
        let events = self.store.events_for_workflow(pathway, nhs_id).await?;
        match self.apply_and_persist(definition, row.clone(), &events).await {
            Err(EngineError::Store(StoreError::Conflict { key, .. })) => {
                tracing::info!(%key, "workflow version conflict, replaying once");
                let Some(fresh) = self.store.workflow_by_key(&key).await? else {
                    return Ok(());
                };
                self.apply_and_persist(definition, fresh, &events).await
            }
            other => other,
        }
    }

    async fn apply_and_persist(
        &self,
        definition: &WorkflowDefinition,
        mut row: Workflow,
        events: &[Event],
    ) -> EngineResult<()> {
        let mut document = WorkflowDocument::from_json(&row.xdw_doc)?;
        if !document.apply_events(definition, events, self.config.reg_oid()) {
            return Ok(());
        }
        row.xdw_doc = document.to_json()?;
        self.store.update_workflow(&row).await?;
        tracing::info!(
            key = %row.xdw_key,
            status = document.status.as_str(),
            "workflow state persisted"
        );
        Ok(())
    }

    /// Register every definition file in the configured directory: replace
    /// the stored definition and its subscriptions, subscribe the broker to
    /// each coded slot name, and mark the file deployed.
    ///
    /// Registration is per-file: a failure leaves that file in place for the
    /// next scan and the remaining files are still processed.
    pub async fn register_definitions(&self) -> EngineResult<Vec<Subscription>> {
        let mut registered = Vec::new();
        let dir = self.config.definitions_dir();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(".json") || !name.contains("xdwdef") {
                continue;
            }
            match self.register_file(&entry.path(), &name).await {
                Ok(subscriptions) => registered.extend(subscriptions),
                Err(err) => {
                    tracing::warn!(file = %name, error = %err, "definition registration failed");
                }
            }
        }
        Ok(registered)
    }

    async fn register_file(
        &self,
        path: &std::path::Path,
        name: &str,
    ) -> EngineResult<Vec<Subscription>> {
        let raw = std::fs::read_to_string(path)?;
        let definition = WorkflowDefinition::from_json(&raw)?;
        if definition.reference.is_empty() {
            tracing::warn!(file = %name, "definition has no reference, skipping");
            return Ok(Vec::new());
        }
        tracing::info!(pathway = %definition.reference, file = %name, "registering workflow definition");
        self.store
            .delete_subscriptions_for_pathway(&definition.reference)
            .await?;
        self.store
            .upsert_definition(&hie_types::DefinitionRow {
                name: definition.reference.clone(),
                xdw: raw.clone(),
                ..hie_types::DefinitionRow::default()
            })
            .await?;
        let mut registered = Vec::new();
        for (expression, pathway) in definition.broker_expressions() {
            let broker_ref = self
                .dsub
                .subscribe(DSUB_TOPIC_TYPE_CODE, &expression)
                .await?;
            let mut subscription = Subscription {
                created: Some(chrono::Utc::now()),
                broker_ref,
                pathway,
                topic: DSUB_TOPIC_TYPE_CODE.to_string(),
                expression,
                ..Subscription::default()
            };
            subscription.id = self.store.insert_subscription(&subscription).await?;
            registered.push(subscription);
        }
        let deployed = path.with_file_name(format!("{name}.deployed"));
        std::fs::rename(path, deployed)?;
        Ok(registered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    // Carries a subscription reference and a subject patient id, so
    // processing reaches the subscription lookup.
    const NOTIFY: &str = "<SOAP-ENV:Envelope xmlns:SOAP-ENV='http://www.w3.org/2003/05/soap-envelope'><SOAP-ENV:Body>\
        <wsnt:Notify xmlns:wsnt='http://docs.oasis-open.org/wsn/b-2'>\
        <wsnt:NotificationMessage>\
        <wsnt:SubscriptionReference><Address>https://broker.example/subscriptions/9a3b</Address></wsnt:SubscriptionReference>\
        <wsnt:Message><rim:ExtrinsicObject xmlns:rim='urn:oasis:names:tc:ebxml-regrep:xsd:rim:3.0' id='doc1'>\
        <rim:ExternalIdentifier identificationScheme='urn:uuid:58a6f841-87b3-4a3e-92fd-a8ffeff98427' value='REG001^^^&amp;2.16.840.1.113883.2.1.3.9&amp;ISO'/>\
        </rim:ExtrinsicObject></wsnt:Message>\
        </wsnt:NotificationMessage></wsnt:Notify></SOAP-ENV:Body></SOAP-ENV:Envelope>";

    /// Engine whose broker, identity and store endpoints all refuse
    /// connections.
    fn unreachable_engine(definitions_dir: PathBuf) -> Engine {
        let config = EngineConfig::new(
            "http://127.0.0.1:1".into(),
            "http://127.0.0.1:1/notify".into(),
            "http://127.0.0.1:1/pdq".into(),
            hie_pdq::ServerVariant::Pixm,
            "http://127.0.0.1:1".into(),
            "2.16.840.1.113883.2.1.3.9".into(),
            String::new(),
            definitions_dir,
            None,
        )
        .expect("config resolves");
        Engine::new(config).expect("engine builds")
    }

    #[tokio::test]
    async fn notification_is_acknowledged_when_store_is_unreachable() {
        let engine = unreachable_engine(PathBuf::from("/nonexistent"));
        engine
            .handle_notification(NOTIFY)
            .await
            .expect("broker still gets the ack");
    }

    #[tokio::test]
    async fn unreadable_notification_is_still_an_error() {
        let engine = unreachable_engine(PathBuf::from("/nonexistent"));
        let err = engine
            .handle_notification("<Envelope><Body/></Envelope>")
            .await
            .expect_err("no Notify element");
        assert!(matches!(
            err,
            EngineError::Notification(DsubError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn failed_registration_leaves_files_for_the_next_scan() {
        let dir = tempfile::tempdir().expect("temp dir");
        let definition =
            r#"{"ref":"LUNGPATHWAY","tasks":[{"id":"1","input":[{"name":"DOC^^TYPEA"}]}]}"#;
        for name in ["lung_xdwdef.json", "skin_xdwdef.json"] {
            std::fs::write(dir.path().join(name), definition).expect("definition file");
        }
        let engine = unreachable_engine(dir.path().to_path_buf());
        let registered = engine
            .register_definitions()
            .await
            .expect("scan runs to completion");
        assert!(registered.is_empty());
        for name in ["lung_xdwdef.json", "skin_xdwdef.json"] {
            assert!(dir.path().join(name).exists(), "{name} must stay in place");
        }
    }
}
