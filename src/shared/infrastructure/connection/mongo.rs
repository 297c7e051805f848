// MongoDB reachable through the Connector port.
//
// Responsibilities
// - Build client options from the connection parameters and confirm the server answers a ping.
// - Read and write documents by `_id` in `<database>.<collection>` namespaces.

use crate::shared::infrastructure::connection::{
    ConnectionParameters, Connector, DocumentConnection,
};
use anyhow::Context;
use async_trait::async_trait;
use mongodb::bson::{self, Bson, Document, doc};
use mongodb::options::{ClientOptions, Credential};
use mongodb::{Client, Collection};
use serde_json::Value;
use std::time::Duration;

const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct MongoConnector {
    app_name: String,
    server_selection_timeout: Duration,
}

impl MongoConnector {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            server_selection_timeout: SERVER_SELECTION_TIMEOUT,
        }
    }

    /// How long one attempt waits for a reachable server before it fails.
    pub fn with_server_selection_timeout(mut self, timeout: Duration) -> Self {
        self.server_selection_timeout = timeout;
        self
    }

    pub async fn client_options(
        &self,
        params: &ConnectionParameters,
    ) -> mongodb::error::Result<ClientOptions> {
        let uri = params.uri();
        let mut options = ClientOptions::parse(uri.as_str()).await?;
        options.app_name = Some(self.app_name.clone());
        options.server_selection_timeout = Some(self.server_selection_timeout);
        options.credential = credential(params);
        Ok(options)
    }
}

fn credential(params: &ConnectionParameters) -> Option<Credential> {
    if params.username.is_empty() {
        return None;
    }
    let mut credential = Credential::default();
    credential.username = Some(params.username.clone());
    credential.password = Some(params.password.clone());
    Some(credential)
}

#[async_trait]
impl Connector for MongoConnector {
    type Connection = MongoConnection;
    type Error = mongodb::error::Error;

    async fn connect(
        &self,
        params: &ConnectionParameters,
    ) -> Result<MongoConnection, mongodb::error::Error> {
        let client = Client::with_options(self.client_options(params).await?)?;
        // The driver connects lazily; ping so an unreachable server fails this attempt.
        client.database("admin").run_command(doc! { "ping": 1 }).await?;
        Ok(MongoConnection { client })
    }
}

#[derive(Clone)]
pub struct MongoConnection {
    client: Client,
}

impl MongoConnection {
    fn collection(&self, namespace: &str) -> anyhow::Result<Collection<Document>> {
        let (database, collection) = split_namespace(namespace)?;
        Ok(self.client.database(database).collection(collection))
    }
}

#[async_trait]
impl DocumentConnection for MongoConnection {
    async fn find(&self, namespace: &str, id: &str) -> anyhow::Result<Option<Value>> {
        let found = self
            .collection(namespace)?
            .find_one(doc! { "_id": id })
            .await
            .with_context(|| format!("could not read {id} from {namespace}"))?;
        Ok(found.map(into_json))
    }

    async fn upsert(&self, namespace: &str, id: &str, document: Value) -> anyhow::Result<()> {
        let document = into_document(id, document)?;
        self.collection(namespace)?
            .replace_one(doc! { "_id": id }, document)
            .upsert(true)
            .await
            .with_context(|| format!("could not write {id} to {namespace}"))?;
        Ok(())
    }
}

fn split_namespace(namespace: &str) -> anyhow::Result<(&str, &str)> {
    match namespace.split_once('.') {
        Some((database, collection)) if !database.is_empty() && !collection.is_empty() => {
            Ok((database, collection))
        }
        _ => anyhow::bail!("invalid namespace {namespace:?}, expected <database>.<collection>"),
    }
}

fn into_document(id: &str, value: Value) -> anyhow::Result<Document> {
    let mut document =
        bson::to_document(&value).with_context(|| format!("document {id} is not an object"))?;
    document.insert("_id", id);
    Ok(document)
}

fn into_json(mut document: Document) -> Value {
    document.remove("_id");
    Bson::Document(document).into_relaxed_extjson()
}
