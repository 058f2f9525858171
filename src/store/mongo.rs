use crate::store::{DocumentStore, PersistenceError};
use anyhow::{Context, Result};
use mongodb::{
    Client, Database,
    bson::{self, Document, doc},
    options::ClientOptions,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

/// MongoDB backed store. Upserts are `update_one(filter, {$set: doc})`
/// with `upsert: true`.
#[derive(Clone)]
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    /// Parses the URI and selects the database. The driver connects lazily,
    /// so an unreachable server shows up as failed writes, not here.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string cannot be parsed
    pub async fn connect(uri: &SecretString, database: &str) -> Result<Self> {
        let mut options = ClientOptions::parse(uri.expose_secret())
            .await
            .context("Invalid target MongoDB URI")?;

        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());

        let client = Client::with_options(options).context("Failed to create MongoDB client")?;

        Ok(Self {
            database: client.database(database),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.database.name()
    }
}

fn to_document(collection: &str, value: &Value) -> Result<Document, PersistenceError> {
    bson::to_document(value).map_err(|e| PersistenceError::new(collection, e))
}

impl DocumentStore for MongoStore {
    async fn upsert(
        &self,
        collection: &str,
        filter: &Value,
        document: &Value,
    ) -> Result<(), PersistenceError> {
        let filter = to_document(collection, filter)?;
        let fields = to_document(collection, document)?;

        self.database
            .collection::<Document>(collection)
            .update_one(filter, doc! { "$set": fields })
            .upsert(true)
            .await
            .map_err(|e| PersistenceError::new(collection, e))?;

        Ok(())
    }
}
