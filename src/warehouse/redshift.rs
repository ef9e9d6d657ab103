//! Amazon Redshift warehouse over the Postgres wire protocol

use super::Warehouse;
use crate::config::ClusterConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls};

/// Redshift cluster connection
pub struct RedshiftWarehouse {
    /// `None` once closed
    client: Option<Client>,
    /// Background task driving the socket
    connection: JoinHandle<()>,
    /// `user@host:port/db`
    info: String,
}

impl RedshiftWarehouse {
    /// Connect to the cluster
    pub async fn connect(cluster: &ClusterConfig) -> Result<Self> {
        let info = cluster.connection_info();

        let mut pg = tokio_postgres::Config::new();
        pg.host(&cluster.host)
            .port(cluster.db_port)
            .dbname(&cluster.db_name)
            .user(&cluster.db_user)
            .password(&cluster.db_password)
            .application_name(env!("CARGO_PKG_NAME"))
            .connect_timeout(Duration::from_secs(cluster.connect_timeout_secs));

        let (client, connection) = pg
            .connect(NoTls)
            .await
            .map_err(|e| Error::connection(&info, describe_pg_error(&e)))?;

        let conn_info = info.clone();
        let connection = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("connection to {conn_info} closed with error: {e}");
            }
        });

        Ok(Self {
            client: Some(client),
            connection,
            info,
        })
    }

    /// Connect from a `postgresql://` URL
    pub async fn connect_url(url: &str) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(url, NoTls)
            .await
            .map_err(|e| Error::connection("postgres url", describe_pg_error(&e)))?;

        let connection = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("connection closed with error: {e}");
            }
        });

        Ok(Self {
            client: Some(client),
            connection,
            info: mask_url(url),
        })
    }

    fn client(&mut self) -> Result<&mut Client> {
        match self.client.as_mut() {
            Some(client) => Ok(client),
            None => Err(Error::connection(&self.info, "connection closed")),
        }
    }
}

impl Drop for RedshiftWarehouse {
    fn drop(&mut self) {
        // Never closed: stop the socket task without a Terminate
        if self.client.is_some() {
            self.connection.abort();
        }
    }
}

#[async_trait(?Send)]
impl Warehouse for RedshiftWarehouse {
    fn describe(&self) -> String {
        format!("redshift:{}", self.info)
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        let tx = self
            .client()?
            .transaction()
            .await
            .map_err(|e| Error::query(describe_pg_error(&e)))?;
        tx.batch_execute(sql)
            .await
            .map_err(|e| Error::query(describe_pg_error(&e)))?;
        tx.commit()
            .await
            .map_err(|e| Error::query(describe_pg_error(&e)))?;
        Ok(())
    }

    async fn ping(&mut self) -> Result<()> {
        self.client()?
            .simple_query("SELECT 1")
            .await
            .map_err(|e| Error::query(format!("Connection check failed: {}", describe_pg_error(&e))))?;
        Ok(())
    }

    async fn count_rows(&mut self, table: &str) -> Result<u64> {
        let row = self
            .client()?
            .query_one(&format!("SELECT COUNT(*) FROM {table}"), &[])
            .await
            .map_err(|e| Error::query(describe_pg_error(&e)))?;
        let count: i64 = row.try_get(0)?;
        Ok(count as u64)
    }

    async fn close(&mut self) -> Result<()> {
        // Dropping the only client sends Terminate; the task ends with the socket
        let Some(client) = self.client.take() else {
            return Ok(());
        };
        drop(client);
        (&mut self.connection)
            .await
            .map_err(|e| Error::connection(&self.info, format!("connection task failed: {e}")))?;
        tracing::info!("closed connection to {}", self.describe());
        Ok(())
    }
}

/// Server-side message when there is one, otherwise the client error
fn describe_pg_error(e: &tokio_postgres::Error) -> String {
    match e.as_db_error() {
        Some(db) => match db.detail() {
            Some(detail) => format!("{}: {} ({detail})", db.code().code(), db.message()),
            None => format!("{}: {}", db.code().code(), db.message()),
        },
        None => e.to_string(),
    }
}

/// Mask the password in a connection URL
fn mask_url(url: &str) -> String {
    let start = url.find("://").map_or(0, |i| i + 3);
    let rest = &url[start..];
    if let Some(at_pos) = rest.find('@') {
        if let Some(colon_pos) = rest[..at_pos].find(':') {
            return format!("{}{}****{}", &url[..start], &rest[..=colon_pos], &rest[at_pos..]);
        }
    }
    url.to_string()
}
