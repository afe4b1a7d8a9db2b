use crate::{Connector, ProvisionError, StatementExecutor};
use async_trait::async_trait;
use lambda_runtime::tracing;
use model::SecretValue;
use model::config::DatabaseConfig;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection};

/// Opens admin connections to a MySQL-compatible engine.
#[derive(Debug, Clone)]
pub struct MySqlConnector {
    host: String,
    port: u16,
    admin_user: String,
    database_name: String,
}

impl MySqlConnector {
    pub fn new(config: &DatabaseConfig) -> Self {
        MySqlConnector {
            host: config.host.clone(),
            port: config.port,
            admin_user: config.admin_user.clone(),
            database_name: config.database_name.clone(),
        }
    }

    fn options(&self, password: &SecretValue) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.admin_user)
            .password(password.expose())
            .database(&self.database_name)
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    async fn connect(
        &self,
        password: &SecretValue,
    ) -> Result<Box<dyn StatementExecutor>, ProvisionError> {
        tracing::info!(host = %self.host, port = self.port, "Connecting to database");

        let connection: MySqlConnection = self
            .options(password)
            .connect()
            .await
            .map_err(engine_error)?;

        Ok(Box::new(MySqlExecutor {
            connection: Some(connection),
        }))
    }
}

struct MySqlExecutor {
    connection: Option<MySqlConnection>,
}

#[async_trait]
impl StatementExecutor for MySqlExecutor {
    async fn execute(&mut self, statement: &str) -> Result<(), ProvisionError> {
        let connection: &mut MySqlConnection = self
            .connection
            .as_mut()
            .ok_or_else(|| ProvisionError::new("connection already closed"))?;

        // Autocommit applies, so each statement is committed on its own
        sqlx::query(statement)
            .execute(&mut *connection)
            .await
            .map_err(engine_error)?;

        Ok(())
    }

    async fn close(&mut self) -> Result<(), ProvisionError> {
        match self.connection.take() {
            Some(connection) => connection.close().await.map_err(engine_error),
            None => Ok(()),
        }
    }
}

fn engine_error(err: sqlx::Error) -> ProvisionError {
    match err {
        sqlx::Error::Database(db_err) => ProvisionError::new(db_err.message()),
        other => ProvisionError::new(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::config::{InvocationBudget, SettlePolicy};

    fn config() -> DatabaseConfig {
        DatabaseConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            admin_user: "root".to_string(),
            database_name: "ghost".to_string(),
            instance_id: "ghost-db".to_string(),
            region: "ap-southeast-2".to_string(),
            principal: "ghost".to_string(),
            settle: SettlePolicy::default(),
            budget: InvocationBudget::default(),
        }
    }

    #[test]
    fn options_target_configured_instance() {
        let connector: MySqlConnector = MySqlConnector::new(&config());
        let options: MySqlConnectOptions = connector.options(&SecretValue::new("hunter2"));

        assert_eq!("127.0.0.1", options.get_host());
        assert_eq!(1, options.get_port());
        assert_eq!("root", options.get_username());
        assert_eq!(Some("ghost"), options.get_database());
    }

    #[tokio::test]
    async fn executor_refuses_statements_once_closed() {
        let mut executor: MySqlExecutor = MySqlExecutor { connection: None };

        let err: ProvisionError = executor.execute("SELECT 1").await.unwrap_err();

        assert_eq!("connection already closed", err.message);
        assert!(executor.close().await.is_ok());
    }

    #[tokio::test]
    async fn connect_failure_carries_engine_message() {
        // Nothing listens on port 1
        let connector: MySqlConnector = MySqlConnector::new(&config());

        let err: ProvisionError = match connector.connect(&SecretValue::new("hunter2")).await {
            Ok(_) => panic!("Connecting to a closed port should fail"),
            Err(err) => err,
        };

        assert!(!err.message.is_empty());
        assert!(!err.message.contains("hunter2"));
    }
}
