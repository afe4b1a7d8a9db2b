//! Creation of the database principal used by the application.
//!
//! Both statements are safe to re-run: the account is only created when it is
//! absent and the grant replaces rather than accumulates privileges. They are
//! committed separately, so a failure between them leaves an account without
//! privileges until the next Update runs both again.

use async_trait::async_trait;
use lambda_runtime::tracing;
use model::SecretValue;
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub mod mysql;

pub use mysql::MySqlConnector;

/// Privileges granted on every schema.
pub const PRIVILEGES: &[&str] = &[
    "SELECT",
    "INSERT",
    "UPDATE",
    "DELETE",
    "CREATE",
    "DROP",
    "RELOAD",
    "PROCESS",
    "REFERENCES",
    "INDEX",
    "ALTER",
    "SHOW DATABASES",
    "CREATE TEMPORARY TABLES",
    "LOCK TABLES",
    "EXECUTE",
    "REPLICATION SLAVE",
    "REPLICATION CLIENT",
    "CREATE VIEW",
    "SHOW VIEW",
    "CREATE ROUTINE",
    "ALTER ROUTINE",
    "CREATE USER",
    "EVENT",
    "TRIGGER",
];

const MAX_PRINCIPAL_LEN: usize = 32;

/// A data-plane connection or statement failed. Displays as the engine's message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProvisionError {
    pub message: String,
}

impl ProvisionError {
    pub fn new(message: impl Into<String>) -> Self {
        ProvisionError {
            message: message.into(),
        }
    }
}

/// Account name of the principal. Only plain identifiers are accepted since
/// the name is written into the statements verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalName(String);

impl PrincipalName {
    pub fn parse(name: &str) -> Result<Self, ProvisionError> {
        let valid: bool = !name.is_empty()
            && name.len() <= MAX_PRINCIPAL_LEN
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

        if !valid {
            return Err(ProvisionError::new(format!(
                "invalid principal name {name:?}: expected 1 to {MAX_PRINCIPAL_LEN} letters, digits or underscores"
            )));
        }

        Ok(PrincipalName(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PrincipalName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An open data-plane connection which runs one statement at a time,
/// each committed on its own.
#[async_trait]
pub trait StatementExecutor: Send {
    async fn execute(&mut self, statement: &str) -> Result<(), ProvisionError>;

    /// Close the connection gracefully. Nothing may be executed afterwards.
    async fn close(&mut self) -> Result<(), ProvisionError> {
        Ok(())
    }
}

/// Opens data-plane connections as the admin account.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        password: &SecretValue,
    ) -> Result<Box<dyn StatementExecutor>, ProvisionError>;
}

pub fn create_account_statement(principal: &PrincipalName) -> String {
    format!("CREATE USER IF NOT EXISTS '{principal}' IDENTIFIED WITH AWSAuthenticationPlugin AS 'RDS'")
}

pub fn grant_statement(principal: &PrincipalName) -> String {
    format!(
        "GRANT {} ON *.* TO '{principal}'@'%' WITH GRANT OPTION",
        PRIVILEGES.join(", ")
    )
}

/// Create the principal if it is missing and (re)grant its privileges.
pub async fn provision(
    connection: &mut dyn StatementExecutor,
    principal: &PrincipalName,
) -> Result<(), ProvisionError> {
    connection.execute(&create_account_statement(principal)).await?;
    tracing::info!(principal = principal.as_str(), "Account present");

    connection.execute(&grant_statement(principal)).await?;
    tracing::info!(principal = principal.as_str(), "Privileges granted");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_name_accepts_identifiers() {
        assert_eq!("ghost", PrincipalName::parse("ghost").unwrap().as_str());
        assert!(PrincipalName::parse("app_user_01").is_ok());
    }

    #[test]
    fn principal_name_rejects_quotes_and_wildcards() {
        assert!(PrincipalName::parse("").is_err());
        assert!(PrincipalName::parse("ghost'@'%").is_err());
        assert!(PrincipalName::parse("gh ost").is_err());
        assert!(PrincipalName::parse(&"a".repeat(33)).is_err());
    }

    #[test]
    fn create_statement_is_conditional() {
        let principal: PrincipalName = PrincipalName::parse("ghost").unwrap();

        assert_eq!(
            "CREATE USER IF NOT EXISTS 'ghost' IDENTIFIED WITH AWSAuthenticationPlugin AS 'RDS'",
            create_account_statement(&principal)
        );
    }

    #[test]
    fn grant_statement_covers_all_schemas_from_any_host() {
        let principal: PrincipalName = PrincipalName::parse("ghost").unwrap();
        let statement: String = grant_statement(&principal);

        assert!(statement.starts_with("GRANT SELECT, INSERT, UPDATE, DELETE, CREATE, DROP, "));
        assert!(statement.contains("REPLICATION CLIENT, CREATE VIEW, SHOW VIEW, "));
        assert!(statement.ends_with(" EVENT, TRIGGER ON *.* TO 'ghost'@'%' WITH GRANT OPTION"));
    }
}
