use async_trait::async_trait;
use model::SecretValue;
use provisioner::{Connector, ProvisionError, StatementExecutor};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

/// Accounts and grants held by a [`FakeDatabase`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseState {
    pub accounts: BTreeSet<String>,
    pub grants: BTreeMap<String, BTreeSet<String>>,
    pub statements: Vec<String>,
}

/// In-memory engine understanding just the provisioning statements.
#[derive(Default)]
pub struct FakeDatabase {
    state: Mutex<DatabaseState>,
}

impl FakeDatabase {
    pub fn state(&self) -> DatabaseState {
        self.state.lock().unwrap().clone()
    }

    /// Pretend the account already exists, without privileges.
    pub fn with_account(self, name: &str) -> Self {
        self.state.lock().unwrap().accounts.insert(name.to_string());
        self
    }

    pub fn executor(self: &Arc<Self>) -> FakeExecutor {
        FakeExecutor {
            database: self.clone(),
            closed: false,
        }
    }

    fn apply(&self, statement: &str) -> Result<(), ProvisionError> {
        let mut state = self.state.lock().unwrap();
        state.statements.push(statement.to_string());

        if let Some(rest) = statement.strip_prefix("CREATE USER IF NOT EXISTS '") {
            let name: &str = quoted(rest)?;
            state.accounts.insert(name.to_string());
            return Ok(());
        }

        if let Some(rest) = statement.strip_prefix("GRANT ") {
            let (privileges, target) = rest
                .split_once(" ON *.* TO '")
                .ok_or_else(|| syntax_error(statement))?;
            let name: &str = quoted(target)?;

            if !state.accounts.contains(name) {
                return Err(ProvisionError::new(format!(
                    "You are not allowed to create a user with GRANT ('{name}')"
                )));
            }

            // Grants add to what is already held
            state
                .grants
                .entry(name.to_string())
                .or_default()
                .extend(privileges.split(", ").map(str::to_string));
            return Ok(());
        }

        Err(syntax_error(statement))
    }
}

fn quoted(rest: &str) -> Result<&str, ProvisionError> {
    rest.split_once('\'')
        .map(|(name, _)| name)
        .ok_or_else(|| syntax_error(rest))
}

fn syntax_error(statement: &str) -> ProvisionError {
    ProvisionError::new(format!(
        "You have an error in your SQL syntax near '{statement}'"
    ))
}

pub struct FakeExecutor {
    database: Arc<FakeDatabase>,
    closed: bool,
}

#[async_trait]
impl StatementExecutor for FakeExecutor {
    async fn execute(&mut self, statement: &str) -> Result<(), ProvisionError> {
        if self.closed {
            return Err(ProvisionError::new("connection already closed"));
        }

        self.database.apply(statement)
    }

    async fn close(&mut self) -> Result<(), ProvisionError> {
        self.closed = true;
        Ok(())
    }
}

/// Connector handing out executors over a shared [`FakeDatabase`].
pub struct FakeConnector {
    database: Arc<FakeDatabase>,
    fail_with: Option<String>,
    passwords: Mutex<Vec<String>>,
}

impl FakeConnector {
    pub fn new(database: Arc<FakeDatabase>) -> Self {
        FakeConnector {
            database,
            fail_with: None,
            passwords: Mutex::default(),
        }
    }

    /// A connector whose every connection attempt fails.
    pub fn failing(message: &str) -> Self {
        FakeConnector {
            database: Arc::default(),
            fail_with: Some(message.to_string()),
            passwords: Mutex::default(),
        }
    }

    /// Passwords presented on each connection attempt.
    pub fn passwords(&self) -> Vec<String> {
        self.passwords.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(
        &self,
        password: &SecretValue,
    ) -> Result<Box<dyn StatementExecutor>, ProvisionError> {
        self.passwords
            .lock()
            .unwrap()
            .push(password.expose().to_string());

        match &self.fail_with {
            Some(message) => Err(ProvisionError::new(message.clone())),
            None => Ok(Box::new(self.database.executor())),
        }
    }
}
