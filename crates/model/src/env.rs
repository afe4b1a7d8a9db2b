/// Hostname of the database instance
pub const DB_HOST: &str = "dbhost";
/// Port of the database instance
pub const DB_PORT: &str = "dbport";
/// Admin account used to open the provisioning connection
pub const DB_ADMIN_USER: &str = "dbuser";
/// Database selected on connect
pub const DB_NAME: &str = "dbname";
/// Control-plane identifier of the database instance
pub const DB_INSTANCE_ID: &str = "dbid";
/// Name of the account created by the provisioner
pub const DB_PRINCIPAL: &str = "dbprincipal";
/// Region of the control-plane endpoints
pub const REGION: &str = "awsregion";

/// `fixed` or `poll`
pub const SETTLE_MODE: &str = "settlemode";
/// Fixed delay, or the poll ceiling when polling
pub const SETTLE_SECONDS: &str = "settleseconds";
/// Interval between readiness checks when polling
pub const SETTLE_POLL_SECONDS: &str = "settlepollseconds";

/// Wall-clock budget the host grants a single invocation
pub const BUDGET_SECONDS: &str = "budgetseconds";
/// Part of the budget kept back for sending the completion response
pub const RESERVE_SECONDS: &str = "reserveseconds";
