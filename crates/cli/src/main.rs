use std::fs;
use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use sqldrift_core::adapter::{DatabaseAdapter, FileAdapter};
use sqldrift_core::{ConnectionConfig, Dialect, MigrationConfig, Mode, ObjectFilter, Orchestrator};

mod config_file;
mod error_presentation;

use config_file::ConfigFile;
use error_presentation::{render_runtime_error, CliError, CliResult};

#[derive(Parser)]
#[command(
    name = "sqldrift",
    version,
    about = "Idempotent schema migrations: diff desired DDL against what a database has"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compare against a MySQL database.
    #[cfg(feature = "mysql")]
    Mysql {
        #[command(flatten)]
        common: CommonArgs,
        /// ALGORITHM= clause appended to every ALTER TABLE.
        #[arg(long)]
        algorithm: Option<String>,
        /// LOCK= clause appended to every ALTER TABLE.
        #[arg(long)]
        lock: Option<String>,
    },
    /// Compare against a PostgreSQL database.
    #[cfg(feature = "postgres")]
    Postgres {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Compare against a SQLite database file.
    #[cfg(feature = "sqlite")]
    Sqlite {
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Compare against a SQL Server database.
    #[cfg(feature = "mssql")]
    Mssql {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Database name, or the database file path for sqlite.
    database: String,

    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    #[arg(short = 'u', long)]
    user: Option<String>,
    #[arg(short = 'p', long)]
    password: Option<String>,
    /// Unix domain socket path, where the driver supports one.
    #[arg(long)]
    socket: Option<String>,

    /// Desired schema file; omitted means stdin.
    #[arg(long)]
    file: Option<PathBuf>,
    /// Compare against a DDL file instead of connecting to a database.
    #[arg(long)]
    schema_file: Option<PathBuf>,

    /// Apply the generated DDL instead of printing it.
    #[arg(long, conflicts_with = "export", conflicts_with = "dry_run")]
    apply: bool,
    /// Print the migration without applying it (the default).
    #[arg(long)]
    dry_run: bool,
    /// Print the current schema as DDL and exit.
    #[arg(long)]
    export: bool,

    /// Permit destructive operations (DROP TABLE, DROP COLUMN, ...).
    #[arg(long)]
    enable_drop: bool,
    /// Manage only objects matching this anchored regex (repeatable).
    #[arg(long = "target")]
    targets: Vec<String>,
    /// Never touch objects matching this anchored regex (repeatable).
    #[arg(long = "skip")]
    skips: Vec<String>,
    /// Restrict GRANT/REVOKE comparison to this role (repeatable).
    #[arg(long = "managed-role")]
    managed_roles: Vec<String>,
    /// Build new indexes with CREATE INDEX CONCURRENTLY where supported.
    #[arg(long)]
    concurrent_index: bool,
    /// Compare quoted identifiers case-sensitively instead of folding quotes.
    #[arg(long)]
    strict_quotes: bool,

    /// YAML config file; flags extend what it provides.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    init_tracing();

    #[cfg(not(any(
        feature = "mysql",
        feature = "postgres",
        feature = "sqlite",
        feature = "mssql"
    )))]
    {
        eprintln!("{}", render_runtime_error(CliError::NoDialectsEnabled));
        return ExitCode::from(2);
    }

    #[allow(unreachable_code)]
    {
        let cli = Cli::parse();
        match run(cli.command) {
            Ok(output) => {
                print!("{output}");
                ExitCode::SUCCESS
            }
            Err(error) => {
                eprintln!("{}", render_runtime_error(error));
                ExitCode::FAILURE
            }
        }
    }
}

fn run(command: Command) -> CliResult<String> {
    match command {
        #[cfg(feature = "mysql")]
        Command::Mysql {
            common,
            algorithm,
            lock,
        } => {
            let file_config = load_config_file(&common)?;
            let hints = sqldrift_dialect_mysql::AlterHints {
                algorithm: algorithm.or_else(|| file_config.algorithm.clone()),
                lock: lock.or_else(|| file_config.lock.clone()),
            };
            let dialect = sqldrift_dialect_mysql::MysqlDialect::with_hints(hints);
            run_dialect(&dialect, &common, &file_config)
        }
        #[cfg(feature = "postgres")]
        Command::Postgres { common } => {
            let file_config = load_config_file(&common)?;
            run_dialect(
                &sqldrift_dialect_postgres::PostgresDialect::new(),
                &common,
                &file_config,
            )
        }
        #[cfg(feature = "sqlite")]
        Command::Sqlite { common } => {
            let file_config = load_config_file(&common)?;
            run_dialect(
                &sqldrift_dialect_sqlite::SqliteDialect::new(),
                &common,
                &file_config,
            )
        }
        #[cfg(feature = "mssql")]
        Command::Mssql { common } => {
            let file_config = load_config_file(&common)?;
            run_dialect(
                &sqldrift_dialect_mssql::MssqlDialect::new(),
                &common,
                &file_config,
            )
        }
    }
}

fn run_dialect(
    dialect: &dyn Dialect,
    args: &CommonArgs,
    file_config: &ConfigFile,
) -> CliResult<String> {
    let config = build_migration_config(args, file_config)?;
    let mode = select_mode(args);
    let desired = if mode == Mode::Export {
        String::new()
    } else {
        read_desired_schema(args)?
    };
    let adapter = open_adapter(dialect, args)?;

    let orchestrator = Orchestrator::new(dialect, &config);
    let outcome = orchestrator.run(adapter.as_ref(), &desired, mode)?;
    Ok(outcome.output)
}

fn select_mode(args: &CommonArgs) -> Mode {
    if args.export {
        Mode::Export
    } else if args.apply {
        Mode::Apply
    } else {
        Mode::DryRun
    }
}

fn open_adapter(dialect: &dyn Dialect, args: &CommonArgs) -> CliResult<Box<dyn DatabaseAdapter>> {
    match &args.schema_file {
        Some(path) => Ok(Box::new(FileAdapter::new(path))),
        None => Ok(dialect.connect(&connection_config(args))?),
    }
}

fn connection_config(args: &CommonArgs) -> ConnectionConfig {
    ConnectionConfig {
        host: args.host.clone().unwrap_or_default(),
        port: args.port,
        user: args.user.clone().unwrap_or_default(),
        password: args.password.clone(),
        database: args.database.clone(),
        socket: args.socket.clone(),
    }
}

fn build_migration_config(
    args: &CommonArgs,
    file_config: &ConfigFile,
) -> CliResult<MigrationConfig> {
    let mut targets = file_config.target_tables.clone();
    targets.extend(args.targets.iter().cloned());
    let mut skips = file_config.skip_tables.clone();
    skips.extend(args.skips.iter().cloned());

    let mut config = MigrationConfig::new();
    config.enable_drop = args.enable_drop || file_config.enable_drop;
    config.create_index_concurrently =
        args.concurrent_index || file_config.create_index_concurrently;
    config.ignore_quotes = !args.strict_quotes && file_config.ignore_quotes.unwrap_or(true);
    config.filter = ObjectFilter::new(&targets, &skips)
        .map_err(|error| CliError::InvalidFilterPattern(error.to_string()))?;
    config.managed_roles = file_config.managed_roles.clone();
    config
        .managed_roles
        .extend(args.managed_roles.iter().cloned());
    Ok(config)
}

fn load_config_file(args: &CommonArgs) -> CliResult<ConfigFile> {
    let Some(path) = &args.config else {
        return Ok(ConfigFile::default());
    };
    let contents = fs::read_to_string(path).map_err(|source| CliError::ReadConfig {
        path: path.clone(),
        source,
    })?;
    config_file::parse(&contents).map_err(|source| CliError::InvalidConfig {
        path: path.clone(),
        message: source.to_string(),
    })
}

fn read_desired_schema(args: &CommonArgs) -> CliResult<String> {
    if let Some(path) = &args.file {
        return fs::read_to_string(path).map_err(|source| CliError::ReadFile {
            path: path.clone(),
            source,
        });
    }

    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Err(CliError::MissingDesiredSchemaInput);
    }
    let mut sql = String::new();
    stdin
        .read_to_string(&mut sql)
        .map_err(CliError::ReadStdin)?;
    Ok(sql)
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn common(database: &str) -> CommonArgs {
        CommonArgs {
            database: database.to_string(),
            host: None,
            port: None,
            user: None,
            password: None,
            socket: None,
            file: None,
            schema_file: None,
            apply: false,
            dry_run: false,
            export: false,
            enable_drop: false,
            targets: Vec::new(),
            skips: Vec::new(),
            managed_roles: Vec::new(),
            concurrent_index: false,
            strict_quotes: false,
            config: None,
        }
    }

    #[test]
    fn dry_run_is_the_default_mode() {
        assert_eq!(select_mode(&common("app")), Mode::DryRun);
    }

    #[test]
    fn file_config_and_flags_merge() {
        let mut args = common("app");
        args.targets.push("orders.*".to_string());
        args.enable_drop = true;

        let file_config = ConfigFile {
            target_tables: vec!["users.*".to_string()],
            managed_roles: vec!["app".to_string()],
            ..ConfigFile::default()
        };

        let config = build_migration_config(&args, &file_config).expect("should build");
        assert!(config.enable_drop);
        assert_eq!(config.managed_roles, vec!["app"]);
        assert!(config
            .filter
            .manages(&sqldrift_core::QualifiedName::bare("users_roles")));
        assert!(config
            .filter
            .manages(&sqldrift_core::QualifiedName::bare("orders_items")));
        assert!(!config
            .filter
            .manages(&sqldrift_core::QualifiedName::bare("payments")));
    }

    #[test]
    fn quote_comparison_is_configurable() {
        let args = common("app");
        let config = build_migration_config(&args, &ConfigFile::default()).expect("should build");
        assert!(config.ignore_quotes);

        let mut strict = common("app");
        strict.strict_quotes = true;
        let config = build_migration_config(&strict, &ConfigFile::default()).expect("should build");
        assert!(!config.ignore_quotes);

        let file_config = ConfigFile {
            ignore_quotes: Some(false),
            ..ConfigFile::default()
        };
        let config = build_migration_config(&common("app"), &file_config).expect("should build");
        assert!(!config.ignore_quotes);
    }

    #[test]
    fn bad_filter_patterns_are_reported() {
        let mut args = common("app");
        args.targets.push("(".to_string());
        let error = build_migration_config(&args, &ConfigFile::default()).expect_err("must fail");
        assert!(matches!(error, CliError::InvalidFilterPattern(_)));
    }
}
