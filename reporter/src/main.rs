use clap::{Args, Parser, Subcommand};
use polarion::prelude::*;
use reporter::config::{ReporterConfig, ReporterError, ReporterResult};
use reporter::validation::{self, project_choices, Validation};
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(name = "polarion-reporter")]
#[command(about = "Publish test results to Polarion and drive work item workflows")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConnectionArgs {
    /// Polarion server URL, e.g. https://host/polarion
    #[arg(long, env = "POLARION_URL", global = true)]
    url: Option<String>,
    /// Personal access token
    #[arg(long, env = "POLARION_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,
    /// TOML file with url, token and connect_timeout_secs
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Connection establishment timeout in seconds
    #[arg(long, global = true)]
    connect_timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify the server is reachable with the configured token
    TestConnection,
    /// Check that a project exists
    CheckProject {
        project: String,
    },
    /// Check that a work item exists
    CheckWorkItem {
        project: String,
        work_item: String,
    },
    /// List project ids
    Projects {
        /// Project to mark as selected
        #[arg(long)]
        selected: Option<String>,
    },
    /// Create a test run and import an xUnit results file into it
    Publish {
        #[arg(long)]
        project: String,
        #[arg(long)]
        test_run_id_prefix: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "buildacceptancetestrun")]
        run_type: String,
        #[arg(long)]
        group_id: String,
        /// Comma-separated glob includes relative to the workspace
        #[arg(long)]
        results: String,
        /// Workspace root (defaults to the current directory)
        #[arg(long)]
        workspace: Option<PathBuf>,
    },
    /// Trigger a workflow action on a work item
    Workflow {
        #[arg(long)]
        project: String,
        /// Work item id, or $NAME to read it from the environment
        #[arg(long)]
        work_item: String,
        #[arg(long)]
        action: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) if e.is_cancelled() => {
            println!("Interrupted");
            ExitCode::from(EXIT_INTERRUPTED)
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the command succeeded.
async fn run(cli: Cli) -> ReporterResult<bool> {
    let overrides = ReporterConfig {
        url: cli.connection.url,
        token: cli.connection.token,
        connect_timeout_secs: cli.connection.connect_timeout_secs,
    };
    let settings = ReporterConfig::discover(cli.connection.config.as_deref())?.merge(overrides);

    let connection = match settings.connection() {
        Ok(connection) => connection,
        Err(ReporterError::NoConnection) if is_validation(&cli.command) => {
            println!("{}", Validation::Error(reporter::NO_CONNECTION.to_string()));
            return Ok(false);
        }
        Err(e) => return Err(e),
    };
    let client = PolarionClient::new(connection)?;

    match cli.command {
        Commands::TestConnection => {
            let result = interruptible(async {
                Ok::<_, PolarionError>(validation::test_connection(&client).await)
            })
            .await?;
            Ok(report(result))
        }
        Commands::CheckProject { project } => {
            let result = interruptible(async {
                Ok::<_, PolarionError>(validation::check_project(&client, &project).await)
            })
            .await?;
            Ok(report(result))
        }
        Commands::CheckWorkItem { project, work_item } => {
            let result = interruptible(async {
                Ok::<_, PolarionError>(
                    validation::check_work_item(&client, &project, &work_item).await,
                )
            })
            .await?;
            Ok(report(result))
        }
        Commands::Projects { selected } => {
            let ids = interruptible(client.list_projects()).await?;
            if ids.is_empty() {
                println!("No projects visible with this token.");
            }
            for choice in project_choices(ids, selected.as_deref()) {
                println!("{}", choice);
            }
            Ok(true)
        }
        Commands::Publish {
            project,
            test_run_id_prefix,
            title,
            run_type,
            group_id,
            results,
            workspace,
        } => {
            let workspace = resolve_workspace(workspace)?;
            let publisher = ResultsPublisher::new(
                project,
                NewTestRun::new(test_run_id_prefix, title, run_type, group_id),
                results,
            );
            let env = BuildEnv::from_process();
            let outcome = interruptible(publisher.publish(&client, &workspace, &env)).await?;
            print_publish_outcome(&outcome, client.config().server_url());
            Ok(true)
        }
        Commands::Workflow {
            project,
            work_item,
            action,
        } => {
            let trigger = WorkflowTrigger::new(project, work_item, action);
            let env = BuildEnv::from_process();
            let work_item_id = interruptible(trigger.run(&client, &env)).await?;
            println!(
                "{} - Trigger workflow action({}) for workitem - {} successful.",
                WORKFLOW_STEP_NAME, trigger.workflow_action, work_item_id
            );
            Ok(true)
        }
    }
}

fn is_validation(command: &Commands) -> bool {
    matches!(
        command,
        Commands::TestConnection | Commands::CheckProject { .. } | Commands::CheckWorkItem { .. }
    )
}

fn report(result: Validation) -> bool {
    println!("{}", result);
    result.is_ok()
}

fn resolve_workspace(workspace: Option<PathBuf>) -> ReporterResult<PathBuf> {
    let path = workspace.unwrap_or_else(|| PathBuf::from("."));
    path.canonicalize()
        .map_err(|source| ReporterError::Workspace { path, source })
}

async fn interruptible<F, T>(operation: F) -> ReporterResult<T>
where
    F: Future<Output = PolarionResult<T>>,
{
    Ok(cancellable(operation, ctrl_c()).await?)
}

async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No handler could be installed; never report an interrupt.
        std::future::pending::<()>().await;
    }
}

fn print_publish_outcome(outcome: &PublishOutcome, server_url: &str) {
    match outcome {
        PublishOutcome::NoFilesMatched => {
            println!("No test result files matched; nothing was uploaded.");
        }
        PublishOutcome::Published(run) => {
            for ignored in &run.ignored_files {
                println!("Ignored additional match {}", ignored.display());
            }
            println!(
                "TestResults Upload job submitted with JobID {}. Took {}ms",
                run.job_id,
                run.elapsed.as_millis()
            );
            println!("Job log - {}", run.job_report_url(server_url));
            println!("TestRun link - {}", run.test_run_url(server_url));
            info!("Published {}", run.composite_id());
        }
    }
}
