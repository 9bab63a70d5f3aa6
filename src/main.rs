use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use flowdb::prelude::*;

/// Upper bound on drive rounds so a looping model cannot hang the tool.
const MAX_ROUNDS: usize = 100;

#[derive(Parser)]
#[command(name = "flowdb")]
#[command(about = "Profiles the database operations of process engine commands")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Deploys a model, runs one instance and prints the profile report.
    Profile {
        model: PathBuf,
        /// Complete every open user task until none remain.
        #[arg(long)]
        complete_tasks: bool,
        /// Execute async jobs and fire timers until none remain.
        #[arg(long)]
        execute_jobs: bool,
        #[arg(long)]
        no_relationship_counts: bool,
        #[arg(long)]
        no_bulk_insert: bool,
        /// Print the per-command statistics as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Checks a model file without running it.
    Validate { model: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Profile {
            model,
            complete_tasks,
            execute_jobs,
            no_relationship_counts,
            no_bulk_insert,
            json,
        } => {
            let config = EngineConfig::new()
                .engine_name("flowdb-profile")
                .enable_relationship_counts(!no_relationship_counts)
                .bulk_insert_enabled(!no_bulk_insert);
            let options = DriveOptions {
                complete_tasks,
                execute_jobs,
            };
            profile(&model, config, options, json).await
        }
        Command::Validate { model } => {
            let model = load_model(&model)?;
            println!(
                "Model '{}' is valid: {} elements, {} flows",
                model.key,
                model.elements.len(),
                model.flows.len()
            );
            Ok(())
        }
    }
}

#[derive(Clone, Copy)]
struct DriveOptions {
    complete_tasks: bool,
    execute_jobs: bool,
}

fn load_model(path: &Path) -> Result<ProcessModel> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read model '{}'", path.display()))?;
    ProcessModel::from_json(&json).with_context(|| format!("Invalid model '{}'", path.display()))
}

async fn profile(path: &Path, config: EngineConfig, options: DriveOptions, json: bool) -> Result<()> {
    let model = load_model(path)?;
    let key = model.key.clone();
    let engine = ProcessEngine::new(config)?;
    let profiler = engine.enable_profiling()?;

    engine.repository_service().deploy(model).await?;

    let session = profiler.start_profile_session(&format!("profile {}", key));
    let instance = engine
        .runtime_service()
        .start_process_instance_by_key(&key)
        .await?;
    let rounds = drive(&engine, options).await?;
    profiler.stop_current_profile_session();

    if json {
        let summary = session.calculate_summary_statistics();
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", ProfileReport::new(&session));
        println!();
        println!(
            "Process instance {} driven in {} rounds",
            instance.id, rounds
        );
    }
    Ok(())
}

/// Completes tasks and executes jobs until nothing is left to do.
async fn drive(engine: &ProcessEngine, options: DriveOptions) -> Result<usize> {
    let tasks = engine.task_service();
    let management = engine.management_service();

    for round in 0..MAX_ROUNDS {
        let mut progressed = false;

        if options.complete_tasks {
            for task in tasks.create_task_query().active().list().await? {
                tasks.complete(&task.id).await?;
                progressed = true;
            }
        }

        if options.execute_jobs {
            for timer in management.create_timer_job_query().list().await? {
                management.move_timer_to_executable_job(&timer.id).await?;
            }
            for job in management.create_job_query().list().await? {
                if let Err(err) = management.execute_job(&job.id).await {
                    eprintln!("job {} failed: {}", job.id, err);
                }
                progressed = true;
            }
        }

        if !progressed {
            return Ok(round);
        }
    }
    bail!("process did not settle after {} rounds", MAX_ROUNDS)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const ONE_TASK: &str = r#"{
        "key": "oneTask",
        "elements": [
            {"id": "start", "type": "startEvent"},
            {"id": "review", "type": "userTask", "assignee": "kermit"},
            {"id": "end", "type": "endEvent"}
        ],
        "flows": [
            {"id": "flow1", "source": "start", "target": "review"},
            {"id": "flow2", "source": "review", "target": "end"}
        ]
    }"#;

    fn model_file(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_model() {
        let file = model_file(ONE_TASK);
        let model = load_model(file.path()).unwrap();
        assert_eq!(model.key, "oneTask");

        let broken = model_file(r#"{"key": "broken", "elements": []}"#);
        let err = load_model(broken.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid model"));

        let dir = tempfile::tempdir().unwrap();
        let err = load_model(&dir.path().join("missing.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read model"));
    }

    #[tokio::test]
    async fn test_drive_completes_tasks() {
        let file = model_file(ONE_TASK);
        let engine = ProcessEngine::new(EngineConfig::new()).unwrap();
        engine
            .repository_service()
            .deploy(load_model(file.path()).unwrap())
            .await
            .unwrap();
        engine
            .runtime_service()
            .start_process_instance_by_key("oneTask")
            .await
            .unwrap();

        let idle = DriveOptions {
            complete_tasks: false,
            execute_jobs: true,
        };
        assert_eq!(drive(&engine, idle).await.unwrap(), 0);

        let options = DriveOptions {
            complete_tasks: true,
            execute_jobs: true,
        };
        assert_eq!(drive(&engine, options).await.unwrap(), 1);
        let open = engine
            .runtime_service()
            .create_process_instance_query()
            .count()
            .await
            .unwrap();
        assert_eq!(open, 0);
    }
}
