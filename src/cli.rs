use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::auth::Token;
use crate::config::Config;
use crate::output;
use crate::providers::gitlab::types::Job;
use crate::providers::gitlab::GitLabProvider;
use crate::watch::{self, CancelFlag, DrawTarget, WatchOptions};

/// Exit code of a process stopped by a second SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Parser)]
#[command(name = "gitlabctl")]
#[command(author, version, about = "Command line interface for GitLab", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file, instead of ~/.gitlabctl.{toml,yaml,yml,json}
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// GitLab instance URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Personal access token
    #[arg(long, global = true, env = "GITLAB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Allow connections to servers with invalid TLS certificates
    #[arg(short = 'k', long, global = true, default_value_t = false)]
    insecure: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect, run and watch pipelines
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommands,
    },
    /// Inspect and act on jobs
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
    /// Browse projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
}

#[derive(Subcommand)]
enum PipelineCommands {
    /// List the latest pipelines of a project
    List {
        #[arg(short, long)]
        project: String,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// List jobs of a pipeline, or the latest jobs of the project
    Jobs {
        #[arg(short, long)]
        project: String,

        #[arg(short = 'l', long)]
        pipeline: Option<u64>,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show a pipeline and watch it while it is pending or running
    Status {
        #[arg(short, long)]
        project: String,

        #[arg(short = 'l', long)]
        pipeline: u64,

        /// Print the current status only
        #[arg(long, default_value_t = false)]
        no_watch: bool,
    },
    /// Create a pipeline for a branch or tag
    Run {
        #[arg(short, long)]
        project: String,

        #[arg(short = 'r', long = "ref")]
        ref_: String,

        /// Watch the new pipeline until it finishes
        #[arg(short, long, default_value_t = false)]
        watch: bool,
    },
    /// Cancel a pipeline
    Cancel {
        #[arg(short, long)]
        project: String,

        #[arg(short = 'l', long)]
        pipeline: u64,
    },
}

#[derive(Subcommand)]
enum JobCommands {
    /// Duration statistics per job name from recent history
    Stats {
        #[arg(short, long)]
        project: String,
    },
    /// Print the log of a job
    Trace {
        #[arg(short, long)]
        project: String,

        #[arg(short, long)]
        job: u64,
    },
    /// Retry a job
    Retry {
        #[arg(short, long)]
        project: String,

        #[arg(short, long)]
        job: u64,
    },
    /// Cancel a job
    Cancel {
        #[arg(short, long)]
        project: String,

        #[arg(short, long)]
        job: u64,
    },
    /// Start a manual job
    Play {
        #[arg(short, long)]
        project: String,

        #[arg(short, long)]
        job: u64,
    },
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// List projects the token is a member of
    List {
        #[arg(short, long)]
        search: Option<String>,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Clone, Copy)]
enum JobAction {
    Retry,
    Cancel,
    Play,
}

impl Cli {
    pub async fn execute(&self) -> Result<ExitCode> {
        let config = Config::load(self.config.as_deref())?;

        match &self.command {
            Commands::Pipeline { command } => self.execute_pipeline(&config, command).await,
            Commands::Job { command } => self.execute_job(&config, command).await,
            Commands::Project { command } => self.execute_project(&config, command).await,
        }
    }

    /// Builds a provider for `project`; command line flags win over the
    /// configuration file.
    fn provider(&self, config: &Config, project: &str) -> Result<GitLabProvider> {
        let base_url = self.base_url.as_deref().unwrap_or(&config.gitlab.base_url);
        let token = self
            .token
            .as_deref()
            .or(config.gitlab.access_token.as_deref())
            .map(Token::from);
        let insecure = self.insecure || config.gitlab.insecure;

        if token.is_none() {
            warn!("No access token configured, only public projects are reachable");
        }

        let provider = GitLabProvider::new(base_url, project.to_owned(), token, insecure)
            .with_context(|| format!("Failed to set up GitLab client for {base_url}"))?;

        Ok(provider.with_history_limit(config.gitlab.history_limit))
    }

    async fn execute_pipeline(
        &self,
        config: &Config,
        command: &PipelineCommands,
    ) -> Result<ExitCode> {
        match command {
            PipelineCommands::List { project, limit } => {
                let provider = self.provider(config, project)?;
                let pipelines = provider.client.list_pipelines(project, *limit).await?;
                println!("{}", output::pipelines_table(&pipelines));
            }
            PipelineCommands::Jobs {
                project,
                pipeline,
                limit,
            } => {
                let provider = self.provider(config, project)?;
                let jobs = match pipeline {
                    Some(pipeline_id) => {
                        provider
                            .client
                            .list_pipeline_jobs(project, *pipeline_id)
                            .await?
                    }
                    None => provider.client.list_project_jobs(project, *limit).await?,
                };
                println!("{}", output::jobs_table(&jobs));
            }
            PipelineCommands::Status {
                project,
                pipeline,
                no_watch,
            } => {
                let provider = self.provider(config, project)?;
                let current = provider.client.get_pipeline(project, *pipeline).await?;
                println!("{}", output::pipelines_table(std::slice::from_ref(&current)));

                if current.status.is_active() && !no_watch {
                    return Ok(watch_until_done(&provider, current.id, config).await);
                }
            }
            PipelineCommands::Run {
                project,
                ref_,
                watch: follow,
            } => {
                let provider = self.provider(config, project)?;
                let created = provider.client.create_pipeline(project, ref_).await?;
                info!("Created pipeline {} on {}", created.id, created.ref_);
                println!("{}", output::pipelines_table(std::slice::from_ref(&created)));
                if !created.web_url.is_empty() {
                    println!("{}", output::dim(&created.web_url));
                }

                if *follow {
                    return Ok(watch_until_done(&provider, created.id, config).await);
                }
            }
            PipelineCommands::Cancel { project, pipeline } => {
                let provider = self.provider(config, project)?;
                let cancelled = provider.client.cancel_pipeline(project, *pipeline).await?;
                println!(
                    "Pipeline {} is now {}",
                    output::cyan(cancelled.id),
                    output::styled_status(cancelled.status)
                );
            }
        }

        Ok(ExitCode::SUCCESS)
    }

    async fn execute_job(&self, config: &Config, command: &JobCommands) -> Result<ExitCode> {
        match command {
            JobCommands::Stats { project } => {
                let provider = self.provider(config, project)?;
                let stats = watch::fetch_stats(&provider).await?;
                println!("{}", output::stats_table(&watch::sorted_stats(&stats)));
            }
            JobCommands::Trace { project, job } => {
                let provider = self.provider(config, project)?;
                let trace = provider.client.job_trace(project, *job).await?;
                print!("{trace}");
            }
            JobCommands::Retry { project, job } => {
                self.job_action(config, project, *job, JobAction::Retry)
                    .await?;
            }
            JobCommands::Cancel { project, job } => {
                self.job_action(config, project, *job, JobAction::Cancel)
                    .await?;
            }
            JobCommands::Play { project, job } => {
                self.job_action(config, project, *job, JobAction::Play)
                    .await?;
            }
        }

        Ok(ExitCode::SUCCESS)
    }

    async fn job_action(
        &self,
        config: &Config,
        project: &str,
        job_id: u64,
        action: JobAction,
    ) -> Result<()> {
        let provider = self.provider(config, project)?;
        let job = match action {
            JobAction::Retry => provider.client.retry_job(project, job_id).await?,
            JobAction::Cancel => provider.client.cancel_job(project, job_id).await?,
            JobAction::Play => provider.client.play_job(project, job_id).await?,
        };
        print_job_line(&job);
        Ok(())
    }

    async fn execute_project(
        &self,
        config: &Config,
        command: &ProjectCommands,
    ) -> Result<ExitCode> {
        match command {
            ProjectCommands::List { search, limit } => {
                // project listing is not scoped to a project
                let provider = self.provider(config, "")?;
                let projects = provider
                    .client
                    .list_projects(search.as_deref(), *limit)
                    .await?;
                println!("{}", output::projects_table(&projects));
            }
        }

        Ok(ExitCode::SUCCESS)
    }
}

fn print_job_line(job: &Job) {
    println!(
        "Job {} ({}) is now {}",
        output::cyan(job.id),
        job.name,
        output::styled_status(job.status)
    );
}

/// Watches a pipeline with Ctrl-C wired to the cancel flag.
///
/// Anything but a successful finish maps to a failing exit code.
async fn watch_until_done(
    provider: &GitLabProvider,
    pipeline_id: u64,
    config: &Config,
) -> ExitCode {
    let cancel = CancelFlag::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("{}", output::dim("Stopping watch, press Ctrl-C again to quit"));
                cancel.cancel();
            }
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(INTERRUPTED_EXIT_CODE);
            }
        })
    };

    let draw_target = if console::user_attended_stderr() {
        DrawTarget::Stderr
    } else {
        DrawTarget::Hidden
    };
    let options = WatchOptions {
        cancel: Some(cancel),
        draw_target,
        ..WatchOptions::from(&config.watch)
    };
    let report = watch::watch_pipeline(provider, pipeline_id, &options).await;
    interrupt.abort();
    info!(
        "Watch of pipeline {} ended after {} polls",
        report.pipeline_id, report.ticks
    );

    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_pipeline_run_with_watch() {
        let cli = Cli::try_parse_from([
            "gitlabctl", "pipeline", "run", "-p", "group/app", "-r", "main", "-w",
        ])
        .unwrap();

        match cli.command {
            Commands::Pipeline {
                command:
                    PipelineCommands::Run {
                        project,
                        ref_,
                        watch,
                    },
            } => {
                assert_eq!(project, "group/app");
                assert_eq!(ref_, "main");
                assert!(watch);
            }
            _ => panic!("expected pipeline run"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "gitlabctl",
            "job",
            "trace",
            "-p",
            "42",
            "-j",
            "7",
            "--base-url",
            "https://gitlab.example.com",
            "-k",
        ])
        .unwrap();

        assert_eq!(cli.base_url.as_deref(), Some("https://gitlab.example.com"));
        assert!(cli.insecure);
        assert!(matches!(
            cli.command,
            Commands::Job {
                command: JobCommands::Trace { job: 7, .. }
            }
        ));
    }

    #[test]
    fn test_pipeline_status_requires_pipeline_id() {
        let result = Cli::try_parse_from(["gitlabctl", "pipeline", "status", "-p", "42"]);

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_flags_override_config() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v4/projects/42/jobs")
            .match_query(mockito::Matcher::UrlEncoded("per_page".into(), "30".into()))
            .match_header("authorization", "Bearer glpat-flag")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let url = server.url();
        let cli = Cli::try_parse_from([
            "gitlabctl",
            "job",
            "stats",
            "-p",
            "42",
            "--base-url",
            url.as_str(),
            "--token",
            "glpat-flag",
        ])
        .unwrap();
        let mut config = Config::default();
        config.gitlab.base_url = "https://file.example.com".to_string();
        config.gitlab.access_token = Some("glpat-file".to_string());
        config.gitlab.history_limit = 30;

        let provider = cli.provider(&config, "42").unwrap();
        let stats = watch::fetch_stats(&provider).await;

        tokio_test::assert_ok!(stats);
        mock.assert_async().await;
    }
}
