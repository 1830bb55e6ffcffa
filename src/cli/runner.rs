//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat, SettingsSource};
use crate::cli::render;
use crate::config::ConnectorConfig;
use crate::connector::HydraConnector;
use crate::error::{Error, Result, ResultExt};
use crate::types::JsonValue;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::io::AsyncWrite;
use tracing::{debug, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Build a connector from the command line and the environment
    pub fn connector(&self) -> Result<HydraConnector> {
        let mut config = ConnectorConfig::from_env(self.cli.url.clone().unwrap_or_default());
        config.timeout = Duration::from_secs(self.cli.timeout);
        HydraConnector::new(config)
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let mut connector = self.connector()?;

        let cancel = connector.cancellation_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling");
                cancel.cancel();
            }
        });

        let result = self.dispatch(&mut connector).await;

        if let Err(e) = &result {
            if e.is_auth_error() {
                eprintln!("Hint: run `hydra-connect login` and export HYDRA_SESSION");
            }
        }
        result
    }

    async fn dispatch(&self, hydra: &mut HydraConnector) -> Result<()> {
        match &self.cli.command {
            Commands::Login => self.login(hydra).await,
            Commands::Logout => {
                hydra.logout().await?;
                println!("You are now logged out.");
                println!("You may also want to unset the following environment variable:\n");
                println!("unset HYDRA_SESSION");
                Ok(())
            }

            Commands::Projects => {
                let value = hydra.query_projects().await?;
                let invisible = self.cli.display_invisible;
                self.output(&value, |out| render::projects(out, &value, invisible))
            }
            Commands::Project { id } => {
                let value = hydra.query_project(id).await?;
                self.output(&value, |out| render::project(out, id, &value))
            }
            Commands::ModifyProject { id, settings } => {
                let settings = load_settings(settings)?;
                let value = hydra.create_or_update_project(id, &settings).await?;
                self.output(&value, |out| render::plain(out, &value))
            }
            Commands::DeleteProject { id } => {
                let value = hydra.delete_project(id).await?;
                self.output(&value, |out| render::plain(out, &value))
            }

            Commands::Jobset { project, jobset } => {
                let value = hydra.query_jobset(project, jobset).await?;
                self.output(&value, |out| render::jobset(out, project, jobset, &value))
            }
            Commands::ModifyJobset {
                project,
                jobset,
                settings,
            } => {
                let settings = load_settings(settings)?;
                let value = hydra
                    .create_or_update_jobset(project, jobset, &settings)
                    .await?;
                self.output(&value, |out| render::plain(out, &value))
            }
            Commands::DeleteJobset { project, jobset } => {
                let value = hydra.delete_jobset(project, jobset).await?;
                self.output(&value, |out| render::plain(out, &value))
            }
            Commands::Evals { project, jobset } => {
                let value = hydra.query_evaluations(project, jobset).await?;
                self.output(&value, |out| render::evaluations(out, &value))
            }

            Commands::Eval { id } => {
                let value = hydra.query_evaluation(id).await?;
                self.output(&value, |out| render::evaluation(out, &value))
            }
            Commands::CancelEval { id } => self.simple(hydra.cancel_builds(id).await?),
            Commands::BumpEval { id } => {
                self.simple(hydra.bump_evaluation_priorities(id).await?)
            }
            Commands::RestartAborted { id } => {
                self.simple(hydra.restart_aborted_builds(id).await?)
            }
            Commands::RestartFailed { id } => self.simple(hydra.restart_failed_builds(id).await?),

            Commands::Build { id } => {
                let value = hydra.query_build(id).await?;
                self.output(&value, |out| render::build(out, &value))
            }
            Commands::Restart { id } => self.simple(hydra.restart_build(id).await?),
            Commands::Cancel { id } => self.simple(hydra.cancel_build(id).await?),
            Commands::Bump { id } => self.simple(hydra.bump_build_priority(id).await?),
            Commands::Keep { build, product } => {
                self.simple(hydra.keep_build_product(build, product).await?)
            }

            Commands::BuildProduct {
                build,
                product,
                output,
            } => {
                let mut target = DownloadTarget::open(output.as_deref())?;
                hydra
                    .download_build_product(build, product, &mut target.sink)
                    .await?;
                target.commit()
            }
            Commands::RawLog { build, output } => {
                let mut target = DownloadTarget::open(output.as_deref())?;
                hydra
                    .download_raw_build_log(build, &mut target.sink)
                    .await?;
                target.commit()
            }
            Commands::Reproduce { build, output } => {
                let mut target = DownloadTarget::open(output.as_deref())?;
                hydra
                    .download_build_reproduce_script(build, &mut target.sink)
                    .await?;
                target.commit()
            }

            Commands::Queue => {
                let value = hydra.show_queue().await?;
                self.output(&value, |out| render::queue(out, &value))
            }
            Commands::Status => {
                let value = hydra.show_status().await?;
                self.output(&value, |out| render::queue(out, &value))
            }
            Commands::NumOfBuilds => self.simple(hydra.show_num_of_builds_in_queue().await?),
            Commands::ClearVcsCache => self.simple(hydra.clear_vcs_caches().await?),
            Commands::ClearFailedCache => self.simple(hydra.clear_failed_builds_cache().await?),
            Commands::ClearNonCurrent => {
                self.simple(hydra.clear_non_current_builds_from_queue().await?)
            }
        }
    }

    async fn login(&self, hydra: &mut HydraConnector) -> Result<()> {
        let (username, password) = prompt_credentials()?;
        let token = hydra.login(&username, &password).await?;

        println!("Your Hydra session id is: {token}");
        println!("You can memorize it by setting the following environment variable:\n");
        println!("export HYDRA_SESSION={token}");
        Ok(())
    }

    fn simple(&self, value: JsonValue) -> Result<()> {
        self.output(&value, |out| render::plain(out, &value))
    }

    /// Output a result in the selected format
    fn output<F>(&self, value: &JsonValue, pretty: F) -> Result<()>
    where
        F: FnOnce(&mut dyn Write) -> io::Result<()>,
    {
        let stdout = io::stdout();
        let mut out = stdout.lock();

        match self.cli.format {
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut out, value)?;
                writeln!(out)?;
            }
            OutputFormat::Pretty => pretty(&mut out)?,
        }
        out.flush()?;
        Ok(())
    }
}

/// Read project or jobset settings from inline JSON or a file
pub fn load_settings(source: &SettingsSource) -> Result<JsonValue> {
    if let Some(json) = &source.settings_json {
        return serde_json::from_str(json).context("Invalid --settings-json");
    }

    let Some(path) = &source.settings else {
        return Err(Error::config("Either --settings-json or --settings is required"));
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in settings file {}", path.display()))
}

/// Destination of a download
///
/// A file is written through a temporary file in the same directory, which
/// replaces the target only after the whole body arrived.
struct DownloadTarget {
    sink: Box<dyn AsyncWrite + Unpin + Send>,
    pending: Option<(NamedTempFile, PathBuf)>,
}

impl DownloadTarget {
    fn open(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self {
                sink: Box::new(tokio::io::stdout()),
                pending: None,
            });
        };

        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let temp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create a temporary file in {}", dir.display()))?;
        let file = temp.reopen()?;
        debug!(path = %path.display(), temp = %temp.path().display(), "writing download");

        Ok(Self {
            sink: Box::new(tokio::fs::File::from_std(file)),
            pending: Some((temp, path.to_path_buf())),
        })
    }

    /// Move a finished download into place
    fn commit(self) -> Result<()> {
        let Self { sink, pending } = self;
        drop(sink);

        if let Some((temp, path)) = pending {
            temp.persist(&path)
                .map_err(|e| e.error)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        Ok(())
    }
}

fn prompt_credentials() -> Result<(String, String)> {
    eprint!("username: ");
    io::stderr().flush()?;

    let mut username = String::new();
    io::stdin().lock().read_line(&mut username)?;
    let username = username.trim().to_string();
    if username.is_empty() {
        return Err(Error::auth("No username given"));
    }

    let password = rpassword::prompt_password("password: ")?;
    Ok((username, password))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::io::Write as _;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_load_settings_inline() {
        let source = SettingsSource {
            settings_json: Some(r#"{"displayname": "Foobar", "enabled": 1}"#.to_string()),
            settings: None,
        };
        assert_eq!(
            load_settings(&source).unwrap(),
            json!({"displayname": "Foobar", "enabled": 1})
        );
    }

    #[test]
    fn test_load_settings_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"nixexprinput": "src", "nixexprpath": "release.nix"}}"#).unwrap();

        let source = SettingsSource {
            settings_json: None,
            settings: Some(file.path().to_path_buf()),
        };
        let settings = load_settings(&source).unwrap();
        assert_eq!(settings["nixexprpath"], "release.nix");
    }

    #[test]
    fn test_load_settings_reports_context() {
        let source = SettingsSource {
            settings_json: Some("{not json".to_string()),
            settings: None,
        };
        let err = load_settings(&source).unwrap_err();
        assert!(err.to_string().contains("--settings-json"));

        let source = SettingsSource {
            settings_json: None,
            settings: Some("/nonexistent/settings.json".into()),
        };
        let err = load_settings(&source).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/settings.json"));
    }

    #[test]
    fn test_connector_requires_url() {
        let cli = Cli {
            url: None,
            format: OutputFormat::Json,
            display_invisible: false,
            timeout: 30,
            verbose: false,
            command: Commands::Projects,
        };
        let err = Runner::new(cli).connector().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    fn raw_log_cli(url: String, output: PathBuf) -> Cli {
        Cli {
            url: Some(url),
            format: OutputFormat::Json,
            display_invisible: false,
            timeout: 30,
            verbose: false,
            command: Commands::RawLog {
                build: "42".to_string(),
                output: Some(output),
            },
        }
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_download_replaces_file_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/build/42/log/raw"))
            .respond_with(ResponseTemplate::new(200).set_body_string("fresh log\n"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("build.log");
        std::fs::write(&target, "previous log\n").unwrap();

        Runner::new(raw_log_cli(server.uri(), target.clone()))
            .run()
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "fresh log\n");
        assert_eq!(entries(dir.path()), 1);
    }

    #[tokio::test]
    async fn test_failed_download_keeps_existing_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/build/42/log/raw"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("build.log");
        std::fs::write(&target, "previous good log\n").unwrap();

        let err = Runner::new(raw_log_cli(server.uri(), target.clone()))
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, Error::DownloadFailed { status: 404 }));
        assert_eq!(
            std::fs::read_to_string(&target).unwrap(),
            "previous good log\n"
        );
        assert_eq!(entries(dir.path()), 1);
    }

    #[tokio::test]
    async fn test_failed_download_creates_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("reproduce.sh");

        let cli = Cli {
            command: Commands::Reproduce {
                build: "42".to_string(),
                output: Some(target.clone()),
            },
            ..raw_log_cli(server.uri(), target.clone())
        };
        assert!(Runner::new(cli).run().await.is_err());

        assert!(!target.exists());
        assert_eq!(entries(dir.path()), 0);
    }
}
