pub mod capabilities;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod league;
pub mod logging;

pub use engine::batch::{BatchPolicy, BatchReport, BatchRunner};
pub use engine::pipeline::{PostProcessor, ProcessedLogo};
pub use error::AppError;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;

use capabilities::{default_clipboard, DirectorySaver, FileSaver};
use cli::{Cli, Command, PaletteMode};
use config::AppConfig;
use engine::generator::{LogoGenerator, PollinationsGenerator};
use engine::pipeline::{HttpImageFetcher, ImageFetcher};
use engine::team::{demo_teams, download_file_name, Team, TeamRoster};
use league::{LeagueClient, LeagueRequest};

/// Per-team export result written to `report.json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord {
    pub team_id: String,
    pub team_name: String,
    pub png: Option<PathBuf>,
    pub svg: Option<PathBuf>,
    pub error: Option<AppError>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunReport<'a> {
    league: &'a str,
    generation: &'a BatchReport,
    exports: &'a [ExportRecord],
}

/// Post-process and save every team that has a logo locator. Each team's
/// failure is recorded in its own record; the rest continue.
pub async fn export_logos<F: ImageFetcher>(
    processor: &PostProcessor<F>,
    saver: &dyn FileSaver,
    teams: &[Team],
) -> Vec<ExportRecord> {
    let mut records = Vec::new();
    for team in teams {
        let Some(url) = team.logo_url.as_deref() else {
            continue;
        };
        let mut record = ExportRecord {
            team_id: team.id.clone(),
            team_name: team.name.clone(),
            png: None,
            svg: None,
            error: None,
        };

        match processor.process(url, &team.primary, &team.secondary).await {
            Ok(logo) => {
                match saver.save(&download_file_name(&team.name, "png"), &logo.png).await {
                    Ok(path) => record.png = Some(path),
                    Err(e) => record.error = Some(e),
                }
                if let Some(svg) = logo.svg {
                    match saver.save(&download_file_name(&team.name, "svg"), svg.as_bytes()).await {
                        Ok(path) => record.svg = Some(path),
                        Err(e) => tracing::warn!(team = %team.name, error = %e, "SVG save failed"),
                    }
                }
            }
            Err(e) => {
                tracing::error!(team_id = %team.id, error = %e, "Post-processing failed for {}", team.name);
                record.error = Some(e);
            }
        }
        records.push(record);
    }
    records
}

async fn load_teams(command: &Command, config: &AppConfig, http: &reqwest::Client) -> Result<(String, Vec<Team>), AppError> {
    match command {
        Command::Demo => Ok(("Demo League".into(), demo_teams())),
        Command::Import { provider, league_id, swid, s2 } => {
            let endpoint = config
                .league_import_url
                .clone()
                .ok_or_else(|| AppError::Validation("LEAGUE_IMPORT_URL is not configured".into()))?;
            let league = LeagueClient::new(http.clone(), endpoint)
                .load(&LeagueRequest {
                    provider: *provider,
                    league_id: league_id.clone(),
                    swid: swid.clone(),
                    s2: s2.clone(),
                })
                .await?;
            Ok((league.name, league.teams))
        }
    }
}

/// Full headless run: load teams, generate all, post-process, save, report.
pub async fn execute(cli: Cli) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(out) = cli.run.out.clone() {
        config.output_dir = out;
    }
    if let Some(policy) = cli.run.policy {
        config.policy = policy;
    }
    logging::install_crash_hook(&config.output_dir);
    tracing::debug!(?config, "Configuration resolved");

    let http = http::build_client(config.http_timeout)?;
    let (league_name, teams) = load_teams(&cli.command, &config, &http).await?;
    if teams.is_empty() {
        tracing::warn!(league = %league_name, "League has no teams, nothing to generate");
        return Ok(());
    }

    let roster = TeamRoster::new(teams);
    match cli.run.palette {
        PaletteMode::Keep => {}
        PaletteMode::Preset => roster.apply_preset_palette(),
        PaletteMode::Remix => roster.remix_palette(),
    }
    if cli.run.reseed {
        for team in roster.snapshot() {
            roster.reseed(&team.id);
        }
    }

    let generator: Arc<dyn LogoGenerator> = Arc::new(PollinationsGenerator::new(
        http.clone(),
        config.generator_url.clone(),
        config.image_size,
    ));
    let runner = BatchRunner::new(generator, config.policy.policy());
    let report = runner
        .run(&roster, |p| tracing::info!(completed = p.completed, total = p.total, "Progress {}/{}", p.completed, p.total))
        .await?;
    for failure in report.failures() {
        tracing::error!(team = %failure.team_name, "Logo generation failed for {}. Try again.", failure.team_name);
    }

    let teams = roster.snapshot();
    if cli.run.copy_urls {
        let clipboard = default_clipboard();
        let urls: Vec<&str> = teams.iter().filter_map(|t| t.logo_url.as_deref()).collect();
        if let Err(e) = clipboard.write_text(&urls.join("\n")) {
            tracing::warn!(error = %e, "Could not copy logo urls");
        }
    }

    let processor = PostProcessor::new(HttpImageFetcher::new(http)).with_vectorize(!cli.run.no_svg);
    let saver = DirectorySaver::new(config.output_dir.clone());
    let exports = export_logos(&processor, &saver, &teams).await;

    let summary = RunReport {
        league: &league_name,
        generation: &report,
        exports: &exports,
    };
    let report_path = saver
        .save("report.json", &serde_json::to_vec_pretty(&summary)?)
        .await?;

    let saved = exports.iter().filter(|e| e.png.is_some()).count();
    tracing::info!(
        league = %league_name,
        generated = report.succeeded(),
        saved,
        report = %report_path.display(),
        "Done"
    );
    Ok(())
}

/// Binary entry point.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    logging::init(cli.run.json_logs);

    tracing::info!("Starting League Logos v{}", env!("CARGO_PKG_VERSION"));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(execute(cli))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use engine::export::encode_png;
    use image::{Rgba, RgbaImage};

    struct OneImage(Vec<u8>);

    #[async_trait]
    impl ImageFetcher for OneImage {
        async fn fetch(&self, locator: &str) -> Result<Vec<u8>, AppError> {
            if locator.ends_with("/broken") {
                return Err(AppError::Http { status: 502, url: locator.into() });
            }
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_export_isolates_failures() {
        let mut img = RgbaImage::from_pixel(20, 20, Rgba([255, 255, 255, 255]));
        img.put_pixel(10, 10, Rgba([0, 0, 0, 255]));
        let processor = PostProcessor::new(OneImage(encode_png(&img).unwrap()));

        let tmp = tempfile::tempdir().unwrap();
        let saver = DirectorySaver::new(tmp.path());

        let mut teams = demo_teams().into_iter().take(3).collect::<Vec<_>>();
        teams[0].logo_url = Some("https://img.test/ok".into());
        teams[1].logo_url = Some("https://img.test/broken".into());
        teams[2].logo_url = None;

        let records = export_logos(&processor, &saver, &teams).await;
        assert_eq!(records.len(), 2);

        assert!(records[0].error.is_none());
        let png = records[0].png.as_ref().unwrap();
        assert_eq!(png, &tmp.path().join("Blue_Wolves_logo.png"));
        assert!(png.exists());
        assert!(records[0].svg.as_ref().unwrap().exists());

        assert!(records[1].png.is_none());
        assert!(matches!(records[1].error, Some(AppError::Http { status: 502, .. })));
    }
}
