use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{FsArtifactSink, HttpGeneratorClient};
use form_controller::{ActionOutcome, FormController, FormFields};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod config;
mod render;

/// Generate ArUCO marker previews and LightBurn files from a generator service.
#[derive(Parser, Debug)]
#[command(name = "aruco-form", version)]
struct Cli {
    /// Generator service URL (overrides config and environment).
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Directory for the preview and downloaded files.
    #[arg(long, global = true)]
    out_dir: Option<PathBuf>,
    /// Config file; defaults to ./aruco-form.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the dictionaries the service supports.
    Dictionaries,
    /// List the named presets.
    Presets,
    /// Render a preview of the configured grid.
    Preview {
        #[command(flatten)]
        form: FormArgs,
        #[arg(long)]
        preset: Option<String>,
        /// Also download the LightBurn file once the preview succeeds.
        #[arg(long)]
        download: bool,
    },
    /// Download the LightBurn file for the configured grid.
    Download {
        #[command(flatten)]
        form: FormArgs,
        #[arg(long)]
        preset: Option<String>,
    },
    /// One 2" marker with border and label.
    Single {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        download: bool,
    },
    /// Two 2" markers stacked vertically.
    Grid {
        #[arg(long)]
        start_id: i64,
        #[arg(long)]
        download: bool,
    },
    /// The service's fixed test sheet.
    QuickTest {
        #[arg(long)]
        download: bool,
    },
    /// Download a ZIP of files with sequential marker ids.
    Batch {
        #[command(flatten)]
        form: FormArgs,
        #[arg(long)]
        preset: Option<String>,
        #[arg(long, default_value_t = 5)]
        batch_size: i64,
        #[arg(long, default_value_t = 10)]
        markers_per_file: i64,
    },
    /// List the laser material profiles.
    Materials,
}

/// Form inputs. Values stay text so the controller validates them the same
/// way it validates typed input.
#[derive(Args, Debug)]
struct FormArgs {
    #[arg(long)]
    dictionary: Option<String>,
    #[arg(long)]
    rows: Option<String>,
    #[arg(long)]
    cols: Option<String>,
    #[arg(long)]
    start_id: Option<String>,
    #[arg(long)]
    size_mm: Option<String>,
    #[arg(long)]
    spacing_mm: Option<String>,
    #[arg(long)]
    no_borders: bool,
    #[arg(long)]
    no_labels: bool,
    #[arg(long)]
    outer_border: bool,
    #[arg(long)]
    border_width: Option<String>,
}

impl FormArgs {
    fn apply_to(self, form: &mut FormFields) {
        let text_fields = [
            (self.dictionary, &mut form.dictionary),
            (self.rows, &mut form.rows),
            (self.cols, &mut form.cols),
            (self.start_id, &mut form.start_id),
            (self.size_mm, &mut form.size_mm),
            (self.spacing_mm, &mut form.spacing_mm),
            (self.border_width, &mut form.border_width),
        ];
        for (value, field) in text_fields {
            if let Some(value) = value {
                *field = value;
            }
        }
        if self.no_borders {
            form.include_borders = false;
        }
        if self.no_labels {
            form.include_labels = false;
        }
        if self.outer_border {
            form.include_outer_border = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut settings = config::load_settings(cli.config.as_deref())?;
    if let Some(base_url) = cli.base_url {
        settings.base_url = base_url;
    }
    if let Some(out_dir) = cli.out_dir {
        settings.output_dir = out_dir;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    debug!(?settings, "settings loaded");

    let client = HttpGeneratorClient::new(&settings.base_url, settings.request_timeout())
        .context("failed to create generator client")?;
    let sink = FsArtifactSink::new(settings.output_dir.clone());
    debug!(dir = %sink.dir().display(), "artifact directory");
    let mut controller = FormController::new(Arc::new(client), Arc::new(sink));

    let ok = run(&mut controller, cli.command, &settings.output_dir).await?;
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn run(controller: &mut FormController, command: Command, out_dir: &Path) -> Result<bool> {
    match command {
        Command::Dictionaries => {
            let outcome = controller.initialize().await;
            if outcome.is_failure() {
                println!("{}", render::state(controller.state()));
                return Ok(false);
            }
            println!("{}", render::catalog(controller.catalog()));
            Ok(true)
        }
        Command::Presets => {
            let outcome = controller.load_presets().await;
            print_notices(controller);
            if outcome.is_failure() {
                return Ok(false);
            }
            println!("{}", render::presets(controller.presets()));
            Ok(true)
        }
        Command::Preview {
            form,
            preset,
            download,
        } => {
            if !prepare_form(controller, form, preset.as_deref()).await {
                return Ok(false);
            }
            let outcome = controller.generate_from_form().await;
            finish(controller, outcome, download, out_dir).await
        }
        Command::Download { form, preset } => {
            if !prepare_form(controller, form, preset.as_deref()).await {
                return Ok(false);
            }
            let outcome = controller.download_from_form().await;
            print_notices(controller);
            Ok(!outcome.is_failure())
        }
        Command::Single { id, download } => {
            if !load_catalog(controller).await {
                return Ok(false);
            }
            let outcome = controller.generate_single(id).await;
            finish(controller, outcome, download, out_dir).await
        }
        Command::Grid { start_id, download } => {
            if !load_catalog(controller).await {
                return Ok(false);
            }
            let outcome = controller.generate_grid(start_id).await;
            finish(controller, outcome, download, out_dir).await
        }
        Command::QuickTest { download } => {
            // Quick test works without a catalog.
            controller.initialize().await;
            let outcome = controller.quick_test().await;
            finish(controller, outcome, download, out_dir).await
        }
        Command::Batch {
            form,
            preset,
            batch_size,
            markers_per_file,
        } => {
            if !prepare_form(controller, form, preset.as_deref()).await {
                return Ok(false);
            }
            let outcome = controller
                .download_batch_from_form(batch_size, markers_per_file)
                .await;
            print_notices(controller);
            Ok(!outcome.is_failure())
        }
        Command::Materials => {
            let outcome = controller.load_materials().await;
            print_notices(controller);
            if outcome.is_failure() {
                return Ok(false);
            }
            println!("{}", render::materials(controller.materials()));
            Ok(true)
        }
    }
}

/// Returns false, after showing the error, when the dictionaries cannot be
/// loaded.
async fn load_catalog(controller: &mut FormController) -> bool {
    if controller.initialize().await.is_failure() {
        println!("{}", render::state(controller.state()));
        println!("{}", render::controls(controller.controls()));
        return false;
    }
    true
}

/// Loads the catalog, applies the preset and then explicit flags on top of the
/// default form. Returns false when the form cannot be used.
async fn prepare_form(
    controller: &mut FormController,
    form: FormArgs,
    preset: Option<&str>,
) -> bool {
    if !load_catalog(controller).await {
        return false;
    }
    if let Some(name) = preset {
        if controller.apply_preset(name).await.is_failure() {
            print_notices(controller);
            return false;
        }
        info!(preset = name, "preset applied");
    }
    form.apply_to(controller.form_mut());
    println!(
        "{}",
        render::summary(
            &controller.marker_summary(),
            &controller.field_marks(),
            controller.form()
        )
    );
    true
}

async fn finish(
    controller: &mut FormController,
    outcome: ActionOutcome,
    download: bool,
    out_dir: &Path,
) -> Result<bool> {
    println!("{}", render::state(controller.state()));
    let mut ok = !outcome.is_failure();

    if let Some(preview) = controller.state().preview().cloned() {
        let path = render::write_preview(out_dir, &preview)?;
        println!("Preview written to {}", path.display());
        if download {
            ok &= !controller.download_current().await.is_failure();
        }
    }

    println!("{}", render::controls(controller.controls()));
    print_notices(controller);
    Ok(ok)
}

fn print_notices(controller: &mut FormController) {
    for notice in controller.take_notices() {
        println!("{}", render::notice(&notice));
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
