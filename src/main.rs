use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tm_class_scraper::config::{FIRST_CLASS, LAST_CLASS, MAX_PAGES, SEARCH_URL};
use tm_class_scraper::{export, pipeline, ConnectionMode, JurisdictionPolicy, ScrapeConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// First Nice class to scrape
    #[arg(long, default_value_t = FIRST_CLASS)]
    first_class: u8,

    /// Last Nice class to scrape (inclusive)
    #[arg(long, default_value_t = LAST_CLASS)]
    last_class: u8,

    /// Result pages to read per class
    #[arg(long, default_value_t = MAX_PAGES)]
    max_pages: u32,

    /// Directory the xlsx files are written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Search page to start from
    #[arg(long, default_value = SEARCH_URL)]
    url: String,

    /// Abort when the India (CGPDTM) filter cannot be selected
    #[arg(long)]
    require_jurisdiction: bool,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Pass --no-sandbox to Chrome (containers, CI)
    #[arg(long)]
    no_sandbox: bool,

    /// Chrome executable to launch instead of the downloaded one
    #[arg(long)]
    chrome_path: Option<PathBuf>,

    /// Attach to a Chrome already listening on this debug port
    #[arg(long, conflicts_with_all = ["chrome_path", "headed", "no_sandbox"])]
    debug_port: Option<u16>,

    /// Only apply column widths to existing output files
    #[arg(long)]
    widths_only: bool,

    /// Write the run summary as JSON to this file
    #[arg(long)]
    summary: Option<PathBuf>,
}

impl Args {
    fn config(&self) -> anyhow::Result<ScrapeConfig> {
        if self.first_class > self.last_class {
            anyhow::bail!(
                "--first-class {} is after --last-class {}",
                self.first_class,
                self.last_class
            );
        }

        Ok(ScrapeConfig {
            search_url: self.url.clone(),
            classes: self.first_class..=self.last_class,
            max_pages: self.max_pages,
            output_dir: self.output_dir.clone(),
            jurisdiction: if self.require_jurisdiction {
                JurisdictionPolicy::FailFast
            } else {
                JurisdictionPolicy::WarnAndContinue
            },
            ..ScrapeConfig::default()
        })
    }

    fn connection_mode(&self) -> ConnectionMode {
        match self.debug_port {
            Some(port) => ConnectionMode::DebugPort(port),
            None => ConnectionMode::Sandboxed {
                chrome_path: self.chrome_path.clone(),
                no_sandbox: self.no_sandbox,
                headless: !self.headed,
            },
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let cfg = args.config()?;

    if args.widths_only {
        let files = export::post_process_dir(&cfg.output_dir)
            .with_context(|| format!("post-processing {}", cfg.output_dir.display()))?;
        log::info!("Column widths updated in {} file(s)", files.len());
        return Ok(());
    }

    log::info!(
        "Scraping Nice classes {}..={} ({} pages each) into {}",
        cfg.classes.start(),
        cfg.classes.end(),
        cfg.max_pages,
        cfg.output_dir.display()
    );

    let summary = pipeline::run(args.connection_mode(), &cfg).await?;

    log::info!(
        "Done: {} rows across {} file(s), widths updated in {} file(s)",
        summary.total_rows(),
        summary.files_written(),
        summary.widths_updated.len()
    );

    if let Some(path) = &args.summary {
        let json = serde_json::to_string_pretty(&summary)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("writing summary to {}", path.display()))?;
    }

    Ok(())
}
