#![deny(warnings)]

//! Generate the yearly finance dataset for a party profile, export it,
//! chart it and print the analytical report.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use finsim_gen::{run, validate_profile, Profile};
use finsim_io::{export_file_name, ExportFormat};
use finsim_report::{
    chart_file_name, compute_insights, figure_title, panels, render_svg, write_preview,
    write_report,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

const PREVIEW_ROWS: usize = 5;

#[derive(Parser, Debug)]
#[command(name = "finsim")]
#[command(about = "Synthetic yearly finance and membership data for a political party")]
struct Args {
    /// Profile YAML file; the built-in UMP profile when omitted
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Override the random seed
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    start_year: Option<i32>,

    #[arg(long)]
    end_year: Option<i32>,

    /// Directory receiving the data file and the chart
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// csv or parquet
    #[arg(long, default_value = "csv")]
    format: ExportFormat,

    #[arg(long)]
    no_charts: bool,

    /// Also write the summary figures as JSON
    #[arg(long)]
    summary_json: Option<PathBuf>,

    /// Write the effective profile as YAML and exit
    #[arg(long)]
    dump_profile: Option<PathBuf>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn effective_profile(args: &Args) -> Result<Profile> {
    let mut profile = match &args.profile {
        Some(path) => Profile::load(path)
            .with_context(|| format!("loading profile {}", path.display()))?,
        None => Profile::default(),
    };
    if let Some(seed) = args.seed {
        profile.seed = seed;
    }
    if let Some(year) = args.start_year {
        profile.start_year = year;
    }
    if let Some(year) = args.end_year {
        profile.end_year = year;
    }
    validate_profile(&profile).context("invalid profile")?;
    Ok(profile)
}

fn execute<W: Write>(args: &Args, out: &mut W) -> Result<()> {
    let profile = effective_profile(args)?;

    if let Some(path) = &args.dump_profile {
        profile
            .save(path)
            .with_context(|| format!("writing profile {}", path.display()))?;
        info!(path = %path.display(), "profile written");
        return Ok(());
    }

    info!(
        profile = %profile.name,
        seed = profile.seed,
        start = profile.start_year,
        end = profile.end_year,
        "generating"
    );
    let ds = run(&profile)?;

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;
    let data_path = args.out_dir.join(export_file_name(
        &profile.slug,
        profile.start_year,
        profile.end_year,
        args.format,
    ));
    finsim_io::write(&data_path, &ds, args.format)
        .with_context(|| format!("exporting {}", data_path.display()))?;

    let loaded = finsim_io::read(&data_path, args.format)
        .with_context(|| format!("reading back {}", data_path.display()))?;
    ensure!(
        loaded.years() == ds.years() && loaded.is_complete(),
        "export {} does not round trip",
        data_path.display()
    );
    writeln!(out, "Data exported to {}", data_path.display())?;
    writeln!(out, "\nPreview:")?;
    write_preview(out, &loaded, PREVIEW_ROWS)?;

    if !args.no_charts {
        let chart_path = args.out_dir.join(chart_file_name(&profile.slug));
        render_svg(
            &chart_path,
            &figure_title(&profile, &loaded),
            &panels(&loaded, &profile)?,
        )
        .with_context(|| format!("rendering {}", chart_path.display()))?;
        writeln!(out, "Chart written to {}", chart_path.display())?;
    }

    let insights = compute_insights(&loaded)?;
    writeln!(out)?;
    write_report(out, &profile, &insights)?;

    if let Some(path) = &args.summary_json {
        let json = serde_json::to_string_pretty(&insights)?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "summary written");
    }
    Ok(())
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    let stdout = io::stdout();
    execute(&args, &mut stdout.lock())
}
