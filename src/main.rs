use std::io::Read;
use std::path::PathBuf;

use clap::Parser;
use cut_layout::render;
use cut_layout::types::{CutPlanData, PieceData, Rect};
use cut_layout::{LayoutConfig, OversizePolicy, estimate_sheet_count, generate_cut_layout};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "cut_layout",
    about = "Lay out panel pieces on standard sheets with guillotine cuts"
)]
struct Cli {
    /// JSON array of pieces; reads stdin when omitted
    input: Option<PathBuf>,

    /// JSON layout configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Standard sheet dimensions (WxH, e.g. 2750x1830)
    #[arg(long, value_parser = parse_dimensions)]
    sheet: Option<Rect>,

    /// Cut margin (kerf) in mm
    #[arg(long)]
    margin: Option<u32>,

    /// Disable piece rotation
    #[arg(long)]
    no_rotate: bool,

    /// Report pieces larger than the sheet instead of failing
    #[arg(long)]
    skip_oversized: bool,

    /// Largest total piece count accepted in one run
    #[arg(long)]
    max_units: Option<u64>,

    /// Show ASCII layout of each sheet
    #[arg(long)]
    layout: bool,

    /// Print the area-only sheet estimate as well
    #[arg(long)]
    estimate: bool,

    /// Print the full result as JSON
    #[arg(long)]
    json: bool,

    /// Log progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn parse_dimensions(s: &str) -> Result<Rect, String> {
    let parts: Vec<&str> = s.split('x').collect();
    if parts.len() != 2 {
        return Err(format!("invalid dimensions '{}', expected WxH", s));
    }
    let w = parts[0]
        .parse::<u32>()
        .map_err(|_| format!("invalid width in '{}'", s))?;
    let h = parts[1]
        .parse::<u32>()
        .map_err(|_| format!("invalid height in '{}'", s))?;
    if w == 0 || h == 0 {
        return Err(format!("dimensions must be non-zero in '{}'", s));
    }
    Ok(Rect::new(w, h))
}

fn load_config(cli: &Cli) -> Result<LayoutConfig, String> {
    let mut config = match &cli.config {
        Some(path) => LayoutConfig::from_json_file(path).map_err(|e| e.to_string())?,
        None => LayoutConfig::default(),
    };
    if let Some(sheet) = cli.sheet {
        config.sheet = sheet;
    }
    if let Some(margin) = cli.margin {
        config.cut_margin = margin;
    }
    if cli.no_rotate {
        config.allow_rotate = false;
    }
    if cli.skip_oversized {
        config.oversize_policy = OversizePolicy::Skip;
    }
    if let Some(max_units) = cli.max_units {
        config.max_units = max_units;
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn load_pieces(input: Option<&PathBuf>) -> Result<Vec<PieceData>, String> {
    let text = match input {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("failed to read stdin: {}", e))?;
            buf
        }
    };
    serde_json::from_str(&text).map_err(|e| format!("invalid piece list: {}", e))
}

fn print_report(plan: &CutPlanData, show_layout: bool) {
    for sheet in &plan.sheets {
        println!(
            "Sheet {} ({}, {:.1}% used):",
            sheet.index + 1,
            sheet.key,
            sheet.utilization
        );
        for p in &sheet.pieces {
            let rot = if p.is_rotated() { " [rotated]" } else { "" };
            let desc = if p.piece.description.is_empty() {
                String::new()
            } else {
                format!(" {}", p.piece.description)
            };
            println!("  #{} {} @ ({}, {}){}{}", p.piece_number, p.rect(), p.x, p.y, rot, desc);
        }
        if show_layout {
            print!("{}", render::render_sheet(sheet));
        }
        println!();
    }

    for r in &plan.rejected {
        println!(
            "Rejected ({:?}): {} {} x{}",
            r.reason,
            r.piece.key(),
            r.piece.rect(),
            r.piece.quantity
        );
    }

    println!(
        "Summary: {} sheet{} used, {} pieces, {:.1}% average utilization, {} mm cut length",
        plan.total_sheets,
        if plan.total_sheets == 1 { "" } else { "s" },
        plan.total_pieces,
        plan.average_utilization,
        plan.total_cut_length,
    );
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = load_config(cli)?;
    let pieces = load_pieces(cli.input.as_ref())?;
    let plan = generate_cut_layout(&pieces, &config).map_err(|e| e.to_string())?;

    if cli.json {
        let out = serde_json::to_string_pretty(&plan).map_err(|e| e.to_string())?;
        println!("{out}");
    } else {
        print_report(&plan, cli.layout);
    }

    if cli.estimate {
        let estimate = estimate_sheet_count(&pieces, &config).map_err(|e| e.to_string())?;
        println!(
            "Estimate: {} sheet{} by area ({} exact)",
            estimate.total_sheets,
            if estimate.total_sheets == 1 { "" } else { "s" },
            plan.total_sheets,
        );
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
