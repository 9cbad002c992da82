mod config;
mod display;
mod error;
mod names;
mod parser;
mod roster;
mod schedule;
mod web;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use log::info;

use config::PlannerConfig;
use display::{print_breakdown, print_summary, write_plan_csv, write_unscheduled_csv};
use error::PlannerError;
use parser::{load_courts, load_legacy_groups, load_players, load_trainers};
use roster::Roster;
use schedule::{plan_season, CourtInventory, PlayerId, Scorer, SeasonOutcome};

#[derive(Parser, Debug)]
#[command(name = "court-planner", version, about = "Plans a season of four-player court groups")]
struct Cli {
    #[command(flatten)]
    inputs: InputArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Player registrations (CSV)
    #[arg(long, global = true, default_value = "players.csv")]
    players: PathBuf,

    /// Court availability (CSV)
    #[arg(long, global = true, default_value = "courts.csv")]
    courts: PathBuf,

    /// Trainer availability (CSV, optional)
    #[arg(long, global = true)]
    trainers: Option<PathBuf>,

    /// Historical groups (CSV, optional)
    #[arg(long, global = true)]
    legacy: Option<PathBuf>,

    /// Planner configuration (JSON); defaults are used if missing or invalid
    #[arg(long, global = true, default_value = "planning_config.json")]
    config: PathBuf,

    /// Number of weeks, overriding the configuration
    #[arg(long, global = true)]
    weeks: Option<u32>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plan the season and write the CSV outputs
    Plan {
        #[arg(long, default_value = "season_plan.csv")]
        out: PathBuf,

        #[arg(long, default_value = "unscheduled_players.csv")]
        unscheduled_out: PathBuf,
    },
    /// Show the score breakdown of one group of four player ids
    Explain {
        #[arg(num_args = 4, required = true)]
        ids: Vec<String>,

        /// Location to score the group at
        #[arg(long)]
        location: Option<String>,
    },
    /// Plan the season and serve it over HTTP
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

struct Inputs {
    config: PlannerConfig,
    roster: Roster,
}

fn load_inputs(args: &InputArgs) -> anyhow::Result<Inputs> {
    let mut config = PlannerConfig::load_or_default(&args.config);
    if let Some(weeks) = args.weeks {
        config.weeks = weeks;
    }

    let players = load_players(&args.players)
        .with_context(|| format!("loading players from {}", args.players.display()))?;
    let roster = Roster::new(players);
    info!(
        "{} players, {} with partner wishes, {} wish(es) naming nobody",
        roster.len(),
        roster.players_with_wishes(),
        roster.dangling_wishes()
    );
    Ok(Inputs { config, roster })
}

fn optional<T>(
    path: Option<&Path>,
    load: impl Fn(&Path) -> Result<Vec<T>, PlannerError>,
    what: &str,
) -> anyhow::Result<Vec<T>> {
    match path {
        Some(path) => load(path).with_context(|| format!("loading {} from {}", what, path.display())),
        None => Ok(Vec::new()),
    }
}

fn run_pipeline(args: &InputArgs, inputs: &Inputs) -> anyhow::Result<SeasonOutcome> {
    let courts = load_courts(&args.courts)
        .with_context(|| format!("loading courts from {}", args.courts.display()))?;
    let trainers = optional(args.trainers.as_deref(), |p| load_trainers(p), "trainers")?;
    let legacy = optional(args.legacy.as_deref(), |p| load_legacy_groups(p), "legacy groups")?;

    let inventory = CourtInventory::new(&courts);
    info!(
        "Planning {} week(s) over {} slot(s) with {} court(s)",
        inputs.config.weeks,
        inventory.slots().count(),
        inventory.court_count()
    );
    Ok(plan_season(&inputs.config, &inputs.roster, &inventory, &trainers, &legacy))
}

fn explain(inputs: &Inputs, ids: &[String], location: Option<&str>) -> anyhow::Result<()> {
    let mut members = Vec::with_capacity(ids.len());
    for id in ids {
        let player = inputs
            .roster
            .get(&PlayerId::from(id.as_str()))
            .ok_or_else(|| PlannerError::UnknownPlayer { id: id.clone() })?;
        members.push(player);
    }
    let breakdown = Scorer::new(&inputs.config).breakdown(&members, location);
    print_breakdown(&members, location, &breakdown);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let inputs = load_inputs(&cli.inputs)?;

    match cli.command {
        Command::Plan { out, unscheduled_out } => {
            let outcome = run_pipeline(&cli.inputs, &inputs)?;
            print_summary(&outcome, &inputs.roster);

            let rows = write_plan_csv(&out, &outcome.plan, &inputs.roster)
                .with_context(|| format!("writing {}", out.display()))?;
            let unscheduled = write_unscheduled_csv(&unscheduled_out, &outcome.plan, &inputs.roster)
                .with_context(|| format!("writing {}", unscheduled_out.display()))?;
            println!("\nPlan saved to {} ({} rows)", out.display(), rows);
            println!("Unscheduled players saved to {} ({} rows)", unscheduled_out.display(), unscheduled);
        }
        Command::Explain { ids, location } => {
            explain(&inputs, &ids, location.as_deref())?;
        }
        Command::Serve { port } => {
            let outcome = run_pipeline(&cli.inputs, &inputs)?;
            print_summary(&outcome, &inputs.roster);
            let state = web::AppState::new(&outcome, &inputs.roster);

            println!("Serving the plan at http://localhost:{}/api/plan", port);
            web::start_server(port, state).await?;
        }
    }

    Ok(())
}
