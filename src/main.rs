use getopts::Options;
use log::{error, info, warn, LevelFilter};
use serde::Deserialize;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use std::error::Error;
use waypoint_overlay::api::{
    format_batch, region_for, route_annotations, CsvFormatter, JsonFormatter, LocationFeed, NavigationSession,
    OutputFormat, RoutePlanner, SceneMirror, StaticDirections, TextFormatter,
};
use waypoint_overlay::{
    FixOutcome, GeoPoint, NavigationConfig, PlacementBatch, PlacementCoordinator, PlacementState, PositionFix,
    RouteStep,
};

/// Recorded route and fix log replayed by the demo
#[derive(Debug, Deserialize)]
struct Scenario {
    steps: Vec<RouteStep>,
    fixes: Vec<PositionFix>,
}

struct Settings {
    scenario_path: String,
    config: NavigationConfig,
    format: OutputFormat,
    threaded: bool,
    show_map: bool,
}

fn main() {
    let settings = match handle_opts() {
        Ok(Some(settings)) => settings,
        Ok(None) => return,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = run(settings) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn handle_opts() -> Result<Option<Settings>, Box<dyn Error>> {
    let mut opts = Options::new();
    opts.optflag("v", "verbose", "Prints extra logging.");
    opts.optflag("h", "help", "Print this help menu.");
    opts.optopt("c", "config", "Navigation config JSON file.", "FILE");
    opts.optopt("f", "format", "Output format: text, json or csv.", "FORMAT");
    opts.optflag("t", "threaded", "Replay through the background session worker.");
    opts.optflag("m", "map", "Print map annotations for the route.");
    opts.optopt("", "write-config", "Write the default config to FILE and exit.", "FILE");

    let mut args = std::env::args();
    args.next(); // Skip the program name
    let matches = opts.parse(args)?;
    if matches.opt_present("h") {
        print_usage(&opts);
        return Ok(None);
    }

    let level = if matches.opt_present("v") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let log_config = ConfigBuilder::new().set_time_level(LevelFilter::Debug).build();
    TermLogger::init(level, log_config, TerminalMode::Stderr, ColorChoice::Auto)?;

    if let Some(path) = matches.opt_str("write-config") {
        NavigationConfig::default().save_to_file(&path)?;
        info!("Wrote default config to {}", path);
        return Ok(None);
    }

    let config = match matches.opt_str("c") {
        Some(path) => NavigationConfig::from_file(path)?,
        None => NavigationConfig::default(),
    };
    let format = match matches.opt_str("f") {
        Some(name) => name.parse::<OutputFormat>()?,
        None => OutputFormat::default(),
    };
    let scenario_path = match matches.free.first() {
        Some(path) => path.clone(),
        None => {
            print_usage(&opts);
            return Err("missing scenario file".into());
        }
    };

    Ok(Some(Settings {
        scenario_path,
        config,
        format,
        threaded: matches.opt_present("t"),
        show_map: matches.opt_present("m"),
    }))
}

fn print_usage(opts: &Options) {
    let brief = "Usage: waypoint_overlay [options] SCENARIO.json";
    print!("{}", opts.usage(brief));
}

fn run(settings: Settings) -> Result<(), Box<dyn Error>> {
    let json_data = std::fs::read_to_string(&settings.scenario_path)?;
    let scenario: Scenario = serde_json::from_str(&json_data)?;
    info!(
        "Loaded scenario with {} steps and {} fixes",
        scenario.steps.len(),
        scenario.fixes.len()
    );

    if settings.threaded {
        replay_threaded(&settings, scenario)
    } else {
        replay(&settings, scenario)
    }
}

/// Prints each batch in the selected format
struct BatchPrinter {
    format: OutputFormat,
    sequence: u32,
}

impl BatchPrinter {
    fn new(format: OutputFormat) -> Self {
        if format == OutputFormat::Csv {
            println!("{}", CsvFormatter::new().header());
        }
        Self { format, sequence: 0 }
    }

    fn print(&mut self, coordinator: &PlacementCoordinator, batch: &PlacementBatch) -> Result<(), Box<dyn Error>> {
        self.sequence += 1;
        let formatted = format_batch(self.sequence, coordinator.markers(), batch);
        match self.format {
            OutputFormat::Text => print!("{}", TextFormatter::new().format_text(&formatted)),
            OutputFormat::Json => println!("{}", JsonFormatter::new().format_json(&formatted)?),
            OutputFormat::Csv => println!("{}", CsvFormatter::new().format_csv(&formatted)),
        }
        Ok(())
    }
}

fn print_map(coordinator: &PlacementCoordinator) -> Result<(), Box<dyn Error>> {
    let annotations = route_annotations(coordinator.steps(), coordinator.legs());
    let origin = coordinator.best_estimate().map(|e| e.point);
    let overlay = serde_json::json!({
        "region": region_for(&annotations, origin),
        "annotations": annotations,
    });
    println!("{}", serde_json::to_string_pretty(&overlay)?);
    Ok(())
}

/// Single-threaded replay: route first, then every fix in order. Markers
/// are placed as soon as they are built.
fn replay(settings: &Settings, scenario: Scenario) -> Result<(), Box<dyn Error>> {
    let mut coordinator = PlacementCoordinator::new(settings.config.clone());
    let mut printer = BatchPrinter::new(settings.format);
    coordinator.set_route(scenario.steps);

    for fix in scenario.fixes {
        match coordinator.process_fix(fix) {
            FixOutcome::LegsBuilt { legs, markers } => {
                info!("Route ready: {} legs, {} markers", legs, markers);
                if settings.show_map {
                    print_map(&coordinator)?;
                }
                if let Some(batch) = coordinator.place_markers() {
                    coordinator.apply(&batch);
                    printer.print(&coordinator, &batch)?;
                }
            }
            FixOutcome::Placed(batch) => printer.print(&coordinator, &batch)?,
            FixOutcome::Buffered => {}
            FixOutcome::Frozen => {
                info!("Placements frozen, skipping remaining fixes");
                break;
            }
        }
    }

    if coordinator.state() == PlacementState::AwaitingOrigin {
        warn!("No trusted fix arrived; nothing was placed");
    }
    Ok(())
}

/// Replay through the route planner and the session worker, folding the
/// worker's events into a scene mirror
fn replay_threaded(settings: &Settings, scenario: Scenario) -> Result<(), Box<dyn Error>> {
    let destination: GeoPoint = match scenario.steps.last() {
        Some(step) => step.point,
        None => return Err("scenario has no route steps".into()),
    };
    let trusted = scenario.fixes.iter().position(|f| settings.config.estimator.accepts(f));
    let Some(first_trusted) = trusted else {
        return Err("scenario has no fix within the accuracy limit".into());
    };

    let (session, events) = NavigationSession::spawn(settings.config.clone());
    let mut mirror = SceneMirror::new(events);

    // Directions are fetched before any origin is known
    let planner = RoutePlanner::from_config(&settings.config);
    let plan = planner.plan(StaticDirections::new(scenario.steps), None, destination).wait()?;

    let (head, tail) = scenario.fixes.split_at(first_trusted + 1);
    for fix in head {
        session.send_fix(*fix)?;
    }
    session.submit_plan(plan)?;
    session.place_markers()?;

    let mut feed = LocationFeed::new();
    let (subscription, fixes) = feed.subscribe();
    let forwarder = session.forward_fixes(fixes);
    for fix in tail {
        feed.publish(*fix);
        mirror.drain();
    }
    feed.unsubscribe(subscription);
    if forwarder.join().is_err() {
        warn!("Fix forwarder panicked");
    }

    let coordinator = session.shutdown()?;
    while mirror.wait_next() {}
    for error in mirror.take_errors() {
        warn!("Session reported: {}", error);
    }

    info!(
        "Session finished {} after {} updates; mirror holds {} markers",
        coordinator.state().label(),
        coordinator.updates(),
        mirror.markers().len()
    );
    if settings.show_map {
        print_map(&coordinator)?;
    }

    match settings.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(mirror.markers())?),
        OutputFormat::Text | OutputFormat::Csv => {
            for marker in mirror.markers().iter() {
                let placement = marker
                    .placement
                    .map(|p| format!("{:.1} m, scale {:.3}", p.transform.distance_m, p.scale))
                    .unwrap_or_else(|| "unplaced".to_string());
                println!("[{:>3}] {:<8} {}  {}", marker.id.id(), marker.category.label(), placement, marker.title);
            }
        }
    }
    Ok(())
}
