//! Bellpedia - Dove bell tower data on the command line
//!
//! Loads the Dove data, searches towers and draws the summary charts.

use anyhow::{bail, Context, Result};
use bellpedia::{
    charts::{ChartRenderer, PlotSelection},
    cli::{Cli, Commands},
    config::{Settings, CONFIG_FILE},
    data::{DataProcessor, WorldLoader},
    stats::StatsCalculator,
    user_list::{format_date_label, UserList},
    World,
};
use std::time::Instant;

fn load_world(settings: &Settings, refresh: bool) -> Result<World> {
    let loader = WorldLoader::new(settings);
    let world = loader.generate_with(refresh).with_context(|| {
        if refresh {
            format!("building the world from {}", settings.dove_dir().display())
        } else {
            format!(
                "reading {} (run `bellpedia load --refresh` first)",
                loader.snapshot_path().display()
            )
        }
    })?;
    Ok(world)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse_args();
    let config_path = cli.config.clone().unwrap_or_else(|| cli.root.join(CONFIG_FILE));
    let mut settings = Settings::load(&config_path, &cli.root)
        .with_context(|| format!("loading settings from {}", config_path.display()))?;

    match cli.command {
        Commands::Load { refresh } => {
            let start = Instant::now();
            let world = load_world(&settings, refresh || settings.dove_refresh)?;
            println!(
                "Loaded {} towers with {} bells in {:.1}s",
                world.n_towers(),
                world.n_bells(),
                start.elapsed().as_secs_f64()
            );
        }

        Commands::Search { by, values } => {
            let world = load_world(&settings, settings.dove_refresh)?;
            let found = world.search(by, &values)?;
            println!("{} towers match {} {:?}", found.n_towers(), by, values);
            println!("{}", DataProcessor::tower_frame(&found)?);
        }

        Commands::Tower { id, from } => {
            let world = load_world(&settings, settings.dove_refresh)?;
            let Some(tower) = world.tower(id) else {
                bail!("no tower with Dove id {id}");
            };
            println!("{}, {} (Dove id {})", tower.name, tower.place, tower.dove_id);
            println!("{} bells, {} {}", tower.n_bells(), tower.county, tower.country);
            if let Some(tenor) = tower.tenor().and_then(|b| b.weight.as_ref()) {
                println!("Tenor {} cwt ({:.0} kg)", tenor.text(), tenor.kg());
            }
            if let Some(c) = &tower.coordinates {
                println!("Location {:.5}, {:.5}", c.lat, c.long);
            }
            println!("{}", DataProcessor::tower_bell_frame(tower)?);

            if let Some(other_id) = from {
                let other = world
                    .tower(other_id)
                    .with_context(|| format!("no tower with Dove id {other_id}"))?;
                match (&tower.coordinates, &other.coordinates) {
                    (Some(a), Some(b)) => println!(
                        "{:.2} {} from {}, {}",
                        a.distance_to(b, settings.distance_unit),
                        settings.distance_unit,
                        other.name,
                        other.place
                    ),
                    _ => println!("No coordinates to measure the distance to {}", other.name),
                }
            }
        }

        Commands::MyTowers {
            name,
            by,
            no_save,
            user_dir,
        } => {
            settings.change_user_dir(user_dir);
            let world = load_world(&settings, settings.dove_refresh)?;
            let mine = UserList::new(&settings).grab_my_towers(&world, &name, by, !no_save)?;

            println!("{} of your towers found", mine.rows.len());
            for row in &mine.rows {
                let when = row.date.map(format_date_label).unwrap_or_else(|| "undated".to_string());
                let purpose = row.purpose.as_deref().unwrap_or("");
                println!("  {:<24} {}, {} {}", when, row.summary.name, row.summary.place, purpose);
            }
            if let Some(path) = mine.output {
                println!("Saved {}", path.display());
            }
        }

        Commands::Plots {
            region,
            prefix,
            format,
            only,
            by,
            value,
        } => {
            let world = load_world(&settings, settings.dove_refresh)?;
            let world = match by {
                Some(field) => world.search(field, &value)?,
                None => world,
            };
            let selection = match only {
                Some(names) => PlotSelection::only(&names)?,
                None => PlotSelection::all(),
            };

            let mut renderer = ChartRenderer::new(&settings).with_region(region).with_prefix(prefix);
            if let Some(format) = format {
                renderer = renderer.with_format(format);
            }
            let written = renderer.make_all_plots(&world, selection)?;
            for path in written {
                println!("{}", path.display());
            }
        }

        Commands::Stats => {
            let world = load_world(&settings, settings.dove_refresh)?;
            let describe = StatsCalculator::describe_world(&world);
            println!("{}", StatsCalculator::describe_frame(&describe)?);
            let countries = StatsCalculator::country_breakdown(&world);
            println!("{}", StatsCalculator::country_frame(&countries)?);
        }
    }

    Ok(())
}
