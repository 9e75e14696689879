//! End-to-end tests over a small Dove export written to a temporary directory.
//!
//! These tests:
//! 1. Write `config.yaml`, `towers.csv` and `bells.csv` fixtures
//! 2. Build the world from CSV, then reload it from the snapshot
//! 3. Search, summarise and match a user visit list against it

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use bellpedia::charts::{ChartRenderer, PlotKind};
use bellpedia::config::{Settings, CONFIG_FILE};
use bellpedia::data::{snapshot::SNAPSHOT_FILE, DataProcessor, WorldLoader};
use bellpedia::model::{BellRole, SearchField};
use bellpedia::stats::StatsCalculator;
use bellpedia::user_list::UserList;
use bellpedia::xlsx::{self, Cell, Table};

// =============================================================================
// Fixtures
// =============================================================================

const CONFIG: &str = "\
data_folder: data
user_data_folder: my_lists
plots_folder: plots
distance_unit: miles
dpi: 72
ring_type: Full-circle ring
dove_data_refresh: false
";

const TOWERS: &str = "\
TowerID,Dedicn,Place,Lat,Long,Postcode,NG,Country,County,Diocese,Affiliations,Practice,LGrade,RingType
100,S Mary,Oxford,51.752,-1.2577,OX1 4AH,SP5106,England,Oxfordshire,Oxford,,Wed,I,Full-circle ring
101,S Giles,Oxford,51.7575,-1.2600,OX1 3JS,SP5107,England,Oxfordshire,Oxford,,Thu,I,Full-circle ring
102,Cathedral Ch of S Andrew,Wells,51.2103,-2.6434,BA5 2UE,ST5545,England,Somerset,Bath and Wells,,Mon,I,Full-circle ring
103,S Patrick,Dublin,53.3395,-6.2715,,,Ireland,Dublin,Dublin,,Tue,,Full-circle ring
104,S Mary,Oxford,51.752,-1.2577,OX1 4AH,,England,Oxfordshire,Oxford,,,,Carillon
100,Duplicate,Oxford,51.752,-1.2577,OX1 4AH,,England,Oxfordshire,Oxford,,,,Full-circle ring
";

const BELLS: &str = "\
Tower ID,Bell Role,Bell ID,Note,Nominal (Hz),Weight (lbs),Diameter (in),Caster,Founder,Cast Date,Collection Type,Listed,Canons,Turnings,Cracked,Frame ID
100,1,1,F,1396.0,560,30.5,,Whitechapel,1750,Full-circle ring,,,,,9
100,2,2,E,1250.0,616,32,,Whitechapel,c1750,Full-circle ring,,,,,9
100,3,3,D,1110.5,784,34.5,,Taylor,(1897),Full-circle ring,,,,,9
100,2b,4,Eb,1180.0,600,31,,Taylor,n/d,Full-circle ring,,,,,9
101,1,5,G,,448,,,,nan,Full-circle ring,,,,,
101,2,6,F,,504,,,,1900,Full-circle ring,,,,,
102,1,7,C,520.2,2240,48,,Taylor,1877,Full-circle ring,,,,,
102,Sanctus,8,,,112,,,,1600,Full-circle ring,,,,,
103,1,9,D,,,,,,,Full-circle ring,,,,,
104,1,10,C,,,,,,,Carillon,,,,,
";

struct Fixture {
    dir: TempDir,
    settings: Settings,
}

fn fixture(refresh: bool) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let dove = root.join("data").join("dove_data");
    fs::create_dir_all(&dove).unwrap();
    fs::write(dove.join("towers.csv"), TOWERS).unwrap();
    fs::write(dove.join("bells.csv"), BELLS).unwrap();
    let config = if refresh {
        CONFIG.replace("dove_data_refresh: false", "dove_data_refresh: true")
    } else {
        CONFIG.to_string()
    };
    fs::write(root.join(CONFIG_FILE), config).unwrap();

    let settings = Settings::load(&root.join(CONFIG_FILE), root).unwrap();
    Fixture { dir, settings }
}

fn write_visits(path: &Path, rows: &[(&str, &str, &str)]) {
    let mut table = Table::new(vec!["Date".into(), "Postcode".into(), "Purpose".into()]);
    for (date, postcode, purpose) in rows {
        table.push_row(vec![Cell::from(*date), Cell::from(*postcode), Cell::from(*purpose)]);
    }
    xlsx::write_table(path, &table, "Visits").unwrap();
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_load_from_csv_then_snapshot() {
    let fx = fixture(true);
    assert_eq!(fx.settings.ring_type, "full-circle ring");

    let loader = WorldLoader::new(&fx.settings);
    let world = loader.generate().unwrap();

    // The carillon and the duplicate TowerID are dropped.
    assert_eq!(world.n_towers(), 4);
    assert_eq!(world.n_bells(), 9);
    assert!(fx.dir.path().join("data").join("world").join(SNAPSHOT_FILE).is_file());

    let mary = world.tower(100).unwrap();
    assert_eq!(mary.name, "S Mary");
    assert_eq!(mary.n_bells(), 3);
    assert_eq!(mary.n_bells_all(), 4);
    assert_eq!(mary.tenor().and_then(|b| b.role.clone()), Some(BellRole::Numbered(3)));
    assert_eq!(mary.treble().and_then(|b| b.dove_id), Some(1));
    let dates: Vec<Option<i32>> = mary.bells.iter().map(|b| b.dated).collect();
    assert_eq!(dates, vec![Some(1750), Some(1750), Some(1897), None]);
    let diameter = mary.get_bell(1).and_then(|b| b.diameter).unwrap();
    assert!((diameter - 77.47).abs() < 1e-9);

    let reloaded = loader.generate_with(false).unwrap();
    assert_eq!(reloaded.towers(), world.towers());
}

#[test]
fn test_missing_snapshot_is_an_error() {
    let fx = fixture(false);
    assert!(WorldLoader::new(&fx.settings).generate().is_err());
}

#[test]
fn test_search_and_summaries() {
    let fx = fixture(true);
    let world = WorldLoader::new(&fx.settings).generate().unwrap();

    let oxford = world.search(SearchField::Place, &["OXFORD"]).unwrap();
    assert_eq!(oxford.n_towers(), 2);

    let by_id = world.search(SearchField::DoveId, &["102", "103", "102"]).unwrap();
    let ids: Vec<i64> = by_id.towers().iter().map(|t| t.dove_id).collect();
    assert_eq!(ids, vec![102, 103]);

    let here = world.search(SearchField::Coordinates, &["51.2103, -2.6434"]).unwrap();
    assert_eq!(here.towers()[0].place, "Wells");

    assert!(world.search(SearchField::Country, &["Narnia"]).unwrap().is_empty());

    let towers = DataProcessor::tower_frame(&world).unwrap();
    assert_eq!(towers.height(), 4);
    let wells = DataProcessor::tower_bell_frame(world.tower(102).unwrap()).unwrap();
    assert_eq!(wells.height(), 2);

    let countries = StatsCalculator::country_breakdown(&world);
    assert_eq!(countries.len(), 2);
    assert_eq!(countries[0].country, "England");
    assert_eq!(countries[0].towers, 3);
    assert!((countries[0].heaviest_tenor_cwt - 20.0).abs() < 1e-4);
}

#[test]
fn test_my_towers_round_trip() {
    let fx = fixture(true);
    let world = WorldLoader::new(&fx.settings).generate().unwrap();
    let list = UserList::new(&fx.settings);

    write_visits(
        &list.input_path("Visits"),
        &[
            ("2023-06-01", "BA5 2UE", "Wedding"),
            ("2021-02-14", "OX1 4AH", "Practice"),
            ("2022-01-01", "OX1 4AH", "Peal"),
        ],
    );

    let mine = list.grab_my_towers(&world, "Visits", SearchField::Postcode, true).unwrap();
    let ids: Vec<i64> = mine.rows.iter().map(|r| r.summary.dove_id).collect();
    assert_eq!(ids, vec![100, 102]);
    assert_eq!(mine.rows[0].purpose.as_deref(), Some("Practice"));

    let saved = xlsx::read_table(&fx.dir.path().join("my_lists").join("Visits_OUTPUT.xlsx")).unwrap();
    assert_eq!(saved.height(), 2);
    let purpose = saved.column_index("Purpose").unwrap();
    assert_eq!(saved.cell(1, purpose), &Cell::from("Wedding"));
}

#[test]
fn test_plot_file_names() {
    let fx = fixture(false);
    let renderer = ChartRenderer::new(&fx.settings).with_prefix("Oxford");
    assert_eq!(
        renderer.file_path(PlotKind::Frequency),
        fx.dir.path().join("plots").join("Oxford_BellsFreq.png")
    );
}
