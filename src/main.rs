// Entry point and high-level CLI flow.
//
// One-shot batch analysis over the Global MPI export:
// - Option [1] loads and cleans the CSV, printing diagnostics.
// - Option [2] runs the aggregations, writes the text report and a JSON
//   summary, and prints previews plus the ANOVA / clustering / inequality
//   diagnostics.
// - After generating the report, the user can go back to the menu or exit.
mod loader;
mod output;
mod reports;
mod stats;
mod types;
mod util;

use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::sync::Mutex;
use types::{GroupKey, NumericField, PovertyRecord};

const INPUT_FILE: &str = "global_mpi.csv";
const REPORT_FILE: &str = "poverty_analysis_report.txt";
const SUMMARY_FILE: &str = "summary.json";

const KMEANS_CLUSTERS: usize = 5;
const KMEANS_SEED: u64 = 123;
const TOP_COUNTRIES: usize = 10;
const TOP_REGIONS: usize = 20;

// Simple in-memory app state so we only load/clean the CSV once but can
// generate the report multiple times in a single run.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState { data: None }));

struct AppState {
    data: Option<Vec<PovertyRecord>>,
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
fn read_choice() -> String {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Ask the user whether to go back to the menu after generating the report.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Menu (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        io::stdin().read_line(&mut buf).ok();
        let resp = buf.trim().to_uppercase();
        match resp.as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Handle option [1]: load and clean the CSV file.
///
/// On success, we store the `Vec<PovertyRecord>` in `APP_STATE` and print
/// a short textual summary of what happened.
fn handle_load() {
    match loader::load_and_clean(INPUT_FILE) {
        Ok((data, report)) => {
            println!(
                "Processing dataset... ({} rows read, {} records kept)",
                util::format_int(report.total_rows as i64),
                util::format_int(report.kept_rows as i64)
            );
            println!(
                "Note: {} rows skipped, {} numeric cells and {} date cells recovered as missing.",
                util::format_int(report.skipped_rows as i64),
                util::format_int(report.bad_numeric_cells as i64),
                util::format_int(report.bad_date_cells as i64)
            );
            println!("");
            let mut state = APP_STATE.lock().unwrap();
            state.data = Some(data);
        }
        Err(e) => {
            eprintln!("Failed to load file: {}\n", e);
        }
    }
}

/// Handle option [2]: run the aggregations and write the report.
///
/// This function is intentionally side-effectful:
/// - writes the four-section text report,
/// - writes a JSON summary,
/// - and prints Markdown previews of each table to the console.
fn handle_generate_report() {
    let data = {
        let state = APP_STATE.lock().unwrap();
        state.data.clone()
    };
    let Some(data) = data else {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
        return;
    };

    println!("Generating report...\n");

    let summaries = stats::summary_statistics(&data);
    let summary_table = reports::summary_rows(&summaries);

    let country_means = stats::group_means(&data, GroupKey::Country);
    let top_countries = stats::top_n_by(
        country_means,
        |m| m.mean_of(NumericField::Mpi),
        TOP_COUNTRIES,
    );
    let country_table = reports::group_mean_rows(&top_countries);

    let matrix = stats::correlation_matrix(&data, &NumericField::ALL);
    let correlation_table = reports::correlation_rows(&NumericField::ALL, &matrix);

    let region_means = stats::group_means(&data, GroupKey::Admin1);
    let top_regions = stats::top_n_by(
        region_means,
        |m| m.mean_of(NumericField::Mpi),
        TOP_REGIONS,
    );
    let region_table = reports::group_mean_rows(&top_regions);

    let sections = vec![
        (
            "Summary Statistics".to_string(),
            output::render_table(&summary_table),
        ),
        (
            format!("Top {} Countries by MPI", TOP_COUNTRIES),
            output::render_table(&country_table),
        ),
        (
            "Correlation Matrix".to_string(),
            output::render_table(&correlation_table),
        ),
        (
            format!("Top {} Regions by MPI", TOP_REGIONS),
            output::render_table(&region_table),
        ),
    ];
    match output::write_report(REPORT_FILE, &sections) {
        Ok(()) => println!("Report written to {}.\n", REPORT_FILE),
        Err(e) => {
            eprintln!("Write error: {}", e);
            return;
        }
    }

    println!("Summary Statistics (non-missing values per field)\n");
    output::preview_table_rows(&summary_table, summary_table.len());

    println!("Top {} Countries by Mean MPI\n", TOP_COUNTRIES);
    output::preview_table_rows(&country_table, 5);

    println!("Correlation Matrix (complete-case Pearson)\n");
    output::preview_table_rows(&correlation_table, correlation_table.len());

    println!("Top {} Regions by Mean MPI\n", TOP_REGIONS);
    output::preview_table_rows(&region_table, 5);

    match stats::one_way_anova(&data, NumericField::Mpi, GroupKey::Country) {
        Some(anova) => {
            println!(
                "One-way ANOVA of MPI across countries: F({:.0}, {:.0}) = {}, p = {}",
                anova.df_between,
                anova.df_within,
                util::format_number(anova.f_statistic, 3),
                anova
                    .p_value
                    .map(|p| format!("{:.4}", p))
                    .unwrap_or_else(|| "-".to_string())
            );
        }
        None => println!("One-way ANOVA skipped: not enough groups with MPI values."),
    }
    println!("");

    let clustering = stats::k_means_cluster(&data, &NumericField::ALL, KMEANS_CLUSTERS, KMEANS_SEED);
    println!(
        "K-means ({} clusters, seed {}, {} complete rows, {} iterations)\n",
        clustering.centroids.len(),
        KMEANS_SEED,
        util::format_int(clustering.row_indices.len() as i64),
        clustering.iterations
    );
    let cluster_table = reports::cluster_rows(&clustering);
    output::preview_table_rows(&cluster_table, cluster_table.len());

    let ginis = stats::gini_per_group(&data, NumericField::Mpi, GroupKey::Admin1);
    let most_unequal = stats::top_n_by(ginis, |g| Some(g.gini), TOP_REGIONS);
    println!("Most Unequal Regions by MPI Gini\n");
    output::preview_table_rows(&reports::gini_rows(&most_unequal), 5);

    let summary = reports::generate_summary(&data);
    if let Err(e) = output::write_json(SUMMARY_FILE, &summary) {
        eprintln!("Write error: {}", e);
    }
    println!(
        "Summary Stats ({}): {} records, {} countries, {} regions.\n",
        SUMMARY_FILE,
        util::format_int(summary.total_records as i64),
        util::format_int(summary.total_countries as i64),
        util::format_int(summary.total_regions as i64)
    );
}

fn main() {
    loop {
        println!("Global MPI Poverty Analysis:");
        println!("[1] Load the file");
        println!("[2] Generate Report\n");
        match read_choice().as_str() {
            "1" => {
                handle_load();
            }
            "2" => {
                println!("");
                handle_generate_report();
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => {
                println!("Invalid choice. Please enter 1 or 2.\n");
            }
        }
    }
}
