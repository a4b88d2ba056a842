mod crawler;
mod graph;
mod metrics;
mod network;
mod options;
mod report;
mod storage;
mod utils;

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use console::style;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    // Parse terminal arguments.
    let mut options = options::Cli::parse();

    // Load config file and apply values (CLI args take priority).
    let config = options::ConfigFile::load(options.config.as_ref()).unwrap_or_else(|e| {
        eprintln!("{} {}", style("[ERROR]").red(), e);
        std::process::exit(1);
    });
    options.apply_config(&config).unwrap_or_else(|e| {
        eprintln!("{} {}", style("[ERROR]").red(), e);
        std::process::exit(1);
    });

    // Build the HTTP client and the document store.
    let client = Arc::new(network::build_client(&options)?);
    let output_root = options
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let disc = Arc::new(storage::Disc::new(options.root_url.clone(), output_root));

    // Crawl the site, mirroring every fetched document to disk.
    if !options.json {
        println!(
            "{} 🕸  Crawl {}...",
            style("[1/3]").dim(),
            options.root_url
        );
    }
    let outcome = crawler::crawl(Arc::clone(&client), Arc::clone(&disc), &options).await;

    // Build the link graph over the crawled pages and analyze it.
    if !options.json {
        println!("{} 📈 Analyze link graph...", style("[2/3]").dim());
    }
    let mut link_graph = graph::LinkGraph::new();
    for page in &outcome.pages {
        link_graph.add_node(page.url.as_str());
    }
    for page in &outcome.pages {
        for link in &page.links {
            link_graph.add_link(page.url.as_str(), link.as_str());
        }
    }
    link_graph.analyze(
        options.damping,
        options::defaults::EPSILON,
        options::defaults::MAX_ITERATIONS,
    );

    // Write the four report files next to the domain folder. A failed file
    // does not stop the others; the run is marked failed instead.
    if !options.json {
        println!(
            "{} 📝 Write reports for {}...",
            style("[3/3]").dim(),
            disc.domain_folder()
        );
    }
    let writer = report::ReportWriter::new(disc.report_base());
    let mut report_failed = false;
    if let Err(failures) = writer.write_all(&link_graph) {
        report_failed = true;
        for failure in failures {
            eprintln!("{} {}", style("[ERROR]").red(), failure);
        }
    }

    if options.json {
        // Print clean JSON to stdout for piping.
        println!("{}", report::to_json_string(&outcome, &link_graph, &options)?);
    } else {
        report::show_text_report(&outcome, &link_graph, &options);
    }

    // Optionally, write the per-node metrics to a CSV file.
    if let Some(path) = options.report_csv.as_ref() {
        report::write_csv_report(path, &link_graph, options.json)?;
    }

    if report_failed {
        return Ok(ExitCode::from(1));
    }
    Ok(outcome.exit_code())
}
