use crate::crawler::CrawlOutcome;
use crate::graph::LinkGraph;
use crate::metrics::{CLEAN_FORMAT, Entry, Metrics};
use crate::options::Cli;
use crate::utils;
use console::style;
use csv::Writer;
use prettytable::{Cell, Row, Table};
use serde_json::json;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const REPORT_SUFFIX: &str = "-report.txt";
pub const PATHS_SUFFIX: &str = "-paths.txt";
/// Historical suffix for the in-degree file. Existing consumers of these
/// report sets expect `-int`, so it stays.
pub const IN_DEGREE_SUFFIX: &str = "-int.txt";
pub const OUT_DEGREE_SUFFIX: &str = "-out.txt";

/// Report I/O failures, carrying the offending file so the caller can tell
/// which of the artifacts is incomplete.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report file `{file}`: {source}")]
    Io {
        file: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write CSV report `{file}`: {source}")]
    Csv { file: PathBuf, source: csv::Error },
}

/// Serializes a completed [`LinkGraph`] analysis into the four text report
/// files next to the domain folder: `<base>-report.txt`, `<base>-paths.txt`,
/// `<base>-int.txt` and `<base>-out.txt`.
///
/// All four files iterate the graph's nodes in insertion order, exactly as
/// the graph yields them; nothing is re-sorted or deduplicated here. Each
/// file is opened, written and closed independently, so a failure partway
/// through one leaves a partial file behind and does not touch the others.
pub struct ReportWriter {
    base: PathBuf,
}

impl ReportWriter {
    /// `base` is the report base path: the output root joined with the
    /// sanitized domain string, e.g. from [`crate::storage::Disc::report_base`].
    pub fn new(base: PathBuf) -> Self {
        Self { base }
    }

    fn file_path(&self, suffix: &str) -> PathBuf {
        let mut name = self.base.as_os_str().to_os_string();
        name.push(suffix);
        PathBuf::from(name)
    }

    /// Writes all four report files sequentially. Every file is attempted
    /// even when an earlier one fails; the collected failures are returned
    /// and the caller decides whether a partial report set is acceptable.
    pub fn write_all(&self, graph: &LinkGraph) -> Result<(), Vec<ReportError>> {
        let failures: Vec<ReportError> = [
            self.write_summary(graph).err(),
            self.write_paths(graph).err(),
            self.write_in_degrees(graph).err(),
            self.write_out_degrees(graph).err(),
        ]
        .into_iter()
        .flatten()
        .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures)
        }
    }

    /// The aggregate header block followed by one block per node.
    pub fn write_summary(&self, graph: &LinkGraph) -> Result<PathBuf, ReportError> {
        let file = self.file_path(REPORT_SUFFIX);
        write_report_file(&file, |out| {
            let stats = graph.stats();
            writeln!(out, "GRAPH")?;
            writeln!(out, "Number of nodes: {}", graph.node_count())?;
            writeln!(out, "Number of edges: {}", graph.edge_count())?;
            writeln!(out, "Average distance: {}", stats.average_distance)?;
            writeln!(out, "Graph diameter: {}", stats.diameter)?;
            writeln!(out, "Graph radius: {}", stats.radius)?;
            writeln!(out, "Average in-degree: {}", stats.average_in_degree)?;
            writeln!(out, "Average out-degree: {}", stats.average_out_degree)?;
            writeln!(out, "Average PageRank: {}", stats.average_page_rank)?;
            writeln!(out, "PageRank iterations: {}", stats.page_rank_iterations)?;
            writeln!(out, "Analysis time: {:?}", stats.analysis_time)?;
            writeln!(out, "Shortest path time: {:?}", stats.shortest_path_time)?;
            writeln!(out)?;

            for node in graph.nodes() {
                writeln!(out, "Node: {}", node.url())?;
                writeln!(out, "\tIn-degree: {}", node.in_degree())?;
                writeln!(out, "\tOut-degree: {}", node.out_degree())?;
                writeln!(out, "\tPageRank: {}", node.page_rank())?;
                writeln!(out, "\tNeighbours:")?;
                for &neighbour in node.neighbours() {
                    writeln!(out, "\t\t{}", graph.node_url(neighbour))?;
                }
            }
            Ok(())
        })
    }

    /// Per node, the full shortest path to every reachable target.
    pub fn write_paths(&self, graph: &LinkGraph) -> Result<PathBuf, ReportError> {
        let file = self.file_path(PATHS_SUFFIX);
        write_report_file(&file, |out| {
            writeln!(out, "Shortest paths:")?;
            for node in graph.nodes() {
                writeln!(out, "Node: {}", node.url())?;
                for (target, path) in node.shortest_paths() {
                    writeln!(out, "\tPath to {}", graph.node_url(*target))?;
                    for &step in path {
                        writeln!(out, "\t\t{}", graph.node_url(step))?;
                    }
                }
            }
            Ok(())
        })
    }

    /// One in-degree value per line, in node order.
    pub fn write_in_degrees(&self, graph: &LinkGraph) -> Result<PathBuf, ReportError> {
        let file = self.file_path(IN_DEGREE_SUFFIX);
        write_report_file(&file, |out| {
            for node in graph.nodes() {
                writeln!(out, "{}", node.in_degree())?;
            }
            Ok(())
        })
    }

    /// One out-degree value per line, in node order.
    pub fn write_out_degrees(&self, graph: &LinkGraph) -> Result<PathBuf, ReportError> {
        let file = self.file_path(OUT_DEGREE_SUFFIX);
        write_report_file(&file, |out| {
            for node in graph.nodes() {
                writeln!(out, "{}", node.out_degree())?;
            }
            Ok(())
        })
    }
}

/// Opens the file, hands the buffered writer to `body`, flushes, and
/// releases the handle before returning, whether the write succeeded or
/// failed.
fn write_report_file(
    file: &Path,
    body: impl FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
) -> Result<PathBuf, ReportError> {
    let io_error = |source| ReportError::Io {
        file: file.to_path_buf(),
        source,
    };
    let mut out = BufWriter::new(File::create(file).map_err(io_error)?);
    body(&mut out).and_then(|_| out.flush()).map_err(io_error)?;
    Ok(file.to_path_buf())
}

/// Write a CSV export of the per-node metrics
pub fn write_csv_report(
    report_path: &PathBuf,
    graph: &LinkGraph,
    quiet: bool,
) -> Result<(), ReportError> {
    // If the report path parent is a directory, create it if it doesn't exist yet
    if let Some(parent) = report_path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ReportError::Io {
            file: report_path.clone(),
            source,
        })?;
    }

    let csv_error = |source| ReportError::Csv {
        file: report_path.clone(),
        source,
    };
    let mut writer = Writer::from_path(report_path).map_err(csv_error)?;
    writer
        .write_record(["URL", "In-Degree", "Out-Degree", "PageRank"])
        .map_err(csv_error)?;
    for node in graph.nodes() {
        writer
            .write_record([
                node.url(),
                &node.in_degree().to_string(),
                &node.out_degree().to_string(),
                &node.page_rank().to_string(),
            ])
            .map_err(csv_error)?;
    }

    if !quiet {
        println!(
            "\n📊 The CSV report was written to {}",
            style(report_path.display()).underlined().cyan()
        );
    }

    Ok(())
}

fn generate_crawl_metrics(outcome: &CrawlOutcome, options: &Cli) -> Metrics {
    let total_pages = outcome.pages.len();
    let success_count = outcome
        .pages
        .iter()
        .filter(|page| page.status.is_success())
        .count();
    let success_rate = if total_pages > 0 {
        (success_count as f64 / total_pages as f64) * 100.0
    } else {
        0.0
    };
    let avg_response_time = if total_pages > 0 {
        outcome
            .pages
            .iter()
            .map(|page| page.response_time.as_secs_f64())
            .sum::<f64>()
            / total_pages as f64
    } else {
        0.0
    };

    Metrics(vec![
        Entry {
            label: "Concurrency Limit",
            value: options.concurrency_limit.to_string(),
            json_label: "concurrencyLimit",
            json_value: json!(options.concurrency_limit),
        },
        Entry {
            label: "Rate Limit",
            value: match options.rate_limit {
                Some(per_minute) => format!("{}/min", per_minute),
                None => "No".to_string(),
            },
            json_label: "rateLimit",
            json_value: json!(options.rate_limit),
        },
        Entry {
            label: "Elapsed Time",
            value: format!("{:.2?}", outcome.total_time),
            json_label: "elapsedTimeMs",
            json_value: json!(outcome.total_time.as_millis()),
        },
        Entry {
            label: "⚡️ Pages Crawled",
            value: total_pages.to_string(),
            json_label: "pagesCrawled",
            json_value: json!(total_pages),
        },
        Entry {
            label: "💾 Documents Stored",
            value: outcome.stored_documents.to_string(),
            json_label: "documentsStored",
            json_value: json!(outcome.stored_documents),
        },
        Entry {
            label: "📦 Stored Size",
            value: utils::kb(outcome.stored_bytes),
            json_label: "storedSizeBytes",
            json_value: json!(outcome.stored_bytes),
        },
        Entry {
            label: "✅ Success Rate",
            value: utils::percent(success_rate),
            json_label: "successRatePercentage",
            json_value: json!(success_rate),
        },
        Entry {
            label: "⏰ Average Response Time",
            value: utils::ms(Duration::from_secs_f64(avg_response_time)),
            json_label: "avgResponseTimeMs",
            json_value: json!(Duration::from_secs_f64(avg_response_time).as_millis()),
        },
    ])
}

fn generate_graph_metrics(graph: &LinkGraph) -> Metrics {
    let stats = graph.stats();
    Metrics(vec![
        Entry {
            label: "🌐 Nodes",
            value: graph.node_count().to_string(),
            json_label: "nodeCount",
            json_value: json!(graph.node_count()),
        },
        Entry {
            label: "🔗 Edges",
            value: graph.edge_count().to_string(),
            json_label: "edgeCount",
            json_value: json!(graph.edge_count()),
        },
        Entry {
            label: "📏 Average Distance",
            value: format!("{:.2}", stats.average_distance),
            json_label: "averageDistance",
            json_value: json!(stats.average_distance),
        },
        Entry {
            label: "↔️ Diameter",
            value: stats.diameter.to_string(),
            json_label: "diameter",
            json_value: json!(stats.diameter),
        },
        Entry {
            label: "🎯 Radius",
            value: stats.radius.to_string(),
            json_label: "radius",
            json_value: json!(stats.radius),
        },
        Entry {
            label: "📥 Average In-Degree",
            value: format!("{:.2}", stats.average_in_degree),
            json_label: "averageInDegree",
            json_value: json!(stats.average_in_degree),
        },
        Entry {
            label: "📤 Average Out-Degree",
            value: format!("{:.2}", stats.average_out_degree),
            json_label: "averageOutDegree",
            json_value: json!(stats.average_out_degree),
        },
        Entry {
            label: "⭐ Average PageRank",
            value: format!("{:.6}", stats.average_page_rank),
            json_label: "averagePageRank",
            json_value: json!(stats.average_page_rank),
        },
        Entry {
            label: "🔁 PageRank Iterations",
            value: stats.page_rank_iterations.to_string(),
            json_label: "pageRankIterations",
            json_value: json!(stats.page_rank_iterations),
        },
        Entry {
            label: "⏱ Analysis Time",
            value: format!("{:.2?}", stats.analysis_time),
            json_label: "analysisTimeMs",
            json_value: json!(stats.analysis_time.as_millis()),
        },
        Entry {
            label: "🧭 Shortest Path Time",
            value: format!("{:.2?}", stats.shortest_path_time),
            json_label: "shortestPathTimeMs",
            json_value: json!(stats.shortest_path_time.as_millis()),
        },
    ])
}

/// Prints the two statistics tables (crawl and graph) to the terminal.
pub fn show_text_report(outcome: &CrawlOutcome, graph: &LinkGraph, options: &Cli) {
    println!(
        "\n\n{} {}\n",
        style("Statistics for").bold(),
        style(options.root_url.as_str()).bold().underlined()
    );

    let mut table = Table::new();
    table.set_format(*CLEAN_FORMAT);
    table.add_row(Row::new(vec![
        Cell::new(generate_crawl_metrics(outcome, options).build_table().as_str()),
        Cell::new(generate_graph_metrics(graph).build_table().as_str()),
    ]));
    println!("{}", table);
}

fn build_json_data(outcome: &CrawlOutcome, graph: &LinkGraph, options: &Cli) -> serde_json::Value {
    json!({
        "config": {
            "rootUrl": options.root_url.as_str(),
            "maxDepth": options.max_depth,
            "maxPages": options.max_pages,
            "bypassCaching": options.append_timestamp,
        },
        "crawl": generate_crawl_metrics(outcome, options).to_json(),
        "graph": generate_graph_metrics(graph).to_json(),
        "nodes": graph.nodes().iter().map(|node| {
            json!({
                "url": node.url(),
                "inDegree": node.in_degree(),
                "outDegree": node.out_degree(),
                "pageRank": node.page_rank(),
            })
        }).collect::<Vec<serde_json::Value>>(),
    })
}

/// Returns the JSON summary as a pretty-printed string.
pub fn to_json_string(
    outcome: &CrawlOutcome,
    graph: &LinkGraph,
    options: &Cli,
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&build_json_data(outcome, graph, options))
}
