//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use fetchr_net::{FetchReport, TransportKind};
use serde_json::json;
use std::io;

/// How a URL would be fetched
pub struct RouteInfo {
    pub url: String,
    pub transport: TransportKind,
    pub pairing_address: Option<String>,
    /// The capability gate allows the native facility for this URL
    pub native_eligible: bool,
    /// This host actually has a native facility
    pub native_available: bool,
}

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
}

impl OutputRenderer {
    /// Create new output renderer
    pub fn new(json_output: bool) -> Self {
        Self { json_output }
    }

    /// Render a finished download
    pub fn render_report(&self, report: &FetchReport) -> io::Result<()> {
        if self.json_output {
            let value = json!({
                "url": report.url.as_str(),
                "destination": report.destination,
                "transport": report.kind.as_str(),
                "bytes_transferred": report.bytes_transferred,
                "size": report.size,
                "resumed_from": report.resumed_from,
                "not_modified": report.not_modified,
                "cache_tag": report.cache_tag,
                "blake3": report.hash,
            });
            return print_json(&value);
        }

        let mut table = new_table();
        table.add_row(vec![Cell::new("URL"), Cell::new(report.url.as_str())]);
        table.add_row(vec![
            Cell::new("Destination"),
            Cell::new(report.destination.display()),
        ]);
        table.add_row(vec![Cell::new("Transport"), Cell::new(report.kind)]);
        if report.not_modified {
            table.add_row(vec![
                Cell::new("Status"),
                Cell::new("not modified").fg(Color::Green),
            ]);
        } else {
            table.add_row(vec![Cell::new("Size"), Cell::new(format_bytes(report.size))]);
            if report.resumed_from > 0 {
                table.add_row(vec![
                    Cell::new("Resumed from"),
                    Cell::new(format_bytes(report.resumed_from)),
                ]);
            }
        }
        if let Some(tag) = &report.cache_tag {
            table.add_row(vec![Cell::new("Cache tag"), Cell::new(tag)]);
        }
        if let Some(hash) = &report.hash {
            table.add_row(vec![Cell::new("BLAKE3"), Cell::new(hash)]);
        }
        println!("{table}");
        Ok(())
    }

    /// Render the routing decision for a URL
    pub fn render_route(&self, route: &RouteInfo) -> io::Result<()> {
        if self.json_output {
            let value = json!({
                "url": route.url,
                "transport": route.transport.as_str(),
                "pairing_address": route.pairing_address,
                "native_eligible": route.native_eligible,
                "native_available": route.native_available,
            });
            return print_json(&value);
        }

        let native = match (route.native_eligible, route.native_available) {
            (true, true) => Cell::new("yes").fg(Color::Green),
            (true, false) => Cell::new("eligible, no facility on this host").fg(Color::Yellow),
            (false, _) => Cell::new("no"),
        };

        let mut table = new_table();
        table.add_row(vec![Cell::new("URL"), Cell::new(&route.url)]);
        table.add_row(vec![
            Cell::new("Transport"),
            Cell::new(route.transport).add_attribute(Attribute::Bold),
        ]);
        if let Some(address) = &route.pairing_address {
            table.add_row(vec![Cell::new("Device"), Cell::new(address)]);
        }
        table.add_row(vec![Cell::new("Native facility"), native]);
        println!("{table}");
        Ok(())
    }
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn print_json(value: &serde_json::Value) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    println!("{json}");
    Ok(())
}

/// Human readable byte count
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
