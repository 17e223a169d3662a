use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color as TableColor, ContentArrangement, Table};
use console::Color;

use crate::providers::gitlab::types::{Job, Pipeline, Project, Status};
use crate::watch::JobDurationStat;

use super::styling::status_palette;

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn create_cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

/// Status cell colored from the shared status palette.
pub fn status_cell(status: Status) -> Cell {
    let palette = status_palette(status);
    let mut cell = Cell::new(status.as_str()).fg(table_color(palette.fg));
    if let Some(bg) = palette.bg {
        cell = cell.bg(table_color(bg));
    }
    if palette.dim {
        cell = cell.add_attribute(Attribute::Dim);
    }
    cell
}

fn table_color(color: Color) -> TableColor {
    match color {
        Color::Black => TableColor::Black,
        Color::Red => TableColor::Red,
        Color::Green => TableColor::Green,
        Color::Yellow => TableColor::Yellow,
        Color::Blue => TableColor::Blue,
        Color::Magenta => TableColor::Magenta,
        Color::Cyan => TableColor::Cyan,
        Color::White => TableColor::White,
        Color::Color256(value) => TableColor::AnsiValue(value),
    }
}

fn seconds_cell(seconds: f64) -> Cell {
    Cell::new(format!("{seconds:.1}s"))
}

pub fn pipelines_table(pipelines: &[Pipeline]) -> Table {
    let mut table = create_table();
    table.set_header(create_cyan_header(&["ID", "REF", "STATUS", "SHA", "URL"]));
    for pipeline in pipelines {
        table.add_row(vec![
            Cell::new(pipeline.id),
            Cell::new(&pipeline.ref_),
            status_cell(pipeline.status),
            Cell::new(&pipeline.sha),
            Cell::new(&pipeline.web_url),
        ]);
    }
    table
}

pub fn jobs_table(jobs: &[Job]) -> Table {
    let mut table = create_table();
    table.set_header(create_cyan_header(&["ID", "NAME", "STAGE", "STATUS", "STARTED AT"]));
    for job in jobs {
        let started_at = job
            .started_at
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(job.id),
            Cell::new(&job.name),
            Cell::new(&job.stage),
            status_cell(job.status),
            Cell::new(started_at),
        ]);
    }
    table
}

pub fn stats_table(stats: &[&JobDurationStat]) -> Table {
    let mut table = create_table();
    table.set_header(create_cyan_header(&[
        "NAME",
        "SAMPLES",
        "MIN DURATION",
        "MAX DURATION",
        "AVG DURATION",
    ]));
    for stat in stats {
        table.add_row(vec![
            Cell::new(&stat.name),
            Cell::new(stat.total),
            seconds_cell(stat.min_duration),
            seconds_cell(stat.max_duration),
            seconds_cell(stat.avg_duration),
        ]);
    }
    table
}

pub fn projects_table(projects: &[Project]) -> Table {
    let mut table = create_table();
    table.set_header(create_cyan_header(&["ID", "NAME", "PATH"]));
    for project in projects {
        table.add_row(vec![
            Cell::new(project.id),
            Cell::new(&project.name),
            Cell::new(&project.path_with_namespace),
        ]);
    }
    table
}
