// src/server/html.rs

//! Renders the status page. The control plane hands its aggregates to this
//! module; the markup itself is deliberately plain.

/// One row of the hit table.
#[derive(Debug, Clone, PartialEq)]
pub struct HitRow {
    pub title: String,
    pub hit: u64,
    pub requests: u64,
    pub percent: f64,
}

impl HitRow {
    pub fn new(title: &str, hit: u64, requests: u64) -> Self {
        Self {
            title: title.to_string(),
            hit,
            requests,
            percent: hit_percent(hit, requests),
        }
    }
}

/// Everything the status page displays.
#[derive(Debug, Clone)]
pub struct StatusPage {
    pub hits: Vec<HitRow>,
    pub config: Vec<(String, String)>,
    pub reasons: Vec<(String, u64)>,
    pub global_urls: Vec<String>,
    pub image_urls: Vec<String>,
    pub with_images: bool,
}

/// Hit ratio as a percentage rounded to two decimals; 0 when there were no
/// hits (which also covers the zero-request case).
pub fn hit_percent(hit: u64, requests: u64) -> f64 {
    if hit == 0 {
        return 0.0;
    }
    let raw = hit as f64 / requests as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}

/// Splits a URL list into `columns` roughly-equal slices for rendering,
/// padding with empty columns when there are fewer URLs than columns.
pub fn split_columns(urls: &[String], columns: usize) -> Vec<Vec<String>> {
    if urls.is_empty() {
        return vec![Vec::new(); columns];
    }
    let chunk = urls.len().div_ceil(columns);
    let mut cols: Vec<Vec<String>> = urls.chunks(chunk).map(<[String]>::to_vec).collect();
    while cols.len() < columns {
        cols.push(Vec::new());
    }
    cols
}

pub fn render_status_page(page: &StatusPage) -> String {
    let mut out = String::with_capacity(8 * 1024);
    out.push_str(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Web Cache Server Status</title>\n<style>\n\
         body { font-family: sans-serif; margin: 2em; }\n\
         table { border-collapse: collapse; margin-bottom: 2em; }\n\
         th, td { border: 1px solid #999; padding: 4px 12px; text-align: left; }\n\
         .columns { display: flex; gap: 2em; }\n\
         .columns img { max-width: 120px; display: block; margin-bottom: 8px; }\n\
         </style>\n</head>\n<body>\n<h1>Web Cache Server Status</h1>\n",
    );

    out.push_str("<h2>Hit Ratio</h2>\n<table>\n<tr><th>Target</th><th>Hit</th><th>Requests</th><th>Percent</th></tr>\n");
    for row in &page.hits {
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.2}%</td></tr>\n",
            escape(&row.title),
            row.hit,
            row.requests,
            row.percent
        ));
    }
    out.push_str("</table>\n");

    out.push_str("<h2>Configuration</h2>\n<table>\n<tr><th>Name</th><th>Value</th></tr>\n");
    for (name, value) in &page.config {
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td></tr>\n",
            escape(name),
            escape(value)
        ));
    }
    out.push_str("</table>\n");

    out.push_str("<h2>Reasons Not Cached</h2>\n<table>\n<tr><th>Reason</th><th>Count</th></tr>\n");
    for (reason, count) in &page.reasons {
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td></tr>\n",
            escape(reason),
            count
        ));
    }
    out.push_str("</table>\n");

    out.push_str(&format!(
        "<h2>Cached URLs (Global, {} items)</h2>\n<ul>\n",
        page.global_urls.len()
    ));
    for url in &page.global_urls {
        out.push_str(&format!("<li>{}</li>\n", escape(url)));
    }
    out.push_str("</ul>\n");

    out.push_str(&format!(
        "<h2>Cached URLs (Image, {} items)</h2>\n",
        page.image_urls.len()
    ));
    if page.with_images {
        out.push_str("<div class=\"columns\">\n");
        for column in split_columns(&page.image_urls, 3) {
            out.push_str("<div>\n");
            for url in &column {
                let escaped = escape(url);
                out.push_str(&format!(
                    "<img src=\"{escaped}\" alt=\"{escaped}\">\n"
                ));
            }
            out.push_str("</div>\n");
        }
        out.push_str("</div>\n");
    } else {
        out.push_str("<ul>\n");
        for url in &page.image_urls {
            out.push_str(&format!("<li>{}</li>\n", escape(url)));
        }
        out.push_str("</ul>\n");
    }

    out.push_str("</body>\n</html>\n");
    out
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
