//! SVG charts for the conversion rates, the budget split and revenue.

use campaign_core::error::CampaignResult;
use campaign_core::types::{AllocationResult, Analysis, Group, GroupSummary};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const WIDTH: f64 = 480.0;
const HEIGHT: f64 = 360.0;
const MARGIN: f64 = 60.0;
const PALETTE: [&str; 2] = ["#4C72B0", "#55A868"];

fn color(group: Group) -> &'static str {
    match group {
        Group::A => PALETTE[0],
        Group::B => PALETTE[1],
    }
}

fn open_svg(title: &str) -> String {
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif">"#
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="30" text-anchor="middle" font-size="16">{}</text>"#,
        WIDTH / 2.0,
        escape(title)
    );
    svg
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// One bar of a bar chart, with optional error whisker bounds.
struct Bar {
    group: Group,
    value: f64,
    whisker: Option<(f64, f64)>,
}

fn bar_chart(title: &str, y_label: &str, bars: &[Bar], y_max: f64) -> String {
    let mut svg = open_svg(title);
    let plot_h = HEIGHT - 2.0 * MARGIN;
    let plot_w = WIDTH - 2.0 * MARGIN;
    let y_max = if y_max > 0.0 { y_max } else { 1.0 };
    let scale = |v: f64| HEIGHT - MARGIN - (v.clamp(0.0, y_max) / y_max) * plot_h;

    // Axes
    let _ = writeln!(
        svg,
        r#"<line x1="{MARGIN}" y1="{}" x2="{}" y2="{}" stroke="black"/>"#,
        HEIGHT - MARGIN,
        WIDTH - MARGIN,
        HEIGHT - MARGIN
    );
    let _ = writeln!(
        svg,
        r#"<line x1="{MARGIN}" y1="{MARGIN}" x2="{MARGIN}" y2="{}" stroke="black"/>"#,
        HEIGHT - MARGIN
    );
    let _ = writeln!(
        svg,
        r#"<text x="18" y="{}" transform="rotate(-90 18 {})" text-anchor="middle" font-size="12">{}</text>"#,
        HEIGHT / 2.0,
        HEIGHT / 2.0,
        escape(y_label)
    );
    for tick in 0..=4 {
        let v = y_max * tick as f64 / 4.0;
        let y = scale(v);
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{y:.1}" text-anchor="end" font-size="10">{}</text>"#,
            MARGIN - 6.0,
            format_tick(v)
        );
    }

    let slot = plot_w / bars.len().max(1) as f64;
    let bar_w = slot * 0.5;
    for (i, bar) in bars.iter().enumerate() {
        let cx = MARGIN + slot * (i as f64 + 0.5);
        let top = scale(bar.value);
        let _ = writeln!(
            svg,
            r#"<rect x="{:.1}" y="{top:.1}" width="{bar_w:.1}" height="{:.1}" fill="{}"/>"#,
            cx - bar_w / 2.0,
            (HEIGHT - MARGIN - top).max(0.0),
            color(bar.group)
        );
        if let Some((low, high)) = bar.whisker {
            let (y_low, y_high) = (scale(low), scale(high));
            let cap = bar_w * 0.2;
            let _ = writeln!(
                svg,
                r#"<path d="M{cx:.1} {y_low:.1} V{y_high:.1} M{:.1} {y_low:.1} H{:.1} M{:.1} {y_high:.1} H{:.1}" stroke="black" fill="none"/>"#,
                cx - cap,
                cx + cap,
                cx - cap,
                cx + cap
            );
        }
        let _ = writeln!(
            svg,
            r#"<text x="{cx:.1}" y="{}" text-anchor="middle" font-size="12">{}</text>"#,
            HEIGHT - MARGIN + 18.0,
            bar.group
        );
    }

    svg.push_str("</svg>\n");
    svg
}

fn format_tick(v: f64) -> String {
    if v >= 100.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.3}")
    }
}

/// Observed conversion rates with their confidence intervals as whiskers.
pub fn conversion_rate_chart(analysis: &Analysis) -> String {
    let bars: Vec<Bar> = Group::ALL
        .iter()
        .map(|&group| Bar {
            group,
            value: analysis.test.conversion_rate(group),
            whisker: analysis.interval(group).map(|ci| (ci.low, ci.high)),
        })
        .collect();
    let peak = bars
        .iter()
        .map(|b| b.whisker.map_or(b.value, |(_, high)| high.max(b.value)))
        .fold(0.0_f64, f64::max);
    let confidence = ((1.0 - analysis.alpha) * 100.0).round();
    bar_chart(
        &format!("Observed Conversion Rates ({confidence}% CI)"),
        "Conversion rate",
        &bars,
        peak * 1.4,
    )
}

/// Pie chart of the budget split.
pub fn allocation_chart(allocation: &AllocationResult) -> String {
    let total = allocation.total_spend();
    if total <= 0.0 {
        let mut svg = open_svg("Optimal Budget Allocation");
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="middle" font-size="14">No allocation (0 budget)</text>"#,
            WIDTH / 2.0,
            HEIGHT / 2.0
        );
        svg.push_str("</svg>\n");
        return svg;
    }

    let mut svg = open_svg("Optimal Budget Allocation");
    let (cx, cy, r) = (WIDTH / 2.0, HEIGHT / 2.0 + 15.0, 120.0);
    // Start at 12 o'clock, counter-clockwise.
    let mut angle = std::f64::consts::FRAC_PI_2;
    for group in Group::ALL {
        let share = allocation.spend(group) / total;
        if share <= 0.0 {
            continue;
        }
        if share >= 1.0 - 1e-9 {
            let _ = writeln!(
                svg,
                r#"<circle cx="{cx}" cy="{cy}" r="{r}" fill="{}"/>"#,
                color(group)
            );
        } else {
            let sweep = share * std::f64::consts::TAU;
            let (x0, y0) = (cx + r * angle.cos(), cy - r * angle.sin());
            let end = angle + sweep;
            let (x1, y1) = (cx + r * end.cos(), cy - r * end.sin());
            let large = u8::from(sweep > std::f64::consts::PI);
            let _ = writeln!(
                svg,
                r#"<path d="M{cx} {cy} L{x0:.2} {y0:.2} A{r} {r} 0 {large} 0 {x1:.2} {y1:.2} Z" fill="{}"/>"#,
                color(group)
            );
        }
        let mid = angle + share * std::f64::consts::PI;
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="12">{} {:.1}%</text>"#,
            cx + 0.6 * r * mid.cos(),
            cy - 0.6 * r * mid.sin(),
            group,
            share * 100.0
        );
        angle += share * std::f64::consts::TAU;
    }
    svg.push_str("</svg>\n");
    svg
}

/// Total revenue per group.
pub fn revenue_chart(groups: &[GroupSummary]) -> String {
    let bars: Vec<Bar> = groups
        .iter()
        .map(|g| Bar {
            group: g.group,
            value: g.revenue,
            whisker: None,
        })
        .collect();
    let peak = bars.iter().map(|b| b.value).fold(0.0_f64, f64::max);
    bar_chart("Total Revenue by Campaign", "Total revenue ($)", &bars, peak * 1.2)
}

/// Render every chart into `dir` and return the written paths.
pub fn write_charts(
    analysis: &Analysis,
    allocation: &AllocationResult,
    dir: &Path,
) -> CampaignResult<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let charts = [
        ("conversion_rates.svg", conversion_rate_chart(analysis)),
        ("optimal_allocation.svg", allocation_chart(allocation)),
        ("revenue_by_group.svg", revenue_chart(&analysis.groups)),
    ];

    let mut written = Vec::with_capacity(charts.len());
    for (name, svg) in charts {
        let path = dir.join(name);
        fs::write(&path, svg)?;
        written.push(path);
    }
    info!(dir = %dir.display(), count = written.len(), "Charts written");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_core::types::{AllocationStatus, ConfidenceInterval, TestResult, TestStatus};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn analysis() -> Analysis {
        let mut cis = BTreeMap::new();
        cis.insert(
            Group::A,
            ConfidenceInterval {
                point_estimate: 0.055,
                low: 0.041,
                high: 0.069,
                confidence: 0.95,
            },
        );
        cis.insert(
            Group::B,
            ConfidenceInterval {
                point_estimate: 0.072,
                low: 0.056,
                high: 0.088,
                confidence: 0.95,
            },
        );
        Analysis {
            alpha: 0.05,
            test: TestResult {
                n_a: 1000,
                n_b: 1000,
                conversions_a: 55,
                conversions_b: 72,
                conversion_rate_a: 0.055,
                conversion_rate_b: 0.072,
                z_score: -1.56,
                p_value: 0.119,
                status: TestStatus::Computed,
            },
            confidence_intervals: cis,
            groups: vec![
                GroupSummary {
                    group: Group::A,
                    count: 1000,
                    conversions: 55,
                    failures: 945,
                    conversion_rate: 0.055,
                    revenue: 5_500.0,
                },
                GroupSummary {
                    group: Group::B,
                    count: 1000,
                    conversions: 72,
                    failures: 928,
                    conversion_rate: 0.072,
                    revenue: 8_640.0,
                },
            ],
        }
    }

    fn allocation(a: f64, b: f64) -> AllocationResult {
        let mut split = BTreeMap::new();
        split.insert(Group::A, a);
        split.insert(Group::B, b);
        AllocationResult {
            allocation: split,
            total_budget: a + b,
            cpi_a: 0.025,
            cpi_b: 0.03,
            efficiency_a: 2.2,
            efficiency_b: 2.4,
            expected_conversions: 0.0,
            status: AllocationStatus::Optimal,
        }
    }

    #[test]
    fn test_conversion_chart_has_bars_and_whiskers() {
        let svg = conversion_rate_chart(&analysis());
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains("95% CI"));
        assert_eq!(svg.matches("<rect x=").count(), 2);
        assert_eq!(svg.matches("<path").count(), 2);
    }

    #[test]
    fn test_allocation_pie_labels() {
        let svg = allocation_chart(&allocation(1_000.0, 9_000.0));
        assert!(svg.contains("A 10.0%"));
        assert!(svg.contains("B 90.0%"));
    }

    #[test]
    fn test_allocation_single_arm_draws_circle() {
        let svg = allocation_chart(&allocation(0.0, 500.0));
        assert!(svg.contains("<circle"));
        assert!(svg.contains("B 100.0%"));
    }

    #[test]
    fn test_zero_budget_placeholder() {
        let svg = allocation_chart(&allocation(0.0, 0.0));
        assert!(svg.contains("No allocation (0 budget)"));
    }

    #[test]
    fn test_write_charts() {
        let dir = TempDir::new().unwrap();
        let paths = write_charts(&analysis(), &allocation(1_000.0, 9_000.0), dir.path()).unwrap();
        assert_eq!(paths.len(), 3);
        for path in &paths {
            assert!(path.starts_with(dir.path()));
            assert!(path.exists());
        }
    }
}
