use chrono::NaiveDateTime;
use maud::{html, Markup, PreEscaped, DOCTYPE};

use super::summary::{RunSummary, SkippedEntry};
use super::ReportDocument;
use crate::workflows::investment::domain::{
    ComparableProperty, CostParameters, Decision, InvestmentMetrics,
};

pub const DEFAULT_TITLE: &str = "Daily Property Investment Report";

const STYLES: &str = r#"
body { font-family: Arial, sans-serif; color: #222; margin: 24px; }
h1 { color: #1f3a5f; margin-bottom: 4px; }
.summary { display: flex; gap: 24px; margin: 16px 0; }
.summary div { background: #f3f6fa; padding: 10px 16px; border-radius: 6px; }
table { border-collapse: collapse; width: 100%; font-size: 13px; }
th, td { border: 1px solid #d0d7de; padding: 6px 8px; vertical-align: top; }
th { background: #1f3a5f; color: #fff; text-align: left; }
td.money { text-align: right; white-space: nowrap; }
.breakdown { color: #555; font-size: 11px; }
.comps { margin: 0; padding-left: 16px; font-size: 11px; }
.decision-yes { background: #dff5e1; font-weight: bold; color: #17622a; }
.decision-no { background: #fbe4e4; color: #8a1c1c; }
.legend, .skipped { margin-top: 24px; font-size: 13px; }
footer { margin-top: 32px; color: #777; font-size: 11px; }
"#;

/// Format a currency amount as whole dollars with thousands separators.
pub fn format_usd(amount: f64) -> String {
    if !amount.is_finite() {
        return "n/a".to_string();
    }

    let rounded = amount.round();
    signed_dollars(rounded < 0.0, group_thousands(&format!("{:.0}", rounded.abs())))
}

/// Dollars and cents, for per-unit rates such as the build-up cost.
fn format_usd_cents(amount: f64) -> String {
    if !amount.is_finite() {
        return "n/a".to_string();
    }

    let formatted = format!("{:.2}", amount.abs());
    let (whole, cents) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));
    signed_dollars(
        amount < 0.0 && formatted != "0.00",
        format!("{}.{cents}", group_thousands(whole)),
    )
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

fn signed_dollars(negative: bool, body: String) -> String {
    if negative {
        format!("-${body}")
    } else {
        format!("${body}")
    }
}

fn format_percent(rate: f64) -> String {
    let formatted = format!("{:.2}", rate * 100.0);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed}%")
}

fn decision_class(decision: Decision) -> &'static str {
    match decision {
        Decision::Yes => "decision-yes",
        Decision::No => "decision-no",
    }
}

/// Turns analyzed properties into the HTML and plain-text report.
#[derive(Debug, Clone)]
pub struct ReportAssembler {
    costs: CostParameters,
    generated_at: NaiveDateTime,
    title: String,
}

impl ReportAssembler {
    pub fn new(costs: CostParameters, generated_at: NaiveDateTime) -> Self {
        Self {
            costs,
            generated_at,
            title: DEFAULT_TITLE.to_string(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Render properties in the order given.
    pub fn render(&self, metrics: &[InvestmentMetrics], summary: &RunSummary) -> ReportDocument {
        ReportDocument {
            title: self.title.clone(),
            generated_at: self.generated_at,
            html: self.page(metrics, summary).into_string(),
            text: self.text(metrics, summary),
        }
    }

    fn page(&self, metrics: &[InvestmentMetrics], summary: &RunSummary) -> Markup {
        html! {
            (DOCTYPE)
            html {
                head {
                    meta charset="utf-8";
                    meta name="viewport" content="width=device-width, initial-scale=1.0";
                    title { (self.title) }
                    style { (PreEscaped(STYLES)) }
                }
                body {
                    h1 { (self.title) }
                    p { "Generated " (self.generated_at.format("%B %-d, %Y at %H:%M").to_string()) }
                    (summary_panel(summary))
                    @if metrics.is_empty() {
                        p { "No properties were analyzed in this run." }
                    } @else {
                        (property_table(metrics))
                    }
                    (self.legend())
                    @if summary.has_skips() {
                        (skipped_section(summary))
                    }
                    footer {
                        "Report generated on "
                        (self.generated_at.format("%Y-%m-%d %H:%M:%S").to_string())
                        ". Figures are estimates from provider valuations and configured costs."
                    }
                }
            }
        }
    }

    fn legend(&self) -> Markup {
        let costs = &self.costs;
        html! {
            section class="legend" {
                h3 { "How the figures are calculated" }
                ul {
                    li { strong { "Best Offer Price" } ": low end of the current value estimate." }
                    li {
                        strong { "Build-Up Cost" } ": "
                        (format_usd_cents(costs.build_up_cost_per_sqft)) " per sq ft times the listing's square footage."
                    }
                    li {
                        strong { "Financing Cost" } ": "
                        (format_percent(costs.financing_rate)) " of Best Offer Price plus Build-Up Cost."
                    }
                    li { strong { "All-Inclusive Cost" } ": Best Offer Price + Build-Up Cost + Financing Cost." }
                    li { strong { "Upside Value" } ": after-repair value estimate." }
                    li { strong { "Upside Profit" } ": Upside Value minus All-Inclusive Cost." }
                    li {
                        strong { "Decision" } ": Yes when Upside Profit is greater than "
                        (format_usd(costs.decision_threshold)) ", otherwise No."
                    }
                }
            }
        }
    }

    fn text(&self, metrics: &[InvestmentMetrics], summary: &RunSummary) -> String {
        let mut lines = vec![
            self.title.clone(),
            format!("Generated {}", self.generated_at.format("%Y-%m-%d %H:%M:%S")),
            String::new(),
            summary.plain_text(),
        ];

        if !metrics.is_empty() {
            lines.push(String::new());
            lines.push("Properties:".to_string());
            for (idx, item) in metrics.iter().enumerate() {
                lines.push(format!(
                    "{}. {} | list {} | all-in {} | upside {} | profit {} | {}",
                    idx + 1,
                    item.address(),
                    format_usd(item.list_price()),
                    format_usd(item.all_inclusive_cost()),
                    format_usd(item.upside_value()),
                    format_usd(item.upside_profit()),
                    item.decision()
                ));
            }
        }

        lines.join("\n")
    }
}

fn summary_panel(summary: &RunSummary) -> Markup {
    html! {
        section class="summary" {
            div { "Properties analyzed: " strong { (summary.listings_analyzed) } }
            div { "Yes: " strong { (summary.yes_count) } }
            div { "No: " strong { (summary.no_count) } }
            div { "Total positive upside: " strong { (format_usd(summary.total_positive_upside)) } }
            div {
                "Zip codes searched: "
                strong { (summary.zip_codes_succeeded) " / " (summary.zip_codes_attempted) }
            }
        }
    }
}

fn property_table(metrics: &[InvestmentMetrics]) -> Markup {
    html! {
        table {
            thead {
                tr {
                    th { "#" }
                    th { "Address" }
                    th { "List Price" }
                    th { "Best Offer Price" }
                    th { "Best Offer Comparables" }
                    th { "All-Inclusive Cost" }
                    th { "Upside Value" }
                    th { "Upside Comparables" }
                    th { "Upside Profit" }
                    th { "Decision" }
                }
            }
            tbody {
                @for (idx, item) in metrics.iter().enumerate() {
                    tr {
                        td { (idx + 1) }
                        td { (item.address()) }
                        td class="money" { (format_usd(item.list_price())) }
                        td class="money" { (format_usd(item.best_offer_price())) }
                        td { (comparables(item.best_offer_comparables())) }
                        td class="money" {
                            (format_usd(item.all_inclusive_cost()))
                            div class="breakdown" {
                                "Build-up " (format_usd(item.build_up_cost()))
                                br;
                                "Financing " (format_usd(item.financing_cost()))
                            }
                        }
                        td class="money" { (format_usd(item.upside_value())) }
                        td { (comparables(item.upside_comparables())) }
                        td class="money" { (format_usd(item.upside_profit())) }
                        td class=(decision_class(item.decision())) { (item.decision().label()) }
                    }
                }
            }
        }
    }
}

fn comparables(items: &[ComparableProperty]) -> Markup {
    html! {
        @if items.is_empty() {
            span class="breakdown" { "None provided" }
        } @else {
            ul class="comps" {
                @for comp in items {
                    li {
                        (comp.address)
                        @if let Some(price) = comp.price {
                            " (" (format_usd(price))
                            @if let Some(distance) = comp.distance_miles {
                                ", " (format!("{distance:.2}")) " mi"
                            }
                            ")"
                        }
                        @if let Some(date) = comp.sale_date {
                            " " (date.format("%Y-%m-%d").to_string())
                        }
                    }
                }
            }
        }
    }
}

fn skipped_section(summary: &RunSummary) -> Markup {
    html! {
        section class="skipped" {
            h3 { "Skipped" }
            table {
                thead {
                    tr {
                        th { "Property / Zip" }
                        th { "Zip Code" }
                        th { "Reason" }
                        th { "Detail" }
                    }
                }
                tbody {
                    @for entry in summary.failed_zip_codes.iter().chain(&summary.skipped_properties) {
                        (skipped_row(entry))
                    }
                }
            }
        }
    }
}

fn skipped_row(entry: &SkippedEntry) -> Markup {
    html! {
        tr {
            td { (entry.subject) }
            td { (entry.zip_code) }
            td { (entry.category) }
            td { (entry.detail) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::investment::domain::{Listing, ValuationRecord};
    use crate::workflows::investment::metrics::compute;
    use crate::workflows::investment::orchestrator::BatchOutcome;
    use chrono::NaiveDate;

    fn costs() -> CostParameters {
        CostParameters {
            build_up_cost_per_sqft: 75.0,
            financing_rate: 0.12,
            decision_threshold: 30_000.0,
        }
    }

    fn generated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .and_then(|date| date.and_hms_opt(6, 30, 0))
            .expect("valid timestamp")
    }

    fn analyzed(address: &str, after_repair: f64) -> InvestmentMetrics {
        let listing = Listing {
            property_id: address.to_string(),
            address: address.to_string(),
            zip_code: "78701".to_string(),
            list_price: 245_000.0,
            square_footage: 1_500.0,
            property_type: None,
            bedrooms: None,
            bathrooms: None,
        };
        let valuation = ValuationRecord {
            property_id: address.to_string(),
            current_value_low: 200_000.0,
            current_value_high: 250_000.0,
            after_repair_value: after_repair,
            low_comparables: vec![ComparableProperty {
                address: "7 Comp Ct".to_string(),
                price: Some(199_500.0),
                distance_miles: Some(0.35),
                sale_date: NaiveDate::from_ymd_opt(2024, 12, 1),
            }],
            after_repair_comparables: Vec::new(),
        };
        compute(&listing, &valuation, &costs()).expect("metrics")
    }

    fn summary_for(metrics: Vec<InvestmentMetrics>) -> (Vec<InvestmentMetrics>, RunSummary) {
        let outcome = BatchOutcome {
            listings_attempted: metrics.len(),
            zip_codes_attempted: 1,
            metrics,
            ..BatchOutcome::default()
        };
        let summary = RunSummary::from_outcome(&outcome);
        (outcome.metrics, summary)
    }

    #[test]
    fn usd_format_groups_thousands_and_rounds() {
        assert_eq!(format_usd(0.0), "$0");
        assert_eq!(format_usd(999.4), "$999");
        assert_eq!(format_usd(1_234_567.0), "$1,234,567");
        assert_eq!(format_usd(-50_000.0), "-$50,000");
        assert_eq!(format_usd(37_499.5), "$37,500");
        assert_eq!(format_usd(f64::NAN), "n/a");
    }

    #[test]
    fn per_sqft_rate_keeps_cents() {
        assert_eq!(format_usd_cents(75.5), "$75.50");
        assert_eq!(format_usd_cents(1_250.0), "$1,250.00");
        assert_eq!(format_usd_cents(-0.001), "$0.00");

        let fractional = CostParameters {
            build_up_cost_per_sqft: 75.5,
            ..costs()
        };
        let (metrics, summary) = summary_for(vec![analyzed("1 First St", 400_000.0)]);
        let document = ReportAssembler::new(fractional, generated_at()).render(&metrics, &summary);
        assert!(document.html.contains("$75.50 per sq ft"));
    }

    #[test]
    fn percent_format_trims_trailing_zeros() {
        assert_eq!(format_percent(0.12), "12%");
        assert_eq!(format_percent(0.125), "12.5%");
        assert_eq!(format_percent(0.0), "0%");
    }

    #[test]
    fn report_lists_rows_in_order_with_counts() {
        let (metrics, summary) = summary_for(vec![
            analyzed("1 First St", 400_000.0),
            analyzed("2 Second St", 300_000.0),
        ]);
        let document = ReportAssembler::new(costs(), generated_at()).render(&metrics, &summary);

        let first = document.html.find("1 First St").expect("first row");
        let second = document.html.find("2 Second St").expect("second row");
        assert!(first < second);
        assert!(document.html.contains("Yes: <strong>1</strong>"));
        assert!(document.html.contains("No: <strong>1</strong>"));
        assert!(document.html.contains("$350,000"));
        assert!(document.html.contains("7 Comp Ct ($199,500, 0.35 mi) 2024-12-01"));
        assert_eq!(document.title, DEFAULT_TITLE);
        assert!(document.text.contains("1. 1 First St"));
    }

    #[test]
    fn legend_reflects_configured_costs() {
        let (metrics, summary) = summary_for(vec![analyzed("1 First St", 400_000.0)]);
        let document = ReportAssembler::new(costs(), generated_at()).render(&metrics, &summary);

        assert!(document.html.contains("$75.00 per sq ft"));
        assert!(document.html.contains("12% of Best Offer Price"));
        assert!(document.html.contains("greater than $30,000"));
        assert!(document.html.contains("2025-03-14 06:30:00"));
    }

    #[test]
    fn addresses_are_html_escaped() {
        let (metrics, summary) =
            summary_for(vec![analyzed("<script>alert(1)</script> Main & 5th", 400_000.0)]);
        let document = ReportAssembler::new(costs(), generated_at()).render(&metrics, &summary);

        assert!(!document.html.contains("<script>alert(1)</script>"));
        assert!(document
            .html
            .contains("&lt;script&gt;alert(1)&lt;/script&gt; Main &amp; 5th"));
    }

    #[test]
    fn empty_run_still_renders_a_document() {
        let (metrics, summary) = summary_for(Vec::new());
        let document = ReportAssembler::new(costs(), generated_at())
            .with_title("Morning Screen")
            .render(&metrics, &summary);

        assert_eq!(document.title, "Morning Screen");
        assert!(document.html.contains("No properties were analyzed in this run."));
        assert!(!document.html.contains("<table>"));
    }
}
