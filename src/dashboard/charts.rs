//! ECharts configurations for the dashboard.
//!
//! Each chart is built from a report and serialized to JSON with `charming`.
//! The page holds an empty container per chart and a script that hands the
//! JSON to ECharts once the page has loaded.

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{
        AxisLabel, AxisPointer, AxisPointerType, AxisType, Color, JsFunction, Tooltip, Trigger,
    },
    series::{Line, Pie, bar},
};
use maud::{Markup, PreEscaped, html};
use rust_decimal::{Decimal, prelude::ToPrimitive};

use crate::{
    html::HeadElement,
    report::{BalanceHistory, CategorySpend, IncomeExpenseSeries},
};

/// A chart's container ID and its ECharts options.
pub(super) struct DashboardChart {
    /// The HTML element ID, in kebab-case.
    pub id: &'static str,
    /// The ECharts options as JSON.
    pub options: String,
}

pub(super) fn charts_view(charts: &[DashboardChart]) -> Markup {
    html!(
        section id="charts" class="w-full mx-auto mb-4"
        {
            div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
            {
                @for chart in charts {
                    div id=(chart.id) class="min-h-[380px] rounded dark:bg-gray-100" {}
                }
            }
        }
    )
}

/// Script that initializes every chart after the DOM has loaded and follows
/// the system dark mode setting.
pub(super) fn charts_script(charts: &[DashboardChart]) -> HeadElement {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chart = echarts.init(document.getElementById("{}"));
                    chart.setOption({});
                    window.addEventListener('resize', chart.resize);

                    const darkMode = window.matchMedia('(prefers-color-scheme: dark)');
                    const updateTheme = () => chart.setTheme(darkMode.matches ? 'dark' : 'default');
                    darkMode.addEventListener('change', updateTheme);
                    updateTheme();
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    HeadElement::ScriptSource(PreEscaped(format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{script_content}\n}});"
    )))
}

fn to_chart_values(values: &[Decimal]) -> Vec<f64> {
    values
        .iter()
        .map(|value| value.to_f64().unwrap_or_default())
        .collect()
}

pub(super) fn income_expense_chart(series: &IncomeExpenseSeries) -> Chart {
    Chart::new()
        .title(
            Title::new()
                .text("Income and Expenses")
                .subtext(format!("Last {} months", series.labels.len())),
        )
        .tooltip(currency_tooltip())
        .legend(Legend::new().right("4%"))
        .grid(default_grid())
        .x_axis(
            Axis::new()
                .type_(AxisType::Category)
                .data(series.labels.clone()),
        )
        .y_axis(currency_axis())
        .series(
            bar::Bar::new()
                .name("Income")
                .data(to_chart_values(&series.income)),
        )
        .series(
            bar::Bar::new()
                .name("Expenses")
                .data(to_chart_values(&series.expense)),
        )
}

pub(super) fn net_worth_chart(history: &BalanceHistory) -> Chart {
    Chart::new()
        .title(
            Title::new()
                .text("Net Worth")
                .subtext("Balance of all open accounts"),
        )
        .tooltip(currency_tooltip())
        .grid(default_grid())
        .x_axis(
            Axis::new()
                .type_(AxisType::Category)
                .data(history.labels.clone()),
        )
        .y_axis(currency_axis())
        .series(
            Line::new()
                .name("Net Worth")
                .data(to_chart_values(&history.balances)),
        )
}

pub(super) fn category_spend_chart(spend: &[CategorySpend]) -> Chart {
    let colors: Vec<Color> = spend
        .iter()
        .map(|slice| Color::from(slice.fill.as_str()))
        .collect();
    let data: Vec<(f64, &str)> = spend
        .iter()
        .map(|slice| (slice.amount.to_f64().unwrap_or_default(), slice.category.as_str()))
        .collect();

    Chart::new()
        .title(Title::new().text("Spending").subtext("This month, by category"))
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Item)
                .value_formatter(currency_formatter()),
        )
        .color(colors)
        .series(Pie::new().name("Spending").data(data))
}

fn default_grid() -> Grid {
    Grid::new()
        .left("3%")
        .right("4%")
        .bottom("3%")
        .contain_label(true)
}

fn currency_axis() -> Axis {
    Axis::new()
        .type_(AxisType::Value)
        .axis_label(AxisLabel::new().formatter(currency_formatter()))
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('en-US', {
              style: 'currency',
              currency: 'USD'
            });
            return (number) ? currencyFormatter.format(number) : \"-\";",
    )
}

fn currency_tooltip() -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .value_formatter(currency_formatter())
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}
