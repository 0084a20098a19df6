use super::ui;
use crate::core::StockRecord;
use crate::core::valuation::format_price;
use crate::market::IndexPrice;
use crate::providers::NewsItem;
use crate::sync::SyncReport;
use comfy_table::Cell;
use rust_decimal::Decimal;

pub fn display_stocks(records: &[StockRecord]) -> String {
    if records.is_empty() {
        return ui::style_text("No stocks tracked yet", ui::StyleType::Subtle);
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Shares"),
        ui::header_cell("Close"),
        ui::header_cell("Value"),
        ui::header_cell("Last Sync"),
    ]);

    for record in records {
        let last_sync = record.timestamp.map_or_else(
            || ui::na_cell(false),
            |ts| Cell::new(ts.format("%Y-%m-%d %H:%M UTC")),
        );
        table.add_row(vec![
            Cell::new(&record.symbol),
            ui::right_cell(record.shares_owned),
            ui::right_cell(format_price(record.close_price)),
            ui::right_cell(format_price(record.current_value)),
            last_sync,
        ]);
    }

    let total: Decimal = records.iter().map(|r| r.current_value).sum();
    format!(
        "{}\n{} {}",
        table,
        ui::style_text("Total value:", ui::StyleType::TotalLabel),
        ui::style_text(&format_price(total), ui::StyleType::TotalValue)
    )
}

pub fn display_report(report: &SyncReport) -> String {
    let mut output = format!(
        "{}\nSynced {}/{} stocks in {:.1}s",
        ui::style_text("Stock sync", ui::StyleType::Title),
        report.updated.len(),
        report.total,
        report.elapsed.as_secs_f64()
    );
    for failure in &report.failures {
        output.push('\n');
        output.push_str(&ui::style_text(
            &format!("  {}: {}", failure.symbol, failure.cause),
            ui::StyleType::Error,
        ));
    }
    output
}

pub fn display_indices(prices: &[IndexPrice]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Index"), ui::header_cell("Price")]);
    for index in prices {
        let price = match &index.price {
            Ok(price) => ui::right_cell(price),
            Err(_) => ui::na_cell(true),
        };
        table.add_row(vec![Cell::new(index.symbol), price]);
    }
    table.to_string()
}

pub fn display_news(items: &[NewsItem]) -> String {
    if items.is_empty() {
        return ui::style_text("No headlines", ui::StyleType::Subtle);
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Published"),
        ui::header_cell("Headline"),
        ui::header_cell("Link"),
    ]);
    for item in items {
        table.add_row(vec![
            item.pub_date
                .as_deref()
                .map_or_else(|| ui::na_cell(false), Cell::new),
            Cell::new(&item.title),
            item.link
                .as_deref()
                .map_or_else(|| ui::na_cell(false), Cell::new),
        ]);
    }
    table.to_string()
}
