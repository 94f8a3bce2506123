use super::Workspace;
use anyhow::{Context, Result};
use brent_analysis::changepoint::cusum_change_point;
use brent_analysis::plot::price_chart;
use brent_analysis::stats::mean;
use clap::Args;

#[derive(Args, Debug, Clone, Default)]
pub struct CusumArgs {}

pub fn run(_args: &CusumArgs, ws: &Workspace) -> Result<String> {
    let prices = ws.prices()?;
    let values = prices.prices();
    let mean_price = mean(&values).context("no prices to analyse")?;

    let index = cusum_change_point(&values, mean_price)?;
    let point = prices.get(index).context("change point outside the series")?;

    ws.plot("cusum_change_point.svg", |path| {
        price_chart(&prices, &[], &[index], "CUSUM Change Point", path)
    });

    Ok(format!(
        "Mean price: {:.4}\nCUSUM change point at index {} ({}, price {:.2})",
        mean_price, index, point.date, point.price
    ))
}
