//! Dashboard indicators and report aggregates over invoice lists.
//!
//! Every function takes the invoices it should aggregate, so callers pass the
//! list already narrowed by [`crate::permissions::report_facturas`] or by the
//! table engine.

use crate::format::{MONTHS_SHORT, month_title};
use crate::model::{Departamento, Factura, StatusFactura};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Months covered by the dashboard evolution chart
pub const EVOLUTION_MONTHS: u32 = 6;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DepartmentSpend {
    pub departamento: String,
    pub valor: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MonthValue {
    pub mes: String,
    pub valor: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct YearValue {
    pub year: i32,
    pub valor: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatusCount {
    pub name: String,
    pub value: usize,
}

/// Headline numbers of the dashboard
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DashboardKpi {
    pub total_facturas: usize,
    pub valor_total: f64,
    pub pendentes_aprovacao: usize,
    pub aprovadas_mes: usize,
    pub media_tempo_aprovacao: f64,
    pub gasto_por_departamento: Vec<DepartmentSpend>,
    pub evolucao_mensal: Vec<MonthValue>,
}

/// Computes the dashboard indicators as of `today`
///
/// # Arguments
/// * `facturas` - Invoices visible to the viewer
/// * `departamentos` - Departments listed in the spend breakdown, in order
/// * `today` - Reference date for "this month" and the evolution window
///
/// # Returns
/// * `DashboardKpi` - Counts, totals, mean approval time in days (one decimal),
///   approved spend per department and approved spend over the last six months
pub fn generate_dashboard_kpis(
    facturas: &[Factura],
    departamentos: &[Departamento],
    today: NaiveDate,
) -> DashboardKpi {
    let aprovadas_mes = facturas
        .iter()
        .filter(|f| f.is_approved())
        .filter_map(|f| f.data_aprovacao)
        .filter(|d| d.year() == today.year() && d.month() == today.month())
        .count();

    let tempos: Vec<f64> = facturas
        .iter()
        .filter_map(|f| {
            let aprovacao = f.data_aprovacao?;
            let millis = (aprovacao - f.data_submissao).num_milliseconds() as f64;
            Some((millis / 86_400_000.0).ceil())
        })
        .collect();
    let media = if tempos.is_empty() {
        0.0
    } else {
        tempos.iter().sum::<f64>() / tempos.len() as f64
    };

    let gasto_por_departamento = departamentos
        .iter()
        .map(|d| DepartmentSpend {
            departamento: d.nome.clone(),
            valor: facturas
                .iter()
                .filter(|f| f.departamento_id == d.id && f.is_approved())
                .map(|f| f.valor)
                .sum(),
        })
        .collect();

    let evolucao_mensal = (0..EVOLUTION_MONTHS)
        .rev()
        .map(|back| {
            let (year, month) = months_before(today.year(), today.month(), back);
            MonthValue {
                mes: MONTHS_SHORT[(month - 1) as usize].to_string(),
                valor: facturas
                    .iter()
                    .filter(|f| {
                        f.is_approved()
                            && f.data_factura.year() == year
                            && f.data_factura.month() == month
                    })
                    .map(|f| f.valor)
                    .sum(),
            }
        })
        .collect();

    DashboardKpi {
        total_facturas: facturas.len(),
        valor_total: facturas.iter().map(|f| f.valor).sum(),
        pendentes_aprovacao: facturas.iter().filter(|f| f.is_pending()).count(),
        aprovadas_mes,
        media_tempo_aprovacao: (media * 10.0).round() / 10.0,
        gasto_por_departamento,
        evolucao_mensal,
    }
}

fn months_before(year: i32, month: u32, back: u32) -> (i32, u32) {
    let index = year * 12 + month as i32 - 1 - back as i32;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

/// Distinct invoice years, newest first
pub fn available_years(facturas: &[Factura]) -> Vec<i32> {
    let mut years: Vec<i32> = facturas.iter().map(|f| f.data_factura.year()).collect();
    years.sort_unstable_by(|a, b| b.cmp(a));
    years.dedup();
    years
}

/// Year preselected in the report filters: the newest year with data, else `today`'s
pub fn default_year(facturas: &[Factura], today: NaiveDate) -> i32 {
    available_years(facturas)
        .first()
        .copied()
        .unwrap_or_else(|| today.year())
}

/// Twelve monthly totals for `year`, every status included
pub fn monthly_costs(facturas: &[Factura], year: i32) -> Vec<MonthValue> {
    let mut totals = [0.0f64; 12];
    for f in facturas.iter().filter(|f| f.data_factura.year() == year) {
        totals[f.data_factura.month0() as usize] += f.valor;
    }
    totals
        .iter()
        .enumerate()
        .map(|(i, valor)| MonthValue {
            mes: month_title(i as u32 + 1),
            valor: *valor,
        })
        .collect()
}

pub fn annual_total(monthly: &[MonthValue]) -> f64 {
    monthly.iter().map(|m| m.valor).sum()
}

/// Totals per invoice year, oldest first
pub fn yearly_totals(facturas: &[Factura]) -> Vec<YearValue> {
    let mut by_year: BTreeMap<i32, f64> = BTreeMap::new();
    for f in facturas {
        *by_year.entry(f.data_factura.year()).or_insert(0.0) += f.valor;
    }
    by_year
        .into_iter()
        .map(|(year, valor)| YearValue { year, valor })
        .collect()
}

/// Sum for a year, optionally narrowed to one 1-based month
pub fn filtered_total(facturas: &[Factura], year: i32, month: Option<u32>) -> f64 {
    facturas
        .iter()
        .filter(|f| f.data_factura.year() == year)
        .filter(|f| month.is_none_or(|m| f.data_factura.month() == m))
        .map(|f| f.valor)
        .sum()
}

/// Invoice count per status, in catalog order
pub fn status_breakdown(facturas: &[Factura], statuses: &[StatusFactura]) -> Vec<StatusCount> {
    statuses
        .iter()
        .map(|s| StatusCount {
            name: s.nome.clone(),
            value: facturas.iter().filter(|f| f.status_id == s.id).count(),
        })
        .collect()
}

/// Sum of `valor` over the rows of a table view, the invoice list footer
pub fn visible_total(rows: &[&Factura]) -> f64 {
    rows.iter().map(|f| f.valor).sum()
}
