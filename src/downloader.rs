#![cfg(not(tarpaulin_include))]

use crate::format::{format_currency, format_date};
use crate::kpi::{MonthValue, annual_total};
use crate::model::Factura;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::error::Error;

/// Column headers of the invoice export, in order
pub const FACTURA_COLUMNS: [&str; 10] = [
    "Nº Factura",
    "Fornecedor",
    "Descrição",
    "Departamento",
    "Categoria",
    "Data Factura",
    "Valor",
    "Moeda",
    "Status",
    "Data Submissão",
];

/// One export row; `Valor` stays numeric for the spreadsheet
fn factura_row(f: &Factura) -> [String; 10] {
    [
        f.numero_factura.clone(),
        f.fornecedor.clone(),
        f.descricao.clone(),
        f.departamento.nome.clone(),
        f.categoria.nome.clone(),
        format_date(f.data_factura),
        f.valor.to_string(),
        f.moeda.clone(),
        f.status.nome.clone(),
        format_date(f.data_submissao.date_naive()),
    ]
}

/// Convert invoices to CSV format
///
/// Writes a header row with the export columns followed by one line per
/// invoice. Values containing commas, quotes or newlines are quoted.
///
/// # Arguments
/// * `rows` - Invoices to export, usually the table engine's current data
///
/// # Returns
/// * `Result<String, Box<dyn Error>>` - CSV content as a string or an error
///
/// # Examples
/// ```
/// use financecontrol::downloader::facturas_to_csv;
///
/// let csv = facturas_to_csv(&[]).unwrap();
/// assert!(csv.starts_with("Nº Factura,Fornecedor"));
/// ```
pub fn facturas_to_csv(rows: &[&Factura]) -> Result<String, Box<dyn Error>> {
    let mut csv_content = FACTURA_COLUMNS.join(",");
    csv_content.push('\n');

    for f in rows {
        let line: Vec<String> = factura_row(f).iter().map(|v| escape_csv(v)).collect();
        csv_content.push_str(&line.join(","));
        csv_content.push('\n');
    }

    Ok(csv_content)
}

fn escape_csv(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Convert invoices to XLSX format
///
/// The workbook holds a single sheet named "Faturas" with a bold header row.
///
/// # Arguments
/// * `rows` - Invoices to export
///
/// # Returns
/// * `Result<Vec<u8>, Box<dyn Error>>` - XLSX file content as bytes or an error
pub fn facturas_to_xlsx(rows: &[&Factura]) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name("Faturas")?;

    let bold = Format::new().set_bold();
    for (c, header) in FACTURA_COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, c as u16, *header, &bold)?;
    }

    for (r, f) in rows.iter().enumerate() {
        let row = r as u32 + 1;
        for (c, value) in factura_row(f).iter().enumerate() {
            if c == 6 {
                worksheet.write_number(row, c as u16, f.valor)?;
            } else {
                worksheet.write_string(row, c as u16, value.as_str())?;
            }
        }
    }

    workbook.push_worksheet(worksheet);
    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}

/// Monthly cost report of one year as XLSX
///
/// Title row, a month/value table and a closing annual total. Values are
/// written as formatted currency text, as printed on the report.
pub fn monthly_costs_to_xlsx(
    monthly: &[MonthValue],
    year: i32,
    currency: &str,
) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name("Custos Mensais")?;

    let bold = Format::new().set_bold();
    worksheet.write_string_with_format(
        0,
        0,
        format!("Relatório de Custos Mensais - {}", year).as_str(),
        &bold,
    )?;
    worksheet.write_string_with_format(2, 0, "Mês", &bold)?;
    worksheet.write_string_with_format(2, 1, "Valor", &bold)?;

    let mut row = 3u32;
    for month in monthly {
        worksheet.write_string(row, 0, month.mes.as_str())?;
        worksheet.write_string(row, 1, format_currency(month.valor, currency).as_str())?;
        row += 1;
    }
    worksheet.write_string_with_format(row, 0, "Total Anual", &bold)?;
    worksheet.write_string_with_format(
        row,
        1,
        format_currency(annual_total(monthly), currency).as_str(),
        &bold,
    )?;

    workbook.push_worksheet(worksheet);
    Ok(workbook.save_to_buffer()?)
}

/// Download file name for a report title
///
/// # Examples
/// ```
/// use financecontrol::downloader::report_filename;
///
/// assert_eq!(report_filename("Relatório de Faturas", "xlsx"), "relatório_de_faturas.xlsx");
/// ```
pub fn report_filename(title: &str, extension: &str) -> String {
    format!("{}.{}", title.to_lowercase().replace(' ', "_"), extension)
}
