//! Terminal rendering and command parsing for the invoice viewer binary.

use crate::format::{format_currency, format_date};
use crate::model::Factura;
use crate::table::{DataTable, SortDirection, TableView};

/// One line typed at the viewer prompt
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewerCommand {
    /// `/<term>`; a bare `/` clears the search
    Search(String),
    /// `o <field>`
    Sort(String),
    /// `n`
    Next,
    /// `p`
    Previous,
    /// `g <page>`
    GoTo(usize),
    /// `pp <size>`
    PageSize(usize),
    /// `x <file.csv>`
    Export(String),
    DisableOutput,
    EnableOutput,
    Help,
    Quit,
}

impl ViewerCommand {
    /// Parses a prompt line; `None` for anything unrecognised
    pub fn parse(line: &str) -> Option<ViewerCommand> {
        let line = line.trim();
        if let Some(term) = line.strip_prefix('/') {
            return Some(ViewerCommand::Search(term.trim().to_string()));
        }

        let (word, arg) = match line.split_once(char::is_whitespace) {
            Some((word, arg)) => (word, arg.trim()),
            None => (line, ""),
        };
        match (word, arg) {
            ("q", "") => Some(ViewerCommand::Quit),
            ("n", "") => Some(ViewerCommand::Next),
            ("p", "") => Some(ViewerCommand::Previous),
            ("help", "") => Some(ViewerCommand::Help),
            ("disable_output", "") => Some(ViewerCommand::DisableOutput),
            ("enable_output", "") => Some(ViewerCommand::EnableOutput),
            ("o", field) if !field.is_empty() => Some(ViewerCommand::Sort(field.to_string())),
            ("x", file) if !file.is_empty() => Some(ViewerCommand::Export(file.to_string())),
            ("g", n) => n.parse().ok().map(ViewerCommand::GoTo),
            ("pp", n) => n.parse().ok().map(ViewerCommand::PageSize),
            _ => None,
        }
    }

    /// Applies a table command; returns false for commands the table does not handle
    pub fn apply(&self, table: &mut DataTable) -> bool {
        match self {
            ViewerCommand::Search(term) => table.set_search_term(term.as_str()),
            ViewerCommand::Sort(field) => table.request_sort(field.as_str()),
            ViewerCommand::Next => table.next_page(),
            ViewerCommand::Previous => table.previous_page(),
            ViewerCommand::GoTo(page) => table.set_current_page(*page),
            ViewerCommand::PageSize(size) => table.set_items_per_page(*size),
            _ => return false,
        }
        true
    }
}

pub const HELP: &str = "Commands:
  /<term>: Search every field (a bare / clears the search)
  o <field>: Sort by a field, again to reverse (e.g. o valor, o departamento.nome)
  n: Next page
  p: Previous page
  g <n>: Go to page n
  pp <n>: Show n invoices per page
  x <file.csv>: Export the filtered list as CSV
  disable_output: Disable table display
  enable_output: Enable table display
  q: Quit";

fn cut(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut short: String = text.chars().take(width.saturating_sub(1)).collect();
        short.push('…');
        short
    }
}

/// Renders the page rows and the footer line of a view
pub fn render_page(view: &TableView<'_, Factura>) -> String {
    let mut out = format!(
        "{:<14} {:<24} {:<18} {:>18} {:<12} {:<10}\n",
        "Nº Factura", "Fornecedor", "Departamento", "Valor", "Status", "Data"
    );
    for f in &view.paginated_data {
        out.push_str(&format!(
            "{:<14} {:<24} {:<18} {:>18} {:<12} {:<10}\n",
            cut(&f.numero_factura, 14),
            cut(&f.fornecedor, 24),
            cut(&f.departamento.nome, 18),
            format_currency(f.valor, &f.moeda),
            cut(&f.status.nome, 12),
            format_date(f.data_factura),
        ));
    }
    if view.paginated_data.is_empty() {
        out.push_str("Nenhuma fatura encontrada\n");
    }
    out.push_str(&status_line(view));
    out
}

/// `Página 2 de 5 · 48 faturas · valor desc · "abc"`
pub fn status_line(view: &TableView<'_, Factura>) -> String {
    let mut line = format!(
        "Página {} de {} · {} faturas",
        view.current_page,
        view.total_pages.max(1),
        view.total_items
    );
    if let Some(sort) = &view.sort_config {
        let arrow = match sort.direction {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        };
        line.push_str(&format!(" · {} {}", sort.key, arrow));
    }
    if !view.search_term.is_empty() {
        line.push_str(&format!(" · \"{}\"", view.search_term));
    }
    line
}
