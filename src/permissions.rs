//! Role-based permission matrix and the gates derived from it.
//!
//! Every access level carries a [`Permissoes`] matrix. Screens and actions are
//! gated by looking the acting user's matrix up; scoped permissions compare the
//! target's submitter and department with the acting user.

use crate::model::{Factura, User};
use crate::table::SearchTerm;
use serde::{Deserialize, Serialize};

/// Reach of an invoice permission
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Escopo {
    Proprias,
    Departamento,
    Todas,
}

/// Reach of the approve permission
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscopoAprovacao {
    Nenhuma,
    Departamento,
    Todas,
}

/// Reach of the user listing permission
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscopoUsuarios {
    Proprios,
    Departamento,
    Todos,
}

impl Escopo {
    pub fn as_str(&self) -> &'static str {
        match self {
            Escopo::Proprias => "proprias",
            Escopo::Departamento => "departamento",
            Escopo::Todas => "todas",
        }
    }
}

impl EscopoAprovacao {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscopoAprovacao::Nenhuma => "nenhuma",
            EscopoAprovacao::Departamento => "departamento",
            EscopoAprovacao::Todas => "todas",
        }
    }
}

impl EscopoUsuarios {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscopoUsuarios::Proprios => "proprios",
            EscopoUsuarios::Departamento => "departamento",
            EscopoUsuarios::Todos => "todos",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissoesFacturas {
    pub criar: bool,
    pub editar: Escopo,
    pub aprovar: EscopoAprovacao,
    pub visualizar: Escopo,
    pub excluir: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissoesRelatorios {
    pub departamento: bool,
    pub globais: bool,
    pub exportar: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissoesUsuarios {
    pub criar: bool,
    pub editar: bool,
    pub visualizar: EscopoUsuarios,
    #[serde(rename = "gerirPermissoes")]
    pub gerir_permissoes: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissoesConfiguracoes {
    pub acessar: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissoesCategorias {
    pub gerir: bool,
}

/// Full permission matrix of an access level
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissoes {
    pub facturas: PermissoesFacturas,
    pub relatorios: PermissoesRelatorios,
    pub usuarios: PermissoesUsuarios,
    pub configuracoes: PermissoesConfiguracoes,
    pub categorias: PermissoesCategorias,
}

impl Permissoes {
    /// Text projection used by list searches over users
    pub fn matches(&self, term: &SearchTerm) -> bool {
        let f = &self.facturas;
        let r = &self.relatorios;
        let u = &self.usuarios;
        term.matches_value(f.criar)
            || term.matches(f.editar.as_str())
            || term.matches(f.aprovar.as_str())
            || term.matches(f.visualizar.as_str())
            || term.matches_value(f.excluir)
            || term.matches_value(r.departamento)
            || term.matches_value(r.globais)
            || term.matches_value(r.exportar)
            || term.matches_value(u.criar)
            || term.matches_value(u.editar)
            || term.matches(u.visualizar.as_str())
            || term.matches_value(u.gerir_permissoes)
            || term.matches_value(self.configuracoes.acessar)
            || term.matches_value(self.categorias.gerir)
    }
}

/// Entries of the side navigation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum NavItem {
    Dashboard,
    Facturas,
    Categorias,
    Relatorios,
    Usuarios,
    Configuracoes,
}

impl NavItem {
    pub const ALL: [NavItem; 6] = [
        NavItem::Dashboard,
        NavItem::Facturas,
        NavItem::Categorias,
        NavItem::Relatorios,
        NavItem::Usuarios,
        NavItem::Configuracoes,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            NavItem::Dashboard => "Dashboard",
            NavItem::Facturas => "Faturas",
            NavItem::Categorias => "Categorias",
            NavItem::Relatorios => "Relatórios",
            NavItem::Usuarios => "Usuários",
            NavItem::Configuracoes => "Configurações",
        }
    }

    pub fn href(&self) -> &'static str {
        match self {
            NavItem::Dashboard => "/dashboard",
            NavItem::Facturas => "/facturas",
            NavItem::Categorias => "/categorias",
            NavItem::Relatorios => "/relatorios",
            NavItem::Usuarios => "/usuarios",
            NavItem::Configuracoes => "/configuracoes",
        }
    }

    pub fn is_allowed(&self, p: &Permissoes) -> bool {
        match self {
            NavItem::Dashboard => true,
            // invoice visibility has no "none" level, so the screen is always reachable
            NavItem::Facturas => true,
            NavItem::Categorias => p.categorias.gerir,
            NavItem::Relatorios => p.relatorios.departamento || p.relatorios.globais,
            NavItem::Usuarios => p.usuarios.visualizar != EscopoUsuarios::Proprios,
            NavItem::Configuracoes => p.configuracoes.acessar,
        }
    }
}

/// Navigation entries visible to `user`; nobody logged in sees nothing
pub fn navigation(user: Option<&User>) -> Vec<NavItem> {
    match user {
        Some(user) => NavItem::ALL
            .into_iter()
            .filter(|item| item.is_allowed(user.permissoes()))
            .collect(),
        None => Vec::new(),
    }
}

fn in_scope(scope: Escopo, user: &User, factura: &Factura) -> bool {
    match scope {
        Escopo::Todas => true,
        Escopo::Departamento => factura.departamento_id == user.departamento_id,
        Escopo::Proprias => factura.submissao_usuario_id == user.id,
    }
}

pub fn can_create_factura(user: &User) -> bool {
    user.permissoes().facturas.criar
}

pub fn can_view_factura(user: &User, factura: &Factura) -> bool {
    in_scope(user.permissoes().facturas.visualizar, user, factura)
}

pub fn can_edit_factura(user: &User, factura: &Factura) -> bool {
    in_scope(user.permissoes().facturas.editar, user, factura)
}

pub fn can_approve_factura(user: &User, factura: &Factura) -> bool {
    match user.permissoes().facturas.aprovar {
        EscopoAprovacao::Nenhuma => false,
        EscopoAprovacao::Departamento => factura.departamento_id == user.departamento_id,
        EscopoAprovacao::Todas => true,
    }
}

pub fn can_delete_factura(user: &User) -> bool {
    user.permissoes().facturas.excluir
}

pub fn can_view_user(viewer: &User, target: &User) -> bool {
    match viewer.permissoes().usuarios.visualizar {
        EscopoUsuarios::Todos => true,
        EscopoUsuarios::Departamento => target.departamento_id == viewer.departamento_id,
        EscopoUsuarios::Proprios => target.id == viewer.id,
    }
}

pub fn can_create_user(user: &User) -> bool {
    user.permissoes().usuarios.criar
}

/// Editing yourself is always allowed (profile page)
pub fn can_edit_user(editor: &User, target: &User) -> bool {
    editor.id == target.id || editor.permissoes().usuarios.editar
}

pub fn can_manage_permissions(user: &User) -> bool {
    user.permissoes().usuarios.gerir_permissoes
}

pub fn can_manage_categorias(user: &User) -> bool {
    user.permissoes().categorias.gerir
}

pub fn can_access_settings(user: &User) -> bool {
    user.permissoes().configuracoes.acessar
}

pub fn can_export_reports(user: &User) -> bool {
    user.permissoes().relatorios.exportar
}

pub fn can_view_global_reports(user: &User) -> bool {
    user.permissoes().relatorios.globais
}

/// Invoices `user` may list, in input order
pub fn visible_facturas(user: &User, facturas: &[Factura]) -> Vec<Factura> {
    facturas
        .iter()
        .filter(|f| can_view_factura(user, f))
        .cloned()
        .collect()
}

/// Invoices that feed `user`'s reports: everything with global reports,
/// the own department with departmental reports, nothing otherwise
pub fn report_facturas(user: &User, facturas: &[Factura]) -> Vec<Factura> {
    let p = &user.permissoes().relatorios;
    facturas
        .iter()
        .filter(|f| p.globais || (p.departamento && f.departamento_id == user.departamento_id))
        .cloned()
        .collect()
}

pub fn visible_users(viewer: &User, users: &[User]) -> Vec<User> {
    users
        .iter()
        .filter(|u| can_view_user(viewer, u))
        .cloned()
        .collect()
}
