//! Form payloads for the create/edit dialogs and their validation rules.

use crate::error::ValidationErrors;
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid");
}

/// Minimum password length for new accounts and password changes
pub const MIN_PASSWORD_LEN: usize = 6;

/// Invoice form data
///
/// Submitter, submission time, currency and the embedded related entities are
/// filled in by the store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FacturaForm {
    pub numero_factura: String,
    pub fornecedor: String,
    pub descricao: String,
    pub valor: f64,
    pub data_factura: Option<NaiveDate>,
    #[serde(default)]
    pub data_vencimento: Option<NaiveDate>,
    pub categoria_id: u64,
    pub departamento_id: u64,
    pub status_id: u64,
    #[serde(default)]
    pub arquivo_caminho: Option<String>,
    #[serde(default)]
    pub observacoes: Option<String>,
}

impl FacturaForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.numero_factura.trim().is_empty() {
            errors.push("numero_factura", "O número da fatura é obrigatório");
        }
        if self.fornecedor.trim().is_empty() {
            errors.push("fornecedor", "O fornecedor é obrigatório");
        }
        if self.descricao.trim().is_empty() {
            errors.push("descricao", "A descrição é obrigatória");
        }
        if !self.valor.is_finite() {
            errors.push("valor", "O valor deve ser um número");
        } else if self.valor <= 0.0 {
            errors.push("valor", "O valor deve ser positivo");
        }
        if self.data_factura.is_none() {
            errors.push("data_factura", "A data da fatura é obrigatória");
        }
        if self.categoria_id < 1 {
            errors.push("categoria_id", "A categoria é obrigatória");
        }
        if self.departamento_id < 1 {
            errors.push("departamento_id", "O departamento é obrigatório");
        }
        if self.status_id < 1 {
            errors.push("status_id", "O status é obrigatório");
        }
        errors.into_result()
    }
}

/// User form data; the password fields only apply when creating
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UsuarioForm {
    pub nome: String,
    pub email: String,
    pub departamento_id: u64,
    pub nivel_acesso_id: u64,
    pub ativo: bool,
    #[serde(default)]
    pub foto_perfil: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub confirm_password: Option<String>,
}

impl UsuarioForm {
    pub fn validate(&self, is_editing: bool) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.nome.trim().is_empty() {
            errors.push("nome", "O nome é obrigatório");
        }
        if self.email.trim().is_empty() {
            errors.push("email", "O email é obrigatório");
        } else if !EMAIL_REGEX.is_match(self.email.trim()) {
            errors.push("email", "Email inválido");
        }
        if self.departamento_id < 1 {
            errors.push("departamento_id", "O departamento é obrigatório");
        }
        if self.nivel_acesso_id < 1 {
            errors.push("nivel_acesso_id", "O nível de acesso é obrigatório");
        }

        if !is_editing {
            match self.password.as_deref() {
                None | Some("") => errors.push("password", "A senha é obrigatória"),
                Some(p) if p.chars().count() < MIN_PASSWORD_LEN => errors.push(
                    "password",
                    "A senha deve ter no mínimo 6 caracteres",
                ),
                Some(_) => {}
            }
            if self.confirm_password != self.password {
                errors.push("confirm_password", "As senhas não coincidem");
            }
        }
        errors.into_result()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoriaForm {
    pub nome: String,
    pub codigo: String,
    #[serde(default)]
    pub descricao: String,
    pub ativo: bool,
}

impl CategoriaForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.nome.trim().is_empty() {
            errors.push("nome", "O nome é obrigatório");
        }
        if self.codigo.trim().is_empty() {
            errors.push("codigo", "O código é obrigatório");
        }
        errors.into_result()
    }
}

/// Profile page edits: name, email and picture only
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PerfilForm {
    pub nome: String,
    pub email: String,
    #[serde(default)]
    pub foto_perfil: Option<String>,
}

impl PerfilForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.nome.trim().is_empty() {
            errors.push("nome", "O nome é obrigatório");
        }
        if !EMAIL_REGEX.is_match(self.email.trim()) {
            errors.push("email", "Email inválido");
        }
        errors.into_result()
    }
}
