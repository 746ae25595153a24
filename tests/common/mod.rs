#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use financecontrol::forms::{FacturaForm, UsuarioForm};
use financecontrol::model::{Factura, User};
use financecontrol::seed::{NIVEIS_ACESSO, SeedGenerator, admin_user};
use financecontrol::store::DataStore;

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap()
}

pub fn generator() -> SeedGenerator {
    SeedGenerator::with_clock(7, fixed_now())
}

/// 40 invoices, 12 generated users plus the administrator
pub fn seeded_store() -> DataStore {
    DataStore::seeded(&mut generator(), 40, 12)
}

pub fn factura_form(numero: &str) -> FacturaForm {
    FacturaForm {
        numero_factura: numero.to_string(),
        fornecedor: "Kwanza Serviços Lda".to_string(),
        descricao: "Contrato de suporte".to_string(),
        valor: 1234.5,
        data_factura: NaiveDate::from_ymd_opt(2025, 3, 1),
        data_vencimento: NaiveDate::from_ymd_opt(2025, 4, 1),
        categoria_id: 2,
        departamento_id: 2,
        status_id: 1,
        arquivo_caminho: None,
        observacoes: None,
    }
}

pub fn usuario_form(
    nome: &str,
    email: &str,
    nivel_acesso_id: u64,
    departamento_id: u64,
) -> UsuarioForm {
    UsuarioForm {
        nome: nome.to_string(),
        email: email.to_string(),
        departamento_id,
        nivel_acesso_id,
        ativo: true,
        foto_perfil: None,
        password: Some("segredo1".to_string()),
        confirm_password: Some("segredo1".to_string()),
    }
}

/// A user at catalog access level `nivel` (1-based) in department `departamento_id`
pub fn user_with_level(id: u64, nivel: usize, departamento_id: u64) -> User {
    let mut user = admin_user(fixed_now());
    user.id = id;
    user.email = format!("user{}@empresa.com", id);
    user.nivel_acesso = NIVEIS_ACESSO[nivel - 1].clone();
    user.nivel_acesso_id = user.nivel_acesso.id;
    user.departamento_id = departamento_id;
    user.departamento.id = departamento_id;
    user
}

/// A generated invoice to clone and adjust in aggregate tests
pub fn template_factura() -> Factura {
    let mut generator = generator();
    let submitter = admin_user(fixed_now());
    generator
        .generate_facturas(1, &[submitter])
        .pop()
        .expect("one invoice generated")
}
