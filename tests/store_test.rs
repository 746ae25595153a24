mod common;

use financecontrol::error::StoreError;
use financecontrol::forms::CategoriaForm;
use financecontrol::model::NotificationKind;
use financecontrol::permissions::EscopoUsuarios;
use financecontrol::seed::{ADMIN_EMAIL, ADMIN_ID};
use financecontrol::store::DataStore;

#[test]
fn new_store_holds_catalogs_and_admin() {
    let store = DataStore::new();
    assert_eq!(store.users().len(), 1);
    assert_eq!(store.users()[0].email, ADMIN_EMAIL);
    assert_eq!(store.statuses().len(), 5);
    assert_eq!(store.categorias().len(), 6);
    assert_eq!(store.departamentos().len(), 5);
    assert_eq!(store.niveis_acesso().len(), 4);
    assert!(store.facturas().is_empty());
}

#[test]
fn seeded_store_is_reproducible() {
    let a = common::seeded_store();
    let b = common::seeded_store();
    assert_eq!(a.facturas(), b.facturas());
    assert_eq!(a.users(), b.users());
    assert_eq!(a.users().len(), 13);
    assert!(a.user(ADMIN_ID).is_some());
    assert!(a.users().iter().filter(|u| u.id != ADMIN_ID).all(|u| u.nivel_acesso_id != 1));
}

#[test]
fn add_factura_prepends_and_notifies() {
    let mut store = common::seeded_store();
    let admin = store.user(ADMIN_ID).unwrap().clone();

    let factura = store.add_factura(common::factura_form("FAT-TEST0001"), &admin).unwrap().clone();
    assert_eq!(store.facturas()[0].id, factura.id);
    assert_eq!(factura.submissao_usuario_id, ADMIN_ID);
    assert_eq!(factura.usuario_submissao.id, ADMIN_ID);
    assert_eq!(factura.moeda, "AOA");
    assert_eq!(factura.departamento.nome, "Tecnologia");
    assert_eq!(factura.status.nome, "Submetida");
    assert!(factura.data_aprovacao.is_none());
    assert!(store.facturas()[1..].iter().all(|f| f.id != factura.id));

    let notification = &store.notifications()[0];
    assert_eq!(notification.title, "Nova Fatura Submetida");
    assert_eq!(
        notification.description,
        "Fatura FAT-TEST0001 de 1 234,50 AOA foi adicionada."
    );
    assert_eq!(notification.kind, NotificationKind::Factura);
    assert_eq!(notification.related_id, Some(factura.id));
    println!("✓ Invoice added with notification");
}

#[test]
fn ids_never_repeat() {
    let mut store = common::seeded_store();
    let admin = store.user(ADMIN_ID).unwrap().clone();
    let a = store.add_factura(common::factura_form("FAT-A"), &admin).unwrap().id;
    let b = store.add_factura(common::factura_form("FAT-B"), &admin).unwrap().id;
    assert!(b > a);
    assert!(store.facturas().iter().filter(|f| f.id == a).count() == 1);
}

#[test]
fn duplicate_invoice_number_is_rejected() {
    let mut store = common::seeded_store();
    let admin = store.user(ADMIN_ID).unwrap().clone();
    let numero = store.facturas()[3].numero_factura.clone();

    let err = store.add_factura(common::factura_form(&numero), &admin).unwrap_err();
    assert!(matches!(err, StoreError::DuplicateInvoiceNumber(_)));
    assert_eq!(err.to_string(), "Este número de fatura já existe.");
    assert_eq!(store.facturas().len(), 40);
}

#[test]
fn invalid_form_reports_each_field() {
    let mut store = common::seeded_store();
    let admin = store.user(ADMIN_ID).unwrap().clone();
    let mut form = common::factura_form("FAT-X");
    form.fornecedor = "  ".to_string();
    form.valor = 0.0;

    match store.add_factura(form, &admin) {
        Err(StoreError::Validation(errors)) => {
            assert_eq!(errors.message_for("fornecedor"), Some("O fornecedor é obrigatório"));
            assert_eq!(errors.message_for("valor"), Some("O valor deve ser positivo"));
            assert_eq!(errors.message_for("descricao"), None);
        }
        other => panic!("expected validation errors, got {:?}", other),
    }
}

#[test]
fn unknown_category_is_rejected() {
    let mut store = common::seeded_store();
    let admin = store.user(ADMIN_ID).unwrap().clone();
    let mut form = common::factura_form("FAT-X");
    form.categoria_id = 99;
    let err = store.add_factura(form, &admin).unwrap_err();
    assert!(matches!(err, StoreError::UnknownReference { entity: "categoria", id: 99 }));
}

#[test]
fn update_factura_keeps_submitter_and_checks_numbers() {
    let mut store = common::seeded_store();
    let admin = store.user(ADMIN_ID).unwrap().clone();
    let target = store.facturas()[0].clone();
    let other_numero = store.facturas()[1].numero_factura.clone();

    let mut form = common::factura_form(&target.numero_factura);
    form.valor = 99.0;
    let updated = store.update_factura(target.id, form, &admin).unwrap().clone();
    assert_eq!(updated.valor, 99.0);
    assert_eq!(updated.submissao_usuario_id, target.submissao_usuario_id);
    assert_eq!(updated.data_submissao, target.data_submissao);

    let err = store
        .update_factura(target.id, common::factura_form(&other_numero), &admin)
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateInvoiceNumber(_)));

    let err = store
        .update_factura(9999, common::factura_form("FAT-Z"), &admin)
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { id: 9999, .. }));
}

#[test]
fn approval_stamps_and_clears() {
    let mut store = common::seeded_store();
    let admin = store.user(ADMIN_ID).unwrap().clone();
    let id = store.add_factura(common::factura_form("FAT-APR"), &admin).unwrap().id;

    let approved = store.set_factura_status(id, 3, &admin).unwrap().clone();
    assert_eq!(approved.status.nome, "Aprovada");
    assert_eq!(approved.aprovacao_usuario_id, Some(ADMIN_ID));
    let stamped = approved.data_aprovacao.expect("approval time");

    let paid = store.set_factura_status(id, 5, &admin).unwrap().clone();
    assert_eq!(paid.data_aprovacao, Some(stamped));

    let back = store.set_factura_status(id, 2, &admin).unwrap();
    assert!(back.data_aprovacao.is_none());
    assert!(back.aprovacao_usuario_id.is_none());
    assert!(store.set_factura_status(id, 42, &admin).is_err());
}

#[test]
fn editing_into_an_approved_state_stamps_approval() {
    let mut store = common::seeded_store();
    let admin = store.user(ADMIN_ID).unwrap().clone();
    let editor = store.users()[1].clone();
    let id = store.add_factura(common::factura_form("FAT-EDT"), &admin).unwrap().id;
    assert!(store.factura(id).unwrap().data_aprovacao.is_none());

    let mut form = common::factura_form("FAT-EDT");
    form.status_id = 3;
    let approved = store.update_factura(id, form.clone(), &editor).unwrap().clone();
    assert_eq!(approved.aprovacao_usuario_id, Some(editor.id));
    let stamped = approved.data_aprovacao.expect("approval time");

    form.status_id = 4;
    let later = store.update_factura(id, form.clone(), &admin).unwrap();
    assert_eq!(later.aprovacao_usuario_id, Some(editor.id));
    assert_eq!(later.data_aprovacao, Some(stamped));

    form.status_id = 1;
    let reopened = store.update_factura(id, form, &admin).unwrap();
    assert!(reopened.data_aprovacao.is_none());
    assert!(reopened.aprovacao_usuario_id.is_none());
}

#[test]
fn delete_factura_removes_it() {
    let mut store = common::seeded_store();
    let id = store.facturas()[7].id;
    let removed = store.delete_factura(id).unwrap();
    assert_eq!(removed.id, id);
    assert!(store.factura(id).is_none());
    assert!(matches!(store.delete_factura(id), Err(StoreError::NotFound { .. })));
}

#[test]
fn user_emails_are_unique_ignoring_case() {
    let mut store = common::seeded_store();
    let created = store
        .add_user(common::usuario_form("Rosa Neto", "rosa@empresa.com", 4, 3))
        .unwrap()
        .clone();
    assert_eq!(store.users()[0].id, created.id);
    assert_eq!(created.nivel_acesso.nome, "Funcionário");
    assert_eq!(created.departamento.nome, "Recursos Humanos");

    let err = store
        .add_user(common::usuario_form("Outra Rosa", "ROSA@empresa.com", 4, 3))
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateEmail(_)));
    assert!(store.user_by_email("Rosa@Empresa.com").is_some());
}

#[test]
fn update_user_keeps_custom_permissions_until_level_changes() {
    let mut store = common::seeded_store();
    let id = store
        .add_user(common::usuario_form("Rosa Neto", "rosa@empresa.com", 4, 3))
        .unwrap()
        .id;

    let mut custom = store.user(id).unwrap().permissoes().clone();
    custom.usuarios.visualizar = EscopoUsuarios::Todos;
    store.update_permissions(id, custom.clone()).unwrap();

    let mut form = common::usuario_form("Rosa M. Neto", "rosa@empresa.com", 4, 3);
    form.password = None;
    form.confirm_password = None;
    let same_level = store.update_user(id, form.clone()).unwrap().clone();
    assert_eq!(same_level.nome, "Rosa M. Neto");
    assert_eq!(same_level.permissoes(), &custom);

    form.nivel_acesso_id = 3;
    let new_level = store.update_user(id, form).unwrap();
    assert_eq!(new_level.nivel_acesso.nome, "Gestor de Departamento");
    assert_eq!(new_level.permissoes().usuarios.visualizar, EscopoUsuarios::Departamento);
}

#[test]
fn user_changes_reach_embedded_submitters() {
    let mut store = common::seeded_store();
    let submitter_id = store.facturas()[0].submissao_usuario_id;
    let submitter = store.user(submitter_id).unwrap().clone();

    let mut form = common::usuario_form(
        "Nome Novo",
        &submitter.email,
        submitter.nivel_acesso_id,
        submitter.departamento_id,
    );
    form.password = None;
    form.confirm_password = None;
    form.ativo = submitter.ativo;
    store.update_user(submitter_id, form).unwrap();

    assert!(store
        .facturas()
        .iter()
        .filter(|f| f.submissao_usuario_id == submitter_id)
        .all(|f| f.usuario_submissao.nome == "Nome Novo"));
}

#[test]
fn category_edits_sync_invoices_and_deletes_leave_copies() {
    let mut store = common::seeded_store();
    let form = CategoriaForm {
        nome: "Informática".to_string(),
        codigo: "INFO".to_string(),
        descricao: "Equipamento informático".to_string(),
        ativo: true,
    };
    store.update_categoria(2, form).unwrap();
    assert!(store
        .facturas()
        .iter()
        .filter(|f| f.categoria_id == 2)
        .all(|f| f.categoria.nome == "Informática"));

    let created = store
        .add_categoria(CategoriaForm {
            nome: "Viagens".to_string(),
            codigo: "VIAG".to_string(),
            descricao: String::new(),
            ativo: true,
        })
        .unwrap()
        .clone();
    assert_eq!(store.categorias()[0].id, created.id);

    store.delete_categoria(2).unwrap();
    assert!(store.categoria(2).is_none());
    assert!(store
        .facturas()
        .iter()
        .filter(|f| f.categoria_id == 2)
        .all(|f| f.categoria.codigo == "INFO"));

    let err = store
        .add_categoria(CategoriaForm::default())
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
}

#[test]
fn notifications_can_be_cleared() {
    let mut store = common::seeded_store();
    let admin = store.user(ADMIN_ID).unwrap().clone();
    store.add_factura(common::factura_form("FAT-N1"), &admin).unwrap();
    assert_eq!(store.notifications().len(), 1);
    store.clear_notifications();
    assert!(store.notifications().is_empty());
}
